//! Tracing setup for the desktop app.

use std::str::FromStr;
use std::sync::OnceLock;
use tracing::Level;

use crate::config::AppConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Level named in the config, `INFO` if it can't be parsed
pub fn log_level(config: &AppConfig) -> Level {
    Level::from_str(config.log_level.trim()).unwrap_or(Level::INFO)
}

/// Install the global fmt subscriber. Later calls do nothing.
pub fn init_tracing(config: &AppConfig) {
    let level = log_level(config);
    let _ = TRACING_INIT.get_or_init(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
