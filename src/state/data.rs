/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the store, the capture pipeline and the gallery.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A geographic position as reported by the geolocation provider
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// An encoded still image kept as text (a `data:` URL)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn new(data_url: impl Into<String>) -> Self {
        Self(data_url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A photo that has been captured and geotagged but not yet persisted.
///
/// It has no id: ids are handed out by the store on insert.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoDraft {
    /// Optional label. `None` is stored as-is, the gallery supplies the placeholder
    pub title: Option<String>,
    pub photo: EncodedImage,
    pub location: Location,
    /// ISO-8601 UTC instant, millisecond precision
    pub timestamp: String,
}

impl PhotoDraft {
    /// Build a draft stamped with the current instant.
    /// Blank titles are normalized to `None`.
    pub fn new(title: Option<String>, photo: EncodedImage, location: Location) -> Self {
        Self {
            title: normalize_title(title),
            photo,
            location,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Attach the id the store assigned on insert
    pub fn into_record(self, id: i64) -> PhotoRecord {
        PhotoRecord {
            id,
            title: self.title,
            photo: self.photo,
            location: self.location,
            timestamp: self.timestamp,
        }
    }
}

/// A persisted photo. Immutable once written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    /// Store-assigned, strictly increasing
    pub id: i64,
    pub title: Option<String>,
    pub photo: EncodedImage,
    pub location: Location,
    pub timestamp: String,
}

fn normalize_title(title: Option<String>) -> Option<String> {
    title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
