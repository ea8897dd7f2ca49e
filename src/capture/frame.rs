use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

use crate::state::data::EncodedImage;

/// Default bound on the longest edge of a stored frame
pub const FRAME_MAX_DIMENSION: u32 = 1280;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("no camera signal")]
    NoSignal,
    #[error("could not read frame: {0}")]
    Unreadable(String),
    #[error("could not encode frame: {0}")]
    Encode(String),
}

/// A live feed the controller can grab stills from
pub trait FrameSource: Send + Sync + 'static {
    /// Snapshot the current frame
    fn grab(&self) -> Result<DynamicImage, FrameError>;
}

/// Feed backed by an image file on disk. Every grab re-reads the file,
/// so replacing it on disk changes what the "camera" sees.
#[derive(Debug, Default)]
pub struct ImageFileSource {
    path: RwLock<Option<PathBuf>>,
}

impl ImageFileSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: RwLock::new(path),
        }
    }

    /// Point the feed at another file
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!(path = %path.display(), "frame source changed");
        let mut current = self.path.write().unwrap_or_else(|p| p.into_inner());
        *current = Some(path);
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.path.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl FrameSource for ImageFileSource {
    fn grab(&self) -> Result<DynamicImage, FrameError> {
        let path = self.path().ok_or(FrameError::NoSignal)?;
        load_frame(&path)
    }
}

fn load_frame(path: &Path) -> Result<DynamicImage, FrameError> {
    image::open(path).map_err(|e| FrameError::Unreadable(format!("{}: {}", path.display(), e)))
}

/// Encode a frame as a PNG `data:` URL, shrinking it first so the longest
/// edge is at most `max_dimension`.
pub fn encode_frame(frame: &DynamicImage, max_dimension: u32) -> Result<EncodedImage, FrameError> {
    let resized;
    let frame = if frame.width() > max_dimension || frame.height() > max_dimension {
        resized = frame.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        &resized
    } else {
        frame
    };

    let mut bytes = Vec::new();
    frame
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| FrameError::Encode(e.to_string()))?;

    Ok(EncodedImage::new(format!(
        "{}{}",
        DATA_URL_PREFIX,
        STANDARD.encode(&bytes)
    )))
}

/// Raw image bytes behind a base64 `data:` URL, `None` if it isn't one
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_keeps_small_frames() {
        let frame = DynamicImage::new_rgb8(16, 9);
        let encoded = encode_frame(&frame, FRAME_MAX_DIMENSION).unwrap();

        assert!(encoded.as_str().starts_with("data:image/png;base64,"));

        let bytes = decode_data_url(encoded.as_str()).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 9));
    }

    #[test]
    fn test_encode_downscales_large_frames() {
        let frame = DynamicImage::new_rgb8(400, 200);
        let encoded = encode_frame(&frame, 100).unwrap();

        let bytes = decode_data_url(encoded.as_str()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_decode_rejects_non_data_urls() {
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
        assert_eq!(decode_data_url("data:image/png,plain"), None);
        assert_eq!(decode_data_url("data:image/png;base64,@@@"), None);
    }

    #[test]
    fn test_file_source_without_path_has_no_signal() {
        let source = ImageFileSource::default();
        assert_eq!(source.grab().unwrap_err(), FrameError::NoSignal);
    }

    #[test]
    fn test_file_source_reads_current_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        DynamicImage::new_rgb8(8, 8).save(&path).unwrap();

        let source = ImageFileSource::new(None);
        source.set_path(&path);

        let frame = source.grab().unwrap();
        assert_eq!(frame.width(), 8);
        assert_eq!(source.path(), Some(path));
    }

    #[test]
    fn test_file_source_missing_file_is_unreadable() {
        let source = ImageFileSource::new(Some(PathBuf::from("/nonexistent/frame.png")));
        assert!(matches!(source.grab(), Err(FrameError::Unreadable(_))));
    }
}
