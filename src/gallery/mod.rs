/// Gallery projection
///
/// Turns a snapshot of photo records into view items that any
/// rendering surface can draw. Nothing here knows about widgets.

pub mod projector;

pub use projector::{GalleryItem, GalleryProjector, GallerySurface, GALLERY_WINDOW};
