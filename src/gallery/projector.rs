use crate::state::data::{Location, PhotoRecord};

/// Most items the gallery shows at once
pub const GALLERY_WINDOW: usize = 10;

/// Label used when a photo has no title
pub const UNTITLED_LABEL: &str = "Untitled";

/// Zoom level baked into map links
pub const MAP_ZOOM: u8 = 15;

/// One renderable gallery entry
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryItem {
    pub id: i64,
    /// The encoded frame (`data:` URL)
    pub image_src: String,
    pub title: String,
    pub location_text: String,
    pub map_url: String,
    pub captured_at: String,
}

/// Anything that can draw a list of gallery items
pub trait GallerySurface {
    /// Replace whatever is shown with `items`, in order
    fn render(&mut self, items: &[GalleryItem]);
}

/// Maps record snapshots to gallery items. Pure: the same snapshot
/// always yields the same items.
#[derive(Debug, Clone)]
pub struct GalleryProjector {
    window: usize,
    untitled_label: String,
    map_zoom: u8,
}

impl Default for GalleryProjector {
    fn default() -> Self {
        Self::new(GALLERY_WINDOW, UNTITLED_LABEL, MAP_ZOOM)
    }
}

impl GalleryProjector {
    pub fn new(window: usize, untitled_label: impl Into<String>, map_zoom: u8) -> Self {
        Self {
            window,
            untitled_label: untitled_label.into(),
            map_zoom,
        }
    }

    /// Project the newest `window` records of `snapshot` (oldest first in,
    /// oldest first out).
    pub fn project(&self, snapshot: &[PhotoRecord]) -> Vec<GalleryItem> {
        let skip = snapshot.len().saturating_sub(self.window);

        snapshot[skip..]
            .iter()
            .map(|record| GalleryItem {
                id: record.id,
                image_src: record.photo.as_str().to_string(),
                title: record
                    .title
                    .clone()
                    .unwrap_or_else(|| self.untitled_label.clone()),
                location_text: location_text(&record.location),
                map_url: map_url(&record.location, self.map_zoom),
                captured_at: record.timestamp.clone(),
            })
            .collect()
    }

    /// Project and hand the items to `surface`. A missing surface is fine:
    /// the items are still returned and nothing else happens.
    pub fn present<S>(&self, snapshot: &[PhotoRecord], surface: Option<&mut S>) -> Vec<GalleryItem>
    where
        S: GallerySurface + ?Sized,
    {
        let items = self.project(snapshot);
        match surface {
            Some(surface) => surface.render(&items),
            None => tracing::debug!("no gallery surface attached, skipping render"),
        }
        items
    }
}

/// Human-readable coordinates
pub fn location_text(location: &Location) -> String {
    format!(
        "Location: Latitude {}, Longitude {}",
        location.latitude, location.longitude
    )
}

/// Embeddable map link centred on `location`
pub fn map_url(location: &Location, zoom: u8) -> String {
    format!(
        "https://www.google.com/maps?q={},{}&z={}&output=embed",
        location.latitude, location.longitude, zoom
    )
}
