use iced::widget::{column, image, scrollable, text, Column};
use iced::{Element, Length};

use geocam::capture::frame::decode_data_url;
use geocam::gallery::{GalleryItem, GallerySurface};

use crate::Message;

/// Width of a gallery picture
const CARD_WIDTH: f32 = 320.0;

/// A gallery item with its picture already decoded for display
struct Card {
    item: GalleryItem,
    picture: Option<image::Handle>,
}

/// The on-screen gallery. Receives items from the projector.
#[derive(Default)]
pub struct GalleryPanel {
    cards: Vec<Card>,
}

impl GallerySurface for GalleryPanel {
    fn render(&mut self, items: &[GalleryItem]) {
        // Decoding happens once here, not on every redraw
        self.cards = items
            .iter()
            .map(|item| Card {
                picture: decode_data_url(&item.image_src)
                    .map(|bytes| image::Handle::from_bytes(bytes)),
                item: item.clone(),
            })
            .collect();
    }
}

impl GalleryPanel {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn view(&self) -> Element<'_, Message> {
        if self.cards.is_empty() {
            return text("No photos yet.").size(16).into();
        }

        let cards = self.cards.iter().map(|card| {
            let picture: Element<'_, Message> = match &card.picture {
                Some(handle) => image(handle.clone()).width(Length::Fixed(CARD_WIDTH)).into(),
                None => text("(picture unavailable)").size(14).into(),
            };

            column![
                picture,
                text(card.item.title.as_str()).size(18),
                text(card.item.location_text.as_str()).size(14),
                text(card.item.map_url.as_str()).size(12),
            ]
            .spacing(6)
            .into()
        });

        scrollable(Column::with_children(cards).spacing(24))
            .height(Length::Fill)
            .into()
    }
}
