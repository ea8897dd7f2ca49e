use iced::widget::{button, column, container, image, row, text, text_input, Column};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::sync::Arc;

use geocam::capture::frame::{decode_data_url, ImageFileSource};
use geocam::capture::geo::{FixedGeolocator, GeolocationError};
use geocam::capture::{CaptureController, CaptureError, CaptureOutcome};
use geocam::config::AppConfig;
use geocam::gallery::projector::map_url;
use geocam::gallery::{GalleryProjector, GallerySurface};
use geocam::logging;
use geocam::state::data::{Location, PhotoRecord};
use geocam::state::library::PhotoLibrary;
use geocam::state::store::{LocalStore, StoreError};

mod ui;

type Controller = CaptureController<ImageFileSource, FixedGeolocator>;

/// Main application state
struct GeoCam {
    /// Runs captures against the shared library
    controller: Controller,
    /// Store and buffer, shared with the controller
    library: PhotoLibrary,
    projector: GalleryProjector,
    gallery: ui::gallery::GalleryPanel,
    map_zoom: u8,
    /// Title typed for the next capture
    title: String,
    /// Status message to display to the user
    status: String,
    /// Set while a capture is in flight; disables the shutter
    capturing: bool,
    /// The most recent capture
    preview: Option<image::Handle>,
    /// Last position from "Locate"
    position: Option<String>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    TitleChanged(String),
    /// User wants to pick the still that acts as the camera feed
    ChooseFeed,
    /// Shutter pressed
    Capture,
    CaptureFinished(Result<CaptureOutcome, CaptureError>),
    Locate,
    Located(Result<Location, GeolocationError>),
    /// Startup hydration finished
    GalleryLoaded(Result<Vec<PhotoRecord>, StoreError>),
}

impl GeoCam {
    fn new(config: &AppConfig, library: PhotoLibrary, photo_count: i64) -> (Self, Task<Message>) {
        let controller = CaptureController::new(
            library.clone(),
            config.gallery_projector(),
            Arc::new(ImageFileSource::default()),
            Arc::new(FixedGeolocator::new(config.location)),
            config.capture_settings(),
        );

        let app = GeoCam {
            controller,
            library: library.clone(),
            projector: config.gallery_projector(),
            gallery: ui::gallery::GalleryPanel::default(),
            map_zoom: config.map_zoom,
            title: String::new(),
            status: format!("Ready. {} photos in library.", photo_count),
            capturing: false,
            preview: None,
            position: None,
        };

        (
            app,
            Task::perform(async move { library.hydrate().await }, Message::GalleryLoaded),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TitleChanged(title) => {
                self.title = title;
                Task::none()
            }
            Message::ChooseFeed => {
                let file = FileDialog::new()
                    .set_title("Select a still frame for the camera feed")
                    .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
                    .pick_file();

                if let Some(path) = file {
                    self.status = format!("Feed: {}", path.display());
                    self.controller.frames().set_path(path);
                }
                Task::none()
            }
            Message::Capture => {
                if self.capturing {
                    return Task::none();
                }
                self.capturing = true;
                self.status = "Capturing...".to_string();

                let controller = self.controller.clone();
                let title = Some(self.title.clone());
                Task::perform(
                    async move { controller.capture(title).await },
                    Message::CaptureFinished,
                )
            }
            Message::CaptureFinished(result) => {
                self.capturing = false;
                match result {
                    Ok(outcome) => {
                        self.gallery.render(&outcome.gallery);
                        self.preview = decode_data_url(outcome.record.photo.as_str())
                            .map(|bytes| image::Handle::from_bytes(bytes));
                        self.title.clear();
                        self.status = format!("Saved photo #{}.", outcome.record.id);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "capture failed");
                        self.status = format!("Capture failed: {}", e);
                    }
                }
                Task::none()
            }
            Message::Locate => {
                let controller = self.controller.clone();
                Task::perform(async move { controller.locate().await }, Message::Located)
            }
            Message::Located(result) => {
                match result {
                    Ok(location) => {
                        self.position = Some(format!(
                            "Latitude {}, Longitude {}\n{}",
                            location.latitude,
                            location.longitude,
                            map_url(&location, self.map_zoom)
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(code = e.code(), error = %e, "locate failed");
                        self.status = format!("Could not get location: {}", e);
                    }
                }
                Task::none()
            }
            Message::GalleryLoaded(result) => {
                match result {
                    Ok(snapshot) => {
                        self.projector.present(&snapshot, Some(&mut self.gallery));
                        tracing::info!(shown = self.gallery.len(), "gallery ready");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "could not load gallery");
                        self.status = format!("Could not load photos: {}", e);
                    }
                }
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let controls = row![
            text_input("Title (optional)", &self.title)
                .on_input(Message::TitleChanged)
                .width(Length::Fixed(260.0)),
            button("Capture")
                .on_press_maybe((!self.capturing).then_some(Message::Capture))
                .padding(10),
            button("Choose Feed").on_press(Message::ChooseFeed).padding(10),
            button("Locate").on_press(Message::Locate).padding(10),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let content: Column<Message> = column![
            text("GeoCam").size(40),
            controls,
            text(self.status.as_str()).size(16),
        ]
        .push_maybe(self.position.as_deref().map(|p| text(p).size(14)))
        .push_maybe(
            self.preview
                .clone()
                .map(|handle| image(handle).width(Length::Fixed(480.0))),
        )
        .push(self.library_note())
        .push(self.gallery.view())
        .spacing(20)
        .padding(40)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    fn library_note(&self) -> Element<'_, Message> {
        let location = match self.library.store().path() {
            Some(path) => path.display().to_string(),
            None => "memory".to_string(),
        };
        text(format!("Recent photos (stored in {})", location))
            .size(12)
            .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    let config = match AppConfig::load() {
        Ok(config) => {
            logging::init_tracing(&config);
            config
        }
        Err(e) => {
            let config = AppConfig::default();
            logging::init_tracing(&config);
            tracing::warn!(error = %e, "falling back to default config");
            config
        }
    };

    let (library, photo_count) = match open_library(&config) {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!(error = %e, "cannot start without the photo store");
            std::process::exit(1);
        }
    };
    tracing::info!(photo_count, "GeoCam initialized");

    iced::application("GeoCam", GeoCam::update, GeoCam::view)
        .theme(GeoCam::theme)
        .centered()
        .run_with(move || GeoCam::new(&config, library, photo_count))
}

/// Open the store before the UI starts; nothing works without it
fn open_library(config: &AppConfig) -> Result<(PhotoLibrary, i64), StoreError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

    runtime.block_on(async {
        let store = LocalStore::open(config.database_path()).await?;
        let count = store.count().await?;
        Ok((PhotoLibrary::new(store, config.capture_buffer()), count))
    })
}
