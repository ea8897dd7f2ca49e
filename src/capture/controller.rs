use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;

use super::frame::{encode_frame, FrameError, FrameSource, FRAME_MAX_DIMENSION};
use super::geo::{GeolocationError, Geolocator};
use super::CaptureError;
use crate::gallery::{GalleryItem, GalleryProjector};
use crate::state::data::{EncodedImage, Location, PhotoDraft, PhotoRecord};
use crate::state::library::PhotoLibrary;

/// Knobs for a capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Refuse to capture without a non-blank title
    pub require_title: bool,
    /// How long to wait for a position before giving up
    pub geolocation_timeout: Duration,
    /// Longest edge of the stored frame
    pub frame_max_dimension: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            require_title: false,
            geolocation_timeout: Duration::from_secs(10),
            frame_max_dimension: FRAME_MAX_DIMENSION,
        }
    }
}

/// Where the controller is in the current capture
#[derive(Debug, Clone, PartialEq)]
pub enum CapturePhase {
    Idle,
    Capturing,
    Geotagging,
    Persisting,
    /// The last capture was aborted; stays until the next trigger
    Failed(CaptureError),
}

/// Result of a committed capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    pub record: PhotoRecord,
    /// The gallery as it stands after the commit
    pub gallery: Vec<GalleryItem>,
}

/// Drives one capture at a time: frame, position, store, buffer, gallery.
///
/// Each step only starts once the previous one finished. Clones share the
/// same in-flight flag, so a second trigger while one capture is running
/// is rejected with `CaptureError::Busy`.
pub struct CaptureController<F, G> {
    library: PhotoLibrary,
    projector: GalleryProjector,
    frames: Arc<F>,
    geolocator: Arc<G>,
    settings: CaptureSettings,
    phase: Arc<Mutex<CapturePhase>>,
    in_flight: Arc<AtomicBool>,
}

impl<F, G> Clone for CaptureController<F, G> {
    fn clone(&self) -> Self {
        Self {
            library: self.library.clone(),
            projector: self.projector.clone(),
            frames: Arc::clone(&self.frames),
            geolocator: Arc::clone(&self.geolocator),
            settings: self.settings.clone(),
            phase: Arc::clone(&self.phase),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<F: FrameSource, G: Geolocator> CaptureController<F, G> {
    pub fn new(
        library: PhotoLibrary,
        projector: GalleryProjector,
        frames: Arc<F>,
        geolocator: Arc<G>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            library,
            projector,
            frames,
            geolocator,
            settings,
            phase: Arc::new(Mutex::new(CapturePhase::Idle)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn frames(&self) -> &F {
        &self.frames
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one capture. `title` is whatever the user typed, if anything.
    pub async fn capture(&self, title: Option<String>) -> Result<CaptureOutcome, CaptureError> {
        let _flight = InFlight::acquire(&self.in_flight).ok_or(CaptureError::Busy)?;

        if self.settings.require_title && title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            tracing::warn!("capture refused: title is required");
            self.set_phase(CapturePhase::Idle);
            return Err(CaptureError::ValidationFailed("a title is required".to_string()));
        }

        self.set_phase(CapturePhase::Capturing);
        let photo = self.grab_encoded().await.map_err(|e| self.fail(e.into()))?;

        self.set_phase(CapturePhase::Geotagging);
        let location = self.locate().await.map_err(|e| self.fail(e.into()))?;

        self.set_phase(CapturePhase::Persisting);
        let draft = PhotoDraft::new(title, photo, location);
        let (record, snapshot) = self
            .library
            .commit(draft)
            .await
            .map_err(|e| self.fail(e.into()))?;

        let gallery = self.projector.project(&snapshot);
        self.set_phase(CapturePhase::Idle);

        tracing::info!(
            id = record.id,
            latitude = record.location.latitude,
            longitude = record.location.longitude,
            "photo captured"
        );

        Ok(CaptureOutcome { record, gallery })
    }

    /// Ask for the current position, bounded by the configured timeout.
    /// Nothing is stored.
    pub async fn locate(&self) -> Result<Location, GeolocationError> {
        match tokio::time::timeout(
            self.settings.geolocation_timeout,
            self.geolocator.current_position(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GeolocationError::Timeout),
        }
    }

    // Grabbing and encoding is CPU-heavy, keep it off the async workers
    async fn grab_encoded(&self) -> Result<EncodedImage, FrameError> {
        let frames = Arc::clone(&self.frames);
        let max_dimension = self.settings.frame_max_dimension;

        task::spawn_blocking(move || {
            let frame = frames.grab()?;
            encode_frame(&frame, max_dimension)
        })
        .await
        .map_err(|e| FrameError::Encode(format!("task join error: {}", e)))?
    }

    fn set_phase(&self, phase: CapturePhase) {
        tracing::debug!(?phase, "capture phase");
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    fn fail(&self, err: CaptureError) -> CaptureError {
        tracing::warn!(error = %err, "capture aborted");
        self.set_phase(CapturePhase::Failed(err.clone()));
        err
    }
}

/// Holds the in-flight flag for the duration of a capture
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::buffer::CaptureBuffer;
    use crate::state::store::{LocalStore, StoreError};
    use image::DynamicImage;
    use tokio::sync::Notify;

    struct StillFrames;

    impl FrameSource for StillFrames {
        fn grab(&self) -> Result<DynamicImage, FrameError> {
            Ok(DynamicImage::new_rgb8(4, 4))
        }
    }

    struct DeadFrames;

    impl FrameSource for DeadFrames {
        fn grab(&self) -> Result<DynamicImage, FrameError> {
            Err(FrameError::NoSignal)
        }
    }

    struct FixedAt(Result<Location, GeolocationError>);

    impl Geolocator for FixedAt {
        async fn current_position(&self) -> Result<Location, GeolocationError> {
            self.0
        }
    }

    struct NeverAnswers;

    impl Geolocator for NeverAnswers {
        async fn current_position(&self) -> Result<Location, GeolocationError> {
            std::future::pending().await
        }
    }

    struct Gated {
        gate: Arc<Notify>,
    }

    impl Geolocator for Gated {
        async fn current_position(&self) -> Result<Location, GeolocationError> {
            self.gate.notified().await;
            Ok(Location::new(1.0, 2.0))
        }
    }

    const HERE: Location = Location {
        latitude: -23.5505,
        longitude: -46.6333,
    };

    fn controller_with<F: FrameSource, G: Geolocator>(
        frames: F,
        geolocator: G,
        settings: CaptureSettings,
    ) -> (CaptureController<F, G>, PhotoLibrary) {
        let library = PhotoLibrary::new(LocalStore::open_in_memory().unwrap(), CaptureBuffer::default());
        let controller = CaptureController::new(
            library.clone(),
            GalleryProjector::default(),
            Arc::new(frames),
            Arc::new(geolocator),
            settings,
        );
        (controller, library)
    }

    fn ids(records: &[PhotoRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_successful_captures_persist_in_order() {
        let (controller, library) =
            controller_with(StillFrames, FixedAt(Ok(HERE)), CaptureSettings::default());

        for n in 1..=4 {
            let outcome = controller.capture(Some(format!("shot {}", n))).await.unwrap();
            assert_eq!(outcome.record.id, n);
            assert_eq!(outcome.record.location, HERE);
            assert!(outcome.record.photo.as_str().starts_with("data:image/png;base64,"));
        }

        let stored = library.store().list_all().await.unwrap();
        assert_eq!(ids(&stored), vec![1, 2, 3, 4]);
        assert_eq!(ids(&library.snapshot()), vec![2, 3, 4]);
        assert_eq!(controller.phase(), CapturePhase::Idle);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_outcome_carries_projected_gallery() {
        let (controller, _library) =
            controller_with(StillFrames, FixedAt(Ok(HERE)), CaptureSettings::default());

        controller.capture(None).await.unwrap();
        let outcome = controller.capture(Some("Paulista".to_string())).await.unwrap();

        let titles: Vec<&str> = outcome.gallery.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Untitled", "Paulista"]);
        assert_eq!(
            outcome.gallery[1].map_url,
            "https://www.google.com/maps?q=-23.5505,-46.6333&z=15&output=embed"
        );
    }

    #[tokio::test]
    async fn test_hydrated_library_then_capture_keeps_three() {
        let (controller, library) =
            controller_with(StillFrames, FixedAt(Ok(HERE)), CaptureSettings::default());
        for _ in 0..5 {
            let draft = PhotoDraft::new(None, EncodedImage::new("data:image/png;base64,AA=="), HERE);
            library.store().insert(draft).await.unwrap();
        }

        assert_eq!(ids(&library.hydrate().await.unwrap()), vec![1, 2, 3, 4, 5]);

        let outcome = controller.capture(None).await.unwrap();
        assert_eq!(outcome.record.id, 6);
        assert_eq!(ids(&library.snapshot()), vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_geolocation_failure_persists_nothing() {
        let (controller, library) = controller_with(
            StillFrames,
            FixedAt(Err(GeolocationError::PermissionDenied)),
            CaptureSettings::default(),
        );

        let err = controller.capture(None).await.unwrap_err();

        assert_eq!(
            err,
            CaptureError::GeolocationFailed {
                reason: GeolocationError::PermissionDenied
            }
        );
        assert_eq!(controller.phase(), CapturePhase::Failed(err));
        assert!(library.store().list_all().await.unwrap().is_empty());
        assert!(library.snapshot().is_empty());
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_geolocation_timeout() {
        let settings = CaptureSettings {
            geolocation_timeout: Duration::from_millis(20),
            ..CaptureSettings::default()
        };
        let (controller, library) = controller_with(StillFrames, NeverAnswers, settings);

        let err = controller.capture(None).await.unwrap_err();

        assert_eq!(
            err,
            CaptureError::GeolocationFailed {
                reason: GeolocationError::Timeout
            }
        );
        assert_eq!(library.store().count().await.unwrap(), 0);
        assert_eq!(controller.locate().await, Err(GeolocationError::Timeout));
    }

    #[tokio::test]
    async fn test_missing_title_when_required() {
        let settings = CaptureSettings {
            require_title: true,
            ..CaptureSettings::default()
        };
        let (controller, library) = controller_with(StillFrames, FixedAt(Ok(HERE)), settings);

        let err = controller.capture(Some("  ".to_string())).await.unwrap_err();
        assert!(matches!(err, CaptureError::ValidationFailed(_)));
        assert_eq!(controller.phase(), CapturePhase::Idle);
        assert_eq!(library.store().count().await.unwrap(), 0);

        let outcome = controller.capture(Some("Sé".to_string())).await.unwrap();
        assert_eq!(outcome.record.title.as_deref(), Some("Sé"));
    }

    #[tokio::test]
    async fn test_frame_failure_aborts_before_geotagging() {
        let (controller, library) =
            controller_with(DeadFrames, FixedAt(Ok(HERE)), CaptureSettings::default());

        let err = controller.capture(None).await.unwrap_err();

        assert_eq!(err, CaptureError::Frame(FrameError::NoSignal));
        assert_eq!(library.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_buffer_unchanged() {
        let (controller, library) =
            controller_with(StillFrames, FixedAt(Ok(HERE)), CaptureSettings::default());
        controller.capture(None).await.unwrap();

        library.store().execute_raw("DROP TABLE photos");

        let err = controller.capture(None).await.unwrap_err();
        assert!(matches!(err, CaptureError::Store(StoreError::WriteFailed(_))));
        assert_eq!(ids(&library.snapshot()), vec![1]);
        assert!(matches!(controller.phase(), CapturePhase::Failed(_)));
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_rejected() {
        let gate = Arc::new(Notify::new());
        let (controller, library) = controller_with(
            StillFrames,
            Gated {
                gate: Arc::clone(&gate),
            },
            CaptureSettings::default(),
        );

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.capture(Some("first".to_string())).await }
        });

        while controller.phase() != CapturePhase::Geotagging {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_busy());
        assert_eq!(controller.capture(None).await.unwrap_err(), CaptureError::Busy);

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();

        assert_eq!(outcome.record.id, 1);
        assert_eq!(library.store().count().await.unwrap(), 1);
        assert!(!controller.is_busy());
    }
}
