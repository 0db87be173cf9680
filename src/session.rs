//! Hologram session
//!
//! The owning context of a camera: it listens to the calibration registry,
//! keeps the list of known serials, waits for the first calibration and
//! resyncs viewports after every calibration change. Everything it starts is
//! cancelled when it is torn down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::calibration::{CalibrationRegistry, SubscriptionId, WaitCancelled};
use crate::camera::{CalibrationUpdate, CameraListener, HologramCamera, NoopListener};
use crate::display::{sync_display_target, GameViewport, SyncReport, ViewportId, ViewportRegistry};
use crate::quilt::QuiltPresetResolver;
use crate::settings::HostConfig;

/// State shared with the registry subscription
#[derive(Default)]
struct SessionShared {
    serial_names: RwLock<Vec<String>>,
    /// Signalled on every calibration change
    resync: Notify,
    changes: AtomicU64,
}

/// Result of the startup wait
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    /// A calibration showed up before the timeout
    pub calibrations_available: bool,
    pub serial_names: Vec<String>,
}

/// A camera plus the viewports showing it
pub struct HologramSession {
    registry: Arc<CalibrationRegistry>,
    config: HostConfig,
    camera: Mutex<HologramCamera>,
    viewports: Mutex<ViewportRegistry>,
    listener: Mutex<Box<dyn CameraListener + Send>>,
    quilt_resolver: QuiltPresetResolver,
    cancel: CancellationToken,
    subscription: Mutex<Option<SubscriptionId>>,
    shared: Arc<SessionShared>,
}

impl HologramSession {
    /// Create a session with a fresh camera emulating the configured default device
    pub fn new(registry: Arc<CalibrationRegistry>, config: HostConfig) -> Self {
        let camera = HologramCamera::new(config.default_emulated_device);
        Self::with_camera(registry, config, camera)
    }

    /// Create a session around an existing camera
    pub fn with_camera(
        registry: Arc<CalibrationRegistry>,
        config: HostConfig,
        camera: HologramCamera,
    ) -> Self {
        let shared = Arc::new(SessionShared::default());
        *shared.serial_names.write() = registry.serials();

        let handler_shared = shared.clone();
        let subscription = registry.subscribe(move |snapshot| {
            *handler_shared.serial_names.write() = snapshot.serials();
            handler_shared.changes.fetch_add(1, Ordering::SeqCst);
            handler_shared.resync.notify_one();
        });

        tracing::debug!("HologramSession: subscribed to calibration changes");

        Self {
            registry,
            quilt_resolver: QuiltPresetResolver::new(config.default_emulated_device),
            config,
            camera: Mutex::new(camera),
            viewports: Mutex::new(ViewportRegistry::new()),
            listener: Mutex::new(Box::new(NoopListener)),
            cancel: CancellationToken::new(),
            subscription: Mutex::new(Some(subscription)),
            shared,
        }
    }

    /// Route camera output changes to `listener`
    pub fn set_listener(&self, listener: Box<dyn CameraListener + Send>) {
        *self.listener.lock() = listener;
    }

    pub fn registry(&self) -> &Arc<CalibrationRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Token cancelled on teardown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Serials of the known displays, as of the last change seen
    pub fn serial_names(&self) -> Vec<String> {
        self.shared.serial_names.read().clone()
    }

    /// Calibration changes seen since creation
    pub fn change_count(&self) -> u64 {
        self.shared.changes.load(Ordering::SeqCst)
    }

    /// The emulated device is only a meaningful choice with no display
    /// attached and no manual calibration in use
    pub fn emulated_device_editable(&self) -> bool {
        self.registry.is_empty() && self.camera.lock().calibration_override().is_none()
    }

    /// Run `f` with the camera locked
    pub fn with_camera_mut<R>(&self, f: impl FnOnce(&mut HologramCamera) -> R) -> R {
        f(&mut self.camera.lock())
    }

    /// Copy of the camera
    pub fn camera(&self) -> HologramCamera {
        self.camera.lock().clone()
    }

    pub fn register_viewport(&self, viewport: Box<dyn GameViewport>) -> ViewportId {
        self.viewports.lock().register(viewport)
    }

    pub fn unregister_viewport(&self, id: ViewportId) -> bool {
        self.viewports.lock().unregister(id)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Calibration flow
    // ───────────────────────────────────────────────────────────────────────

    /// Wait for the first calibration, then refresh the serial list.
    ///
    /// Returns `Err(WaitCancelled)` without touching any state if the session
    /// is torn down first.
    pub async fn refresh_after_calibrations(&self) -> Result<RefreshReport, WaitCancelled> {
        let available = self
            .registry
            .wait_for_any_or_cancel(self.config.calibration_wait(), &self.cancel)
            .await?;

        let serial_names = self.registry.serials();
        *self.shared.serial_names.write() = serial_names.clone();
        tracing::info!(
            available,
            count = serial_names.len(),
            "HologramSession: calibrations refreshed"
        );

        Ok(RefreshReport {
            calibrations_available: available,
            serial_names,
        })
    }

    /// Re-resolve the camera against the current calibrations
    pub fn update_calibration(&self) -> CalibrationUpdate {
        let mut camera = self.camera.lock();
        let mut listener = self.listener.lock();
        camera.update_calibration(&self.registry, &self.quilt_resolver, listener.as_mut())
    }

    /// Push the camera's output resolution to its viewports
    pub fn update_user_game_views(&self) -> SyncReport {
        let (target_display, calibration, emulated) = {
            let mut camera = self.camera.lock();
            let target = camera.resolve_target(&self.registry);
            (
                camera.target_display(),
                target.calibration().cloned(),
                camera.emulated_target(),
            )
        };

        let mut viewports = self.viewports.lock();
        sync_display_target(
            &mut viewports,
            target_display,
            calibration.as_ref(),
            emulated.profile(),
        )
    }

    /// Wait for the next calibration change, let it settle for the resync
    /// delay, then resync viewports.
    pub async fn next_resync(&self) -> Result<SyncReport, WaitCancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(WaitCancelled),
            _ = self.shared.resync.notified() => {}
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(WaitCancelled),
            _ = tokio::time::sleep(self.config.resync_delay()) => {}
        }

        self.update_calibration();
        let report = self.update_user_game_views();
        tracing::debug!(
            updated = report.updated,
            failed = report.failed,
            "HologramSession: viewports resynced"
        );
        Ok(report)
    }

    /// Resync viewports after every calibration change until torn down
    pub async fn run(&self) {
        while self.next_resync().await.is_ok() {}
        tracing::debug!("HologramSession: resync loop stopped");
    }

    /// Cancel outstanding waits and stop listening to the registry.
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        self.cancel.cancel();
        if let Some(id) = self.subscription.lock().take() {
            self.registry.unsubscribe(id);
            tracing::debug!("HologramSession: torn down");
        }
    }
}

impl Drop for HologramSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
