use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use log::info;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::events::EventSender;
use crate::stats::StatsRecorder;
use crate::vision::{CameraStream, CapabilityProvider};

use super::activity::{activity_loop, ActivityHandle};
use super::face_loop::face_loop;
use super::object_loop::object_loop;

/// Acquires the camera and both inference backends exactly once per session
/// and owns the three background loops. Teardown cancels every loop, joins
/// them, and stops the media tracks; it is safe to invoke repeatedly.
pub struct SensingController {
    cancel_token: Option<CancellationToken>,
    workers: Vec<JoinHandle<()>>,
    camera: Option<Arc<Mutex<Box<dyn CameraStream>>>>,
    activity: Option<ActivityHandle>,
    show_mesh: Arc<AtomicBool>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            cancel_token: None,
            workers: Vec::new(),
            camera: None,
            activity: None,
            show_mesh: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel_token.is_some()
    }

    /// Initialize the capabilities and start the face, object and activity
    /// loops. Fails with `Device`/`ModelLoad` when a capability cannot be
    /// acquired, and with `AlreadyActive` on re-invocation.
    pub async fn start_sensing(
        &mut self,
        provider: &dyn CapabilityProvider,
        stats: StatsRecorder,
        events: EventSender,
    ) -> Result<(), MonitorError> {
        if self.is_active() {
            return Err(MonitorError::AlreadyActive);
        }

        let face = provider.load_face_landmarker()?;
        let object = provider.load_object_detector()?;
        let camera = Arc::new(Mutex::new(provider.open_camera()?));

        let cancel_token = CancellationToken::new();
        let (activity_tx, activity_rx) = mpsc::unbounded_channel();

        self.workers.push(tokio::spawn(face_loop(
            face,
            Arc::clone(&camera),
            stats.clone(),
            events,
            Arc::clone(&self.show_mesh),
            cancel_token.clone(),
        )));
        self.workers.push(tokio::spawn(object_loop(
            object,
            Arc::clone(&camera),
            stats.clone(),
            cancel_token.clone(),
        )));
        self.workers.push(tokio::spawn(activity_loop(
            activity_rx,
            stats,
            cancel_token.clone(),
        )));

        self.cancel_token = Some(cancel_token);
        self.camera = Some(camera);
        self.activity = Some(ActivityHandle::new(activity_tx));

        info!("Sensing started");
        Ok(())
    }

    /// Handle for the shell to push input/visibility events; `None` while
    /// sensing is inactive.
    pub fn activity_handle(&self) -> Option<ActivityHandle> {
        self.activity.clone()
    }

    /// Mesh overlay toggle. Purely cosmetic: it only controls whether the
    /// face loop emits landmark events.
    pub fn set_mesh_enabled(&self, enabled: bool) {
        self.show_mesh.store(enabled, Ordering::Relaxed);
    }

    pub fn mesh_enabled(&self) -> bool {
        self.show_mesh.load(Ordering::Relaxed)
    }

    /// Cancel all loops, join them, and stop the camera's media tracks.
    pub async fn stop_sensing(&mut self) -> Result<(), MonitorError> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.activity = None;

        for worker in self.workers.drain(..) {
            worker.await.context("sensing worker failed to join")?;
        }

        if let Some(camera) = self.camera.take() {
            camera.lock().await.stop();
        }

        Ok(())
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
