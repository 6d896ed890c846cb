use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::events::{EventSender, MonitorEvent};
use crate::stats::StatsRecorder;
use crate::vision::{classify_attention, AttentionState, CameraStream, FaceLandmarker};

/// Display-refresh cadence for the landmark pass.
const FACE_TICK: Duration = Duration::from_millis(33);

/// Per-frame face pass: landmark inference, attention classification, and
/// the optional mesh overlay feed. A failed tick is logged and skipped; the
/// loop only stops on cancellation.
pub(super) async fn face_loop(
    face: Arc<dyn FaceLandmarker>,
    camera: Arc<Mutex<Box<dyn CameraStream>>>,
    stats: StatsRecorder,
    events: EventSender,
    show_mesh: Arc<AtomicBool>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(FACE_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_state: Option<AttentionState> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = {
                    let mut camera = camera.lock().await;
                    match camera.latest_frame() {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!("camera read failed: {err}");
                            None
                        }
                    }
                };

                let Some(frame) = frame else { continue };
                if !frame.is_decodable() {
                    continue;
                }

                let observations = match face.detect(&frame) {
                    Ok(observations) => observations,
                    Err(err) => {
                        warn!("face inference failed, skipping frame: {err}");
                        continue;
                    }
                };

                let Some(first) = observations.first() else { continue };

                let state = classify_attention(&first.blendshapes);
                stats.record_attention(state).await;

                if last_state != Some(state) {
                    last_state = Some(state);
                    let _ = events.send(MonitorEvent::AttentionChanged { state });
                }

                if show_mesh.load(Ordering::Relaxed) && !first.landmarks.is_empty() {
                    let _ = events.send(MonitorEvent::FaceLandmarks {
                        points: first.landmarks.clone(),
                    });
                }
            }
            _ = cancel_token.cancelled() => {
                info!("face loop shutting down");
                break;
            }
        }
    }
}
