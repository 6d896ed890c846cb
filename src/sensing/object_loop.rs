use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::stats::StatsRecorder;
use crate::vision::{CameraStream, ObjectDetector};

/// The object pass is cheaper and runs well below the face cadence.
const OBJECT_TICK: Duration = Duration::from_millis(200);

const PHONE_LABEL: &str = "cell phone";
const PHONE_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Generic object detection over the shared camera stream, filtered to
/// phone-like detections. Matches feed the throttled phone counter.
pub(super) async fn object_loop(
    detector: Arc<dyn ObjectDetector>,
    camera: Arc<Mutex<Box<dyn CameraStream>>>,
    stats: StatsRecorder,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(OBJECT_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

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

                let detections = match detector.detect(&frame) {
                    Ok(detections) => detections,
                    Err(err) => {
                        warn!("object inference failed, skipping frame: {err}");
                        continue;
                    }
                };

                let phone = detections
                    .iter()
                    .find(|d| d.label == PHONE_LABEL && d.score > PHONE_CONFIDENCE_THRESHOLD);

                if let Some(phone) = phone {
                    warn!("Cell phone detected (score {:.2})", phone.score);
                    stats.record_phone_detection().await;
                }
            }
            _ = cancel_token.cancelled() => {
                info!("object loop shutting down");
                break;
            }
        }
    }
}
