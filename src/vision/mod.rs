pub mod attention;

pub use attention::{classify_attention, AttentionState};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("camera device unavailable: {0}")]
    Device(String),

    #[error("model backend failed to load: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Handle to one decoded camera frame. A frame whose dimensions are still
/// zero has not finished decoding and must be skipped by the loops.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
}

impl VideoFrame {
    pub fn is_decodable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Blendshape category scores for one detected face. Categories the backend
/// did not report read as 0.0.
#[derive(Debug, Clone, Default)]
pub struct BlendshapeScores {
    scores: HashMap<String, f32>,
}

impl BlendshapeScores {
    pub fn score(&self, category: &str) -> f32 {
        self.scores.get(category).copied().unwrap_or(0.0)
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for BlendshapeScores {
    fn from_iter<T: IntoIterator<Item = (S, f32)>>(iter: T) -> Self {
        Self {
            scores: iter
                .into_iter()
                .map(|(name, score)| (name.into(), score))
                .collect(),
        }
    }
}

/// Normalized landmark coordinates, for the cosmetic mesh overlay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone)]
pub struct FaceObservation {
    pub blendshapes: BlendshapeScores,
    pub landmarks: Vec<LandmarkPoint>,
}

/// One generic object detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub label: String,
    pub score: f32,
}

/// Face-landmark model backend. Pre-trained model internals are opaque to the
/// engine; only this contract is consumed.
pub trait FaceLandmarker: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceObservation>, VisionError>;
}

/// Generic object-detection backend.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, VisionError>;
}

/// Live camera stream. `latest_frame` returns the newest frame or `None` when
/// nothing new has been decoded since the previous pull; there is no frame
/// queue, ticks that find nothing simply reschedule.
pub trait CameraStream: Send {
    fn latest_frame(&mut self) -> Result<Option<VideoFrame>, VisionError>;

    /// Stop all media tracks. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Constructs the inference backends and opens the camera. Implemented by the
/// embedding shell against whatever runtime hosts the pre-trained models.
pub trait CapabilityProvider: Send + Sync {
    fn load_face_landmarker(&self) -> Result<Arc<dyn FaceLandmarker>, VisionError>;

    fn load_object_detector(&self) -> Result<Arc<dyn ObjectDetector>, VisionError>;

    fn open_camera(&self) -> Result<Box<dyn CameraStream>, VisionError>;
}
