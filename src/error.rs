use thiserror::Error;

use crate::vision::VisionError;

/// Failures surfaced by the monitoring engine. Per-frame inference errors are
/// not represented here: they are logged and swallowed at the loop boundary.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("camera unavailable: {0}")]
    Device(String),

    #[error("inference backend failed to load: {0}")]
    ModelLoad(String),

    #[error("invalid session plan: {0}")]
    InvalidPlan(&'static str),

    #[error("monitoring already active")]
    AlreadyActive,

    #[error("no active session")]
    NotActive,

    #[error("cannot {action} while session is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl From<VisionError> for MonitorError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Device(msg) => MonitorError::Device(msg),
            VisionError::ModelLoad(msg) => MonitorError::ModelLoad(msg),
            // Inference errors stay at the loop boundary; one escaping to an
            // initialization path is a capability fault.
            VisionError::Inference(msg) => MonitorError::Device(msg),
        }
    }
}
