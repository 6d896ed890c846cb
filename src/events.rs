use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::Session;
use crate::session::SessionState;
use crate::stats::SessionStats;
use crate::vision::{AttentionState, LandmarkPoint};

/// Engine-to-shell event stream. The embedding UI subscribes and renders;
/// nothing in the engine depends on anyone listening.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MonitorEvent {
    PhaseChanged {
        state: SessionState,
    },
    Heartbeat {
        state: SessionState,
        stats: SessionStats,
    },
    AttentionChanged {
        state: AttentionState,
    },
    /// Landmarks of the first detected face, emitted only while the mesh
    /// overlay toggle is on. Cosmetic; carries no behavioral weight.
    FaceLandmarks {
        points: Vec<LandmarkPoint>,
    },
    /// Fired once per session when focus first drops below the break
    /// threshold.
    BreakPrompt {
        focus_percent: u8,
    },
    SessionCompleted {
        session: Session,
    },
}

pub type EventSender = broadcast::Sender<MonitorEvent>;
pub type EventReceiver = broadcast::Receiver<MonitorEvent>;
