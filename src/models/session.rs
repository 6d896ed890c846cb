use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::SessionStats;

/// One finished monitoring interval. Written exactly once when the run ends
/// and immutable thereafter; owned by the user who ran it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub session_name: String,
    pub duration_min: u32,
    #[serde(flatten)]
    pub stats: SessionStats,
    /// Always in [0, 100].
    pub focus_percent: u8,
    pub points_awarded: u32,
    pub video_url: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
