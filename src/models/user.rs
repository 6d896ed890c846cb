use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account. Created at sign-up, never deleted; the cumulative
/// point total is the only field the engine mutates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub total_points: u64,
    pub created_at: DateTime<Utc>,
}
