use anyhow::Result;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::{parse_datetime, to_i64, to_u32, to_u64, Database};
use crate::models::Session;
use crate::stats::SessionStats;

/// One row of the dashboard aggregation: daily average focus for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFocus {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub avg_focus_percent: f64,
}

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let duration_min: i64 = row.get("duration_min")?;
    let focus_percent: i64 = row.get("focus_percent")?;
    let points_awarded: i64 = row.get("points_awarded")?;

    let stats = SessionStats {
        distraction_seconds: to_u64(row.get("distraction_seconds")?, "distraction_seconds")?,
        looked_away_count: to_u64(row.get("looked_away_count")?, "looked_away_count")?,
        phone_detected_count: to_u64(row.get("phone_detected_count")?, "phone_detected_count")?,
        idle_timeout_count: to_u64(row.get("idle_timeout_count")?, "idle_timeout_count")?,
        tab_switch_count: to_u64(row.get("tab_switch_count")?, "tab_switch_count")?,
    };

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        session_name: row.get("session_name")?,
        duration_min: to_u32(duration_min, "duration_min")?,
        stats,
        focus_percent: u8::try_from(focus_percent)
            .map_err(|_| anyhow::anyhow!("focus_percent out of range: {focus_percent}"))?,
        points_awarded: to_u32(points_awarded, "points_awarded")?,
        video_url: row.get("video_url")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Persist one finished session. Rows are write-once; there is no update
    /// path.
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, session_name, duration_min,
                     distraction_seconds, looked_away_count, phone_detected_count,
                     idle_timeout_count, tab_switch_count, focus_percent,
                     points_awarded, video_url, started_at, ended_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id,
                    record.user_id,
                    record.session_name,
                    i64::from(record.duration_min),
                    to_i64(record.stats.distraction_seconds)?,
                    to_i64(record.stats.looked_away_count)?,
                    to_i64(record.stats.phone_detected_count)?,
                    to_i64(record.stats.idle_timeout_count)?,
                    to_i64(record.stats.tab_switch_count)?,
                    i64::from(record.focus_percent),
                    i64::from(record.points_awarded),
                    record.video_url,
                    record.started_at.to_rfc3339(),
                    record.ended_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Sessions owned by one user, most recent first.
    pub async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, session_name, duration_min, distraction_seconds,
                        looked_away_count, phone_detected_count, idle_timeout_count,
                        tab_switch_count, focus_percent, points_awarded, video_url,
                        started_at, ended_at, created_at
                 FROM sessions
                 WHERE user_id = ?1
                 ORDER BY started_at DESC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Average focus percent per day for one user, oldest day first. Backs
    /// the dashboard's focus-over-time chart.
    pub async fn daily_focus_for_user(&self, user_id: &str) -> Result<Vec<DailyFocus>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date(started_at) AS day, AVG(focus_percent) AS avg_focus
                 FROM sessions
                 WHERE user_id = ?1
                 GROUP BY day
                 ORDER BY day ASC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                days.push(DailyFocus {
                    date: row.get("day")?,
                    avg_focus_percent: row.get("avg_focus")?,
                });
            }
            Ok(days)
        })
        .await
    }
}
