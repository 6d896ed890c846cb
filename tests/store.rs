use std::path::PathBuf;

use chrono::{Duration, Utc};

use smartfocus::db::Database;
use smartfocus::models::{Session, User};
use smartfocus::stats::SessionStats;

fn memory_db() -> Database {
    Database::new(PathBuf::from(":memory:")).expect("in-memory db")
}

fn user(id: &str, name: &str, points: u64) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: format!("{id}@example.com"),
        total_points: points,
        created_at: Utc::now(),
    }
}

fn session(id: &str, user_id: &str, days_ago: i64, focus_percent: u8) -> Session {
    let started_at = Utc::now() - Duration::days(days_ago);
    Session {
        id: id.into(),
        user_id: user_id.into(),
        session_name: "Study".into(),
        duration_min: 10,
        stats: SessionStats {
            distraction_seconds: 12,
            looked_away_count: 3,
            phone_detected_count: 1,
            idle_timeout_count: 0,
            tab_switch_count: 2,
        },
        focus_percent,
        points_awarded: 10,
        video_url: None,
        started_at,
        ended_at: started_at + Duration::minutes(10),
        created_at: started_at + Duration::minutes(10),
    }
}

#[tokio::test]
async fn sessions_list_newest_first_per_user() {
    let db = memory_db();
    db.insert_user(&user("u1", "Ada", 0), "hash").await.unwrap();
    db.insert_user(&user("u2", "Grace", 0), "hash").await.unwrap();

    db.insert_session(&session("s1", "u1", 3, 90)).await.unwrap();
    db.insert_session(&session("s2", "u1", 1, 80)).await.unwrap();
    db.insert_session(&session("s3", "u2", 0, 70)).await.unwrap();

    let sessions = db.list_sessions_for_user("u1").await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "s2");
    assert_eq!(sessions[1].id, "s1");
    assert_eq!(sessions[0].stats.looked_away_count, 3);
}

#[tokio::test]
async fn daily_focus_averages_per_day() {
    let db = memory_db();
    db.insert_user(&user("u1", "Ada", 0), "hash").await.unwrap();

    // Two sessions two days ago, one yesterday.
    db.insert_session(&session("s1", "u1", 2, 90)).await.unwrap();
    db.insert_session(&session("s2", "u1", 2, 70)).await.unwrap();
    db.insert_session(&session("s3", "u1", 1, 50)).await.unwrap();

    let days = db.daily_focus_for_user("u1").await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].avg_focus_percent, 80.0);
    assert_eq!(days[1].avg_focus_percent, 50.0);
    assert!(days[0].date < days[1].date);
}

#[tokio::test]
async fn leaderboard_orders_by_cumulative_points() {
    let db = memory_db();
    db.insert_user(&user("u1", "Ada", 5), "hash").await.unwrap();
    db.insert_user(&user("u2", "Grace", 20), "hash").await.unwrap();
    db.insert_user(&user("u3", "Edsger", 10), "hash").await.unwrap();

    db.add_points("u1", 30).await.unwrap();

    let board = db.leaderboard().await.unwrap();
    let names: Vec<&str> = board.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["Ada", "Grace", "Edsger"]);
    assert_eq!(board[0].total_points, 35);
}

#[tokio::test]
async fn duplicate_session_ids_are_rejected() {
    let db = memory_db();
    db.insert_user(&user("u1", "Ada", 0), "hash").await.unwrap();

    db.insert_session(&session("s1", "u1", 0, 90)).await.unwrap();
    assert!(db.insert_session(&session("s1", "u1", 0, 90)).await.is_err());
}
