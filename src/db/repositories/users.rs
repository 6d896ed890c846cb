use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{parse_datetime, to_i64, to_u64, Database};
use crate::models::User;

fn row_to_user(row: &Row) -> Result<User> {
    let created_at: String = row.get("created_at")?;
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        total_points: to_u64(row.get("total_points")?, "total_points")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_user(&self, user: &User, password_hash: &str) -> Result<()> {
        let record = user.clone();
        let password_hash = password_hash.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password_hash, total_points, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.email,
                    password_hash,
                    to_i64(record.total_points)?,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, name, email, total_points, created_at
                 FROM users WHERE id = ?1",
                params![user_id],
                |row| Ok(row_to_user(row)),
            )
            .optional()?
            .transpose()
        })
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, name, email, total_points, created_at
                 FROM users WHERE email = ?1",
                params![email],
                |row| Ok(row_to_user(row)),
            )
            .optional()?
            .transpose()
        })
        .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let email = email.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    /// Stored password hash for a sign-in attempt, keyed by email.
    pub async fn get_password_hash(&self, email: &str) -> Result<Option<String>> {
        let email = email.to_string();
        self.execute(move |conn| {
            let hash = conn
                .query_row(
                    "SELECT password_hash FROM users WHERE email = ?1",
                    params![email],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(hash)
        })
        .await
    }

    /// Increment a user's cumulative point total by a session's award.
    pub async fn add_points(&self, user_id: &str, points: u32) -> Result<()> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE users SET total_points = total_points + ?1 WHERE id = ?2",
                params![i64::from(points), user_id],
            )?;
            Ok(())
        })
        .await
    }

    /// All users ordered by cumulative points, highest first.
    pub async fn leaderboard(&self) -> Result<Vec<User>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, total_points, created_at
                 FROM users
                 ORDER BY total_points DESC, name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(row_to_user(row)?);
            }
            Ok(users)
        })
        .await
    }
}
