use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::db::Database;
use crate::models::User;

const MIN_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 3;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// The signed-in principal, mirroring the hosted auth collaborator's session
/// object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub signed_in_at: DateTime<Utc>,
}

/// Local account service over the row store: sign-up, sign-in, sign-out,
/// current-session fetch, and a state-change stream for listeners that need
/// to re-resolve the profile when the session flips.
pub struct AuthService {
    db: Database,
    session_tx: watch::Sender<Option<AuthSession>>,
}

impl AuthService {
    pub fn new(db: Database) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self { db, session_tx }
    }

    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = name.trim();
        let email = email.trim().to_ascii_lowercase();

        if name.len() < MIN_NAME_LEN {
            return Err(AuthError::InvalidInput(format!(
                "name must be at least {MIN_NAME_LEN} characters"
            )));
        }
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidInput("invalid email".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.db.email_exists(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.clone(),
            total_points: 0,
            created_at: Utc::now(),
        };

        let password_hash = hash_password(password)?;
        self.db.insert_user(&user, &password_hash).await?;
        info!("New user created: {}", user.id);

        self.set_session(Some(AuthSession {
            user: user.clone(),
            signed_in_at: Utc::now(),
        }));

        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = email.trim().to_ascii_lowercase();

        let stored_hash = self
            .db
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &stored_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .db
            .get_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let session = AuthSession {
            user,
            signed_in_at: Utc::now(),
        };
        self.set_session(Some(session.clone()));

        Ok(session)
    }

    pub fn sign_out(&self) {
        self.set_session(None);
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.session_tx.borrow().clone()
    }

    /// Auth-state-change stream: yields the new session (or `None`) whenever
    /// sign-in state flips.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session_tx.subscribe()
    }

    /// Re-read the signed-in user's row, picking up point totals awarded
    /// since sign-in.
    pub async fn refresh_profile(&self) -> Result<Option<User>, AuthError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };

        let user = self.db.get_user(&session.user.id).await?;
        if let Some(user) = user.clone() {
            self.set_session(Some(AuthSession {
                user,
                signed_in_at: session.signed_in_at,
            }));
        }
        Ok(user)
    }

    fn set_session(&self, session: Option<AuthSession>) {
        // send_replace stores the value even when no receiver is subscribed.
        let _ = self.session_tx.send_replace(session);
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
