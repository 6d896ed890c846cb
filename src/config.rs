use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::models::Session;

/// Completion-service endpoint settings. The endpoint is OpenAI-compatible;
/// only the key is secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.3-70b-versatile".into(),
            api_key: None,
        }
    }
}

/// Session configuration handed from the setup screen to the monitoring
/// screen, standing in for the browser's local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandoff {
    pub task_name: String,
    pub duration_min: u32,
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    #[serde(default)]
    completion: CompletionSettings,
    #[serde(default)]
    youtube_api_key: Option<String>,
    #[serde(default)]
    pending_session: Option<SessionHandoff>,
    #[serde(default)]
    last_completed: Option<Session>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn completion(&self) -> CompletionSettings {
        self.data.read().unwrap().completion.clone()
    }

    pub fn update_completion(&self, settings: CompletionSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.completion = settings;
        self.persist(&guard)
    }

    pub fn youtube_api_key(&self) -> Option<String> {
        self.data.read().unwrap().youtube_api_key.clone()
    }

    pub fn set_youtube_api_key(&self, key: Option<String>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.youtube_api_key = key;
        self.persist(&guard)
    }

    /// Stage a session plan for the monitoring screen to pick up.
    pub fn set_pending_session(&self, handoff: SessionHandoff) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.pending_session = Some(handoff);
        self.persist(&guard)
    }

    /// Consume the staged session plan, if any.
    pub fn take_pending_session(&self) -> Result<Option<SessionHandoff>> {
        let mut guard = self.data.write().unwrap();
        let handoff = guard.pending_session.take();
        self.persist(&guard)?;
        Ok(handoff)
    }

    /// Result handoff: the most recently completed session, for the summary
    /// screen.
    pub fn record_last_completed(&self, session: Session) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.last_completed = Some(session);
        self.persist(&guard)
    }

    pub fn last_completed(&self) -> Option<Session> {
        self.data.read().unwrap().last_completed.clone()
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
