use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use crate::auth::AuthService;
use crate::completion::CompletionClient;
use crate::config::SettingsStore;
use crate::db::Database;
use crate::session::SessionController;

/// Composition root: wires the store, settings, auth, completion client and
/// the session controller together for the embedding shell.
pub struct App {
    pub db: Database,
    pub settings: SettingsStore,
    pub auth: AuthService,
    pub completion: CompletionClient,
    pub monitor: SessionController,
}

impl App {
    pub fn bootstrap(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("smartfocus.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let completion = CompletionClient::new(settings.completion())
            .context("failed to construct completion client")?;
        let auth = AuthService::new(db.clone());
        let monitor = SessionController::new(db.clone());

        info!("SmartFocus engine ready");

        Ok(Self {
            db,
            settings,
            auth,
            completion,
            monitor,
        })
    }
}

/// Initialize logging for the hosting process (reads RUST_LOG).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
