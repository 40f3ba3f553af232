use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:3000";
const SESSION_FILE: &str = "session.json";

/// Session token persisted between CLI invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub server: String,
    pub token: String,
    pub email: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("GALLERY_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("gallery").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<StoredSession>> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(session: &StoredSession) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, session)
}

/// Returns true when a stored session was removed
pub fn clear_session() -> anyhow::Result<bool> {
    let session_file = get_config_dir()?.join(SESSION_FILE);
    if !session_file.exists() {
        return Ok(false);
    }
    fs::remove_file(session_file)?;
    Ok(true)
}

/// `--server`, else the server of the stored session, else the local default
pub fn resolve_server(explicit: Option<String>, session: Option<&StoredSession>) -> String {
    explicit
        .or_else(|| session.map(|s| s.server.clone()))
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn load_session_from(config_dir: &Path) -> anyhow::Result<Option<StoredSession>> {
    let session_file = config_dir.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let session: StoredSession = serde_json::from_str(&content)?;
    Ok(Some(session))
}

fn save_session_to(config_dir: &Path, session: &StoredSession) -> anyhow::Result<()> {
    let session_file = config_dir.join(SESSION_FILE);

    let content = serde_json::to_string_pretty(session)?;
    fs::write(session_file, content)?;
    Ok(())
}
