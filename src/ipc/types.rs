use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::Config;
use crate::roster::Roster;
use crate::session::SessionRegistry;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// Token issued by `auth.login`.
    #[serde(default)]
    pub session: Option<String>,
}

pub struct AppState {
    pub config: Config,
    pub roster: Roster,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let roster = config.roster();
        Self {
            config,
            roster,
            workspace: None,
            db: None,
            sessions: SessionRegistry::new(),
        }
    }
}
