use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::error::Result;

const REMEMBERED_USER_KEY: &str = "auth.remembered_user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated {
        /// `None` for shared-password logins.
        username: Option<String>,
        full_name: String,
    },
}

/// The session context handed to each request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub state: AuthState,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            token: None,
            state: AuthState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            AuthState::Authenticated { username, .. } => username.as_deref(),
            AuthState::Anonymous => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match &self.state {
            AuthState::Anonymous => json!({ "authenticated": false }),
            AuthState::Authenticated {
                username,
                full_name,
            } => json!({
                "authenticated": true,
                "session": self.token,
                "username": username,
                "fullName": full_name,
            }),
        }
    }
}

/// Issues tokens and tracks which ones are authenticated. Sessions never expire.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, AuthState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anonymous → Authenticated. Returns the new token. Entries are only
    /// removed by `logout`, so a client that never logs out keeps its
    /// sessions for the life of the process.
    pub fn open(&mut self, username: Option<String>, full_name: String) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            AuthState::Authenticated {
                username,
                full_name,
            },
        );
        token
    }

    /// Unknown or missing tokens read as anonymous.
    pub fn get(&self, token: Option<&str>) -> Session {
        let Some(token) = token else {
            return Session::anonymous();
        };
        match self.sessions.get(token) {
            Some(state) => Session {
                token: Some(token.to_string()),
                state: state.clone(),
            },
            None => Session::anonymous(),
        }
    }

    /// Authenticated → Anonymous. Returns whether the token was live.
    pub fn logout(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub fn remember_user(conn: &Connection, username: &str) -> Result<()> {
    db::settings_set_json(conn, REMEMBERED_USER_KEY, &json!(username))
}

pub fn remembered_user(conn: &Connection) -> Result<Option<String>> {
    Ok(db::settings_get_json(conn, REMEMBERED_USER_KEY)?
        .and_then(|v| v.as_str().map(|s| s.to_string())))
}
