use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::roster::Roster;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub students: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    /// Period labels the entry form offers. Empty accepts any label.
    #[serde(default = "default_periods")]
    pub periods: Vec<String>,
    /// Semester stamped on new roll-calls when the request names none.
    #[serde(default)]
    pub semester: Option<String>,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            periods: default_periods(),
            semester: None,
        }
    }
}

fn default_periods() -> Vec<String> {
    (1..=6).map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    Accounts,
    SharedPassword,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub shared_password: Option<String>,
    #[serde(default)]
    pub captcha: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_file")]
    pub db_file: String,
    /// Value read by rows that predate the semester column.
    #[serde(default = "default_legacy_semester")]
    pub legacy_semester: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            legacy_semester: default_legacy_semester(),
        }
    }
}

fn default_db_file() -> String {
    "attendance.sqlite3".to_string()
}

fn default_legacy_semester() -> String {
    "2025-2".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads the TOML file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.to_string_lossy()))?;
        Self::parse(&text)
            .with_context(|| format!("invalid config {}", path.to_string_lossy()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        if config.auth.mode == AuthMode::SharedPassword
            && config
                .auth
                .shared_password
                .as_deref()
                .map(str::is_empty)
                .unwrap_or(true)
        {
            anyhow::bail!("auth.mode = \"shared_password\" requires auth.shared_password");
        }
        Ok(config)
    }

    pub fn roster(&self) -> Roster {
        Roster::new(self.roster.students.clone())
    }

    pub fn log_summary(&self) {
        info!(
            students = self.roster.students.len(),
            periods = self.attendance.periods.len(),
            auth_mode = ?self.auth.mode,
            db_file = %self.storage.db_file,
            "configuration loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").expect("parse empty config");
        assert!(config.roster.students.is_empty());
        assert_eq!(config.attendance.periods.len(), 6);
        assert_eq!(config.auth.mode, AuthMode::Accounts);
        assert_eq!(config.storage.db_file, "attendance.sqlite3");
        assert_eq!(config.storage.legacy_semester, "2025-2");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
            [roster]
            students = ["Bravo", "Alpha"]

            [attendance]
            periods = []
            semester = "2026-1"

            [auth]
            mode = "shared_password"
            shared_password = "letmein"
            captcha = "7741"
            "#,
        )
        .expect("parse config");
        assert_eq!(config.roster.students, vec!["Bravo", "Alpha"]);
        assert!(config.attendance.periods.is_empty());
        assert_eq!(config.attendance.semester.as_deref(), Some("2026-1"));
        assert_eq!(config.auth.mode, AuthMode::SharedPassword);
        assert_eq!(config.auth.captcha.as_deref(), Some("7741"));
    }

    #[test]
    fn shared_password_mode_requires_password() {
        let err = Config::parse("[auth]\nmode = \"shared_password\"\n").unwrap_err();
        assert!(err.to_string().contains("shared_password"));
    }
}
