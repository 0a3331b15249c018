#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ROSTER_CONFIG: &str = r#"
[roster]
students = ["Zinchenko Maksym", "Adamliuk Vladyslav", "Kysil Yana"]

[attendance]
periods = ["1", "2", "3", "4", "5", "6"]
semester = "2025-2"
"#;

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawns the binary with `config` written next to the workspace.
pub fn spawn_sidecar(dir: &Path, config: &str) -> Sidecar {
    let config_path = dir.join("logbook.toml");
    std::fs::write(&config_path, config).expect("write config");
    let exe = env!("CARGO_BIN_EXE_logbookd");
    let mut child = Command::new(exe)
        .arg("--config")
        .arg(&config_path)
        .env_remove("LOGBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn logbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn request(
        &mut self,
        session: Option<&str>,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let mut payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        if let Some(token) = session {
            payload["session"] = json!(token);
        }
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(
        &mut self,
        session: Option<&str>,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let value = self.request(session, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Asserts failure and returns the error code.
    pub fn request_err(
        &mut self,
        session: Option<&str>,
        method: &str,
        params: serde_json::Value,
    ) -> String {
        let value = self.request(session, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn select_workspace(&mut self, workspace: &Path) {
        let _ = self.request_ok(
            None,
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
    }

    /// Registers `monitor` and returns a session token.
    pub fn register_and_login(&mut self) -> String {
        let _ = self.request_ok(
            None,
            "auth.register",
            json!({ "username": "monitor", "password": "s3cret", "fullName": "Kysil Yana" }),
        );
        let login = self.request_ok(
            None,
            "auth.login",
            json!({ "username": "monitor", "password": "s3cret" }),
        );
        login
            .get("session")
            .and_then(|v| v.as_str())
            .expect("session token")
            .to_string()
    }
}

pub fn rows(result: &serde_json::Value) -> Vec<serde_json::Value> {
    result
        .get("rows")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}
