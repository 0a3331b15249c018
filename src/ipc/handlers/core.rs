use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(
        &req.id,
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "authMode": state.config.auth.mode,
            "captchaRequired": state.config.auth.captcha.is_some(),
            "rosterSize": state.roster.len(),
            "openSessions": state.sessions.len(),
        })),
    )
}

/// Opens (creating if needed) the attendance database under `path`.
pub fn select_workspace(state: &mut AppState, path: PathBuf) -> Result<serde_json::Value, HandlerErr> {
    let storage = &state.config.storage;
    match db::open_db(&path, &storage.db_file, &storage.legacy_semester) {
        Ok(conn) => {
            info!(workspace = %path.display(), "workspace opened");
            state.workspace = Some(path.clone());
            state.db = Some(conn);
            Ok(json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => {
            error!(workspace = %path.display(), error = %e, "workspace open failed");
            Err(HandlerErr::from(e).with_details(json!({ "path": path.to_string_lossy() })))
        }
    }
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = get_required_str(&req.params, "path")
        .and_then(|p| select_workspace(state, PathBuf::from(p)));
    respond(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
