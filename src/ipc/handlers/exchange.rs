use crate::exchange::{self, FileFormat};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str, require_db, require_session};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn parse_format(raw: Option<String>) -> Result<Option<FileFormat>, HandlerErr> {
    match raw.as_deref().map(|s| s.to_ascii_lowercase()).as_deref() {
        None => Ok(None),
        Some("csv") => Ok(Some(FileFormat::Csv)),
        Some("xlsx") => Ok(Some(FileFormat::Xlsx)),
        Some(other) => Err(HandlerErr::bad_params(format!(
            "format must be csv or xlsx, got '{}'",
            other
        ))),
    }
}

fn import(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_session(state, req)?;
    let conn = require_db(state)?;
    let in_path = get_required_str(&req.params, "inPath")?.trim().to_string();
    if in_path.is_empty() {
        return Err(HandlerErr::bad_params("missing inPath"));
    }
    let requested = parse_format(get_optional_str(&req.params, "format")?)?;

    let path = PathBuf::from(&in_path);
    let bytes = std::fs::read(&path).map_err(|e| {
        HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": in_path }))
    })?;
    let format = requested.unwrap_or_else(|| FileFormat::detect(&path, &bytes));

    // Every row is mapped before the first insert, so a bad file changes nothing.
    let rows = exchange::read_import(&bytes, format).map_err(|e| {
        warn!(path = %in_path, error = %e, "import rejected");
        HandlerErr::from(e)
    })?;
    let imported = store::append_bulk(conn, &rows)?;
    info!(path = %in_path, rows = imported, format = format.as_str(), "import appended");
    Ok(json!({
        "ok": true,
        "imported": imported,
        "format": format.as_str(),
        "path": in_path,
    }))
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, import(state, req))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exchange.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
