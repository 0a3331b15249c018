use crate::exchange;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::handlers::attendance::parse_filter;
use crate::ipc::helpers::{get_bool, get_optional_str, get_required_str, require_db, require_session};
use crate::ipc::types::{AppState, Request};
use crate::stats;
use crate::store;
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info};

fn handle_absences(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state, req).and_then(|_| {
        let conn = require_db(state)?;
        let semester = get_optional_str(&req.params, "semester")?;
        let counts = if get_bool(&req.params, "includeRoster") {
            stats::absence_counts_with_roster(conn, semester.as_deref(), &state.roster)?
        } else {
            stats::absence_counts(conn, semester.as_deref())?
        };
        let total: i64 = counts.iter().map(|c| c.count).sum();
        Ok(json!({
            "semester": semester,
            "totalAbsences": total,
            "counts": counts
                .iter()
                .map(|c| json!({ "studentName": c.student_name, "count": c.count }))
                .collect::<Vec<_>>(),
        }))
    });
    respond(&req.id, result)
}

#[derive(Clone, Copy)]
enum ExportKind {
    Csv,
    Xlsx,
}

fn write_export(out_path: &str, bytes: &[u8]) -> Result<(), HandlerErr> {
    let out = PathBuf::from(out_path);
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": out_path }))
        })?;
    }
    std::fs::write(&out, bytes).map_err(|e| {
        HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": out_path }))
    })
}

fn export(state: &AppState, req: &Request, kind: ExportKind) -> Result<serde_json::Value, HandlerErr> {
    require_session(state, req)?;
    let conn = require_db(state)?;
    let out_path = get_required_str(&req.params, "outPath")?.trim().to_string();
    if out_path.is_empty() {
        return Err(HandlerErr::bad_params("missing outPath"));
    }
    let filter = parse_filter(&req.params)?;
    let rows = store::query(conn, &filter)?;
    let (bytes, format) = match kind {
        ExportKind::Csv => (exchange::export_csv(&rows), "csv"),
        ExportKind::Xlsx => (exchange::export_xlsx(&rows)?, "xlsx"),
    };
    if let Err(e) = write_export(&out_path, &bytes) {
        error!(path = %out_path, error = %e.message, "export failed");
        return Err(e);
    }
    info!(path = %out_path, rows = rows.len(), format, "export written");
    Ok(json!({ "ok": true, "rowsExported": rows.len(), "path": out_path, "format": format }))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, export(state, req, ExportKind::Csv))
}

fn handle_export_xlsx(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, export(state, req, ExportKind::Xlsx))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.absences" => Some(handle_absences(state, req)),
        "reports.exportCsv" => Some(handle_export_csv(state, req)),
        "reports.exportXlsx" => Some(handle_export_xlsx(state, req)),
        _ => None,
    }
}
