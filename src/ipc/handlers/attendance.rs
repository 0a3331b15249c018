use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_optional_str, require_db, require_session};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use crate::store::{self, NewRecord, QueryFilter, RollCallKey, ABSENT, PRESENT};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

fn validation(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("validation_failed", message)
}

/// Accepts `YYYY-MM-DD` only and returns it normalized.
pub fn parse_date(raw: &str, key: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

fn parse_optional_date(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    get_optional_str(params, key)?
        .map(|d| parse_date(&d, key))
        .transpose()
}

/// Reads the shared row filters used by listing, exports and statistics.
pub fn parse_filter(params: &serde_json::Value) -> Result<QueryFilter, HandlerErr> {
    Ok(QueryFilter {
        date: parse_optional_date(params, "date")?,
        date_from: parse_optional_date(params, "dateFrom")?,
        date_to: parse_optional_date(params, "dateTo")?,
        semester: get_optional_str(params, "semester")?,
        student_name: get_optional_str(params, "studentName")?,
    })
}

fn parse_absent_list(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    let Some(v) = params.get("absent") else {
        return Ok(Vec::new());
    };
    if v.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = v.as_array() else {
        return Err(HandlerErr::bad_params("absent must be an array of names"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| HandlerErr::bad_params("absent must be an array of names"))
        })
        .collect()
}

fn roll_call(
    state: &AppState,
    conn: &Connection,
    session: &Session,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject = get_optional_str(params, "subject")?
        .ok_or_else(|| validation("subject is required"))?;
    let date = match get_optional_str(params, "date")? {
        Some(d) => parse_date(&d, "date")?,
        None => chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
    };
    let period = get_optional_str(params, "period")?
        .ok_or_else(|| validation("period is required"))?;
    let periods = &state.config.attendance.periods;
    if !periods.is_empty() && !periods.contains(&period) {
        return Err(validation(format!("unknown period '{}'", period))
            .with_details(json!({ "periods": periods })));
    }
    let semester = get_optional_str(params, "semester")?
        .or_else(|| state.config.attendance.semester.clone());

    if state.roster.is_empty() {
        return Err(validation("roster is empty"));
    }
    let absent: HashSet<String> = parse_absent_list(params)?.into_iter().collect();
    let unknown: Vec<&String> = absent
        .iter()
        .filter(|name| !state.roster.contains(name))
        .collect();
    if !unknown.is_empty() {
        return Err(validation("absent list names students outside the roster")
            .with_details(json!({ "unknown": unknown })));
    }

    let moderator = session.username().map(|u| u.to_string());
    let entries: Vec<NewRecord> = state
        .roster
        .students()
        .iter()
        .map(|name| NewRecord {
            student_name: name.clone(),
            date: date.clone(),
            period: period.clone(),
            subject: subject.clone(),
            status: if absent.contains(name) { ABSENT } else { PRESENT }.to_string(),
            moderator: moderator.clone(),
            semester: semester.clone(),
        })
        .collect();

    let key = RollCallKey {
        date: date.clone(),
        period: period.clone(),
        subject: subject.clone(),
        moderator: moderator.clone(),
    };
    let already_recorded = store::roll_call_exists(conn, &key)?;
    let ids = store::record_roll_call(conn, &entries)?;
    info!(
        date = %date,
        period = %period,
        subject = %subject,
        rows = ids.len(),
        absent = absent.len(),
        already_recorded,
        "roll-call recorded"
    );

    Ok(json!({
        "inserted": ids.len(),
        "ids": ids,
        "absentCount": absent.len(),
        "alreadyRecorded": already_recorded,
        "date": date,
        "semester": semester,
    }))
}

fn handle_roll_call(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state, req).and_then(|session| {
        let conn = require_db(state)?;
        roll_call(state, conn, &session, &req.params)
    });
    respond(&req.id, result)
}

fn handle_query(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state, req).and_then(|_| {
        let conn = require_db(state)?;
        let filter = parse_filter(&req.params)?;
        let rows = store::query(conn, &filter)?;
        Ok(json!({
            "count": rows.len(),
            "rows": rows.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
        }))
    });
    respond(&req.id, result)
}

fn handle_roster_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_session(state, req).map(|_| {
        json!({
            "students": state.roster.sorted(),
            "periods": state.config.attendance.periods,
            "semester": state.config.attendance.semester,
        })
    });
    respond(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.list" => Some(handle_roster_list(state, req)),
        "attendance.rollCall" => Some(handle_roll_call(state, req)),
        "attendance.query" => Some(handle_query(state, req)),
        _ => None,
    }
}
