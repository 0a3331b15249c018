use crate::accounts;
use crate::config::AuthMode;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str, require_db};
use crate::ipc::types::{AppState, Request};
use crate::session;
use serde_json::json;
use tracing::{info, warn};

const SHARED_DISPLAY_NAME: &str = "Class monitor";

fn check_captcha(state: &AppState, params: &serde_json::Value) -> Result<(), HandlerErr> {
    let Some(expected) = state.config.auth.captcha.as_deref() else {
        return Ok(());
    };
    let supplied = get_optional_str(params, "captcha")?;
    if supplied.as_deref() != Some(expected) {
        return Err(HandlerErr::new("auth_failed", "captcha mismatch"));
    }
    Ok(())
}

fn auth_register(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    if state.config.auth.mode == AuthMode::SharedPassword {
        return Err(HandlerErr::new(
            "auth_failed",
            "registration is disabled in shared-password mode",
        ));
    }
    let conn = require_db(state)?;
    let username = get_required_str(params, "username")?;
    let password = get_required_str(params, "password")?;
    let full_name = get_required_str(params, "fullName")?;

    let account = accounts::register(conn, username.trim(), &password, full_name.trim())
        .map_err(|e| {
            warn!(username = %username, error = %e, "registration rejected");
            HandlerErr::from(e)
        })?;
    session::remember_user(conn, &account.username)?;
    info!(username = %account.username, "account registered");
    Ok(json!({
        "username": account.username,
        "fullName": account.full_name,
    }))
}

fn auth_login(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    check_captcha(state, params)?;
    let password = get_required_str(params, "password")?;

    let (username, full_name) = match state.config.auth.mode {
        AuthMode::Accounts => {
            let conn = require_db(state)?;
            let username = get_required_str(params, "username")?;
            let account = accounts::verify(conn, username.trim(), &password).map_err(|e| {
                warn!(username = %username, "login failed");
                HandlerErr::from(e)
            })?;
            session::remember_user(conn, &account.username)?;
            (Some(account.username), account.full_name)
        }
        AuthMode::SharedPassword => {
            let expected = state.config.auth.shared_password.as_deref().unwrap_or_default();
            accounts::verify_shared(expected, &password).map_err(|e| {
                warn!("shared-password login failed");
                HandlerErr::from(e)
            })?;
            (None, SHARED_DISPLAY_NAME.to_string())
        }
    };

    let token = state.sessions.open(username.clone(), full_name.clone());
    info!(username = ?username, "session opened");
    Ok(json!({
        "session": token,
        "username": username,
        "fullName": full_name,
    }))
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = auth_register(state, &req.params);
    respond(&req.id, result)
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = auth_login(state, &req.params);
    respond(&req.id, result)
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let token = req
        .session
        .clone()
        .or_else(|| get_optional_str(&req.params, "session").ok().flatten());
    let logged_out = token
        .as_deref()
        .map(|t| state.sessions.logout(t))
        .unwrap_or(false);
    if logged_out {
        info!(
            remaining = state.sessions.len(),
            idle = state.sessions.is_empty(),
            "session closed"
        );
    }
    respond(&req.id, Ok(json!({ "loggedOut": logged_out })))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = state.sessions.get(req.session.as_deref());
    respond(&req.id, Ok(session.to_json()))
}

fn handle_remembered(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = require_db(state).and_then(|conn| {
        let username = session::remembered_user(conn)?;
        Ok(json!({ "username": username }))
    });
    respond(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.register" => Some(handle_register(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.status" => Some(handle_status(state, req)),
        "auth.remembered" => Some(handle_remembered(state, req)),
        _ => None,
    }
}
