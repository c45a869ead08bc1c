use crate::controllers::App;
use crate::error::AppResult;
use crate::ipc::helpers::{get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn auth_init(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let route = app.boot();
    let user = app.store().current_user().map(|u| u.public_json());
    Ok(json!({
        "route": route,
        "user": user,
        "view": app.surface().current_json(),
    }))
}

fn auth_login(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let email = get_required_str(params, "email")?;
    let password = get_required_str(params, "password")?;
    let (user, route) = app.login(&email, &password)?;
    Ok(json!({
        "user": user.public_json(),
        "route": route,
        "view": app.surface().current_json(),
    }))
}

fn auth_logout(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let route = app.logout();
    Ok(json!({
        "route": route,
        "view": app.surface().current_json(),
    }))
}

fn auth_session(app: &mut App, _params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let user = app.session_user();
    Ok(json!({ "user": user.map(|u| u.public_json()) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.init" => Some(with_app(state, req, auth_init)),
        "auth.login" => Some(with_app(state, req, auth_login)),
        "auth.logout" => Some(with_app(state, req, auth_logout)),
        "auth.session" => Some(with_app(state, req, auth_session)),
        _ => None,
    }
}
