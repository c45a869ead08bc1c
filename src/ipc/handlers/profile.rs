use crate::controllers::App;
use crate::error::AppResult;
use crate::ipc::helpers::{get_required, get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use crate::store::ProfilePatch;
use serde_json::json;

fn profile_update(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let patch: ProfilePatch = get_required(params, "updates")?;
    let user = app.update_profile(&patch)?;
    Ok(json!({
        "user": user.public_json(),
        "view": app.surface().current_json(),
    }))
}

fn profile_change_password(
    app: &mut App,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let current = get_required_str(params, "currentPassword")?;
    let new = get_required_str(params, "newPassword")?;
    app.change_password(&current, &new)?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "profile.update" => Some(with_app(state, req, profile_update)),
        "profile.changePassword" => Some(with_app(state, req, profile_change_password)),
        _ => None,
    }
}
