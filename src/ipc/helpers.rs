use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use super::error::{err, respond};
use super::types::{AppState, Request};
use crate::controllers::App;
use crate::error::{AppError, AppResult};

pub fn get_required_str(params: &serde_json::Value, key: &str) -> AppResult<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Validation(format!("missing {}", key)))
}

pub fn get_required_bool(params: &serde_json::Value, key: &str) -> AppResult<bool> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| AppError::Validation(format!("missing {}", key)))
}

/// `YYYY-MM-DD`.
pub fn get_required_date(params: &serde_json::Value, key: &str) -> AppResult<NaiveDate> {
    let raw = get_required_str(params, key)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{} must be YYYY-MM-DD", key)))
}

/// Deserializes `params[key]`, reporting shape errors as bad params.
pub fn get_required<T: DeserializeOwned>(params: &serde_json::Value, key: &str) -> AppResult<T> {
    let Some(v) = params.get(key) else {
        return Err(AppError::Validation(format!("missing {}", key)));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| AppError::Validation(format!("invalid {}: {}", key, e)))
}

/// Runs `f` against the open workspace, or answers `no_workspace`.
pub fn with_app<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&mut App, &serde_json::Value) -> AppResult<serde_json::Value>,
{
    let Some(app) = state.app.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    respond(&req.id, f(app, &req.params))
}
