use crate::backup;
use crate::controllers::App;
use crate::error::{AppError, AppResult};
use crate::ipc::helpers::{get_required_str, with_app};
use crate::ipc::types::{AppState, Request};
use crate::store::DataStore;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn export_snapshot(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let (blobs, revision, user_count, course_count) = {
        let store = app.store();
        (
            store.snapshot_blobs()?,
            store.revision(),
            store.users().len(),
            store.courses().len(),
        )
    };
    let summary = backup::export_snapshot_bundle(&blobs, revision, &out_path)?;
    info!(path = %out_path.to_string_lossy(), revision, "snapshot exported");
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "revision": revision,
        "users": user_count,
        "courses": course_count,
        "outPath": out_path.to_string_lossy(),
    }))
}

fn import_snapshot(app: &mut App, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let in_path = PathBuf::from(get_required_str(params, "inPath")?);
    let imported = backup::import_snapshot_bundle(&in_path)
        .map_err(|e| AppError::Validation(format!("{e:#}")))?;
    let (users, courses) =
        DataStore::parse_snapshot(&imported.blobs.users, &imported.blobs.courses)?;
    let (user_count, course_count) = (users.len(), courses.len());
    let route = app.replace_snapshot(users, courses)?;
    info!(
        path = %in_path.to_string_lossy(),
        users = user_count,
        courses = course_count,
        "snapshot imported"
    );
    Ok(json!({
        "bundleFormat": imported.bundle_format,
        "sourceRevision": imported.revision,
        "revision": app.store().revision(),
        "users": user_count,
        "courses": course_count,
        "route": route,
        "view": app.surface().current_json(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "workspace.exportSnapshot" => Some(with_app(state, req, export_snapshot)),
        "workspace.importSnapshot" => Some(with_app(state, req, import_snapshot)),
        _ => None,
    }
}
