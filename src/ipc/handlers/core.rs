use crate::config::AppConfig;
use crate::controllers::App;
use crate::db::SqliteKv;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::{DataStore, StoreOptions};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

/// Opens the workspace, loads its config and boots the controller graph.
pub fn open_workspace(state: &mut AppState, path: &Path) -> Result<serde_json::Value, (&'static str, String)> {
    let cfg = AppConfig::load(path).map_err(|e| ("config_invalid", format!("{e:#}")))?;
    let kv = SqliteKv::open(path).map_err(|e| ("db_open_failed", format!("{e:#}")))?;
    let mut store = DataStore::new(Box::new(kv), StoreOptions::from(&cfg));
    let initialized = store.initialize();
    let revision = store.revision();

    let mut app = App::new(store);
    let route = app.boot();
    let view = app.surface().current_json();

    info!(workspace = %path.to_string_lossy(), initialized, "workspace selected");
    state.workspace = Some(path.to_path_buf());
    state.app = Some(app);

    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "initialized": initialized,
        "revision": revision,
        "route": route,
        "view": view,
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(result) => ok(&req.id, result),
        Err((code, message)) => err(&req.id, code, message, None),
    }
}

fn handle_view_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let view = state
        .app
        .as_ref()
        .map(|app| app.surface().current_json())
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "view": view }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "view.current" => Some(handle_view_current(state, req)),
        _ => None,
    }
}
