mod backup;
mod calc;
mod config;
mod controllers;
mod db;
mod error;
mod ipc;
mod model;
mod password;
mod seed;
mod storage;
mod store;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "COURSEBOOK_LOG";
const WORKSPACE_ENV: &str = "COURSEBOOK_WORKSPACE";

fn init_logging() {
    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    init_logging();
    let mut state = ipc::AppState::default();

    if let Some(path) = std::env::var_os(WORKSPACE_ENV).map(PathBuf::from) {
        if let Err((code, message)) = ipc::open_workspace(&mut state, &path) {
            error!(code, %message, workspace = %path.to_string_lossy(), "startup workspace rejected");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "coursebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer with.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
