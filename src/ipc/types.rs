use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

/// One line on stdin: `{"id": ..., "method": ..., "params": {...}}`.
#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// No database until the caller selects a workspace.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}
