use crate::clock::ScanInstant;
use crate::ipc::error::{err, get_required_str, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::scan::{ScanOutcome, ScanProcessor};
use crate::store::SqliteStore;
use rusqlite::Connection;
use serde_json::json;

fn outcome_json(outcome: &ScanOutcome) -> serde_json::Value {
    let mut v = json!({
        "success": outcome.success,
        "status": outcome.status.as_str(),
        "message": outcome.message,
    });
    match &outcome.detail {
        Some(d) => {
            v["userEmail"] = json!(d.user_email);
            v["userName"] = json!(d.user_name);
            v["qrType"] = json!(d.direction.as_str());
            v["scanTime"] = json!(d.scan_time);
            v["date"] = json!(d.date);
        }
        None => {
            v["error"] = json!("User not found");
        }
    }
    v
}

fn scan_process(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let qr_code = get_required_str(params, "qrCode")?;

    let store = SqliteStore::new(conn);
    let processor = ScanProcessor::new(&store, &store, &store);
    let outcome = processor
        .process(&qr_code, &ScanInstant::now())
        .map_err(|e| HandlerErr::new("scan_failed", e.to_string()))?;

    Ok(outcome_json(&outcome))
}

fn handle_scan_process(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match scan_process(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scan.process" => Some(handle_scan_process(state, req)),
        _ => None,
    }
}
