use crate::clock::ScanInstant;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{SqliteStore, StudentUpsert};
use rusqlite::Connection;
use serde_json::json;

/// Replays the student upsert over a batch from an offline device. No
/// per-item validation; each item either lands or is counted as failed,
/// and one bad item never aborts the rest.
fn sync_users(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let Some(users) = params.get("users").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing users"));
    };

    let store = SqliteStore::new(conn);
    let fallback_created_at = ScanInstant::now().created_at();
    let mut success: u64 = 0;
    let mut failed: u64 = 0;

    for user in users {
        let email = user.get("email").and_then(|v| v.as_str());
        let name = user.get("name").and_then(|v| v.as_str());
        let lrn = user.get("lrn").and_then(|v| v.as_str());
        let qr_in = user.get("qrCodeIn").and_then(|v| v.as_str());
        let qr_out = user.get("qrCodeOut").and_then(|v| v.as_str());
        let (Some(email), Some(name), Some(lrn), Some(qr_in), Some(qr_out)) =
            (email, name, lrn, qr_in, qr_out)
        else {
            failed += 1;
            continue;
        };

        let schedule = user.get("schedule").cloned().unwrap_or_else(|| json!({}));
        let created_at = user
            .get("createdAt")
            .and_then(|v| v.as_str())
            .unwrap_or(&fallback_created_at);

        let upsert = StudentUpsert {
            email,
            name,
            grade_section: user.get("gradeSection").and_then(|v| v.as_str()).unwrap_or(""),
            lrn,
            adviser: user.get("adviser").and_then(|v| v.as_str()).unwrap_or(""),
            schedule: &schedule,
            qr_code_in: qr_in,
            qr_code_out: qr_out,
            created_at,
        };
        match store.upsert_student(&upsert) {
            Ok(()) => success += 1,
            Err(e) => {
                tracing::error!(error = %e, email = %email, "sync upsert failed");
                failed += 1;
            }
        }
    }

    Ok(json!({
        "results": {
            "users": { "success": success, "failed": failed }
        }
    }))
}

fn handle_sync_users(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match sync_users(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sync.users" => Some(handle_sync_users(state, req)),
        _ => None,
    }
}
