use crate::ipc::error::{err, get_required_str, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn history_row_json(r: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "userEmail": r.get::<_, String>(1)?,
        "qrCode": r.get::<_, String>(2)?,
        "qrType": r.get::<_, String>(3)?,
        "scanTime": r.get::<_, String>(4)?,
        "status": r.get::<_, String>(5)?,
        "message": r.get::<_, Option<String>>(6)?,
        "createdAt": r.get::<_, String>(7)?,
    }))
}

fn attendance_row_json(r: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    Ok(json!({
        "id": r.get::<_, String>(0)?,
        "userEmail": r.get::<_, String>(1)?,
        "date": r.get::<_, String>(2)?,
        "scanTime": r.get::<_, String>(3)?,
        "status": r.get::<_, String>(4)?,
        "qrType": r.get::<_, String>(5)?,
        "createdAt": r.get::<_, String>(6)?,
    }))
}

fn history_for_user(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let mut stmt = conn
        .prepare(
            "SELECT id, user_email, qr_code, qr_type, scan_time, status, message, created_at
             FROM scan_history WHERE user_email = ? ORDER BY created_at DESC",
        )
        .map_err(HandlerErr::db_query)?;
    let history = stmt
        .query_map([&email], history_row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db_query)?;
    Ok(json!({ "history": history }))
}

fn attendance_for_user(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let mut stmt = conn
        .prepare(
            "SELECT id, user_email, date, scan_time, status, qr_type, created_at
             FROM attendance WHERE user_email = ? ORDER BY date DESC, created_at DESC",
        )
        .map_err(HandlerErr::db_query)?;
    let attendance = stmt
        .query_map([&email], attendance_row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db_query)?;
    Ok(json!({ "attendance": attendance }))
}

fn history_list_all(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_email, qr_code, qr_type, scan_time, status, message, created_at
             FROM scan_history ORDER BY created_at DESC",
        )
        .map_err(HandlerErr::db_query)?;
    let history = stmt
        .query_map([], history_row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db_query)?;
    Ok(json!({ "history": history }))
}

fn attendance_list_all(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_email, date, scan_time, status, qr_type, created_at
             FROM attendance ORDER BY created_at DESC",
        )
        .map_err(HandlerErr::db_query)?;
    let attendance = stmt
        .query_map([], attendance_row_json)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db_query)?;
    Ok(json!({ "attendance": attendance }))
}

fn with_db<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "history.forUser" => Some(with_db(state, req, history_for_user)),
        "attendance.forUser" => Some(with_db(state, req, attendance_for_user)),
        "history.listAll" => Some(with_db(state, req, |conn, _| history_list_all(conn))),
        "attendance.listAll" => Some(with_db(state, req, |conn, _| attendance_list_all(conn))),
        _ => None,
    }
}
