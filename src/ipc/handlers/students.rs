use crate::clock::ScanInstant;
use crate::ipc::error::{err, get_optional_str, get_required_str, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{SqliteStore, Student, StudentUpsert};
use crate::validate::{sanitize, validate_registration, RegistrationInput};
use rusqlite::Connection;
use serde_json::json;

fn student_json(s: &Student) -> serde_json::Value {
    json!({
        "id": s.id,
        "email": s.email,
        "name": s.name,
        "gradeSection": s.grade_section,
        "lrn": s.lrn,
        "adviser": s.adviser,
        "schedule": s.schedule,
        "qrCodeIn": s.qr_code_in,
        "qrCodeOut": s.qr_code_out,
        "createdAt": s.created_at,
    })
}

fn students_upsert(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let input = RegistrationInput {
        email: get_optional_str(params, "email"),
        name: get_optional_str(params, "name"),
        grade_section: get_optional_str(params, "gradeSection"),
        lrn: get_optional_str(params, "lrn"),
        adviser: get_optional_str(params, "adviser"),
        qr_code_in: get_optional_str(params, "qrCodeIn"),
        qr_code_out: get_optional_str(params, "qrCodeOut"),
    };
    let errors = validate_registration(&input);
    if !errors.is_empty() {
        return Err(HandlerErr {
            code: "validation_failed",
            message: "Validation failed".to_string(),
            details: Some(json!({ "errors": errors })),
        });
    }

    let email = sanitize(input.email.unwrap_or_default());
    let schedule = params.get("schedule").cloned().unwrap_or_else(|| json!({}));
    SqliteStore::new(conn)
        .upsert_student(&StudentUpsert {
            email: &email,
            name: &sanitize(input.name.unwrap_or_default()),
            grade_section: &sanitize(input.grade_section.unwrap_or_default()),
            lrn: &sanitize(input.lrn.unwrap_or_default()),
            adviser: &sanitize(input.adviser.unwrap_or_default()),
            schedule: &schedule,
            qr_code_in: &sanitize(input.qr_code_in.unwrap_or_default()),
            qr_code_out: &sanitize(input.qr_code_out.unwrap_or_default()),
            created_at: &ScanInstant::now().created_at(),
        })
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;

    Ok(json!({ "email": email }))
}

fn students_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let student = SqliteStore::new(conn)
        .find_by_email(&email)
        .map_err(HandlerErr::db_query)?;
    match student {
        Some(s) => Ok(json!({ "user": student_json(&s) })),
        None => Err(HandlerErr::new("not_found", "User not found")),
    }
}

fn students_list_all(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, email, name, grade_section, lrn, adviser, schedule, qr_code_in, qr_code_out, created_at
             FROM users ORDER BY created_at DESC",
        )
        .map_err(HandlerErr::db_query)?;
    let users = stmt
        .query_map([], |r| {
            let schedule_raw: String = r.get(6)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "email": r.get::<_, String>(1)?,
                "name": r.get::<_, String>(2)?,
                "gradeSection": r.get::<_, String>(3)?,
                "lrn": r.get::<_, String>(4)?,
                "adviser": r.get::<_, String>(5)?,
                "schedule": serde_json::from_str::<serde_json::Value>(&schedule_raw)
                    .unwrap_or(serde_json::Value::Null),
                "qrCodeIn": r.get::<_, String>(7)?,
                "qrCodeOut": r.get::<_, String>(8)?,
                "createdAt": r.get::<_, String>(9)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db_query)?;
    Ok(json!({ "users": users }))
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
        "students.upsert" => Some(with_db(state, req, students_upsert)),
        "students.get" => Some(with_db(state, req, students_get)),
        "students.listAll" => Some(with_db(state, req, |conn, _| students_list_all(conn))),
        _ => None,
    }
}
