use crate::scan::{AttendanceLedger, AttendanceUpsert, HistoryAppend, ScanHistory, UserDirectory};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Student {
    pub id: String,
    pub email: String,
    pub name: String,
    pub grade_section: String,
    pub lrn: String,
    pub adviser: String,
    /// Opaque structured blob; stored and returned verbatim, never
    /// interpreted here.
    pub schedule: serde_json::Value,
    pub qr_code_in: String,
    pub qr_code_out: String,
    pub created_at: String,
}

/// Input to the directory upsert. Callers validate and trim before this
/// point; the store does no checking of its own.
#[derive(Debug)]
pub struct StudentUpsert<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub grade_section: &'a str,
    pub lrn: &'a str,
    pub adviser: &'a str,
    pub schedule: &'a serde_json::Value,
    pub qr_code_in: &'a str,
    pub qr_code_out: &'a str,
    pub created_at: &'a str,
}

/// rusqlite-backed implementation of the directory, ledger and history
/// ports. Borrows the connection; one instance serves all three roles.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SqliteStore { conn }
    }

    /// Insert a new student, or replace every mutable field when the email
    /// already exists. Row id and creation timestamp survive the replace.
    pub fn upsert_student(&self, s: &StudentUpsert<'_>) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO users(id, email, name, grade_section, lrn, adviser, schedule, qr_code_in, qr_code_out, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET
               name = excluded.name,
               grade_section = excluded.grade_section,
               lrn = excluded.lrn,
               adviser = excluded.adviser,
               schedule = excluded.schedule,
               qr_code_in = excluded.qr_code_in,
               qr_code_out = excluded.qr_code_out",
            (
                Uuid::new_v4().to_string(),
                s.email,
                s.name,
                s.grade_section,
                s.lrn,
                s.adviser,
                serde_json::to_string(s.schedule)?,
                s.qr_code_in,
                s.qr_code_out,
                s.created_at,
            ),
        )?;
        Ok(())
    }

    pub fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, email, name, grade_section, lrn, adviser, schedule, qr_code_in, qr_code_out, created_at
                 FROM users WHERE email = ?",
                [email],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let schedule_raw: String = row.get(6)?;
    Ok(Student {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        grade_section: row.get(3)?,
        lrn: row.get(4)?,
        adviser: row.get(5)?,
        schedule: serde_json::from_str(&schedule_raw).unwrap_or(serde_json::Value::Null),
        qr_code_in: row.get(7)?,
        qr_code_out: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl UserDirectory for SqliteStore<'_> {
    fn find_by_code(&self, code: &str) -> anyhow::Result<Option<Student>> {
        // Nothing stops two students from sharing a code; first row by
        // insertion order wins, as it always has.
        let student = self
            .conn
            .query_row(
                "SELECT id, email, name, grade_section, lrn, adviser, schedule, qr_code_in, qr_code_out, created_at
                 FROM users WHERE qr_code_in = ?1 OR qr_code_out = ?1 ORDER BY rowid LIMIT 1",
                [code],
                student_from_row,
            )
            .optional()?;
        Ok(student)
    }
}

impl AttendanceLedger for SqliteStore<'_> {
    fn upsert(&self, rec: &AttendanceUpsert<'_>) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO attendance(id, user_email, date, scan_time, status, qr_type, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_email, date, qr_type) DO UPDATE SET
               scan_time = excluded.scan_time,
               status = excluded.status",
            (
                Uuid::new_v4().to_string(),
                rec.user_email,
                rec.date,
                rec.scan_time,
                rec.status.as_str(),
                rec.direction.as_str(),
                rec.created_at,
            ),
        )?;
        Ok(())
    }
}

impl ScanHistory for SqliteStore<'_> {
    fn append(&self, entry: &HistoryAppend<'_>) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO scan_history(id, user_email, qr_code, qr_type, scan_time, status, message, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                entry.user_email,
                entry.qr_code,
                entry.direction.as_str(),
                entry.scan_time,
                entry.status.as_str(),
                entry.message,
                entry.created_at,
            ),
        )?;
        Ok(())
    }
}
