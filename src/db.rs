use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("attendance.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates the three tables and their indexes. Separate from `open_db` so
/// tests can run against an in-memory connection.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            grade_section TEXT NOT NULL,
            lrn TEXT NOT NULL,
            adviser TEXT NOT NULL,
            schedule TEXT NOT NULL,
            qr_code_in TEXT NOT NULL,
            qr_code_out TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
        [],
    )?;
    // The directory's two lookup keys: one owned row, two indexed codes.
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_qr_in ON users(qr_code_in)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_qr_out ON users(qr_code_out)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id TEXT PRIMARY KEY,
            user_email TEXT NOT NULL,
            date TEXT NOT NULL,
            scan_time TEXT NOT NULL,
            status TEXT NOT NULL,
            qr_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_email, date, qr_type),
            FOREIGN KEY(user_email) REFERENCES users(email)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_email ON attendance(user_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_email_date ON attendance(user_email, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scan_history(
            id TEXT PRIMARY KEY,
            user_email TEXT NOT NULL,
            qr_code TEXT NOT NULL,
            qr_type TEXT NOT NULL,
            scan_time TEXT NOT NULL,
            status TEXT NOT NULL,
            message TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_email) REFERENCES users(email)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_email ON scan_history(user_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_created ON scan_history(created_at)",
        [],
    )?;

    Ok(())
}
