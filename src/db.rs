use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;

pub fn open_db(workspace: &Path, db_file: &str, legacy_semester: &str) -> Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(db_file);
    let conn = Connection::open(db_path)?;
    ensure_schema(&conn, legacy_semester)?;
    Ok(conn)
}

/// Creates missing tables and adds missing attendance columns. Safe to run on
/// every open.
pub fn ensure_schema(conn: &Connection, legacy_semester: &str) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_name TEXT,
            date TEXT,
            period TEXT,
            subject TEXT,
            status TEXT
        )",
        [],
    )?;

    // Databases written by older variants lack these columns.
    ensure_users_password_hash(conn)?;
    ensure_attendance_moderator(conn)?;
    ensure_attendance_semester(conn, legacy_semester)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_semester ON attendance(semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_users_password_hash(conn: &Connection) -> Result<()> {
    if table_has_column(conn, "users", "password_hash")? {
        return Ok(());
    }
    // Older account tables keep the same hex digest under `password`.
    if table_has_column(conn, "users", "password")? {
        conn.execute("ALTER TABLE users RENAME COLUMN password TO password_hash", [])?;
    } else {
        conn.execute("ALTER TABLE users ADD COLUMN password_hash TEXT", [])?;
    }
    Ok(())
}

fn ensure_attendance_moderator(conn: &Connection) -> Result<()> {
    if table_has_column(conn, "attendance", "moderator")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE attendance ADD COLUMN moderator TEXT", [])?;
    Ok(())
}

fn ensure_attendance_semester(conn: &Connection, legacy_semester: &str) -> Result<()> {
    if table_has_column(conn, "attendance", "semester")? {
        return Ok(());
    }
    // ADD COLUMN only takes a constant default, so the label is inlined as a literal.
    let sql = format!(
        "ALTER TABLE attendance ADD COLUMN semester TEXT DEFAULT '{}'",
        legacy_semester.replace('\'', "''")
    );
    conn.execute(&sql, [])?;
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    // A value that no longer parses is treated as unset.
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}
