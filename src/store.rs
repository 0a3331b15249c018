use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use serde_json::json;

use crate::error::Result;

/// Status written for a student marked absent.
pub const ABSENT: &str = "н";
/// Status written for a student present at roll-call.
pub const PRESENT: &str = "";

/// Column order shared by the table, the exports and the import mapping.
pub const COLUMNS: [&str; 8] = [
    "id",
    "student_name",
    "date",
    "period",
    "subject",
    "status",
    "moderator",
    "semester",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_name: String,
    pub date: String,
    pub period: String,
    pub subject: String,
    pub status: String,
    pub moderator: Option<String>,
    pub semester: Option<String>,
}

/// A row waiting for its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub student_name: String,
    pub date: String,
    pub period: String,
    pub subject: String,
    pub status: String,
    pub moderator: Option<String>,
    pub semester: Option<String>,
}

impl AttendanceRecord {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "studentName": self.student_name,
            "date": self.date,
            "period": self.period,
            "subject": self.subject,
            "status": self.status,
            "moderator": self.moderator,
            "semester": self.semester,
        })
    }

    /// Field values in `COLUMNS` order, ids rendered as text.
    pub fn values(&self) -> [String; 8] {
        [
            self.id.to_string(),
            self.student_name.clone(),
            self.date.clone(),
            self.period.clone(),
            self.subject.clone(),
            self.status.clone(),
            self.moderator.clone().unwrap_or_default(),
            self.semester.clone().unwrap_or_default(),
        ]
    }

    pub fn without_id(&self) -> NewRecord {
        NewRecord {
            student_name: self.student_name.clone(),
            date: self.date.clone(),
            period: self.period.clone(),
            subject: self.subject.clone(),
            status: self.status.clone(),
            moderator: self.moderator.clone(),
            semester: self.semester.clone(),
        }
    }
}

/// Identifies one roll-call submission for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollCallKey {
    pub date: String,
    pub period: String,
    pub subject: String,
    pub moderator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub date: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub semester: Option<String>,
    pub student_name: Option<String>,
}

fn insert_record(conn: &Connection, record: &NewRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO attendance(student_name, date, period, subject, status, moderator, semester)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &record.student_name,
            &record.date,
            &record.period,
            &record.subject,
            &record.status,
            &record.moderator,
            &record.semester,
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Appends one roll-call. Either every entry lands or none does.
pub fn record_roll_call(conn: &Connection, entries: &[NewRecord]) -> Result<Vec<i64>> {
    append_all(conn, entries)
}

/// Appends rows that already passed import validation, in one transaction.
pub fn append_bulk(conn: &Connection, rows: &[NewRecord]) -> Result<usize> {
    Ok(append_all(conn, rows)?.len())
}

fn append_all(conn: &Connection, rows: &[NewRecord]) -> Result<Vec<i64>> {
    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(insert_record(&tx, row)?);
    }
    tx.commit()?;
    Ok(ids)
}

/// True when rows for the same date, period, subject and moderator exist.
pub fn roll_call_exists(conn: &Connection, key: &RollCallKey) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM attendance
         WHERE date = ? AND period = ? AND subject = ? AND moderator IS ?",
        (&key.date, &key.period, &key.subject, &key.moderator),
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_name: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
        date: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
        period: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
        subject: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
        status: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
        moderator: r.get(6)?,
        semester: r.get(7)?,
    })
}

/// Matching rows, newest first. A filter that matches nothing yields an empty list.
pub fn query(conn: &Connection, filter: &QueryFilter) -> Result<Vec<AttendanceRecord>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(d) = &filter.date {
        clauses.push("date = ?");
        params.push(Value::Text(d.clone()));
    }
    if let Some(d) = &filter.date_from {
        clauses.push("date >= ?");
        params.push(Value::Text(d.clone()));
    }
    if let Some(d) = &filter.date_to {
        clauses.push("date <= ?");
        params.push(Value::Text(d.clone()));
    }
    if let Some(s) = &filter.semester {
        clauses.push("semester = ?");
        params.push(Value::Text(s.clone()));
    }
    if let Some(s) = &filter.student_name {
        clauses.push("student_name = ?");
        params.push(Value::Text(s.clone()));
    }

    let mut sql = String::from(
        "SELECT id, student_name, date, period, subject, status, moderator, semester
         FROM attendance",
    );
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
