use rusqlite::Connection;
use std::collections::HashMap;

use crate::error::Result;
use crate::roster::Roster;
use crate::store::ABSENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceCount {
    pub student_name: String,
    pub count: i64,
}

/// Absence rows per student, most absences first. Students without any
/// absence do not appear.
pub fn absence_counts(conn: &Connection, semester: Option<&str>) -> Result<Vec<AbsenceCount>> {
    let mut stmt = conn.prepare(
        "SELECT student_name, COUNT(*)
         FROM attendance
         WHERE status = ?1 AND (?2 IS NULL OR semester = ?2)
         GROUP BY student_name",
    )?;
    let mut out = stmt
        .query_map((ABSENT, semester), |r| {
            Ok(AbsenceCount {
                student_name: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
                count: r.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    sort_counts(&mut out);
    Ok(out)
}

/// Like `absence_counts`, but every roster member is listed, at 0 when never absent.
pub fn absence_counts_with_roster(
    conn: &Connection,
    semester: Option<&str>,
    roster: &Roster,
) -> Result<Vec<AbsenceCount>> {
    let counted = absence_counts(conn, semester)?;
    let mut by_name: HashMap<String, i64> = counted
        .into_iter()
        .map(|c| (c.student_name, c.count))
        .collect();
    let mut out: Vec<AbsenceCount> = roster
        .students()
        .iter()
        .map(|name| AbsenceCount {
            student_name: name.clone(),
            count: by_name.remove(name).unwrap_or(0),
        })
        .collect();
    // Names outside the roster (imported rows) keep their counts.
    out.extend(
        by_name
            .into_iter()
            .map(|(student_name, count)| AbsenceCount { student_name, count }),
    );
    sort_counts(&mut out);
    Ok(out)
}

fn sort_counts(counts: &mut [AbsenceCount]) {
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
}
