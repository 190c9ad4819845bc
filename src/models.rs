//! Domain models mirroring the `students` table. These stay plain data
//! holders: the store hydrates them, the TUI renders them, and neither layer
//! hides behavior inside them. The field notes record the column contracts so
//! the schema and the structs cannot quietly drift apart.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use thiserror::Error;

#[derive(Debug, Clone)]
/// A student record hydrated from the `students` table.
pub struct Student {
    /// Surrogate primary key from the database. We keep it around even though
    /// every user-visible flow addresses records by `student_id`, because it is
    /// the one value guaranteed never to be recycled across deletions.
    pub id: i64,
    /// Public seven-digit identifier (four-digit year plus a three-digit
    /// sequence). Assigned once at creation and immutable afterwards.
    pub student_id: String,
    /// Display name, stored already formatted.
    pub full_name: String,
    /// Course of study, matched exactly by the course filter.
    pub course: String,
    /// Contact email. Unique across all records.
    pub email: String,
    /// Optional phone number in the canonical `+233-XX-XXX-XXXX` layout.
    pub phone: Option<String>,
    /// Attendance percentage in the range 0 to 100.
    pub attendance_percent: f64,
    /// Letter grade, `N/A` until one is recorded.
    pub grade: Grade,
    /// Insertion timestamp captured by SQLite (`CURRENT_TIMESTAMP`, UTC).
    /// Never rewritten after the row is created.
    pub created_at: String,
}

impl Student {
    /// Compose a `Name (ID)` string used by confirmation dialogs and status
    /// messages so both values are always shown together.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.full_name, self.student_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// The closed set of grades the store accepts, declared best to worst so the
/// derived ordering ranks `A` ahead of `F`. `NotApplicable` renders as `N/A`,
/// sorts last, and is the default for students without a recorded grade.
/// Anything outside this set (an `A+`, a word like `pass`) fails to parse and
/// never reaches the database.
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    NotApplicable,
}

impl Grade {
    /// Every grade in display order, used by the picker and the grade field.
    pub const ALL: [Grade; 6] = [
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::F,
        Grade::NotApplicable,
    ];

    /// The exact text stored in the `grade` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when text does not name a known grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("grade must be one of A, B, C, D, F, or N/A")]
pub struct ParseGradeError;

impl FromStr for Grade {
    type Err = ParseGradeError;

    /// Parse a grade case-insensitively, trimming surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            "N/A" => Ok(Grade::NotApplicable),
            _ => Err(ParseGradeError),
        }
    }
}

impl ToSql for Grade {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Grade {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Grade>()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

#[derive(Debug, Clone)]
/// Payload for inserting a brand new student. Callers hand over already
/// sanitized and validated values; the store itself only enforces presence of
/// the required fields plus the uniqueness constraints.
pub struct NewStudent {
    pub full_name: String,
    pub student_id: String,
    pub course: String,
    pub email: String,
    pub phone: Option<String>,
    /// Defaults to 0.0 when absent.
    pub attendance_percent: Option<f64>,
    /// Defaults to `Grade::NotApplicable` when absent.
    pub grade: Option<Grade>,
}

#[derive(Debug, Clone, Default)]
/// Partial update for an existing student. `None` in a slot means "keep the
/// stored value". There are deliberately no slots for `student_id`, `id`, or
/// `created_at`; those are immutable once the record exists, so an update
/// touching them cannot even be expressed.
pub struct StudentUpdate {
    pub full_name: Option<String>,
    pub course: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub attendance_percent: Option<f64>,
    pub grade: Option<Grade>,
}

impl StudentUpdate {
    /// Whether every slot is unset. Callers check this to skip a round trip
    /// to the database when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.course.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.attendance_percent.is_none()
            && self.grade.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_parses_case_insensitively() {
        assert_eq!("A".parse::<Grade>().unwrap(), Grade::A);
        assert_eq!("b".parse::<Grade>().unwrap(), Grade::B);
        assert_eq!(" f ".parse::<Grade>().unwrap(), Grade::F);
        assert_eq!("n/a".parse::<Grade>().unwrap(), Grade::NotApplicable);
    }

    #[test]
    fn grade_rejects_values_outside_the_domain() {
        assert!("A+".parse::<Grade>().is_err());
        assert!("E".parse::<Grade>().is_err());
        assert!("".parse::<Grade>().is_err());
        assert!("pass".parse::<Grade>().is_err());
    }

    #[test]
    fn grade_display_round_trips() {
        for grade in Grade::ALL {
            assert_eq!(grade.to_string().parse::<Grade>().unwrap(), grade);
        }
    }

    #[test]
    fn empty_update_reports_empty() {
        assert!(StudentUpdate::default().is_empty());
        let patch = StudentUpdate {
            course: Some("Physics".to_string()),
            ..StudentUpdate::default()
        };
        assert!(!patch.is_empty());
    }
}
