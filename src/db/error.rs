//! Typed failures for the persistence layer.

use thiserror::Error;

/// Convenience alias used throughout the store.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which unique column a rejected write collided on. Callers branch on this:
/// a student-id collision can be retried with a fresh identifier, while an
/// email collision has to go back to the user.
pub enum DuplicateField {
    StudentId,
    Email,
}

impl DuplicateField {
    /// Human-readable column name for error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DuplicateField::StudentId => "student ID",
            DuplicateField::Email => "email",
        }
    }
}

#[derive(Debug, Error)]
/// Failures surfaced by the record store. Lookups and mutations that simply
/// miss their target are not represented here; those return `Ok(None)` or
/// `Ok(false)` so callers can treat an expected miss as ordinary control
/// flow instead of unwinding.
pub enum StoreError {
    /// A unique column already holds the offered value.
    #[error("a student with {} '{value}' already exists", .field.label())]
    Duplicate {
        field: DuplicateField,
        value: String,
    },
    /// A required field was blank after trimming.
    #[error("{0} is required")]
    MissingField(&'static str),
    /// The platform gave us no home directory to anchor the data folder in.
    #[error("could not locate home directory")]
    MissingHomeDir,
    /// Filesystem trouble while preparing the data directory.
    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    /// Anything SQLite itself reports.
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_message_names_field_and_value() {
        let err = StoreError::Duplicate {
            field: DuplicateField::Email,
            value: "ada@example.com".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "a student with email 'ada@example.com' already exists"
        );

        let err = StoreError::Duplicate {
            field: DuplicateField::StudentId,
            value: "2024001".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "a student with student ID '2024001' already exists"
        );
    }

    #[test]
    fn missing_field_message_names_field() {
        assert_eq!(
            StoreError::MissingField("email").to_string(),
            "email is required"
        );
    }
}
