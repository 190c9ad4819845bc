use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::info;
use rusqlite::Connection;

use super::error::{StoreError, StoreResult};

/// Hidden folder under the user's home directory that holds all app data.
const DATA_DIR_NAME: &str = ".student-record-manager";
/// Database file created inside that folder.
const DB_FILE_NAME: &str = "students.sqlite";
/// Log file written next to the database.
const LOG_FILE_NAME: &str = "student-record-manager.log";

/// Open the database at `path`, creating the file and any missing parent
/// directories, and apply the schema. The DDL only creates what is absent,
/// so calling this on every startup against an existing store is harmless.
pub fn open_store(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    apply_schema(&conn)?;
    info!("store ready at {}", path.display());
    Ok(conn)
}

/// Create the `students` table if it does not exist yet. The uniqueness of
/// `student_id` and `email` lives here as constraints, as do the range check
/// on attendance and the closed grade domain, so no caller can slip an
/// out-of-range row past the validation layer.
pub(crate) fn apply_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            student_id TEXT NOT NULL UNIQUE,
            course TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            attendance_percent REAL NOT NULL DEFAULT 0.0
                CHECK (attendance_percent >= 0.0 AND attendance_percent <= 100.0),
            grade TEXT NOT NULL DEFAULT 'N/A'
                CHECK (grade IN ('A', 'B', 'C', 'D', 'F', 'N/A')),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Resolve the default database location inside the user's home directory.
pub fn default_db_path() -> StoreResult<PathBuf> {
    Ok(data_dir()?.join(DB_FILE_NAME))
}

/// Resolve the log file location, kept next to the database.
pub fn default_log_path() -> StoreResult<PathBuf> {
    Ok(data_dir()?.join(LOG_FILE_NAME))
}

fn data_dir() -> StoreResult<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or(StoreError::MissingHomeDir)?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
