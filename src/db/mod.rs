//! Persistence module split across logical submodules.

mod connection;
mod error;
mod students;

pub use connection::{default_db_path, default_log_path, open_store};
pub use error::{DuplicateField, StoreError, StoreResult};
pub use students::{
    create_student, delete_student, fetch_all_students, fetch_student, fetch_unique_courses,
    filter_by_attendance, filter_by_course, filter_by_grade, search_students, update_student,
};
