//! Library surface for the Student Record Manager.
//!
//! The `bin` target and any external tooling share the same pieces through a
//! deliberately small set of re-exports: path helpers and loaders for
//! bootstrapping, the domain types, and the interactive entry point. Anything
//! not listed here is reachable through its module but not part of the
//! convenience surface.
pub mod db;
pub mod models;
pub mod ui;
pub mod validate;

/// Persistence helpers `main.rs` calls at startup to resolve the data paths,
/// open the SQLite store, and hydrate the initial roster and course list.
pub use db::{
    default_db_path, default_log_path, fetch_all_students, fetch_unique_courses, open_store,
};

/// Domain types that travel between the store and the TUI.
pub use models::{Grade, NewStudent, Student, StudentUpdate};

/// The event loop runner and the state it drives.
pub use ui::{run_app, App};
