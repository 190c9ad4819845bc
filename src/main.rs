//! Binary entry point. The pipeline is: install the file logger (so log
//! lines never write into the alternate screen), open the store at its
//! default home-directory path, hydrate the initial roster and course list,
//! and hand everything to the Ratatui event loop until the user quits.
use std::fs::{self, File};

use anyhow::Context;
use simplelog::{Config, LevelFilter, WriteLogger};

use student_record_manager::{
    default_db_path, default_log_path, fetch_all_students, fetch_unique_courses, open_store,
    run_app, App,
};

/// Fatal bootstrap problems (an unwritable home directory, a corrupt
/// database file) surface on stderr through the returned `Result` instead of
/// crashing mid-draw.
fn main() -> anyhow::Result<()> {
    let log_path = default_log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }
    WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create(&log_path).context("failed to create log file")?,
    )
    .context("failed to initialize logging")?;

    let db_path = default_db_path()?;
    let conn = open_store(&db_path)?;
    let students = fetch_all_students(&conn)?;
    let courses = fetch_unique_courses(&conn)?;

    let mut app = App::new(conn, students, courses);
    run_app(&mut app)
}
