use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::models::Student;

/// Column header matching [`roster_row`].
pub(crate) fn roster_header() -> String {
    format!(
        "{:<30} {:<10} {:<20} {:<10} {:<5}",
        "Name", "ID", "Course", "Attend %", "Grade"
    )
}

/// Render one student as a fixed-width roster line. Overlong values run past
/// their column instead of being cut off, so nothing is hidden.
pub(crate) fn roster_row(student: &Student) -> String {
    format!(
        "{:<30} {:<10} {:<20} {:<10.1} {:<5}",
        student.full_name,
        student.student_id,
        student.course,
        student.attendance_percent,
        student.grade.as_str()
    )
}

/// Carve a rectangle out of the middle of `area`, sized as a percentage of its
/// width and height. Modal dialogs draw into this.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Pull the root cause's message out of an error chain.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
