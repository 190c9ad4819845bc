use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Grade, NewStudent, Student, StudentUpdate};
use crate::validate::{
    format_name, format_phone_number, sanitize_input, validate_attendance, validate_email,
    validate_phone,
};

/// Form state for registering a new student. The public identifier is drawn
/// ahead of time so the modal can show it; everything else is typed in.
#[derive(Clone)]
pub(crate) struct AddStudentForm {
    pub(crate) student_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) course: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) attendance: String,
    pub(crate) grade: Grade,
    pub(crate) active: AddField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
}

/// Fields of the add form, in focus order.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum AddField {
    FirstName,
    LastName,
    Course,
    Email,
    Phone,
    Attendance,
    Grade,
}

impl AddStudentForm {
    /// Empty form seeded with a freshly drawn student identifier.
    pub(crate) fn new(student_id: String) -> Self {
        Self {
            student_id,
            first_name: String::new(),
            last_name: String::new(),
            course: String::new(),
            email: String::new(),
            phone: String::new(),
            attendance: String::new(),
            grade: Grade::NotApplicable,
            active: AddField::FirstName,
            error: None,
            suggestion: None,
            autocomplete_disabled: false,
        }
    }

    /// Cycle focus across the fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            AddField::FirstName => AddField::LastName,
            AddField::LastName => AddField::Course,
            AddField::Course => AddField::Email,
            AddField::Email => AddField::Phone,
            AddField::Phone => AddField::Attendance,
            AddField::Attendance => AddField::Grade,
            AddField::Grade => AddField::FirstName,
        };
        if self.active != AddField::Course {
            self.suggestion = None;
        }
    }

    /// Insert a character into the active field. The attendance field only
    /// takes digits and a decimal point; the grade field is not typed into.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            AddField::FirstName => push_text(&mut self.first_name, ch),
            AddField::LastName => push_text(&mut self.last_name, ch),
            AddField::Course => {
                if push_text(&mut self.course, ch) {
                    self.autocomplete_disabled = false;
                    true
                } else {
                    false
                }
            }
            AddField::Email => push_text(&mut self.email, ch),
            AddField::Phone => push_text(&mut self.phone, ch),
            AddField::Attendance => push_number(&mut self.attendance, ch),
            AddField::Grade => false,
        }
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            AddField::FirstName => {
                self.first_name.pop();
            }
            AddField::LastName => {
                self.last_name.pop();
            }
            AddField::Course => {
                self.course.pop();
                self.autocomplete_disabled = false;
            }
            AddField::Email => {
                self.email.pop();
            }
            AddField::Phone => {
                self.phone.pop();
            }
            AddField::Attendance => {
                self.attendance.pop();
            }
            AddField::Grade => {}
        }
    }

    /// Step the grade selection through the full domain.
    pub(crate) fn cycle_grade(&mut self, forward: bool) {
        self.grade = cycle_grade(self.grade, forward);
    }

    /// Validate and normalize the inputs into an insert payload.
    pub(crate) fn parse_inputs(&self) -> Result<NewStudent> {
        let first = sanitize_input(&self.first_name);
        if first.is_empty() {
            return Err(anyhow!("First name is required."));
        }
        let last = sanitize_input(&self.last_name);
        if last.is_empty() {
            return Err(anyhow!("Last name is required."));
        }

        let course = sanitize_input(&self.course);
        if course.is_empty() {
            return Err(anyhow!("Course is required."));
        }

        let email = self.email.trim().to_string();
        if !validate_email(&email) {
            return Err(anyhow!("Email address is not valid."));
        }

        let phone = self.phone.trim();
        let phone = if phone.is_empty() {
            None
        } else if validate_phone(phone) {
            Some(format_phone_number(phone))
        } else {
            return Err(anyhow!("Phone number is not valid."));
        };

        let attendance = self.attendance.trim();
        let attendance_percent = if attendance.is_empty() {
            None
        } else if validate_attendance(attendance) {
            Some(
                attendance
                    .parse::<f64>()
                    .context("Attendance must be a number.")?,
            )
        } else {
            return Err(anyhow!("Attendance must be between 0 and 100."));
        };

        Ok(NewStudent {
            full_name: format_name(&first, &last),
            student_id: self.student_id.clone(),
            course,
            email,
            phone,
            attendance_percent,
            grade: Some(self.grade),
        })
    }

    /// Update the course autocomplete suggestion based on current input.
    pub(crate) fn update_suggestion(&mut self, courses: &[String]) {
        self.suggestion = suggest_course(
            &self.course,
            courses,
            self.active == AddField::Course,
            self.autocomplete_disabled,
        );
    }

    /// Apply the suggested course, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_some() {
            if let Some(candidate) = self.suggestion.take() {
                self.course = candidate;
                self.autocomplete_disabled = true;
                return true;
            }
        }
        false
    }

    /// Explicitly dismiss the suggestion for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.active == AddField::Course && self.suggestion.is_some() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    /// Remaining characters of the suggestion, for the ghosted hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        suggestion_suffix(self.suggestion.as_deref(), &self.course)
    }

    /// Whether a suggestion is currently showing for the course field.
    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == AddField::Course && self.suggestion.is_some()
    }

    /// Render a styled line for the modal form.
    pub(crate) fn build_line(&self, field_name: &str, field: AddField) -> Line<'static> {
        let (value, placeholder) = match field {
            AddField::FirstName => (&self.first_name, "<required>"),
            AddField::LastName => (&self.last_name, "<required>"),
            AddField::Course => (&self.course, "<required>"),
            AddField::Email => (&self.email, "<required>"),
            AddField::Phone => (&self.phone, "<optional>"),
            AddField::Attendance => (&self.attendance, "<optional>"),
            AddField::Grade => {
                return grade_line(field_name, self.grade, self.active == AddField::Grade)
            }
        };
        let is_active = self.active == field;
        let suffix = if field == AddField::Course && is_active {
            self.suggestion_suffix()
        } else {
            None
        };

        text_line(field_name, value, placeholder, is_active, suffix)
    }

    /// Character count of the requested field, for cursor placement.
    pub(crate) fn value_len(&self, field: AddField) -> usize {
        match field {
            AddField::FirstName => self.first_name.chars().count(),
            AddField::LastName => self.last_name.chars().count(),
            AddField::Course => self.course.chars().count(),
            AddField::Email => self.email.chars().count(),
            AddField::Phone => self.phone.chars().count(),
            AddField::Attendance => self.attendance.chars().count(),
            AddField::Grade => self.grade.as_str().chars().count(),
        }
    }
}

/// Form state for editing an existing student. Fields start at the stored
/// values; submitting produces a patch holding only what actually changed,
/// so untouched fields never travel to the database at all.
#[derive(Clone)]
pub(crate) struct EditStudentForm {
    pub(crate) full_name: String,
    pub(crate) course: String,
    pub(crate) email: String,
    pub(crate) phone: String,
    pub(crate) attendance: String,
    pub(crate) grade: Grade,
    pub(crate) active: EditField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
    original: Student,
}

/// Fields of the edit form, in focus order.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum EditField {
    FullName,
    Course,
    Email,
    Phone,
    Attendance,
    Grade,
}

impl EditStudentForm {
    /// Populate the form from the record being edited.
    pub(crate) fn from_student(student: &Student) -> Self {
        Self {
            full_name: student.full_name.clone(),
            course: student.course.clone(),
            email: student.email.clone(),
            phone: student.phone.clone().unwrap_or_default(),
            attendance: student.attendance_percent.to_string(),
            grade: student.grade,
            active: EditField::FullName,
            error: None,
            suggestion: None,
            autocomplete_disabled: false,
            original: student.clone(),
        }
    }

    /// Cycle focus across the fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            EditField::FullName => EditField::Course,
            EditField::Course => EditField::Email,
            EditField::Email => EditField::Phone,
            EditField::Phone => EditField::Attendance,
            EditField::Attendance => EditField::Grade,
            EditField::Grade => EditField::FullName,
        };
        if self.active != EditField::Course {
            self.suggestion = None;
        }
    }

    /// Insert a character into the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            EditField::FullName => push_text(&mut self.full_name, ch),
            EditField::Course => {
                if push_text(&mut self.course, ch) {
                    self.autocomplete_disabled = false;
                    true
                } else {
                    false
                }
            }
            EditField::Email => push_text(&mut self.email, ch),
            EditField::Phone => push_text(&mut self.phone, ch),
            EditField::Attendance => push_number(&mut self.attendance, ch),
            EditField::Grade => false,
        }
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            EditField::FullName => {
                self.full_name.pop();
            }
            EditField::Course => {
                self.course.pop();
                self.autocomplete_disabled = false;
            }
            EditField::Email => {
                self.email.pop();
            }
            EditField::Phone => {
                self.phone.pop();
            }
            EditField::Attendance => {
                self.attendance.pop();
            }
            EditField::Grade => {}
        }
    }

    /// Step the grade selection through the full domain.
    pub(crate) fn cycle_grade(&mut self, forward: bool) {
        self.grade = cycle_grade(self.grade, forward);
    }

    /// Validate the inputs and diff them against the original record. Fields
    /// the user left alone come back as `None`. Clearing the phone or
    /// attendance field entirely also means "leave it alone"; required
    /// fields cannot be blanked at all.
    pub(crate) fn parse_updates(&self) -> Result<StudentUpdate> {
        let mut update = StudentUpdate::default();

        let full_name = sanitize_input(&self.full_name);
        if full_name.is_empty() {
            return Err(anyhow!("Full name is required."));
        }
        if full_name != self.original.full_name {
            update.full_name = Some(full_name);
        }

        let course = sanitize_input(&self.course);
        if course.is_empty() {
            return Err(anyhow!("Course is required."));
        }
        if course != self.original.course {
            update.course = Some(course);
        }

        let email = self.email.trim().to_string();
        if !validate_email(&email) {
            return Err(anyhow!("Email address is not valid."));
        }
        if email != self.original.email {
            update.email = Some(email);
        }

        let phone = self.phone.trim();
        if !phone.is_empty() {
            if !validate_phone(phone) {
                return Err(anyhow!("Phone number is not valid."));
            }
            let formatted = format_phone_number(phone);
            if self.original.phone.as_deref() != Some(formatted.as_str()) {
                update.phone = Some(formatted);
            }
        }

        let attendance = self.attendance.trim();
        if !attendance.is_empty() {
            if !validate_attendance(attendance) {
                return Err(anyhow!("Attendance must be between 0 and 100."));
            }
            let value = attendance
                .parse::<f64>()
                .context("Attendance must be a number.")?;
            if value != self.original.attendance_percent {
                update.attendance_percent = Some(value);
            }
        }

        if self.grade != self.original.grade {
            update.grade = Some(self.grade);
        }

        Ok(update)
    }

    /// Update the course autocomplete suggestion based on current input.
    pub(crate) fn update_suggestion(&mut self, courses: &[String]) {
        self.suggestion = suggest_course(
            &self.course,
            courses,
            self.active == EditField::Course,
            self.autocomplete_disabled,
        );
    }

    /// Apply the suggested course, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_some() {
            if let Some(candidate) = self.suggestion.take() {
                self.course = candidate;
                self.autocomplete_disabled = true;
                return true;
            }
        }
        false
    }

    /// Explicitly dismiss the suggestion for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.active == EditField::Course && self.suggestion.is_some() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    /// Remaining characters of the suggestion, for the ghosted hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        suggestion_suffix(self.suggestion.as_deref(), &self.course)
    }

    /// Whether a suggestion is currently showing for the course field.
    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == EditField::Course && self.suggestion.is_some()
    }

    /// Render a styled line for the modal form.
    pub(crate) fn build_line(&self, field_name: &str, field: EditField) -> Line<'static> {
        let (value, placeholder) = match field {
            EditField::FullName => (&self.full_name, "<required>"),
            EditField::Course => (&self.course, "<required>"),
            EditField::Email => (&self.email, "<required>"),
            EditField::Phone => (&self.phone, "<unchanged>"),
            EditField::Attendance => (&self.attendance, "<unchanged>"),
            EditField::Grade => {
                return grade_line(field_name, self.grade, self.active == EditField::Grade)
            }
        };
        let is_active = self.active == field;
        let suffix = if field == EditField::Course && is_active {
            self.suggestion_suffix()
        } else {
            None
        };

        text_line(field_name, value, placeholder, is_active, suffix)
    }

    /// Character count of the requested field, for cursor placement.
    pub(crate) fn value_len(&self, field: EditField) -> usize {
        match field {
            EditField::FullName => self.full_name.chars().count(),
            EditField::Course => self.course.chars().count(),
            EditField::Email => self.email.chars().count(),
            EditField::Phone => self.phone.chars().count(),
            EditField::Attendance => self.attendance.chars().count(),
            EditField::Grade => self.grade.as_str().chars().count(),
        }
    }
}

#[derive(Clone)]
/// State for confirming a permanent student deletion.
pub(crate) struct ConfirmStudentDelete {
    pub(crate) student_id: String,
    pub(crate) label: String,
}

impl ConfirmStudentDelete {
    /// Build the confirmation state from the record being considered.
    pub(crate) fn from(student: &Student) -> Self {
        Self {
            student_id: student.student_id.clone(),
            label: student.display_label(),
        }
    }
}

fn push_text(value: &mut String, ch: char) -> bool {
    if ch.is_control() {
        return false;
    }
    value.push(ch);
    true
}

fn push_number(value: &mut String, ch: char) -> bool {
    if ch.is_ascii_digit() || ch == '.' {
        value.push(ch);
        true
    } else {
        false
    }
}

fn cycle_grade(current: Grade, forward: bool) -> Grade {
    let count = Grade::ALL.len();
    let index = Grade::ALL
        .iter()
        .position(|grade| *grade == current)
        .unwrap_or(0);
    let next = if forward {
        (index + 1) % count
    } else {
        (index + count - 1) % count
    };
    Grade::ALL[next]
}

/// Find a stored course that extends what the user has typed so far. Matching
/// is case-insensitive and only kicks in after two characters, the same
/// heuristic the search bar uses for noise reduction.
fn suggest_course(
    current: &str,
    courses: &[String],
    field_active: bool,
    disabled: bool,
) -> Option<String> {
    if !field_active || disabled || current.chars().count() < 2 {
        return None;
    }

    let current_lower = current.to_lowercase();
    let candidate = courses
        .iter()
        .find(|candidate| candidate.to_lowercase().starts_with(&current_lower))?;

    if candidate.chars().count() == current.chars().count()
        && candidate.to_lowercase() == current_lower
    {
        None
    } else {
        Some(candidate.clone())
    }
}

fn suggestion_suffix(suggestion: Option<&str>, current: &str) -> Option<String> {
    let candidate = suggestion?;
    let mut chars = candidate.chars();
    for _ in 0..current.chars().count() {
        chars.next()?;
    }
    let suffix: String = chars.collect();
    if suffix.is_empty() {
        None
    } else {
        Some(suffix)
    }
}

fn text_line(
    field_name: &str,
    value: &str,
    placeholder: &str,
    is_active: bool,
    suffix: Option<String>,
) -> Line<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    let mut spans = vec![Span::raw(format!("{field_name}: "))];
    if is_active && !value.is_empty() {
        spans.push(Span::styled(value.to_string(), style));
        if let Some(suffix) = suffix {
            spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
        }
    } else {
        spans.push(Span::styled(display, style));
    }

    Line::from(spans)
}

fn grade_line(field_name: &str, grade: Grade, is_active: bool) -> Line<'static> {
    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(grade.as_str().to_string(), style),
    ];
    if is_active {
        spans.push(Span::styled(
            "  (arrow keys to change)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}
