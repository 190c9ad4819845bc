use std::mem;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    create_student, delete_student, fetch_all_students, fetch_student, fetch_unique_courses,
    filter_by_attendance, filter_by_course, filter_by_grade, search_students, update_student,
    DuplicateField, StoreError,
};
use crate::models::{Grade, Student};
use crate::validate::generate_student_id;

use super::forms::{AddField, AddStudentForm, ConfirmStudentDelete, EditField, EditStudentForm};
use super::helpers::{centered_rect, roster_header, roster_row, surface_error};
use super::screens::{CoursePicker, GradePicker, RosterSort, RosterView};

/// Rows reserved at the bottom for the status line and key hints.
const FOOTER_HEIGHT: u16 = 3;
/// Attendance cutoff used by the low-attendance shortcut view.
const LOW_ATTENDANCE_THRESHOLD: f64 = 75.0;
/// Total identifier draws attempted when an insert collides on student ID.
const ID_ATTEMPTS: usize = 3;

/// High-level navigation states. Keeping this explicit makes it easy to
/// reason about which rendering path runs and what keyboard shortcuts do.
enum Screen {
    Roster,
    Detail(Student),
}

/// Transient interaction layered on top of the current screen, usually a
/// modal. Key presses route here before the screen sees them.
enum Mode {
    Normal,
    AddingStudent(AddStudentForm),
    EditingStudent {
        student_id: String,
        form: EditStudentForm,
    },
    ConfirmDelete(ConfirmStudentDelete),
    PickingCourse(CoursePicker),
    PickingGrade(GradePicker),
    Searching(SearchState),
}

/// Live query text while the search bar is open.
struct SearchState {
    query: String,
}

/// Footer message with the severity that decides its color.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// How loudly a status message should read.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Everything the TUI needs to draw a frame and answer a key press: the open
/// connection, the rows currently on screen, and the navigation state.
pub struct App {
    conn: Connection,
    students: Vec<Student>,
    selected: usize,
    view: RosterView,
    sort: RosterSort,
    courses: Vec<String>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    saved_search: Option<SearchState>,
}

impl App {
    pub fn new(conn: Connection, students: Vec<Student>, courses: Vec<String>) -> Self {
        Self {
            conn,
            students,
            selected: 0,
            view: RosterView::All,
            sort: RosterSort::ViewOrder,
            courses,
            screen: Screen::Roster,
            mode: Mode::Normal,
            status: None,
            saved_search: None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingStudent(form) => self.handle_add_student(code, form)?,
            Mode::EditingStudent { student_id, form } => {
                self.handle_edit_student(code, student_id, form)?
            }
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::PickingCourse(picker) => self.handle_course_picker(code, picker)?,
            Mode::PickingGrade(picker) => self.handle_grade_picker(code, picker)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Roster => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Up => self.move_selection(-1),
                    KeyCode::Down => self.move_selection(1),
                    KeyCode::PageUp => self.move_selection(-10),
                    KeyCode::PageDown => self.move_selection(10),
                    KeyCode::Home => self.select_first(),
                    KeyCode::End => self.select_last(),
                    KeyCode::Enter => {
                        if let Some(student) = self.current_student().cloned() {
                            self.clear_status();
                            self.screen = Screen::Detail(student);
                        } else {
                            self.set_status("No student selected.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('+') => {
                        self.clear_status();
                        return Ok(Mode::AddingStudent(AddStudentForm::new(
                            generate_student_id(None),
                        )));
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(student) = self.current_student().cloned() {
                            self.clear_status();
                            return Ok(Mode::EditingStudent {
                                student_id: student.student_id.clone(),
                                form: EditStudentForm::from_student(&student),
                            });
                        } else {
                            self.set_status("No student selected to edit.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('-') => {
                        if let Some(student) = self.current_student().cloned() {
                            self.clear_status();
                            return Ok(Mode::ConfirmDelete(ConfirmStudentDelete::from(&student)));
                        } else {
                            self.set_status("No student selected to remove.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('f') => {
                        self.clear_status();
                        self.view = RosterView::Search(String::new());
                        self.reload_roster(None)?;
                        return Ok(Mode::Searching(SearchState {
                            query: String::new(),
                        }));
                    }
                    KeyCode::Char('c') | KeyCode::Char('C') => {
                        self.reload_courses()?;
                        if self.courses.is_empty() {
                            self.set_status("No courses on record yet.", StatusKind::Error);
                        } else {
                            self.clear_status();
                            return Ok(Mode::PickingCourse(CoursePicker::new(
                                self.courses.clone(),
                            )));
                        }
                    }
                    KeyCode::Char('g') | KeyCode::Char('G') => {
                        self.clear_status();
                        return Ok(Mode::PickingGrade(GradePicker::new()));
                    }
                    KeyCode::Char('a') | KeyCode::Char('A') => {
                        self.view = RosterView::AttendanceBelow(LOW_ATTENDANCE_THRESHOLD);
                        self.reload_roster(None)?;
                        self.set_status(
                            "Showing students with attendance below 75%.",
                            StatusKind::Info,
                        );
                    }
                    KeyCode::Char('s') | KeyCode::Char('S') => {
                        self.sort = self.sort.next();
                        let focus = self
                            .current_student()
                            .map(|student| student.student_id.clone());
                        self.reload_roster(focus.as_deref())?;
                        match self.sort {
                            RosterSort::ViewOrder => {
                                self.set_status(
                                    "Restored the view's own order.",
                                    StatusKind::Info,
                                );
                            }
                            sort => {
                                self.set_status(
                                    format!("Sorted by {}.", sort.label()),
                                    StatusKind::Info,
                                );
                            }
                        }
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        self.view = RosterView::All;
                        self.reload_roster(None)?;
                        self.set_status("Showing all students.", StatusKind::Info);
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Detail(ref student) => {
                let student = student.clone();
                match code {
                    KeyCode::Char('q') => {
                        *exit = true;
                    }
                    KeyCode::Esc | KeyCode::Backspace => {
                        self.clear_status();
                        self.screen = Screen::Roster;
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        self.clear_status();
                        return Ok(Mode::EditingStudent {
                            student_id: student.student_id.clone(),
                            form: EditStudentForm::from_student(&student),
                        });
                    }
                    KeyCode::Char('-') => {
                        self.clear_status();
                        return Ok(Mode::ConfirmDelete(ConfirmStudentDelete::from(&student)));
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
        }
    }

    fn handle_add_student(&mut self, code: KeyCode, mut form: AddStudentForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    self.set_status("Add student cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
                form.update_suggestion(&self.courses);
            }
            KeyCode::BackTab => {
                form.toggle_field();
                form.update_suggestion(&self.courses);
            }
            KeyCode::Backspace => {
                form.backspace();
                form.update_suggestion(&self.courses);
            }
            KeyCode::Left | KeyCode::Right => {
                if form.active == AddField::Grade {
                    form.cycle_grade(code == KeyCode::Right);
                }
            }
            KeyCode::Enter => match self.save_new_student(&mut form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                    form.update_suggestion(&self.courses);
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingStudent(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_student(
        &mut self,
        code: KeyCode,
        student_id: String,
        mut form: EditStudentForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    self.set_status("Edit cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
                form.update_suggestion(&self.courses);
            }
            KeyCode::BackTab => {
                form.toggle_field();
                form.update_suggestion(&self.courses);
            }
            KeyCode::Backspace => {
                form.backspace();
                form.update_suggestion(&self.courses);
            }
            KeyCode::Left | KeyCode::Right => {
                if form.active == EditField::Grade {
                    form.cycle_grade(code == KeyCode::Right);
                }
            }
            KeyCode::Enter => match self.save_existing_student(&student_id, &form) {
                Ok(()) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                    form.update_suggestion(&self.courses);
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingStudent { student_id, form })
        } else if let Some(state) = self.saved_search.take() {
            Ok(Mode::Searching(state))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmStudentDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(()) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_course_picker(&mut self, code: KeyCode, mut picker: CoursePicker) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Course filter cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::PageUp => picker.move_selection(-5),
            KeyCode::PageDown => picker.move_selection(5),
            KeyCode::Enter => {
                if let Some(course) = picker.current_course().cloned() {
                    self.view = RosterView::Course(course.clone());
                    self.reload_roster(None)?;
                    self.set_status(format!("Showing students in {course}."), StatusKind::Info);
                }
                return Ok(Mode::Normal);
            }
            _ => {}
        }
        Ok(Mode::PickingCourse(picker))
    }

    fn handle_grade_picker(&mut self, code: KeyCode, mut picker: GradePicker) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Grade filter cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Up => picker.move_selection(-1),
            KeyCode::Down => picker.move_selection(1),
            KeyCode::Enter => {
                let grade = picker.current_grade();
                self.view = RosterView::Grade(grade);
                self.reload_roster(None)?;
                self.set_status(
                    format!("Showing students with grade {grade}."),
                    StatusKind::Info,
                );
                return Ok(Mode::Normal);
            }
            _ => {}
        }
        Ok(Mode::PickingGrade(picker))
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.view = RosterView::All;
                self.reload_roster(None)?;
                self.clear_status();
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                return Ok(Mode::Normal);
            }
            KeyCode::Up => {
                self.move_selection(-1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Down => {
                self.move_selection(1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::PageUp => {
                self.move_selection(-10);
                return Ok(Mode::Searching(state));
            }
            KeyCode::PageDown => {
                self.move_selection(10);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Home => {
                self.select_first();
                return Ok(Mode::Searching(state));
            }
            KeyCode::End => {
                self.select_last();
                return Ok(Mode::Searching(state));
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => {}
        }

        self.view = RosterView::Search(state.query.clone());
        self.reload_roster(None)?;
        Ok(Mode::Searching(state))
    }

    pub(crate) fn handle_ctrl_e(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Searching(_)) {
            return Ok(());
        }

        let previous = mem::replace(&mut self.mode, Mode::Normal);
        if let Mode::Searching(state) = previous {
            self.saved_search = Some(state);
        }

        if let Some(student) = self.current_student().cloned() {
            self.mode = Mode::EditingStudent {
                student_id: student.student_id.clone(),
                form: EditStudentForm::from_student(&student),
            };
        } else {
            self.set_status("No student selected to edit.", StatusKind::Error);
            if let Some(state) = self.saved_search.take() {
                self.mode = Mode::Searching(state);
            }
        }
        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Roster => self.draw_roster(frame, content_area),
            Screen::Detail(student) => self.draw_detail(frame, content_area, student),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::AddingStudent(form) => self.draw_add_form(frame, area, form),
            Mode::EditingStudent { form, .. } => self.draw_edit_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::PickingCourse(picker) => self.draw_course_picker(frame, area, picker),
            Mode::PickingGrade(picker) => self.draw_grade_picker(frame, area, picker),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Normal => {}
        }
    }

    fn draw_roster(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.view.title());

        if self.students.is_empty() {
            let message = if matches!(self.view, RosterView::All) {
                "No students yet. Press '+' to add one."
            } else {
                "No students match this view. Press 'r' to show everyone."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);
        if inner.height == 0 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(inner);

        // Two leading spaces so the header lines up past the highlight symbol.
        let header = Paragraph::new(Span::styled(
            format!("  {}", roster_header()),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(header, chunks[0]);

        let items: Vec<ListItem> = self
            .students
            .iter()
            .map(|student| ListItem::new(roster_row(student)))
            .collect();
        let list = List::new(items)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(self.selected));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn draw_detail(&self, frame: &mut Frame, area: Rect, student: &Student) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(student.display_label());
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let phone = student.phone.as_deref().unwrap_or("not on file");
        let lines = vec![
            Line::from(format!("Name: {}", student.full_name)),
            Line::from(format!("Student ID: {}", student.student_id)),
            Line::from(format!("Course: {}", student.course)),
            Line::from(format!("Email: {}", student.email)),
            Line::from(format!("Phone: {phone}")),
            Line::from(format!("Attendance: {:.1}%", student.attendance_percent)),
            Line::from(format!("Grade: {}", student.grade)),
            Line::from(format!("Added: {}", student.created_at)),
        ];
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        let cursor_y = inner.y;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::Searching(_)) => Line::from(vec![
                Span::raw("Type to search   "),
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Keep Results   "),
                Span::styled("[Ctrl+E]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Clear"),
            ]),
            (_, Mode::PickingCourse(_)) | (_, Mode::PickingGrade(_)) => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Navigate   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Apply Filter   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Screen::Detail(_), _) => Line::from(vec![
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Back   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            _ => Line::from(vec![
                Span::styled("[↑↓]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Details   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[c]", key_style),
                Span::raw(" Course   "),
                Span::styled("[g]", key_style),
                Span::raw(" Grade   "),
                Span::styled("[a]", key_style),
                Span::raw(" Low Attendance   "),
                Span::styled("[s]", key_style),
                Span::raw(" Sort   "),
                Span::styled("[r]", key_style),
                Span::raw(" Reset   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_add_form(&self, frame: &mut Frame, area: Rect, form: &AddStudentForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Add Student").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(vec![
                Span::raw("Student ID: "),
                Span::styled(
                    format!("{}  (assigned)", form.student_id),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            form.build_line("First name", AddField::FirstName),
            form.build_line("Last name", AddField::LastName),
            form.build_line("Course", AddField::Course),
            form.build_line("Email", AddField::Email),
            form.build_line("Phone", AddField::Phone),
            form.build_line("Attendance %", AddField::Attendance),
            form.build_line("Grade", AddField::Grade),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to accept/switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (label, row) = match form.active {
            AddField::FirstName => ("First name: ", 1),
            AddField::LastName => ("Last name: ", 2),
            AddField::Course => ("Course: ", 3),
            AddField::Email => ("Email: ", 4),
            AddField::Phone => ("Phone: ", 5),
            AddField::Attendance => ("Attendance %: ", 6),
            AddField::Grade => ("Grade: ", 7),
        };
        let cursor_x = inner.x + label.len() as u16 + form.value_len(form.active) as u16;
        let cursor_y = inner.y + row;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_edit_form(&self, frame: &mut Frame, area: Rect, form: &EditStudentForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Edit Student").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Full name", EditField::FullName),
            form.build_line("Course", EditField::Course),
            form.build_line("Email", EditField::Email),
            form.build_line("Phone", EditField::Phone),
            form.build_line("Attendance %", EditField::Attendance),
            form.build_line("Grade", EditField::Grade),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to accept/switch • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let (label, row) = match form.active {
            EditField::FullName => ("Full name: ", 0),
            EditField::Course => ("Course: ", 1),
            EditField::Email => ("Email: ", 2),
            EditField::Phone => ("Phone: ", 3),
            EditField::Attendance => ("Attendance %: ", 4),
            EditField::Grade => ("Grade: ", 5),
        };
        let cursor_x = inner.x + label.len() as u16 + form.value_len(form.active) as u16;
        let cursor_y = inner.y + row;
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmStudentDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete {}?", confirm.label)),
            Line::from("This permanently removes the record."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_course_picker(&self, frame: &mut Frame, area: Rect, picker: &CoursePicker) {
        let popup_area = centered_rect(50, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Filter by Course")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = picker
            .courses
            .iter()
            .map(|course| ListItem::new(course.clone()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(picker.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_grade_picker(&self, frame: &mut Frame, area: Rect, picker: &GradePicker) {
        let popup_area = centered_rect(40, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Filter by Grade")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let items: Vec<ListItem> = Grade::ALL
            .iter()
            .map(|grade| ListItem::new(grade.as_str()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::NONE))
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("▶ ");

        let mut list_state = ListState::default();
        list_state.select(Some(picker.selected));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn save_new_student(&mut self, form: &mut AddStudentForm) -> Result<()> {
        let mut student = form.parse_inputs()?;

        for _ in 0..ID_ATTEMPTS {
            match create_student(&mut self.conn, &student) {
                Ok(created) => {
                    self.reload_courses()?;
                    self.reload_roster(Some(&created.student_id))?;
                    self.set_status(
                        format!("Added {}.", created.display_label()),
                        StatusKind::Info,
                    );
                    return Ok(());
                }
                Err(StoreError::Duplicate {
                    field: DuplicateField::StudentId,
                    ..
                }) => {
                    // Keep the id shown on the form in step with the retry.
                    student.student_id = generate_student_id(None);
                    form.student_id = student.student_id.clone();
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(anyhow!("Could not find a free student ID. Try again."))
    }

    fn save_existing_student(&mut self, student_id: &str, form: &EditStudentForm) -> Result<()> {
        let update = form.parse_updates()?;
        if update.is_empty() {
            self.set_status("No changes made.", StatusKind::Info);
            return Ok(());
        }

        if update_student(&mut self.conn, student_id, &update)? {
            self.reload_courses()?;
            self.reload_roster(Some(student_id))?;
            self.refresh_detail(student_id)?;
            self.set_status("Student updated.", StatusKind::Info);
        } else {
            self.set_status("Student not found.", StatusKind::Error);
        }
        Ok(())
    }

    fn perform_delete(&mut self, confirm: &ConfirmStudentDelete) -> Result<()> {
        if delete_student(&mut self.conn, &confirm.student_id)? {
            self.set_status(format!("Deleted {}.", confirm.label), StatusKind::Info);
        } else {
            self.set_status("Student not found.", StatusKind::Error);
        }
        self.reload_roster(None)?;

        if let Screen::Detail(ref student) = self.screen {
            if student.student_id == confirm.student_id {
                self.screen = Screen::Roster;
            }
        }
        Ok(())
    }

    fn refresh_detail(&mut self, student_id: &str) -> Result<()> {
        if let Screen::Detail(ref current) = self.screen {
            if current.student_id == student_id {
                if let Some(student) = fetch_student(&self.conn, student_id)? {
                    self.screen = Screen::Detail(student);
                } else {
                    self.screen = Screen::Roster;
                }
            }
        }
        Ok(())
    }

    fn reload_roster(&mut self, focus_student_id: Option<&str>) -> Result<()> {
        self.students = match &self.view {
            RosterView::All => fetch_all_students(&self.conn)?,
            RosterView::Search(term) => search_students(&self.conn, term)?,
            RosterView::Course(course) => filter_by_course(&self.conn, course)?,
            RosterView::AttendanceBelow(threshold) => {
                filter_by_attendance(&self.conn, *threshold)?
            }
            RosterView::Grade(grade) => filter_by_grade(&self.conn, *grade)?,
        };
        self.sort.apply(&mut self.students);

        if self.students.is_empty() {
            self.selected = 0;
            return Ok(());
        }

        if let Some(student_id) = focus_student_id {
            if let Some((idx, _)) = self
                .students
                .iter()
                .enumerate()
                .find(|(_, student)| student.student_id == student_id)
            {
                self.selected = idx;
                return Ok(());
            }
        }

        if self.selected >= self.students.len() {
            self.selected = self.students.len().saturating_sub(1);
        }

        Ok(())
    }

    fn reload_courses(&mut self) -> Result<()> {
        self.courses = fetch_unique_courses(&self.conn)?;
        Ok(())
    }

    fn move_selection(&mut self, offset: isize) {
        if self.students.is_empty() {
            return;
        }
        let len = self.students.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    fn select_first(&mut self) {
        if !self.students.is_empty() {
            self.selected = 0;
        }
    }

    fn select_last(&mut self) {
        if !self.students.is_empty() {
            self.selected = self.students.len() - 1;
        }
    }

    fn current_student(&self) -> Option<&Student> {
        self.students.get(self.selected)
    }
}
