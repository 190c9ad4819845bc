use crate::models::{Grade, Student};

/// Which query currently populates the roster. Each variant carries what is
/// needed to run the query again after a record changes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RosterView {
    All,
    Search(String),
    Course(String),
    AttendanceBelow(f64),
    Grade(Grade),
}

impl RosterView {
    /// Heading shown above the roster for this view.
    pub(crate) fn title(&self) -> String {
        match self {
            RosterView::All => "All Students".to_string(),
            RosterView::Search(term) if term.is_empty() => "Search".to_string(),
            RosterView::Search(term) => format!("Search: '{term}'"),
            RosterView::Course(course) => format!("Course: {course}"),
            RosterView::AttendanceBelow(threshold) => {
                format!("Attendance below {threshold}%")
            }
            RosterView::Grade(grade) => format!("Grade: {grade}"),
        }
    }
}

/// Column the roster is ordered by. `ViewOrder` keeps whatever order the
/// active view's query produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RosterSort {
    ViewOrder,
    Name,
    Course,
    Attendance,
    Grade,
}

impl RosterSort {
    /// The next column in the cycle, wrapping back to the view's own order.
    pub(crate) fn next(self) -> Self {
        match self {
            RosterSort::ViewOrder => RosterSort::Name,
            RosterSort::Name => RosterSort::Course,
            RosterSort::Course => RosterSort::Attendance,
            RosterSort::Attendance => RosterSort::Grade,
            RosterSort::Grade => RosterSort::ViewOrder,
        }
    }

    /// Column name for the status line.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            RosterSort::ViewOrder => "view order",
            RosterSort::Name => "name",
            RosterSort::Course => "course",
            RosterSort::Attendance => "attendance",
            RosterSort::Grade => "grade",
        }
    }

    /// Reorder `students` in place. Ties fall back to the name.
    pub(crate) fn apply(self, students: &mut [Student]) {
        match self {
            RosterSort::ViewOrder => {}
            RosterSort::Name => {
                students.sort_by(|a, b| a.full_name.cmp(&b.full_name));
            }
            RosterSort::Course => {
                students.sort_by(|a, b| {
                    a.course
                        .cmp(&b.course)
                        .then_with(|| a.full_name.cmp(&b.full_name))
                });
            }
            RosterSort::Attendance => {
                students.sort_by(|a, b| {
                    a.attendance_percent
                        .total_cmp(&b.attendance_percent)
                        .then_with(|| a.full_name.cmp(&b.full_name))
                });
            }
            RosterSort::Grade => {
                students.sort_by(|a, b| {
                    a.grade
                        .cmp(&b.grade)
                        .then_with(|| a.full_name.cmp(&b.full_name))
                });
            }
        }
    }
}

/// Modal list state for picking a course to filter by.
pub(crate) struct CoursePicker {
    pub(crate) courses: Vec<String>,
    pub(crate) selected: usize,
}

impl CoursePicker {
    pub(crate) fn new(courses: Vec<String>) -> Self {
        Self {
            courses,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.courses.is_empty() {
            return;
        }
        let len = self.courses.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn current_course(&self) -> Option<&String> {
        self.courses.get(self.selected)
    }
}

/// Modal list state for picking a grade to filter by. The rows are the fixed
/// grade domain, so only a cursor is stored.
pub(crate) struct GradePicker {
    pub(crate) selected: usize,
}

impl GradePicker {
    pub(crate) fn new() -> Self {
        Self { selected: 0 }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = Grade::ALL.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn current_grade(&self) -> Grade {
        Grade::ALL
            .get(self.selected)
            .copied()
            .unwrap_or(Grade::NotApplicable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_titles_describe_the_query() {
        assert_eq!(RosterView::All.title(), "All Students");
        assert_eq!(RosterView::Search("ada".to_string()).title(), "Search: 'ada'");
        assert_eq!(
            RosterView::Course("Mathematics".to_string()).title(),
            "Course: Mathematics"
        );
        assert_eq!(
            RosterView::AttendanceBelow(75.0).title(),
            "Attendance below 75%"
        );
        assert_eq!(RosterView::Grade(Grade::NotApplicable).title(), "Grade: N/A");
    }

    #[test]
    fn course_picker_clamps_at_both_ends() {
        let mut picker = CoursePicker::new(vec![
            "Computer Science".to_string(),
            "Mathematics".to_string(),
        ]);
        picker.move_selection(-1);
        assert_eq!(picker.selected, 0);
        picker.move_selection(5);
        assert_eq!(picker.selected, 1);
        assert_eq!(picker.current_course().map(String::as_str), Some("Mathematics"));
    }

    #[test]
    fn empty_course_picker_has_no_selection() {
        let mut picker = CoursePicker::new(Vec::new());
        picker.move_selection(1);
        assert_eq!(picker.current_course(), None);
    }

    #[test]
    fn grade_picker_walks_the_domain() {
        let mut picker = GradePicker::new();
        assert_eq!(picker.current_grade(), Grade::A);
        picker.move_selection(10);
        assert_eq!(picker.current_grade(), Grade::NotApplicable);
        picker.move_selection(-2);
        assert_eq!(picker.current_grade(), Grade::D);
    }

    fn student(name: &str, course: &str, attendance: f64, grade: Grade) -> Student {
        Student {
            id: 0,
            student_id: "2024001".to_string(),
            full_name: name.to_string(),
            course: course.to_string(),
            email: "student@example.com".to_string(),
            phone: None,
            attendance_percent: attendance,
            grade,
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn sort_cycle_visits_every_column_and_wraps() {
        let mut sort = RosterSort::ViewOrder;
        let mut seen = Vec::new();
        for _ in 0..5 {
            sort = sort.next();
            seen.push(sort.label());
        }
        assert_eq!(seen, ["name", "course", "attendance", "grade", "view order"]);
    }

    #[test]
    fn attendance_sort_puts_the_lowest_first() {
        let mut students = vec![
            student("Ada Lovelace", "Mathematics", 91.0, Grade::A),
            student("Grace Hopper", "Computer Science", 88.0, Grade::B),
            student("Alan Turing", "Computer Science", 88.0, Grade::A),
        ];
        RosterSort::Attendance.apply(&mut students);

        let names: Vec<&str> = students
            .iter()
            .map(|student| student.full_name.as_str())
            .collect();
        assert_eq!(names, ["Alan Turing", "Grace Hopper", "Ada Lovelace"]);
    }

    #[test]
    fn grade_sort_ranks_better_grades_first() {
        let mut students = vec![
            student("Ada Lovelace", "Mathematics", 91.0, Grade::NotApplicable),
            student("Grace Hopper", "Computer Science", 88.0, Grade::F),
            student("Alan Turing", "Computer Science", 88.0, Grade::A),
        ];
        RosterSort::Grade.apply(&mut students);

        let names: Vec<&str> = students
            .iter()
            .map(|student| student.full_name.as_str())
            .collect();
        assert_eq!(names, ["Alan Turing", "Grace Hopper", "Ada Lovelace"]);
    }

    #[test]
    fn view_order_sort_leaves_rows_alone() {
        let mut students = vec![
            student("Zadie Smith", "Literature", 40.0, Grade::C),
            student("Ada Lovelace", "Mathematics", 91.0, Grade::A),
        ];
        RosterSort::ViewOrder.apply(&mut students);
        assert_eq!(students[0].full_name, "Zadie Smith");
    }
}
