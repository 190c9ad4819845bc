use log::{error, info, warn};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row};

use super::error::{DuplicateField, StoreError, StoreResult};
use crate::models::{Grade, NewStudent, Student, StudentUpdate};

/// Insert a new student and return the stored record, including the values
/// SQLite filled in (row id and creation timestamp). Collisions on the
/// unique `student_id` and `email` columns come back as
/// [`StoreError::Duplicate`] so callers can tell the two apart.
pub fn create_student(conn: &mut Connection, student: &NewStudent) -> StoreResult<Student> {
    require_field("full name", &student.full_name)?;
    require_field("student ID", &student.student_id)?;
    require_field("course", &student.course)?;
    require_field("email", &student.email)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO students (full_name, student_id, course, email, phone, attendance_percent, grade)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            student.full_name,
            student.student_id,
            student.course,
            student.email,
            student.phone,
            student.attendance_percent.unwrap_or(0.0),
            student.grade.unwrap_or(Grade::NotApplicable),
        ],
    )
    .map_err(|err| {
        let mapped = map_unique_constraint(err, Some(&student.student_id), Some(&student.email));
        error!("failed to add student {}: {mapped}", student.student_id);
        mapped
    })?;

    let created = tx.query_row(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students WHERE id = ?1",
        params![tx.last_insert_rowid()],
        row_to_student,
    )?;
    tx.commit()?;

    info!("added student {}", created.display_label());
    Ok(created)
}

/// Look up one student by public identifier. A miss is `Ok(None)`.
pub fn fetch_student(conn: &Connection, student_id: &str) -> StoreResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
             FROM students WHERE student_id = ?1",
            params![student_id],
            row_to_student,
        )
        .optional()?;
    Ok(student)
}

/// Fetch every student ordered by name.
pub fn fetch_all_students(conn: &Connection) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students ORDER BY full_name",
    )?;
    let students = stmt
        .query_map([], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Apply a partial update to the student with the given identifier. Slots
/// left as `None` keep their stored values. Returns `false` when no such
/// student exists, which callers treat as an expected miss rather than an
/// error.
pub fn update_student(
    conn: &mut Connection,
    student_id: &str,
    update: &StudentUpdate,
) -> StoreResult<bool> {
    let tx = conn.transaction()?;
    let updated = tx
        .execute(
            "UPDATE students
             SET full_name = COALESCE(?1, full_name),
                 course = COALESCE(?2, course),
                 email = COALESCE(?3, email),
                 phone = COALESCE(?4, phone),
                 attendance_percent = COALESCE(?5, attendance_percent),
                 grade = COALESCE(?6, grade)
             WHERE student_id = ?7",
            params![
                update.full_name,
                update.course,
                update.email,
                update.phone,
                update.attendance_percent,
                update.grade,
                student_id,
            ],
        )
        .map_err(|err| {
            let mapped = map_unique_constraint(err, None, update.email.as_deref());
            error!("failed to update student {student_id}: {mapped}");
            mapped
        })?;
    tx.commit()?;

    if updated > 0 {
        info!("updated student {student_id}");
        Ok(true)
    } else {
        warn!("update for unknown student {student_id}");
        Ok(false)
    }
}

/// Delete the student with the given identifier. Returns `false` when the
/// identifier matched nothing.
pub fn delete_student(conn: &mut Connection, student_id: &str) -> StoreResult<bool> {
    let tx = conn.transaction()?;
    let deleted = tx
        .execute(
            "DELETE FROM students WHERE student_id = ?1",
            params![student_id],
        )
        .map_err(|err| {
            error!("failed to delete student {student_id}: {err}");
            StoreError::Storage(err)
        })?;
    tx.commit()?;

    if deleted > 0 {
        info!("deleted student {student_id}");
        Ok(true)
    } else {
        warn!("delete for unknown student {student_id}");
        Ok(false)
    }
}

/// Case-insensitive substring search across name, email, and course,
/// ordered by name. An empty term matches everyone.
pub fn search_students(conn: &Connection, term: &str) -> StoreResult<Vec<Student>> {
    let pattern = format!("%{term}%");
    let mut stmt = conn.prepare(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students
         WHERE full_name LIKE ?1 OR email LIKE ?1 OR course LIKE ?1
         ORDER BY full_name",
    )?;
    let students = stmt
        .query_map(params![pattern], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Fetch students enrolled in exactly the given course, ordered by name.
pub fn filter_by_course(conn: &Connection, course: &str) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students WHERE course = ?1 ORDER BY full_name",
    )?;
    let students = stmt
        .query_map(params![course], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Fetch students whose attendance is strictly below the threshold, worst
/// attendance first. A student sitting exactly on the threshold is not
/// included.
pub fn filter_by_attendance(conn: &Connection, threshold: f64) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students WHERE attendance_percent < ?1 ORDER BY attendance_percent",
    )?;
    let students = stmt
        .query_map(params![threshold], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Fetch students holding exactly the given grade, ordered by name.
pub fn filter_by_grade(conn: &Connection, grade: Grade) -> StoreResult<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, student_id, course, email, phone, attendance_percent, grade, created_at
         FROM students WHERE grade = ?1 ORDER BY full_name",
    )?;
    let students = stmt
        .query_map(params![grade], row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Distinct course names in alphabetical order, for pickers and
/// auto-complete.
pub fn fetch_unique_courses(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT course FROM students ORDER BY course")?;
    let mut rows = stmt.query([])?;

    let mut courses = Vec::new();
    while let Some(row) = rows.next()? {
        courses.push(row.get(0)?);
    }
    Ok(courses)
}

fn row_to_student(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        full_name: row.get(1)?,
        student_id: row.get(2)?,
        course: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        attendance_percent: row.get(6)?,
        grade: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn require_field(name: &'static str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::MissingField(name));
    }
    Ok(())
}

/// Translate a SQLite uniqueness violation into a typed duplicate error.
/// The candidates are the values the statement could have collided on;
/// everything else stays a plain storage error.
fn map_unique_constraint(
    err: SqlError,
    student_id: Option<&str>,
    email: Option<&str>,
) -> StoreError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        let message = err.to_string();
        if let Some(value) = student_id {
            if message.contains("students.student_id") {
                return StoreError::Duplicate {
                    field: DuplicateField::StudentId,
                    value: value.to_string(),
                };
            }
        }
        if let Some(value) = email {
            if message.contains("students.email") {
                return StoreError::Duplicate {
                    field: DuplicateField::Email,
                    value: value.to_string(),
                };
            }
        }
    }
    StoreError::Storage(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::apply_schema;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn sample(student_id: &str, email: &str) -> NewStudent {
        NewStudent {
            full_name: "Ada Lovelace".to_string(),
            student_id: student_id.to_string(),
            course: "Mathematics".to_string(),
            email: email.to_string(),
            phone: None,
            attendance_percent: None,
            grade: None,
        }
    }

    fn named(name: &str, student_id: &str, course: &str, email: &str) -> NewStudent {
        NewStudent {
            full_name: name.to_string(),
            student_id: student_id.to_string(),
            course: course.to_string(),
            email: email.to_string(),
            phone: None,
            attendance_percent: None,
            grade: None,
        }
    }

    #[test]
    fn create_applies_defaults() {
        let mut conn = test_conn();
        let created = create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        assert!(created.id > 0);
        assert_eq!(created.student_id, "2024001");
        assert_eq!(created.attendance_percent, 0.0);
        assert_eq!(created.grade, Grade::NotApplicable);
        assert_eq!(created.phone, None);
        assert!(!created.created_at.is_empty());
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let mut conn = test_conn();
        let first = create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();
        let second = create_student(&mut conn, &sample("2024002", "grace@example.com")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn create_keeps_explicit_values() {
        let mut conn = test_conn();
        let student = NewStudent {
            phone: Some("+233-54-567-8910".to_string()),
            attendance_percent: Some(87.5),
            grade: Some(Grade::B),
            ..sample("2024002", "grace@example.com")
        };
        let created = create_student(&mut conn, &student).unwrap();

        assert_eq!(created.phone.as_deref(), Some("+233-54-567-8910"));
        assert_eq!(created.attendance_percent, 87.5);
        assert_eq!(created.grade, Grade::B);
    }

    #[test]
    fn create_rejects_blank_required_fields() {
        let mut conn = test_conn();
        let student = NewStudent {
            full_name: "   ".to_string(),
            ..sample("2024003", "blank@example.com")
        };
        let err = create_student(&mut conn, &student).unwrap_err();
        assert!(matches!(err, StoreError::MissingField("full name")));
        assert!(fetch_all_students(&conn).unwrap().is_empty());
    }

    #[test]
    fn duplicate_student_id_leaves_a_single_record() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        let err = create_student(&mut conn, &sample("2024001", "grace@example.com")).unwrap_err();
        match err {
            StoreError::Duplicate { field, value } => {
                assert_eq!(field, DuplicateField::StudentId);
                assert_eq!(value, "2024001");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
        assert_eq!(fetch_all_students(&conn).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_is_detected() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        let err = create_student(&mut conn, &sample("2024002", "ada@example.com")).unwrap_err();
        match err {
            StoreError::Duplicate { field, value } => {
                assert_eq!(field, DuplicateField::Email);
                assert_eq!(value, "ada@example.com");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn fetch_student_hits_and_misses() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        let found = fetch_student(&conn, "2024001").unwrap().unwrap();
        assert_eq!(found.full_name, "Ada Lovelace");
        assert_eq!(found.email, "ada@example.com");

        assert!(fetch_student(&conn, "9999999").unwrap().is_none());
    }

    #[test]
    fn update_changes_only_named_fields() {
        let mut conn = test_conn();
        let original = NewStudent {
            phone: Some("+233-54-567-8910".to_string()),
            attendance_percent: Some(91.0),
            grade: Some(Grade::A),
            ..sample("2024001", "ada@example.com")
        };
        let created = create_student(&mut conn, &original).unwrap();

        let patch = StudentUpdate {
            course: Some("Physics".to_string()),
            ..StudentUpdate::default()
        };
        assert!(update_student(&mut conn, "2024001", &patch).unwrap());

        let after = fetch_student(&conn, "2024001").unwrap().unwrap();
        assert_eq!(after.course, "Physics");
        assert_eq!(after.full_name, created.full_name);
        assert_eq!(after.email, created.email);
        assert_eq!(after.phone, created.phone);
        assert_eq!(after.attendance_percent, created.attendance_percent);
        assert_eq!(after.grade, created.grade);
        assert_eq!(after.created_at, created.created_at);
    }

    #[test]
    fn update_missing_student_returns_false() {
        let mut conn = test_conn();
        let patch = StudentUpdate {
            course: Some("Physics".to_string()),
            ..StudentUpdate::default()
        };
        assert!(!update_student(&mut conn, "9999999", &patch).unwrap());
    }

    #[test]
    fn update_to_taken_email_is_rejected() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();
        create_student(&mut conn, &sample("2024002", "grace@example.com")).unwrap();

        let patch = StudentUpdate {
            email: Some("ada@example.com".to_string()),
            ..StudentUpdate::default()
        };
        let err = update_student(&mut conn, "2024002", &patch).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Duplicate {
                field: DuplicateField::Email,
                ..
            }
        ));

        let untouched = fetch_student(&conn, "2024002").unwrap().unwrap();
        assert_eq!(untouched.email, "grace@example.com");
    }

    #[test]
    fn empty_patch_reports_row_presence() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        assert!(update_student(&mut conn, "2024001", &StudentUpdate::default()).unwrap());
        assert!(!update_student(&mut conn, "9999999", &StudentUpdate::default()).unwrap());
    }

    #[test]
    fn delete_round_trip() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        assert!(delete_student(&mut conn, "2024001").unwrap());
        assert!(fetch_student(&conn, "2024001").unwrap().is_none());
        assert!(!delete_student(&mut conn, "2024001").unwrap());
    }

    #[test]
    fn delete_missing_leaves_store_unchanged() {
        let mut conn = test_conn();
        create_student(&mut conn, &sample("2024001", "ada@example.com")).unwrap();

        assert!(!delete_student(&mut conn, "9999999").unwrap());
        assert_eq!(fetch_all_students(&conn).unwrap().len(), 1);
    }

    #[test]
    fn search_matches_name_email_and_course() {
        let mut conn = test_conn();
        create_student(
            &mut conn,
            &named("Ada Lovelace", "2024001", "Mathematics", "ada@example.com"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Grace Hopper", "2024002", "Computer Science", "grace@navy.mil"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Alan Turing", "2024003", "Computer Science", "alan@bletchley.uk"),
        )
        .unwrap();

        let by_name = search_students(&conn, "ada").unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].full_name, "Ada Lovelace");

        let by_email = search_students(&conn, "NAVY").unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].full_name, "Grace Hopper");

        let by_course = search_students(&conn, "computer").unwrap();
        let names: Vec<_> = by_course.iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, ["Alan Turing", "Grace Hopper"]);

        assert_eq!(search_students(&conn, "").unwrap().len(), 3);
        assert!(search_students(&conn, "zzz").unwrap().is_empty());
    }

    #[test]
    fn course_filter_matches_exactly() {
        let mut conn = test_conn();
        create_student(
            &mut conn,
            &named("Ada Lovelace", "2024001", "Mathematics", "ada@example.com"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Grace Hopper", "2024002", "Computer Science", "grace@navy.mil"),
        )
        .unwrap();

        let matched = filter_by_course(&conn, "Computer Science").unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].full_name, "Grace Hopper");

        assert!(filter_by_course(&conn, "computer science").unwrap().is_empty());
    }

    #[test]
    fn attendance_filter_is_strictly_below() {
        let mut conn = test_conn();
        for (student_id, email, attendance) in [
            ("2024001", "a@example.com", 74.9),
            ("2024002", "b@example.com", 75.0),
            ("2024003", "c@example.com", 75.1),
            ("2024004", "d@example.com", 10.0),
        ] {
            let student = NewStudent {
                attendance_percent: Some(attendance),
                ..sample(student_id, email)
            };
            create_student(&mut conn, &student).unwrap();
        }

        let flagged = filter_by_attendance(&conn, 75.0).unwrap();
        let attendances: Vec<_> = flagged.iter().map(|s| s.attendance_percent).collect();
        assert_eq!(attendances, [10.0, 74.9]);
    }

    #[test]
    fn grade_filter_matches_exactly() {
        let mut conn = test_conn();
        for (student_id, email, grade) in [
            ("2024001", "a@example.com", Some(Grade::A)),
            ("2024002", "b@example.com", Some(Grade::B)),
            ("2024003", "c@example.com", None),
        ] {
            let student = NewStudent {
                grade,
                ..sample(student_id, email)
            };
            create_student(&mut conn, &student).unwrap();
        }

        let top = filter_by_grade(&conn, Grade::A).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].student_id, "2024001");

        let ungraded = filter_by_grade(&conn, Grade::NotApplicable).unwrap();
        assert_eq!(ungraded.len(), 1);
        assert_eq!(ungraded[0].student_id, "2024003");
    }

    #[test]
    fn unique_courses_deduplicated_and_sorted() {
        let mut conn = test_conn();
        create_student(
            &mut conn,
            &named("Ada Lovelace", "2024001", "Mathematics", "ada@example.com"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Grace Hopper", "2024002", "Computer Science", "grace@navy.mil"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Alan Turing", "2024003", "Mathematics", "alan@bletchley.uk"),
        )
        .unwrap();

        let courses = fetch_unique_courses(&conn).unwrap();
        assert_eq!(courses, ["Computer Science", "Mathematics"]);
    }

    #[test]
    fn fetch_all_sorted_by_name() {
        let mut conn = test_conn();
        create_student(
            &mut conn,
            &named("Grace Hopper", "2024002", "Computer Science", "grace@navy.mil"),
        )
        .unwrap();
        create_student(
            &mut conn,
            &named("Ada Lovelace", "2024001", "Mathematics", "ada@example.com"),
        )
        .unwrap();

        let names: Vec<_> = fetch_all_students(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.full_name)
            .collect();
        assert_eq!(names, ["Ada Lovelace", "Grace Hopper"]);
    }
}
