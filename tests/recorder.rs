mod common;

use attendance_tracker::TrackerError;
use attendance_tracker::recorder::RecordFilter;
use common::{add_student, admin, date, manager, student_caller};
use std::thread::sleep;
use std::time::Duration;

#[test]
fn unmarked_sheet_defaults_everyone_to_present() {
    let mut m = manager();
    let admin = admin(&mut m);
    add_student(&mut m, &admin, "STU002", "Bob", "CS", "2024");
    add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    add_student(&mut m, &admin, "STU003", "Carol", "EE", "2024");

    let sheet = m
        .get_marking_sheet(&admin, "CS", "2024", date(2024, 3, 1))
        .unwrap();

    let names: Vec<&str> = sheet.rows.iter().map(|r| r.student.full_name.as_str()).collect();
    assert_eq!(names, ["Alice", "Bob"]);
    assert!(sheet.rows.iter().all(|r| r.is_present && !r.is_marked()));
    assert!(!sheet.is_fully_marked());
    assert_eq!(m.num_records().unwrap(), 0);
}

#[test]
fn submission_marks_the_whole_cohort() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let bob = add_student(&mut m, &admin, "STU002", "Bob", "CS", "2024");
    add_student(&mut m, &admin, "STU003", "Carol", "EE", "2024");
    let on = date(2024, 3, 1);

    let submission = m
        .submit_attendance(&admin, "CS", "2024", on, &[alice.id])
        .unwrap();
    assert_eq!(submission.present, 1);
    assert_eq!(submission.absent, 1);
    assert!(submission.ignored.is_empty());

    // Only the cohort was written.
    assert_eq!(m.num_records().unwrap(), 2);

    let sheet = m.get_marking_sheet(&admin, "CS", "2024", on).unwrap();
    assert!(sheet.is_fully_marked());
    let status: Vec<(i32, bool)> = sheet
        .rows
        .iter()
        .map(|r| (r.student.id, r.is_present))
        .collect();
    assert_eq!(status, [(alice.id, true), (bob.id, false)]);
}

#[test]
fn resubmitting_overwrites_instead_of_duplicating() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let bob = add_student(&mut m, &admin, "STU002", "Bob", "CS", "2024");
    let on = date(2024, 3, 1);

    m.submit_attendance(&admin, "CS", "2024", on, &[alice.id])
        .unwrap();
    let first = m.get_marking_sheet(&admin, "CS", "2024", on).unwrap();

    m.submit_attendance(&admin, "CS", "2024", on, &[bob.id])
        .unwrap();
    let second = m.get_marking_sheet(&admin, "CS", "2024", on).unwrap();

    assert_eq!(m.num_records().unwrap(), 2);
    for (before, after) in first.rows.iter().zip(&second.rows) {
        // Same rows, updated in place.
        assert_eq!(before.record_id, after.record_id);
    }
    let status: Vec<bool> = second.rows.iter().map(|r| r.is_present).collect();
    assert_eq!(status, [false, true]);
}

#[test]
fn ids_outside_the_cohort_are_ignored() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let carol = add_student(&mut m, &admin, "STU003", "Carol", "EE", "2024");

    let submission = m
        .submit_attendance(&admin, "CS", "2024", date(2024, 3, 1), &[alice.id, carol.id, 999])
        .unwrap();

    assert_eq!(submission.present, 1);
    assert_eq!(submission.absent, 0);
    assert_eq!(submission.ignored, [carol.id, 999]);
    assert_eq!(m.num_records().unwrap(), 1);
}

#[test]
fn empty_cohort_writes_nothing() {
    let mut m = manager();
    let admin = admin(&mut m);

    let submission = m
        .submit_attendance(&admin, "CS", "2024", date(2024, 3, 1), &[])
        .unwrap();
    assert_eq!(submission.present + submission.absent, 0);
    assert_eq!(m.num_records().unwrap(), 0);
}

#[test]
fn records_are_stamped_with_the_marker() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let on = date(2024, 3, 1);

    m.submit_attendance(&admin, "CS", "2024", on, &[alice.id])
        .unwrap();

    let records = m
        .list_records(&admin, &RecordFilter::default())
        .unwrap();
    assert_eq!(records.len(), 1);
    let (record, student) = &records[0];
    assert_eq!(student.id, alice.id);
    assert_eq!(record.marked_by, Some(admin.account_id));
    assert!(record.is_present);
}

#[test]
fn editing_a_single_record() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let on = date(2024, 3, 1);
    m.submit_attendance(&admin, "CS", "2024", on, &[alice.id])
        .unwrap();

    let sheet = m.get_marking_sheet(&admin, "CS", "2024", on).unwrap();
    let record_id = sheet.rows[0].record_id.unwrap();

    let edited = m.edit_single_record(&admin, record_id, false).unwrap();
    assert_eq!(edited.id, record_id);
    assert!(!edited.is_present);
    assert_eq!(edited.date, on);
    assert_eq!(m.get_record(record_id).unwrap(), edited);
    assert_eq!(m.num_records().unwrap(), 1);
}

#[test]
fn editing_an_unknown_record_is_not_found() {
    let mut m = manager();
    let admin = admin(&mut m);

    assert!(matches!(
        m.edit_single_record(&admin, 7, true),
        Err(TrackerError::NotFound { .. })
    ));
}

#[test]
fn students_cannot_mark_attendance() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let caller = student_caller(&mut m, "STU001");

    assert!(matches!(
        m.submit_attendance(&caller, "CS", "2024", date(2024, 3, 1), &[alice.id]),
        Err(TrackerError::PermissionDenied { .. })
    ));
    assert_eq!(m.num_records().unwrap(), 0);
}

#[test]
fn records_list_newest_first_then_by_name() {
    let mut m = manager();
    let admin = admin(&mut m);
    let zed = add_student(&mut m, &admin, "STU001", "Zed", "CS", "2024");
    let amy = add_student(&mut m, &admin, "STU002", "Amy", "CS", "2024");
    let max = add_student(&mut m, &admin, "STU003", "Max", "EE", "2024");

    m.submit_attendance(&admin, "CS", "2024", date(2024, 3, 1), &[zed.id, amy.id])
        .unwrap();
    m.submit_attendance(&admin, "CS", "2024", date(2024, 3, 2), &[amy.id])
        .unwrap();
    m.submit_attendance(&admin, "EE", "2024", date(2024, 3, 2), &[max.id])
        .unwrap();

    let all = m
        .list_records(&admin, &RecordFilter::default())
        .unwrap();
    let order: Vec<(chrono::NaiveDate, &str)> = all
        .iter()
        .map(|(r, s)| (r.date, s.full_name.as_str()))
        .collect();
    assert_eq!(
        order,
        [
            (date(2024, 3, 2), "Amy"),
            (date(2024, 3, 2), "Max"),
            (date(2024, 3, 2), "Zed"),
            (date(2024, 3, 1), "Amy"),
            (date(2024, 3, 1), "Zed"),
        ]
    );

    let filter = RecordFilter {
        date: Some(date(2024, 3, 2)),
        program: Some("CS".to_string()),
        batch: None,
    };
    let filtered = m.list_records(&admin, &filter).unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|(_, s)| s.program == "CS"));
}

#[test]
fn every_write_refreshes_updated_at() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let on = date(2024, 3, 1);

    m.submit_attendance(&admin, "CS", "2024", on, &[alice.id])
        .unwrap();
    let record_id = m.get_marking_sheet(&admin, "CS", "2024", on).unwrap().rows[0]
        .record_id
        .unwrap();
    let first = m.get_record(record_id).unwrap();

    sleep(Duration::from_millis(5));
    m.submit_attendance(&admin, "CS", "2024", on, &[])
        .unwrap();
    let remarked = m.get_record(record_id).unwrap();
    assert!(!remarked.is_present);
    assert!(remarked.updated_at > first.updated_at);

    sleep(Duration::from_millis(5));
    let edited = m.edit_single_record(&admin, record_id, true).unwrap();
    assert!(edited.updated_at > remarked.updated_at);
    assert_eq!(m.get_record(record_id).unwrap().updated_at, edited.updated_at);
}

#[test]
fn deleting_the_marker_keeps_the_record() {
    let mut m = manager();
    let admin = admin(&mut m);
    let alice = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    m.create_account("teacher", "teach123", "teacher@example.com", true)
        .unwrap();
    let marker = m.authenticate("teacher", "teach123").unwrap();

    m.submit_attendance(&marker, "CS", "2024", date(2024, 3, 1), &[alice.id])
        .unwrap();
    let (record, _) = m
        .list_records(&admin, &RecordFilter::default())
        .unwrap()
        .remove(0);
    assert_eq!(record.marked_by, Some(marker.account_id));

    m.delete_account(marker.account_id).unwrap();

    assert_eq!(m.num_records().unwrap(), 1);
    let kept = m.get_record(record.id).unwrap();
    assert_eq!(kept.marked_by, None);
    assert!(kept.is_present);
    assert_eq!(kept.date, record.date);
}
