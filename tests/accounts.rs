mod common;

use attendance_tracker::TrackerError;
use attendance_tracker::accounts::{ProfileUpdate, hash_password, verify_password};
use common::{add_student, admin, manager, student_caller};

#[test]
fn passwords_are_hashed_and_verified() {
    let hash = hash_password("student123").unwrap();
    assert_ne!(hash, "student123");
    assert!(hash.starts_with("$pbkdf2"));
    assert!(verify_password("student123", &hash));
    assert!(!verify_password("student124", &hash));
    assert!(!verify_password("student123", "not a hash"));
}

#[test]
fn authenticate_checks_the_password() {
    let mut m = manager();
    let admin = admin(&mut m);

    let caller = m.authenticate("admin", "admin123").unwrap();
    assert_eq!(caller, admin);
    assert!(caller.is_admin);

    assert!(matches!(
        m.authenticate("admin", "wrong"),
        Err(TrackerError::InvalidCredentials)
    ));
    assert!(matches!(
        m.authenticate("nobody", "admin123"),
        Err(TrackerError::InvalidCredentials)
    ));
}

#[test]
fn create_account_rejects_collisions() {
    let mut m = manager();
    admin(&mut m);

    assert!(matches!(
        m.create_account("admin", "pw", "other@example.com", false),
        Err(TrackerError::Duplicate { field: "username", .. })
    ));
    assert!(matches!(
        m.create_account("other", "pw", "admin@example.com", false),
        Err(TrackerError::Duplicate { field: "email", .. })
    ));
    assert!(matches!(
        m.create_account("", "pw", "blank@example.com", false),
        Err(TrackerError::Validation(_))
    ));
}

#[test]
fn signup_requires_matching_passwords() {
    let mut m = manager();

    let err = m
        .signup("john_doe", "john.doe@example.com", "student123", "student321")
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(ref e) if e.has("password2")));
    assert!(m.find_account("john_doe").unwrap().is_none());

    let account = m
        .signup("john_doe", "john.doe@example.com", "student123", "student123")
        .unwrap();
    assert!(!account.is_admin);

    // A fresh signup has no student profile yet.
    let caller = m.authenticate("john_doe", "student123").unwrap();
    assert_eq!(m.resolve_student_for_caller(&caller).unwrap(), None);
}

#[test]
fn profile_update_changes_login_details() {
    let mut m = manager();
    let admin = admin(&mut m);
    add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let caller = student_caller(&mut m, "STU001");

    let update = ProfileUpdate {
        username: Some("alice".to_string()),
        email: Some("alice@example.com".to_string()),
        new_password1: Some("wonderland".to_string()),
        new_password2: Some("wonderland".to_string()),
        address: None,
    };
    let account = m.update_profile(&caller, update).unwrap();
    assert_eq!(account.username, "alice");
    assert_eq!(account.email, "alice@example.com");

    assert!(m.authenticate("alice", "wonderland").is_ok());
    assert!(m.authenticate("alice", "temp-pass").is_err());
    assert!(m.authenticate("stu001", "temp-pass").is_err());
}

#[test]
fn profile_update_validates_input() {
    let mut m = manager();
    let admin = admin(&mut m);
    add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let caller = student_caller(&mut m, "STU001");

    let mismatch = ProfileUpdate {
        new_password1: Some("one".to_string()),
        new_password2: Some("two".to_string()),
        ..Default::default()
    };
    let err = m.update_profile(&caller, mismatch).unwrap_err();
    assert!(matches!(err, TrackerError::Validation(ref e) if e.has("new_password2")));

    let half = ProfileUpdate {
        new_password1: Some("one".to_string()),
        ..Default::default()
    };
    assert!(m.update_profile(&caller, half).is_err());

    let taken = ProfileUpdate {
        username: Some("admin".to_string()),
        ..Default::default()
    };
    let err = m.update_profile(&caller, taken).unwrap_err();
    assert!(matches!(err, TrackerError::Validation(ref e) if e.has("username")));

    // Nothing changed.
    assert!(m.authenticate("stu001", "temp-pass").is_ok());
}

#[test]
fn deleting_an_unknown_account_is_not_found() {
    let mut m = manager();

    assert!(matches!(
        m.delete_account(99),
        Err(TrackerError::NotFound { .. })
    ));
}

#[test]
fn address_is_kept_on_the_account() {
    let mut m = manager();
    let admin = admin(&mut m);
    let student = add_student(&mut m, &admin, "STU001", "Alice", "CS", "2024");
    let caller = student_caller(&mut m, "STU001");
    let account_id = student.account_id.unwrap();

    assert_eq!(m.get_account(account_id).unwrap().address, "");

    let update = ProfileUpdate {
        address: Some("  12 Rabbit Hole Lane, Oxford ".to_string()),
        ..Default::default()
    };
    let account = m.update_profile(&caller, update).unwrap();
    assert_eq!(account.address, "12 Rabbit Hole Lane, Oxford");

    // Other profile edits leave it alone.
    let update = ProfileUpdate {
        email: Some("alice@example.com".to_string()),
        ..Default::default()
    };
    m.update_profile(&caller, update).unwrap();
    let stored = m.get_account(account_id).unwrap();
    assert_eq!(stored.address, "12 Rabbit Hole Lane, Oxford");
    assert_eq!(stored.email, "alice@example.com");
}
