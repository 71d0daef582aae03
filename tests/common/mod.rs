#![allow(dead_code)]

use attendance_tracker::Caller;
use attendance_tracker::manager::AttendanceManager;
use attendance_tracker::models::{Credentials, Student, StudentProfile};
use chrono::NaiveDate;

pub fn manager() -> AttendanceManager {
    AttendanceManager::in_memory().expect("in-memory database")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Creates an administrator account and returns it as a caller.
pub fn admin(manager: &mut AttendanceManager) -> Caller {
    let account_id = manager
        .create_account("admin", "admin123", "admin@example.com", true)
        .expect("admin account");
    Caller {
        account_id,
        username: "admin".to_string(),
        is_admin: true,
    }
}

pub fn profile(code: &str, name: &str, program: &str, batch: &str) -> StudentProfile {
    StudentProfile {
        student_id: code.to_string(),
        full_name: name.to_string(),
        email: format!("{}@example.com", code.to_lowercase()),
        program: program.to_string(),
        batch: batch.to_string(),
        year: None,
    }
}

pub fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: "temp-pass".to_string(),
        email: None,
    }
}

/// Adds a student whose login username is the lowercased student ID.
pub fn add_student(
    manager: &mut AttendanceManager,
    admin: &Caller,
    code: &str,
    name: &str,
    program: &str,
    batch: &str,
) -> Student {
    manager
        .create_student(
            admin,
            &profile(code, name, program, batch),
            &credentials(&code.to_lowercase()),
        )
        .expect("student created")
}

/// Logs in as the student added by [`add_student`].
pub fn student_caller(manager: &mut AttendanceManager, code: &str) -> Caller {
    manager
        .authenticate(&code.to_lowercase(), "temp-pass")
        .expect("student login")
}
