use crate::error::ValidationErrors;
use crate::schema::{accounts, attendance, students};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Args;
use diesel::prelude::*;

/// A login identity. The password is only ever held as a PHC hash string.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub address: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
    pub address: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = accounts)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub address: Option<String>,
}

/// A student profile on the roster.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: i32,
    pub account_id: Option<i32>,
    pub student_id: String,
    pub full_name: String,
    pub email: String,
    pub program: String,
    pub batch: String,
    pub year: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub account_id: Option<i32>,
    pub student_id: &'a str,
    pub full_name: &'a str,
    pub email: &'a str,
    pub program: &'a str,
    pub batch: &'a str,
    pub year: Option<i32>,
    pub created_at: NaiveDateTime,
}

/// The editable fields of a student, as submitted by an administrator.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    /// The external student identifier, e.g. `STU001`.
    #[arg(long)]
    pub student_id: String,

    #[arg(long)]
    pub full_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub program: String,

    #[arg(long)]
    pub batch: String,

    #[arg(long)]
    pub year: Option<i32>,
}

impl StudentProfile {
    /// Checks that every required field is filled in.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("student_id", &self.student_id);
        errors.require("full_name", &self.full_name);
        errors.require("email", &self.email);
        errors.require("program", &self.program);
        errors.require("batch", &self.batch);
        if !self.email.trim().is_empty() && !looks_like_email(&self.email) {
            errors.add("email", "Enter a valid email address.");
        }
        errors
    }
}

/// The login an administrator provisions alongside a new student.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    #[arg(long)]
    pub username: String,

    /// A temporary password the student is expected to change.
    #[arg(id = "temp_password", long = "temp-password")]
    pub password: String,

    /// The account email. Defaults to the student's email when omitted.
    #[arg(id = "account_email", long = "account-email")]
    pub email: Option<String>,
}

/// A partial update of a student. Fields left as `None` are not touched.
#[derive(Args, AsChangeset, Debug, Clone, Default, PartialEq, Eq)]
#[diesel(table_name = students)]
pub struct StudentChanges {
    #[arg(long)]
    pub student_id: Option<String>,

    #[arg(long)]
    pub full_name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub program: Option<String>,

    #[arg(long)]
    pub batch: Option<String>,

    #[arg(skip)]
    pub year: Option<Option<i32>>,
}

impl StudentChanges {
    pub fn is_empty(&self) -> bool {
        self.student_id.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.program.is_none()
            && self.batch.is_none()
            && self.year.is_none()
    }

    /// A copy with surrounding whitespace removed from every text field.
    pub fn trimmed(&self) -> Self {
        let trim = |value: &Option<String>| value.as_deref().map(|v| v.trim().to_string());
        Self {
            student_id: trim(&self.student_id),
            full_name: trim(&self.full_name),
            email: trim(&self.email),
            program: trim(&self.program),
            batch: trim(&self.batch),
            year: self.year,
        }
    }

    /// Checks that no provided field is blank.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let fields = [
            ("student_id", &self.student_id),
            ("full_name", &self.full_name),
            ("email", &self.email),
            ("program", &self.program),
            ("batch", &self.batch),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                errors.require(field, value);
            }
        }
        if let Some(email) = &self.email {
            if !email.trim().is_empty() && !looks_like_email(email) {
                errors.add("email", "Enter a valid email address.");
            }
        }
        errors
    }
}

/// One student's presence on one calendar date.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = attendance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttendanceRecord {
    pub id: i32,
    pub student: i32,
    pub date: NaiveDate,
    pub is_present: bool,
    pub marked_by: Option<i32>,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = attendance)]
pub struct NewAttendanceRecord {
    pub student: i32,
    pub date: NaiveDate,
    pub is_present: bool,
    pub marked_by: Option<i32>,
    pub updated_at: NaiveDateTime,
}

/// The current time as stored in `created_at`/`updated_at` columns.
pub(crate) fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub(crate) fn looks_like_email(value: &str) -> bool {
    match value.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
