//! Roster management: creating, editing, and removing students along with their login accounts.

use crate::access::Caller;
use crate::accounts;
use crate::error::{TrackerError, TrackerResult, ValidationErrors};
use crate::manager::AttendanceManager;
use crate::models::{self, Credentials, NewStudent, Student, StudentChanges, StudentProfile};
use crate::schema::students;
use diesel::prelude::*;

/// The distinct programs and batches currently on the roster, used to offer cohort choices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortChoices {
    pub programs: Vec<String>,
    pub batches: Vec<String>,
}

/// Headline numbers for the administrator's landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOverview {
    pub total_students: usize,
    pub total_records: usize,
    pub choices: CohortChoices,
}

/// Records a validation error for every unique student column that `student_id`/`email` would
/// collide with. `except` excludes the student being edited.
fn check_unique(
    conn: &mut SqliteConnection,
    errors: &mut ValidationErrors,
    student_code: Option<&str>,
    email: Option<&str>,
    except: Option<i32>,
) -> TrackerResult<()> {
    if let Some(code) = student_code {
        let mut query = students::table
            .filter(students::student_id.eq(code))
            .into_boxed();
        if let Some(id) = except {
            query = query.filter(students::id.ne(id));
        }
        let count: i64 = query.count().get_result(conn)?;
        if count > 0 {
            errors.add("student_id", "Student with this Student id already exists.");
        }
    }

    if let Some(address) = email {
        let mut query = students::table
            .filter(students::email.eq(address))
            .into_boxed();
        if let Some(id) = except {
            query = query.filter(students::id.ne(id));
        }
        let count: i64 = query.count().get_result(conn)?;
        if count > 0 {
            errors.add("email", "Student with this Email already exists.");
        }
    }

    Ok(())
}

impl AttendanceManager {
    /// Retrieves all students on the roster, ordered by their student ID.
    pub fn list_students(&mut self, caller: &Caller) -> TrackerResult<Vec<Student>> {
        caller.require_admin()?;

        Ok(students::table
            .order(students::student_id.asc())
            .select(Student::as_select())
            .load(&mut self.db)?)
    }

    /// Retrieves a specific student by their database id.
    pub fn get_student(&mut self, id: i32) -> TrackerResult<Student> {
        students::table
            .find(id)
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| TrackerError::not_found("student", id))
    }

    /// Looks a student up by their external student ID (e.g. `STU001`).
    pub fn find_student(&mut self, student_code: &str) -> TrackerResult<Option<Student>> {
        Ok(students::table
            .filter(students::student_id.eq(student_code))
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Retrieves every student in the given program and batch, ordered by full name.
    pub fn cohort(&mut self, program: &str, batch: &str) -> TrackerResult<Vec<Student>> {
        Ok(students::table
            .filter(students::program.eq(program))
            .filter(students::batch.eq(batch))
            .order((students::full_name.asc(), students::id.asc()))
            .select(Student::as_select())
            .load(&mut self.db)?)
    }

    /// Creates a login account from `credentials` and a student profile linked to it.
    ///
    /// Both rows are written in one transaction, so a failure leaves the store unchanged.
    pub fn create_student(
        &mut self,
        caller: &Caller,
        profile: &StudentProfile,
        credentials: &Credentials,
    ) -> TrackerResult<Student> {
        caller.require_admin()?;

        let mut errors = profile.validate();
        errors.require("username", &credentials.username);
        errors.require("password", &credentials.password);

        let student = self.db.transaction::<_, TrackerError, _>(|conn| {
            check_unique(
                conn,
                &mut errors,
                Some(profile.student_id.trim()),
                Some(profile.email.trim()),
                None,
            )?;
            std::mem::take(&mut errors).into_result()?;

            let account_email = credentials.email.as_deref().unwrap_or(&profile.email);
            let account = accounts::insert_account(
                conn,
                &credentials.username,
                &credentials.password,
                account_email,
                false,
            )?;

            diesel::insert_into(students::table)
                .values(NewStudent {
                    account_id: Some(account.id),
                    student_id: profile.student_id.trim(),
                    full_name: profile.full_name.trim(),
                    email: profile.email.trim(),
                    program: profile.program.trim(),
                    batch: profile.batch.trim(),
                    year: profile.year,
                    created_at: models::now(),
                })
                .returning(Student::as_returning())
                .get_result(conn)
                .map_err(|e| {
                    TrackerError::from_insert(
                        e,
                        &[
                            ("student_id", profile.student_id.trim()),
                            ("email", profile.email.trim()),
                        ],
                    )
                })
        })?;

        log::info!(
            "Added student {} ({}) with account `{}`",
            student.student_id,
            student.full_name,
            credentials.username
        );
        Ok(student)
    }

    /// Applies a partial update to a student's profile. The linked account is never touched.
    pub fn update_student(
        &mut self,
        caller: &Caller,
        id: i32,
        changes: &StudentChanges,
    ) -> TrackerResult<Student> {
        caller.require_admin()?;

        let current = self.get_student(id)?;
        if changes.is_empty() {
            return Ok(current);
        }

        let changes = changes.trimmed();
        let mut errors = changes.validate();
        check_unique(
            &mut self.db,
            &mut errors,
            changes.student_id.as_deref(),
            changes.email.as_deref(),
            Some(id),
        )?;
        errors.into_result()?;

        let student = diesel::update(students::table.find(id))
            .set(&changes)
            .returning(Student::as_returning())
            .get_result(&mut self.db)
            .map_err(|e| {
                TrackerError::from_insert(
                    e,
                    &[
                        ("student_id", changes.student_id.as_deref().unwrap_or_default()),
                        ("email", changes.email.as_deref().unwrap_or_default()),
                    ],
                )
            })?;

        log::info!("Updated student {}", student.student_id);
        Ok(student)
    }

    /// Removes a student and then the account linked to it, if any.
    ///
    /// The store only nulls the link when an account goes away, so the account is deleted here
    /// explicitly: capture the link, delete the student, then delete the account.
    pub fn delete_student(&mut self, caller: &Caller, id: i32) -> TrackerResult<Student> {
        caller.require_admin()?;

        let student = self.db.transaction::<_, TrackerError, _>(|conn| {
            let linked_account: Option<i32> = students::table
                .find(id)
                .select(students::account_id)
                .first(conn)
                .optional()?
                .ok_or_else(|| TrackerError::not_found("student", id))?;

            let student = diesel::delete(students::table.find(id))
                .returning(Student::as_returning())
                .get_result(conn)?;

            if let Some(account_id) = linked_account {
                accounts::remove_account(conn, account_id)?;
            }

            Ok(student)
        })?;

        log::info!("Deleted student {} ({})", student.student_id, student.full_name);
        Ok(student)
    }

    /// The distinct programs and batches on the roster, queried fresh each time.
    pub fn cohort_choices(&mut self) -> TrackerResult<CohortChoices> {
        let programs = students::table
            .select(students::program)
            .distinct()
            .order(students::program.asc())
            .load(&mut self.db)?;
        let batches = students::table
            .select(students::batch)
            .distinct()
            .order(students::batch.asc())
            .load(&mut self.db)?;

        Ok(CohortChoices { programs, batches })
    }

    pub fn admin_overview(&mut self, caller: &Caller) -> TrackerResult<AdminOverview> {
        caller.require_admin()?;

        Ok(AdminOverview {
            total_students: self.num_students()?,
            total_records: self.num_records()?,
            choices: self.cohort_choices()?,
        })
    }
}
