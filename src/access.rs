//! Caller identity and the checks made against it before an operation runs.

use crate::error::{TrackerError, TrackerResult};
use crate::manager::AttendanceManager;
use crate::models::{Account, Student};
use crate::schema::students;
use diesel::prelude::*;

/// The authenticated account an operation is performed on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account_id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl Caller {
    /// Guard clause for every admin-scoped operation.
    pub fn require_admin(&self) -> TrackerResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            log::warn!("`{}` attempted an admin-only operation", self.username);
            Err(TrackerError::PermissionDenied {
                username: self.username.clone(),
            })
        }
    }
}

impl From<&Account> for Caller {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username.clone(),
            is_admin: account.is_admin,
        }
    }
}

impl AttendanceManager {
    /// Finds the student profile linked to the caller's account, if there is one.
    ///
    /// An account without a student profile (an administrator, or a freshly signed-up user) is a
    /// normal case and yields `Ok(None)`.
    pub fn resolve_student_for_caller(&mut self, caller: &Caller) -> TrackerResult<Option<Student>> {
        Ok(students::table
            .filter(students::account_id.eq(caller.account_id))
            .select(Student::as_select())
            .first(&mut self.db)
            .optional()?)
    }
}
