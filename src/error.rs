//! The error type shared by every attendance operation.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt;
use thiserror::Error;

/// A convenience alias for results produced by the tracker.
pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Bad input on create/update, with one entry per offending field.
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint would be (or was) violated.
    #[error("{field} `{value}` is already taken")]
    Duplicate { field: &'static str, value: String },

    #[error("account `{username}` is not an administrator")]
    PermissionDenied { username: String },

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("could not connect to the database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        TrackerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Turns a store-level unique violation into [`TrackerError::Duplicate`], leaving every other
    /// error as is. `candidates` pairs each unique column with the value written to it; the one
    /// SQLite names in its message (`UNIQUE constraint failed: table.column`) is reported.
    pub(crate) fn from_insert(err: DieselError, candidates: &[(&'static str, &str)]) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let message = info.message();
                let (field, value) = candidates
                    .iter()
                    .find(|(column, _)| {
                        message
                            .split([',', ':'])
                            .any(|part| part.trim().rsplit('.').next() == Some(*column))
                    })
                    .copied()
                    .unwrap_or(("value", ""));
                TrackerError::Duplicate {
                    field,
                    value: value.to_string(),
                }
            }
            other => TrackerError::Database(other),
        }
    }
}

impl From<ValidationErrors> for TrackerError {
    fn from(errors: ValidationErrors) -> Self {
        TrackerError::Validation(errors)
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collects field errors so a form can report every problem at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Records a "this field is required" error if `value` is blank.
    pub fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required.");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Returns `true` if some error was recorded against `field`.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` if nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> TrackerResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid input")?;
        for (i, error) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}
