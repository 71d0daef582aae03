//! The credential store: login accounts, password hashing, and self-service profile edits.

use crate::access::Caller;
use crate::error::{TrackerError, TrackerResult, ValidationErrors};
use crate::manager::AttendanceManager;
use crate::models::{self, Account, AccountChanges, NewAccount};
use crate::schema::accounts;
use diesel::prelude::*;
use pbkdf2::Pbkdf2;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand_core::OsRng;

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> TrackerResult<String> {
    Pbkdf2
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| TrackerError::PasswordHash(e.to_string()))
}

/// Returns `true` if `password` matches the stored PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok(),
        Err(_) => false,
    }
}

/// The fields an account holder may change about themselves.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub new_password1: Option<String>,
    pub new_password2: Option<String>,
    pub address: Option<String>,
}

/// Inserts a new account after checking the required fields and both uniqueness constraints.
pub(crate) fn insert_account(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
    email: &str,
    is_admin: bool,
) -> TrackerResult<Account> {
    let mut errors = ValidationErrors::new();
    errors.require("username", username);
    errors.require("password", password);
    errors.require("email", email);
    if !email.trim().is_empty() && !models::looks_like_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
    errors.into_result()?;

    if username_taken(conn, username, None)? {
        return Err(TrackerError::Duplicate {
            field: "username",
            value: username.to_string(),
        });
    }
    if email_taken(conn, email, None)? {
        return Err(TrackerError::Duplicate {
            field: "email",
            value: email.to_string(),
        });
    }

    let password_hash = hash_password(password)?;
    let account = diesel::insert_into(accounts::table)
        .values(NewAccount {
            username,
            email,
            password_hash: &password_hash,
            is_admin,
            address: "",
            created_at: models::now(),
        })
        .returning(Account::as_returning())
        .get_result(conn)
        .map_err(|e| TrackerError::from_insert(e, &[("username", username), ("email", email)]))?;

    log::info!("Created account `{}` (id {})", account.username, account.id);
    Ok(account)
}

pub(crate) fn remove_account(conn: &mut SqliteConnection, account_id: i32) -> TrackerResult<Account> {
    diesel::delete(accounts::table.find(account_id))
        .returning(Account::as_returning())
        .get_result(conn)
        .optional()?
        .ok_or_else(|| TrackerError::not_found("account", account_id))
}

fn username_taken(
    conn: &mut SqliteConnection,
    name: &str,
    except: Option<i32>,
) -> TrackerResult<bool> {
    let mut query = accounts::table
        .filter(accounts::username.eq(name))
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(accounts::id.ne(id));
    }
    let count: i64 = query.count().get_result(conn)?;
    Ok(count > 0)
}

fn email_taken(
    conn: &mut SqliteConnection,
    address: &str,
    except: Option<i32>,
) -> TrackerResult<bool> {
    let mut query = accounts::table
        .filter(accounts::email.eq(address))
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(accounts::id.ne(id));
    }
    let count: i64 = query.count().get_result(conn)?;
    Ok(count > 0)
}

impl AttendanceManager {
    /// Creates a login account and returns its id.
    ///
    /// Fails with [`TrackerError::Duplicate`] if the username or email is already in use.
    pub fn create_account(
        &mut self,
        username: &str,
        password: &str,
        email: &str,
        is_admin: bool,
    ) -> TrackerResult<i32> {
        insert_account(&mut self.db, username, password, email, is_admin).map(|a| a.id)
    }

    /// Self-registration of a regular (non-admin) account. Both password fields must match.
    pub fn signup(
        &mut self,
        username: &str,
        email: &str,
        password1: &str,
        password2: &str,
    ) -> TrackerResult<Account> {
        if password1 != password2 {
            let mut errors = ValidationErrors::new();
            errors.add("password2", "The two password fields didn't match.");
            return Err(errors.into());
        }
        insert_account(&mut self.db, username, password1, email, false)
    }

    /// Removes an account. Any student linked to it keeps existing with no account.
    pub fn delete_account(&mut self, account_id: i32) -> TrackerResult<Account> {
        let account = remove_account(&mut self.db, account_id)?;
        log::info!("Deleted account `{}`", account.username);
        Ok(account)
    }

    /// Retrieves an account by id.
    pub fn get_account(&mut self, account_id: i32) -> TrackerResult<Account> {
        accounts::table
            .find(account_id)
            .select(Account::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| TrackerError::not_found("account", account_id))
    }

    pub fn find_account(&mut self, name: &str) -> TrackerResult<Option<Account>> {
        Ok(accounts::table
            .filter(accounts::username.eq(name))
            .select(Account::as_select())
            .first(&mut self.db)
            .optional()?)
    }

    /// Checks a username/password pair and returns the identity to act as.
    pub fn authenticate(&mut self, username: &str, password: &str) -> TrackerResult<Caller> {
        let Some(account) = self.find_account(username)? else {
            log::warn!("Login attempt for unknown account `{username}`");
            return Err(TrackerError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash) {
            log::warn!("Wrong password for account `{username}`");
            return Err(TrackerError::InvalidCredentials);
        }

        Ok(Caller::from(&account))
    }

    /// Updates the caller's own username/email/address, and replaces their password when a new one is
    /// given.
    pub fn update_profile(&mut self, caller: &Caller, update: ProfileUpdate) -> TrackerResult<Account> {
        let mut errors = ValidationErrors::new();
        let mut changes = AccountChanges::default();

        if let Some(username) = update.username {
            errors.require("username", &username);
            if !username.trim().is_empty()
                && username_taken(&mut self.db, &username, Some(caller.account_id))?
            {
                errors.add("username", "A user with that username already exists.");
            }
            changes.username = Some(username);
        }

        if let Some(email) = update.email {
            errors.require("email", &email);
            if !email.trim().is_empty() {
                if !models::looks_like_email(&email) {
                    errors.add("email", "Enter a valid email address.");
                } else if email_taken(&mut self.db, &email, Some(caller.account_id))? {
                    errors.add("email", "A user with that email already exists.");
                }
            }
            changes.email = Some(email);
        }

        if let Some(address) = update.address {
            changes.address = Some(address.trim().to_string());
        }

        let p1 = update.new_password1.filter(|p| !p.is_empty());
        let p2 = update.new_password2.filter(|p| !p.is_empty());
        match (p1, p2) {
            (None, None) => {}
            (Some(p1), Some(p2)) if p1 == p2 => changes.password_hash = Some(hash_password(&p1)?),
            _ => errors.add("new_password2", "Passwords do not match."),
        }

        errors.into_result()?;

        if changes.username.is_none()
            && changes.email.is_none()
            && changes.password_hash.is_none()
            && changes.address.is_none()
        {
            return self.get_account(caller.account_id);
        }

        let account = diesel::update(accounts::table.find(caller.account_id))
            .set(&changes)
            .returning(Account::as_returning())
            .get_result(&mut self.db)
            .optional()?
            .ok_or_else(|| TrackerError::not_found("account", caller.account_id))?;

        log::info!("Account `{}` updated their profile", account.username);
        Ok(account)
    }
}
