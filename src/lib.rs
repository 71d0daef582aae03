use anyhow::Result;

pub mod access;
pub mod accounts;
pub mod cli;
pub mod display;
pub mod error;
pub mod manager;
pub mod models;
pub mod recorder;
pub mod report;
pub mod roster;
pub mod schema;
pub mod settings;

pub use crate::access::Caller;
pub use crate::error::{TrackerError, TrackerResult};
use crate::manager::AttendanceManager;
use crate::settings::Settings;

/// Connects to the database named by the configuration and makes sure its schema exists.
pub fn create_default_manager() -> Result<AttendanceManager> {
    let settings = Settings::load()?;

    let mut manager = AttendanceManager::connect(&settings.database.url)?;
    manager.initialize_schema()?;

    Ok(manager)
}
