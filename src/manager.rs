use crate::error::TrackerResult;
use crate::schema;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;

/// The SQL that creates every table the tracker needs. Every statement is `IF NOT EXISTS`, so
/// applying it to an existing database is a no-op.
const SCHEMA_SQL: &str = include_str!("../migrations/2025-01-15-000000_create_tracker_tables/up.sql");

/// The manager for recording, modifying, and retrieving attendance data.
///
/// Roster, recording, and reporting operations are implemented across the [`roster`],
/// [`recorder`], and [`report`] modules as additional `impl` blocks on this type.
///
/// [`roster`]: crate::roster
/// [`recorder`]: crate::recorder
/// [`report`]: crate::report
pub struct AttendanceManager {
    pub(crate) db: SqliteConnection,
}

impl AttendanceManager {
    /// Connects to the `sqlite3` database at `database_url` (a file path, or `:memory:`).
    pub fn connect(database_url: &str) -> TrackerResult<Self> {
        let mut connection = SqliteConnection::establish(database_url)?;

        // SQLite leaves foreign key enforcement off unless asked, per connection.
        connection.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;

        log::debug!("Connected to {database_url}");
        Ok(Self { db: connection })
    }

    /// Opens a fresh in-memory database with the schema already applied.
    pub fn in_memory() -> TrackerResult<Self> {
        let mut manager = Self::connect(":memory:")?;
        manager.initialize_schema()?;
        Ok(manager)
    }

    /// Creates the `accounts`, `students`, and `attendance` tables if they do not exist yet.
    pub fn initialize_schema(&mut self) -> TrackerResult<()> {
        self.db.batch_execute(SCHEMA_SQL)?;
        log::info!("Database schema is up to date");
        Ok(())
    }

    /// Returns the total number of students on the roster.
    pub fn num_students(&mut self) -> TrackerResult<usize> {
        use schema::students::dsl::*;

        let count: i64 = students.count().get_result(&mut self.db)?;
        Ok(count as usize)
    }

    /// Returns the total number of attendance records ever written.
    pub fn num_records(&mut self) -> TrackerResult<usize> {
        use schema::attendance::dsl::*;

        let count: i64 = attendance.count().get_result(&mut self.db)?;
        Ok(count as usize)
    }
}
