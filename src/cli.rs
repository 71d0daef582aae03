//! This module contains the command-line interface [`Cli`] parser for managing the roster,
//! recording attendance, and viewing reports.

use crate::models::{Credentials, StudentChanges, StudentProfile};
use crate::report::StatusFilter;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "attendance-tracker", version, about)]
pub struct Cli {
    /// The username to act as.
    #[arg(long, short, global = true, env = "TRACKER_USER")]
    pub user: Option<String>,

    /// The password of `--user`.
    #[arg(long, global = true, env = "TRACKER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The different commands available.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new (non-admin) account.
    Signup {
        username: String,
        email: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },

    /// Change your own username, email, or password.
    Profile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
        /// Postal address, free text.
        #[arg(long)]
        address: Option<String>,
    },

    /// Show roster and record totals.
    Overview,

    /// List every student on the roster.
    Roster {
        /// Show every profile field.
        #[arg(long, short)]
        verbose: bool,
    },

    /// List the programs and batches on the roster.
    Choices,

    /// Add a new student and provision their login.
    AddStudent {
        #[command(flatten)]
        profile: StudentProfile,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Edit a student's profile.
    EditStudent {
        /// The student ID of the student to edit.
        student: String,

        #[command(flatten)]
        changes: StudentChanges,

        #[arg(long, conflicts_with = "clear_year")]
        year: Option<i32>,

        /// Remove the student's year.
        #[arg(long)]
        clear_year: bool,
    },

    /// Remove a student and their login from the roster.
    DeleteStudent { student: String },

    /// Show the marking sheet of a cohort.
    Sheet {
        program: String,
        batch: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a whole cohort. Students not listed as present are marked absent.
    Mark {
        program: String,
        batch: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Comma-separated student IDs of the students who were present.
        #[arg(long, value_delimiter = ',')]
        present: Vec<String>,
    },

    /// List recorded attendance, most recent first.
    Records {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        program: Option<String>,
        #[arg(long)]
        batch: Option<String>,
    },

    /// Change the status of a single attendance record.
    EditRecord {
        id: i32,
        /// Mark the record absent instead of present.
        #[arg(long)]
        absent: bool,
    },

    /// Daily attendance report of a cohort.
    Daily {
        program: String,
        batch: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Monthly attendance report of a cohort.
    Monthly {
        program: String,
        batch: String,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        year: i32,
        /// Also write the report to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show an attendance dashboard. Students see their own; admins may pass `--student`.
    Dashboard {
        #[arg(long)]
        student: Option<String>,
    },

    /// Show attendance history, most recent first.
    History {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[arg(long)]
        student: Option<String>,
    },

    /// Show one month of attendance for a student.
    MonthSummary {
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        student: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_splits_present_list() {
        let cli = Cli::try_parse_from([
            "attendance-tracker",
            "--user",
            "admin",
            "mark",
            "CS",
            "2024",
            "--date",
            "2024-03-01",
            "--present",
            "STU001,STU002",
        ])
        .unwrap();

        match cli.command {
            Command::Mark { date, present, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert_eq!(present, vec!["STU001", "STU002"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn history_status_defaults_to_all() {
        let cli = Cli::try_parse_from(["attendance-tracker", "history", "--month", "5"]).unwrap();

        match cli.command {
            Command::History {
                month,
                year,
                status,
                ..
            } => {
                assert_eq!(month, Some(5));
                assert_eq!(year, None);
                assert_eq!(status, StatusFilter::All);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        let result = Cli::try_parse_from([
            "attendance-tracker",
            "monthly",
            "CS",
            "2024",
            "--month",
            "13",
            "--year",
            "2024",
        ]);
        assert!(result.is_err());
    }
}
