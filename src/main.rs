use attendance_tracker::accounts::ProfileUpdate;
use attendance_tracker::cli::{Cli, Command};
use attendance_tracker::manager::AttendanceManager;
use attendance_tracker::models::{Student, StudentChanges};
use attendance_tracker::recorder::RecordFilter;
use attendance_tracker::report::HistoryFilter;
use attendance_tracker::{Caller, TrackerError, TrackerResult, display};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::fs::File;
use std::process::ExitCode;

const NO_PROFILE: &str = "No student profile is linked to your account. Ask an administrator to \
                          add you to the roster.";

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    let mut manager = match attendance_tracker::create_default_manager() {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&mut manager, cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("Command failed: {err:?}");
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Turns an operation error into a message for the user.
fn report_error(err: &TrackerError) {
    match err {
        TrackerError::Validation(errors) => {
            eprintln!("Please correct the following:");
            for error in errors.fields() {
                eprintln!("  {}: {}", error.field, error.message);
            }
        }
        TrackerError::NotFound { .. } => eprintln!("Not found: {err}"),
        other => eprintln!("error: {other}"),
    }
}

fn login(manager: &mut AttendanceManager, cli: &Cli) -> TrackerResult<Caller> {
    match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => manager.authenticate(user, password),
        _ => Err(TrackerError::InvalidCredentials),
    }
}

fn student_by_code(manager: &mut AttendanceManager, code: &str) -> TrackerResult<Student> {
    manager
        .find_student(code)?
        .ok_or_else(|| TrackerError::not_found("student", code))
}

/// Picks the student a self-service command is about: `--student` for admins, otherwise the
/// caller's own profile. `None` means the caller has no profile.
fn target_student(
    manager: &mut AttendanceManager,
    caller: &Caller,
    code: Option<&str>,
) -> TrackerResult<Option<Student>> {
    match code {
        Some(code) => {
            caller.require_admin()?;
            student_by_code(manager, code).map(Some)
        }
        None => manager.resolve_student_for_caller(caller),
    }
}

fn run(manager: &mut AttendanceManager, cli: Cli) -> TrackerResult<()> {
    let today: NaiveDate = Local::now().date_naive();

    if let Command::Signup {
        username,
        email,
        new_password,
        confirm_password,
    } = &cli.command
    {
        let account = manager.signup(username, email, new_password, confirm_password)?;
        println!("Created account `{}`.", account.username);
        return Ok(());
    }

    let caller = login(manager, &cli)?;

    match cli.command {
        Command::Signup { .. } => unreachable!("handled before logging in"),

        Command::Profile {
            username,
            email,
            new_password,
            confirm_password,
            address,
        } => {
            let update = ProfileUpdate {
                username,
                email,
                new_password1: new_password,
                new_password2: confirm_password,
                address,
            };
            let account = manager.update_profile(&caller, update)?;
            println!("Profile saved for `{}` <{}>.", account.username, account.email);
        }

        Command::Overview => {
            let overview = manager.admin_overview(&caller)?;
            println!("{}", display::render_overview(&overview));
        }

        Command::Roster { verbose } => {
            let roster = manager.list_students(&caller)?;
            println!("{}", display::render_roster(&roster, verbose));
        }

        Command::Choices => {
            caller.require_admin()?;
            let choices = manager.cohort_choices()?;
            println!("Programs: {}", choices.programs.join(", "));
            println!("Batches: {}", choices.batches.join(", "));
        }

        Command::AddStudent {
            profile,
            credentials,
        } => {
            let student = manager.create_student(&caller, &profile, &credentials)?;
            println!(
                "Added {} ({}) with login `{}`.",
                student.full_name, student.student_id, credentials.username
            );
        }

        Command::EditStudent {
            student,
            changes,
            year,
            clear_year,
        } => {
            let target = student_by_code(manager, &student)?;
            let changes = StudentChanges {
                year: if clear_year { Some(None) } else { year.map(Some) },
                ..changes
            };
            let updated = manager.update_student(&caller, target.id, &changes)?;
            println!("Saved {} ({}).", updated.full_name, updated.student_id);
        }

        Command::DeleteStudent { student } => {
            let target = student_by_code(manager, &student)?;
            let deleted = manager.delete_student(&caller, target.id)?;
            println!("Deleted {} ({}).", deleted.full_name, deleted.student_id);
        }

        Command::Sheet {
            program,
            batch,
            date,
        } => {
            let sheet = manager.get_marking_sheet(&caller, &program, &batch, date.unwrap_or(today))?;
            println!("{}", display::render_marking_sheet(&sheet));
        }

        Command::Mark {
            program,
            batch,
            date,
            present,
        } => {
            let mut present_ids = Vec::with_capacity(present.len());
            for code in &present {
                match manager.find_student(code)? {
                    Some(student) => present_ids.push(student.id),
                    None => log::warn!("Tried to mark an unknown student {code} as present"),
                }
            }

            let on = date.unwrap_or(today);
            let submission = manager.submit_attendance(&caller, &program, &batch, on, &present_ids)?;
            println!(
                "Attendance for {program}/{batch} on {on} saved: {} present, {} absent.",
                submission.present, submission.absent
            );
            if !submission.ignored.is_empty() {
                println!(
                    "{} student(s) were not in this cohort and were skipped.",
                    submission.ignored.len()
                );
            }
        }

        Command::Records {
            date,
            program,
            batch,
        } => {
            let filter = RecordFilter {
                date,
                program,
                batch,
            };
            let records = manager.list_records(&caller, &filter)?;
            println!(
                "{}",
                display::render_records(records.iter().map(|(r, s)| (r, Some(s))))
            );
        }

        Command::EditRecord { id, absent } => {
            let record = manager.edit_single_record(&caller, id, !absent)?;
            println!(
                "Record {} on {} is now {}.",
                record.id,
                record.date,
                if record.is_present { "present" } else { "absent" }
            );
        }

        Command::Daily {
            program,
            batch,
            date,
        } => {
            let report = manager.daily_report(&caller, &program, &batch, date.unwrap_or(today))?;
            println!("{}", display::render_daily_report(&report));
        }

        Command::Monthly {
            program,
            batch,
            month,
            year,
            csv,
        } => {
            let report = manager.monthly_report(&caller, &program, &batch, month, year)?;
            println!("{}", display::render_monthly_report(&report));

            if let Some(path) = csv {
                report.write_csv(File::create(&path)?)?;
                println!("Wrote {}.", path.display());
            }
        }

        Command::Dashboard { student } => {
            match target_student(manager, &caller, student.as_deref())? {
                Some(student) => {
                    let dashboard = manager.student_dashboard(student.id, today)?;
                    println!("{}", display::render_dashboard(&dashboard));
                }
                None => println!("{NO_PROFILE}"),
            }
        }

        Command::History {
            month,
            year,
            status,
            student,
        } => {
            let filter = HistoryFilter {
                month,
                year,
                status,
            };
            match target_student(manager, &caller, student.as_deref())? {
                Some(student) => {
                    let records = manager.student_history(student.id, &filter)?;
                    println!(
                        "{}",
                        display::render_records(records.iter().map(|r| (r, None)))
                    );
                }
                None => println!("{NO_PROFILE}"),
            }
        }

        Command::MonthSummary {
            month,
            year,
            student,
        } => match target_student(manager, &caller, student.as_deref())? {
            Some(student) => {
                let summary = manager.student_monthly_summary(student.id, month, year)?;
                println!("{}", display::render_month_summary(&summary));
            }
            None => println!("{NO_PROFILE}"),
        },
    }

    Ok(())
}
