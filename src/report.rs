//! Read-only attendance reports: daily and monthly cohort reports, and per-student dashboards and
//! history.

use crate::access::Caller;
use crate::error::{TrackerError, TrackerResult, ValidationErrors};
use crate::manager::AttendanceManager;
use crate::models::{AttendanceRecord, Student};
use crate::recorder;
use crate::schema::attendance;
use chrono::{Datelike, Days, Months, NaiveDate};
use clap::ValueEnum;
use diesel::dsl::count_star;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io;

/// The most rows a student's history view returns.
pub const HISTORY_LIMIT: i64 = 100;

/// The length of the dashboard trend window, in days, including today.
pub const TREND_DAYS: u64 = 30;

/// The length of the dashboard's "this week" window, in days, including today.
pub const RECENT_DAYS: u64 = 7;

/// `present / total` as a percentage rounded to 2 decimal places, or `0.0` when `total` is zero.
pub fn percent(present: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let exact = present as f64 / total as f64 * 100.0;
    // Two-place formatting rounds exact ties to even.
    format!("{exact:.2}").parse().unwrap_or(exact)
}

/// Present/absent counts over some set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub percent: f64,
}

impl Tally {
    pub fn new(present: i64, absent: i64) -> Self {
        let total = present + absent;
        Self {
            total,
            present,
            absent,
            percent: percent(present, total),
        }
    }

    pub fn from_statuses(statuses: impl IntoIterator<Item = bool>) -> Self {
        let (present, absent) = statuses
            .into_iter()
            .fold((0, 0), |(p, a), is_present| {
                if is_present { (p + 1, a) } else { (p, a + 1) }
            });
        Self::new(present, absent)
    }
}

/// The inclusive first and last day of `month` in `year`.
pub fn month_bounds(month: u32, year: i32) -> TrackerResult<(NaiveDate, NaiveDate)> {
    let invalid = || {
        let mut errors = ValidationErrors::new();
        errors.add("month", format!("{month}/{year} is not a valid month."));
        TrackerError::from(errors)
    };

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;

    Ok((first, last))
}

/// The number of days in `month` of `year`, accounting for leap years.
pub fn days_in_month(month: u32, year: i32) -> TrackerResult<u32> {
    let (_, last) = month_bounds(month, year)?;
    Ok(last.day())
}

fn year_bounds(year: i32) -> TrackerResult<(NaiveDate, NaiveDate)> {
    let (first, _) = month_bounds(1, year)?;
    let (_, last) = month_bounds(12, year)?;
    Ok((first, last))
}

/// The qualitative band a student's overall attendance falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTier {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Critical,
}

impl StatusTier {
    pub fn from_percent(percent: f64) -> Self {
        match percent {
            p if p >= 90.0 => StatusTier::Excellent,
            p if p >= 75.0 => StatusTier::Good,
            p if p >= 60.0 => StatusTier::Average,
            p if p >= 50.0 => StatusTier::BelowAverage,
            _ => StatusTier::Critical,
        }
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusTier::Excellent => "Excellent",
            StatusTier::Good => "Good",
            StatusTier::Average => "Average",
            StatusTier::BelowAverage => "Below Average",
            StatusTier::Critical => "Critical",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub student: Student,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub program: String,
    pub batch: String,
    pub date: NaiveDate,
    pub rows: Vec<DailyRow>,
    pub summary: Tally,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub student: Student,
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    pub program: String,
    pub batch: String,
    pub month: u32,
    pub year: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<MonthlyRow>,
}

/// A flattened [`MonthlyRow`] for CSV export.
#[derive(Serialize)]
struct ExportRow<'a> {
    student_id: &'a str,
    full_name: &'a str,
    total: i64,
    present: i64,
    absent: i64,
    percent: f64,
}

impl MonthlyReport {
    /// Writes one CSV line per student, with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> TrackerResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv.serialize(ExportRow {
                student_id: &row.student.student_id,
                full_name: &row.student.full_name,
                total: row.tally.total,
                present: row.tally.present,
                absent: row.tally.absent,
                percent: row.tally.percent,
            })?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub is_present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentDashboard {
    pub student: Student,
    pub overall: Tally,
    pub this_month: Tally,
    pub last_7_days: Tally,
    /// One point per recorded day in the trailing window, oldest first. Days without a record are
    /// left out rather than counted as absent.
    pub trend: Vec<TrendPoint>,
    pub tier: StatusTier,
    pub last_attendance: Option<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentMonthSummary {
    pub student: Student,
    pub month: u32,
    pub year: i32,
    pub tally: Tally,
    /// The month's records, oldest first.
    pub records: Vec<AttendanceRecord>,
}

/// Which records a history view keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Present,
    Absent,
}

/// Filters for a student's attendance history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub status: StatusFilter,
}

impl HistoryFilter {
    /// A month only narrows the history together with a year. A year on its own selects the whole
    /// year, and a month without a year is ignored.
    pub fn date_range(&self) -> TrackerResult<Option<(NaiveDate, NaiveDate)>> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => month_bounds(month, year).map(Some),
            (None, Some(year)) => year_bounds(year).map(Some),
            _ => Ok(None),
        }
    }
}

/// Counts present and absent records per student, optionally restricted to an inclusive date
/// range. Students without any matching record are absent from the map.
fn tally_by_student(
    conn: &mut SqliteConnection,
    student_ids: &[i32],
    range: Option<(NaiveDate, NaiveDate)>,
) -> QueryResult<HashMap<i32, Tally>> {
    let base = attendance::table.filter(attendance::student.eq_any(student_ids));

    let counts: Vec<(i32, bool, i64)> = match range {
        Some((from, to)) => base
            .filter(attendance::date.between(from, to))
            .group_by((attendance::student, attendance::is_present))
            .select((attendance::student, attendance::is_present, count_star()))
            .load(conn)?,
        None => base
            .group_by((attendance::student, attendance::is_present))
            .select((attendance::student, attendance::is_present, count_star()))
            .load(conn)?,
    };

    let mut split: HashMap<i32, (i64, i64)> = HashMap::new();
    for (student, is_present, count) in counts {
        let entry = split.entry(student).or_default();
        if is_present {
            entry.0 += count;
        } else {
            entry.1 += count;
        }
    }

    Ok(split
        .into_iter()
        .map(|(student, (present, absent))| (student, Tally::new(present, absent)))
        .collect())
}

fn tally_for(
    conn: &mut SqliteConnection,
    student_id: i32,
    range: Option<(NaiveDate, NaiveDate)>,
) -> QueryResult<Tally> {
    Ok(tally_by_student(conn, &[student_id], range)?
        .remove(&student_id)
        .unwrap_or_default())
}

/// The inclusive window of `days` days ending on `today`.
fn trailing_window(today: NaiveDate, days: u64) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(days.saturating_sub(1)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

impl AttendanceManager {
    /// Reports who was present on `on`. A student with no record for the date counts as absent.
    pub fn daily_report(
        &mut self,
        caller: &Caller,
        program: &str,
        batch: &str,
        on: NaiveDate,
    ) -> TrackerResult<DailyReport> {
        caller.require_admin()?;

        let cohort = self.cohort(program, batch)?;
        let ids: Vec<i32> = cohort.iter().map(|s| s.id).collect();
        let records = recorder::records_on(&mut self.db, on, &ids)?;

        let rows: Vec<DailyRow> = cohort
            .into_iter()
            .map(|student| DailyRow {
                present: records.get(&student.id).is_some_and(|r| r.is_present),
                student,
            })
            .collect();
        let summary = Tally::from_statuses(rows.iter().map(|row| row.present));

        log::debug!("Daily report for {program}/{batch} on {on}: {summary:?}");
        Ok(DailyReport {
            program: program.to_string(),
            batch: batch.to_string(),
            date: on,
            rows,
            summary,
        })
    }

    /// Per-student totals for the cohort over every day of `month`/`year`.
    pub fn monthly_report(
        &mut self,
        caller: &Caller,
        program: &str,
        batch: &str,
        month: u32,
        year: i32,
    ) -> TrackerResult<MonthlyReport> {
        caller.require_admin()?;

        let (start, end) = month_bounds(month, year)?;
        let cohort = self.cohort(program, batch)?;
        let ids: Vec<i32> = cohort.iter().map(|s| s.id).collect();
        let mut tallies = tally_by_student(&mut self.db, &ids, Some((start, end)))?;

        let rows = cohort
            .into_iter()
            .map(|student| MonthlyRow {
                tally: tallies.remove(&student.id).unwrap_or_default(),
                student,
            })
            .collect();

        Ok(MonthlyReport {
            program: program.to_string(),
            batch: batch.to_string(),
            month,
            year,
            start,
            end,
            rows,
        })
    }

    /// Builds the full dashboard for one student as of `today`.
    pub fn student_dashboard(
        &mut self,
        student_id: i32,
        today: NaiveDate,
    ) -> TrackerResult<StudentDashboard> {
        let student = self.get_student(student_id)?;

        let overall = tally_for(&mut self.db, student_id, None)?;
        let this_month = tally_for(
            &mut self.db,
            student_id,
            Some(month_bounds(today.month(), today.year())?),
        )?;
        let last_7_days = tally_for(
            &mut self.db,
            student_id,
            Some(trailing_window(today, RECENT_DAYS)),
        )?;

        let (trend_start, trend_end) = trailing_window(today, TREND_DAYS);
        let trend = attendance::table
            .filter(attendance::student.eq(student_id))
            .filter(attendance::date.between(trend_start, trend_end))
            .order(attendance::date.asc())
            .select((attendance::date, attendance::is_present))
            .load::<(NaiveDate, bool)>(&mut self.db)?
            .into_iter()
            .map(|(date, is_present)| TrendPoint { date, is_present })
            .collect();

        let last_attendance = attendance::table
            .filter(attendance::student.eq(student_id))
            .order(attendance::date.desc())
            .select((attendance::date, attendance::is_present))
            .first::<(NaiveDate, bool)>(&mut self.db)
            .optional()?
            .map(|(date, is_present)| TrendPoint { date, is_present });

        Ok(StudentDashboard {
            student,
            tier: StatusTier::from_percent(overall.percent),
            overall,
            this_month,
            last_7_days,
            trend,
            last_attendance,
        })
    }

    /// A student's own records, most recent first, capped at [`HISTORY_LIMIT`] rows.
    pub fn student_history(
        &mut self,
        student_id: i32,
        filter: &HistoryFilter,
    ) -> TrackerResult<Vec<AttendanceRecord>> {
        self.get_student(student_id)?;

        let mut query = attendance::table
            .filter(attendance::student.eq(student_id))
            .select(AttendanceRecord::as_select())
            .into_boxed();

        if let Some((from, to)) = filter.date_range()? {
            query = query.filter(attendance::date.between(from, to));
        }
        query = match filter.status {
            StatusFilter::All => query,
            StatusFilter::Present => query.filter(attendance::is_present.eq(true)),
            StatusFilter::Absent => query.filter(attendance::is_present.eq(false)),
        };

        Ok(query
            .order((attendance::date.desc(), attendance::id.desc()))
            .limit(HISTORY_LIMIT)
            .load(&mut self.db)?)
    }

    /// A student's totals and records for one month.
    pub fn student_monthly_summary(
        &mut self,
        student_id: i32,
        month: u32,
        year: i32,
    ) -> TrackerResult<StudentMonthSummary> {
        let student = self.get_student(student_id)?;
        let (start, end) = month_bounds(month, year)?;

        let records: Vec<AttendanceRecord> = attendance::table
            .filter(attendance::student.eq(student_id))
            .filter(attendance::date.between(start, end))
            .order(attendance::date.asc())
            .select(AttendanceRecord::as_select())
            .load(&mut self.db)?;

        Ok(StudentMonthSummary {
            student,
            month,
            year,
            tally: Tally::from_statuses(records.iter().map(|r| r.is_present)),
            records,
        })
    }

    /// The caller's own dashboard, or `None` when no student profile is linked to them.
    pub fn dashboard_for_caller(
        &mut self,
        caller: &Caller,
        today: NaiveDate,
    ) -> TrackerResult<Option<StudentDashboard>> {
        match self.resolve_student_for_caller(caller)? {
            Some(student) => self.student_dashboard(student.id, today).map(Some),
            None => Ok(None),
        }
    }

    /// The caller's own history, or `None` when no student profile is linked to them.
    pub fn history_for_caller(
        &mut self,
        caller: &Caller,
        filter: &HistoryFilter,
    ) -> TrackerResult<Option<Vec<AttendanceRecord>>> {
        match self.resolve_student_for_caller(caller)? {
            Some(student) => self.student_history(student.id, filter).map(Some),
            None => Ok(None),
        }
    }
}
