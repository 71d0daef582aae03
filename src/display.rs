//! Renders roster, marking sheet, and report data as terminal tables.

use crate::models::{AttendanceRecord, Student};
use crate::recorder::MarkingSheet;
use crate::report::{DailyReport, MonthlyReport, StudentDashboard, StudentMonthSummary, Tally};
use crate::roster::AdminOverview;
use tabled::{Table, Tabled, settings::Style};

fn status(is_present: bool) -> String {
    let label = if is_present { "Present" } else { "Absent" };
    label.to_string()
}

fn table<T: Tabled>(rows: impl IntoIterator<Item = T>) -> Table {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table
}

#[derive(Tabled)]
struct TallyRow {
    period: String,
    total: i64,
    present: i64,
    absent: i64,
    percent: String,
}

impl TallyRow {
    fn new(period: &str, tally: &Tally) -> Self {
        Self {
            period: period.to_string(),
            total: tally.total,
            present: tally.present,
            absent: tally.absent,
            percent: format!("{:.2}%", tally.percent),
        }
    }
}

/// Renders the roster. The non-verbose form only shows who is on it.
pub fn render_roster(roster: &[Student], verbose: bool) -> String {
    #[derive(Tabled)]
    struct FullStudent {
        id: i32,
        student_id: String,
        full_name: String,
        email: String,
        program: String,
        batch: String,
        year: String,
        account: String,
    }

    #[derive(Tabled)]
    struct SimpleStudent {
        id: i32,
        student_id: String,
        full_name: String,
    }

    let table = if verbose {
        table(roster.iter().map(|student| FullStudent {
            id: student.id,
            student_id: student.student_id.clone(),
            full_name: student.full_name.clone(),
            email: student.email.clone(),
            program: student.program.clone(),
            batch: student.batch.clone(),
            year: student.year.map(|y| y.to_string()).unwrap_or_default(),
            account: if student.account_id.is_some() { "linked" } else { "none" }.to_string(),
        }))
    } else {
        table(roster.iter().map(|student| SimpleStudent {
            id: student.id,
            student_id: student.student_id.clone(),
            full_name: student.full_name.clone(),
        }))
    };

    format!("Roster ({} students):\n{table}", roster.len())
}

pub fn render_marking_sheet(sheet: &MarkingSheet) -> String {
    #[derive(Tabled)]
    struct Line {
        id: i32,
        student_id: String,
        full_name: String,
        status: String,
        marked: String,
    }

    let table = table(sheet.rows.iter().map(|row| Line {
        id: row.student.id,
        student_id: row.student.student_id.clone(),
        full_name: row.student.full_name.clone(),
        status: status(row.is_present),
        marked: if row.is_marked() { "yes" } else { "default" }.to_string(),
    }));

    format!(
        "{} / {} on {}:\n{table}",
        sheet.program, sheet.batch, sheet.date
    )
}

pub fn render_daily_report(report: &DailyReport) -> String {
    #[derive(Tabled)]
    struct Line {
        student_id: String,
        full_name: String,
        status: String,
    }

    let rows = table(report.rows.iter().map(|row| Line {
        student_id: row.student.student_id.clone(),
        full_name: row.student.full_name.clone(),
        status: status(row.present),
    }));
    let summary = table([TallyRow::new(&report.date.to_string(), &report.summary)]);

    format!(
        "{} / {} on {}:\n{rows}\nSummary:\n{summary}",
        report.program, report.batch, report.date
    )
}

pub fn render_monthly_report(report: &MonthlyReport) -> String {
    #[derive(Tabled)]
    struct Line {
        student_id: String,
        full_name: String,
        total: i64,
        present: i64,
        absent: i64,
        percent: String,
    }

    let rows = table(report.rows.iter().map(|row| Line {
        student_id: row.student.student_id.clone(),
        full_name: row.student.full_name.clone(),
        total: row.tally.total,
        present: row.tally.present,
        absent: row.tally.absent,
        percent: format!("{:.2}%", row.tally.percent),
    }));

    format!(
        "{} / {} for {:02}/{} ({} to {}):\n{rows}",
        report.program, report.batch, report.month, report.year, report.start, report.end
    )
}

pub fn render_dashboard(dashboard: &StudentDashboard) -> String {
    #[derive(Tabled)]
    struct Point {
        date: String,
        status: String,
    }

    let student = &dashboard.student;
    let totals = table([
        TallyRow::new("overall", &dashboard.overall),
        TallyRow::new("this month", &dashboard.this_month),
        TallyRow::new("last 7 days", &dashboard.last_7_days),
    ]);
    let trend = table(dashboard.trend.iter().map(|p| Point {
        date: p.date.to_string(),
        status: status(p.is_present),
    }));
    let last = match &dashboard.last_attendance {
        Some(point) => format!("{} ({})", point.date, status(point.is_present)),
        None => "never".to_string(),
    };

    format!(
        "{} ({}), {} / {}\nStatus: {}\nLast attendance: {last}\n{totals}\nTrend:\n{trend}",
        student.full_name, student.student_id, student.program, student.batch, dashboard.tier
    )
}

/// Renders attendance records, optionally alongside the student each belongs to.
pub fn render_records<'a>(
    records: impl IntoIterator<Item = (&'a AttendanceRecord, Option<&'a Student>)>,
) -> String {
    #[derive(Tabled)]
    struct Line {
        id: i32,
        date: String,
        student: String,
        status: String,
        updated_at: String,
    }

    let lines: Vec<Line> = records
        .into_iter()
        .map(|(record, student)| Line {
            id: record.id,
            date: record.date.to_string(),
            student: student
                .map(|s| format!("{} ({})", s.full_name, s.student_id))
                .unwrap_or_default(),
            status: status(record.is_present),
            updated_at: record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    if lines.is_empty() {
        return "No attendance records found.".to_string();
    }
    table(lines).to_string()
}

pub fn render_month_summary(summary: &StudentMonthSummary) -> String {
    let totals = table([TallyRow::new(
        &format!("{:02}/{}", summary.month, summary.year),
        &summary.tally,
    )]);
    let records = render_records(summary.records.iter().map(|r| (r, None)));

    format!(
        "{} ({}):\n{totals}\n{records}",
        summary.student.full_name, summary.student.student_id
    )
}

pub fn render_overview(overview: &AdminOverview) -> String {
    format!(
        "Students: {}\nAttendance records: {}\nPrograms: {}\nBatches: {}",
        overview.total_students,
        overview.total_records,
        overview.choices.programs.join(", "),
        overview.choices.batches.join(", ")
    )
}
