//! Recording attendance: the per-date marking sheet for a cohort and the upserts behind it.

use crate::access::Caller;
use crate::error::{TrackerError, TrackerResult};
use crate::manager::AttendanceManager;
use crate::models::{self, AttendanceRecord, NewAttendanceRecord, Student};
use crate::schema::{attendance, students};
use chrono::NaiveDate;
use diesel::prelude::*;
use std::collections::{HashMap, HashSet};

/// One line of the marking sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub student: Student,
    /// The recorded status, or `true` when nothing has been recorded yet.
    pub is_present: bool,
    pub record_id: Option<i32>,
}

impl SheetRow {
    pub fn is_marked(&self) -> bool {
        self.record_id.is_some()
    }
}

/// A cohort on a given date, annotated with each student's current (or default) status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkingSheet {
    pub program: String,
    pub batch: String,
    pub date: NaiveDate,
    pub rows: Vec<SheetRow>,
}

impl MarkingSheet {
    /// Whether every student in the cohort already has a record for the date.
    pub fn is_fully_marked(&self) -> bool {
        self.rows.iter().all(SheetRow::is_marked)
    }
}

/// What a cohort submission wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub present: usize,
    pub absent: usize,
    /// Ids passed as present that do not belong to the cohort.
    pub ignored: Vec<i32>,
}

/// Narrows [`AttendanceManager::list_records`]. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub date: Option<NaiveDate>,
    pub program: Option<String>,
    pub batch: Option<String>,
}

/// Loads the records on `on` for the given students, keyed by student.
pub(crate) fn records_on(
    conn: &mut SqliteConnection,
    on: NaiveDate,
    student_ids: &[i32],
) -> QueryResult<HashMap<i32, AttendanceRecord>> {
    let records = attendance::table
        .filter(attendance::date.eq(on))
        .filter(attendance::student.eq_any(student_ids))
        .select(AttendanceRecord::as_select())
        .load(conn)?;

    Ok(records.into_iter().map(|r| (r.student, r)).collect())
}

/// Writes the status of one student on one date. If that record already exists, this updates it
/// in place; the `(student, date)` unique constraint guarantees a single row.
fn upsert_record(
    conn: &mut SqliteConnection,
    student_id: i32,
    on: NaiveDate,
    present: bool,
    marker: Option<i32>,
) -> QueryResult<usize> {
    let stamp = models::now();

    diesel::insert_into(attendance::table)
        .values(NewAttendanceRecord {
            student: student_id,
            date: on,
            is_present: present,
            marked_by: marker,
            updated_at: stamp,
        })
        .on_conflict((attendance::student, attendance::date))
        .do_update()
        .set((
            attendance::is_present.eq(present),
            attendance::marked_by.eq(marker),
            attendance::updated_at.eq(stamp),
        ))
        .execute(conn)
}

impl AttendanceManager {
    /// Builds the marking sheet for a cohort on `on`. Students without a record default to
    /// present. Nothing is written.
    pub fn get_marking_sheet(
        &mut self,
        caller: &Caller,
        program: &str,
        batch: &str,
        on: NaiveDate,
    ) -> TrackerResult<MarkingSheet> {
        caller.require_admin()?;

        let cohort = self.cohort(program, batch)?;
        let ids: Vec<i32> = cohort.iter().map(|s| s.id).collect();
        let mut existing = records_on(&mut self.db, on, &ids)?;

        let rows = cohort
            .into_iter()
            .map(|student| {
                let record = existing.remove(&student.id);
                SheetRow {
                    is_present: record.as_ref().is_none_or(|r| r.is_present),
                    record_id: record.map(|r| r.id),
                    student,
                }
            })
            .collect();

        Ok(MarkingSheet {
            program: program.to_string(),
            batch: batch.to_string(),
            date: on,
            rows,
        })
    }

    /// Records the whole cohort for `on`: students in `present_ids` are marked present, every
    /// other student in the cohort is marked absent, and all records are stamped with the caller.
    ///
    /// Students are written one at a time. If this fails partway, the students already processed
    /// keep their new status.
    pub fn submit_attendance(
        &mut self,
        caller: &Caller,
        program: &str,
        batch: &str,
        on: NaiveDate,
        present_ids: &[i32],
    ) -> TrackerResult<Submission> {
        caller.require_admin()?;

        let cohort = self.cohort(program, batch)?;
        let present: HashSet<i32> = present_ids.iter().copied().collect();
        let members: HashSet<i32> = cohort.iter().map(|s| s.id).collect();

        let mut submission = Submission::default();
        for id in present_ids {
            if !members.contains(id) && !submission.ignored.contains(id) {
                log::warn!("Tried to mark student {id} present, but they are not in {program}/{batch}");
                submission.ignored.push(*id);
            }
        }

        for student in &cohort {
            let is_present = present.contains(&student.id);
            upsert_record(&mut self.db, student.id, on, is_present, Some(caller.account_id))?;

            if is_present {
                submission.present += 1;
            } else {
                submission.absent += 1;
            }
        }

        log::info!(
            "{} marked {program}/{batch} on {on}: {} present, {} absent",
            caller.username,
            submission.present,
            submission.absent
        );
        Ok(submission)
    }

    /// Retrieves a single attendance record.
    pub fn get_record(&mut self, id: i32) -> TrackerResult<AttendanceRecord> {
        attendance::table
            .find(id)
            .select(AttendanceRecord::as_select())
            .first(&mut self.db)
            .optional()?
            .ok_or_else(|| TrackerError::not_found("attendance record", id))
    }

    /// Overwrites the status of one existing record and stamps it with the caller.
    pub fn edit_single_record(
        &mut self,
        caller: &Caller,
        id: i32,
        is_present: bool,
    ) -> TrackerResult<AttendanceRecord> {
        caller.require_admin()?;

        let record = diesel::update(attendance::table.find(id))
            .set((
                attendance::is_present.eq(is_present),
                attendance::marked_by.eq(Some(caller.account_id)),
                attendance::updated_at.eq(models::now()),
            ))
            .returning(AttendanceRecord::as_returning())
            .get_result(&mut self.db)
            .optional()?
            .ok_or_else(|| TrackerError::not_found("attendance record", id))?;

        log::info!(
            "{} set record {id} ({}) to {}",
            caller.username,
            record.date,
            if is_present { "present" } else { "absent" }
        );
        Ok(record)
    }

    /// Lists records with their students, most recent date first and then by student name.
    pub fn list_records(
        &mut self,
        caller: &Caller,
        filter: &RecordFilter,
    ) -> TrackerResult<Vec<(AttendanceRecord, Student)>> {
        caller.require_admin()?;

        let mut query = attendance::table
            .inner_join(students::table)
            .order((attendance::date.desc(), students::full_name.asc()))
            .select((AttendanceRecord::as_select(), Student::as_select()))
            .into_boxed();

        if let Some(on) = filter.date {
            query = query.filter(attendance::date.eq(on));
        }
        if let Some(program) = &filter.program {
            query = query.filter(students::program.eq(program.clone()));
        }
        if let Some(batch) = &filter.batch {
            query = query.filter(students::batch.eq(batch.clone()));
        }

        Ok(query.load(&mut self.db)?)
    }
}
