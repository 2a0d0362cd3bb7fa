//! Redb-based persistent roster.

use std::path::Path;

use chrono::NaiveDateTime;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{storage, RosterError};
use crate::keys::{course_prefix, student_key, STUDENT_PREFIX};
use crate::store::{AttendanceLog, StudentStore};
use crate::types::{AttendanceEvent, StudentId, StudentRecord};

const STUDENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("students");
const ATTENDANCE: TableDefinition<u64, &[u8]> = TableDefinition::new("attendance");

/// A persistent student store and attendance log backed by one redb file.
///
/// Every upsert and append is its own write transaction; redb serializes
/// concurrent writers.
pub struct RedbRoster {
    db: Database,
}

impl RedbRoster {
    /// Open or create a roster database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(storage)?;
        }
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Create the tables so read transactions can always open them.
        let tx = db.begin_write().map_err(storage)?;
        {
            tx.open_table(STUDENTS).map_err(storage)?;
            tx.open_table(ATTENDANCE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        debug!(path = %path.as_ref().display(), "roster database opened");
        Ok(Self { db })
    }

    fn scan_students(&self, prefix: &str) -> Result<Vec<StudentRecord>, RosterError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(STUDENTS).map_err(storage)?;

        let mut records = Vec::new();
        for item in table.range(prefix..).map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            if !key.value().starts_with(prefix) {
                break;
            }
            records.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(records)
    }

    fn scan_attendance(&self) -> Result<Vec<AttendanceEvent>, RosterError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(ATTENDANCE).map_err(storage)?;

        let mut events = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            events.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(events)
    }
}

impl StudentStore for RedbRoster {
    fn exists(&self, student_id: StudentId, course_id: &str) -> Result<bool, RosterError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(STUDENTS).map_err(storage)?;
        let key = student_key(course_id, student_id);
        Ok(table.get(key.as_str()).map_err(storage)?.is_some())
    }

    fn upsert(&self, record: &StudentRecord) -> Result<(), RosterError> {
        let key = student_key(&record.course_id, record.student_id);
        let data = rmp_serde::to_vec_named(record)?;

        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(STUDENTS).map_err(storage)?;
            table.insert(key.as_str(), data.as_slice()).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        debug!(student_id = record.student_id, course_id = %record.course_id, "student upserted");
        Ok(())
    }

    fn get(&self, student_id: StudentId, course_id: &str) -> Result<Option<StudentRecord>, RosterError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(STUDENTS).map_err(storage)?;
        let key = student_key(course_id, student_id);
        match table.get(key.as_str()).map_err(storage)? {
            Some(value) => Ok(Some(rmp_serde::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn fetch_by_course(&self, course_id: &str) -> Result<Vec<StudentRecord>, RosterError> {
        self.scan_students(&course_prefix(course_id))
    }

    fn fetch_all(&self) -> Result<Vec<StudentRecord>, RosterError> {
        self.scan_students(STUDENT_PREFIX)
    }
}

impl AttendanceLog for RedbRoster {
    fn append(
        &self,
        student_id: StudentId,
        course_id: &str,
        timestamp: NaiveDateTime,
    ) -> Result<AttendanceEvent, RosterError> {
        let tx = self.db.begin_write().map_err(storage)?;
        let event = {
            let mut table = tx.open_table(ATTENDANCE).map_err(storage)?;
            let next = match table.last().map_err(storage)? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };
            let event = AttendanceEvent {
                id: next,
                student_id,
                course_id: course_id.to_string(),
                timestamp,
            };
            let data = rmp_serde::to_vec_named(&event)?;
            table.insert(next, data.as_slice()).map_err(storage)?;
            event
        };
        tx.commit().map_err(storage)?;

        debug!(id = event.id, student_id, course_id, "attendance appended");
        Ok(event)
    }

    fn list_by_course(&self, course_id: &str) -> Result<Vec<AttendanceEvent>, RosterError> {
        Ok(self
            .scan_attendance()?
            .into_iter()
            .filter(|e| e.course_id == course_id)
            .collect())
    }

    fn last_for(
        &self,
        student_id: StudentId,
        course_id: &str,
    ) -> Result<Option<AttendanceEvent>, RosterError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(ATTENDANCE).map_err(storage)?;

        for item in table.iter().map_err(storage)?.rev() {
            let (_, value) = item.map_err(storage)?;
            let event: AttendanceEvent = rmp_serde::from_slice(value.value())?;
            if event.student_id == student_id && event.course_id == course_id {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}
