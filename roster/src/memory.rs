//! In-memory roster for testing.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::error::RosterError;
use crate::keys::{course_prefix, student_key};
use crate::store::{AttendanceLog, StudentStore};
use crate::types::{AttendanceEvent, StudentId, StudentRecord};

/// An in-memory student store and attendance log.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryRoster {
    students: Arc<Mutex<BTreeMap<String, StudentRecord>>>,
    attendance: Arc<Mutex<Vec<AttendanceEvent>>>,
}

impl MemoryRoster {
    /// Create a new empty roster.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StudentStore for MemoryRoster {
    fn exists(&self, student_id: StudentId, course_id: &str) -> Result<bool, RosterError> {
        let students = self.students.lock();
        Ok(students.contains_key(&student_key(course_id, student_id)))
    }

    fn upsert(&self, record: &StudentRecord) -> Result<(), RosterError> {
        let mut students = self.students.lock();
        students.insert(
            student_key(&record.course_id, record.student_id),
            record.clone(),
        );
        Ok(())
    }

    fn get(&self, student_id: StudentId, course_id: &str) -> Result<Option<StudentRecord>, RosterError> {
        let students = self.students.lock();
        Ok(students.get(&student_key(course_id, student_id)).cloned())
    }

    fn fetch_by_course(&self, course_id: &str) -> Result<Vec<StudentRecord>, RosterError> {
        let prefix = course_prefix(course_id);
        let students = self.students.lock();
        Ok(students
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn fetch_all(&self) -> Result<Vec<StudentRecord>, RosterError> {
        let students = self.students.lock();
        Ok(students.values().cloned().collect())
    }
}

impl AttendanceLog for MemoryRoster {
    fn append(
        &self,
        student_id: StudentId,
        course_id: &str,
        timestamp: NaiveDateTime,
    ) -> Result<AttendanceEvent, RosterError> {
        let mut attendance = self.attendance.lock();
        let event = AttendanceEvent {
            id: attendance.len() as u64 + 1,
            student_id,
            course_id: course_id.to_string(),
            timestamp,
        };
        attendance.push(event.clone());
        Ok(event)
    }

    fn list_by_course(&self, course_id: &str) -> Result<Vec<AttendanceEvent>, RosterError> {
        let attendance = self.attendance.lock();
        Ok(attendance
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    fn last_for(
        &self,
        student_id: StudentId,
        course_id: &str,
    ) -> Result<Option<AttendanceEvent>, RosterError> {
        let attendance = self.attendance.lock();
        Ok(attendance
            .iter()
            .rev()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }
}
