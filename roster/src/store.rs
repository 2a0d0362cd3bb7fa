use chrono::NaiveDateTime;

use crate::error::RosterError;
use crate::types::{AttendanceEvent, StudentId, StudentRecord};

/// Durable mapping of `(student_id, course_id)` to a student record.
///
/// Implementations must give per-row atomicity and be safe for concurrent
/// use. An `Err` is a store-level failure, distinct from an empty course.
pub trait StudentStore: Send + Sync {
    /// Return true if the student is enrolled in the course.
    fn exists(&self, student_id: StudentId, course_id: &str) -> Result<bool, RosterError>;

    /// Insert or fully replace the record for `(student_id, course_id)`.
    fn upsert(&self, record: &StudentRecord) -> Result<(), RosterError>;

    /// Return one record, or None if not enrolled.
    fn get(&self, student_id: StudentId, course_id: &str) -> Result<Option<StudentRecord>, RosterError>;

    /// Return every record of a course, ordered by student id.
    fn fetch_by_course(&self, course_id: &str) -> Result<Vec<StudentRecord>, RosterError>;

    /// Return every record of every course.
    fn fetch_all(&self) -> Result<Vec<StudentRecord>, RosterError>;
}

/// Durable append-only log of attendance events.
pub trait AttendanceLog: Send + Sync {
    /// Append an event and return it with its assigned sequential id.
    fn append(
        &self,
        student_id: StudentId,
        course_id: &str,
        timestamp: NaiveDateTime,
    ) -> Result<AttendanceEvent, RosterError>;

    /// Return every event of a course in append order.
    fn list_by_course(&self, course_id: &str) -> Result<Vec<AttendanceEvent>, RosterError>;

    /// Return the most recent event for a student in a course.
    fn last_for(
        &self,
        student_id: StudentId,
        course_id: &str,
    ) -> Result<Option<AttendanceEvent>, RosterError>;
}
