use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Numeric student identifier, unique within a course.
pub type StudentId = u32;

/// A student enrolled in one course, with their face embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "id")]
    pub student_id: StudentId,

    #[serde(rename = "name")]
    pub name: String,

    #[serde(rename = "course_id")]
    pub course_id: String,

    #[serde(rename = "course_name")]
    pub course_name: String,

    /// Dense float32 embedding produced by the face extractor.
    #[serde(rename = "embedding")]
    pub embedding: Vec<f32>,
}

/// One recorded attendance. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    /// Sequential identifier assigned by the log, starting at 1.
    #[serde(rename = "id")]
    pub id: u64,

    #[serde(rename = "student_id")]
    pub student_id: StudentId,

    #[serde(rename = "course_id")]
    pub course_id: String,

    /// Process-local wall-clock time, whole seconds.
    #[serde(rename = "ts")]
    pub timestamp: NaiveDateTime,
}
