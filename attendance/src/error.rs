use std::fmt;

use serde::Serialize;
use thiserror::Error;

use rollcall_faceindex::IndexError;
use rollcall_roster::{RosterError, StudentId};

use crate::extractor::ExtractError;

/// Failure classes reported by enrollment and recognition outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    DuplicateEnrollment,
    ExtractionFailed,
    StoreWriteFailed,
    AttendanceWriteFailed,
    IndexSyncFailed,
    IndexCorruption,
    Unexpected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::DuplicateEnrollment => "duplicate_enrollment",
            FailureKind::ExtractionFailed => "extraction_failed",
            FailureKind::StoreWriteFailed => "store_write_failed",
            FailureKind::AttendanceWriteFailed => "attendance_write_failed",
            FailureKind::IndexSyncFailed => "index_sync_failed",
            FailureKind::IndexCorruption => "index_corruption",
            FailureKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised inside the attendance services.
///
/// The `Display` text of each variant is the message handed back to callers
/// in an outcome, so extractor and storage errors are shown verbatim.
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),

    #[error("attendance: config error: {0}")]
    Config(String),

    #[error("Student {student_id} is already registered in course {course_name}")]
    DuplicateEnrollment {
        student_id: StudentId,
        course_name: String,
    },

    #[error("{0}")]
    Extraction(#[from] ExtractError),

    #[error("Embedding dimension mismatch: got {got}, want {want}")]
    EmbeddingDimension { got: usize, want: usize },

    #[error("{0}")]
    StoreRead(RosterError),

    #[error("{0}")]
    StoreWrite(RosterError),

    #[error("{0}")]
    AttendanceWrite(RosterError),

    #[error("{0}")]
    IndexSync(IndexError),

    #[error("Similarity search returned an invalid match")]
    IndexCorruption { course_id: String, position: usize },

    #[error("{0}")]
    Index(#[from] IndexError),

    #[error("attendance: io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttendanceError {
    /// Classify the error for an outcome.
    pub fn kind(&self) -> FailureKind {
        match self {
            AttendanceError::Validation(_)
            | AttendanceError::Config(_)
            | AttendanceError::EmbeddingDimension { .. } => FailureKind::Validation,
            AttendanceError::DuplicateEnrollment { .. } => FailureKind::DuplicateEnrollment,
            AttendanceError::Extraction(_) => FailureKind::ExtractionFailed,
            AttendanceError::StoreWrite(_) => FailureKind::StoreWriteFailed,
            AttendanceError::AttendanceWrite(_) => FailureKind::AttendanceWriteFailed,
            AttendanceError::IndexSync(_) => FailureKind::IndexSyncFailed,
            AttendanceError::IndexCorruption { .. } => FailureKind::IndexCorruption,
            AttendanceError::StoreRead(_) | AttendanceError::Index(_) | AttendanceError::Io(_) => {
                FailureKind::Unexpected
            }
        }
    }
}
