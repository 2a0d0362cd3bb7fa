use serde::Serialize;
use tracing::{debug, error, info, warn};

use rollcall_roster::{StudentId, StudentRecord};

use crate::error::{AttendanceError, FailureKind};
use crate::service::AttendanceService;

/// Result of an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollOutcome {
    pub success: bool,
    pub message: String,

    /// Set when `success` is false, or to `IndexSyncFailed` when the student
    /// was stored but the index append failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,

    /// False if the student is stored but not yet searchable.
    pub index_synced: bool,
}

impl EnrollOutcome {
    fn failed(err: AttendanceError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            kind: Some(err.kind()),
            index_synced: false,
        }
    }
}

impl AttendanceService {
    /// Enroll a student in a course from a face image.
    ///
    /// Each step gates the next: duplicate check, extraction, width check,
    /// store upsert, index append. A failure before the upsert leaves no
    /// state behind. A failed index append after a committed upsert still
    /// reports success, with `index_synced == false`, and the course index
    /// is rebuilt before its next recognition.
    ///
    /// An empty `course_name` stores the configured display name.
    pub fn enroll(
        &self,
        student_id: StudentId,
        name: &str,
        course_id: &str,
        course_name: &str,
        image: &[u8],
    ) -> EnrollOutcome {
        match self.try_enroll(student_id, name, course_id, course_name, image) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(student_id, course_id, kind = %e.kind(), error = %e, "enrollment rejected");
                EnrollOutcome::failed(e)
            }
        }
    }

    fn try_enroll(
        &self,
        student_id: StudentId,
        name: &str,
        course_id: &str,
        course_name: &str,
        image: &[u8],
    ) -> Result<EnrollOutcome, AttendanceError> {
        let configured_name = self.require_course(course_id)?;
        let course_name = if course_name.trim().is_empty() {
            configured_name.to_string()
        } else {
            course_name.trim().to_string()
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::Validation("Student name must not be empty".into()));
        }
        let (min, max) = (self.config.student_id_min, self.config.student_id_max);
        if !(min..=max).contains(&student_id) {
            return Err(AttendanceError::Validation(format!(
                "Student ID must be between {min} and {max}"
            )));
        }

        // Rejected before the extractor runs.
        self.check_not_enrolled(student_id, course_id, &course_name)?;

        let extraction = self.extractor.extract(image)?;
        let embedding = extraction.embedding;
        if embedding.len() != self.config.embedding_dim {
            return Err(AttendanceError::EmbeddingDimension {
                got: embedding.len(),
                want: self.config.embedding_dim,
            });
        }
        debug!(student_id, course_id, "embedding extracted");

        let lock = self.course_lock(course_id);
        let _guard = lock.lock();

        // A concurrent enrollment of the same pair may have committed while
        // this one was extracting.
        self.check_not_enrolled(student_id, course_id, &course_name)?;

        let record = StudentRecord {
            student_id,
            name: name.to_string(),
            course_id: course_id.to_string(),
            course_name: course_name.clone(),
            embedding,
        };
        self.students
            .upsert(&record)
            .map_err(AttendanceError::StoreWrite)?;

        let registered = format!(
            "Student {name} (ID: {student_id}) registered successfully for {course_name}"
        );

        if let Err(e) = self
            .registry
            .append_vector(&record.embedding, student_id, name, course_id)
        {
            let e = AttendanceError::IndexSync(e);
            error!(
                kind = %e.kind(),
                student_id,
                course_id,
                error = %e,
                "student stored but index append failed"
            );
            self.mark_stale(course_id);
            return Ok(EnrollOutcome {
                success: true,
                message: format!("{registered}; face index update pending rebuild"),
                kind: Some(e.kind()),
                index_synced: false,
            });
        }

        info!(student_id, course_id, "student enrolled");
        Ok(EnrollOutcome {
            success: true,
            message: format!("{registered} and face index updated"),
            kind: None,
            index_synced: true,
        })
    }

    fn check_not_enrolled(
        &self,
        student_id: StudentId,
        course_id: &str,
        course_name: &str,
    ) -> Result<(), AttendanceError> {
        let exists = self
            .students
            .exists(student_id, course_id)
            .map_err(AttendanceError::StoreRead)?;
        if exists {
            return Err(AttendanceError::DuplicateEnrollment {
                student_id,
                course_name: course_name.to_string(),
            });
        }
        Ok(())
    }
}
