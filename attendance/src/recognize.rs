use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{debug, info, warn};

use rollcall_roster::StudentId;

use crate::error::{AttendanceError, FailureKind};
use crate::service::AttendanceService;

/// Message for every negative recognition: no gallery, no match, or a match
/// above the threshold.
pub const NOT_REGISTERED: &str = "Sorry, you are not registered in this course";

/// Result of a recognition attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizeOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub message: String,

    /// Set on failures other than a plain rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,

    /// Attendance event covering this recognition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,

    /// True if the event is an earlier one inside the debounce window and
    /// nothing was written by this call.
    pub already_marked: bool,
}

impl RecognizeOutcome {
    /// Return true if the student was identified.
    pub fn is_recognized(&self) -> bool {
        self.student_id.is_some()
    }

    fn rejected() -> Self {
        Self {
            student_id: None,
            name: None,
            message: NOT_REGISTERED.to_string(),
            kind: None,
            event_id: None,
            timestamp: None,
            already_marked: false,
        }
    }

    fn failed(err: AttendanceError) -> Self {
        Self {
            kind: Some(err.kind()),
            message: err.to_string(),
            ..Self::rejected()
        }
    }
}

impl AttendanceService {
    /// Identify the face in `image` among the students of a course and
    /// record attendance at the current local time.
    pub fn recognize(&self, image: &[u8], course_id: &str) -> RecognizeOutcome {
        self.recognize_at(image, course_id, Local::now().naive_local())
    }

    /// Like [`recognize`](Self::recognize) with an explicit clock.
    /// `now` is truncated to whole seconds.
    pub fn recognize_at(&self, image: &[u8], course_id: &str, now: NaiveDateTime) -> RecognizeOutcome {
        match self.try_recognize(image, course_id, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(course_id, kind = %e.kind(), error = %e, "recognition failed");
                if let AttendanceError::IndexCorruption { position, .. } = &e {
                    warn!(course_id, position, "rebuilding course index after invalid match");
                    self.rebuild_quietly(course_id);
                }
                RecognizeOutcome::failed(e)
            }
        }
    }

    fn try_recognize(
        &self,
        image: &[u8],
        course_id: &str,
        now: NaiveDateTime,
    ) -> Result<RecognizeOutcome, AttendanceError> {
        self.require_course(course_id)?;
        let now = now.with_nanosecond(0).unwrap_or(now);

        let embedding = self.extractor.extract(image)?.embedding;

        let roster = self
            .students
            .fetch_by_course(course_id)
            .map_err(AttendanceError::StoreRead)?;
        if roster.is_empty() {
            debug!(course_id, "course has no enrolled students");
            return Ok(RecognizeOutcome::rejected());
        }

        if self.is_stale(course_id) {
            self.rebuild_quietly(course_id);
        }

        let Some(best) = self.registry.query(&embedding, course_id, 1).into_iter().next() else {
            return Ok(RecognizeOutcome::rejected());
        };
        if best.distance.is_nan() || best.distance >= self.config.threshold {
            debug!(course_id, distance = best.distance, "best match above threshold");
            return Ok(RecognizeOutcome::rejected());
        }
        let Some(student) = best.student else {
            return Err(AttendanceError::IndexCorruption {
                course_id: course_id.to_string(),
                position: best.position,
            });
        };

        let (student_id, name) = (student.student_id, student.name);

        let window = self.config.attendance_debounce_secs;
        if window > 0 {
            let last = self
                .attendance
                .last_for(student_id, course_id)
                .map_err(AttendanceError::StoreRead)?;
            let recent = last.filter(|e| (now - e.timestamp).num_seconds() < window as i64);
            if let Some(last) = recent {
                debug!(student_id, course_id, last_id = last.id, "attendance already marked");
                return Ok(RecognizeOutcome {
                    student_id: Some(student_id),
                    message: format!(
                        "Attendance already marked for {name} (ID: {student_id}) in course {course_id}"
                    ),
                    name: Some(name),
                    kind: None,
                    event_id: Some(last.id),
                    timestamp: Some(last.timestamp),
                    already_marked: true,
                });
            }
        }

        let event = self
            .attendance
            .append(student_id, course_id, now)
            .map_err(AttendanceError::AttendanceWrite)?;

        info!(student_id, course_id, distance = best.distance, event_id = event.id, "attendance marked");
        Ok(RecognizeOutcome {
            student_id: Some(student_id),
            message: format!("Attendance marked for {name} (ID: {student_id}) in course {course_id}"),
            name: Some(name),
            kind: None,
            event_id: Some(event.id),
            timestamp: Some(event.timestamp),
            already_marked: false,
        })
    }
}
