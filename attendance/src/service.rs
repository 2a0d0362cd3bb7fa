use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use rollcall_faceindex::{IndexError, IndexRegistry};
use rollcall_roster::{AttendanceEvent, AttendanceLog, StudentId, StudentRecord, StudentStore};

use crate::config::Config;
use crate::error::AttendanceError;
use crate::extractor::FaceExtractor;

/// How a course index was prepared at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WarmupState {
    /// Rebuilt from the student store.
    Built { count: usize },
    /// Loaded from a persisted blob with no identities. 0 for a fresh course.
    Loaded { count: usize },
    /// The course could not be prepared and serves no matches.
    Disabled { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmupReport {
    pub course_id: String,
    #[serde(flatten)]
    pub state: WarmupState,
}

/// Process-level entry point for enrollment and recognition.
///
/// Owns the course index registry and shares the stores and extractor
/// through `Arc`s. Safe for concurrent use: enrollments and rebuilds of one
/// course are serialized, different courses proceed independently.
pub struct AttendanceService {
    pub(crate) config: Config,
    pub(crate) students: Arc<dyn StudentStore>,
    pub(crate) attendance: Arc<dyn AttendanceLog>,
    pub(crate) registry: Arc<IndexRegistry>,
    pub(crate) extractor: Arc<dyn FaceExtractor>,

    course_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    stale: Mutex<HashSet<String>>,
}

impl AttendanceService {
    pub fn new(
        config: Config,
        students: Arc<dyn StudentStore>,
        attendance: Arc<dyn AttendanceLog>,
        registry: Arc<IndexRegistry>,
        extractor: Arc<dyn FaceExtractor>,
    ) -> Self {
        if extractor.dimension() != config.embedding_dim {
            warn!(
                extractor = extractor.dimension(),
                configured = config.embedding_dim,
                "extractor dimension differs from configured embedding_dim"
            );
        }
        Self {
            config,
            students,
            attendance,
            registry,
            extractor,
            course_locks: Mutex::new(HashMap::new()),
            stale: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Prepare every configured course index. Run once before serving.
    ///
    /// A course with enrolled students is rebuilt from the store; an empty
    /// course loads its persisted blob, if any. A failing course is reported
    /// as disabled and does not stop the others.
    pub fn init(&self) -> Vec<WarmupReport> {
        let mut reports = Vec::with_capacity(self.config.courses.len());
        for course_id in self.config.courses.keys() {
            let state = match self.warm_course(course_id) {
                Ok(state) => state,
                Err(e) => {
                    error!(course_id = %course_id, error = %e, "course index disabled");
                    WarmupState::Disabled {
                        reason: e.to_string(),
                    }
                }
            };
            reports.push(WarmupReport {
                course_id: course_id.clone(),
                state,
            });
        }
        info!(courses = reports.len(), "course indexes ready");
        reports
    }

    fn warm_course(&self, course_id: &str) -> Result<WarmupState, AttendanceError> {
        let roster = self
            .students
            .fetch_by_course(course_id)
            .map_err(AttendanceError::StoreRead)?;
        if roster.is_empty() {
            let count = self.registry.load_persisted(course_id)?;
            return Ok(WarmupState::Loaded { count });
        }

        let lock = self.course_lock(course_id);
        let _guard = lock.lock();
        let count = self.build_from(course_id, &roster)?;
        Ok(WarmupState::Built { count })
    }

    /// Rebuild a course index from the student store, discarding the current
    /// index. An empty roster clears the index. Returns the vector count.
    pub fn rebuild(&self, course_id: &str) -> Result<usize, AttendanceError> {
        self.require_course(course_id)?;
        let lock = self.course_lock(course_id);
        let _guard = lock.lock();
        let roster = self
            .students
            .fetch_by_course(course_id)
            .map_err(AttendanceError::StoreRead)?;
        if roster.is_empty() {
            self.registry.clear(course_id)?;
            self.stale.lock().remove(course_id);
            return Ok(0);
        }
        self.build_from(course_id, &roster)
    }

    /// Caller must hold the course lock.
    fn build_from(&self, course_id: &str, roster: &[StudentRecord]) -> Result<usize, AttendanceError> {
        let embeddings: Vec<Vec<f32>> = roster.iter().map(|r| r.embedding.clone()).collect();
        let ids: Vec<StudentId> = roster.iter().map(|r| r.student_id).collect();
        let names: Vec<String> = roster.iter().map(|r| r.name.clone()).collect();

        self.registry.build(&embeddings, &ids, &names, course_id)?;
        self.stale.lock().remove(course_id);
        debug!(course_id, count = roster.len(), "course rebuilt from store");
        Ok(roster.len())
    }

    /// Rebuild a course, logging instead of returning a failure.
    pub(crate) fn rebuild_quietly(&self, course_id: &str) {
        match self.rebuild(course_id) {
            Ok(count) => info!(course_id, count, "course index rebuilt"),
            Err(e) => error!(course_id, error = %e, "course index rebuild failed"),
        }
    }

    /// Enrolled students of a course, ordered by id.
    pub fn students(&self, course_id: &str) -> Result<Vec<StudentRecord>, AttendanceError> {
        self.require_course(course_id)?;
        self.students
            .fetch_by_course(course_id)
            .map_err(AttendanceError::StoreRead)
    }

    /// Every enrolled student of every course.
    pub fn all_students(&self) -> Result<Vec<StudentRecord>, AttendanceError> {
        self.students.fetch_all().map_err(AttendanceError::StoreRead)
    }

    /// Attendance events of a course in the order they were recorded.
    pub fn attendance(&self, course_id: &str) -> Result<Vec<AttendanceEvent>, AttendanceError> {
        self.require_course(course_id)?;
        self.attendance
            .list_by_course(course_id)
            .map_err(AttendanceError::StoreRead)
    }

    /// Persist index appends held back by deferred persistence.
    pub fn flush(&self) -> Result<usize, IndexError> {
        self.registry.flush_all()
    }

    /// Return true if the course index is known to lag behind the store.
    pub fn is_stale(&self, course_id: &str) -> bool {
        self.stale.lock().contains(course_id)
    }

    pub(crate) fn mark_stale(&self, course_id: &str) {
        self.stale.lock().insert(course_id.to_string());
    }

    /// Lock serializing enrollments and rebuilds of one course.
    pub(crate) fn course_lock(&self, course_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.course_locks.lock();
        Arc::clone(locks.entry(course_id.to_string()).or_default())
    }

    pub(crate) fn require_course(&self, course_id: &str) -> Result<&str, AttendanceError> {
        self.config
            .course_name(course_id)
            .ok_or_else(|| AttendanceError::Validation(format!("Unknown course: {course_id}")))
    }
}
