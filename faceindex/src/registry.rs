use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::IndexError;
use crate::flat::{check_parts, FlatIndex, Hit, StudentId, StudentRef};
use crate::flat_io;
use crate::storage::IndexStorage;

/// When appended vectors reach stable storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Persistence {
    /// Re-persist the whole course index after every append.
    #[default]
    WriteThrough,
    /// Mark the course dirty; [`IndexRegistry::flush`] persists it.
    Deferred,
}

/// Configures an [`IndexRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Embedding dimension every course index is held to.
    pub dim: usize,
    pub persistence: Persistence,
}

#[derive(Default)]
struct CourseSlot {
    index: Option<FlatIndex>,
    dirty: bool,
}

/// IndexRegistry maps course identifiers to their similarity index.
///
/// Each course sits behind its own mutex: a mutation of one course's index
/// excludes reads and writes of that course only.
pub struct IndexRegistry {
    cfg: RegistryConfig,
    storage: Arc<dyn IndexStorage>,
    courses: RwLock<HashMap<String, Arc<Mutex<CourseSlot>>>>,
}

impl IndexRegistry {
    /// Create an empty registry. Panics if `cfg.dim` is 0.
    pub fn new(cfg: RegistryConfig, storage: Arc<dyn IndexStorage>) -> Self {
        assert!(cfg.dim > 0, "faceindex: RegistryConfig.dim must be positive");
        Self {
            cfg,
            storage,
            courses: RwLock::new(HashMap::new()),
        }
    }

    pub fn dim(&self) -> usize {
        self.cfg.dim
    }

    pub fn persistence(&self) -> Persistence {
        self.cfg.persistence
    }

    fn slot(&self, course_id: &str) -> Arc<Mutex<CourseSlot>> {
        if let Some(slot) = self.courses.read().get(course_id) {
            return Arc::clone(slot);
        }
        let mut courses = self.courses.write();
        Arc::clone(courses.entry(course_id.to_string()).or_default())
    }

    fn existing_slot(&self, course_id: &str) -> Option<Arc<Mutex<CourseSlot>>> {
        self.courses.read().get(course_id).map(Arc::clone)
    }

    /// Build a course index from three parallel sequences, replacing any
    /// in-memory index and the persisted blob for that course.
    ///
    /// Empty input is a no-op: the course index is left as it was.
    pub fn build(
        &self,
        embeddings: &[Vec<f32>],
        student_ids: &[StudentId],
        names: &[String],
        course_id: &str,
    ) -> Result<(), IndexError> {
        check_parts(self.cfg.dim, embeddings, student_ids, names)?;
        if embeddings.is_empty() {
            warn!(course_id, "no embeddings provided, index not built");
            return Ok(());
        }

        let index = FlatIndex::from_parts(self.cfg.dim, embeddings, student_ids, names)?;
        let blob = flat_io::encode(&index)?;

        let slot = self.slot(course_id);
        let mut slot = slot.lock();
        self.storage.write(course_id, &blob)?;
        slot.index = Some(index);
        slot.dirty = false;

        info!(course_id, count = embeddings.len(), "index built and persisted");
        Ok(())
    }

    /// Load a course index from stable storage.
    ///
    /// A missing blob records an empty index. Loaded vectors carry no
    /// identities until the course is rebuilt. A width other than the
    /// configured dimension disables the course and is returned as
    /// [`IndexError::DimensionMismatch`]. Returns the number of vectors loaded.
    pub fn load_persisted(&self, course_id: &str) -> Result<usize, IndexError> {
        let slot = self.slot(course_id);
        let mut slot = slot.lock();
        slot.dirty = false;

        let blob = match self.storage.read(course_id) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(course_id, "no persisted index, starting empty");
                slot.index = Some(FlatIndex::new(self.cfg.dim));
                return Ok(0);
            }
            Err(e) => {
                slot.index = None;
                return Err(e);
            }
        };

        let index = match flat_io::decode(&blob, self.cfg.dim) {
            Ok(index) => index,
            Err(e) => {
                slot.index = None;
                return Err(e);
            }
        };

        let n = index.len();
        slot.index = Some(index);
        info!(course_id, count = n, "index loaded without identities");
        Ok(n)
    }

    /// Append one vector to a course index, creating the index if needed.
    /// Returns the position of the new vector.
    pub fn append_vector(
        &self,
        embedding: &[f32],
        student_id: StudentId,
        name: &str,
        course_id: &str,
    ) -> Result<usize, IndexError> {
        if embedding.len() != self.cfg.dim {
            return Err(IndexError::DimensionMismatch {
                got: embedding.len(),
                want: self.cfg.dim,
            });
        }

        let slot = self.slot(course_id);
        let mut slot = slot.lock();
        let dim = self.cfg.dim;
        let index = slot.index.get_or_insert_with(|| FlatIndex::new(dim));
        let position = index.add(
            embedding,
            Some(StudentRef {
                student_id,
                name: name.to_string(),
            }),
        )?;
        let count = index.len();
        slot.dirty = true;

        if self.cfg.persistence == Persistence::WriteThrough {
            self.persist_locked(course_id, &mut slot)?;
        }

        info!(course_id, student_id, count, "vector appended");
        Ok(position)
    }

    /// Return the `k` nearest entries of a course index.
    ///
    /// An absent or empty index, or a query of the wrong width, yields an
    /// empty result rather than an error.
    pub fn query(&self, embedding: &[f32], course_id: &str, k: usize) -> Vec<Hit> {
        let Some(slot) = self.existing_slot(course_id) else {
            warn!(course_id, "index not initialized for course");
            return vec![];
        };
        let slot = slot.lock();
        let Some(index) = slot.index.as_ref() else {
            warn!(course_id, "index disabled for course");
            return vec![];
        };
        if index.is_empty() {
            warn!(course_id, "index is empty for course");
            return vec![];
        }

        match index.search(embedding, k) {
            Ok(hits) => {
                if let Some(best) = hits.first() {
                    debug!(course_id, position = best.position, distance = best.distance, "search completed");
                }
                hits
            }
            Err(e) => {
                warn!(course_id, error = %e, "search rejected");
                vec![]
            }
        }
    }

    /// Reset a course to an empty index and remove its persisted blob.
    pub fn clear(&self, course_id: &str) -> Result<(), IndexError> {
        let slot = self.slot(course_id);
        let mut slot = slot.lock();
        self.storage.remove(course_id)?;
        slot.index = Some(FlatIndex::new(self.cfg.dim));
        slot.dirty = false;
        info!(course_id, "index cleared");
        Ok(())
    }

    /// Persist a course index if it has unpersisted appends.
    /// Returns true if a blob was written.
    pub fn flush(&self, course_id: &str) -> Result<bool, IndexError> {
        let Some(slot) = self.existing_slot(course_id) else {
            return Ok(false);
        };
        let mut slot = slot.lock();
        if !slot.dirty {
            return Ok(false);
        }
        self.persist_locked(course_id, &mut slot)?;
        Ok(true)
    }

    /// Persist every dirty course. Returns the number of blobs written.
    pub fn flush_all(&self) -> Result<usize, IndexError> {
        let mut written = 0;
        for course_id in self.courses() {
            if self.flush(&course_id)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Number of vectors in a course index, or `None` if the course has no
    /// usable index.
    pub fn len(&self, course_id: &str) -> Option<usize> {
        let slot = self.existing_slot(course_id)?;
        let slot = slot.lock();
        slot.index.as_ref().map(FlatIndex::len)
    }

    /// Return true if every vector of the course index has a known identity.
    pub fn is_mapped(&self, course_id: &str) -> bool {
        self.existing_slot(course_id)
            .map(|slot| slot.lock().index.as_ref().is_some_and(FlatIndex::is_mapped))
            .unwrap_or(false)
    }

    /// Return true if the course has appends not yet written to storage.
    pub fn is_dirty(&self, course_id: &str) -> bool {
        self.existing_slot(course_id)
            .map(|slot| slot.lock().dirty)
            .unwrap_or(false)
    }

    /// Known course identifiers, sorted.
    pub fn courses(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.courses.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn persist_locked(&self, course_id: &str, slot: &mut CourseSlot) -> Result<(), IndexError> {
        let Some(index) = slot.index.as_ref() else {
            return Ok(());
        };
        let blob = flat_io::encode(index)?;
        self.storage.write(course_id, &blob)?;
        slot.dirty = false;
        debug!(course_id, bytes = blob.len(), "index persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    const DIM: usize = 4;

    fn registry(storage: Arc<dyn IndexStorage>, persistence: Persistence) -> IndexRegistry {
        IndexRegistry::new(RegistryConfig { dim: DIM, persistence }, storage)
    }

    fn unit(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; DIM];
        v[i % DIM] = 1.0;
        v
    }

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    struct FailingStorage;

    impl IndexStorage for FailingStorage {
        fn read(&self, _: &str) -> Result<Option<Vec<u8>>, IndexError> {
            Err(IndexError::Io("disk on fire".into()))
        }
        fn write(&self, _: &str, _: &[u8]) -> Result<(), IndexError> {
            Err(IndexError::Io("disk on fire".into()))
        }
        fn remove(&self, _: &str) -> Result<(), IndexError> {
            Err(IndexError::Io("disk on fire".into()))
        }
    }

    #[test]
    fn test_self_match() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        for i in 0..3 {
            reg.append_vector(&unit(i), 1000 + i as u32, "s", "AI").unwrap();
        }
        for i in 0..3 {
            let hits = reg.query(&unit(i), "AI", 1);
            assert_eq!(hits[0].position, i);
            assert_eq!(hits[0].distance, 0.0);
            assert_eq!(hits[0].student.as_ref().unwrap().student_id, 1000 + i as u32);
        }
    }

    #[test]
    fn test_build_then_append_matches_single_build() {
        let all: Vec<Vec<f32>> = (0..6)
            .map(|i| vec![i as f32, (i * i) as f32 * 0.1, 1.0, -(i as f32)])
            .collect();
        let ids: Vec<u32> = (0..6).map(|i| 2000 + i).collect();
        let ns: Vec<String> = (0..6).map(|i| format!("s{i}")).collect();

        let incremental = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        incremental.build(&all[..2], &ids[..2], &ns[..2], "AI").unwrap();
        for i in 2..6 {
            incremental.append_vector(&all[i], ids[i], &ns[i], "AI").unwrap();
        }

        let single = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        single.build(&all, &ids, &ns, "AI").unwrap();

        let q = [2.5, 0.3, 1.0, -2.0];
        let a = incremental.query(&q, "AI", 6);
        let b = single.query(&q, "AI", 6);
        assert_eq!(a.len(), 6);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.distance, y.distance);
            assert_eq!(x.student, y.student);
        }
    }

    #[test]
    fn test_build_validation() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        let err = reg
            .build(&[unit(0)], &[1000, 1001], &names(&["a"]), "AI")
            .err()
            .unwrap();
        assert!(matches!(err, IndexError::LengthMismatch { .. }));

        let err = reg
            .build(&[vec![1.0; DIM + 1]], &[1000], &names(&["a"]), "AI")
            .err()
            .unwrap();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(reg.len("AI"), None);
    }

    #[test]
    fn test_build_empty_is_noop() {
        let storage = Arc::new(MemoryStorage::new());
        let reg = registry(storage.clone(), Persistence::WriteThrough);
        reg.build(&[], &[], &[], "AI").unwrap();
        assert_eq!(reg.len("AI"), None);
        assert!(!storage.contains("AI"));
        assert!(reg.query(&unit(0), "AI", 1).is_empty());
    }

    #[test]
    fn test_build_replaces_previous() {
        let storage = Arc::new(MemoryStorage::new());
        let reg = registry(storage.clone(), Persistence::WriteThrough);
        reg.build(&[unit(0), unit(1)], &[1, 2], &names(&["a", "b"]), "AI").unwrap();
        reg.build(&[unit(2)], &[3], &names(&["c"]), "AI").unwrap();
        assert_eq!(reg.len("AI"), Some(1));

        let reloaded = registry(storage, Persistence::WriteThrough);
        assert_eq!(reloaded.load_persisted("AI").unwrap(), 1);
    }

    #[test]
    fn test_query_sentinels() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        // Unknown course.
        assert!(reg.query(&unit(0), "GD", 1).is_empty());

        // Known but empty course.
        reg.load_persisted("GD").unwrap();
        assert_eq!(reg.len("GD"), Some(0));
        assert!(reg.query(&unit(0), "GD", 1).is_empty());

        // Wrong query width.
        reg.append_vector(&unit(0), 1000, "a", "GD").unwrap();
        assert!(reg.query(&[1.0, 0.0], "GD", 1).is_empty());
        assert_eq!(reg.query(&unit(0), "GD", 1).len(), 1);
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn IndexStorage> = Arc::new(FileStorage::new(dir.path()));

        let reg = registry(Arc::clone(&storage), Persistence::WriteThrough);
        reg.build(&[unit(0), unit(1)], &[1000, 1001], &names(&["a", "b"]), "AI")
            .unwrap();
        reg.append_vector(&unit(2), 1002, "c", "AI").unwrap();
        let before = reg.query(&[0.2, 0.7, 0.1, 0.0], "AI", 3);

        let reloaded = registry(storage, Persistence::WriteThrough);
        assert_eq!(reloaded.load_persisted("AI").unwrap(), 3);
        assert!(!reloaded.is_mapped("AI"));

        let after = reloaded.query(&[0.2, 0.7, 0.1, 0.0], "AI", 3);
        assert_eq!(before.len(), after.len());
        for (x, y) in before.iter().zip(after.iter()) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.distance, y.distance);
            assert!(y.student.is_none());
        }
    }

    #[test]
    fn test_load_dimension_mismatch_disables_course() {
        let storage: Arc<dyn IndexStorage> = Arc::new(MemoryStorage::new());
        let wide = IndexRegistry::new(
            RegistryConfig { dim: DIM + 2, persistence: Persistence::WriteThrough },
            Arc::clone(&storage),
        );
        wide.append_vector(&vec![0.5; DIM + 2], 1000, "a", "AI").unwrap();

        let reg = registry(storage, Persistence::WriteThrough);
        let err = reg.load_persisted("AI").err().unwrap();
        assert!(matches!(err, IndexError::DimensionMismatch { got, want } if got == DIM + 2 && want == DIM));
        assert_eq!(reg.len("AI"), None);
        assert!(reg.query(&unit(0), "AI", 1).is_empty());
    }

    fn blob_header(dim: u32, count: u32) -> Vec<u8> {
        let mut blob = b"FLAT".to_vec();
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&dim.to_le_bytes());
        blob.extend_from_slice(&count.to_le_bytes());
        blob
    }

    #[test]
    fn test_load_huge_dim_header_disables_course_only() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("AI", &blob_header(u32::MAX, 1)).unwrap();
        let reg = registry(storage.clone(), Persistence::WriteThrough);

        let err = reg.load_persisted("AI").err().unwrap();
        assert!(matches!(err, IndexError::DimensionMismatch { want, .. } if want == DIM));
        assert_eq!(reg.len("AI"), None);

        assert_eq!(reg.load_persisted("GD").unwrap(), 0);
        reg.append_vector(&unit(0), 1000, "a", "GD").unwrap();
        assert_eq!(reg.query(&unit(0), "GD", 1).len(), 1);
    }

    #[test]
    fn test_load_wrong_dim_with_truncated_body() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write("AI", &blob_header(8, 3)).unwrap();
        let reg = registry(storage, Persistence::WriteThrough);

        let err = reg.load_persisted("AI").err().unwrap();
        assert!(matches!(err, IndexError::DimensionMismatch { got: 8, want } if want == DIM));
        assert_eq!(reg.len("AI"), None);
    }

    #[test]
    fn test_load_missing_is_empty() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        assert_eq!(reg.load_persisted("AI").unwrap(), 0);
        assert_eq!(reg.len("AI"), Some(0));
        assert!(reg.is_mapped("AI"));
    }

    #[test]
    fn test_append_dimension_mismatch() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        assert!(reg.append_vector(&[1.0], 1000, "a", "AI").is_err());
        assert_eq!(reg.len("AI"), None);
    }

    #[test]
    fn test_append_write_failure_keeps_vector_in_memory() {
        let reg = registry(Arc::new(FailingStorage), Persistence::WriteThrough);
        assert!(reg.append_vector(&unit(0), 1000, "a", "AI").is_err());
        assert_eq!(reg.len("AI"), Some(1));
        assert!(reg.is_dirty("AI"));
    }

    #[test]
    fn test_deferred_persistence() {
        let storage = Arc::new(MemoryStorage::new());
        let reg = registry(storage.clone(), Persistence::Deferred);
        reg.append_vector(&unit(0), 1000, "a", "AI").unwrap();
        assert!(!storage.contains("AI"));
        assert!(reg.is_dirty("AI"));

        assert_eq!(reg.flush_all().unwrap(), 1);
        assert!(storage.contains("AI"));
        assert!(!reg.flush("AI").unwrap());
    }

    #[test]
    fn test_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let reg = registry(storage.clone(), Persistence::WriteThrough);
        reg.append_vector(&unit(0), 1000, "a", "AI").unwrap();
        assert!(storage.contains("AI"));

        reg.clear("AI").unwrap();
        assert_eq!(reg.len("AI"), Some(0));
        assert!(!storage.contains("AI"));
    }

    #[test]
    fn test_courses_are_independent() {
        let reg = registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough);
        reg.append_vector(&unit(0), 1000, "a", "AI").unwrap();
        reg.append_vector(&unit(1), 1001, "b", "GD").unwrap();
        assert_eq!(reg.len("AI"), Some(1));
        assert_eq!(reg.len("GD"), Some(1));
        assert_eq!(reg.courses(), vec!["AI".to_string(), "GD".to_string()]);

        let hits = reg.query(&unit(1), "AI", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].student.as_ref().unwrap().student_id, 1000);
    }

    #[test]
    fn test_concurrent_appends_across_courses() {
        let reg = Arc::new(registry(Arc::new(MemoryStorage::new()), Persistence::WriteThrough));
        let handles: Vec<_> = ["AI", "GD", "ML", "OS"]
            .into_iter()
            .map(|course| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        reg.append_vector(&unit(i), 1000 + i as u32, "s", course).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for course in ["AI", "GD", "ML", "OS"] {
            assert_eq!(reg.len(course), Some(50));
            assert!(reg.is_mapped(course));
        }
    }
}
