use crate::error::IndexError;
use crate::l2::squared_l2;

/// Numeric student identifier carried alongside each indexed vector.
pub type StudentId = u32;

/// Identity attached to an indexed vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRef {
    pub student_id: StudentId,
    pub name: String,
}

/// A single result from [`FlatIndex::search`].
#[derive(Debug, Clone)]
pub struct Hit {
    /// Arena position of the matched vector (insertion order).
    pub position: usize,

    /// Squared L2 distance between the query and the matched vector.
    pub distance: f32,

    /// Identity of the matched vector, or `None` when the index was loaded
    /// from persisted vectors and has not been rebuilt since.
    pub student: Option<StudentRef>,
}

struct Entry {
    vector: Vec<f32>,
    student: Option<StudentRef>,
}

/// FlatIndex is an exact, brute-force squared-L2 index.
///
/// Vectors and their identities live together in one arena, so a position
/// always resolves to the identity it was inserted with.
pub struct FlatIndex {
    dim: usize,
    entries: Vec<Entry>,
}

impl FlatIndex {
    /// Create an empty index. Panics if `dim` is 0.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "faceindex: dim must be positive");
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Create an index from three parallel sequences.
    pub fn from_parts(
        dim: usize,
        embeddings: &[Vec<f32>],
        student_ids: &[StudentId],
        names: &[String],
    ) -> Result<Self, IndexError> {
        check_parts(dim, embeddings, student_ids, names)?;

        let mut index = Self::new(dim);
        index.entries.reserve(embeddings.len());
        for ((vector, &student_id), name) in embeddings.iter().zip(student_ids).zip(names) {
            index.entries.push(Entry {
                vector: vector.clone(),
                student: Some(StudentRef {
                    student_id,
                    name: name.clone(),
                }),
            });
        }
        Ok(index)
    }

    /// Create an index whose vectors have no known identity.
    pub(crate) fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Self {
        let mut index = Self::new(dim);
        index.entries = vectors
            .into_iter()
            .map(|vector| Entry {
                vector,
                student: None,
            })
            .collect();
        index
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return true if every entry carries an identity.
    pub fn is_mapped(&self) -> bool {
        self.entries.iter().all(|e| e.student.is_some())
    }

    /// Append a vector and return its position.
    pub fn add(&mut self, vector: &[f32], student: Option<StudentRef>) -> Result<usize, IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                got: vector.len(),
                want: self.dim,
            });
        }
        self.entries.push(Entry {
            vector: vector.to_vec(),
            student,
        });
        Ok(self.entries.len() - 1)
    }

    /// Return the vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.entries.get(position).map(|e| e.vector.as_slice())
    }

    /// Return the identity stored at `position`.
    pub fn student(&self, position: usize) -> Option<&StudentRef> {
        self.entries.get(position).and_then(|e| e.student.as_ref())
    }

    /// Iterate over stored vectors in insertion order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.entries.iter().map(|e| e.vector.as_slice())
    }

    /// Return the top-k nearest vectors ordered by ascending distance.
    /// Equal distances keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Hit>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                got: query.len(),
                want: self.dim,
            });
        }
        if self.entries.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, squared_l2(query, &e.vector)))
            .collect();

        // sort_by is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| Hit {
                position,
                distance,
                student: self.entries[position].student.clone(),
            })
            .collect())
    }
}

/// Validate three parallel sequences: equal lengths first, then widths.
pub(crate) fn check_parts(
    dim: usize,
    embeddings: &[Vec<f32>],
    student_ids: &[StudentId],
    names: &[String],
) -> Result<(), IndexError> {
    if embeddings.len() != student_ids.len() || embeddings.len() != names.len() {
        return Err(IndexError::LengthMismatch {
            embeddings: embeddings.len(),
            ids: student_ids.len(),
            names: names.len(),
        });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
        return Err(IndexError::DimensionMismatch {
            got: bad.len(),
            want: dim,
        });
    }
    Ok(())
}
