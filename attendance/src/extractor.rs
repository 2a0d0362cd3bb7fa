use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a face embedding could not be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Failed to detect face region")]
    NoFace,

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Embedding extraction failed: {0}")]
    Model(String),
}

/// Bounding box of the detected face, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub embedding: Vec<f32>,

    /// Auxiliary output of the detector. Not used by the services.
    pub region: Option<FaceRegion>,
}

/// Extracts face embedding vectors from encoded images.
///
/// The same face must yield embeddings within the acceptance threshold of
/// each other across calls. Each call is a single attempt; callers do not
/// retry.
///
/// Implementations must be safe for concurrent use.
pub trait FaceExtractor: Send + Sync {
    /// Computes a face embedding from encoded image bytes.
    fn extract(&self, image: &[u8]) -> Result<Extraction, ExtractError>;

    /// Returns the dimensionality of the embedding vectors (e.g., 512).
    fn dimension(&self) -> usize;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Bare(Vec<f32>),
    Full {
        embedding: Vec<f32>,
        #[serde(default)]
        region: Option<FaceRegion>,
    },
}

/// Extractor for embeddings computed by an external model.
///
/// The "image" is JSON: either a bare float array or an object
/// `{"embedding": [...], "region": {...}}`. An empty embedding means the
/// model found no face.
#[derive(Debug, Clone)]
pub struct PrecomputedExtractor {
    dim: usize,
}

impl PrecomputedExtractor {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl FaceExtractor for PrecomputedExtractor {
    fn extract(&self, image: &[u8]) -> Result<Extraction, ExtractError> {
        let payload: Payload =
            serde_json::from_slice(image).map_err(|e| ExtractError::Decode(e.to_string()))?;
        let (embedding, region) = match payload {
            Payload::Bare(embedding) => (embedding, None),
            Payload::Full { embedding, region } => (embedding, region),
        };
        if embedding.is_empty() {
            return Err(ExtractError::NoFace);
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(ExtractError::Model("non-finite embedding value".into()));
        }
        Ok(Extraction { embedding, region })
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
