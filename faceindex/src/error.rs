use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("faceindex: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("faceindex: length mismatch: {embeddings} embeddings, {ids} ids, {names} names")]
    LengthMismatch {
        embeddings: usize,
        ids: usize,
        names: usize,
    },

    #[error("faceindex: {0}")]
    Io(String),

    #[error("faceindex: invalid format: {0}")]
    InvalidFormat(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}
