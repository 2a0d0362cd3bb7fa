//! Per-course exact nearest-neighbor search over face embeddings.
//!
//! Each course owns an independent [`FlatIndex`]: an arena of
//! `(vector, identity)` entries searched by brute-force squared L2
//! distance. The [`IndexRegistry`] maps course identifiers to their index,
//! serializes access per course, and writes each course's vectors to an
//! [`IndexStorage`] blob.
//!
//! Identities are not persisted. An index restored with
//! [`IndexRegistry::load_persisted`] returns hits whose `student` is `None`
//! until the course is rebuilt from the student store.

pub mod error;
pub mod flat;
pub mod flat_io;
pub mod l2;
pub mod registry;
pub mod storage;

pub use error::IndexError;
pub use flat::{FlatIndex, Hit, StudentId, StudentRef};
pub use flat_io::{load as load_flat, save as save_flat};
pub use l2::squared_l2;
pub use registry::{IndexRegistry, Persistence, RegistryConfig};
pub use storage::{FileStorage, IndexStorage, MemoryStorage};
