//! Student roster and attendance log storage.
//!
//! Two trait seams, [`StudentStore`] and [`AttendanceLog`], with an
//! in-memory implementation for testing and a redb-based implementation
//! for persistence. Records are encoded with MessagePack.

pub mod error;
pub mod keys;
pub mod memory;
pub mod redb;
pub mod store;
pub mod types;

pub use error::RosterError;
pub use memory::MemoryRoster;
pub use self::redb::RedbRoster;
pub use store::{AttendanceLog, StudentStore};
pub use types::{AttendanceEvent, StudentId, StudentRecord};
