//! Face enrollment and attendance recognition.
//!
//! [`AttendanceService`] ties together a [`FaceExtractor`], the roster
//! stores and the per-course [`IndexRegistry`]:
//!
//! 1. [`AttendanceService::init`]: prepare every configured course index
//! 2. [`AttendanceService::enroll`]: duplicate check, extraction, store
//!    write, index append
//! 3. [`AttendanceService::recognize`]: extraction, nearest match,
//!    threshold decision, attendance write
//!
//! Both operations return outcome values instead of errors. The student
//! store is authoritative; a course index that falls behind it is rebuilt.
//!
//! [`IndexRegistry`]: rollcall_faceindex::IndexRegistry

pub mod config;
mod enroll;
pub mod error;
pub mod extractor;
mod recognize;
mod service;

pub use config::{Config, IndexPersistence};
pub use enroll::EnrollOutcome;
pub use error::{AttendanceError, FailureKind};
pub use extractor::{ExtractError, Extraction, FaceExtractor, FaceRegion, PrecomputedExtractor};
pub use recognize::{RecognizeOutcome, NOT_REGISTERED};
pub use service::{AttendanceService, WarmupReport, WarmupState};
