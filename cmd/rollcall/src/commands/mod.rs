//! CLI commands module.

mod config;
mod enroll;
mod init;
mod list;
mod rebuild;
mod recognize;
mod util;

pub use config::ConfigCommand;
pub use enroll::EnrollCommand;
pub use init::InitCommand;
pub use list::{AttendanceCommand, StudentsCommand};
pub use rebuild::RebuildCommand;
pub use recognize::RecognizeCommand;

pub(crate) use util::*;
