//! Enrollment command.

use clap::Args;

use super::{open_service, output_result, print_error, print_info, print_success, print_verbose, read_image};
use crate::Cli;

/// Enroll a student in a course.
#[derive(Args)]
pub struct EnrollCommand {
    /// Student ID
    #[arg(long)]
    id: u32,
    /// Student name
    #[arg(long)]
    name: String,
    /// Course code (e.g., AI)
    #[arg(long)]
    course: String,
    /// Course display name (default: the configured name)
    #[arg(long, default_value = "")]
    course_name: String,
    /// Path to the face embedding file
    #[arg(long)]
    image: String,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let image = read_image(&self.image)?;
        let (service, _) = open_service(cli)?;

        print_verbose(cli, &format!("Enrolling {} in {}", self.id, self.course));
        let outcome = service.enroll(self.id, &self.name, &self.course, &self.course_name, &image);

        if cli.json {
            output_result(&outcome, true)?;
        } else if !outcome.success {
            print_error(&outcome.message);
        } else {
            print_success(&outcome.message);
            if !outcome.index_synced {
                print_info("Run 'rollcall rebuild' if the index stays out of date");
            }
        }

        // The student is already committed; a flush failure only delays the blob.
        match service.flush() {
            Ok(0) => {}
            Ok(n) => print_verbose(cli, &format!("Persisted {} course indexes", n)),
            Err(e) => {
                print_error(&format!("Failed to persist face index: {e}"));
                print_info("Run 'rollcall rebuild' to rewrite the index from the roster");
            }
        }
        Ok(outcome.success)
    }
}
