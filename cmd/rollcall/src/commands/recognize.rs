//! Recognition command.

use clap::Args;

use super::{open_service, output_result, print_error, print_info, print_success, read_image};
use crate::Cli;

/// Recognize a student and mark attendance.
#[derive(Args)]
pub struct RecognizeCommand {
    /// Course code (e.g., AI)
    #[arg(long)]
    course: String,
    /// Path to the face embedding file
    #[arg(long)]
    image: String,
}

impl RecognizeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let image = read_image(&self.image)?;
        let (service, _) = open_service(cli)?;

        let outcome = service.recognize(&image, &self.course);

        if cli.json {
            output_result(&outcome, true)?;
        } else if outcome.already_marked {
            print_info(&outcome.message);
        } else if outcome.is_recognized() {
            print_success(&outcome.message);
        } else {
            print_error(&outcome.message);
        }
        Ok(outcome.is_recognized())
    }
}
