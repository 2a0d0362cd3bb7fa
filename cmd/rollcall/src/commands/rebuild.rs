use clap::Args;

use super::{open_service, output_result, print_success};
use crate::Cli;

/// Rebuild a course index from the student store.
#[derive(Args)]
pub struct RebuildCommand {
    /// Course code (e.g., AI)
    #[arg(long)]
    course: String,
}

#[derive(serde::Serialize)]
struct RebuildResult<'a> {
    course_id: &'a str,
    count: usize,
}

impl RebuildCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let (service, _) = open_service(cli)?;
        let count = service.rebuild(&self.course)?;

        if cli.json {
            output_result(
                &RebuildResult {
                    course_id: &self.course,
                    count,
                },
                true,
            )?;
        } else {
            print_success(&format!("Rebuilt {} index with {} students", self.course, count));
        }
        Ok(true)
    }
}
