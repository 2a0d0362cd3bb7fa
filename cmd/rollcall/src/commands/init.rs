//! Startup check command.

use clap::Args;

use rollcall_attendance::WarmupState;

use super::{open_service, output_result, print_error, print_success};
use crate::Cli;

/// Prepare every configured course index and report how it was loaded.
///
/// Courses with enrolled students are rebuilt from the roster; empty
/// courses load their persisted index, if any.
#[derive(Args)]
pub struct InitCommand {}

impl InitCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let (_, reports) = open_service(cli)?;

        if cli.json {
            output_result(&reports, true)?;
        } else {
            for r in &reports {
                match &r.state {
                    WarmupState::Built { count } => {
                        print_success(&format!("{}: rebuilt from roster ({} students)", r.course_id, count))
                    }
                    WarmupState::Loaded { count } => {
                        print_success(&format!("{}: loaded persisted index ({} vectors)", r.course_id, count))
                    }
                    WarmupState::Disabled { reason } => {
                        print_error(&format!("{}: disabled: {}", r.course_id, reason))
                    }
                }
            }
        }

        Ok(reports
            .iter()
            .all(|r| !matches!(r.state, WarmupState::Disabled { .. })))
    }
}
