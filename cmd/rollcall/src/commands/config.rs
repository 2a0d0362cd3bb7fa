//! Configuration command.

use clap::Args;

use super::{get_config, output_result, print_info};
use crate::Cli;

/// Print the effective configuration.
///
/// Configuration is stored in ~/.rollcall/config.yaml
#[derive(Args)]
pub struct ConfigCommand {}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let cfg = get_config(cli)?;
        if !cli.json {
            print_info(&format!("Config file: {}", cfg.path().display()));
        }
        output_result(&cfg, cli.json)?;
        Ok(true)
    }
}
