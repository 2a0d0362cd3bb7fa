//! rollcall - face enrollment and attendance from the command line.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    AttendanceCommand, ConfigCommand, EnrollCommand, InitCommand, RebuildCommand,
    RecognizeCommand, StudentsCommand,
};

/// rollcall - face enrollment and attendance.
///
/// Images are given as files holding the face embedding computed by an
/// external model, as a JSON float array.
///
/// Configuration is stored in ~/.rollcall/config.yaml and created with
/// defaults on first use.
#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Face enrollment and attendance tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.rollcall/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Prepare every course index and report its state
    Init(InitCommand),
    /// Enroll a student in a course
    Enroll(EnrollCommand),
    /// Recognize a student and mark attendance
    Recognize(RecognizeCommand),
    /// List enrolled students
    Students(StudentsCommand),
    /// List attendance events of a course
    Attendance(AttendanceCommand),
    /// Rebuild a course index from the student store
    Rebuild(RebuildCommand),
    /// Print the effective configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ok = match &cli.command {
        Commands::Init(cmd) => cmd.run(&cli)?,
        Commands::Enroll(cmd) => cmd.run(&cli)?,
        Commands::Recognize(cmd) => cmd.run(&cli)?,
        Commands::Students(cmd) => cmd.run(&cli)?,
        Commands::Attendance(cmd) => cmd.run(&cli)?,
        Commands::Rebuild(cmd) => cmd.run(&cli)?,
        Commands::Config(cmd) => cmd.run(&cli)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
