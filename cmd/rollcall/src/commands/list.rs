//! Roster and attendance listing commands.

use clap::Args;
use serde::Serialize;

use rollcall_roster::{AttendanceEvent, StudentId, StudentRecord};

use super::{open_service, output_result};
use crate::Cli;

/// List enrolled students.
#[derive(Args)]
pub struct StudentsCommand {
    /// Course code (default: all courses)
    #[arg(long)]
    course: Option<String>,
}

/// A student row without the embedding.
#[derive(Serialize)]
struct StudentRow {
    student_id: StudentId,
    name: String,
    course_id: String,
    course_name: String,
}

impl From<StudentRecord> for StudentRow {
    fn from(r: StudentRecord) -> Self {
        Self {
            student_id: r.student_id,
            name: r.name,
            course_id: r.course_id,
            course_name: r.course_name,
        }
    }
}

impl StudentsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let (service, _) = open_service(cli)?;
        let records = match &self.course {
            Some(course) => service.students(course)?,
            None => service.all_students()?,
        };

        if cli.json {
            let rows: Vec<StudentRow> = records.into_iter().map(StudentRow::from).collect();
            output_result(&rows, true)?;
        } else {
            println!("{:<8} {:<24} {:<8} {}", "ID", "NAME", "COURSE", "COURSE NAME");
            for r in &records {
                println!("{:<8} {:<24} {:<8} {}", r.student_id, r.name, r.course_id, r.course_name);
            }
        }
        Ok(true)
    }
}

/// List attendance events of a course.
#[derive(Args)]
pub struct AttendanceCommand {
    /// Course code (e.g., AI)
    #[arg(long)]
    course: String,
}

impl AttendanceCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<bool> {
        let (service, _) = open_service(cli)?;
        let events: Vec<AttendanceEvent> = service.attendance(&self.course)?;

        if cli.json {
            output_result(&events, true)?;
        } else {
            println!("{:<6} {:<8} {:<8} {}", "#", "ID", "COURSE", "TIME");
            for e in &events {
                println!(
                    "{:<6} {:<8} {:<8} {}",
                    e.id,
                    e.student_id,
                    e.course_id,
                    e.timestamp.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Ok(true)
    }
}
