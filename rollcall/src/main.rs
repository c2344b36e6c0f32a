//! rollcall - classroom attendance tracker
//!
//! Manages classes, students and daily attendance, and shows local statistics.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/rollcall/data.db (~/.local/share/rollcall/data.db)
//! - Logs: $XDG_STATE_HOME/rollcall/rollcall.log.YYYY-MM-DD (~/.local/state/rollcall/)
//! - Config: $XDG_CONFIG_HOME/rollcall/config.toml (~/.config/rollcall/config.toml)

mod common;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rollcall_core::analytics::{compute_statistics, daily_tally};
use rollcall_core::export::RecordBackup;
use rollcall_core::{AttendanceEntry, AttendanceStatus, RecordStore, StudentId, DATE_FORMAT};

use crate::common::{print_json, print_statistics, today, Env, Format};

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(about = "Track classroom attendance")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List classes with their student counts
    Classes,

    /// Manage classes
    Class {
        #[command(subcommand)]
        command: ClassCommand,
    },

    /// Manage students
    Student {
        #[command(subcommand)]
        command: StudentCommand,
    },

    /// Record one student's attendance
    Mark {
        /// Class the student belongs to
        class: String,
        /// Student ID
        student: StudentId,
        /// present, late or absent
        status: AttendanceStatus,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Show per-student attendance statistics
    Stats {
        /// Only students of this class
        #[arg(short, long)]
        class: Option<String>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show per-date counts for one class
    Daily {
        class: String,
        /// Number of most recent dates (default: from config)
        #[arg(short, long)]
        days: Option<usize>,
    },

    /// Write all records to a backup file
    Backup {
        /// Output path (default: attendance_backup_YYYY-MM-DD.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all records with a backup file
    Restore { file: PathBuf },

    /// Delete all records and start over with the default classes
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ClassCommand {
    /// Add an empty class
    Add { name: String },
}

#[derive(Subcommand)]
enum StudentCommand {
    /// Add a student to a class
    Add {
        class: String,
        number: u32,
        name: String,
    },
    /// Change a student's number and name
    Edit {
        id: StudentId,
        #[arg(long)]
        number: Option<u32>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove a student and all of their attendance records
    Remove { id: StudentId },
    /// List students
    List {
        /// Only this class
        class: Option<String>,
    },
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let env = Env::open("rollcall")?;

    match args.command {
        Command::Classes => cmd_classes(&env),
        Command::Class {
            command: ClassCommand::Add { name },
        } => cmd_class_add(&env, &name),
        Command::Student { command } => cmd_student(&env, command),
        Command::Mark {
            class,
            student,
            status,
            date,
            reason,
            note,
        } => {
            let entry = AttendanceEntry {
                status,
                reason,
                note,
            };
            cmd_mark(&env, &class, student, entry, date.unwrap_or_else(today))
        }
        Command::Stats { class, format } => cmd_stats(&env, class.as_deref(), format),
        Command::Daily { class, days } => cmd_daily(&env, &class, days),
        Command::Backup { output } => cmd_backup(&env, output),
        Command::Restore { file } => cmd_restore(&env, &file),
        Command::Reset { yes } => cmd_reset(&env, yes),
    }
}

fn cmd_classes(env: &Env) -> Result<()> {
    let store = env.load_store()?;
    for (class, students) in &store.students {
        println!("{:<12} {} student(s)", class, students.len());
    }
    Ok(())
}

fn cmd_class_add(env: &Env, name: &str) -> Result<()> {
    let mut store = env.load_store()?;
    store.add_class(name)?;
    env.save_store(&store)?;
    println!("Added class {}", name.trim());
    Ok(())
}

fn cmd_student(env: &Env, command: StudentCommand) -> Result<()> {
    let mut store = env.load_store()?;

    match command {
        StudentCommand::Add {
            class,
            number,
            name,
        } => {
            let student = store.add_student(&class, number, &name)?;
            env.save_store(&store)?;
            println!(
                "Added {} (ID {}) to class {} as no. {}",
                student.name, student.id, class, student.number
            );
        }
        StudentCommand::Edit { id, number, name } => {
            let (_, current) = store
                .student_by_id(id)
                .with_context(|| format!("no student with ID {}", id))?;
            let number = number.unwrap_or(current.number);
            let name = name.unwrap_or_else(|| current.name.clone());

            let student = store.edit_student(id, number, &name)?;
            env.save_store(&store)?;
            println!("Updated {} (ID {}), no. {}", student.name, student.id, student.number);
        }
        StudentCommand::Remove { id } => {
            let student = store.delete_student(id)?;
            env.save_store(&store)?;
            println!("Removed {} (ID {}) and their attendance records", student.name, id);
        }
        StudentCommand::List { class } => {
            print_roster(&store, class.as_deref())?;
        }
    }
    Ok(())
}

fn print_roster(store: &RecordStore, class: Option<&str>) -> Result<()> {
    let classes: Vec<&String> = match class {
        Some(c) => {
            store.students_in(c)?;
            store.classes().filter(|name| name.as_str() == c).collect()
        }
        None => store.classes().collect(),
    };

    for class in classes {
        let students = store.students_in(class)?;
        println!("Class {} ({} student(s))", class, students.len());
        for s in students {
            println!("  {:>4}  {:<24} ID {}", s.number, s.name, s.id);
        }
    }
    Ok(())
}

fn cmd_mark(
    env: &Env,
    class: &str,
    student_id: StudentId,
    entry: AttendanceEntry,
    date: NaiveDate,
) -> Result<()> {
    let mut store = env.load_store()?;
    let status = entry.status;
    store.record_attendance(date, class, student_id, entry)?;
    env.save_store(&store)?;

    let name = store
        .student_by_id(student_id)
        .map(|(_, s)| s.name.clone())
        .unwrap_or_default();
    println!("{}: {} marked {}", date.format(DATE_FORMAT), name, status);
    Ok(())
}

fn cmd_stats(env: &Env, class: Option<&str>, format: Format) -> Result<()> {
    let store = env.load_store()?;
    let mut stats = compute_statistics(&store.students, &store.attendance);
    if let Some(class) = class {
        store.students_in(class)?;
        stats.retain(|s| s.class == class);
    }

    match format {
        Format::Json => print_json(&stats),
        Format::Text => {
            if stats.is_empty() {
                println!("No students found.");
                println!("Add one with 'rollcall student add <class> <number> <name>'.");
            } else {
                print_statistics(&stats);
            }
            Ok(())
        }
    }
}

fn cmd_daily(env: &Env, class: &str, days: Option<usize>) -> Result<()> {
    let store = env.load_store()?;
    store.students_in(class)?;
    let days = days.unwrap_or(env.config.records.trend_days);

    let tallies = daily_tally(&store.attendance, class, days);
    if tallies.is_empty() {
        println!("No attendance recorded yet.");
        return Ok(());
    }

    println!("{:<6} {:>7} {:>5} {:>7}", "Date", "Present", "Late", "Absent");
    for t in &tallies {
        println!(
            "{:<6} {:>7} {:>5} {:>7}",
            t.short_label(),
            t.present,
            t.late,
            t.absent
        );
    }
    Ok(())
}

fn cmd_backup(env: &Env, output: Option<PathBuf>) -> Result<()> {
    let store = env.load_store()?;
    let path = output.unwrap_or_else(|| PathBuf::from(RecordBackup::default_file_name(today())));

    RecordBackup::of(&store, Utc::now())
        .write_to(&path)
        .with_context(|| format!("failed to write backup to {}", path.display()))?;
    println!("Backed up records to {}", path.display());
    Ok(())
}

fn cmd_restore(env: &Env, file: &Path) -> Result<()> {
    let (store, backup_time) = RecordBackup::read(file)
        .with_context(|| format!("failed to restore from {}", file.display()))?;
    env.save_store(&store)?;

    tracing::info!(path = %file.display(), "Restored records from backup");
    match backup_time {
        Some(at) => println!("Restored records from {} (backed up {})", file.display(), at.to_rfc3339()),
        None => println!("Restored records from {}", file.display()),
    }
    Ok(())
}

fn cmd_reset(env: &Env, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("reset deletes every class, student and attendance record; pass --yes to confirm");
    }

    let mut store = env.load_store()?;
    store.reset(&env.config.records.default_classes, today());
    env.save_store(&store)?;
    println!(
        "Reset records; classes: {}",
        env.config.records.default_classes.join(", ")
    );
    Ok(())
}
