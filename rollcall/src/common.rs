//! Startup and output helpers shared by the rollcall binaries.

// Each binary uses a subset of these helpers.
#![allow(dead_code)]

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rollcall_core::logging::LoggingGuard;
use rollcall_core::{Config, Database, RecordStore, StudentStatistic};

/// Loaded configuration, open database and active logging.
pub struct Env {
    pub config: Config,
    pub db: Database,
    _log_guard: LoggingGuard,
}

impl Env {
    /// XDG env, config, logging, then the migrated database.
    pub fn open(binary: &str) -> Result<Self> {
        Config::ensure_xdg_env();

        let config = Config::load().context("failed to load configuration")?;
        let log_guard =
            rollcall_core::logging::init(&config.logging).context("failed to initialize logging")?;

        tracing::info!(binary, "starting");

        let db_path = Config::database_path();
        tracing::debug!(path = %db_path.display(), "Opening database");
        let db = Database::open(&db_path).context("failed to open database")?;
        db.migrate().context("failed to run database migrations")?;

        Ok(Self {
            config,
            db,
            _log_guard: log_guard,
        })
    }

    /// Persisted records, initialised on first use.
    pub fn load_store(&self) -> Result<RecordStore> {
        RecordStore::load(&self.db, &self.config.records.default_classes, today())
            .context("failed to load attendance records")
    }

    pub fn save_store(&self, store: &RecordStore) -> Result<()> {
        store
            .save(&self.db)
            .context("failed to save attendance records")
    }
}

/// Local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Output format for commands that can emit JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to encode JSON")?
    );
    Ok(())
}

/// Fixed-width statistics table.
pub fn print_statistics(stats: &[StudentStatistic]) {
    println!(
        "{:<6} {:<8} {:>4}  {:<20} {:>5} {:>7} {:>4} {:>6} {:>5}",
        "ID", "Class", "No.", "Name", "Days", "Present", "Late", "Absent", "Rate"
    );
    println!("{}", "-".repeat(74));
    for s in stats {
        println!(
            "{:<6} {:<8} {:>4}  {:<20} {:>5} {:>7} {:>4} {:>6} {:>4}%",
            s.id,
            truncate(&s.class, 8),
            s.number,
            truncate(&s.name, 20),
            s.total_days,
            s.present_days,
            s.late_days,
            s.absent_days,
            s.attendance_rate
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
