//! rollcall-sync - sync-server and model-server tooling
//!
//! This tool provides commands for:
//! - Checking sync configuration and server status
//! - Pushing the full record store to the sync server
//! - Pulling records back from the server
//! - Checking the local model server
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/rollcall/data.db (~/.local/share/rollcall/data.db)
//! - Config: $XDG_CONFIG_HOME/rollcall/config.toml (~/.config/rollcall/config.toml)

mod common;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rollcall_core::config::LlmProvider;
use rollcall_core::logging;
use rollcall_core::{run_local_analysis, HttpTextGenerator, SyncClient};

use crate::common::Env;

#[derive(Parser)]
#[command(name = "rollcall-sync")]
#[command(about = "Synchronize attendance records with a sync server")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show sync configuration and server status
    Status,

    /// Upload all records with a fresh local analysis
    Push,

    /// Replace local records with the server's copy
    Pull {
        /// Fetch a specific pushed snapshot
        #[arg(long)]
        sync_id: Option<String>,

        /// Confirm overwriting local records
        #[arg(long)]
        yes: bool,
    },

    /// Check the local model server
    ModelStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = Env::open("rollcall-sync")?;

    match args.command {
        Command::Status => cmd_status(&env).await,
        Command::Push => cmd_push(&env).await,
        Command::Pull { sync_id, yes } => cmd_pull(&env, sync_id.as_deref(), yes).await,
        Command::ModelStatus => cmd_model_status(&env).await,
    }
}

fn ready_client(env: &Env) -> Result<SyncClient> {
    let sync = &env.config.sync;
    if !sync.is_ready() {
        anyhow::bail!("sync is not configured; run 'rollcall-sync status' for details");
    }
    SyncClient::new(sync).context("failed to create sync client")
}

async fn cmd_status(env: &Env) -> Result<()> {
    println!("Sync Configuration");
    println!("==================");
    println!();

    let sync = &env.config.sync;
    println!(
        "Log file:        {}",
        logging::log_file_path(Utc::now().date_naive()).display()
    );
    println!("Enabled:         {}", sync.enabled);

    if !sync.enabled {
        println!();
        println!("Sync is disabled. Enable it in config.toml:");
        println!();
        println!("  [sync]");
        println!("  enabled = true");
        println!("  server_url = \"https://your-sync-server.example.com/api\"");
        println!("  api_key = \"your-server-issued-key\"");
        return Ok(());
    }

    println!(
        "Server URL:      {}",
        sync.server_url.as_deref().unwrap_or("<not set>")
    );
    println!(
        "API Key:         {}",
        if sync.has_valid_server_key() {
            "<set>"
        } else {
            "<missing or too short>"
        }
    );
    println!("Timeout:         {}s", sync.timeout_secs);

    let last_sync = env
        .db
        .last_sync_time()
        .context("failed to read last sync time")?;
    println!(
        "Last sync:       {}",
        last_sync
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );

    if !sync.is_ready() {
        return Ok(());
    }

    println!();
    let client = SyncClient::new(sync).context("failed to create sync client")?;
    match client.check_status().await {
        Ok(status) if status.is_ok() => println!("Server:          online"),
        Ok(status) => println!("Server:          responded with status '{}'", status.status),
        Err(e) => println!("Server:          unreachable ({})", e),
    }
    Ok(())
}

async fn cmd_push(env: &Env) -> Result<()> {
    let client = ready_client(env)?;
    let store = env.load_store()?;
    let analysis = run_local_analysis(&store.students, &store.attendance)
        .context("local analysis failed")?;

    let receipt = client
        .push_records(&store, &analysis.local_analysis, Utc::now())
        .await
        .context("push failed")?;
    env.db
        .set_last_sync_time(receipt.synced_at)
        .context("failed to record sync time")?;

    match receipt.sync_id {
        Some(id) => println!("Pushed records (sync ID {})", id),
        None => println!("Pushed records"),
    }
    Ok(())
}

async fn cmd_pull(env: &Env, sync_id: Option<&str>, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("pull replaces all local records; pass --yes to confirm");
    }

    let client = ready_client(env)?;
    let store = client
        .fetch_records(sync_id)
        .await
        .context("pull failed")?;
    env.save_store(&store)?;
    env.db
        .set_last_sync_time(Utc::now())
        .context("failed to record sync time")?;

    let students: usize = store.students.values().map(Vec::len).sum();
    println!(
        "Pulled {} class(es), {} student(s), {} date(s)",
        store.students.len(),
        students,
        store.attendance.len()
    );
    Ok(())
}

async fn cmd_model_status(env: &Env) -> Result<()> {
    let llm = &env.config.llm;
    println!("Provider:        {}", llm.provider.as_str());
    println!("Endpoint:        {}", llm.endpoint());
    println!(
        "API key:         {}",
        if llm.has_valid_api_key() {
            "ok"
        } else {
            "missing"
        }
    );

    if llm.provider != LlmProvider::Local {
        return Ok(());
    }

    let generator = HttpTextGenerator::new(llm).context("failed to create model client")?;
    match generator.check_local_status().await {
        Ok(status) if status.online() => println!(
            "Server:          online, model {}",
            if status.model_loaded {
                "loaded"
            } else {
                "not loaded"
            }
        ),
        Ok(status) => println!("Server:          responded with status '{}'", status.status),
        Err(e) => println!("Server:          unreachable ({})", e),
    }
    Ok(())
}
