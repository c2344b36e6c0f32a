//! rollcall-analyze - attendance analysis from the command line
//!
//! Runs the local analysis (statistics, weekday patterns, summary) or sends it
//! to the configured text-generation service, and exports or reviews results.

mod common;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rollcall_core::export::{read_analysis, AnalysisExport};
use rollcall_core::prompt::build_export_review_prompt;
use rollcall_core::{
    run_local_analysis, AnalysisKind, AnalysisResult, Analyzer, HttpTextGenerator,
    LocalAnalysis, SyncClient, TextGenerator,
};

use crate::common::{print_json, print_statistics, today, Env, Format};

#[derive(Parser)]
#[command(name = "rollcall-analyze")]
#[command(about = "Analyze attendance locally or with a language model")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Statistics, weekday patterns and summary, without any network access
    Local {
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Also write an analysis export (default name if no path is given)
        #[arg(long)]
        export: Option<Option<PathBuf>>,

        /// Include the per-student table
        #[arg(short, long)]
        verbose: bool,
    },

    /// Local analysis plus interpretation by the configured model
    Ai {
        /// attendance-patterns, student-risk or improvement-suggestions
        #[arg(short, long, default_value = "attendance-patterns", conflicts_with = "prompt")]
        kind: AnalysisKind,

        /// Free-form instruction sent instead of a built-in prompt
        #[arg(short, long)]
        prompt: Option<String>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Also write an analysis export (default name if no path is given)
        #[arg(long)]
        export: Option<Option<PathBuf>>,
    },

    /// Show a previously exported analysis
    Review {
        file: PathBuf,

        /// Ask the model for a follow-up review of the export
        #[arg(long)]
        ai: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = Env::open("rollcall-analyze")?;

    match args.command {
        Command::Local {
            format,
            export,
            verbose,
        } => cmd_local(&env, format, export, verbose),
        Command::Ai {
            kind,
            prompt,
            format,
            export,
        } => {
            let kind = match prompt {
                Some(instruction) => AnalysisKind::Custom(instruction),
                None => kind,
            };
            cmd_ai(&env, kind, format, export).await
        }
        Command::Review { file, ai } => cmd_review(&env, &file, ai).await,
    }
}

fn cmd_local(
    env: &Env,
    format: Format,
    export: Option<Option<PathBuf>>,
    verbose: bool,
) -> Result<()> {
    let store = env.load_store()?;
    let result = run_local_analysis(&store.students, &store.attendance)
        .context("local analysis failed")?;

    match format {
        Format::Json => print_json(&result.local_analysis)?,
        Format::Text => {
            if verbose && !result.statistics.is_empty() {
                print_statistics(&result.statistics);
                println!();
            }
            print_local_analysis(&result.local_analysis);
        }
    }

    write_export(&result, export)
}

/// Generator for the configured provider; refuses to run without a usable key.
fn build_generator(env: &Env) -> Result<HttpTextGenerator> {
    let llm = &env.config.llm;
    if !llm.has_valid_api_key() {
        anyhow::bail!(
            "no API key for provider '{}'; set llm.api_key in {} or {}",
            llm.provider.as_str(),
            rollcall_core::Config::config_path().display(),
            llm.provider.api_key_env().unwrap_or("the provider env var")
        );
    }
    HttpTextGenerator::new(llm).context("failed to create model client")
}

async fn cmd_ai(
    env: &Env,
    kind: AnalysisKind,
    format: Format,
    export: Option<Option<PathBuf>>,
) -> Result<()> {
    let generator = build_generator(env)?;
    let sink = if env.config.sync.is_ready() {
        Some(SyncClient::new(&env.config.sync).context("failed to create sync client")?)
    } else {
        None
    };
    let analyzer = Analyzer::with_sink(generator, sink);

    let store = env.load_store()?;
    if format == Format::Text {
        println!("Running {} analysis with {}...", kind.as_str(), env.config.llm.provider.as_str());
        println!();
    }

    let outcome = analyzer
        .run_ai_analysis(&store.students, &store.attendance, &kind)
        .await;

    // Forwarding runs in the background; let it finish before the runtime stops.
    analyzer.flush_sync().await;

    let result = outcome.context("AI analysis failed")?;

    match format {
        Format::Json => print_json(&AnalysisExport::from_result(&result, Utc::now()))?,
        Format::Text => {
            print_local_analysis(&result.local_analysis);
            println!();
            println!("AI Analysis");
            println!("===========");
            println!("{}", result.generated_text.as_deref().unwrap_or_default());
        }
    }

    write_export(&result, export)
}

async fn cmd_review(env: &Env, file: &Path, ai: bool) -> Result<()> {
    let imported =
        read_analysis(file).with_context(|| format!("failed to import {}", file.display()))?;
    let export = &imported.export;

    println!("Analysis exported {}", export.metadata.export_date.to_rfc3339());
    println!("Students: {}", export.raw_data.student_count);
    println!();
    print_local_analysis(imported.local_analysis());

    if let Some(text) = imported.ai_result() {
        println!();
        println!("AI Analysis");
        println!("===========");
        println!("{}", text);
    }

    if ai {
        let generator = build_generator(env)?;
        let prompt = build_export_review_prompt(export);
        let review = generator
            .generate(&prompt)
            .await
            .context("review request failed")?;
        println!();
        println!("Follow-up Review");
        println!("================");
        println!("{}", review);
    }
    Ok(())
}

fn print_local_analysis(local: &LocalAnalysis) {
    println!("Summary");
    println!("=======");
    println!("{}", local.summary);

    if !local.worst_attendance.is_empty() {
        println!();
        println!("Lowest attendance:");
        for s in &local.worst_attendance {
            println!("  {:<20} class {:<6} {:>3}%", s.name, s.class, s.attendance_rate);
        }
    }

    if !local.frequent_lateness.is_empty() {
        println!();
        println!("Frequently late:");
        for s in &local.frequent_lateness {
            println!("  {:<20} class {:<6} {:>3} times", s.name, s.class, s.late_count);
        }
    }

    if !local.patterns.is_empty() {
        println!();
        println!("Weekday patterns:");
        for p in &local.patterns {
            println!("  {}", p.message);
        }
    }
}

fn write_export(result: &AnalysisResult, export: Option<Option<PathBuf>>) -> Result<()> {
    let Some(path) = export else {
        return Ok(());
    };
    let path = path.unwrap_or_else(|| PathBuf::from(AnalysisExport::default_file_name(today())));

    AnalysisExport::from_result(result, Utc::now())
        .write_to(&path)
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    eprintln!("Exported analysis to {}", path.display());
    Ok(())
}
