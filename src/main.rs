// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon CLI
 * Probes a chatbot web frontend and reports per-question results
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Result;
use clap::Parser;
use tracing::info;

use botrecon::config::RuntimeConfig;
use botrecon::progress::TracingProgress;
use botrecon::runner::{run_inspection, QuestionOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "botrecon",
    about = "Reverse-engineers how to submit questions to an undocumented chatbot web app"
)]
struct Args {
    /// URL of the target page to examine
    #[arg(long)]
    target_url: String,

    /// Stated purpose of the target application, used for question
    /// templating and as an optional payload field
    #[arg(long, default_value = "")]
    purpose: String,
}

fn print_report(outcomes: &[QuestionOutcome]) {
    println!();
    println!("{:<28} {:<16} {:<24} {:>10}  Answer", "Question", "Status", "Method", "Confidence");
    println!("{}", "-".repeat(110));

    for outcome in outcomes {
        println!(
            "{:<28} {:<16} {:<24} {:>9.0}%  {}",
            outcome.question.id,
            outcome.result.status.to_string(),
            outcome.result.method_label,
            outcome.result.confidence * 100.0,
            outcome.result.answer,
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    print!("\x1b[1m");
    println!("  ___      _   ___");
    println!(" | _ ) ___| |_| _ \\___ __ ___ _ _");
    println!(" | _ \\/ _ \\  _|   / -_) _/ _ \\ ' \\");
    println!(" |___/\\___/\\__|_|_\\___\\__\\___/_||_|");
    print!("\x1b[0m");
    println!();
    println!("        Chatbot Transport Recon - (c) 2026 Bountyy Oy");
    println!();

    let args = Args::parse();
    let config = RuntimeConfig::from_env();
    info!("{}", config.redacted_summary());
    if !config.is_complete() {
        info!("LLM credentials incomplete; running with static analysis only");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let outcomes = runtime.block_on(run_inspection(
        &args.target_url,
        &args.purpose,
        config,
        &[],
        &TracingProgress,
    ))?;

    print_report(&outcomes);
    Ok(())
}
