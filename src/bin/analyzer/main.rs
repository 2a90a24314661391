//! Contest Analyzer CLI
//!
//! Command-line interface for tracking audit-contest judging.

mod commands;
mod crash;
mod progress;
mod render;
mod style;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::code4rena::Code4renaArgs;
use commands::sherlock::SherlockArgs;
use contest_analyzer::Environment;
use style::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "contest-analyzer")]
#[command(author = "CortexLM")]
#[command(version)]
#[command(about = "Contest Analyzer - Estimate audit-contest rewards as judging happens", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a config.toml overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Sherlock contest
    #[command(visible_alias = "s")]
    Sherlock {
        /// Contest ID (visible in the contest URL)
        contest_id: u64,

        /// Show escalation columns and escalated invalid issues
        #[arg(short, long)]
        escalations: bool,

        /// Fetch discussion comments for every issue (one request per issue)
        #[arg(short, long)]
        comments: bool,

        /// Seconds between refreshes; runs once when omitted
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Prize pool (USD) to use instead of the contest's
        #[arg(short, long)]
        prize_pool: Option<f64>,

        /// Highlight your own findings when stdout is a terminal
        #[arg(long)]
        highlight_mine: bool,
    },

    /// Analyze a Code4rena contest
    #[command(visible_alias = "c4")]
    Code4rena {
        /// Contest slug (visible in the audit URL)
        contest_id: String,

        /// High/medium prize pool (USD); rewards are $0 when omitted
        #[arg(short, long)]
        prize_pool: Option<f64>,

        /// Your Code4rena handle
        #[arg(short, long, env = "CODE4RENA_HANDLE")]
        user: Option<String>,

        /// Seconds between refreshes; runs once when omitted
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Include invalid findings in the table
        #[arg(long)]
        include_invalid: bool,

        /// Trim finding titles to this width
        #[arg(long, default_value = "70")]
        max_title: usize,

        /// Highlight your own findings when stdout is a terminal
        #[arg(long)]
        highlight_mine: bool,
    },
}

fn init_tracing(verbose: bool, crash_reporting: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(crash_reporting.then(crash::tracing_layer))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let env = Environment::load();
    let crash_guard = crash::init(env.sentry_dsn.as_deref());
    init_tracing(cli.verbose, crash_guard.is_some());

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Sherlock {
            contest_id,
            escalations,
            comments,
            timeout,
            prize_pool,
            highlight_mine,
        } => {
            commands::sherlock::run(
                &env,
                config,
                SherlockArgs {
                    contest_id,
                    escalations,
                    comments,
                    timeout,
                    prize_pool,
                    highlight_mine,
                },
            )
            .await
        }
        Commands::Code4rena {
            contest_id,
            prize_pool,
            user,
            timeout,
            include_invalid,
            max_title,
            highlight_mine,
        } => {
            commands::code4rena::run(
                &env,
                config,
                Code4renaArgs {
                    contest_id,
                    prize_pool,
                    user,
                    timeout,
                    include_invalid,
                    max_title,
                    highlight_mine,
                },
            )
            .await
        }
    };

    if let Err(e) = result {
        let message = format!("{:#}", e);
        print_error(&message);
        if let Some(guard) = &crash_guard {
            crash::report_fatal(guard, &message);
        }
        std::process::exit(1);
    }
}
