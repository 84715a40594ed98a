mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradescope-report")]
#[command(about = "Build Gradescope results documents from test annotations and outcomes", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a run and write the results document
    Report {
        /// Declarations document (per-test annotations)
        #[arg(short, long)]
        declarations: Option<PathBuf>,

        /// Outcome list produced by the test execution engine
        #[arg(short = 'i', long)]
        outcomes: PathBuf,

        /// Results document path (defaults to $GRADESCOPE_RESULTS_PATH or results.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print indent width
        #[arg(long)]
        indent: Option<usize>,
    },

    /// Validate a declarations document without running anything
    Check {
        /// Declarations document (per-test annotations)
        #[arg(short, long)]
        declarations: PathBuf,
    },

    /// Print a written results document as a table
    Summary {
        /// Results document path
        #[arg(default_value = "results.json")]
        results: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Report {
            declarations,
            outcomes,
            output,
            indent,
        } => {
            commands::report(declarations.as_deref(), &outcomes, output, indent).await?;
        }
        Commands::Check { declarations } => {
            commands::check(&declarations).await?;
        }
        Commands::Summary { results } => {
            commands::summary(&results).await?;
        }
    }

    Ok(())
}
