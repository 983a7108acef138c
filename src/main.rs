use anyhow::{Context, Result};
use catalogrs::core::TerminalPrompter;
use catalogrs::{AppError, Settings, run_check, run_format, run_stats, run_update};
use clap::{Parser, Subcommand};
use console::Term;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalogrs", version, about = "CLI for curating an image catalog")]
struct Cli {
    /// Catalog file
    #[arg(long, value_name = "FILE", env = "CATALOGRS_DATA", default_value = "data.json", global = true)]
    data: PathBuf,

    /// Directory holding the images
    #[arg(long, value_name = "DIR", env = "CATALOGRS_IMAGES", default_value = "images", global = true)]
    images: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Classify new images and rewrite the catalog (default)
    Update,

    /// Report new, missing and duplicate images without prompting
    Check,

    /// Rewrite the catalog in normalized form
    Format,

    /// Summarize the catalog
    Stats,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Ctrl-C outside a prompt (hashing, between questions) ends the run the
/// same way as inside one: exit 0, nothing persisted.
fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        let _ = Term::stdout().show_cursor();
        println!();
        std::process::exit(0);
    })
    .context("Failed to install Ctrl-C handler")
}

fn main() -> Result<()> {
    install_interrupt_handler()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings {
        data_file: cli.data,
        images_dir: cli.images,
    };
    let command = cli.command.unwrap_or(Commands::Update);
    tracing::debug!(?command, ?settings, "starting");

    let result: Result<(), AppError> = match command {
        Commands::Update => run_update(&settings, &mut TerminalPrompter::new()).map(drop),
        Commands::Check => run_check(&settings).map(drop),
        Commands::Format => run_format(&settings).map(drop),
        Commands::Stats => run_stats(&settings).map(drop),
    };

    match result {
        // Ctrl-C while prompting: leave quietly, the catalog is untouched.
        Err(err) if err.is_interrupt() => {
            let _ = Term::stdout().show_cursor();
            println!();
            Ok(())
        }
        other => other.with_context(|| format!("catalogrs {:?} failed", command)),
    }
}
