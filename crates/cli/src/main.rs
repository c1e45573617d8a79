//! dialform CLI — the main entry point.
//!
//! Commands:
//! - `fill`   — Run a conversational form-filling session
//! - `forms`  — List available form templates

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "dialform",
    about = "dialform — conversational form filling over an LLM",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a form in an interactive dialog
    Fill {
        /// Id of the form template to fill; prompts interactively when absent
        #[arg(short, long)]
        form: Option<String>,
    },

    /// List available form templates
    Forms,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Fill { form } => commands::fill::run(form).await?,
        Commands::Forms => commands::forms_cmd::run()?,
    }

    Ok(())
}
