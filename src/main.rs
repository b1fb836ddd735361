//! Pagebrief CLI - webpage summarisation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{Parser, Subcommand};
use colored::Colorize;
use pagebrief::batch::{parse_url_list, BatchObserver};
use pagebrief::{logging, Config, ExportFormat, SummaryApp, SummaryResult, SummaryType};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "pagebrief")]
#[command(author, version, about = "Summarise webpages with an LLM", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to pagebrief.toml in cwd or ~/.config/pagebrief)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise a webpage by URL
    Summarise {
        /// URL to summarise
        url: String,
        /// Summary style: short, detailed or bullet
        #[arg(short = 't', long = "type", default_value_t = SummaryType::Short)]
        summary_type: SummaryType,
        /// Print the history export in this format afterwards
        #[arg(long)]
        export: Option<ExportFormat>,
    },
    /// Summarise several webpages
    Batch {
        /// URLs to summarise
        urls: Vec<String>,
        /// File with one URL per line
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Summary style: short, detailed or bullet
        #[arg(short = 't', long = "type", default_value_t = SummaryType::Short)]
        summary_type: SummaryType,
        /// Print the history export in this format afterwards
        #[arg(long)]
        export: Option<ExportFormat>,
    },
}

/// Prints one line per finished batch item
struct ConsoleProgress;

impl BatchObserver for ConsoleProgress {
    fn item_finished(&self, _index: usize, result: &SummaryResult, completed: usize, total: usize) {
        let mark = if result.is_success() {
            "✓".green()
        } else {
            "✗".red()
        };
        eprintln!("[{completed}/{total}] {mark} {}", result.url());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("warn");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Err(e) = config.api_key() {
        eprintln!("{} {}", "Warning:".yellow(), e);
    }
    let app = SummaryApp::from_config(&config)?;

    match cli.command {
        Commands::Summarise {
            url,
            summary_type,
            export,
        } => {
            println!("Fetching: {}", url);
            let result = app.summarize(&url, summary_type).await;
            print_result(&result);
            if let Some(format) = export {
                println!("{}", app.history().export(format)?);
            }
        }
        Commands::Batch {
            mut urls,
            file,
            summary_type,
            export,
        } => {
            if let Some(path) = file {
                let content = std::fs::read_to_string(&path)?;
                urls.extend(parse_url_list(&content));
            }
            if urls.is_empty() {
                anyhow::bail!("no URLs given; pass them as arguments or with --file");
            }

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Cancelling, waiting for running items to finish...");
                    on_ctrl_c.cancel();
                }
            });

            let results = app
                .summarize_batch(&urls, summary_type, &cancel, &ConsoleProgress)
                .await;
            for result in &results {
                println!("{}", "-".repeat(60).dimmed());
                print_result(result);
            }
            if let Some(format) = export {
                println!("{}", app.history().export(format)?);
            }
        }
    }

    Ok(())
}

fn print_result(result: &SummaryResult) {
    println!("=== {} ===", result.title().unwrap_or("No title").bold());
    println!("{}\n", result.url().dimmed());

    if let Some(text) = result.summary_text() {
        println!("{}\n", text);
    }
    if let Some(error) = result.error() {
        println!("{} [{}] {}\n", "Error:".red().bold(), error.kind_label(), error);
    }

    if let Some(favicon) = result.favicon() {
        println!("🔖 Favicon: {}", favicon);
    }
    for image in result.images() {
        println!("🖼️  {}", image.url);
    }
}
