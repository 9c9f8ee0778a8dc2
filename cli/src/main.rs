mod output;
mod terminal;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodscan_core::view::EntranceAnimation;
use foodscan_core::{
    ApiClientBuilder, FoodscanConfig, LineScanner, ProductView, ScanController, ScanOptions,
    ScanReport, ScanState,
};
use tracing_subscriber::EnvFilter;

use crate::terminal::{NullView, TerminalView};

#[derive(Parser)]
#[command(name = "foodscan", version)]
#[command(about = "Look up scanned barcodes on Open Food Facts", long_about = None)]
struct Cli {
    /// Product API base URL (overrides FOODSCAN_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print each result as a JSON line instead of the product card
    #[arg(long, global = true)]
    json: bool,

    /// Print the card without the slide-in animation
    #[arg(long, global = true)]
    no_animate: bool,

    /// Save each product image (or the placeholder) as {code}.png in this directory
    #[arg(long, global = true)]
    image_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read barcodes from a hand scanner or stdin until an empty line or EOF
    Scan {
        /// Disable the terminal bell after each successful read
        #[arg(long)]
        no_beep: bool,

        /// Prompt shown before each read
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Look up a single barcode
    Lookup {
        /// Barcode, e.g. 3017620422003
        code: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = FoodscanConfig::from_env().context("invalid FOODSCAN_* configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.api_base_url = base_url.clone();
    }

    let client = ApiClientBuilder::from_config(&config)
        .build()
        .context("failed to build HTTP client")?;

    let view: Arc<dyn ProductView> = if cli.json {
        Arc::new(NullView)
    } else {
        let animate = !cli.no_animate && std::io::stdout().is_terminal();
        Arc::new(TerminalView::new(
            std::io::stdout(),
            animate.then(EntranceAnimation::default),
        ))
    };

    let controller = ScanController::new(Arc::new(client), &config, view);

    let code = match &cli.command {
        Commands::Scan { no_beep, prompt } => {
            let mut options = ScanOptions {
                beep_enabled: !no_beep,
                ..ScanOptions::default()
            };
            if let Some(prompt) = prompt {
                options.prompt = prompt.clone();
            }
            scan_loop(&cli, &controller, &options).await?;
            ExitCode::SUCCESS
        }
        Commands::Lookup { code } => {
            let report = controller.lookup(code).await;
            finish(&cli, &report)?;
            if report.outcome() == ScanState::FetchError {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    };

    controller.shutdown();
    Ok(code)
}

async fn scan_loop(cli: &Cli, controller: &ScanController, options: &ScanOptions) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    // Prompt goes to stderr so stdout stays clean for --json.
    let mut scanner = LineScanner::new(stdin, tokio::io::stderr());

    loop {
        let report = controller
            .scan(&mut scanner, options)
            .await
            .context("failed to read from scanner")?;

        if report.outcome() == ScanState::Cancelled {
            if cli.json {
                println!("{}", output::report_json(&report));
            }
            return Ok(());
        }

        finish(cli, &report)?;
    }
}

fn finish(cli: &Cli, report: &ScanReport) -> Result<()> {
    if cli.json {
        println!("{}", output::report_json(report));
    }
    if let Some(dir) = &cli.image_dir {
        output::save_image(dir, report)?;
    }
    Ok(())
}
