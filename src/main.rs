//! tn3270wright CLI - 3270 automation from the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tn3270wright::prelude::*;
use tn3270wright::runner::{RunStepsOptions, run_steps};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tn3270wright")]
#[command(author, version, about = "Scriptable TN3270 automation through s3270")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a YAML/JSON steps file
    Run {
        /// Path to the steps file
        file: PathBuf,

        /// Write trace.json with per-step timings
        #[arg(long)]
        trace: bool,
    },

    /// Connect to a host and print its first screen
    Screen {
        /// Host name or address
        #[arg(long)]
        host: String,

        /// TCP port
        #[arg(long, default_value = "23")]
        port: i64,

        /// Wait for this text to appear before capturing
        #[arg(long)]
        wait_for: Option<String>,

        /// Timeout in seconds for connect and wait conditions
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Also write the screen to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Bordered,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "bordered" | "box" => Ok(OutputFormat::Bordered),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown format: {}. Use text, bordered, or json",
                s
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, trace } => run_steps(&file, RunStepsOptions { trace }).await?,
        Commands::Screen {
            host,
            port,
            wait_for,
            timeout,
            format,
            output,
        } => capture_screen(&host, port, wait_for, timeout, format, output).await?,
    }

    Ok(())
}

async fn capture_screen(
    host: &str,
    port: i64,
    wait_for: Option<String>,
    timeout: u64,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let tn = Client::builder()
        .timeout(Duration::from_secs(timeout))
        .build();

    let cancel = tn.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = async {
        tn.connect(host, port, i64::try_from(timeout).ok()).await?;
        tn.wait_for_field(Some(timeout)).await?;

        if let Some(text) = wait_for {
            tn.wait_for_text(&text, None).await?;
        }

        let screen = tn.screen().await?;
        match format {
            OutputFormat::Text => println!("{}", screen.text()),
            OutputFormat::Bordered => println!("{}", screen.to_bordered()),
            OutputFormat::Json => println!("{}", screen.to_json()?),
        }

        if let Some(path) = output {
            tn.screenshot(&path).await?;
            eprintln!("Screen saved to: {}", path.display());
        }
        Ok::<(), Tn3270Error>(())
    }
    .await;

    tn.disconnect().await?;
    tn.teardown().await;
    result
}
