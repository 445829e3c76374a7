//! CLI binary for pdf2quiz.
//!
//! A thin shim over the library crate: `serve` starts the HTTP endpoint,
//! `predict` runs the pipeline over local PDF files and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf2quiz::{predict_files, resolve_model, PredictionConfig};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the HTTP endpoint on the default port
  pdf2quiz serve

  # Serve on a specific address with a dedicated upload directory
  pdf2quiz serve --addr 0.0.0.0:8080 --upload-dir /var/tmp/pdf2quiz

  # Predict questions from local past papers, no HTTP involved
  pdf2quiz predict 2023_summer.pdf 2024_summer.pdf

  # Use a specific model
  pdf2quiz --model models/gemini-1.5-pro predict paper.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   API key for the Gemini generateContent endpoint
  GEMINI_MODEL     Model ID override (default: models/gemini-1.5-flash)

SETUP:
  1. Set API key:   export GEMINI_API_KEY=...
  2. Serve:         pdf2quiz serve
  3. Upload:        curl -F "files=@paper.pdf;type=application/pdf" \
                        http://127.0.0.1:3000/api/predict
"#;

/// Predict likely exam questions from PDF past papers using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Predict likely exam questions from PDF past papers using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Model ID (e.g. models/gemini-1.5-flash).
    #[arg(long, global = true, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// API key for the model provider.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-call model deadline in seconds.
    #[arg(long, global = true, default_value_t = 120)]
    api_timeout: u64,

    /// Retries on transient model failures.
    #[arg(long, global = true, default_value_t = 2)]
    max_retries: u32,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP prediction endpoint.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Directory for temporary uploads (created if missing).
        #[arg(long, default_value = "tmp_uploads")]
        upload_dir: PathBuf,

        /// Whole-request upload ceiling in MiB.
        #[arg(long, default_value_t = 50)]
        max_upload_mib: u64,
    },

    /// Predict questions from local PDF files and print them.
    Predict {
        /// One or more PDF files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the raw JSON response instead of formatted text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut builder = PredictionConfig::builder()
        .api_timeout_secs(cli.api_timeout)
        .max_retries(cli.max_retries);
    if let Some(model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(key) = cli.api_key {
        builder = builder.api_key(key);
    }

    match cli.command {
        Command::Serve {
            addr,
            upload_dir,
            max_upload_mib,
        } => {
            let config = builder
                .upload_dir(upload_dir)
                .max_body_bytes(max_upload_mib * 1024 * 1024)
                .build()
                .context("Invalid configuration")?;
            pdf2quiz::server::serve(config, addr)
                .await
                .context("Server failed")?;
        }

        Command::Predict { files, json } => {
            let config = builder.build().context("Invalid configuration")?;
            let model = resolve_model(&config).context("No model available")?;
            let output = predict_files(&files, &config, model.as_ref())
                .await
                .context("Prediction failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                eprintln!(
                    "{} question(s) predicted from {} file(s) in {} ms",
                    output.questions.len(),
                    output.stats.files,
                    output.stats.total_duration_ms
                );
                for q in &output.questions {
                    println!("{}. {}", q.id, q.text);
                    if let Some(table) = &q.data_table {
                        println!("{table}");
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}
