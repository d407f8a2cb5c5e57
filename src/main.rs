use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use authorship::classifier::{Detector, LinearClassifier};
use authorship::config::Config;
use authorship::extract::Upload;
use authorship::output::terminal;
use authorship::pipeline::Submission;
use authorship::validate::validate;
use authorship::web::{self, AppState};

/// Authorship: tell AI-generated text from human writing.
///
/// Serves a single /predict endpoint that accepts .txt, .docx and .pptx
/// uploads or raw text, throttled per client.
#[derive(Parser)]
#[command(name = "authorship", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (the default when no command is given)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (overrides AUTHORSHIP_BIND)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Classify a local document or a piece of text
    Classify {
        /// A .txt, .docx or .pptx file
        #[arg(required_unless_present = "text", conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Raw text to classify instead of a file
        #[arg(long)]
        text: Option<String>,
    },

    /// Load the model artifact and show its classes and feature count
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("authorship=info,tower_http=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        bind: None,
    }) {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }

            let classifier = LinearClassifier::load(&config.model_dir, &config.ai_label)?;
            info!(
                threshold = config.threshold,
                rate_limit = config.rate_limit,
                rate_window_secs = config.rate_window.as_secs(),
                "Starting server"
            );

            web::run_server(AppState::new(config, Arc::new(classifier))).await?;
        }

        Commands::Classify { file, text } => {
            let classifier = LinearClassifier::load(&config.model_dir, &config.ai_label)?;
            let detector = Detector::new(Arc::new(classifier), config.threshold);

            let (submission, source) = match file {
                Some(path) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let filename = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    (
                        Submission::from_file(Upload::new(filename, bytes)),
                        path.display().to_string(),
                    )
                }
                None => (
                    Submission::from_text(text.unwrap_or_default()),
                    "text".to_string(),
                ),
            };

            let (text, _) = submission.resolve()?;
            validate(&text, &config.limits())?;
            let result = detector.classify(&text).await?;

            terminal::display_classification(&source, &text, &result, detector.threshold());
        }

        Commands::Inspect => {
            let classifier = LinearClassifier::load(&config.model_dir, &config.ai_label)?;
            terminal::display_model_summary(&classifier, &config.ai_label);
        }
    }

    Ok(())
}
