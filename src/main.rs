use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use gatekeep::config::{self, Config, ScorerBackend};
use gatekeep::moderation::Moderator;
use gatekeep::toxicity::traits::{ToxicityScorer, UnavailableScorer};

/// Gatekeep: removes toxic and spam messages from Telegram chats.
#[derive(Parser)]
#[command(name = "gatekeep", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot
    Run,

    /// Evaluate a piece of text and print the verdict
    Check {
        /// The text to evaluate
        text: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Skip the toxicity model and only apply spam patterns
        #[arg(long)]
        patterns_only: bool,
    },

    /// Download the ONNX toxicity model (~126 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = std::env::var("LOG_LEVEL").ok();
                tracing_subscriber::EnvFilter::new(config::log_filter(level.as_deref()))
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = Config::load()?;
            config.require_telegram()?;
            config.require_scorer()?;

            let policy = config.policy()?;
            let scorer = create_scorer(&config)?;
            let moderator = Moderator::new(policy, scorer)?;

            info!(
                threshold = moderator.policy().toxicity_threshold,
                patterns = moderator.policy().spam_patterns.len(),
                admin_alerts = config.admin_chat_id.is_some(),
                "Moderation policy loaded"
            );

            let bot = teloxide::Bot::new(config.telegram_bot_token.clone());
            gatekeep::telegram::run(bot, moderator, config.admin_chat_id).await;
        }

        Commands::Check {
            text,
            json,
            patterns_only,
        } => {
            let config = Config::load()?;
            let policy = config.policy()?;

            let scorer: Arc<dyn ToxicityScorer> = if patterns_only {
                Arc::new(UnavailableScorer)
            } else {
                config.require_scorer()?;
                create_scorer(&config)?
            };

            let moderator = Moderator::new(policy, scorer)?;
            let evaluation = moderator.evaluate(&text).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation.result)?);
            } else {
                gatekeep::output::terminal::display_evaluation(
                    &text,
                    moderator.policy(),
                    &evaluation,
                );
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX model...");
            println!("  Destination: {}", model_dir.display());

            gatekeep::toxicity::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `gatekeep run` or `gatekeep check \"some text\"`.");
        }
    }

    Ok(())
}

/// Build the configured toxicity scorer.
fn create_scorer(config: &Config) -> Result<Arc<dyn ToxicityScorer>> {
    match config.scorer_backend {
        ScorerBackend::Onnx => {
            info!("Using local ONNX toxicity scorer");
            let scorer = gatekeep::toxicity::onnx::OnnxToxicityScorer::load(&config.model_dir)?;
            Ok(Arc::new(scorer))
        }
        ScorerBackend::Perspective => {
            info!("Using Perspective API toxicity scorer");
            let scorer = gatekeep::toxicity::perspective::PerspectiveScorer::new(
                config.perspective_api_key.clone(),
            );
            Ok(Arc::new(scorer))
        }
    }
}
