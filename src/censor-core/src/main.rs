//! Censor - blacks out chosen words on photos
//!
//! Runs the Telegram bot, or redacts a single local image from the command line.

use anyhow::{bail, Context, Result};
use censor_bot::{Bot, BotState};
use censor_core::colored_logger::{init_component_logger, Component, LogOptions};
use censor_core::config::Config;
use censor_engine::{replies, Dialogue, MemoryStore, RedactionResult, Workspace};
use censor_ocr::Detector;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "censor")]
#[command(about = "Black out chosen words on photos using OCR")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot
    Run {
        /// Directory for transient per-user images
        #[arg(short, long)]
        images_dir: Option<PathBuf>,
    },

    /// Redact a local image once and exit
    Redact {
        /// Image to redact
        image: PathBuf,

        /// Phrase whose on-image words should be blacked out
        phrase: String,

        /// Output file (defaults to <name>.censored.jpg next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check configuration and OCR service reachability
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine
    dotenvy::dotenv().ok();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let component = match cli.command {
        Commands::Run { .. } => Component::Bot,
        Commands::Redact { .. } => Component::Redact,
        Commands::Check => Component::Main,
    };
    let config_path = Config::locate(cli.config.as_deref());
    let config = Config::load(config_path.as_deref())?;

    let log_options = LogOptions {
        level,
        file: config.logging.file.clone(),
    };
    init_component_logger(component, &log_options)?;

    match &config_path {
        Some(path) => info!("config loaded from {:?}", path),
        None => debug!("no config file, using defaults"),
    }

    match cli.command {
        Commands::Run { images_dir } => {
            cmd_run(config, images_dir)?;
        }
        Commands::Redact { image, phrase, output } => {
            cmd_redact(config, image, phrase, output)?;
        }
        Commands::Check => {
            cmd_check(config)?;
        }
    }

    Ok(())
}

fn cmd_run(config: Config, images_dir: Option<PathBuf>) -> Result<()> {
    let token = config
        .resolve_token()
        .context("no bot token: set [bot].token in the config, or TOKEN / TELOXIDE_TOKEN")?;

    let images_dir = images_dir.unwrap_or_else(|| config.storage.images_dir.clone());
    std::fs::create_dir_all(&images_dir)
        .with_context(|| format!("failed to create images directory {:?}", images_dir))?;

    info!("starting censor bot");
    info!("images directory: {:?}", images_dir);
    info!("OCR service: {} ({})", config.ocr.endpoint, config.ocr.languages.join(", "));

    // One recognizer for the whole process, shared read-only by every session
    let detector: Arc<dyn Detector> =
        Arc::new(censor_ocr::create_processor_with_config(&config.engine_config())?);

    let dialogue = Dialogue::new(
        Arc::new(MemoryStore::new()),
        Arc::clone(&detector),
        config.redactor(),
        Workspace::new(images_dir),
    );
    let state = BotState::new(Arc::new(dialogue), config.wait_animation()?)
        .with_session_timeout(config.session_timeout());

    serve_bot(token, state)?;

    // The blocking HTTP client must be dropped outside the async runtime
    drop(detector);

    info!("censor bot stopped");
    Ok(())
}

#[tokio::main]
async fn serve_bot(token: String, state: BotState) -> Result<()> {
    censor_bot::serve(Bot::new(token), state).await
}

fn cmd_redact(config: Config, image: PathBuf, phrase: String, output: Option<PathBuf>) -> Result<()> {
    if phrase.trim().is_empty() {
        bail!("phrase is empty");
    }

    let processor = censor_ocr::create_processor_with_config(&config.engine_config())?;
    let source = censor_engine::decode_image(&image)?;

    info!("reading text from {:?}", image);
    let detections = processor.detect(&source)?;
    info!("found {} text regions", detections.len());

    match config.redactor().redact(&source, &detections, &phrase) {
        RedactionResult::Redacted(redacted) => {
            let output = output.unwrap_or_else(|| default_output(&image));
            redacted
                .save(&output)
                .with_context(|| format!("failed to write {:?}", output))?;
            println!("{}", output.display());
        }
        RedactionResult::NoMatch(found) => {
            println!("{}", replies::inventory(&found));
        }
    }

    Ok(())
}

fn cmd_check(config: Config) -> Result<()> {
    println!("checking configuration...\n");

    let token_ok = config.resolve_token().is_some();
    println!("  bot token:  {}", if token_ok { "OK" } else { "NOT SET" });

    let animation_ok = config.wait_animation().is_ok();
    println!("  animation:  {}", if animation_ok { "OK" } else { "INVALID URL" });

    println!("  images dir: {}", config.storage.images_dir.display());

    let processor = censor_ocr::create_processor_with_config(&config.engine_config())?;
    let ocr_ok = match processor.engine().ping() {
        Ok(()) => true,
        Err(e) => {
            println!("  ocr error:  {}", e);
            false
        }
    };
    println!(
        "  ocr:        {} ({})",
        if ocr_ok { "OK" } else { "UNREACHABLE" },
        processor.engine().endpoint()
    );

    println!();

    if !token_ok {
        println!("WARNING: a Telegram bot token is required to run the bot.");
        println!("Set [bot].token in the config file, or TOKEN in the environment / .env.");
    }
    if !ocr_ok {
        println!("WARNING: the OCR service must be running for redaction to work.");
    }
    if token_ok && animation_ok && ocr_ok {
        println!("all checks passed!");
    }

    Ok(())
}

/// `photo.jpg` -> `photo.censored.jpg`
fn default_output(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    image.with_file_name(format!("{}.censored.jpg", stem))
}
