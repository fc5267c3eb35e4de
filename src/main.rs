use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use maverick::attachment::{Attachment, PdfExtractor, TextExtractor, compose};
use maverick::config::{API_KEY_ENV, Config};
use maverick::conversation::{Conversation, SendOutcome};
use maverick::error::UpstreamError;
use maverick::llm::GeminiClient;
use maverick::ui::render::{render_nodes, to_plain_text};
use maverick::{app, formatter, logging};

#[derive(Parser)]
#[command(name = "maverick")]
#[command(version = "0.1.0")]
#[command(about = "Chat with Google Gemini from the terminal", long_about = None)]
struct Cli {
    /// Increase log detail (-v, -vv, -vvv); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Model to use instead of the configured one
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask {
        prompt: String,
        /// PDF whose text is attached to the message
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Print the text extracted from a PDF
    Extract { path: PathBuf },
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    let _log_guard = logging::init(&config.log_dir(), cli.verbose)?;

    match cli.command {
        // maverick with no args = interactive chat
        None => app::run(config).await,
        Some(Commands::Ask { prompt, pdf }) => ask(config, &prompt, pdf).await,
        Some(Commands::Extract { path }) => extract(path).await,
        Some(Commands::Config { init }) => show_config(&config, init),
    }
}

async fn ask(config: Config, prompt: &str, pdf: Option<PathBuf>) -> Result<()> {
    if !config.has_api_key() {
        bail!(UpstreamError::MissingApiKey);
    }

    let attachment = match pdf {
        Some(path) => Some(
            tokio::task::spawn_blocking(move || Attachment::load(&PdfExtractor, &path))
                .await
                .context("PDF extraction task failed")??,
        ),
        None => None,
    };

    let outgoing = compose(prompt, attachment.as_ref());
    outgoing.validate()?;

    let client = GeminiClient::new(config)?;
    let mut conversation = Conversation::new();
    if conversation
        .send(&client, &outgoing.display, &outgoing.api)
        .await?
        == SendOutcome::Rejected
    {
        bail!("message was not sent");
    }

    let reply = conversation
        .messages()
        .last()
        .map(|message| message.display_content())
        .unwrap_or_default();
    println!("{}", to_plain_text(&render_nodes(&formatter::format(reply))));

    Ok(())
}

async fn extract(path: PathBuf) -> Result<()> {
    let text = tokio::task::spawn_blocking(move || PdfExtractor.extract_text(&path))
        .await
        .context("PDF extraction task failed")??;
    println!("{text}");
    Ok(())
}

fn show_config(config: &Config, init: bool) -> Result<()> {
    let path = config.config_path();

    if init {
        if config.init_default()? {
            println!("✅ Wrote default config to {}", path.display());
        } else {
            println!("⚙️  Config already exists: {}", path.display());
        }
    }

    println!("📁 Config file: {}", display_path(&path));
    println!("🪵 Log file:    {}", config.log_dir().join("maverick.log").display());

    let key_source = match (&config.api_key, config.has_api_key()) {
        (Some(key), true) if !key.trim().is_empty() => "config.toml",
        (_, true) => API_KEY_ENV,
        (_, false) => "not set",
    };
    println!("🔑 API key:     {key_source}\n");

    let mut shown = config.clone();
    if shown.api_key.is_some() {
        shown.api_key = Some("[REDACTED]".to_string());
    }
    print!(
        "{}",
        toml::to_string_pretty(&shown).context("Failed to serialize config")?
    );

    Ok(())
}

fn display_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not created, using defaults)", path.display())
    }
}
