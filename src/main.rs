use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod app;
mod chat;
mod client;
mod config;
mod handler;
mod particles;
mod tui;
mod ui;

use app::App;
use chat::{ChatMessage, ChatPanel, SubmitSource};
use client::AskClient;
use config::Config;
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "naatu-chat", version)]
#[command(about = "Chat with the Naatu Ruchulu pickle expert from your terminal")]
struct Cli {
    /// Question-answering endpoint (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Number of background particles (overrides config)
    #[arg(long, global = true)]
    particles: Option<usize>,
    /// Log file for the interactive UI (overrides config)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(count) = self.particles {
            config.particle_count = count;
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    cli.apply(&mut config);

    match &cli.command {
        Some(Commands::Ask { question }) => ask_once(&config, question).await,
        Some(Commands::InitConfig) => {
            config.save()?;
            println!("Saved configuration to {}", Config::config_path()?.display());
            Ok(())
        }
        None => run_tui(&config).await,
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_file_logging(config: &Config) -> Result<PathBuf> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}

async fn run_tui(config: &Config) -> Result<()> {
    let log_path = init_file_logging(config)?;
    tracing::info!(log = %log_path.display(), "starting naatu-chat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run_app(&mut terminal, config).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "exiting with error");
    }
    result
}

async fn run_app(terminal: &mut Tui, config: &Config) -> Result<()> {
    let mut app = App::new(config)?;
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        app.chat.poll_reply();
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    Ok(())
}

async fn ask_once(config: &Config, question: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .init();

    let client = match config.request_timeout() {
        Some(timeout) => AskClient::with_timeout(&config.endpoint, timeout)?,
        None => AskClient::new(&config.endpoint),
    };
    let mut panel = ChatPanel::new(client);

    if !panel.submit(question, SubmitSource::Typed) {
        anyhow::bail!("question is empty");
    }
    panel.wait_reply().await;

    if let Some(ChatMessage::Assistant(reply)) = panel.transcript().last() {
        println!("{}", reply);
    }
    Ok(())
}
