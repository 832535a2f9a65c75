//! hfchat - a thin command-line wrapper around the Hugging Face Chat web API.
//!
//! Logs in with the credentials from the config file, keeps the session
//! token, and forwards prompts to the chat endpoint. Responses are printed
//! raw; no text extraction is done.

mod auth;
mod chat;
mod client;
mod config;
mod context;
mod error;
mod protocol;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use context::ChatContext;
use error::Error;
use std::path::{Path, PathBuf};
use std::process::Command as ProcessCommand;
use tokio::io::BufReader;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hfchat")]
#[command(author, version, about = "Chat with Hugging Face models from the terminal")]
#[command(long_about = "Logs in to Hugging Face Chat and forwards prompts.\n\nRun without a command to start an interactive session.")]
struct Cli {
    /// Path to the config file (default: ~/.config/hfchat/config.toml)
    #[arg(short = 'c', long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Override the model from the config file
    #[arg(short = 'm', long, value_name = "MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login,
    /// Forget the stored session token
    Logout,
    /// Show login state and chat settings
    Status,
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Some(Commands::Login) => handle_login(config_path).await,
        Some(Commands::Logout) => handle_logout(&config_path),
        Some(Commands::Status) => handle_status(&config_path),
        Some(Commands::Config) => handle_config(&config_path),
        None => handle_chat(config_path, cli.model).await,
    }
}

/// Logs go to stderr so stdout only carries model output.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hfchat=info,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => Config::default_path().context("Could not determine config directory"),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| {
        format!(
            "Failed to load configuration. Create one with: hfchat --config {} config",
            path.display()
        )
    })
}

/// Start an interactive chat session.
async fn handle_chat(config_path: PathBuf, model: Option<String>) -> Result<()> {
    let mut config = load_config(&config_path)?;
    if let Some(model) = model {
        config.chat.model = model;
    }
    info!(
        "Using model {} at {}",
        config.chat.model, config.chat.endpoint
    );

    let mut ctx = ChatContext::new(config, Some(config_path))?;
    if !ctx.restore_cached() {
        match ctx.login().await {
            Err(Error::Config(e)) => warn!("Logged in, but the token was not saved: {}", e),
            result => result.context("Login failed")?,
        }
    }
    debug!("Active session: {:?}", ctx.session());

    eprintln!("Connected as {}. Type /help for commands.", ctx.config().login.email);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    client::run_repl(&mut ctx, stdin, &mut stdout).await?;
    debug!("Chat finished in phase {:?}", ctx.phase());
    Ok(())
}

/// Force a fresh login and store the token.
async fn handle_login(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;
    let mut ctx = ChatContext::new(config, Some(config_path.clone()))?;
    ctx.login().await.context("Login failed")?;
    println!(
        "Logged in as {}. Token saved to {}",
        ctx.config().login.email,
        config_path.display()
    );
    Ok(())
}

/// Remove the stored token from the config file.
fn handle_logout(config_path: &Path) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !config.is_logged_in() {
        println!("Not logged in");
        return Ok(());
    }
    config.clear_token();
    config.save(config_path)?;
    println!("Logged out");
    Ok(())
}

/// Show login state and chat settings.
fn handle_status(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Config: {}", config_path.display());
    println!("Account: {}", config.login.email);
    if config.is_logged_in() {
        println!("Session: token cached");
    } else {
        println!("Session: not logged in");
        println!("Log in with: hfchat login");
    }
    println!("Model: {}", config.chat.model);
    println!("Endpoint: {}", config.chat.endpoint);
    Ok(())
}

/// Handle the config command.
fn handle_config(config_path: &Path) -> Result<()> {
    // Ensure config directory exists
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Create a template config if it doesn't exist
    if !config_path.exists() {
        std::fs::write(config_path, Config::template())
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Created config template at {}", config_path.display());
    }

    // Open in editor
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_config_flag() {
        let cli = Cli::try_parse_from(["hfchat", "status", "--config", "/tmp/x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(cli.command, Some(Commands::Status)));
    }

    #[test]
    fn test_cli_defaults_to_chat() {
        let cli = Cli::try_parse_from(["hfchat", "-m", "custom/model"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.model.as_deref(), Some("custom/model"));
    }

    #[test]
    fn test_logout_clears_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::parse("[login]\nemail = \"a\"\npassword = \"b\"\n").unwrap();
        config.set_token("abc", None);
        config.save(&path).unwrap();

        handle_logout(&path).unwrap();
        assert!(!Config::load(&path).unwrap().is_logged_in());
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(handle_status(&dir.path().join("absent.toml")).is_err());
    }
}
