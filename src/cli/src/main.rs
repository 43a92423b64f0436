//! Conference CLI - Command-line client for the Conference Central API.
//!
//! Provides commands for profile, conference, health, and configuration
//! management. The caller identity is sent in the gateway headers the
//! server trusts; set it once with `conference config set user-id ...` or
//! per invocation with `--user` / `--email`.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::CallerIdentity;
use commands::{conference, config, health, profile};
use output::OutputFormat;

/// Conference Central CLI
#[derive(Parser)]
#[command(
    name = "conference",
    author = "Dana Heninger <dheninger@example.com>",
    version = "0.1.0",
    about = "Conference Central CLI",
    long_about = "CLI client for managing profiles and conferences through the Conference Central API.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// API server URL
    #[arg(long, global = true, env = "CONFERENCE_API_URL")]
    api_url: Option<String>,

    /// Caller user id (sent as the x-user-id gateway header)
    #[arg(long, global = true, env = "CONFERENCE_USER_ID")]
    user: Option<String>,

    /// Caller email (sent as the x-user-email gateway header)
    #[arg(long, global = true, env = "CONFERENCE_USER_EMAIL")]
    email: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile operations
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Conference operations
    #[command(subcommand, name = "conf")]
    Conf(conference::ConferenceCommands),

    /// Check server health
    Health,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let identity = match (cli.user.clone(), cli.email.clone()) {
        (Some(user_id), Some(email)) => Some(CallerIdentity { user_id, email }),
        _ => config::load_identity(),
    };

    let client = client::ApiClient::new(&api_url, identity)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, &client, format).await,
        Commands::Conf(cmd) => conference::execute(cmd, &client, format).await,
        Commands::Health => health::execute(&client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
