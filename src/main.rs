//! Clockey - A Discord bot for sign-up announcements of watch parties and events.
//!
//! This is the main entry point for the clockey bot, which lets staff create
//! announcements asking gardeners to volunteer for an upcoming match or event.
//!
//! # Overview
//!
//! The `/event` slash command shows the invoking user a form. Once submitted, the bot
//! posts an announcement pinging the gardener role, reacts to it with the sign-up
//! emoji and creates the matching guild scheduled event. Forms left unanswered for
//! two minutes time out.
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings:
//!
//! ```yaml
//! discord:
//!   application_id: "1190000000000000000"
//!   token: "bot-token"
//!   public_key: "a1b2c3..."
//!   guild_id: "720000000000000000"
//!
//! server:
//!   address: "0.0.0.0:8080"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `CLOCKEY_` prefix:
//!
//! ```bash
//! export CLOCKEY_DISCORD__TOKEN="bot-token"
//! export CLOCKEY_SERVER__ADDRESS="127.0.0.1:3000"
//! ```
//!
//! # Usage
//!
//! ```bash
//! clockey --config config.yaml
//! ```
//!
//! The interactions endpoint URL of the application must point to
//! `https://<public host>/interactions`.
//!
//! # Bot Commands
//!
//! - `/event type:<Dota|CS|RL|Other> [ping:<bool>]` - Create a sign-up announcement
//! - `/version` - Display the bot version
//!
//! # Architecture
//!
//! - [`bot`] - Wiring of the interactions endpoint, correlator and commands
//! - [`commands`] - Slash command handlers and their registry
//! - [`config`] - YAML configuration with environment variable support
//! - [`correlator`] - Time-bounded waits for follow-up events
//! - [`discord`] - Discord REST client, interaction models and HTTP endpoint
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)
//!   - Set to `debug` for verbose output, including workflow state transitions
//!   - Set to `warn` or `error` for minimal logging

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod correlator;
mod discord;

/// Command-line arguments for the clockey bot.
///
/// Most configuration is done through the YAML file (see [`config::Config`]).
///
/// # Examples
///
/// ```bash
/// clockey --config config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// The configuration file contains the Discord application credentials and the
    /// interactions endpoint address. See the [`config`] module for the expected
    /// format. Values can be overridden with `CLOCKEY_` environment variables.
    #[arg(short, long)]
    config: String,
}

/// Main entry point for the clockey bot.
///
/// 1. **Logging Setup**: `info` level by default, overridable with `RUST_LOG`
/// 2. **Argument Parsing**: Parses command-line arguments using `clap`
/// 3. **Configuration Loading**: Reads the YAML file and environment overrides
/// 4. **Bot Initialization**: Creates the Discord client and command registry
/// 5. **Bot Execution**: Registers the commands and serves interactions until Ctrl-C
///
/// Errors are logged and end the process without panicking.
#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting clockey {}...", env!("CARGO_PKG_VERSION"));

    // Parse command line arguments
    let args = Args::parse();

    // Load configuration from YAML file and environment
    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    // Launch bot
    let bot = match Bot::new(config) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {:#}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("Bot stopped with an error: {:#}", e);
    }
}
