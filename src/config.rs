//! Configuration file structures for the clockey bot.
//!
//! This module defines the configuration file format using YAML. The configuration
//! is split into two sections: Discord application settings and the HTTP server
//! receiving interactions.
//!
//! # Configuration File Format
//!
//! ```yaml
//! discord:
//!   # Application id, from the developer portal
//!   application_id: "1190000000000000000"
//!   # Bot token
//!   token: "bot-token"
//!   # Hex encoded application public key, used to verify interaction requests
//!   public_key: "a1b2c3..."
//!   # Guild the commands are registered in
//!   guild_id: "720000000000000000"
//!   # Optional, defaults to https://discord.com/api/v10
//!   api_url: "https://discord.com/api/v10"
//!
//! server:
//!   # Optional, defaults to 0.0.0.0:8080
//!   address: "0.0.0.0:8080"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every value can be set or overridden with a `CLOCKEY_` prefixed environment
//! variable, `__` separating the section from the key:
//!
//! ```bash
//! export CLOCKEY_DISCORD__TOKEN="bot-token"
//! export CLOCKEY_SERVER__ADDRESS="127.0.0.1:3000"
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Prefix of the environment variables overriding the configuration file.
const ENV_PREFIX: &str = "CLOCKEY_";

/// Root configuration structure for the clockey bot.
///
/// # Structure
///
/// - [`Discord`] - Discord application credentials
/// - [`Server`] - Interactions endpoint settings
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Discord application configuration
    pub discord: Discord,
    /// Interactions endpoint configuration
    #[serde(default)]
    pub server: Server,
}

impl Config {
    /// Loads the configuration from a YAML file, then applies `CLOCKEY_` environment
    /// variables on top of it.
    ///
    /// A missing file is not an error by itself: the configuration can come entirely
    /// from the environment.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not valid YAML or a required value is missing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let config = Config::load("config.yaml")?;
    /// println!("Guild: {}", config.discord.guild_id);
    /// ```
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

/// Discord application configuration.
///
/// # YAML Section
///
/// ```yaml
/// discord:
///   application_id: "1190000000000000000"
///   token: "bot-token"
///   public_key: "a1b2c3..."
///   guild_id: "720000000000000000"
/// ```
#[derive(Debug, Deserialize)]
pub struct Discord {
    /// Application id.
    pub application_id: String,

    /// Bot token.
    ///
    /// Sent as `Authorization: Bot <token>` on every REST call. Prefer the
    /// `CLOCKEY_DISCORD__TOKEN` environment variable over the file.
    pub token: String,

    /// Hex encoded Ed25519 public key of the application.
    ///
    /// Every interaction request is signed by Discord; requests failing verification
    /// against this key are rejected.
    pub public_key: String,

    /// Guild the slash commands are registered in.
    pub guild_id: String,

    /// Base URL of the REST API, version included.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

/// Interactions endpoint configuration.
#[derive(Debug, Deserialize)]
pub struct Server {
    /// Socket address the HTTP server binds to.
    ///
    /// Discord must reach `http(s)://<public host>/interactions`, usually through a
    /// reverse proxy terminating TLS.
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            address: default_address(),
        }
    }
}

fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const FULL_CONFIG: &str = r#"
discord:
  application_id: "1"
  token: "file-token"
  public_key: "abcd"
  guild_id: "2"
  api_url: "http://localhost:9000/api"
server:
  address: "127.0.0.1:3000"
"#;

    #[test]
    #[serial]
    fn test_load_full_file() {
        let file = create_test_file(FULL_CONFIG);

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.discord.application_id, "1");
        assert_eq!(config.discord.token, "file-token");
        assert_eq!(config.discord.public_key, "abcd");
        assert_eq!(config.discord.guild_id, "2");
        assert_eq!(config.discord.api_url, "http://localhost:9000/api");
        assert_eq!(config.server.address, "127.0.0.1:3000");
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let file = create_test_file(
            r#"
discord:
  application_id: "1"
  token: "file-token"
  public_key: "abcd"
  guild_id: "2"
"#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.discord.api_url, "https://discord.com/api/v10");
        assert_eq!(config.server.address, "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = create_test_file(FULL_CONFIG);

        // SAFETY: tests touching the environment are serialized
        unsafe { std::env::set_var("CLOCKEY_DISCORD__TOKEN", "env-token") };
        let config = Config::load(file.path().to_str().unwrap());
        unsafe { std::env::remove_var("CLOCKEY_DISCORD__TOKEN") };

        let config = config.unwrap();
        assert_eq!(config.discord.token, "env-token");
        assert_eq!(config.discord.guild_id, "2");
    }

    #[test]
    #[serial]
    fn test_missing_required_value() {
        let file = create_test_file(
            r#"
discord:
  application_id: "1"
  public_key: "abcd"
  guild_id: "2"
"#,
        );

        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        assert!(Config::load("/nonexistent/clockey.yaml").is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_yaml() {
        let file = create_test_file("discord: [unclosed");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }
}
