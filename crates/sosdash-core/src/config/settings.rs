use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "SOS dashboard for your safety network")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the safety API
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Subcommand (defaults to `watch`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Monitor connections and their SOS state until interrupted
    Watch,
    /// Toggle your own SOS alert once and exit
    Toggle,
    /// Show the SOS history of a connection
    History {
        /// Email of the connection
        email: String,
    },
    /// Store a session token for later runs
    Token {
        /// Token returned by the login endpoint
        token: String,
        /// User id returned alongside the token
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Forget the stored session token
    Logout,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Resolved subcommand (`watch` when none was given)
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the safety API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Override for the credentials file location
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    /// Periodic refresh settings
    #[serde(default)]
    pub refresh: RefreshSettings,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8080/".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

/// Periodic refresh settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Interval between poll dispatches in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub interval_ms: u64,

    /// Also fetch the notification feed on every refresh cycle
    #[serde(default = "default_include_notifications")]
    pub include_notifications: bool,
}

fn default_refresh_interval() -> u64 {
    5000
}

fn default_include_notifications() -> bool {
    true
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_refresh_interval(),
            include_notifications: default_include_notifications(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout(),
            credentials_path: None,
            refresh: RefreshSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("sosdash/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/sosdash/config.toml")),
            dirs::home_dir().map(|p| p.join(".sosdash.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(ref url) = cli.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(interval) = cli.interval {
            self.refresh.interval_ms = interval;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Clamps the refresh interval so a misconfigured value cannot turn the
    /// scheduler into a busy loop against the server.
    pub fn validate(&mut self) {
        const MIN_REFRESH_INTERVAL: u64 = 100;
        const MIN_REQUEST_TIMEOUT: u64 = 1;

        if self.refresh.interval_ms < MIN_REFRESH_INTERVAL {
            self.refresh.interval_ms = MIN_REFRESH_INTERVAL;
        }
        if self.request_timeout_ms < MIN_REQUEST_TIMEOUT {
            self.request_timeout_ms = MIN_REQUEST_TIMEOUT;
        }
        if !self.api_base_url.ends_with('/') {
            self.api_base_url.push('/');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.refresh.interval_ms, 5000);
        assert!(settings.refresh.include_notifications);
        assert_eq!(settings.request_timeout_ms, 10_000);
        assert!(settings.credentials_path.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            api_base_url = "https://sos.example.org"

            [refresh]
            interval_ms = 2000
            include_notifications = false
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.api_base_url, "https://sos.example.org");
        assert_eq!(settings.refresh.interval_ms, 2000);
        assert!(!settings.refresh.include_notifications);
        assert_eq!(settings.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_ms = 250\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.request_timeout_ms, 250);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "refresh = 12\n").unwrap();

        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_merge_cli_takes_precedence() {
        let cli = Config::parse_from([
            "sosdash",
            "--api-url",
            "http://10.0.0.2:9000",
            "--interval",
            "750",
            "history",
            "ana@example.org",
        ]);
        let mut settings = Settings::default();
        settings.merge_cli(&cli);

        assert_eq!(settings.api_base_url, "http://10.0.0.2:9000");
        assert_eq!(settings.refresh.interval_ms, 750);
        assert_eq!(
            cli.command(),
            Command::History {
                email: "ana@example.org".to_string()
            }
        );
    }

    #[test]
    fn test_command_defaults_to_watch() {
        let cli = Config::parse_from(["sosdash"]);
        assert_eq!(cli.command(), Command::Watch);
    }

    #[test]
    fn test_validate_clamps_and_normalizes() {
        let mut settings = Settings {
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 0,
            credentials_path: None,
            refresh: RefreshSettings {
                interval_ms: 0,
                include_notifications: true,
            },
        };
        settings.validate();

        assert_eq!(settings.refresh.interval_ms, 100);
        assert_eq!(settings.request_timeout_ms, 1);
        assert_eq!(settings.api_base_url, "http://localhost:8080/");
    }
}
