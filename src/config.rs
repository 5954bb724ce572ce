use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
}

/// What the process should do once configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupAction {
    Serve,
    /// Apply the schema and exit.
    Migrate,
    /// Register a key for an operator, print it, and exit.
    IssueKey { operator: String, country: String },
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Package tracking API")]
pub struct Args {
    /// Host to bind to (overrides TRACKING_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides TRACKING_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides TRACKING_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "issue_key")]
    pub migrate: bool,

    /// Issue an API key for this operator name and exit
    #[arg(long, value_name = "OPERATOR", requires = "country")]
    pub issue_key: Option<String>,

    /// Two-letter country code of the operator receiving a key
    #[arg(long, value_name = "CC", requires = "issue_key")]
    pub country: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the startup action.
    pub fn from_env_and_args() -> Result<(Self, StartupAction)> {
        Self::from_args(Args::parse(), |name| env::var(name))
    }

    /// Merge parsed args over values read through `var`. CLI wins.
    pub fn from_args<F>(args: Args, var: F) -> Result<(Self, StartupAction)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = var("TRACKING_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match var("TRACKING_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing TRACKING_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading TRACKING_PORT"),
        };
        let env_db = var("TRACKING_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/tracking.db".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
        };

        let action = match (args.migrate, args.issue_key, args.country) {
            (true, None, _) => StartupAction::Migrate,
            (false, Some(operator), Some(country)) => StartupAction::IssueKey { operator, country },
            (false, None, None) => StartupAction::Serve,
            _ => bail!("--issue-key requires --country and cannot be combined with --migrate"),
        };

        Ok((cfg, action))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
