use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use clap::{Parser, ValueEnum};

use crate::storage::ReplayMode;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const REPLAY_MODE_ENV: &str = "REPLAY_MODE";
pub const REDIRECT_KIND_ENV: &str = "REDIRECT_KIND";
pub const FILE_STORAGE_SYNC_ENV: &str = "FILE_STORAGE_SYNC";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_FILE_STORAGE_PATH: &str = "/tmp/short-url-db.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplayModeArg {
    #[value(name = "lenient")]
    Lenient,
    #[value(name = "strict")]
    Strict,
}

impl Display for ReplayModeArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayModeArg::Lenient => write!(f, "lenient"),
            ReplayModeArg::Strict => write!(f, "strict"),
        }
    }
}

impl From<ReplayModeArg> for ReplayMode {
    fn from(arg: ReplayModeArg) -> Self {
        match arg {
            ReplayModeArg::Lenient => ReplayMode::Lenient,
            ReplayModeArg::Strict => ReplayMode::Strict,
        }
    }
}

/// Status used when redirecting a short link to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RedirectKind {
    /// 307 Temporary Redirect
    #[value(name = "temporary")]
    Temporary,
    /// 308 Permanent Redirect
    #[value(name = "permanent")]
    Permanent,
}

impl RedirectKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            RedirectKind::Temporary => StatusCode::TEMPORARY_REDIRECT,
            RedirectKind::Permanent => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

impl Display for RedirectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RedirectKind::Temporary => write!(f, "temporary"),
            RedirectKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Command line; every flag can also come from the environment (or a `.env`
/// file loaded beforehand). Flags win over environment variables.
#[derive(Debug, Parser)]
#[command(name = "shortener", about = "Hash-keyed URL shortener")]
pub struct Cli {
    /// Address to listen on
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV, default_value = DEFAULT_SERVER_ADDRESS)]
    pub address: String,

    /// Public prefix of generated links
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Path of the append-only log; empty keeps links in memory only
    #[arg(
        short = 'f',
        long,
        env = FILE_STORAGE_PATH_ENV,
        default_value = DEFAULT_FILE_STORAGE_PATH
    )]
    pub file_storage_path: String,

    /// Default log filter when RUST_LOG is unset
    #[arg(short = 'l', long, env = LOG_LEVEL_ENV, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[arg(long, env = REPLAY_MODE_ENV, value_enum, default_value_t = ReplayModeArg::Lenient)]
    pub replay_mode: ReplayModeArg,

    #[arg(
        long = "redirect",
        env = REDIRECT_KIND_ENV,
        value_enum,
        default_value_t = RedirectKind::Temporary
    )]
    pub redirect: RedirectKind,

    /// fsync the log after every append
    #[arg(long, env = FILE_STORAGE_SYNC_ENV, default_value_t = false)]
    pub sync_writes: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to, e.g. "localhost:8080"
    pub address: String,

    /// Public base URL used when generating short links, e.g. "https://go.example.com".
    /// Never has a trailing slash.
    pub base_url: String,

    /// Location of the append-only log, or `None` for in-memory storage.
    pub storage_path: Option<PathBuf>,

    pub log_level: String,

    pub replay_mode: ReplayMode,

    pub redirect: RedirectKind,

    pub sync_writes: bool,
}

impl AppConfig {
    /// Parse flags and environment (populated by dotenvy before this is called).
    pub fn load() -> Result<Self> {
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self> {
        let base_url = cli.base_url.trim().trim_end_matches('/').to_owned();
        url::Url::parse(&base_url)
            .with_context(|| format!("{BASE_URL_ENV} must be an absolute URL, got '{base_url}'"))?;

        if cli.address.trim().is_empty() {
            anyhow::bail!("{SERVER_ADDRESS_ENV} must not be empty");
        }

        let storage_path = match cli.file_storage_path.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };

        Ok(Self {
            address: cli.address,
            base_url,
            storage_path,
            log_level: cli.log_level,
            replay_mode: cli.replay_mode.into(),
            redirect: cli.redirect,
            sync_writes: cli.sync_writes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig> {
        let argv = std::iter::once("shortener").chain(args.iter().copied());
        AppConfig::from_cli(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn flags_are_applied() {
        let config = parse(&[
            "-a",
            "0.0.0.0:9000",
            "-b",
            "https://go.example.com/",
            "-f",
            "/var/lib/links.json",
            "--replay-mode",
            "strict",
            "--redirect",
            "permanent",
            "--sync-writes",
        ])
        .unwrap();

        assert_eq!(config.address, "0.0.0.0:9000");
        assert_eq!(config.base_url, "https://go.example.com");
        assert_eq!(config.storage_path, Some(PathBuf::from("/var/lib/links.json")));
        assert_eq!(config.replay_mode, ReplayMode::Strict);
        assert_eq!(config.redirect, RedirectKind::Permanent);
        assert!(config.sync_writes);
    }

    #[test]
    fn empty_storage_path_means_in_memory() {
        let config = parse(&["-f", ""]).unwrap();
        assert_eq!(config.storage_path, None);
    }

    #[test]
    fn base_url_must_be_absolute() {
        assert!(parse(&["-b", "example.com"]).is_err());
    }

    #[test]
    fn unknown_replay_mode_is_rejected() {
        assert!(parse(&["--replay-mode", "sloppy"]).is_err());
    }

    #[test]
    fn redirect_status_codes() {
        assert_eq!(RedirectKind::Temporary.status_code(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(RedirectKind::Permanent.status_code(), StatusCode::PERMANENT_REDIRECT);
    }
}
