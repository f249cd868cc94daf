use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::scraper::selectors::Selectors;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub selectors: Selectors,
}

/// Browser / pacing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    #[serde(default = "default_login_url")]
    pub login_url: String,

    #[serde(default = "default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,

    #[serde(default = "default_marker_timeout_ms")]
    pub marker_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

/// Login credentials, read from config files or `FGPS__CREDENTIALS__*`.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Per-invocation settings assembled by the CLI and handed to the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub group_ids: Vec<String>,
    pub output_dir: PathBuf,
    /// Inclusive index of the first post to scrape.
    pub start: usize,
    /// Exclusive end index; 0 means "every post the feed rendered".
    pub end: usize,
    pub debug: bool,
    pub screenshot: bool,
}

impl RunConfig {
    pub fn upper_bound(&self) -> Option<usize> {
        (self.end > 0).then_some(self.end)
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_site_origin() -> String {
    "https://m.facebook.com".to_string()
}
fn default_login_url() -> String {
    "https://facebook.com".to_string()
}
fn default_nav_timeout_ms() -> u64 {
    600_000
}
fn default_marker_timeout_ms() -> u64 {
    30_000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_16_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.0 Safari/537.36".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            site_origin: default_site_origin(),
            login_url: default_login_url(),
            nav_timeout_ms: default_nav_timeout_ms(),
            marker_timeout_ms: default_marker_timeout_ms(),
            user_agent: default_user_agent(),
            headless: true,
            chrome_executable: None,
        }
    }
}

impl CrawlerConfig {
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_millis(self.nav_timeout_ms)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout_ms)
    }

    /// Feed URL for a group id.
    pub fn group_url(&self, group_id: &str) -> String {
        format!("{}/groups/{}/", self.site_origin.trim_end_matches('/'), group_id.trim())
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("FGPS").separator("__"))
            .build()?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
