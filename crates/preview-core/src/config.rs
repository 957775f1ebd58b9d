use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use shopify_theme::{CliOptions, RetryPolicy};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".theme-preview.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CliConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Globs passed as `--ignore` on every push.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "default_cli_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_cli_delay")]
    pub base_delay_ms: u64,
    /// Extra transient-failure substrings, added to the built-in list.
    #[serde(default)]
    pub transient_markers: Vec<String>,
}

fn default_executable() -> String {
    "shopify".to_string()
}

fn default_cli_attempts() -> u32 {
    5
}

fn default_cli_delay() -> u64 {
    2_000
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            ignore: Vec::new(),
            max_attempts: default_cli_attempts(),
            base_delay_ms: default_cli_delay(),
            transient_markers: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GithubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_api_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_api_delay")]
    pub base_delay_ms: u64,
    /// Login that posts the status comment. Marker comments by anyone else
    /// are ignored.
    #[serde(default = "default_bot_login")]
    pub bot_login: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_request_timeout() -> u64 {
    20_000
}

fn default_api_attempts() -> u32 {
    4
}

fn default_api_delay() -> u64 {
    1_000
}

fn default_bot_login() -> String {
    "github-actions[bot]".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_ms: default_request_timeout(),
            max_attempts: default_api_attempts(),
            base_delay_ms: default_api_delay(),
            bot_login: default_bot_login(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyTarget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookKind {
    Slack,
    Discord,
    Teams,
    GoogleChat,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyEvent {
    Deployed,
    Failed,
    Removed,
    Evicted,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyEvent::Deployed => "deployed",
            NotifyEvent::Failed => "failed",
            NotifyEvent::Removed => "removed",
            NotifyEvent::Evicted => "evicted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyTarget {
    pub kind: WebhookKind,
    /// Literal webhook URL. Prefer `url_env` so the URL stays out of the repo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Name of the environment variable holding the webhook URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_env: Option<String>,
    #[serde(default = "default_notify_events")]
    pub events: Vec<NotifyEvent>,
}

fn default_notify_events() -> Vec<NotifyEvent> {
    vec![
        NotifyEvent::Deployed,
        NotifyEvent::Failed,
        NotifyEvent::Removed,
    ]
}

impl NotifyTarget {
    /// The webhook URL, from `url` or the environment. `None` means the
    /// target is skipped for this run.
    pub fn resolve_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Some(url.trim().to_string());
        }
        let var = self.url_env.as_deref()?;
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn wants(&self, event: NotifyEvent) -> bool {
        self.events.contains(&event)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: String,
    #[serde(default = "default_theme_path")]
    pub theme_path: PathBuf,
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default = "default_theme_limit")]
    pub theme_limit: usize,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default = "default_skip_drafts")]
    pub skip_drafts: bool,
    /// When set, previews are only deployed for PRs carrying this label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_label: Option<String>,
    /// Files pulled from the live theme before a new preview is first pushed.
    #[serde(default = "default_sync_live")]
    pub sync_live: Vec<String>,
    #[serde(default)]
    pub cli: CliConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notify: Vec<NotifyTarget>,
}

fn default_theme_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_name_prefix() -> String {
    "PR".to_string()
}

fn default_theme_limit() -> usize {
    20
}

fn default_label() -> String {
    "theme-preview".to_string()
}

fn default_skip_drafts() -> bool {
    true
}

fn default_sync_live() -> Vec<String> {
    vec!["config/settings_data.json".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: String::new(),
            theme_path: default_theme_path(),
            name_prefix: default_name_prefix(),
            theme_limit: default_theme_limit(),
            label: default_label(),
            skip_drafts: default_skip_drafts(),
            trigger_label: None,
            sync_live: default_sync_live(),
            cli: CliConfig::default(),
            github: GithubConfig::default(),
            notify: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PreviewError::ConfigNotFound);
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load from `path` if given, else from the discovered config file, else
    /// fall back to defaults (every field has one).
    pub fn load_or_default(explicit: Option<&Path>, start: &Path) -> Result<(Self, PathBuf)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, path.to_path_buf()));
        }
        let root = discover_root(start);
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            Ok((Self::load(&path)?, path))
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok((Self::default(), path))
        }
    }

    /// Options for the theme CLI. Relative `theme_path` resolves against
    /// the directory holding the config file.
    pub fn cli_options(&self, base: &Path) -> CliOptions {
        let mut opts = CliOptions::new(self.store.clone());
        opts.executable = PathBuf::from(&self.cli.executable);
        opts.path = if self.theme_path.is_absolute() {
            self.theme_path.clone()
        } else {
            base.join(&self.theme_path)
        };
        opts.ignore = self.cli.ignore.clone();

        let mut markers = shopify_theme::default_transient_markers();
        markers.extend(self.cli.transient_markers.iter().cloned());
        opts.retry = RetryPolicy {
            max_attempts: self.cli.max_attempts,
            base_delay_ms: self.cli.base_delay_ms,
            transient_markers: markers,
        };
        opts
    }

    /// Resolve the CLI executable to a full path, failing early with a
    /// readable error instead of a spawn failure deep in a deploy.
    pub fn resolve_executable(&self) -> Result<PathBuf> {
        let exe = Path::new(&self.cli.executable);
        if exe.components().count() > 1 {
            return Ok(exe.to_path_buf());
        }
        which::which(exe).map_err(|_| PreviewError::CliNotFound(self.cli.executable.clone()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if self.store.trim().is_empty() {
            push(WarnLevel::Error, "store is not set".to_string());
        } else if !self.store.contains('.') {
            push(
                WarnLevel::Warning,
                format!(
                    "store '{}' does not look like a domain (e.g. my-shop.myshopify.com)",
                    self.store
                ),
            );
        }

        if self.name_prefix.trim().is_empty() {
            push(WarnLevel::Error, "name_prefix must not be empty".to_string());
        }

        if self.theme_limit == 0 {
            push(
                WarnLevel::Error,
                "theme_limit must be at least 1".to_string(),
            );
        } else if self.theme_limit > 20 {
            push(
                WarnLevel::Warning,
                format!(
                    "theme_limit={} is above the store maximum of 20",
                    self.theme_limit
                ),
            );
        }

        if self.cli.max_attempts == 0 {
            push(WarnLevel::Error, "cli.max_attempts must be at least 1".to_string());
        }
        if self.github.max_attempts == 0 {
            push(
                WarnLevel::Error,
                "github.max_attempts must be at least 1".to_string(),
            );
        }

        if self.github.bot_login.trim().is_empty() {
            push(
                WarnLevel::Error,
                "github.bot_login must name the account that posts status comments".to_string(),
            );
        }

        if self.label.trim().is_empty() {
            push(WarnLevel::Warning, "label is empty; PRs will not be labeled".to_string());
        }

        for (i, target) in self.notify.iter().enumerate() {
            if target.url.is_none() && target.url_env.is_none() {
                push(
                    WarnLevel::Error,
                    format!("notify[{i}] has neither url nor url_env"),
                );
            }
            if target.url.is_some() {
                push(
                    WarnLevel::Warning,
                    format!("notify[{i}] has a literal url; prefer url_env"),
                );
            }
            if target.events.is_empty() {
                push(
                    WarnLevel::Warning,
                    format!("notify[{i}] subscribes to no events"),
                );
            }
        }

        warnings
    }
}

/// Walk upward from `start` to the first directory holding the config file,
/// then to the first holding `.git/`; fall back to `start`.
pub fn discover_root(start: &Path) -> PathBuf {
    for marker in [CONFIG_FILE, ".git"] {
        let mut dir = start.to_path_buf();
        loop {
            if dir.join(marker).exists() {
                return dir;
            }
            match dir.parent() {
                Some(p) => dir = p.to_path_buf(),
                None => break,
            }
        }
    }
    start.to_path_buf()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
