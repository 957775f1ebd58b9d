use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

// ─── Theme ────────────────────────────────────────────────────────────────

/// One row of `shopify theme list --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: u64,
    pub name: String,
    pub role: ThemeRole,
    #[serde(default)]
    pub previewable: Option<bool>,
    #[serde(default)]
    pub processing: Option<bool>,
}

/// The store role of a theme. `main` is the vendor's name for the live theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeRole {
    Live,
    Unpublished,
    Development,
    Demo,
    Locked,
    Other(String),
}

impl ThemeRole {
    pub fn as_str(&self) -> &str {
        match self {
            ThemeRole::Live => "live",
            ThemeRole::Unpublished => "unpublished",
            ThemeRole::Development => "development",
            ThemeRole::Demo => "demo",
            ThemeRole::Locked => "locked",
            ThemeRole::Other(s) => s.as_str(),
        }
    }

    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" | "main" => ThemeRole::Live,
            "unpublished" => ThemeRole::Unpublished,
            "development" => ThemeRole::Development,
            "demo" => ThemeRole::Demo,
            "locked" => ThemeRole::Locked,
            other => ThemeRole::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for ThemeRole {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ThemeRole::from_label(s))
    }
}

impl std::fmt::Display for ThemeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ThemeRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ThemeRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ThemeRole::from_label(&raw))
    }
}

// ─── Push ─────────────────────────────────────────────────────────────────

/// Where `theme push` should upload to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    /// Create a new unpublished theme with this name.
    New { name: String },
    /// Overwrite an existing theme.
    Existing { id: u64 },
}

/// The theme reported back by a successful `theme push --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedTheme {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_pushed_role")]
    pub role: ThemeRole,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub editor_url: Option<String>,
}

fn default_pushed_role() -> ThemeRole {
    ThemeRole::Unpublished
}

/// Where `theme pull` reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullSource {
    Live,
    Theme { id: u64 },
}

// ─── Options ──────────────────────────────────────────────────────────────

/// How a failed invocation is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Clamped to at least one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Case-insensitive substrings that mark a failure as transient.
    pub transient_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2_000,
            transient_markers: default_transient_markers(),
        }
    }
}

pub fn default_transient_markers() -> Vec<String> {
    [
        "try again",
        "timed out",
        "timeout",
        "etimedout",
        "econnreset",
        "econnrefused",
        "socket hang up",
        "429",
        "too many requests",
        "502",
        "503",
        "504",
        "rate limit",
        "internal server error",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Substrings the vendor CLI prints when the store cannot hold another theme.
pub const THEME_LIMIT_MARKERS: &[&str] = &[
    "theme limit",
    "maximum number of themes",
    "too many themes",
];

/// Substrings the vendor CLI prints when a theme id does not resolve.
pub const NOT_FOUND_MARKERS: &[&str] = &["not found", "doesn't exist", "does not exist"];

/// Everything needed to invoke the vendor CLI against one store.
#[derive(Debug, Clone)]
pub struct CliOptions {
    /// Binary to run. Defaults to `shopify`.
    pub executable: PathBuf,
    pub store: String,
    /// Theme directory passed as `--path`.
    pub path: PathBuf,
    /// Glob patterns passed as `--ignore` on push.
    pub ignore: Vec<String>,
    /// Extra environment variables for the subprocess.
    pub env: Vec<(String, String)>,
    pub retry: RetryPolicy,
}

impl CliOptions {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            executable: PathBuf::from("shopify"),
            store: store.into(),
            path: PathBuf::from("."),
            ignore: Vec::new(),
            env: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}
