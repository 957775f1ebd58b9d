pub mod config;
pub mod deploy;
pub mod event;
pub mod list;
pub mod sweep;
pub mod teardown;

use anyhow::Context;
use preview_core::config::{Config, WarnLevel};
use preview_core::github::{GithubClient, RepoRef};
use preview_core::notify::Notifier;
use preview_core::PreviewError;
use shopify_theme::ThemeCli;
use std::path::{Path, PathBuf};

/// Flags shared by every subcommand.
pub struct Globals {
    pub config: Option<PathBuf>,
    pub repo: Option<String>,
    pub json: bool,
}

/// Loaded config plus lazily built clients. Each command only pays for the
/// services it touches, so `list` works without a GitHub token.
pub struct Session {
    pub config: Config,
    pub config_path: PathBuf,
    repo: Option<String>,
}

impl Session {
    pub fn load(globals: &Globals) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("cannot read current directory")?;
        let (config, config_path) = Config::load_or_default(globals.config.as_deref(), &cwd)
            .context("failed to load config")?;
        Ok(Self {
            config,
            config_path,
            repo: globals.repo.clone(),
        })
    }

    /// Refuse to touch the store with a config that has errors.
    fn check(&self) -> anyhow::Result<()> {
        let errors: Vec<String> = self
            .config
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if !errors.is_empty() {
            anyhow::bail!(
                "invalid config {}: {}",
                self.config_path.display(),
                errors.join("; ")
            );
        }
        Ok(())
    }

    fn base_dir(&self) -> &Path {
        self.config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn themes(&self) -> anyhow::Result<ThemeCli> {
        self.check()?;
        let mut opts = self.config.cli_options(self.base_dir());
        opts.executable = self.config.resolve_executable()?;
        Ok(ThemeCli::new(opts))
    }

    pub fn github(&self) -> anyhow::Result<GithubClient> {
        let raw = self
            .repo
            .as_deref()
            .ok_or_else(|| PreviewError::MissingEnv("GITHUB_REPOSITORY (or --repo)".into()))?;
        let repo = RepoRef::parse(raw)?;
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PreviewError::MissingEnv("GITHUB_TOKEN".into()))?;
        Ok(GithubClient::new(&self.config.github, &token, repo)?)
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.config.notify.clone())
    }
}
