//! GitHub `pull_request` webhook payloads and the preview action they map to.

use crate::config::Config;
use crate::error::{PreviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    #[serde(default)]
    pub number: Option<u64>,
    pub pull_request: PullRequest,
    /// Present on `labeled` / `unlabeled` events.
    #[serde(default)]
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub merged: bool,
    pub head: GitRef,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl PullRequest {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }
}

/// What a pull-request event asks the tool to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewAction {
    Deploy,
    Teardown,
    Skip { reason: String },
}

impl PullRequestEvent {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(|e| PreviewError::InvalidEvent(e.to_string()))
    }

    pub fn number(&self) -> u64 {
        self.number.unwrap_or(self.pull_request.number)
    }

    /// Decide the action for this event under `config`.
    ///
    /// Closing always tears down, even for drafts or PRs without the trigger
    /// label, so no preview outlives its PR.
    pub fn action(&self, config: &Config) -> PreviewAction {
        let pr = &self.pull_request;
        let skip = |reason: String| PreviewAction::Skip { reason };

        if self.action == "closed" {
            return PreviewAction::Teardown;
        }

        let deploys = match self.action.as_str() {
            "opened" | "reopened" | "synchronize" | "ready_for_review" => true,
            "labeled" => match (&config.trigger_label, &self.label) {
                (Some(trigger), Some(added)) => added.name.eq_ignore_ascii_case(trigger),
                _ => false,
            },
            "unlabeled" => {
                // Removing the trigger label retracts the preview.
                if let (Some(trigger), Some(removed)) = (&config.trigger_label, &self.label) {
                    if removed.name.eq_ignore_ascii_case(trigger) {
                        return PreviewAction::Teardown;
                    }
                }
                false
            }
            _ => false,
        };
        if !deploys {
            return skip(format!("action '{}' does not affect previews", self.action));
        }

        if pr.draft && config.skip_drafts {
            return skip(format!("PR #{} is a draft", pr.number));
        }
        if let Some(trigger) = &config.trigger_label {
            if !pr.has_label(trigger) {
                return skip(format!("PR #{} lacks the '{trigger}' label", pr.number));
            }
        }
        PreviewAction::Deploy
    }
}
