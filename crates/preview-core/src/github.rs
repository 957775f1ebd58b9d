//! Minimal blocking client for the GitHub REST endpoints the preview flow
//! touches: issue comments, labels and pull requests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::GithubConfig;
use crate::error::{PreviewError, Result};
use crate::event::PullRequest;

const PER_PAGE: usize = 100;

/// Longest server-requested wait honoured before a retry.
pub(crate) const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `OWNER/NAME`, the format of `GITHUB_REPOSITORY`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(PreviewError::InvalidRepo(raw.to_string())),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub user: Option<CommentAuthor>,
}

// ---------------------------------------------------------------------------
// ReviewHost
// ---------------------------------------------------------------------------

/// The review-platform operations the preview flow depends on.
pub trait ReviewHost {
    fn list_comments(&self, pr: u64) -> Result<Vec<IssueComment>>;
    fn create_comment(&self, pr: u64, body: &str) -> Result<IssueComment>;
    fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment>;
    fn add_label(&self, pr: u64, label: &str) -> Result<()>;
    /// Removing a label that is not present is not an error.
    fn remove_label(&self, pr: u64, label: &str) -> Result<()>;
    fn list_open_pulls(&self) -> Result<Vec<PullRequest>>;
    fn get_pull(&self, pr: u64) -> Result<PullRequest>;
}

// ---------------------------------------------------------------------------
// GithubClient
// ---------------------------------------------------------------------------

pub struct GithubClient {
    http: Client,
    api_base: String,
    repo: RepoRef,
    max_attempts: u32,
    base_delay_ms: u64,
}

impl GithubClient {
    pub fn new(config: &GithubConfig, token: &str, repo: RepoRef) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("theme-preview"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            PreviewError::InvalidConfig("GITHUB_TOKEN contains invalid characters".into())
        })?;
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .map_err(|source| PreviewError::Http {
                operation: "client setup".into(),
                source,
            })?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repo,
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.repo.owner, self.repo.name, tail
        )
    }

    fn paginate<T, F>(&self, operation: &str, mut build: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&str) -> RequestBuilder,
    {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<T> = self.request_json(operation, || build(&page_value))?;
            let len = chunk.len();
            rows.extend(chunk);
            if len < PER_PAGE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> RequestBuilder,
    {
        let response = self.send(operation, request_builder)?;
        response.json::<T>().map_err(|source| PreviewError::Http {
            operation: operation.to_string(),
            source,
        })
    }

    /// Send with retries on 429/5xx and transport errors. Non-success
    /// responses that are not retried become [`PreviewError::Api`].
    fn send<F>(&self, operation: &str, mut request_builder: F) -> Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            match request_builder().send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().unwrap_or_default();
                    if attempt < self.max_attempts && is_retryable_status(status.as_u16()) {
                        let delay = retry_delay(self.base_delay_ms, attempt, retry_after);
                        tracing::warn!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "github api retry"
                        );
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Err(PreviewError::Api {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        body: truncate_for_error(&body, 800),
                    });
                }
                Err(source) => {
                    if attempt < self.max_attempts && (source.is_timeout() || source.is_connect())
                    {
                        std::thread::sleep(retry_delay(self.base_delay_ms, attempt, None));
                        continue;
                    }
                    return Err(PreviewError::Http {
                        operation: operation.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

impl ReviewHost for GithubClient {
    fn list_comments(&self, pr: u64) -> Result<Vec<IssueComment>> {
        let url = self.repo_url(&format!("issues/{pr}/comments"));
        self.paginate("list issue comments", |page| {
            self.http
                .get(&url)
                .query(&[("per_page", "100"), ("page", page)])
        })
    }

    fn create_comment(&self, pr: u64, body: &str) -> Result<IssueComment> {
        let url = self.repo_url(&format!("issues/{pr}/comments"));
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || self.http.post(&url).json(&payload))
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment> {
        let url = self.repo_url(&format!("issues/comments/{comment_id}"));
        let payload = json!({ "body": body });
        self.request_json("update issue comment", || self.http.patch(&url).json(&payload))
    }

    fn add_label(&self, pr: u64, label: &str) -> Result<()> {
        let url = self.repo_url(&format!("issues/{pr}/labels"));
        let payload = json!({ "labels": [label] });
        self.send("add label", || self.http.post(&url).json(&payload))?;
        Ok(())
    }

    fn remove_label(&self, pr: u64, label: &str) -> Result<()> {
        let url = self.repo_url(&format!("issues/{pr}/labels/{}", urlencoding::encode(label)));
        match self.send("remove label", || self.http.delete(&url)) {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn list_open_pulls(&self) -> Result<Vec<PullRequest>> {
        let url = self.repo_url("pulls");
        self.paginate("list pull requests", |page| {
            self.http
                .get(&url)
                .query(&[("state", "open"), ("per_page", "100"), ("page", page)])
        })
    }

    fn get_pull(&self, pr: u64) -> Result<PullRequest> {
        let url = self.repo_url(&format!("pulls/{pr}"));
        self.request_json("get pull request", || self.http.get(&url))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

pub(crate) fn retry_delay(base_delay_ms: u64, attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(delay) = retry_after {
        return delay
            .min(MAX_RETRY_AFTER)
            .max(Duration::from_millis(base_delay_ms));
    }
    Duration::from_millis(shopify_theme::retry_delay_ms(base_delay_ms, attempt))
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
