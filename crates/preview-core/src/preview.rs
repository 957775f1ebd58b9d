//! Per-pull-request preview lifecycle: deploy, teardown, sweep.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use shopify_theme::{
    PullSource, PushTarget, PushedTheme, Theme, ThemeCli, ThemeCliError, ThemeRole,
};

use crate::config::{Config, NotifyEvent};
use crate::error::{PreviewError, Result};
use crate::event::PullRequest;
use crate::github::ReviewHost;
use crate::marker::{find_marker, parse_preview_number, theme_name};
use crate::notify::{Notifier, PreviewNotice};
use crate::report::{render_comment, CommentStatus};

// ---------------------------------------------------------------------------
// ThemeStore
// ---------------------------------------------------------------------------

/// The theme operations the preview flow depends on.
pub trait ThemeStore {
    fn list(&self) -> shopify_theme::Result<Vec<Theme>>;
    fn push(&self, target: &PushTarget) -> shopify_theme::Result<PushedTheme>;
    fn pull(&self, source: &PullSource, only: &[String]) -> shopify_theme::Result<()>;
    fn delete(&self, id: u64) -> shopify_theme::Result<()>;
}

impl ThemeStore for ThemeCli {
    fn list(&self) -> shopify_theme::Result<Vec<Theme>> {
        ThemeCli::list(self)
    }

    fn push(&self, target: &PushTarget) -> shopify_theme::Result<PushedTheme> {
        ThemeCli::push(self, target)
    }

    fn pull(&self, source: &PullSource, only: &[String]) -> shopify_theme::Result<()> {
        ThemeCli::pull(self, source, only)
    }

    fn delete(&self, id: u64) -> shopify_theme::Result<()> {
        ThemeCli::delete(self, id)
    }
}

// ---------------------------------------------------------------------------
// Inputs / outcomes
// ---------------------------------------------------------------------------

/// The pull request a preview belongs to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrContext {
    pub number: u64,
    pub branch: String,
    pub sha: Option<String>,
    pub title: String,
    pub url: String,
}

impl PrContext {
    pub fn from_pull(pr: &PullRequest) -> Self {
        Self {
            number: pr.number,
            branch: pr.head.ref_name.clone(),
            sha: Some(pr.head.sha.clone()).filter(|s| !s.is_empty()),
            title: pr.title.clone(),
            url: pr.html_url.clone(),
        }
    }
}

/// A store theme recognised as a PR preview by its name.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewTheme {
    pub pr: u64,
    #[serde(flatten)]
    pub theme: Theme,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub pr: u64,
    pub theme: PushedTheme,
    /// False when an existing preview theme was updated in place.
    pub created: bool,
    pub evicted: Vec<PreviewTheme>,
    pub comment_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeardownOutcome {
    pub pr: u64,
    pub deleted: Vec<u64>,
    pub comment_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub dry_run: bool,
    pub removed: Vec<PreviewTheme>,
    pub kept: Vec<PreviewTheme>,
}

// ---------------------------------------------------------------------------
// Previewer
// ---------------------------------------------------------------------------

pub struct Previewer<'a> {
    config: &'a Config,
    themes: &'a dyn ThemeStore,
    review: &'a dyn ReviewHost,
    notifier: &'a Notifier,
    repo: String,
}

impl<'a> Previewer<'a> {
    pub fn new(
        config: &'a Config,
        themes: &'a dyn ThemeStore,
        review: &'a dyn ReviewHost,
        notifier: &'a Notifier,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            config,
            themes,
            review,
            notifier,
            repo: repo.into(),
        }
    }

    // -----------------------------------------------------------------------
    // deploy
    // -----------------------------------------------------------------------

    /// Create or update the preview theme for `pr` and report it on the PR.
    ///
    /// On failure the status comment is rewritten to show the error (keeping
    /// any known theme id), a `failed` notification is sent, and the original
    /// error is returned.
    pub fn deploy(&self, pr: &PrContext) -> Result<DeployOutcome> {
        let comments = self.review.list_comments(pr.number)?;
        let scan = find_marker(&comments, pr.number, &self.config.github.bot_login);
        let known_id = scan.as_ref().and_then(|s| s.marker.theme_id);
        let comment_id = scan.as_ref().map(|s| s.comment.id);
        tracing::info!(pr = pr.number, known_theme = ?known_id, "deploying preview");

        let (pushed, created, evicted) = match self.push_preview(pr, known_id) {
            Ok(done) => done,
            Err(err) => {
                let message = err.to_string();
                let body = render_comment(
                    pr.number,
                    &CommentStatus::Failed {
                        theme_id: known_id,
                        error: &message,
                        sha: pr.sha.as_deref(),
                    },
                    Utc::now(),
                );
                if let Err(e) = self.upsert_comment(pr.number, comment_id, &body) {
                    tracing::warn!(pr = pr.number, error = %e, "could not post failure comment");
                }
                let mut notice = self.notice(pr);
                notice.theme_id = known_id;
                notice.error = Some(message);
                self.notifier.send(NotifyEvent::Failed, &notice);
                return Err(err);
            }
        };

        let preview_url = pushed.preview_url.clone().unwrap_or_default();
        let editor_url = pushed.editor_url.clone().unwrap_or_default();
        let body = render_comment(
            pr.number,
            &CommentStatus::Deployed {
                theme_id: pushed.id,
                theme_name: &pushed.name,
                preview_url: &preview_url,
                editor_url: &editor_url,
                sha: pr.sha.as_deref(),
            },
            Utc::now(),
        );
        let comment_id = self.upsert_comment(pr.number, comment_id, &body)?;

        if !self.config.label.trim().is_empty() {
            if let Err(e) = self.review.add_label(pr.number, &self.config.label) {
                tracing::warn!(pr = pr.number, error = %e, "could not add preview label");
            }
        }

        for gone in &evicted {
            let notice = PreviewNotice {
                repo: self.repo.clone(),
                pr: gone.pr,
                theme_id: Some(gone.theme.id),
                theme_name: Some(gone.theme.name.clone()),
                ..PreviewNotice::default()
            };
            self.notifier.send(NotifyEvent::Evicted, &notice);
        }

        let mut notice = self.notice(pr);
        notice.theme_id = Some(pushed.id);
        notice.theme_name = Some(pushed.name.clone());
        notice.preview_url = pushed.preview_url.clone();
        notice.editor_url = pushed.editor_url.clone();
        self.notifier.send(NotifyEvent::Deployed, &notice);

        tracing::info!(
            pr = pr.number,
            theme_id = pushed.id,
            created,
            evicted = evicted.len(),
            "preview deployed"
        );
        Ok(DeployOutcome {
            pr: pr.number,
            theme: pushed,
            created,
            evicted,
            comment_id,
        })
    }

    /// Push to the PR's existing preview if there is one, else create it.
    fn push_preview(
        &self,
        pr: &PrContext,
        known_id: Option<u64>,
    ) -> Result<(PushedTheme, bool, Vec<PreviewTheme>)> {
        let themes = self.themes.list()?;

        let mut vanished = None;
        if let Some(existing) = self.existing_preview(&themes, pr.number, known_id) {
            match self.themes.push(&PushTarget::Existing { id: existing.id }) {
                Ok(pushed) => return Ok((pushed, false, Vec::new())),
                Err(ThemeCliError::NotFound { id }) => {
                    tracing::warn!(theme_id = id, "preview theme vanished, creating a new one");
                    vanished = Some(id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut remaining = themes;
        if let Some(id) = vanished {
            remaining.retain(|t| t.id != id);
        }
        let mut evicted = self.make_room(&mut remaining, pr.number)?;

        if !self.config.sync_live.is_empty() {
            if let Err(e) = self.themes.pull(&PullSource::Live, &self.config.sync_live) {
                tracing::warn!(error = %e, "could not sync files from the live theme");
            }
        }

        let target = PushTarget::New {
            name: theme_name(&self.config.name_prefix, pr.number, &pr.branch),
        };
        let pushed = match self.themes.push(&target) {
            Ok(pushed) => pushed,
            Err(e) if e.is_theme_limit() => {
                // The store's count can lag behind `theme list`; evict once
                // more from a fresh listing and retry a single time.
                tracing::warn!("store reported theme limit, evicting and retrying");
                let fresh = self.themes.list()?;
                evicted.push(self.evict_oldest(&fresh, pr.number)?);
                self.themes.push(&target)?
            }
            Err(e) => return Err(e.into()),
        };
        Ok((pushed, true, evicted))
    }

    /// The theme to update in place: the marker's theme if it is still this
    /// PR's preview, else the oldest theme named for this PR.
    fn existing_preview<'t>(
        &self,
        themes: &'t [Theme],
        pr: u64,
        known_id: Option<u64>,
    ) -> Option<&'t Theme> {
        let owned = themes.iter().filter(|t| self.is_preview_of(t, pr));
        if let Some(id) = known_id {
            if let Some(theme) = owned.clone().find(|t| t.id == id) {
                return Some(theme);
            }
            tracing::info!(theme_id = id, "theme from status comment is not this PR's preview");
        }
        owned.min_by_key(|t| t.id)
    }

    /// Only unpublished themes named for `pr` are ever overwritten or
    /// deleted on its behalf.
    fn is_preview_of(&self, theme: &Theme, pr: u64) -> bool {
        theme.role == ThemeRole::Unpublished
            && parse_preview_number(&theme.name, &self.config.name_prefix) == Some(pr)
    }

    /// Evict previews until one more theme fits under `theme_limit`. Nothing
    /// is deleted unless enough candidates exist to get there.
    fn make_room(&self, themes: &mut Vec<Theme>, current_pr: u64) -> Result<Vec<PreviewTheme>> {
        let limit = self.config.theme_limit;
        if limit == 0 {
            return Err(PreviewError::InvalidConfig(
                "theme_limit must be at least 1".into(),
            ));
        }
        let needed = (themes.len() + 1).saturating_sub(limit);
        if needed > self.eviction_candidates(themes, current_pr).len() {
            return Err(PreviewError::NoEvictionCandidate { limit });
        }

        let mut evicted = Vec::with_capacity(needed);
        for _ in 0..needed {
            let gone = self.evict_oldest(themes, current_pr)?;
            themes.retain(|t| t.id != gone.theme.id);
            evicted.push(gone);
        }
        Ok(evicted)
    }

    /// Unpublished previews of other PRs, oldest first. Theme ids grow
    /// monotonically, so the lowest id is the oldest theme.
    fn eviction_candidates(&self, themes: &[Theme], current_pr: u64) -> Vec<PreviewTheme> {
        let mut candidates: Vec<PreviewTheme> = self
            .previews(themes)
            .into_iter()
            .filter(|p| p.pr != current_pr && p.theme.role == ThemeRole::Unpublished)
            .collect();
        candidates.sort_by_key(|p| p.theme.id);
        candidates
    }

    /// Delete the oldest preview of another PR.
    fn evict_oldest(&self, themes: &[Theme], current_pr: u64) -> Result<PreviewTheme> {
        let candidate = self
            .eviction_candidates(themes, current_pr)
            .into_iter()
            .next()
            .ok_or(PreviewError::NoEvictionCandidate {
                limit: self.config.theme_limit,
            })?;

        tracing::warn!(
            theme_id = candidate.theme.id,
            pr = candidate.pr,
            "theme limit reached, deleting oldest preview"
        );
        match self.themes.delete(candidate.theme.id) {
            Ok(()) | Err(ThemeCliError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(candidate)
    }

    // -----------------------------------------------------------------------
    // teardown
    // -----------------------------------------------------------------------

    /// Delete the preview for `pr` and mark the status comment as removed.
    pub fn teardown(&self, pr: &PrContext) -> Result<TeardownOutcome> {
        let comments = self.review.list_comments(pr.number)?;
        let scan = find_marker(&comments, pr.number, &self.config.github.bot_login);
        let comment_id = scan.as_ref().map(|s| s.comment.id);

        let themes = self.themes.list()?;
        let doomed: Vec<&Theme> = themes
            .iter()
            .filter(|t| self.is_preview_of(t, pr.number))
            .collect();

        let mut deleted = Vec::new();
        for theme in doomed {
            match self.themes.delete(theme.id) {
                Ok(()) => deleted.push(theme.id),
                Err(ThemeCliError::NotFound { id }) => {
                    tracing::info!(theme_id = id, "preview theme already gone");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if deleted.is_empty() {
            tracing::info!(pr = pr.number, "no preview theme to delete");
        }

        let body = render_comment(
            pr.number,
            &CommentStatus::Removed {
                theme_id: deleted.first().copied(),
            },
            Utc::now(),
        );
        // Only speak up on a PR that never had a preview if something was
        // actually cleaned up.
        let comment_id = if comment_id.is_some() || !deleted.is_empty() {
            Some(self.upsert_comment(pr.number, comment_id, &body)?)
        } else {
            None
        };

        if !self.config.label.trim().is_empty() {
            if let Err(e) = self.review.remove_label(pr.number, &self.config.label) {
                tracing::warn!(pr = pr.number, error = %e, "could not remove preview label");
            }
        }

        if !deleted.is_empty() {
            let mut notice = self.notice(pr);
            notice.theme_id = deleted.first().copied();
            self.notifier.send(NotifyEvent::Removed, &notice);
        }

        Ok(TeardownOutcome {
            pr: pr.number,
            deleted,
            comment_id,
        })
    }

    // -----------------------------------------------------------------------
    // sweep / list
    // -----------------------------------------------------------------------

    /// Delete previews whose pull request is no longer open.
    pub fn sweep(&self, dry_run: bool) -> Result<SweepReport> {
        let open: HashSet<u64> = self
            .review
            .list_open_pulls()?
            .into_iter()
            .map(|p| p.number)
            .collect();
        let themes = self.themes.list()?;

        let mut removed = Vec::new();
        let mut kept = Vec::new();
        for preview in self.previews(&themes) {
            if open.contains(&preview.pr) || preview.theme.role == ThemeRole::Live {
                kept.push(preview);
                continue;
            }
            if !dry_run {
                match self.themes.delete(preview.theme.id) {
                    Ok(()) | Err(ThemeCliError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            tracing::info!(
                pr = preview.pr,
                theme_id = preview.theme.id,
                dry_run,
                "stale preview removed"
            );
            removed.push(preview);
        }

        Ok(SweepReport {
            dry_run,
            removed,
            kept,
        })
    }

    /// All preview themes on the store, ordered by PR number.
    pub fn list(&self) -> Result<Vec<PreviewTheme>> {
        list_previews(self.themes, &self.config.name_prefix)
    }

    // -----------------------------------------------------------------------
    // helpers
    // -----------------------------------------------------------------------

    fn previews(&self, themes: &[Theme]) -> Vec<PreviewTheme> {
        collect_previews(themes, &self.config.name_prefix)
    }

    /// Edit the canonical status comment, or create one. Returns its id.
    fn upsert_comment(&self, pr: u64, existing: Option<u64>, body: &str) -> Result<u64> {
        if let Some(id) = existing {
            match self.review.update_comment(id, body) {
                Ok(c) => return Ok(c.id),
                // Deleted by hand since we listed it; fall back to a new one.
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self.review.create_comment(pr, body)?.id)
    }

    fn notice(&self, pr: &PrContext) -> PreviewNotice {
        PreviewNotice {
            repo: self.repo.clone(),
            pr: pr.number,
            title: pr.title.clone(),
            pr_url: pr.url.clone(),
            ..PreviewNotice::default()
        }
    }
}

/// Preview themes on the store, ordered by PR number. Needs no review API
/// access.
pub fn list_previews(themes: &dyn ThemeStore, prefix: &str) -> Result<Vec<PreviewTheme>> {
    let mut previews = collect_previews(&themes.list()?, prefix);
    previews.sort_by_key(|p| (p.pr, p.theme.id));
    Ok(previews)
}

fn collect_previews(themes: &[Theme], prefix: &str) -> Vec<PreviewTheme> {
    themes
        .iter()
        .filter_map(|t| {
            parse_preview_number(&t.name, prefix).map(|pr| PreviewTheme {
                pr,
                theme: t.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests;
