use std::cell::{Cell, RefCell};

use chrono::{Duration, TimeZone, Utc};
use shopify_theme::{PullSource, PushTarget, PushedTheme, Theme, ThemeCliError, ThemeRole};

use mockito::Matcher;
use serde_json::json;

use super::*;
use crate::config::{NotifyTarget, WebhookKind};
use crate::event::GitRef;
use crate::github::{CommentAuthor, IssueComment};
use crate::marker::parse_marker;

const BOT: &str = "github-actions[bot]";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeStore {
    themes: RefCell<Vec<Theme>>,
    next_id: Cell<u64>,
    calls: RefCell<Vec<String>>,
    /// Number of upcoming `New` pushes rejected with a theme-limit error.
    limit_errors: Cell<u32>,
    push_failure: RefCell<Option<String>>,
    /// Theme removed from the store the moment it is pushed to.
    vanish_on_push: Cell<Option<u64>>,
}

impl FakeStore {
    fn with(themes: Vec<Theme>) -> Self {
        let store = Self::default();
        store.next_id.set(1000);
        *store.themes.borrow_mut() = themes;
        store
    }

    fn ids(&self) -> Vec<u64> {
        self.themes.borrow().iter().map(|t| t.id).collect()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn pushed(theme: &Theme) -> PushedTheme {
        PushedTheme {
            id: theme.id,
            name: theme.name.clone(),
            role: theme.role.clone(),
            preview_url: Some(format!("https://s.myshopify.com/?preview_theme_id={}", theme.id)),
            editor_url: Some(format!("https://s.myshopify.com/admin/themes/{}/editor", theme.id)),
        }
    }
}

impl ThemeStore for FakeStore {
    fn list(&self) -> shopify_theme::Result<Vec<Theme>> {
        self.calls.borrow_mut().push("list".into());
        Ok(self.themes.borrow().clone())
    }

    fn push(&self, target: &PushTarget) -> shopify_theme::Result<PushedTheme> {
        if let Some(output) = self.push_failure.borrow().clone() {
            self.calls.borrow_mut().push("push failed".into());
            return Err(ThemeCliError::Failed {
                command: "shopify theme push".into(),
                code: Some(1),
                output,
            });
        }
        match target {
            PushTarget::New { name } => {
                if self.limit_errors.get() > 0 {
                    self.limit_errors.set(self.limit_errors.get() - 1);
                    self.calls.borrow_mut().push("push limit".into());
                    return Err(ThemeCliError::ThemeLimit {
                        output: "Theme limit reached".into(),
                    });
                }
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                let theme = unpublished(id, name);
                self.themes.borrow_mut().push(theme.clone());
                self.calls.borrow_mut().push(format!("push new {name}"));
                Ok(Self::pushed(&theme))
            }
            PushTarget::Existing { id } => {
                self.calls.borrow_mut().push(format!("push {id}"));
                if self.vanish_on_push.get() == Some(*id) {
                    self.themes.borrow_mut().retain(|t| t.id != *id);
                }
                let themes = self.themes.borrow();
                let theme = themes
                    .iter()
                    .find(|t| t.id == *id)
                    .ok_or(ThemeCliError::NotFound { id: *id })?;
                Ok(Self::pushed(theme))
            }
        }
    }

    fn pull(&self, source: &PullSource, only: &[String]) -> shopify_theme::Result<()> {
        let from = match source {
            PullSource::Live => "live".to_string(),
            PullSource::Theme { id } => id.to_string(),
        };
        self.calls
            .borrow_mut()
            .push(format!("pull {from} {}", only.join(",")));
        Ok(())
    }

    fn delete(&self, id: u64) -> shopify_theme::Result<()> {
        self.calls.borrow_mut().push(format!("delete {id}"));
        let mut themes = self.themes.borrow_mut();
        let before = themes.len();
        themes.retain(|t| t.id != id);
        if themes.len() == before {
            return Err(ThemeCliError::NotFound { id });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeHost {
    comments: RefCell<Vec<(u64, IssueComment)>>,
    next_id: Cell<u64>,
    labels: RefCell<Vec<(u64, String)>>,
    open: Vec<u64>,
    fail_labels: bool,
}

impl FakeHost {
    fn new() -> Self {
        let host = Self::default();
        host.next_id.set(500);
        host
    }

    fn seed_comment(&self, pr: u64, body: &str) -> u64 {
        self.insert(pr, body, BOT)
    }

    fn seed_comment_by(&self, author: &str, pr: u64, body: &str) -> u64 {
        self.insert(pr, body, author)
    }

    fn insert(&self, pr: u64, body: &str, author: &str) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        self.comments.borrow_mut().push((
            pr,
            IssueComment {
                id,
                body: body.to_string(),
                created_at: base + Duration::seconds(id as i64),
                html_url: None,
                user: Some(CommentAuthor {
                    login: author.to_string(),
                }),
            },
        ));
        id
    }

    fn bodies(&self, pr: u64) -> Vec<String> {
        self.comments
            .borrow()
            .iter()
            .filter(|(p, _)| *p == pr)
            .map(|(_, c)| c.body.clone())
            .collect()
    }

    fn pull(number: u64) -> PullRequest {
        PullRequest {
            number,
            title: format!("PR {number}"),
            html_url: format!("https://github.com/acme/shop/pull/{number}"),
            state: "open".into(),
            draft: false,
            merged: false,
            head: GitRef {
                ref_name: format!("branch-{number}"),
                sha: "abc1234def".into(),
            },
            user: None,
            labels: Vec::new(),
        }
    }
}

impl ReviewHost for FakeHost {
    fn list_comments(&self, pr: u64) -> Result<Vec<IssueComment>> {
        Ok(self
            .comments
            .borrow()
            .iter()
            .filter(|(p, _)| *p == pr)
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn create_comment(&self, pr: u64, body: &str) -> Result<IssueComment> {
        let id = self.insert(pr, body, BOT);
        let comments = self.comments.borrow();
        let (_, comment) = comments
            .iter()
            .find(|(_, c)| c.id == id)
            .ok_or_else(|| PreviewError::InvalidEvent("lost comment".into()))?;
        Ok(comment.clone())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<IssueComment> {
        let mut comments = self.comments.borrow_mut();
        match comments.iter_mut().find(|(_, c)| c.id == comment_id) {
            Some((_, c)) => {
                c.body = body.to_string();
                Ok(c.clone())
            }
            None => Err(PreviewError::Api {
                operation: "update comment".into(),
                status: 404,
                body: String::new(),
            }),
        }
    }

    fn add_label(&self, pr: u64, label: &str) -> Result<()> {
        if self.fail_labels {
            return Err(PreviewError::Api {
                operation: "add label".into(),
                status: 403,
                body: "Resource not accessible by integration".into(),
            });
        }
        self.labels.borrow_mut().push((pr, label.to_string()));
        Ok(())
    }

    fn remove_label(&self, pr: u64, label: &str) -> Result<()> {
        self.labels
            .borrow_mut()
            .retain(|(p, l)| !(*p == pr && l == label));
        Ok(())
    }

    fn list_open_pulls(&self) -> Result<Vec<PullRequest>> {
        Ok(self.open.iter().map(|n| Self::pull(*n)).collect())
    }

    fn get_pull(&self, pr: u64) -> Result<PullRequest> {
        Ok(Self::pull(pr))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn live(id: u64) -> Theme {
    Theme {
        id,
        name: "Dawn".into(),
        role: ThemeRole::Live,
        previewable: Some(true),
        processing: Some(false),
    }
}

fn unpublished(id: u64, name: &str) -> Theme {
    Theme {
        id,
        name: name.to_string(),
        role: ThemeRole::Unpublished,
        previewable: Some(true),
        processing: Some(false),
    }
}

fn config(limit: usize) -> Config {
    Config {
        store: "s.myshopify.com".into(),
        theme_limit: limit,
        ..Config::default()
    }
}

fn pr(number: u64) -> PrContext {
    PrContext::from_pull(&FakeHost::pull(number))
}

/// A notifier posting every event to one generic webhook on `server`.
fn webhook_notifier(server: &mockito::Server) -> Notifier {
    Notifier::new(vec![NotifyTarget {
        kind: WebhookKind::Generic,
        url: Some(format!("{}/hook", server.url())),
        url_env: None,
        events: vec![
            NotifyEvent::Deployed,
            NotifyEvent::Failed,
            NotifyEvent::Removed,
            NotifyEvent::Evicted,
        ],
    }])
    .with_base_delay_ms(0)
}

fn expect_event(server: &mut mockito::Server, event: &str, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/hook")
        .match_body(Matcher::PartialJson(json!({ "event": event })))
        .with_status(204)
        .expect(hits)
        .create()
}

// ---------------------------------------------------------------------------
// deploy
// ---------------------------------------------------------------------------

#[test]
fn first_deploy_creates_theme_comment_and_label() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.theme.name, "[PR-7] branch-7");
    assert!(outcome.evicted.is_empty());
    assert!(store
        .calls()
        .contains(&"pull live config/settings_data.json".to_string()));

    let bodies = host.bodies(7);
    assert_eq!(bodies.len(), 1);
    let marker = parse_marker(&bodies[0]).unwrap();
    assert_eq!(marker.theme_id, Some(outcome.theme.id));
    assert!(bodies[0].contains("preview_theme_id="));
    assert_eq!(
        host.labels.borrow().as_slice(),
        &[(7, "theme-preview".to_string())]
    );
}

#[test]
fn redeploy_updates_same_theme_and_comment() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let first = previewer.deploy(&pr(7)).unwrap();
    let second = previewer.deploy(&pr(7)).unwrap();

    assert!(!second.created);
    assert_eq!(second.theme.id, first.theme.id);
    assert_eq!(second.comment_id, first.comment_id);
    assert_eq!(host.bodies(7).len(), 1);
    assert_eq!(store.ids(), vec![1, first.theme.id]);
    assert!(store.calls().contains(&format!("push {}", first.theme.id)));
}

#[test]
fn oldest_marker_comment_decides_theme() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(40, "[PR-7] branch-7"),
        unpublished(41, "[PR-7] branch-7"),
    ]);
    let host = FakeHost::new();
    let canonical = host.seed_comment(7, "<!-- theme-preview:pr=7 theme=41 -->");
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=40 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert_eq!(outcome.theme.id, 41);
    assert_eq!(outcome.comment_id, canonical);
}

#[test]
fn theme_named_for_pr_is_reused_without_marker() {
    let store = FakeStore::with(vec![live(1), unpublished(40, "[PR-7] old-branch")]);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(!outcome.created);
    assert_eq!(outcome.theme.id, 40);
}

#[test]
fn missing_marked_theme_is_recreated_in_same_comment() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let comment = host.seed_comment(7, "<!-- theme-preview:pr=7 theme=999 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert_ne!(outcome.theme.id, 999);
    assert_eq!(outcome.comment_id, comment);
    let marker = parse_marker(&host.bodies(7)[0]).unwrap();
    assert_eq!(marker.theme_id, Some(outcome.theme.id));
}

#[test]
fn deleted_status_comment_is_replaced() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let id = previewer.upsert_comment(7, Some(12345), "body").unwrap();
    assert_ne!(id, 12345);
    assert_eq!(host.bodies(7), vec!["body".to_string()]);
}

#[test]
fn limit_evicts_oldest_preview_of_another_pr() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(11, "[PR-3] newer"),
        unpublished(10, "[PR-2] older"),
    ]);
    let host = FakeHost::new();
    let cfg = config(3);
    let mut server = mockito::Server::new();
    let evicted = expect_event(&mut server, "evicted", 1);
    let deployed = expect_event(&mut server, "deployed", 1);
    let failed = expect_event(&mut server, "failed", 0);
    let notifier = webhook_notifier(&server);
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(outcome.evicted[0].pr, 2);
    assert_eq!(outcome.evicted[0].theme.id, 10);
    assert_eq!(store.ids(), vec![1, 11, outcome.theme.id]);
    evicted.assert();
    deployed.assert();
    failed.assert();
}

#[test]
fn eviction_deletes_nothing_when_it_cannot_make_room() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(10, "[PR-2] a"),
        unpublished(11, "[PR-3] b"),
        unpublished(12, "Holiday draft"),
    ]);
    let host = FakeHost::new();
    let cfg = config(2);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let err = previewer.deploy(&pr(7)).unwrap_err();

    assert!(matches!(err, PreviewError::NoEvictionCandidate { limit: 2 }));
    assert_eq!(store.ids(), vec![1, 10, 11, 12]);
}

#[test]
fn zero_theme_limit_is_refused_before_any_deletion() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(10, "[PR-2] a"),
        unpublished(11, "[PR-3] b"),
    ]);
    let host = FakeHost::new();
    let cfg = config(0);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let err = previewer.deploy(&pr(7)).unwrap_err();

    assert!(matches!(err, PreviewError::InvalidConfig(_)));
    assert_eq!(store.ids(), vec![1, 10, 11]);
    assert!(!store.calls().iter().any(|c| c.starts_with("delete")));
}

#[test]
fn vanished_marked_theme_does_not_count_toward_limit() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(10, "[PR-2] other"),
        unpublished(40, "[PR-7] branch-7"),
    ]);
    store.vanish_on_push.set(Some(40));
    let host = FakeHost::new();
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=40 -->");
    let cfg = config(3);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert!(outcome.evicted.is_empty());
    assert_eq!(store.ids(), vec![1, 10, outcome.theme.id]);
}

#[test]
fn no_candidate_fails_and_reports_on_pr() {
    let store = FakeStore::with(vec![live(1), unpublished(2, "Holiday draft")]);
    let host = FakeHost::new();
    let cfg = config(2);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let err = previewer.deploy(&pr(7)).unwrap_err();

    assert!(matches!(err, PreviewError::NoEvictionCandidate { limit: 2 }));
    assert_eq!(store.ids(), vec![1, 2]);
    let bodies = host.bodies(7);
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("Theme preview failed"));
    assert_eq!(parse_marker(&bodies[0]).unwrap().theme_id, None);
    assert!(host.labels.borrow().is_empty());
}

#[test]
fn store_limit_error_triggers_single_eviction_retry() {
    let store = FakeStore::with(vec![live(1), unpublished(10, "[PR-2] older")]);
    store.limit_errors.set(1);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.evicted[0].theme.id, 10);
    let calls = store.calls();
    assert_eq!(calls.iter().filter(|c| c.starts_with("push")).count(), 2);
    assert!(calls.contains(&"delete 10".to_string()));
}

#[test]
fn repeated_store_limit_error_is_returned() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(10, "[PR-2] a"),
        unpublished(11, "[PR-3] b"),
    ]);
    store.limit_errors.set(2);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let err = previewer.deploy(&pr(7)).unwrap_err();

    assert!(matches!(
        err,
        PreviewError::Theme(ThemeCliError::ThemeLimit { .. })
    ));
    // Only one eviction per deploy.
    assert_eq!(store.ids(), vec![1, 11]);
}

#[test]
fn push_failure_keeps_known_theme_in_failure_comment() {
    let store = FakeStore::with(vec![live(1), unpublished(40, "[PR-7] branch-7")]);
    *store.push_failure.borrow_mut() = Some("Liquid syntax error in sections/header.liquid".into());
    let host = FakeHost::new();
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=40 -->");
    let cfg = config(20);
    let mut server = mockito::Server::new();
    let failed = expect_event(&mut server, "failed", 1);
    let deployed = expect_event(&mut server, "deployed", 0);
    let notifier = webhook_notifier(&server);
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let err = previewer.deploy(&pr(7)).unwrap_err();

    assert!(matches!(
        err,
        PreviewError::Theme(ThemeCliError::Failed { .. })
    ));
    let body = &host.bodies(7)[0];
    assert!(body.contains("Liquid syntax error"));
    assert_eq!(parse_marker(body).unwrap().theme_id, Some(40));
    failed.assert();
    deployed.assert();
}

#[test]
fn failing_label_call_does_not_fail_deploy() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost {
        fail_labels: true,
        ..FakeHost::new()
    };
    let cfg = config(20);
    let mut server = mockito::Server::new();
    let deployed = expect_event(&mut server, "deployed", 1);
    let notifier = webhook_notifier(&server);
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert!(host.labels.borrow().is_empty());
    assert_eq!(host.bodies(7).len(), 1);
    deployed.assert();
}

#[test]
fn forged_marker_from_another_user_is_ignored() {
    let store = FakeStore::with(vec![live(1), unpublished(12, "Holiday draft")]);
    let host = FakeHost::new();
    host.seed_comment_by("mallory", 7, "<!-- theme-preview:pr=7 theme=12 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();

    assert!(outcome.created);
    assert_ne!(outcome.theme.id, 12);
    assert!(!store.calls().contains(&"push 12".to_string()));
    // The bot posts its own status comment next to the forged one.
    assert_eq!(host.bodies(7).len(), 2);

    let torn = previewer.teardown(&pr(7)).unwrap();
    assert_eq!(torn.deleted, vec![outcome.theme.id]);
    assert_eq!(store.ids(), vec![1, 12]);
}

#[test]
fn bot_marker_pointing_at_foreign_theme_is_not_touched() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(12, "Holiday draft"),
        unpublished(13, "[PR-8] someone-else"),
    ]);
    let host = FakeHost::new();
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=12 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.deploy(&pr(7)).unwrap();
    assert!(outcome.created);
    assert!(!store.calls().contains(&"push 12".to_string()));

    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=13 -->");
    let torn = previewer.teardown(&pr(7)).unwrap();
    assert_eq!(torn.deleted, vec![outcome.theme.id]);
    assert_eq!(store.ids(), vec![1, 12, 13]);
}

// ---------------------------------------------------------------------------
// teardown
// ---------------------------------------------------------------------------

#[test]
fn teardown_deletes_theme_and_marks_comment_removed() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let cfg = config(20);
    let mut server = mockito::Server::new();
    let deployed_hook = expect_event(&mut server, "deployed", 1);
    let removed_hook = expect_event(&mut server, "removed", 1);
    let notifier = webhook_notifier(&server);
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let deployed = previewer.deploy(&pr(7)).unwrap();
    let outcome = previewer.teardown(&pr(7)).unwrap();

    assert_eq!(outcome.deleted, vec![deployed.theme.id]);
    assert_eq!(outcome.comment_id, Some(deployed.comment_id));
    assert_eq!(store.ids(), vec![1]);
    let bodies = host.bodies(7);
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("Theme preview removed"));
    assert_eq!(parse_marker(&bodies[0]).unwrap().theme_id, None);
    assert!(host.labels.borrow().is_empty());
    deployed_hook.assert();
    removed_hook.assert();
}

#[test]
fn teardown_also_removes_orphaned_themes_for_pr() {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(40, "[PR-7] a"),
        unpublished(41, "[PR-7] b"),
        unpublished(50, "[PR-8] other"),
    ]);
    let host = FakeHost::new();
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=41 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.teardown(&pr(7)).unwrap();

    assert_eq!(outcome.deleted, vec![40, 41]);
    assert_eq!(store.ids(), vec![1, 50]);
}

#[test]
fn teardown_without_preview_stays_quiet() {
    let store = FakeStore::with(vec![live(1)]);
    let host = FakeHost::new();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.teardown(&pr(7)).unwrap();

    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.comment_id, None);
    assert!(host.bodies(7).is_empty());
}

#[test]
fn teardown_never_deletes_live_theme() {
    let mut published = live(40);
    published.name = "[PR-7] shipped".into();
    let store = FakeStore::with(vec![published]);
    let host = FakeHost::new();
    host.seed_comment(7, "<!-- theme-preview:pr=7 theme=40 -->");
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let outcome = previewer.teardown(&pr(7)).unwrap();

    assert!(outcome.deleted.is_empty());
    assert_eq!(store.ids(), vec![40]);
}

// ---------------------------------------------------------------------------
// sweep / list
// ---------------------------------------------------------------------------

fn sweep_fixture() -> (FakeStore, FakeHost) {
    let store = FakeStore::with(vec![
        live(1),
        unpublished(10, "[PR-2] closed"),
        unpublished(11, "[PR-3] open"),
        unpublished(12, "Holiday draft"),
    ]);
    let host = FakeHost {
        open: vec![3],
        ..FakeHost::new()
    };
    (store, host)
}

#[test]
fn sweep_removes_previews_of_closed_prs() {
    let (store, host) = sweep_fixture();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let report = previewer.sweep(false).unwrap();

    assert_eq!(report.removed.len(), 1);
    assert_eq!(report.removed[0].pr, 2);
    assert_eq!(report.kept.len(), 1);
    assert_eq!(store.ids(), vec![1, 11, 12]);
}

#[test]
fn sweep_dry_run_deletes_nothing() {
    let (store, host) = sweep_fixture();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let report = previewer.sweep(true).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.removed.len(), 1);
    assert_eq!(store.ids(), vec![1, 10, 11, 12]);
    assert!(!store.calls().iter().any(|c| c.starts_with("delete")));
}

#[test]
fn list_returns_previews_ordered_by_pr() {
    let (store, host) = sweep_fixture();
    let cfg = config(20);
    let notifier = Notifier::disabled();
    let previewer = Previewer::new(&cfg, &store, &host, &notifier, "acme/shop");

    let previews = previewer.list().unwrap();
    let prs: Vec<u64> = previews.iter().map(|p| p.pr).collect();
    assert_eq!(prs, vec![2, 3]);
}
