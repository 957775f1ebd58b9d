//! Per-pull-request Shopify theme previews.
//!
//! Every open pull request gets one unpublished theme on the store, named
//! `[PR-<n>] <branch>`. A single status comment on the PR, tagged with a
//! hidden marker, carries the theme id from run to run so redeploys update
//! the same theme instead of creating new ones.
//!
//! ```text
//! event::PullRequestEvent ──▶ PreviewAction
//!                                  │
//!                                  ▼
//!                         preview::Previewer
//!                        ╱        │         ╲
//!              ThemeStore     ReviewHost    Notifier
//!           (shopify CLI)   (GitHub REST)  (webhooks)
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod github;
pub mod marker;
pub mod notify;
pub mod preview;
pub mod report;

pub use error::{PreviewError, Result};
