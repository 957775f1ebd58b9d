//! `shopify-theme`: typed driver for the `shopify theme` CLI.
//!
//! Every operation shells out to the vendor binary, captures stdout/stderr,
//! and extracts the JSON document the CLI prints among its progress output.
//!
//! ```text
//! ThemeCli::{list, push, pull, delete}
//!     │
//!     ▼
//! process::run_with_retry   ← classifies failures by output substring:
//!     │                        transient → backoff + retry
//!     │                        theme limit / not found → typed error
//!     ▼
//! parse::*                  ← tolerant JSON extraction, regex fallback
//! ```

pub mod cli;
pub mod error;
pub mod types;

pub(crate) mod parse;
pub(crate) mod process;


pub use cli::{editor_url, preview_url, ThemeCli};
pub use error::ThemeCliError;
pub use process::retry_delay_ms;
pub use types::{
    default_transient_markers, CliOptions, PullSource, PushTarget, PushedTheme, RetryPolicy,
    Theme, ThemeRole,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ThemeCliError>;
