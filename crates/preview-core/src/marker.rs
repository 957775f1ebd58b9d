//! Hidden status-comment markers and preview theme naming.
//!
//! The status comment carries `<!-- theme-preview:pr=<n> theme=<id> -->`.
//! The oldest comment by the bot login bearing a marker is the canonical one:
//! it is the one edited on every run, and its theme id survives across
//! workflow runs. Markers in anyone else's comments are ignored.

use crate::github::IssueComment;
use regex::Regex;
use std::sync::OnceLock;

/// Vendor limit on theme name length, in characters.
pub const MAX_THEME_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub pr: u64,
    pub theme_id: Option<u64>,
}

impl Marker {
    pub fn render(&self) -> String {
        match self.theme_id {
            Some(id) => format!("<!-- theme-preview:pr={} theme={id} -->", self.pr),
            None => format!("<!-- theme-preview:pr={} -->", self.pr),
        }
    }
}

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r"<!--\s*theme-preview:pr=(\d+)(?:\s+theme=(\d+))?\s*-->").unwrap()
    })
}

/// Parse the first marker in a comment body.
pub fn parse_marker(body: &str) -> Option<Marker> {
    let caps = marker_re().captures(body)?;
    let pr = caps[1].parse().ok()?;
    let theme_id = caps.get(2).and_then(|m| m.as_str().parse().ok());
    Some(Marker { pr, theme_id })
}

/// The canonical status comment and any newer duplicates.
#[derive(Debug, Clone)]
pub struct MarkerScan<'a> {
    pub comment: &'a IssueComment,
    pub marker: Marker,
    pub duplicates: Vec<&'a IssueComment>,
}

/// Find the oldest comment by `bot_login` carrying a marker for `pr`.
///
/// Comments are ordered by `created_at`, ties broken by id, so the result
/// does not depend on the order the API returned them in.
pub fn find_marker<'a>(
    comments: &'a [IssueComment],
    pr: u64,
    bot_login: &str,
) -> Option<MarkerScan<'a>> {
    let mut marked: Vec<(&IssueComment, Marker)> = comments
        .iter()
        .filter(|c| is_author(c, bot_login))
        .filter_map(|c| parse_marker(&c.body).map(|m| (c, m)))
        .filter(|(_, m)| m.pr == pr)
        .collect();
    marked.sort_by(|(a, _), (b, _)| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut iter = marked.into_iter();
    let (comment, marker) = iter.next()?;
    let duplicates: Vec<&IssueComment> = iter.map(|(c, _)| c).collect();
    if !duplicates.is_empty() {
        tracing::warn!(
            pr,
            canonical = comment.id,
            duplicates = duplicates.len(),
            "multiple preview status comments; using the oldest"
        );
    }
    Some(MarkerScan {
        comment,
        marker,
        duplicates,
    })
}

fn is_author(comment: &IssueComment, login: &str) -> bool {
    match &comment.user {
        Some(user) => user.login.eq_ignore_ascii_case(login.trim()),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Theme naming
// ---------------------------------------------------------------------------

/// `[<prefix>-<n>] <branch>`, cut to the vendor's name limit on a char
/// boundary.
pub fn theme_name(prefix: &str, pr: u64, branch: &str) -> String {
    let head = format!("[{prefix}-{pr}]");
    let branch = branch.trim();
    let full = if branch.is_empty() {
        head
    } else {
        format!("{head} {branch}")
    };
    full.chars().take(MAX_THEME_NAME_CHARS).collect::<String>().trim_end().to_string()
}

/// Recover the PR number from a preview theme name, if it is one.
pub fn parse_preview_number(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.trim_start().strip_prefix('[')?;
    let rest = rest.strip_prefix(prefix)?;
    let rest = rest.strip_prefix('-')?;
    let end = rest.find(']')?;
    let digits = &rest[..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
