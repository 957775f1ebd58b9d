use chrono::{DateTime, Utc};

use crate::marker::Marker;

/// State shown in the PR status comment.
#[derive(Debug, Clone)]
pub enum CommentStatus<'a> {
    Deployed {
        theme_id: u64,
        theme_name: &'a str,
        preview_url: &'a str,
        editor_url: &'a str,
        sha: Option<&'a str>,
    },
    Failed {
        theme_id: Option<u64>,
        error: &'a str,
        sha: Option<&'a str>,
    },
    Removed {
        theme_id: Option<u64>,
    },
}

/// Render the status comment body. The marker line always comes first.
pub fn render_comment(pr: u64, status: &CommentStatus<'_>, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M UTC");
    let mut out = String::new();
    match status {
        CommentStatus::Deployed {
            theme_id,
            theme_name,
            preview_url,
            editor_url,
            sha,
        } => {
            out.push_str(&Marker { pr, theme_id: Some(*theme_id) }.render());
            out.push_str("\n### 🛍️ Theme preview ready\n\n");
            out.push_str("| | |\n|---|---|\n");
            out.push_str(&format!("| **Preview** | {preview_url} |\n"));
            out.push_str(&format!("| **Editor** | {editor_url} |\n"));
            out.push_str(&format!("| **Theme** | `{theme_name}` (#{theme_id}) |\n"));
            if let Some(sha) = sha {
                out.push_str(&format!("| **Commit** | `{}` |\n", short_sha(sha)));
            }
            out.push_str(&format!("\n<sub>Updated {stamp}</sub>\n"));
        }
        CommentStatus::Failed {
            theme_id,
            error,
            sha,
        } => {
            out.push_str(&Marker { pr, theme_id: *theme_id }.render());
            out.push_str("\n### ❌ Theme preview failed\n\n");
            if let Some(sha) = sha {
                out.push_str(&format!("Commit `{}` could not be deployed.\n\n", short_sha(sha)));
            }
            out.push_str("```\n");
            out.push_str(&fence_safe(error));
            out.push_str("\n```\n");
            out.push_str(&format!("\n<sub>Updated {stamp}</sub>\n"));
        }
        CommentStatus::Removed { theme_id } => {
            out.push_str(&Marker { pr, theme_id: None }.render());
            out.push_str("\n### 🧹 Theme preview removed\n\n");
            match theme_id {
                Some(id) => out.push_str(&format!("Preview theme #{id} was deleted.\n")),
                None => out.push_str("No preview theme was found for this pull request.\n"),
            }
            out.push_str(&format!("\n<sub>Updated {stamp}</sub>\n"));
        }
    }
    out
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Keep CLI output from closing the code fence early.
fn fence_safe(text: &str) -> String {
    text.trim().replace("```", "'''")
}
