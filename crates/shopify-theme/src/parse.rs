//! Tolerant extraction of JSON payloads from `shopify theme … --json` output.
//!
//! The CLI interleaves banners, upgrade notices and progress lines with the
//! JSON document, so stdout is rarely valid JSON on its own. Each extractor
//! tries the whole text first, then the outermost bracketed span, then a
//! line-by-line scan, and finally (for push) a regex fallback.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::types::{PushedTheme, Theme, ThemeRole};

/// Parse the first JSON value of type `T` found in `output`.
pub(crate) fn extract_json<T: DeserializeOwned>(output: &str, open: char, close: char) -> Option<T> {
    let trimmed = output.trim();
    if let Ok(v) = serde_json::from_str::<T>(trimmed) {
        return Some(v);
    }

    if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
        if start < end {
            if let Ok(v) = serde_json::from_str::<T>(&trimmed[start..=end]) {
                return Some(v);
            }
        }
    }

    // One document per line (some CLI versions print a JSON log stream).
    trimmed
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with(open))
        .find_map(|l| serde_json::from_str::<T>(l).ok())
}

/// Parse `theme list --json`.
pub(crate) fn parse_theme_list(output: &str) -> Option<Vec<Theme>> {
    if let Some(themes) = extract_json::<Vec<Theme>>(output, '[', ']') {
        return Some(themes);
    }
    // Some versions wrap the array: {"themes": [...]}.
    #[derive(Deserialize)]
    struct Wrapped {
        themes: Vec<Theme>,
    }
    extract_json::<Wrapped>(output, '{', '}').map(|w| w.themes)
}

/// Parse `theme push --json`, which reports `{"theme": {...}}`.
pub(crate) fn parse_push_output(output: &str) -> Option<PushedTheme> {
    #[derive(Deserialize)]
    struct Envelope {
        theme: PushedTheme,
    }
    if let Some(env) = extract_json::<Envelope>(output, '{', '}') {
        return Some(env.theme);
    }
    if let Some(theme) = extract_json::<PushedTheme>(output, '{', '}') {
        return Some(theme);
    }
    scrape_push_output(output)
}

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""id"\s*:\s*(\d+)"#).unwrap())
}

fn preview_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https://[^\s"']*preview_theme_id=(\d+)"#).unwrap())
}

fn editor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https://[^\s"']*/admin/themes/(\d+)/editor"#).unwrap())
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""name"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap())
}

/// Last resort for truncated or malformed JSON: pull the id and URLs out
/// of the raw text.
fn scrape_push_output(output: &str) -> Option<PushedTheme> {
    let preview = preview_re().captures(output);
    let editor = editor_re().captures(output);

    let id = id_re()
        .captures(output)
        .and_then(|c| c[1].parse::<u64>().ok())
        .or_else(|| preview.as_ref().and_then(|c| c[1].parse().ok()))
        .or_else(|| editor.as_ref().and_then(|c| c[1].parse().ok()))?;

    Some(PushedTheme {
        id,
        name: name_re()
            .captures(output)
            .map(|c| c[1].replace("\\\"", "\""))
            .unwrap_or_default(),
        role: ThemeRole::Unpublished,
        preview_url: preview.map(|c| c[0].to_string()),
        editor_url: editor.map(|c| c[0].to_string()),
    })
}
