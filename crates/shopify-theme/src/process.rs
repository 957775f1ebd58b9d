use std::process::{Command, Stdio};
use std::time::Duration;

use crate::types::{CliOptions, RetryPolicy, NOT_FOUND_MARKERS, THEME_LIMIT_MARKERS};
use crate::{Result, ThemeCliError};

// ─── Captured output ──────────────────────────────────────────────────────

/// Output of a single finished invocation.
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub(crate) success: bool,
    pub(crate) code: Option<i32>,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl Captured {
    /// Stdout and stderr joined, for substring classification and error text.
    pub(crate) fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.trim().to_string(),
            (false, true) => self.stdout.trim().to_string(),
            (false, false) => format!("{}\n{}", self.stdout.trim(), self.stderr.trim()),
        }
    }
}

// ─── Failure classification ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    Transient,
    ThemeLimit,
    NotFound,
    Fatal,
}

/// Case-insensitive substring match. Purely numeric markers (HTTP status
/// codes) only match when not embedded in a longer run of digits, so a theme
/// id such as `1502993` never reads as a 502.
pub(crate) fn contains_marker(haystack: &str, marker: &str) -> bool {
    let haystack = haystack.to_ascii_lowercase();
    let marker = marker.trim().to_ascii_lowercase();
    if marker.is_empty() {
        return false;
    }
    if !marker.bytes().all(|b| b.is_ascii_digit()) {
        return haystack.contains(&marker);
    }
    let bytes = haystack.as_bytes();
    haystack.match_indices(&marker).any(|(start, m)| {
        let before = start.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(start + m.len()).copied();
        !before.is_some_and(|b| b.is_ascii_digit()) && !after.is_some_and(|b| b.is_ascii_digit())
    })
}

pub(crate) fn classify(output: &str, policy: &RetryPolicy) -> FailureKind {
    if THEME_LIMIT_MARKERS.iter().any(|m| contains_marker(output, m)) {
        return FailureKind::ThemeLimit;
    }
    if NOT_FOUND_MARKERS.iter().any(|m| contains_marker(output, m)) {
        return FailureKind::NotFound;
    }
    if policy
        .transient_markers
        .iter()
        .any(|m| contains_marker(output, m))
    {
        return FailureKind::Transient;
    }
    FailureKind::Fatal
}

/// Exponential backoff: `base * 2^(attempt-1)`, exponent capped at 10.
pub fn retry_delay_ms(base_delay_ms: u64, attempt: u32) -> u64 {
    if base_delay_ms == 0 {
        return 0;
    }
    let exponent = attempt.saturating_sub(1).min(10);
    base_delay_ms.saturating_mul(1_u64 << exponent)
}

// ─── Runner ───────────────────────────────────────────────────────────────

/// Runs `<executable> theme <args…>` once and captures its output.
pub(crate) fn run_once(opts: &CliOptions, args: &[String]) -> Result<Captured> {
    let mut cmd = Command::new(&opts.executable);
    cmd.arg("theme").args(args);
    for (k, v) in &opts.env {
        cmd.env(k, v);
    }
    // The CLI prompts for confirmation on a TTY; keep it non-interactive.
    cmd.env("CI", "1");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().map_err(|source| ThemeCliError::Spawn {
        executable: opts.executable.display().to_string(),
        source,
    })?;

    Ok(Captured {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Runs an invocation, retrying transient failures with exponential backoff.
///
/// A run that exits zero is returned as-is. A failed run is classified by its
/// output: theme-limit and not-found failures map to their own error variants
/// without retrying, transient failures are retried until the policy's
/// attempt budget is spent, and anything else fails immediately.
///
/// `id` is the theme the invocation targets, if any; a not-found failure is
/// only reported as [`ThemeCliError::NotFound`] when it is known.
pub(crate) fn run_with_retry(
    opts: &CliOptions,
    args: &[String],
    id: Option<u64>,
) -> Result<Captured> {
    let policy = &opts.retry;
    let max_attempts = policy.max_attempts.max(1);
    let command = render_command(args);
    let mut attempt = 0_u32;

    loop {
        attempt += 1;
        tracing::debug!(command = %command, attempt, "running theme cli");
        let captured = run_once(opts, args)?;
        if captured.success {
            return Ok(captured);
        }

        let output = captured.combined();
        match (classify(&output, policy), id) {
            (FailureKind::ThemeLimit, _) => return Err(ThemeCliError::ThemeLimit { output }),
            (FailureKind::NotFound, Some(id)) => return Err(ThemeCliError::NotFound { id }),
            (FailureKind::Transient, _) if attempt < max_attempts => {
                let delay = retry_delay_ms(policy.base_delay_ms, attempt);
                tracing::warn!(
                    command = %command,
                    attempt,
                    max_attempts,
                    delay_ms = delay,
                    "transient theme cli failure, retrying"
                );
                if delay > 0 {
                    std::thread::sleep(Duration::from_millis(delay));
                }
            }
            (FailureKind::Transient, _) => {
                return Err(ThemeCliError::RetriesExhausted {
                    attempts: attempt,
                    output,
                })
            }
            (FailureKind::NotFound | FailureKind::Fatal, _) => {
                return Err(ThemeCliError::Failed {
                    command,
                    code: captured.code,
                    output,
                })
            }
        }
    }
}

fn render_command(args: &[String]) -> String {
    let mut rendered = String::from("theme");
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}
