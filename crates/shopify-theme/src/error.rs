use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeCliError {
    #[error("failed to spawn '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}\n{output}", exit_label(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("could not parse `{command}` output: {reason}\n  output: {output}")]
    Parse {
        command: String,
        reason: String,
        output: String,
    },

    #[error("theme {id} not found on the store")]
    NotFound { id: u64 },

    #[error("store theme limit reached\n{output}")]
    ThemeLimit { output: String },

    #[error("gave up after {attempts} attempts\n{output}")]
    RetriesExhausted { attempts: u32, output: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

impl ThemeCliError {
    /// True when the store refused a new theme because it is full.
    pub fn is_theme_limit(&self) -> bool {
        matches!(self, ThemeCliError::ThemeLimit { .. })
    }
}
