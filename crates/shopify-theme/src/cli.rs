use crate::parse::{parse_push_output, parse_theme_list};
use crate::process::run_with_retry;
use crate::types::{CliOptions, PullSource, PushTarget, PushedTheme, Theme};
use crate::{Result, ThemeCliError};

/// Handle on the vendor CLI for one store and one theme directory.
#[derive(Debug, Clone)]
pub struct ThemeCli {
    opts: CliOptions,
}

impl ThemeCli {
    pub fn new(opts: CliOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CliOptions {
        &self.opts
    }

    /// `theme list --json`
    pub fn list(&self) -> Result<Vec<Theme>> {
        let args = self.base_args(&["list", "--json"]);
        let captured = run_with_retry(&self.opts, &args, None)?;
        parse_theme_list(&captured.stdout).ok_or_else(|| ThemeCliError::Parse {
            command: "theme list".into(),
            reason: "no theme array in output".into(),
            output: captured.combined(),
        })
    }

    /// `theme push --json`, creating or overwriting per `target`.
    ///
    /// The store and id are always known after a successful push, so missing
    /// preview/editor links are filled in from them.
    pub fn push(&self, target: &PushTarget) -> Result<PushedTheme> {
        let mut args = self.base_args(&["push", "--json"]);
        args.push("--path".into());
        args.push(self.opts.path.display().to_string());
        let id = match target {
            PushTarget::New { name } => {
                args.extend(["--unpublished".into(), "--theme".into(), name.clone()]);
                None
            }
            PushTarget::Existing { id } => {
                args.extend(["--theme".into(), id.to_string()]);
                Some(*id)
            }
        };
        for pattern in &self.opts.ignore {
            args.push("--ignore".into());
            args.push(pattern.clone());
        }

        let captured = run_with_retry(&self.opts, &args, id)?;
        let mut pushed =
            parse_push_output(&captured.stdout).ok_or_else(|| ThemeCliError::Parse {
                command: "theme push".into(),
                reason: "no theme id in output".into(),
                output: captured.combined(),
            })?;

        if pushed.name.is_empty() {
            if let PushTarget::New { name } = target {
                pushed.name = name.clone();
            }
        }
        if pushed.preview_url.is_none() {
            pushed.preview_url = Some(preview_url(&self.opts.store, pushed.id));
        }
        if pushed.editor_url.is_none() {
            pushed.editor_url = Some(editor_url(&self.opts.store, pushed.id));
        }
        tracing::info!(theme_id = pushed.id, name = %pushed.name, "theme pushed");
        Ok(pushed)
    }

    /// `theme pull` into the configured theme directory, restricted to `only`
    /// globs when non-empty.
    pub fn pull(&self, source: &PullSource, only: &[String]) -> Result<()> {
        let mut args = self.base_args(&["pull"]);
        args.push("--path".into());
        args.push(self.opts.path.display().to_string());
        let id = match source {
            PullSource::Live => {
                args.push("--live".into());
                None
            }
            PullSource::Theme { id } => {
                args.extend(["--theme".into(), id.to_string()]);
                Some(*id)
            }
        };
        for pattern in only {
            args.push("--only".into());
            args.push(pattern.clone());
        }
        run_with_retry(&self.opts, &args, id)?;
        Ok(())
    }

    /// `theme delete --force`. A theme that is already gone yields
    /// [`ThemeCliError::NotFound`].
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut args = self.base_args(&["delete", "--force"]);
        args.extend(["--theme".into(), id.to_string()]);
        run_with_retry(&self.opts, &args, Some(id))?;
        tracing::info!(theme_id = id, "theme deleted");
        Ok(())
    }

    fn base_args(&self, head: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = head.iter().map(|s| s.to_string()).collect();
        if !self.opts.store.is_empty() {
            args.push("--store".into());
            args.push(self.opts.store.clone());
        }
        args
    }
}

/// Storefront link that renders the theme without publishing it.
pub fn preview_url(store: &str, id: u64) -> String {
    format!("https://{}/?preview_theme_id={id}", store_host(store))
}

/// Admin link to the theme editor.
pub fn editor_url(store: &str, id: u64) -> String {
    format!("https://{}/admin/themes/{id}/editor", store_host(store))
}

fn store_host(store: &str) -> &str {
    store
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}
