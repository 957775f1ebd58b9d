use super::{deploy, teardown, Globals, Session};
use crate::output::print_json;
use anyhow::Context;
use preview_core::event::{PreviewAction, PullRequestEvent};
use preview_core::preview::{PrContext, Previewer};
use std::path::Path;

pub fn run(globals: &Globals, path: &Path) -> anyhow::Result<()> {
    let event = PullRequestEvent::from_path(path)
        .with_context(|| format!("failed to read event {}", path.display()))?;
    let session = Session::load(globals)?;
    let pr = event.number();

    let action = event.action(&session.config);
    tracing::info!(pr, action = %event.action, decision = ?action, "pull request event");

    if let PreviewAction::Skip { reason } = &action {
        if globals.json {
            print_json(&serde_json::json!({ "pr": pr, "action": "skip", "reason": reason }))?;
        } else {
            println!("Skipped PR #{pr}: {reason}");
        }
        return Ok(());
    }

    let themes = session.themes()?;
    let github = session.github()?;
    let notifier = session.notifier();
    let repo = github.repo().to_string();
    let previewer = Previewer::new(&session.config, &themes, &github, &notifier, repo);

    let mut ctx = PrContext::from_pull(&event.pull_request);
    ctx.number = pr;

    match action {
        PreviewAction::Deploy => {
            let outcome = previewer
                .deploy(&ctx)
                .with_context(|| format!("preview deploy for PR #{pr} failed"))?;
            deploy::print_outcome(&outcome, globals.json)
        }
        PreviewAction::Teardown => {
            let outcome = previewer
                .teardown(&ctx)
                .with_context(|| format!("preview teardown for PR #{pr} failed"))?;
            teardown::print_outcome(&outcome, globals.json)
        }
        PreviewAction::Skip { .. } => Ok(()),
    }
}
