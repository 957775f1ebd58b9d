use super::{Globals, Session};
use crate::output::print_json;
use anyhow::Context;
use preview_core::github::ReviewHost;
use preview_core::preview::{DeployOutcome, PrContext, Previewer};

pub fn run(
    globals: &Globals,
    pr: u64,
    branch: Option<String>,
    sha: Option<String>,
) -> anyhow::Result<()> {
    let session = Session::load(globals)?;
    let themes = session.themes()?;
    let github = session.github()?;
    let notifier = session.notifier();

    let mut ctx = match github.get_pull(pr) {
        Ok(pull) => PrContext::from_pull(&pull),
        // The branch is all a theme name needs; the rest is decoration.
        Err(e) if branch.is_some() => {
            tracing::warn!(pr, error = %e, "could not fetch pull request, using --branch");
            PrContext {
                number: pr,
                ..PrContext::default()
            }
        }
        Err(e) => return Err(e).with_context(|| format!("failed to fetch PR #{pr}")),
    };
    if let Some(branch) = branch {
        ctx.branch = branch;
    }
    if let Some(sha) = sha {
        ctx.sha = Some(sha);
    }

    let repo = github.repo().to_string();
    let previewer = Previewer::new(&session.config, &themes, &github, &notifier, repo);
    let outcome = previewer
        .deploy(&ctx)
        .with_context(|| format!("preview deploy for PR #{pr} failed"))?;
    print_outcome(&outcome, globals.json)
}

pub fn print_outcome(outcome: &DeployOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }
    let verb = if outcome.created { "Created" } else { "Updated" };
    println!(
        "{verb} preview theme #{} '{}' for PR #{}",
        outcome.theme.id, outcome.theme.name, outcome.pr
    );
    if let Some(url) = &outcome.theme.preview_url {
        println!("  preview: {url}");
    }
    if let Some(url) = &outcome.theme.editor_url {
        println!("  editor:  {url}");
    }
    for gone in &outcome.evicted {
        println!(
            "  evicted: #{} '{}' (PR #{})",
            gone.theme.id, gone.theme.name, gone.pr
        );
    }
    Ok(())
}
