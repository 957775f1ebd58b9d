use super::{Globals, Session};
use crate::output::print_json;
use anyhow::Context;
use preview_core::github::ReviewHost;
use preview_core::preview::{PrContext, Previewer, TeardownOutcome};

pub fn run(globals: &Globals, pr: u64) -> anyhow::Result<()> {
    let session = Session::load(globals)?;
    let themes = session.themes()?;
    let github = session.github()?;
    let notifier = session.notifier();

    let ctx = match github.get_pull(pr) {
        Ok(pull) => PrContext::from_pull(&pull),
        Err(e) => {
            tracing::warn!(pr, error = %e, "could not fetch pull request");
            PrContext {
                number: pr,
                ..PrContext::default()
            }
        }
    };

    let repo = github.repo().to_string();
    let previewer = Previewer::new(&session.config, &themes, &github, &notifier, repo);
    let outcome = previewer
        .teardown(&ctx)
        .with_context(|| format!("preview teardown for PR #{pr} failed"))?;
    print_outcome(&outcome, globals.json)
}

pub fn print_outcome(outcome: &TeardownOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }
    if outcome.deleted.is_empty() {
        println!("No preview theme for PR #{}.", outcome.pr);
    } else {
        let ids: Vec<String> = outcome.deleted.iter().map(|id| format!("#{id}")).collect();
        println!(
            "Deleted preview theme {} for PR #{}",
            ids.join(", "),
            outcome.pr
        );
    }
    Ok(())
}
