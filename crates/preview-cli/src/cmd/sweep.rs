use super::{Globals, Session};
use crate::output::{print_json, print_table};
use preview_core::preview::Previewer;

pub fn run(globals: &Globals, dry_run: bool) -> anyhow::Result<()> {
    let session = Session::load(globals)?;
    let themes = session.themes()?;
    let github = session.github()?;
    let notifier = session.notifier();

    let repo = github.repo().to_string();
    let previewer = Previewer::new(&session.config, &themes, &github, &notifier, repo);
    let report = previewer.sweep(dry_run)?;

    if globals.json {
        return print_json(&report);
    }
    if report.removed.is_empty() {
        println!("No stale previews. {} kept.", report.kept.len());
        return Ok(());
    }
    let rows: Vec<Vec<String>> = report
        .removed
        .iter()
        .map(|p| {
            vec![
                p.pr.to_string(),
                p.theme.id.to_string(),
                p.theme.name.clone(),
            ]
        })
        .collect();
    print_table(&["PR", "THEME", "NAME"], &rows);
    let verb = if dry_run { "Would delete" } else { "Deleted" };
    println!(
        "\n{verb} {} stale preview(s); {} kept.",
        report.removed.len(),
        report.kept.len()
    );
    Ok(())
}
