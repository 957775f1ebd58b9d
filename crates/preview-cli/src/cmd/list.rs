use super::{Globals, Session};
use crate::output::{print_json, print_table};
use preview_core::preview::list_previews;
use serde::Serialize;

#[derive(Serialize)]
struct Row<'a> {
    pr: u64,
    id: u64,
    name: &'a str,
    role: &'a str,
    preview_url: String,
}

pub fn run(globals: &Globals) -> anyhow::Result<()> {
    let session = Session::load(globals)?;
    let themes = session.themes()?;
    let previews = list_previews(&themes, &session.config.name_prefix)?;
    let store = &session.config.store;

    let rows: Vec<Row<'_>> = previews
        .iter()
        .map(|p| Row {
            pr: p.pr,
            id: p.theme.id,
            name: &p.theme.name,
            role: p.theme.role.as_str(),
            preview_url: shopify_theme::preview_url(store, p.theme.id),
        })
        .collect();

    if globals.json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No preview themes.");
        return Ok(());
    }
    let table: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.pr.to_string(),
                r.id.to_string(),
                r.role.to_string(),
                r.name.to_string(),
                r.preview_url.clone(),
            ]
        })
        .collect();
    print_table(&["PR", "THEME", "ROLE", "NAME", "PREVIEW"], &table);
    Ok(())
}
