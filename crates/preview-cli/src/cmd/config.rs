use super::{Globals, Session};
use crate::output::print_json;
use clap::Subcommand;
use preview_core::config::WarnLevel;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config, defaults filled in
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(globals: &Globals, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    let session = Session::load(globals)?;
    match subcmd {
        ConfigSubcommand::Show => show(&session, globals.json),
        ConfigSubcommand::Validate => validate(&session, globals.json),
    }
}

fn show(session: &Session, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "path": session.config_path,
            "exists": session.config_path.exists(),
            "config": session.config,
        }));
    }
    if !session.config_path.exists() {
        println!("# {} not found; showing defaults", session.config_path.display());
    } else {
        println!("# {}", session.config_path.display());
    }
    print!("{}", serde_yaml::to_string(&session.config)?);
    Ok(())
}

fn validate(session: &Session, json: bool) -> anyhow::Result<()> {
    let warnings = session.config.validate();

    if json {
        print_json(&serde_json::json!({
            "path": session.config_path,
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
