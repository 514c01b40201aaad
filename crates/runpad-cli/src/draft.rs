//! `draft` command: inspect and edit stored drafts.

use clap::Subcommand;
use runpad_core::{AutosavePolicy, DraftKey, DraftStore, RunnerConfig};
use serde_json::Value;

#[derive(Subcommand)]
pub enum DraftCommand {
    /// Print a draft as JSON
    Show {
        /// Draft key (one per editing surface)
        key: String,
    },

    /// Set one field of a draft
    Set {
        key: String,
        field: String,

        /// Value; parsed as JSON when possible, otherwise stored as a string
        value: String,
    },

    /// Reset a draft to its defaults
    Clear { key: String },
}

/// Execute a draft subcommand.
pub fn execute(command: DraftCommand, config: &RunnerConfig) -> anyhow::Result<()> {
    let mut store = DraftStore::open_dir(&config.drafts_dir, AutosavePolicy::WriteThrough);
    if store.is_degraded() {
        anyhow::bail!("drafts directory {} is not usable", config.drafts_dir.display());
    }

    let parse_key = |key: String| DraftKey::new(key).map_err(runpad_core::Error::from);

    match command {
        DraftCommand::Show { key } => {
            let key = parse_key(key)?;
            let record = store.get(&key);
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        DraftCommand::Set { key, field, value } => {
            let key = parse_key(key)?;
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            store.set_field(&key, field, value);
            if store.is_degraded() {
                anyhow::bail!("could not save draft {key}");
            }
        }
        DraftCommand::Clear { key } => {
            let key = parse_key(key)?;
            if store.clear(&key) {
                println!("cleared {key}");
            } else {
                println!("{key} is already empty");
            }
        }
    }
    Ok(())
}
