//! `movemgr history` — change log of a set's primary content file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use crate::commands::build_manager;

/// Arguments for `movemgr history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Id of the locally stored set.
    pub set_id: String,

    /// Print the file content at this revision instead of the log.
    #[arg(long)]
    pub at: Option<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct RevisionRow {
    #[tabled(rename = "commit")]
    commit: String,
    #[tabled(rename = "date")]
    date: String,
    #[tabled(rename = "author")]
    author: String,
    #[tabled(rename = "message")]
    message: String,
}

impl HistoryArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        let manager = build_manager(db_root)?;

        if let Some(revision) = self.at {
            let content = manager
                .set_version_at_revision(&self.set_id, &revision)
                .with_context(|| {
                    format!("no version of set '{}' at revision {revision}", self.set_id)
                })?;
            print!("{content}");
            return Ok(());
        }

        let revisions = manager.set_file_revisions(&self.set_id);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&revisions)?);
            return Ok(());
        }
        if revisions.is_empty() {
            println!("No history for set '{}'.", self.set_id);
            return Ok(());
        }
        let rows: Vec<RevisionRow> = revisions
            .into_iter()
            .map(|r| RevisionRow {
                commit: r.abbreviated_commit,
                date: r.date,
                author: r.author.name,
                message: r.message,
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
