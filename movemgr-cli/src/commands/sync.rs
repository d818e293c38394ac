//! Device sync commands: download, upload-set, upload-page, wipe.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::commands::build_manager;

/// Arguments for `movemgr download`.
#[derive(Args, Debug)]
pub struct DownloadArgs {}

impl DownloadArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        let mut manager = build_manager(db_root)?;
        let sets = manager
            .download_all_sets()
            .context("download from device failed")?;
        println!(
            "{} downloaded {} set(s) from the device",
            "✓".green(),
            sets.len()
        );
        for set in &sets {
            println!("  · {} ({}, slot {})", set.meta.name, set.meta.id, set.meta.index);
        }
        Ok(())
    }
}

/// Arguments for `movemgr upload-set`.
#[derive(Args, Debug)]
pub struct UploadSetArgs {
    /// Id of the locally stored set.
    pub set_id: String,

    /// Display name to upload under (default: stored name).
    #[arg(long)]
    pub name: Option<String>,

    /// Grid slot 0–31 (default: stored index).
    #[arg(long)]
    pub index: Option<u8>,

    /// Pad color 0–26 (default: stored color).
    #[arg(long)]
    pub color: Option<u8>,
}

impl UploadSetArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        let mut manager = build_manager(db_root)?;
        manager
            .upload_set(&self.set_id, self.name, self.index, self.color)
            .with_context(|| format!("upload of set '{}' failed", self.set_id))?;
        println!("{} uploaded set {}", "✓".green(), self.set_id);
        Ok(())
    }
}

/// Arguments for `movemgr upload-page`.
#[derive(Args, Debug)]
pub struct UploadPageArgs {
    /// Id of the page to push.
    pub page_id: String,
}

impl UploadPageArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        let mut manager = build_manager(db_root)?;
        manager
            .upload_page(&self.page_id)
            .with_context(|| format!("upload of page '{}' failed", self.page_id))?;
        println!("{} page {} is now on the device", "✓".green(), self.page_id);
        Ok(())
    }
}

/// Arguments for `movemgr wipe`.
#[derive(Args, Debug)]
pub struct WipeArgs {
    /// Skip the confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

impl WipeArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        if !self.yes {
            anyhow::bail!("this deletes every set on the device; re-run with --yes to confirm");
        }
        let mut manager = build_manager(db_root)?;
        manager
            .wipe_all_sets_on_device()
            .context("wipe failed")?;
        println!("{} device wiped", "✓".green());
        Ok(())
    }
}
