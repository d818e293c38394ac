//! `movemgr page` — page CRUD and activation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use movemgr_core::Page;

use crate::commands::build_manager;

#[derive(Subcommand, Debug)]
pub enum PageCommand {
    /// Print one page as JSON.
    Show(ShowArgs),

    /// Create an empty page, optionally activating it on a device.
    Create(CreateArgs),

    /// Delete a page from the local store.
    Delete(DeleteArgs),

    /// Make a page the active one for a device.
    Activate(ActivateArgs),

    /// Put a set into one of a page's grid slots.
    Assign(AssignArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub page_id: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub page_id: String,
    pub name: String,

    /// Device to activate the new page on.
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub page_id: String,
}

#[derive(Args, Debug)]
pub struct ActivateArgs {
    pub page_id: String,
    pub device_id: String,
}

#[derive(Args, Debug)]
pub struct AssignArgs {
    pub page_id: String,
    pub set_id: String,

    /// Grid slot 0–31.
    #[arg(long)]
    pub index: u8,

    /// Pad color 0–26.
    #[arg(long)]
    pub color: u8,

    /// Page-local display alias.
    #[arg(long)]
    pub alias: Option<String>,
}

pub fn run(command: PageCommand, db_root: Option<PathBuf>) -> Result<()> {
    match command {
        PageCommand::Show(args) => {
            let manager = build_manager(db_root)?;
            let page = manager
                .page(&args.page_id)?
                .with_context(|| format!("page '{}' not found", args.page_id))?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
        PageCommand::Create(args) => {
            let manager = build_manager(db_root)?;
            let page = Page {
                id: args.page_id.clone(),
                name: args.name,
                sets: vec![],
            };
            manager.create_page(&page, args.device.as_deref())?;
            println!("{} created page {}", "✓".green(), args.page_id);
            Ok(())
        }
        PageCommand::Delete(args) => {
            let manager = build_manager(db_root)?;
            manager.delete_page(&args.page_id)?;
            println!("{} deleted page {}", "✓".green(), args.page_id);
            Ok(())
        }
        PageCommand::Activate(args) => {
            let manager = build_manager(db_root)?;
            manager.set_active_page(&args.page_id, &args.device_id)?;
            println!(
                "{} page {} is active on {}",
                "✓".green(),
                args.page_id,
                args.device_id
            );
            Ok(())
        }
        PageCommand::Assign(args) => {
            let manager = build_manager(db_root)?;
            let mut page = manager
                .page(&args.page_id)?
                .with_context(|| format!("page '{}' not found", args.page_id))?;
            let entry = movemgr_core::SetInPage {
                id: args.set_id.clone(),
                alias: args.alias,
                color: args.color,
                index: args.index,
            };
            match page.sets.iter_mut().find(|s| s.id == entry.id) {
                Some(existing) => *existing = entry,
                None => page.sets.push(entry),
            }
            manager.update_page(&page)?;
            println!(
                "{} set {} assigned to slot {} of {}",
                "✓".green(),
                args.set_id,
                args.index,
                args.page_id
            );
            Ok(())
        }
    }
}
