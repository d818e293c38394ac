//! Read-only listings of local sets, pages and devices.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use crate::commands::build_manager;

/// Shared arguments for the listing commands.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SetRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "slot")]
    index: u8,
    #[tabled(rename = "color")]
    color: u8,
    #[tabled(rename = "device")]
    device: String,
}

#[derive(Tabled)]
struct PageRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "sets")]
    sets: usize,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "active page")]
    current_page: String,
}

impl ListArgs {
    pub fn run_sets(self, db_root: Option<PathBuf>) -> Result<()> {
        let manager = build_manager(db_root)?;
        let sets = manager.all_sets()?;
        if self.json {
            let values: Vec<_> = sets
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.meta.id,
                        "name": s.meta.name,
                        "index": s.meta.index,
                        "color": s.meta.color,
                        "deviceId": s.manager_meta.move_device_id,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
            return Ok(());
        }
        if sets.is_empty() {
            println!("No sets stored. Run `movemgr download` first.");
            return Ok(());
        }
        let rows: Vec<SetRow> = sets
            .into_iter()
            .map(|s| SetRow {
                id: s.meta.id,
                name: s.meta.name,
                index: s.meta.index,
                color: s.meta.color,
                device: s.manager_meta.move_device_id,
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }

    pub fn run_pages(self, db_root: Option<PathBuf>) -> Result<()> {
        let manager = build_manager(db_root)?;
        let pages = manager.all_pages()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&pages)?);
            return Ok(());
        }
        if pages.is_empty() {
            println!("No pages yet.");
            return Ok(());
        }
        let rows: Vec<PageRow> = pages
            .into_iter()
            .map(|p| PageRow {
                id: p.id,
                name: p.name,
                sets: p.sets.len(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }

    pub fn run_devices(self, db_root: Option<PathBuf>) -> Result<()> {
        let manager = build_manager(db_root)?;
        let devices = manager.all_devices()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&devices)?);
            return Ok(());
        }
        if devices.is_empty() {
            println!("No devices seen yet. Run `movemgr download` first.");
            return Ok(());
        }
        let rows: Vec<DeviceRow> = devices
            .into_iter()
            .map(|d| DeviceRow {
                id: d.id,
                name: d.name,
                current_page: d.current_page_id,
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
        Ok(())
    }
}
