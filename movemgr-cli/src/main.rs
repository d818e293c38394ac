//! movemgr — Move device set/page sync CLI.
//!
//! # Usage
//!
//! ```text
//! movemgr download
//! movemgr upload-set <set-id> [--name <n>] [--index <i>] [--color <c>]
//! movemgr upload-page <page-id>
//! movemgr wipe
//! movemgr sets | pages | devices [--json]
//! movemgr page show|create|delete|activate ...
//! movemgr settings show|set ...
//! movemgr auth start|submit <secret>
//! movemgr bundles <target-dir>
//! movemgr history <set-id> [--at <revision>]
//! ```
//!
//! The local store lives at `~/.movemanager/db` unless `--db-root` says
//! otherwise.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    auth::{AuthCommand, BundlesArgs},
    history::HistoryArgs,
    list::ListArgs,
    page::PageCommand,
    settings::SettingsCommand,
    sync::{DownloadArgs, UploadPageArgs, UploadSetArgs, WipeArgs},
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "movemgr",
    version,
    about = "Sync Move device sets and pages with a git-backed local store",
    long_about = None,
)]
struct Cli {
    /// Local store root (default: ~/.movemanager/db).
    #[arg(long, global = true)]
    db_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download every set from the device into the local store.
    Download(DownloadArgs),

    /// Upload one local set to a device grid slot.
    UploadSet(UploadSetArgs),

    /// Wipe the device and push a page's slot layout onto it.
    UploadPage(UploadPageArgs),

    /// Delete every set on the device.
    Wipe(WipeArgs),

    /// List local sets.
    Sets(ListArgs),

    /// List local pages.
    Pages(ListArgs),

    /// List known devices.
    Devices(ListArgs),

    /// Create, show, delete or activate pages.
    Page {
        #[command(subcommand)]
        command: PageCommand,
    },

    /// Show or update user settings.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Challenge-response authorization for bundle downloads.
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Download every device set's .abl bundle.
    Bundles(BundlesArgs),

    /// Show a set's revision history from the local store.
    History(HistoryArgs),
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let db_root = cli.db_root;
    match cli.command {
        Commands::Download(args) => args.run(db_root),
        Commands::UploadSet(args) => args.run(db_root),
        Commands::UploadPage(args) => args.run(db_root),
        Commands::Wipe(args) => args.run(db_root),
        Commands::Sets(args) => args.run_sets(db_root),
        Commands::Pages(args) => args.run_pages(db_root),
        Commands::Devices(args) => args.run_devices(db_root),
        Commands::Page { command } => commands::page::run(command, db_root),
        Commands::Settings { command } => commands::settings::run(command, db_root),
        Commands::Auth { command } => commands::auth::run(command, db_root),
        Commands::Bundles(args) => args.run(db_root),
        Commands::History(args) => args.run(db_root),
    }
}
