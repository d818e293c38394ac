//! `movemgr settings` — connection settings management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use movemgr_core::UserSettings;

use crate::commands::build_manager;

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print stored settings as JSON.
    Show,

    /// Save connection settings (overwrites the stored document).
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Path to the SSH private key authorized on the device.
    #[arg(long)]
    pub key_path: PathBuf,

    /// The key requires a passphrase at connect time.
    #[arg(long)]
    pub key_has_passphrase: bool,

    /// Hostname or address overriding the default `move.local`.
    #[arg(long)]
    pub hostname: Option<String>,

    /// SSH port overriding the default 22.
    #[arg(long)]
    pub port: Option<u16>,

    /// Account overriding the default `ableton`.
    #[arg(long)]
    pub username: Option<String>,
}

pub fn run(command: SettingsCommand, db_root: Option<PathBuf>) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            let manager = build_manager(db_root)?;
            match manager.user_settings()? {
                Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
                None => println!("No settings stored yet. Run `movemgr settings set`."),
            }
            Ok(())
        }
        SettingsCommand::Set(args) => {
            let mut manager = build_manager(db_root)?;
            let onboarding_completed = manager
                .user_settings()?
                .map(|s| s.onboarding_completed)
                .unwrap_or(true);
            let settings = UserSettings {
                ssh_private_key_path: args.key_path,
                ssh_key_has_passphrase: args.key_has_passphrase,
                ssh_custom_hostname: args.hostname,
                ssh_custom_port: args.port,
                ssh_custom_username: args.username,
                onboarding_completed,
            };
            manager.update_user_settings(&settings)?;
            println!("{} settings saved", "✓".green());
            Ok(())
        }
    }
}
