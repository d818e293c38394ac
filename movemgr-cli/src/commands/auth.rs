//! `movemgr auth` and `movemgr bundles` — challenge-response authorization
//! and cookie-authenticated bundle downloads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::commands::build_manager;

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Ask the device to display a one-time code on its screen.
    Start,

    /// Submit the code shown on the device to obtain the session cookie.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// The code the device displayed.
    pub secret: String,
}

pub fn run(command: AuthCommand, db_root: Option<PathBuf>) -> Result<()> {
    match command {
        AuthCommand::Start => {
            let mut manager = build_manager(db_root)?;
            manager
                .start_rest_api_challenge()
                .context("challenge request failed")?;
            println!("{} challenge sent — read the code off the device screen", "✓".green());
            Ok(())
        }
        AuthCommand::Submit(args) => {
            let mut manager = build_manager(db_root)?;
            match manager.submit_rest_api_challenge_response(&args.secret)? {
                Some(_) => println!("{} authorized for bundle downloads", "✓".green()),
                None => println!(
                    "{} device accepted the code but returned no token; try again",
                    "!".yellow()
                ),
            }
            Ok(())
        }
    }
}

/// Arguments for `movemgr bundles`.
#[derive(Args, Debug)]
pub struct BundlesArgs {
    /// Directory the .abl files are written into.
    pub target_dir: PathBuf,
}

impl BundlesArgs {
    pub fn run(self, db_root: Option<PathBuf>) -> Result<()> {
        let mut manager = build_manager(db_root)?;
        let paths = manager
            .download_all_abl_bundles(&self.target_dir)
            .context("bundle download failed — is the auth cookie still valid?")?;
        println!("{} downloaded {} bundle(s)", "✓".green(), paths.len());
        for path in &paths {
            println!("  · {}", path.display());
        }
        Ok(())
    }
}
