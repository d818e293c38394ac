//! Subcommand implementations.

pub mod auth;
pub mod history;
pub mod list;
pub mod page;
pub mod settings;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use movemgr_client::{DeviceConfig, RestApiClient, SshDeviceClient};
use movemgr_store::LocalStore;
use movemgr_sync::MoveManager;

/// The manager type every command drives.
pub type Manager = MoveManager<SshDeviceClient, RestApiClient>;

/// Resolve the local store root: `--db-root` or `~/.movemanager/db`.
pub fn resolve_db_root(db_root: Option<PathBuf>) -> Result<PathBuf> {
    match db_root {
        Some(root) => Ok(root),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            Ok(home.join(".movemanager").join("db"))
        }
    }
}

/// Build a manager over the real SSH and HTTP clients.
///
/// The device config starts from stock defaults; stored user settings
/// override it when the first session opens.
pub fn build_manager(db_root: Option<PathBuf>) -> Result<Manager> {
    let root = resolve_db_root(db_root)?;
    let store = LocalStore::open(&root)
        .with_context(|| format!("failed to open local store at {}", root.display()))?;

    let home = dirs::home_dir().context("could not determine home directory")?;
    let config = DeviceConfig::new(home.join(".ssh").join("id_ed25519"));
    let rest = RestApiClient::new(&format!("http://{}", config.host));
    let device = SshDeviceClient::new(config);
    Ok(MoveManager::new(store, device, rest))
}
