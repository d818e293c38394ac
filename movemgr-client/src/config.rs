//! Connection configuration for the device session.

use std::path::PathBuf;

use movemgr_core::UserSettings;

/// Hostname the device announces on the local network.
pub const DEFAULT_HOST: &str = "move.local";

/// Standard SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Fixed account the device firmware ships with.
pub const DEFAULT_USERNAME: &str = "ableton";

/// Parameters for one SSH/SFTP session. Built explicitly by the caller;
/// user settings override the defaults through [`DeviceConfig::apply_settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    /// Key passphrase, prompted at runtime. Never persisted.
    pub passphrase: Option<String>,
}

impl DeviceConfig {
    /// Config with stock host/port/account and the given private key.
    pub fn new(private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            private_key_path: private_key_path.into(),
            passphrase: None,
        }
    }

    /// Overlay stored user settings. Absent custom values leave the current
    /// parameter untouched; the passphrase is runtime-only and never comes
    /// from settings.
    pub fn apply_settings(&mut self, settings: &UserSettings) {
        self.private_key_path = settings.ssh_private_key_path.clone();
        if let Some(host) = &settings.ssh_custom_hostname {
            self.host = host.clone();
        }
        if let Some(port) = settings.ssh_custom_port {
            self.port = port;
        }
        if let Some(username) = &settings.ssh_custom_username {
            self.username = username.clone();
        }
    }
}
