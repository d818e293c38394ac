//! SSH/SFTP device client.
//!
//! One [`SshDeviceClient`] owns at most one live session. `connect` and
//! `disconnect` are idempotent; every other operation requires a connected
//! session and fails with [`ClientError::NotConnected`] otherwise.
//!
//! File content moves over SFTP; metadata moves over remote shell commands
//! (`getfattr`/`setfattr`), because the SFTP protocol has no extended
//! attribute support.

use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{Session, Sftp};

use movemgr_core::device::{remote_set_dir, DEVICE_SET_DIR_PATH, SET_FOLDER_PLACEHOLDER};
use movemgr_core::{validate, Set, SetMetadata, UserSettings};

use crate::config::DeviceConfig;
use crate::copy::{copy_recursive_from_remote, copy_recursive_to_remote, remote_join, CopyPolicy};
use crate::error::ClientError;
use crate::xattr;

/// Shell pipeline that prints the MAC of `eth0`, falling back to the first
/// non-loopback hardware address when `eth0` is absent.
const MAC_ADDRESS_CMD: &str = r#"ip link show eth0 2>/dev/null | awk '/link\/ether/ {print $2}' || ip link | awk '/^[0-9]+: / { iface=$2; sub(/:$/, "", iface); found=0 } /^[0-9]+: .*mtu/ { found=1 } /^[[:space:]]+link\/ether/ { if (iface != "lo" && found) { print $2; exit } }'"#;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Operations the sync orchestrator needs from a device session. Implemented
/// by [`SshDeviceClient`] for real hardware and by in-memory fakes in tests.
pub trait DeviceClient {
    /// Open the session. No-op when already connected.
    fn connect(&mut self) -> Result<(), ClientError>;

    /// Close the session. No-op when not connected.
    fn disconnect(&mut self) -> Result<(), ClientError>;

    /// Enumerate the sets currently on the device.
    fn list_sets(&mut self) -> Result<Vec<Set>, ClientError>;

    /// Copy a set's bundle tree into `target_dir/<set_id>` and return it
    /// with its metadata and new local path.
    fn download_set(&mut self, set_id: &str, target_dir: &Path) -> Result<Set, ClientError>;

    /// Push a local bundle onto the device under the set's id, rename the
    /// placeholder folder to the display name, and write back metadata.
    fn upload_set(&mut self, set: &Set) -> Result<Set, ClientError>;

    /// Remove the set's directory tree from the device.
    fn delete_set(&mut self, set_id: &str) -> Result<(), ClientError>;

    /// The device's primary MAC address, lower-cased, or `None` when the
    /// lookup pipeline finds nothing.
    fn mac_address(&mut self) -> Result<Option<String>, ClientError>;

    /// Overlay stored user settings onto the connection parameters. Takes
    /// effect on the next `connect`.
    fn apply_settings(&mut self, settings: &UserSettings);
}

// ---------------------------------------------------------------------------
// SSH implementation
// ---------------------------------------------------------------------------

struct CommandOutput {
    stdout: String,
    stderr: String,
    status: i32,
}

/// The real client. See the module docs for the session model.
pub struct SshDeviceClient {
    config: DeviceConfig,
    session: Option<Session>,
    sftp: Option<Sftp>,
    upload_policy: CopyPolicy,
    download_policy: CopyPolicy,
}

impl SshDeviceClient {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            session: None,
            sftp: None,
            upload_policy: CopyPolicy::upload_default(),
            download_policy: CopyPolicy::download_default(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Replace the exclusion policy applied to uploads.
    pub fn set_upload_policy(&mut self, policy: CopyPolicy) {
        self.upload_policy = policy;
    }

    fn sftp(&self) -> Result<&Sftp, ClientError> {
        self.sftp.as_ref().ok_or(ClientError::NotConnected)
    }

    fn exec(&self, command: &str) -> Result<CommandOutput, ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotConnected)?;
        let mut channel = session.channel_session()?;
        channel.exec(command)?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| exec_err(command, e))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| exec_err(command, e))?;
        channel.wait_close()?;
        let status = channel.exit_status()?;

        Ok(CommandOutput {
            stdout,
            stderr,
            status,
        })
    }

    /// Run a remote command that must succeed; non-zero exit becomes an
    /// error carrying the remote stderr.
    fn exec_checked(&self, command: &str) -> Result<CommandOutput, ClientError> {
        let output = self.exec(command)?;
        if output.status != 0 {
            return Err(ClientError::RemoteCommand {
                command: command.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    fn set_extended_attribute(&self, path: &str, key: &str, value: &str) -> Result<(), ClientError> {
        let command = format!(
            "setfattr -n {} -v {} {}",
            shell_quote(key),
            shell_quote(value),
            shell_quote(path)
        );
        self.exec_checked(&command).map(|_| ())
    }

    /// Read a set's metadata: extended attributes off the id-named directory
    /// plus the inner bundle directory's name as the display name.
    fn set_metadata(&self, set_id: &str) -> Result<SetMetadata, ClientError> {
        let set_dir = remote_set_dir(set_id);
        let dump = self.exec_checked(&format!("getfattr -d -m . {}", shell_quote(&set_dir)))?;
        let attrs = xattr::parse_attr_dump(&dump.stdout);

        let entries = self.sftp()?.readdir(Path::new(&set_dir))?;
        let inner_dirs: Vec<&PathBuf> = entries
            .iter()
            .filter(|(_, stat)| stat.is_dir())
            .map(|(path, _)| path)
            .collect();
        if inner_dirs.len() != 1 {
            return Err(ClientError::CorruptSetDir {
                path: set_dir,
                found: inner_dirs.len(),
            });
        }
        let name = inner_dirs[0]
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        xattr::metadata_from_attrs(set_id, &name, &set_dir, &attrs)
    }
}

impl DeviceClient for SshDeviceClient {
    fn connect(&mut self) -> Result<(), ClientError> {
        if self.session.is_some() {
            return Ok(());
        }
        let tcp = TcpStream::connect((self.config.host.as_str(), self.config.port)).map_err(
            |source| ClientError::Connect {
                host: self.config.host.clone(),
                port: self.config.port,
                source,
            },
        )?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        session.userauth_pubkey_file(
            &self.config.username,
            None,
            &self.config.private_key_path,
            self.config.passphrase.as_deref(),
        )?;
        self.sftp = Some(session.sftp()?);
        self.session = Some(session);
        log::debug!(
            "connected to {}:{} as {}",
            self.config.host,
            self.config.port,
            self.config.username
        );
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ClientError> {
        self.sftp = None;
        if let Some(session) = self.session.take() {
            session.disconnect(None, "session closed", None)?;
            log::debug!("disconnected from {}", self.config.host);
        }
        Ok(())
    }

    fn list_sets(&mut self) -> Result<Vec<Set>, ClientError> {
        let entries = self.sftp()?.readdir(Path::new(DEVICE_SET_DIR_PATH))?;
        let mut sets = Vec::new();
        for (path, stat) in entries {
            if !stat.is_dir() {
                continue;
            }
            let set_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let meta = self.set_metadata(&set_id)?;
            sets.push(Set { path, meta });
        }
        Ok(sets)
    }

    fn download_set(&mut self, set_id: &str, target_dir: &Path) -> Result<Set, ClientError> {
        let meta = self.set_metadata(set_id)?;
        let remote_dir = remote_set_dir(set_id);
        copy_recursive_from_remote(
            self.sftp()?,
            target_dir,
            Path::new(&remote_dir),
            &self.download_policy,
        )?;
        Ok(Set {
            path: target_dir.join(set_id),
            meta,
        })
    }

    fn upload_set(&mut self, set: &Set) -> Result<Set, ClientError> {
        validate::check_index(set.meta.index)?;
        validate::check_color(set.meta.color)?;
        let name = validate::check_name(&set.meta.name)?;

        let set_dir = PathBuf::from(remote_set_dir(&set.meta.id));
        copy_recursive_to_remote(
            self.sftp()?,
            &set.path,
            Path::new(DEVICE_SET_DIR_PATH),
            &self.upload_policy,
        )?;

        // The bundle travels under the placeholder name; the device expects
        // it named after the set.
        self.sftp()?.rename(
            &remote_join(&set_dir, SET_FOLDER_PLACEHOLDER),
            &remote_join(&set_dir, &name),
            None,
        )?;

        let meta = SetMetadata {
            name,
            ..set.meta.clone()
        };
        let set_dir_str = set_dir.display().to_string();
        for (key, value) in xattr::attr_writes(&meta) {
            self.set_extended_attribute(&set_dir_str, key, &value)?;
        }

        Ok(Set {
            path: set_dir,
            meta,
        })
    }

    fn delete_set(&mut self, set_id: &str) -> Result<(), ClientError> {
        let command = format!("rm -r {}", shell_quote(&remote_set_dir(set_id)));
        self.exec_checked(&command).map(|_| ())
    }

    fn mac_address(&mut self) -> Result<Option<String>, ClientError> {
        let output = self.exec(MAC_ADDRESS_CMD)?;
        if !output.stderr.trim().is_empty() {
            log::error!("error getting MAC address: {}", output.stderr.trim());
            return Ok(None);
        }
        let mac = output.stdout.to_lowercase().trim().to_string();
        Ok(if mac.is_empty() { None } else { Some(mac) })
    }

    fn apply_settings(&mut self, settings: &UserSettings) {
        self.config.apply_settings(settings);
    }
}

fn exec_err(command: &str, source: std::io::Error) -> ClientError {
    ClientError::Exec {
        command: command.to_string(),
        source,
    }
}

/// Single-quote `value` for the device's POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
