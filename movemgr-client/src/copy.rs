//! Recursive tree copy between the local filesystem and the device over SFTP.
//!
//! Both directions walk the tree the same way: files are transferred
//! individually, directories are created then recursed into with the new
//! destination as the base for nested calls. Entry types that are neither
//! file nor directory (symlinks, sockets) are skipped with a warning.
//!
//! What gets excluded is policy, not code: [`CopyPolicy`] holds the skip
//! predicate so tests and callers can tighten or loosen it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ssh2::Sftp;

use crate::error::{io_err, ClientError};

/// Names excluded from a copy. The default upload policy skips macOS
/// `.DS_Store` droppings; downloads exclude nothing.
#[derive(Debug, Clone, Default)]
pub struct CopyPolicy {
    skip_names: Vec<String>,
}

impl CopyPolicy {
    /// Policy for local → device copies.
    pub fn upload_default() -> Self {
        Self {
            skip_names: vec![".DS_Store".to_string()],
        }
    }

    /// Policy for device → local copies.
    pub fn download_default() -> Self {
        Self::default()
    }

    /// Add a file name to exclude.
    pub fn with_skip_name(mut self, name: impl Into<String>) -> Self {
        self.skip_names.push(name.into());
        self
    }

    /// Whether an entry at `path` should be excluded from the copy.
    pub fn should_skip(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.skip_names.iter().any(|s| s == n))
            .unwrap_or(false)
    }
}

/// Join a remote path with `/` regardless of the local platform separator.
pub(crate) fn remote_join(base: &Path, name: &str) -> PathBuf {
    PathBuf::from(format!("{}/{}", base.display(), name))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Recursively copy `remote` (file or directory) into `local_base`.
///
/// The copied entry lands at `local_base/<basename of remote>`; nested calls
/// use the newly created directory as their base.
pub fn copy_recursive_from_remote(
    sftp: &Sftp,
    local_base: &Path,
    remote: &Path,
    policy: &CopyPolicy,
) -> Result<(), ClientError> {
    if policy.should_skip(remote) {
        log::debug!("skipping excluded entry {}", remote.display());
        return Ok(());
    }
    let stat = sftp.stat(remote)?;
    let local_path = local_base.join(file_name_of(remote));

    if stat.is_file() {
        let mut remote_file = sftp.open(remote)?;
        let mut local_file = fs::File::create(&local_path).map_err(|e| io_err(&local_path, e))?;
        io::copy(&mut remote_file, &mut local_file).map_err(|e| io_err(&local_path, e))?;
    } else if stat.is_dir() {
        fs::create_dir_all(&local_path).map_err(|e| io_err(&local_path, e))?;
        for (entry_path, _) in sftp.readdir(remote)? {
            copy_recursive_from_remote(sftp, &local_path, &entry_path, policy)?;
        }
    } else {
        log::warn!("skipping unsupported file type at {}", remote.display());
    }
    Ok(())
}

/// Recursively copy `local` (file or directory) into `remote_base`.
///
/// Remote directories that already exist are reused, not errors: re-uploads
/// land on top of a previous partial copy.
pub fn copy_recursive_to_remote(
    sftp: &Sftp,
    local: &Path,
    remote_base: &Path,
    policy: &CopyPolicy,
) -> Result<(), ClientError> {
    if policy.should_skip(local) {
        log::debug!("skipping excluded entry {}", local.display());
        return Ok(());
    }
    let meta = fs::symlink_metadata(local).map_err(|e| io_err(local, e))?;
    let remote_path = remote_join(remote_base, &file_name_of(local));

    if meta.is_file() {
        let mut local_file = fs::File::open(local).map_err(|e| io_err(local, e))?;
        let mut remote_file = sftp.create(&remote_path)?;
        io::copy(&mut local_file, &mut remote_file).map_err(|e| io_err(local, e))?;
    } else if meta.is_dir() {
        if let Err(err) = sftp.mkdir(&remote_path, 0o755) {
            // Tolerate a directory that already exists on the device.
            if sftp.stat(&remote_path).is_err() {
                return Err(ClientError::Ssh(err));
            }
        }
        let entries = fs::read_dir(local).map_err(|e| io_err(local, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(local, e))?;
            copy_recursive_to_remote(sftp, &entry.path(), &remote_path, policy)?;
        }
    } else {
        log::warn!("skipping unsupported file type at {}", local.display());
    }
    Ok(())
}
