//! Git-versioned directory store — the system of record between sync
//! sessions.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   sets/<setId>/_set/...     (bundle content — git-ignored bulk data)
//!   meta/<setId>.json         (CompleteSetMetadata)
//!   pages/<pageId>.json       (Page)
//!   devices.json              (map of device id → Device)
//!   userSettings.json         (UserSettings)
//!   .gitignore
//! ```
//!
//! The root is a plain git repository. Metadata, pages, devices and settings
//! are versioned; bundle content under `sets/` is deliberately ignored so
//! the history stays small, with one exception: each set's primary
//! `sets/<id>/_set/Song.abl` is tracked so history queries can follow it
//! (see [`crate::history`]).
//!
//! Single-writer: concurrent stores pointed at the same root are not
//! coordinated beyond git's own index lock and must be prevented by the
//! caller.

use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use movemgr_core::device::SET_FOLDER_PLACEHOLDER;
use movemgr_core::{CompleteSetMetadata, Device, ManagerMetadata, Page, Set, StoredSet, UserSettings};

use crate::error::{io_err, StoreError};
use crate::transaction::{self, StoreTransaction};

pub(crate) const SETS_DIR: &str = "sets";
pub(crate) const META_DIR: &str = "meta";
pub(crate) const PAGES_DIR: &str = "pages";
const DEVICES_FILE: &str = "devices.json";
const USER_SETTINGS_FILE: &str = "userSettings.json";

/// Bundle content is bulk data and stays out of history — except each set's
/// primary `Song.abl`, which is what revision queries track.
const GITIGNORE_CONTENT: &str = "\
sets/**
!sets/*/
!sets/*/_set/
!sets/*/_set/Song.abl
";

/// Identity used for commits when the user has no git identity configured.
const FALLBACK_GIT_NAME: &str = "Move Manager";
const FALLBACK_GIT_EMAIL: &str = "movemanager@example.com";

/// Handle on the local store. See the module docs for the layout.
pub struct LocalStore {
    root: PathBuf,
    sets_dir: PathBuf,
    meta_dir: PathBuf,
    pages_dir: PathBuf,
    repo: Repository,
}

impl LocalStore {
    /// Open (and on first use, create) the store at `root`.
    ///
    /// Creates the directory skeleton, installs the `.gitignore`, and
    /// initializes the git repository with an initial commit when absent.
    /// When the local git identity is unset, deterministic fallback values
    /// are configured so commits never fail on a fresh machine.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let sets_dir = root.join(SETS_DIR);
        let meta_dir = root.join(META_DIR);
        let pages_dir = root.join(PAGES_DIR);
        for dir in [&root, &sets_dir, &meta_dir, &pages_dir] {
            fs::create_dir_all(dir).map_err(|e| io_err(dir.as_path(), e))?;
        }

        let gitignore = root.join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, GITIGNORE_CONTENT).map_err(|e| io_err(&gitignore, e))?;
        }

        let repo = if root.join(".git").exists() {
            Repository::open(&root)?
        } else {
            log::info!("initializing local store repository at {}", root.display());
            let repo = Repository::init(&root)?;
            ensure_git_identity(&repo)?;
            initial_commit(&repo)?;
            repo
        };
        ensure_git_identity(&repo)?;

        Ok(Self {
            root,
            sets_dir,
            meta_dir,
            pages_dir,
            repo,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory bundle content is materialized into by download callbacks.
    pub fn sets_dir(&self) -> &Path {
        &self.sets_dir
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Begin a store update session.
    ///
    /// Any dirty working tree left behind by a crashed session is discarded
    /// first (hard reset + clean), so a transaction always starts from the
    /// last committed state. The returned guard discards uncommitted work
    /// on drop; call [`StoreTransaction::commit`] to keep it.
    pub fn transaction(&self) -> Result<StoreTransaction<'_>, StoreError> {
        transaction::reset_and_clean(&self.repo, &self.root)?;
        Ok(StoreTransaction::new(self))
    }

    // -----------------------------------------------------------------------
    // User settings
    // -----------------------------------------------------------------------

    /// `None` when settings were never saved.
    pub fn user_settings(&self) -> Result<Option<UserSettings>, StoreError> {
        self.read_json_opt(&self.root.join(USER_SETTINGS_FILE))
    }

    pub fn update_user_settings(&self, settings: &UserSettings) -> Result<(), StoreError> {
        self.write_json(&self.root.join(USER_SETTINGS_FILE), settings)
    }

    // -----------------------------------------------------------------------
    // Sets
    // -----------------------------------------------------------------------

    fn meta_path(&self, set_id: &str) -> PathBuf {
        self.meta_dir.join(format!("{set_id}.json"))
    }

    /// A set is present only when both its metadata document and its content
    /// directory exist.
    pub fn set(&self, set_id: &str) -> Result<Option<StoredSet>, StoreError> {
        let set_path = self.sets_dir.join(set_id);
        if !set_path.exists() {
            return Ok(None);
        }
        let Some(metadata) = self.read_json_opt::<CompleteSetMetadata>(&self.meta_path(set_id))?
        else {
            return Ok(None);
        };
        Ok(Some(StoredSet {
            path: set_path,
            meta: metadata.meta,
            manager_meta: metadata.manager_meta,
        }))
    }

    /// All locally stored sets. Metadata documents whose content directory
    /// is missing (or that fail to parse) are logged and skipped, not
    /// returned and not fatal.
    pub fn sets(&self) -> Result<Vec<StoredSet>, StoreError> {
        let entries = fs::read_dir(&self.meta_dir).map_err(|e| io_err(&self.meta_dir, e))?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        names.sort();

        let mut sets = Vec::new();
        for name in names {
            let set_id = name.trim_end_matches(".json");
            let set_path = self.sets_dir.join(set_id);
            if !set_path.exists() {
                log::warn!(
                    "metadata found for set {set_id} but content directory {} does not exist",
                    set_path.display()
                );
                continue;
            }
            match self.read_json_opt::<CompleteSetMetadata>(&self.meta_path(set_id)) {
                Ok(Some(metadata)) => sets.push(StoredSet {
                    path: set_path,
                    meta: metadata.meta,
                    manager_meta: metadata.manager_meta,
                }),
                Ok(None) => {}
                Err(err) => log::error!("skipping unreadable metadata for set {set_id}: {err}"),
            }
        }
        Ok(sets)
    }

    /// Persist a set downloaded from a device.
    ///
    /// Prior manager metadata is preserved across re-downloads; the old
    /// content directory is removed before `store_fn` materializes the new
    /// bundle under [`Self::sets_dir`]. A legacy content folder named after
    /// the set's display name is renamed to the fixed placeholder so the
    /// local layout stays uniform.
    pub fn save_set<E, F>(&self, set: &Set, device_id: &str, store_fn: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnOnce(&Path) -> Result<(), E>,
    {
        let mut manager_meta = ManagerMetadata::default();
        if let Some(existing) = self.set(&set.meta.id).map_err(E::from)? {
            manager_meta = existing.manager_meta;
            fs::remove_dir_all(&existing.path)
                .map_err(|e| E::from(io_err(&existing.path, e)))?;
        }
        manager_meta.move_device_id = device_id.to_string();

        store_fn(&self.sets_dir)?;

        self.normalize_content_folder(set).map_err(E::from)?;

        self.write_json(
            &self.meta_path(&set.meta.id),
            &CompleteSetMetadata {
                set_id: set.meta.id.clone(),
                meta: set.meta.clone(),
                manager_meta,
            },
        )
        .map_err(E::from)
    }

    /// Rename a bundle folder carrying the set's display name to the fixed
    /// placeholder name.
    fn normalize_content_folder(&self, set: &Set) -> Result<(), StoreError> {
        let set_dir = self.sets_dir.join(&set.meta.id);
        let entries = fs::read_dir(&set_dir).map_err(|e| io_err(&set_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&set_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && name == set.meta.name && name != set.meta.id {
                let target = set_dir.join(SET_FOLDER_PLACEHOLDER);
                fs::rename(entry.path(), &target).map_err(|e| io_err(&target, e))?;
                break;
            }
        }
        Ok(())
    }

    /// Overwrite a set's metadata document.
    pub fn update_set_metadata(&self, metadata: &CompleteSetMetadata) -> Result<(), StoreError> {
        self.write_json(&self.meta_path(&metadata.set_id), metadata)
    }

    // -----------------------------------------------------------------------
    // Pages
    // -----------------------------------------------------------------------

    fn page_path(&self, page_id: &str) -> PathBuf {
        self.pages_dir.join(format!("{page_id}.json"))
    }

    pub fn page(&self, page_id: &str) -> Result<Option<Page>, StoreError> {
        self.read_json_opt(&self.page_path(page_id))
    }

    pub fn pages(&self) -> Result<Vec<Page>, StoreError> {
        let entries = fs::read_dir(&self.pages_dir).map_err(|e| io_err(&self.pages_dir, e))?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        names.sort();

        let mut pages = Vec::new();
        for name in names {
            let path = self.pages_dir.join(&name);
            if let Some(page) = self.read_json_opt(&path)? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    pub fn update_page(&self, page: &Page) -> Result<(), StoreError> {
        self.write_json(&self.page_path(&page.id), page)
    }

    /// No-op when the page does not exist.
    pub fn delete_page(&self, page_id: &str) -> Result<(), StoreError> {
        let path = self.page_path(page_id);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|e| io_err(&path, e))
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// All known devices, keyed by id. Empty map when none were seen yet.
    pub fn devices(&self) -> Result<BTreeMap<String, Device>, StoreError> {
        Ok(self
            .read_json_opt(&self.root.join(DEVICES_FILE))?
            .unwrap_or_default())
    }

    pub fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.devices()?.remove(device_id))
    }

    /// Insert or update one device record.
    pub fn update_device(&self, device: &Device) -> Result<(), StoreError> {
        let mut devices = self.devices()?;
        devices.insert(device.id.clone(), device.clone());
        self.write_json(&self.root.join(DEVICES_FILE), &devices)
    }

    // -----------------------------------------------------------------------
    // JSON helpers
    // -----------------------------------------------------------------------

    fn read_json_opt<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| io_err(path, e))
    }
}

fn ensure_git_identity(repo: &Repository) -> Result<(), StoreError> {
    if repo.signature().is_ok() {
        return Ok(());
    }
    let mut config = repo.config()?;
    config.set_str("user.name", FALLBACK_GIT_NAME)?;
    config.set_str("user.email", FALLBACK_GIT_EMAIL)?;
    log::info!("configured fallback git identity {FALLBACK_GIT_NAME} <{FALLBACK_GIT_EMAIL}>");
    Ok(())
}

fn initial_commit(repo: &Repository) -> Result<(), StoreError> {
    let mut index = repo.index()?;
    index.add_path(Path::new(".gitignore"))?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let sig = repo.signature()?;
    repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])?;
    Ok(())
}
