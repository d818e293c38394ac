//! The sync orchestrator.
//!
//! [`MoveManager`] is the single entry point enforcing business rules
//! between the device session, the local store, and the challenge-auth
//! client. Every device-facing operation runs inside a connect/run/
//! disconnect bracket; every local mutation runs inside a scoped store
//! transaction, so no exit path leaves a dangling session or a half-applied
//! store.
//!
//! Connection settings are hydrated from stored [`UserSettings`] once per
//! manager instance, on first session use; saving new settings re-hydrates
//! the live clients immediately.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use movemgr_client::{BundleClient, DeviceClient, DEFAULT_HOST};
use movemgr_core::{
    validate, CompleteSetMetadata, Device, Page, RevisionRecord, Set, SetInPage, SetMetadata,
    StoredSet, UserSettings,
};
use movemgr_store::LocalStore;

use crate::error::ManagerError;

/// Display name given to a device on first contact.
const DEFAULT_DEVICE_NAME: &str = "Ableton Move Device";

/// Display name of a device's auto-created page.
const DEFAULT_PAGE_NAME: &str = "Default";

/// Device id recorded when the MAC lookup pipeline finds nothing.
const UNKNOWN_DEVICE_ID: &str = "UNKNOWN";

/// Deterministic id of the default page for a device, derived from its MAC.
fn default_page_id(mac: &str) -> String {
    format!("default-{}", mac.replace(':', "-"))
}

fn default_page(mac: &str) -> Page {
    Page {
        id: default_page_id(mac),
        name: DEFAULT_PAGE_NAME.to_string(),
        sets: Vec::new(),
    }
}

fn base_url_from_settings(settings: &UserSettings) -> String {
    format!(
        "http://{}",
        settings.ssh_custom_hostname.as_deref().unwrap_or(DEFAULT_HOST)
    )
}

// ---------------------------------------------------------------------------
// MoveManager
// ---------------------------------------------------------------------------

/// Orchestrates one device against one local store. Callers must serialize
/// operations on one instance; for several devices, build independent
/// managers with independent store roots.
pub struct MoveManager<C: DeviceClient, B: BundleClient> {
    store: LocalStore,
    device: C,
    bundles: B,
    settings_hydrated: bool,
}

impl<C: DeviceClient, B: BundleClient> MoveManager<C, B> {
    pub fn new(store: LocalStore, device: C, bundles: B) -> Self {
        Self {
            store,
            device,
            bundles,
            settings_hydrated: false,
        }
    }

    /// Read access to the underlying store (history queries, inspection).
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    fn begin(&mut self) -> Result<(), ManagerError> {
        if !self.settings_hydrated {
            if let Some(settings) = self.store.user_settings()? {
                self.device.apply_settings(&settings);
                self.bundles.set_base_url(&base_url_from_settings(&settings));
            }
            self.settings_hydrated = true;
        }
        self.device.connect()?;
        Ok(())
    }

    /// Run `op` inside a connect/disconnect bracket. The session is closed
    /// on every path; when both the operation and the disconnect fail, the
    /// operation's error wins.
    fn with_session<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        self.begin()?;
        let result = op(self);
        let disconnect = self.device.disconnect();
        match (result, disconnect) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(disconnect_err)) => {
                tracing::warn!("disconnect after failed operation also failed: {disconnect_err}");
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    /// Upload one local set to the device.
    ///
    /// Omitted name/index/color default to the set's stored metadata. Fails
    /// before any remote write when the index or color is out of range, and
    /// with [`ManagerError::IndexTaken`] when the slot is occupied.
    pub fn upload_set(
        &mut self,
        set_id: &str,
        name: Option<String>,
        index: Option<u8>,
        color: Option<u8>,
    ) -> Result<(), ManagerError> {
        self.with_session(|this| {
            let mut occupancy = None;
            this.upload_one(set_id, name, index, color, &mut occupancy)
        })
    }

    /// Shared per-set upload path.
    ///
    /// `occupancy` is the device slot snapshot; it is listed lazily on first
    /// need and every successful upload is appended so later calls in the
    /// same batch see it without re-listing.
    fn upload_one(
        &mut self,
        set_id: &str,
        name: Option<String>,
        index: Option<u8>,
        color: Option<u8>,
        occupancy: &mut Option<Vec<Set>>,
    ) -> Result<(), ManagerError> {
        let stored = self.store.set(set_id)?.ok_or_else(|| ManagerError::SetNotFound {
            id: set_id.to_string(),
        })?;

        let index = index.unwrap_or(stored.meta.index);
        validate::check_index(index)?;
        let color = color.unwrap_or(stored.meta.color);
        validate::check_color(color)?;
        let name = name.unwrap_or_else(|| stored.meta.name.clone());

        if occupancy.is_none() {
            *occupancy = Some(self.device.list_sets()?);
        }
        let sets_on_device = occupancy.get_or_insert_with(Vec::new);

        if let Some(occupant) = sets_on_device.iter().find(|s| s.meta.index == index) {
            return Err(ManagerError::IndexTaken {
                index,
                occupant: occupant.meta.name.clone(),
            });
        }

        let meta = SetMetadata {
            name,
            index,
            color,
            ..stored.meta
        };
        let uploaded = self.device.upload_set(&Set {
            path: stored.path,
            meta,
        })?;
        sets_on_device.push(uploaded);
        Ok(())
    }

    /// Push a whole page to the device: wipe, upload every entry sharing one
    /// occupancy snapshot, then activate the page on its device if known.
    pub fn upload_page(&mut self, page_id: &str) -> Result<(), ManagerError> {
        self.with_session(|this| {
            let page = this.store.page(page_id)?.ok_or_else(|| ManagerError::PageNotFound {
                id: page_id.to_string(),
            })?;

            // Reject a self-conflicting page before touching the device.
            let mut seen = HashSet::new();
            for entry in &page.sets {
                if !seen.insert(entry.index) {
                    return Err(ManagerError::DuplicatePageIndex { index: entry.index });
                }
            }

            let mac = this
                .device
                .mac_address()?
                .unwrap_or_else(|| UNKNOWN_DEVICE_ID.to_string());
            let known_device = this.store.device(&mac)?;

            this.wipe_inner()?;
            let mut occupancy = Some(this.device.list_sets()?);
            for entry in &page.sets {
                this.upload_one(
                    &entry.id,
                    entry.alias.clone(),
                    Some(entry.index),
                    Some(entry.color),
                    &mut occupancy,
                )?;
            }

            if let Some(device_record) = known_device {
                if device_record.current_page_id != page.id {
                    this.activate_page_local(&page, &device_record)?;
                }
            }
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Wipe and download
    // -----------------------------------------------------------------------

    /// Delete every set currently on the device.
    pub fn wipe_all_sets_on_device(&mut self) -> Result<(), ManagerError> {
        self.with_session(|this| this.wipe_inner())
    }

    fn wipe_inner(&mut self) -> Result<(), ManagerError> {
        let sets = self.device.list_sets()?;
        for set in sets {
            self.device.delete_set(&set.meta.id)?;
        }
        Ok(())
    }

    /// Mirror the device into the local store.
    ///
    /// Upserts the device record (keyed by MAC), rebuilds its current page
    /// from the device's live slots, and persists every set — all inside
    /// one store transaction, committed with a descriptive message. Returns
    /// the sets seen on the device.
    pub fn download_all_sets(&mut self) -> Result<Vec<Set>, ManagerError> {
        self.with_session(|this| {
            let MoveManager { store, device, .. } = this;
            let mut tx = store.transaction()?;

            let mac = device
                .mac_address()?
                .unwrap_or_else(|| UNKNOWN_DEVICE_ID.to_string());
            let known_device = store.device(&mac)?;
            let mut page = match &known_device {
                None => {
                    let page = default_page(&mac);
                    let record = Device {
                        id: mac.clone(),
                        name: DEFAULT_DEVICE_NAME.to_string(),
                        current_page_id: page.id.clone(),
                    };
                    tracing::info!(
                        "adding new Move device {} with default page {}",
                        record.name,
                        page.id
                    );
                    store.update_device(&record)?;
                    // The device's existence is worth keeping even if the
                    // download below fails.
                    tx.commit(&format!("New Move device: {mac}"))?;
                    page
                }
                Some(device_record) => store
                    .page(&device_record.current_page_id)?
                    .unwrap_or_else(|| default_page(&mac)),
            };

            let sets = device.list_sets()?;
            page.sets.clear();
            for set in &sets {
                store.save_set::<ManagerError, _>(set, &mac, |sets_dir| {
                    device
                        .download_set(&set.meta.id, sets_dir)
                        .map(drop)
                        .map_err(ManagerError::from)
                })?;
                page.sets.push(SetInPage {
                    id: set.meta.id.clone(),
                    alias: None,
                    index: set.meta.index,
                    color: set.meta.color,
                });
            }
            store.update_page(&page)?;
            tx.commit(&format!("Downloaded current sets from {mac}"))?;
            Ok(sets)
        })
    }

    // -----------------------------------------------------------------------
    // Local reads
    // -----------------------------------------------------------------------

    pub fn all_devices(&self) -> Result<Vec<Device>, ManagerError> {
        Ok(self.store.devices()?.into_values().collect())
    }

    pub fn all_sets(&self) -> Result<Vec<StoredSet>, ManagerError> {
        Ok(self.store.sets()?)
    }

    pub fn all_pages(&self) -> Result<Vec<Page>, ManagerError> {
        Ok(self.store.pages()?)
    }

    pub fn page(&self, page_id: &str) -> Result<Option<Page>, ManagerError> {
        Ok(self.store.page(page_id)?)
    }

    // -----------------------------------------------------------------------
    // Page CRUD
    // -----------------------------------------------------------------------

    /// Persist a page; when `device_id` is given, also make it that device's
    /// active page.
    pub fn create_page(&self, page: &Page, device_id: Option<&str>) -> Result<(), ManagerError> {
        let mut tx = self.store.transaction()?;
        self.store.update_page(page)?;
        if let Some(device_id) = device_id {
            let mut device =
                self.store
                    .device(device_id)?
                    .ok_or_else(|| ManagerError::DeviceNotFound {
                        id: device_id.to_string(),
                    })?;
            device.current_page_id = page.id.clone();
            self.store.update_device(&device)?;
        }
        tx.commit(&format!("Created page: {} ({})", page.name, page.id))?;
        Ok(())
    }

    pub fn update_page(&self, page: &Page) -> Result<(), ManagerError> {
        let mut tx = self.store.transaction()?;
        self.store.update_page(page)?;
        tx.commit(&format!("Updated page: {} ({})", page.name, page.id))?;
        Ok(())
    }

    pub fn delete_page(&self, page_id: &str) -> Result<(), ManagerError> {
        let mut tx = self.store.transaction()?;
        self.store.delete_page(page_id)?;
        tx.commit(&format!("Deleted page: {page_id}"))?;
        Ok(())
    }

    /// Replace the matching slot entry in `page` and rename the referenced
    /// set locally, committed as one step.
    pub fn update_set_in_page(
        &self,
        page: &Page,
        set: &SetInPage,
        set_name: &str,
    ) -> Result<Page, ManagerError> {
        let mut tx = self.store.transaction()?;
        let mut updated = page.clone();
        for slot in &mut updated.sets {
            if slot.id == set.id {
                *slot = set.clone();
            }
        }
        self.store.update_page(&updated)?;

        if let Some(stored) = self.store.set(&set.id)? {
            let mut meta = stored.meta;
            meta.name = set_name.to_string();
            self.store.update_set_metadata(&CompleteSetMetadata {
                set_id: meta.id.clone(),
                meta,
                manager_meta: stored.manager_meta,
            })?;
        }

        tx.commit(&format!(
            "Updated set {set_name} in page {} ({})",
            updated.name, updated.id
        ))?;
        Ok(updated)
    }

    /// Point `device_id` at `page_id`. Both must exist locally.
    pub fn set_active_page(&self, page_id: &str, device_id: &str) -> Result<(), ManagerError> {
        let page = self.store.page(page_id)?.ok_or_else(|| ManagerError::PageNotFound {
            id: page_id.to_string(),
        })?;
        let device =
            self.store
                .device(device_id)?
                .ok_or_else(|| ManagerError::DeviceNotFound {
                    id: device_id.to_string(),
                })?;
        self.activate_page_local(&page, &device)
    }

    fn activate_page_local(&self, page: &Page, device: &Device) -> Result<(), ManagerError> {
        let mut tx = self.store.transaction()?;
        let mut record = device.clone();
        record.current_page_id = page.id.clone();
        self.store.update_device(&record)?;
        tx.commit(&format!(
            "Set active page to {} on device {} ({} -> {})",
            page.name, record.name, page.id, record.id
        ))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn user_settings(&self) -> Result<Option<UserSettings>, ManagerError> {
        Ok(self.store.user_settings()?)
    }

    /// Persist new settings and re-hydrate the live clients so the next
    /// operation uses them without a restart.
    pub fn update_user_settings(&mut self, settings: &UserSettings) -> Result<(), ManagerError> {
        let mut tx = self.store.transaction()?;
        self.store.update_user_settings(settings)?;
        self.device.apply_settings(settings);
        self.bundles.set_base_url(&base_url_from_settings(settings));
        self.settings_hydrated = true;
        tx.commit("Updated user settings")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Challenge auth and bundles
    // -----------------------------------------------------------------------

    pub fn start_rest_api_challenge(&mut self) -> Result<(), ManagerError> {
        Ok(self.bundles.get_challenge()?)
    }

    pub fn submit_rest_api_challenge_response(
        &mut self,
        secret: &str,
    ) -> Result<Option<String>, ManagerError> {
        Ok(self.bundles.submit_challenge_response(secret)?)
    }

    pub fn download_set_abl_bundle(
        &mut self,
        set_id: &str,
        target_dir: &Path,
    ) -> Result<PathBuf, ManagerError> {
        Ok(self.bundles.download_set_abl_bundle(set_id, target_dir)?)
    }

    /// Download every device set's `.abl` bundle into `target_dir`,
    /// returning the written paths.
    pub fn download_all_abl_bundles(
        &mut self,
        target_dir: &Path,
    ) -> Result<Vec<PathBuf>, ManagerError> {
        self.with_session(|this| {
            let sets = this.device.list_sets()?;
            let mut paths = Vec::new();
            for set in sets {
                paths.push(this.bundles.download_set_abl_bundle(&set.meta.id, target_dir)?);
            }
            Ok(paths)
        })
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn set_file_revisions(&self, set_id: &str) -> Vec<RevisionRecord> {
        self.store.set_file_revisions(set_id)
    }

    pub fn set_version_at_revision(
        &self,
        set_id: &str,
        revision: &str,
    ) -> Result<String, ManagerError> {
        Ok(self.store.set_version_at_revision(set_id, revision)?)
    }
}
