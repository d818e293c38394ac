//! End-to-end orchestrator scenarios driven through in-memory fakes.
//!
//! The fake device holds its slots in an `Rc<RefCell<..>>` shared with the
//! test so assertions can inspect device-side state after the manager is
//! done with it.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use movemgr_client::{BundleClient, ClientError, DeviceClient, RestError};
use movemgr_core::device::SET_FOLDER_PLACEHOLDER;
use movemgr_core::{validate, Page, Set, SetInPage, SetMetadata, UserSettings, ValidationError};
use movemgr_store::{LocalStore, StoreError};
use movemgr_sync::{ManagerError, MoveManager};
use tempfile::TempDir;

const MAC: &str = "aa:bb:cc:dd:ee:ff";
const DEFAULT_PAGE: &str = "default-aa-bb-cc-dd-ee-ff";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DeviceState {
    sets: Vec<Set>,
    mac: Option<String>,
    connected: bool,
    connects: usize,
    disconnects: usize,
    uploads: usize,
    fail_download_for: HashSet<String>,
    applied_settings: Vec<UserSettings>,
}

#[derive(Clone)]
struct FakeDevice(Rc<RefCell<DeviceState>>);

impl FakeDevice {
    fn new(mac: Option<&str>) -> Self {
        Self(Rc::new(RefCell::new(DeviceState {
            mac: mac.map(str::to_string),
            ..DeviceState::default()
        })))
    }

    fn seed_set(&self, meta: SetMetadata) {
        let path = PathBuf::from("/data/UserData/UserLibrary/Sets").join(&meta.id);
        self.0.borrow_mut().sets.push(Set { path, meta });
    }
}

impl DeviceClient for FakeDevice {
    fn connect(&mut self) -> Result<(), ClientError> {
        let mut state = self.0.borrow_mut();
        state.connected = true;
        state.connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ClientError> {
        let mut state = self.0.borrow_mut();
        state.connected = false;
        state.disconnects += 1;
        Ok(())
    }

    fn list_sets(&mut self) -> Result<Vec<Set>, ClientError> {
        Ok(self.0.borrow().sets.clone())
    }

    fn download_set(&mut self, set_id: &str, target_dir: &Path) -> Result<Set, ClientError> {
        let state = self.0.borrow();
        if state.fail_download_for.contains(set_id) {
            return Err(ClientError::RemoteCommand {
                command: format!("download {set_id}"),
                stderr: "injected failure".to_string(),
            });
        }
        let set = state
            .sets
            .iter()
            .find(|s| s.meta.id == set_id)
            .expect("fake download of unknown set")
            .clone();
        // Bundles arrive with the inner folder carrying the display name,
        // exactly as the device stores them.
        let bundle = target_dir.join(set_id).join(&set.meta.name);
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("Song.abl"), format!("song-{set_id}")).unwrap();
        Ok(Set {
            path: target_dir.join(set_id),
            meta: set.meta,
        })
    }

    fn upload_set(&mut self, set: &Set) -> Result<Set, ClientError> {
        validate::check_index(set.meta.index)?;
        validate::check_color(set.meta.color)?;
        let name = validate::check_name(&set.meta.name)?;
        let mut state = self.0.borrow_mut();
        state.uploads += 1;
        let meta = SetMetadata {
            name,
            was_externally_modified: false,
            ..set.meta.clone()
        };
        let uploaded = Set {
            path: PathBuf::from("/data/UserData/UserLibrary/Sets").join(&meta.id),
            meta,
        };
        state.sets.push(uploaded.clone());
        Ok(uploaded)
    }

    fn delete_set(&mut self, set_id: &str) -> Result<(), ClientError> {
        self.0.borrow_mut().sets.retain(|s| s.meta.id != set_id);
        Ok(())
    }

    fn mac_address(&mut self) -> Result<Option<String>, ClientError> {
        Ok(self.0.borrow().mac.clone())
    }

    fn apply_settings(&mut self, settings: &UserSettings) {
        self.0.borrow_mut().applied_settings.push(settings.clone());
    }
}

#[derive(Default)]
struct BundleState {
    base_url: String,
    cookie: Option<String>,
    downloads: Vec<String>,
}

#[derive(Clone)]
struct FakeBundles(Rc<RefCell<BundleState>>);

impl FakeBundles {
    fn new() -> Self {
        Self(Rc::new(RefCell::new(BundleState {
            base_url: "http://move.local".to_string(),
            ..BundleState::default()
        })))
    }
}

impl BundleClient for FakeBundles {
    fn get_challenge(&mut self) -> Result<(), RestError> {
        Ok(())
    }

    fn submit_challenge_response(&mut self, secret: &str) -> Result<Option<String>, RestError> {
        let cookie = format!("Ableton-Challenge-Response-Token={secret}");
        self.0.borrow_mut().cookie = Some(cookie.clone());
        Ok(Some(cookie))
    }

    fn download_set_abl_bundle(
        &mut self,
        set_id: &str,
        target_dir: &Path,
    ) -> Result<PathBuf, RestError> {
        fs::create_dir_all(target_dir).unwrap();
        let path = target_dir.join(format!("{set_id}.abl"));
        fs::write(&path, b"abl").unwrap();
        self.0.borrow_mut().downloads.push(set_id.to_string());
        Ok(path)
    }

    fn set_base_url(&mut self, base_url: &str) {
        self.0.borrow_mut().base_url = base_url.to_string();
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    _tmp: TempDir,
    manager: MoveManager<FakeDevice, FakeBundles>,
    device: FakeDevice,
    bundles: FakeBundles,
}

fn harness(mac: Option<&str>) -> Harness {
    let tmp = TempDir::new().unwrap();
    let store = LocalStore::open(tmp.path().join("db")).unwrap();
    let device = FakeDevice::new(mac);
    let bundles = FakeBundles::new();
    let manager = MoveManager::new(store, device.clone(), bundles.clone());
    Harness {
        _tmp: tmp,
        manager,
        device,
        bundles,
    }
}

fn meta(id: &str, name: &str, index: u8, color: u8) -> SetMetadata {
    SetMetadata {
        id: id.to_string(),
        name: name.to_string(),
        color,
        index,
        last_modified_time: Some("2024-05-01T10:00:00Z".to_string()),
        local_cloud_state: Some("notSynced".to_string()),
        was_externally_modified: false,
    }
}

/// Put a set into the local store (and history) the way a download would
/// have.
fn seed_local_set(store: &LocalStore, set_meta: &SetMetadata) {
    let mut tx = store.transaction().unwrap();
    let set = Set {
        path: PathBuf::from("/remote").join(&set_meta.id),
        meta: set_meta.clone(),
    };
    store
        .save_set::<StoreError, _>(&set, MAC, |sets_dir| {
            let bundle = sets_dir.join(&set_meta.id).join(SET_FOLDER_PLACEHOLDER);
            fs::create_dir_all(&bundle).unwrap();
            fs::write(bundle.join("Song.abl"), "{}").unwrap();
            Ok(())
        })
        .unwrap();
    tx.commit(&format!("Downloaded current sets from {MAC}"))
        .unwrap();
}

// ---------------------------------------------------------------------------
// Download scenarios
// ---------------------------------------------------------------------------

#[test]
fn empty_device_creates_device_record_and_default_page() {
    let mut h = harness(Some(MAC));
    let sets = h.manager.download_all_sets().unwrap();
    assert!(sets.is_empty());

    let devices = h.manager.all_devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, MAC);
    assert_eq!(devices[0].name, "Ableton Move Device");
    assert_eq!(devices[0].current_page_id, DEFAULT_PAGE);

    let page = h.manager.page(DEFAULT_PAGE).unwrap().expect("default page");
    assert_eq!(page.name, "Default");
    assert!(page.sets.is_empty());

    assert!(!h.device.0.borrow().connected, "session must be closed");
}

#[test]
fn missing_mac_registers_unknown_device() {
    let mut h = harness(None);
    h.manager.download_all_sets().unwrap();
    let devices = h.manager.all_devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "UNKNOWN");
}

#[test]
fn one_set_device_download_mirrors_set_and_page() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("S1", "First Song", 2, 5));

    let sets = h.manager.download_all_sets().unwrap();
    assert_eq!(sets.len(), 1);

    let stored = h.manager.all_sets().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meta.id, "S1");
    assert_eq!(stored[0].meta.index, 2);
    assert_eq!(stored[0].meta.color, 5);
    assert_eq!(stored[0].manager_meta.move_device_id, MAC);
    // The name-carrying bundle folder was normalized to the placeholder.
    assert!(stored[0].path.join("_set/Song.abl").is_file());

    let page = h.manager.page(DEFAULT_PAGE).unwrap().unwrap();
    assert_eq!(page.sets.len(), 1);
    assert_eq!(page.sets[0].id, "S1");
    assert_eq!(page.sets[0].index, 2);
    assert_eq!(page.sets[0].color, 5);
}

#[test]
fn page_set_count_matches_device_at_download_time() {
    let mut h = harness(Some(MAC));
    for i in 0..4u8 {
        h.device.seed_set(meta(&format!("S{i}"), &format!("Song {i}"), i, 1));
    }
    let sets = h.manager.download_all_sets().unwrap();
    let page = h.manager.page(DEFAULT_PAGE).unwrap().unwrap();
    assert_eq!(page.sets.len(), sets.len());
}

#[test]
fn second_download_reuses_device_record_and_rebuilds_page() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("S1", "First Song", 2, 5));
    h.manager.download_all_sets().unwrap();

    // The device lost S1 and gained S2 between syncs.
    h.device.0.borrow_mut().sets.clear();
    h.device.seed_set(meta("S2", "Second Song", 7, 3));
    h.manager.download_all_sets().unwrap();

    assert_eq!(h.manager.all_devices().unwrap().len(), 1);
    let page = h.manager.page(DEFAULT_PAGE).unwrap().unwrap();
    assert_eq!(page.sets.len(), 1);
    assert_eq!(page.sets[0].id, "S2");
}

#[test]
fn failed_download_rolls_back_but_keeps_device_record() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("S1", "Good", 0, 0));
    h.device.seed_set(meta("S2", "Bad", 1, 0));
    h.device
        .0
        .borrow_mut()
        .fail_download_for
        .insert("S2".to_string());

    let err = h.manager.download_all_sets().unwrap_err();
    assert!(matches!(err, ManagerError::Client(_)));

    // Device registration was committed as its own step; the partial set
    // download was rolled back.
    assert_eq!(h.manager.all_devices().unwrap().len(), 1);
    assert!(h.manager.all_sets().unwrap().is_empty());
    assert!(h.manager.page(DEFAULT_PAGE).unwrap().is_none());
    assert!(!h.device.0.borrow().connected);
}

// ---------------------------------------------------------------------------
// Upload scenarios
// ---------------------------------------------------------------------------

#[test]
fn upload_rejects_out_of_range_index_without_remote_write() {
    let mut h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "First Song", 0, 0));

    let err = h
        .manager
        .upload_set("S1", None, Some(32), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Validation(ValidationError::IndexOutOfRange { index: 32 })
    ));
    assert_eq!(h.device.0.borrow().uploads, 0);
    assert!(!h.device.0.borrow().connected, "session must still close");
}

#[test]
fn upload_rejects_out_of_range_color_without_remote_write() {
    let mut h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "First Song", 0, 0));

    let err = h
        .manager
        .upload_set("S1", None, None, Some(27))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Validation(ValidationError::ColorOutOfRange { color: 27 })
    ));
    assert_eq!(h.device.0.borrow().uploads, 0);
}

#[test]
fn upload_to_taken_index_names_occupant_and_leaves_it_untouched() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("OTHER", "Occupant", 3, 1));
    seed_local_set(h.manager.store(), &meta("S1", "First Song", 0, 0));

    let err = h.manager.upload_set("S1", None, Some(3), None).unwrap_err();
    match err {
        ManagerError::IndexTaken { index, occupant } => {
            assert_eq!(index, 3);
            assert_eq!(occupant, "Occupant");
        }
        other => panic!("expected IndexTaken, got {other:?}"),
    }

    let state = h.device.0.borrow();
    assert_eq!(state.sets.len(), 1);
    assert_eq!(state.sets[0].meta.id, "OTHER");
    assert_eq!(state.uploads, 0);
}

#[test]
fn upload_defaults_missing_fields_from_stored_metadata() {
    let mut h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "First Song", 4, 6));

    h.manager.upload_set("S1", None, None, None).unwrap();

    let state = h.device.0.borrow();
    assert_eq!(state.sets.len(), 1);
    assert_eq!(state.sets[0].meta.index, 4);
    assert_eq!(state.sets[0].meta.color, 6);
    assert_eq!(state.sets[0].meta.name, "First Song");
}

#[test]
fn upload_unknown_set_fails_before_any_device_call() {
    let mut h = harness(Some(MAC));
    let err = h.manager.upload_set("missing", None, None, None).unwrap_err();
    assert!(matches!(err, ManagerError::SetNotFound { .. }));
    assert_eq!(h.device.0.borrow().uploads, 0);
}

#[test]
fn round_trip_preserves_metadata() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("S1", "First Song", 2, 5));
    h.manager.download_all_sets().unwrap();

    // Wipe and push the unmodified local copy back.
    h.manager.wipe_all_sets_on_device().unwrap();
    h.manager.upload_set("S1", None, None, None).unwrap();

    let state = h.device.0.borrow();
    assert_eq!(state.sets.len(), 1);
    let uploaded = &state.sets[0].meta;
    let original = meta("S1", "First Song", 2, 5);
    assert_eq!(uploaded.id, original.id);
    assert_eq!(uploaded.name, original.name);
    assert_eq!(uploaded.index, original.index);
    assert_eq!(uploaded.color, original.color);
    assert_eq!(uploaded.local_cloud_state, original.local_cloud_state);
    assert_eq!(uploaded.last_modified_time, original.last_modified_time);
}

// ---------------------------------------------------------------------------
// Page upload scenarios
// ---------------------------------------------------------------------------

#[test]
fn page_with_duplicate_indices_rejected_before_device_mutation() {
    let mut h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "One", 0, 0));
    seed_local_set(h.manager.store(), &meta("S2", "Two", 1, 0));
    h.device.seed_set(meta("EXISTING", "Keep Me", 9, 9));

    let page = Page {
        id: "p1".into(),
        name: "Gig".into(),
        sets: vec![
            SetInPage {
                id: "S1".into(),
                alias: None,
                color: 0,
                index: 5,
            },
            SetInPage {
                id: "S2".into(),
                alias: None,
                color: 0,
                index: 5,
            },
        ],
    };
    h.manager.create_page(&page, None).unwrap();

    let err = h.manager.upload_page("p1").unwrap_err();
    assert!(matches!(err, ManagerError::DuplicatePageIndex { index: 5 }));

    // The wipe never ran.
    let state = h.device.0.borrow();
    assert_eq!(state.sets.len(), 1);
    assert_eq!(state.sets[0].meta.id, "EXISTING");
}

#[test]
fn upload_page_wipes_then_uploads_all_entries() {
    let mut h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "One", 0, 0));
    seed_local_set(h.manager.store(), &meta("S2", "Two", 1, 0));
    h.device.seed_set(meta("OLD", "Stale", 9, 9));

    let page = Page {
        id: "p1".into(),
        name: "Gig".into(),
        sets: vec![
            SetInPage {
                id: "S1".into(),
                alias: Some("Opener".into()),
                color: 2,
                index: 0,
            },
            SetInPage {
                id: "S2".into(),
                alias: None,
                color: 3,
                index: 1,
            },
        ],
    };
    h.manager.create_page(&page, None).unwrap();
    h.manager.upload_page("p1").unwrap();

    let state = h.device.0.borrow();
    assert_eq!(state.sets.len(), 2, "old device sets wiped first");
    assert!(state.sets.iter().all(|s| s.meta.id != "OLD"));
    let s1 = state.sets.iter().find(|s| s.meta.id == "S1").unwrap();
    // The page alias overrides the stored display name.
    assert_eq!(s1.meta.name, "Opener");
    assert_eq!(s1.meta.color, 2);
}

#[test]
fn upload_page_activates_page_on_known_device() {
    let mut h = harness(Some(MAC));
    h.manager.download_all_sets().unwrap(); // registers the device
    seed_local_set(h.manager.store(), &meta("S1", "One", 0, 0));

    let page = Page {
        id: "p2".into(),
        name: "Live".into(),
        sets: vec![SetInPage {
            id: "S1".into(),
            alias: None,
            color: 0,
            index: 0,
        }],
    };
    h.manager.create_page(&page, None).unwrap();
    h.manager.upload_page("p2").unwrap();

    let devices = h.manager.all_devices().unwrap();
    assert_eq!(devices[0].current_page_id, "p2");
}

#[test]
fn upload_missing_page_is_not_found() {
    let mut h = harness(Some(MAC));
    let err = h.manager.upload_page("nope").unwrap_err();
    assert!(matches!(err, ManagerError::PageNotFound { .. }));
}

// ---------------------------------------------------------------------------
// Wipe
// ---------------------------------------------------------------------------

#[test]
fn wipe_removes_every_set() {
    let mut h = harness(Some(MAC));
    for i in 0..5u8 {
        h.device.seed_set(meta(&format!("S{i}"), &format!("Song {i}"), i, 0));
    }
    h.manager.wipe_all_sets_on_device().unwrap();
    assert!(h.device.0.borrow().sets.is_empty());

    let sets = h.manager.download_all_sets().unwrap();
    assert!(sets.is_empty());
}

// ---------------------------------------------------------------------------
// Pages and devices CRUD
// ---------------------------------------------------------------------------

#[test]
fn create_page_with_unknown_device_fails_and_rolls_back() {
    let h = harness(Some(MAC));
    let page = Page {
        id: "p1".into(),
        name: "Gig".into(),
        sets: vec![],
    };
    let err = h.manager.create_page(&page, Some("ghost")).unwrap_err();
    assert!(matches!(err, ManagerError::DeviceNotFound { .. }));
    // The page write was part of the failed transaction.
    assert!(h.manager.page("p1").unwrap().is_none());
}

#[test]
fn set_active_page_updates_device_pointer() {
    let mut h = harness(Some(MAC));
    h.manager.download_all_sets().unwrap();
    let page = Page {
        id: "p1".into(),
        name: "Gig".into(),
        sets: vec![],
    };
    h.manager.create_page(&page, None).unwrap();
    h.manager.set_active_page("p1", MAC).unwrap();
    assert_eq!(h.manager.all_devices().unwrap()[0].current_page_id, "p1");

    let err = h.manager.set_active_page("ghost-page", MAC).unwrap_err();
    assert!(matches!(err, ManagerError::PageNotFound { .. }));
}

#[test]
fn update_set_in_page_replaces_entry_and_renames_set() {
    let h = harness(Some(MAC));
    seed_local_set(h.manager.store(), &meta("S1", "Old Name", 0, 0));
    let page = Page {
        id: "p1".into(),
        name: "Gig".into(),
        sets: vec![SetInPage {
            id: "S1".into(),
            alias: None,
            color: 0,
            index: 0,
        }],
    };
    h.manager.create_page(&page, None).unwrap();

    let replacement = SetInPage {
        id: "S1".into(),
        alias: Some("Alias".into()),
        color: 9,
        index: 12,
    };
    let updated = h
        .manager
        .update_set_in_page(&page, &replacement, "New Name")
        .unwrap();
    assert_eq!(updated.sets[0].color, 9);
    assert_eq!(updated.sets[0].index, 12);

    let stored = h.manager.all_sets().unwrap();
    assert_eq!(stored[0].meta.name, "New Name");
    assert_eq!(
        h.manager.page("p1").unwrap().unwrap().sets[0].alias.as_deref(),
        Some("Alias")
    );
}

// ---------------------------------------------------------------------------
// Settings and hydration
// ---------------------------------------------------------------------------

fn settings_with_host(host: &str) -> UserSettings {
    UserSettings {
        ssh_private_key_path: PathBuf::from("/keys/id_ed25519"),
        ssh_key_has_passphrase: false,
        ssh_custom_hostname: Some(host.to_string()),
        ssh_custom_port: None,
        ssh_custom_username: None,
        onboarding_completed: true,
    }
}

#[test]
fn stored_settings_hydrate_clients_on_first_session() {
    let mut h = harness(Some(MAC));
    h.manager
        .store()
        .update_user_settings(&settings_with_host("10.0.0.9"))
        .unwrap();

    h.manager.wipe_all_sets_on_device().unwrap();

    assert_eq!(h.device.0.borrow().applied_settings.len(), 1);
    assert_eq!(h.bundles.0.borrow().base_url, "http://10.0.0.9");

    // Hydration happens once per manager instance.
    h.manager.wipe_all_sets_on_device().unwrap();
    assert_eq!(h.device.0.borrow().applied_settings.len(), 1);
}

#[test]
fn update_user_settings_rehydrates_immediately() {
    let mut h = harness(Some(MAC));
    h.manager
        .update_user_settings(&settings_with_host("studio.local"))
        .unwrap();

    assert_eq!(h.device.0.borrow().applied_settings.len(), 1);
    assert_eq!(h.bundles.0.borrow().base_url, "http://studio.local");
    assert_eq!(
        h.manager
            .user_settings()
            .unwrap()
            .unwrap()
            .ssh_custom_hostname
            .as_deref(),
        Some("studio.local")
    );
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

#[test]
fn download_all_abl_bundles_covers_every_device_set() {
    let mut h = harness(Some(MAC));
    h.device.seed_set(meta("S1", "One", 0, 0));
    h.device.seed_set(meta("S2", "Two", 1, 0));

    let target = h._tmp.path().join("bundles");
    let paths = h.manager.download_all_abl_bundles(&target).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.exists()));
    assert_eq!(h.bundles.0.borrow().downloads, vec!["S1", "S2"]);
    assert!(!h.device.0.borrow().connected);
}

#[test]
fn challenge_flow_passes_through() {
    let mut h = harness(Some(MAC));
    h.manager.start_rest_api_challenge().unwrap();
    let cookie = h
        .manager
        .submit_rest_api_challenge_response("703149")
        .unwrap();
    assert_eq!(
        cookie.as_deref(),
        Some("Ableton-Challenge-Response-Token=703149")
    );
}
