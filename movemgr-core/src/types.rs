//! Domain types shared across the Move Manager crates.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem
//! paths. Every persisted type serializes with camelCase field names so the
//! on-disk JSON documents stay compatible with earlier releases of the
//! manager.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sets
// ---------------------------------------------------------------------------

/// Metadata the device carries for a single set, mirrored from the extended
/// attributes on the set's id-named directory plus the name of its inner
/// bundle directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMetadata {
    /// Opaque identity assigned by the device firmware.
    pub id: String,
    /// Human-readable name; doubles as the bundle directory name on device.
    pub name: String,
    /// Pad color, 0–26.
    pub color: u8,
    /// Grid slot, 0–31. Unique within the device's live set.
    pub index: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_cloud_state: Option<String>,
    #[serde(default)]
    pub was_externally_modified: bool,
}

/// A set bundle somewhere on disk (local or remote) together with its
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    /// Location of the bundle contents — the directory named after the id.
    pub path: PathBuf,
    pub meta: SetMetadata,
}

/// Manager-side bookkeeping for a set. Never present on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerMetadata {
    /// Id of the device this set was last downloaded from.
    pub move_device_id: String,
}

impl Default for ManagerMetadata {
    fn default() -> Self {
        Self {
            move_device_id: "UNKNOWN".to_string(),
        }
    }
}

/// The unit persisted to `meta/<setId>.json` in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSetMetadata {
    pub set_id: String,
    pub meta: SetMetadata,
    pub manager_meta: ManagerMetadata,
}

/// A locally stored set: bundle path plus both metadata layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSet {
    pub path: PathBuf,
    pub meta: SetMetadata,
    pub manager_meta: ManagerMetadata,
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// A page's reference to a set. Color and alias may diverge from the set's
/// own metadata; they describe how the set appears on this page only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInPage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub color: u8,
    pub index: u8,
}

/// A named arrangement of up to 32 grid slots, edited locally and pushed to
/// the device as a unit. Indices within `sets` must be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<SetInPage>,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// One record per physically seen device, keyed by its MAC-derived id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub current_page_id: String,
}

// ---------------------------------------------------------------------------
// User settings
// ---------------------------------------------------------------------------

/// Connection and onboarding settings, loaded once per orchestrator lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub ssh_private_key_path: PathBuf,
    pub ssh_key_has_passphrase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_custom_hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_custom_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_custom_username: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
}

// ---------------------------------------------------------------------------
// Revision history
// ---------------------------------------------------------------------------

/// Author of a local-store commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionAuthor {
    pub name: String,
    pub email: String,
}

/// One commit touching a set's primary content file, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    /// Full commit hash.
    pub commit: String,
    pub abbreviated_commit: String,
    pub author: RevisionAuthor,
    /// Author date, ISO 8601.
    pub date: String,
    /// Author date, unix seconds as a string.
    pub timestamp: String,
    /// Subject line of the commit message.
    pub message: String,
    /// Commit message body, trimmed.
    pub full_message: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_metadata_serializes_camel_case() {
        let meta = SetMetadata {
            id: "s1".into(),
            name: "My Song".into(),
            color: 5,
            index: 2,
            last_modified_time: Some("2024-01-01T00:00:00Z".into()),
            local_cloud_state: None,
            was_externally_modified: false,
        };
        let json = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(json["lastModifiedTime"], "2024-01-01T00:00:00Z");
        assert_eq!(json["wasExternallyModified"], false);
        assert!(json.get("localCloudState").is_none());
    }

    #[test]
    fn complete_metadata_roundtrip() {
        let complete = CompleteSetMetadata {
            set_id: "s1".into(),
            meta: SetMetadata {
                id: "s1".into(),
                name: "n".into(),
                color: 0,
                index: 31,
                last_modified_time: None,
                local_cloud_state: Some("synced".into()),
                was_externally_modified: true,
            },
            manager_meta: ManagerMetadata {
                move_device_id: "aa:bb".into(),
            },
        };
        let json = serde_json::to_string(&complete).expect("serialize");
        let back: CompleteSetMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, complete);
        assert!(json.contains("\"setId\""));
        assert!(json.contains("\"managerMeta\""));
    }

    #[test]
    fn page_deserializes_without_sets_field() {
        let page: Page = serde_json::from_str(r#"{"id":"p1","name":"Default"}"#).expect("parse");
        assert!(page.sets.is_empty());
    }

    #[test]
    fn manager_metadata_defaults_to_unknown_device() {
        assert_eq!(ManagerMetadata::default().move_device_id, "UNKNOWN");
    }

    #[test]
    fn user_settings_optional_fields_omitted() {
        let settings = UserSettings {
            ssh_private_key_path: PathBuf::from("/home/u/.ssh/id_ed25519"),
            ssh_key_has_passphrase: false,
            ssh_custom_hostname: None,
            ssh_custom_port: None,
            ssh_custom_username: None,
            onboarding_completed: true,
        };
        let json = serde_json::to_value(&settings).expect("serialize");
        assert!(json.get("sshCustomHostname").is_none());
        assert_eq!(json["onboardingCompleted"], true);
    }
}
