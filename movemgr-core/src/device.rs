//! Device filesystem contract — fixed paths, extended-attribute keys, and
//! local layout names shared by the client and the store.
//!
//! These are protocol constants, not configuration: the device firmware owns
//! this layout.

/// Root of the user library on the device filesystem.
pub const DEVICE_USER_LIBRARY_PATH: &str = "/data/UserData/UserLibrary";

/// Name of the sets directory under the user library.
pub const DEVICE_SET_DIR: &str = "Sets";

/// Absolute path of the sets directory on the device.
pub const DEVICE_SET_DIR_PATH: &str = "/data/UserData/UserLibrary/Sets";

/// Extended-attribute key carrying the grid slot index.
pub const XATTR_SONG_INDEX: &str = "user.song-index";

/// Extended-attribute key carrying the pad color.
pub const XATTR_SONG_COLOR: &str = "user.song-color";

/// Extended-attribute key carrying the device's cloud-sync state string.
pub const XATTR_LOCAL_CLOUD_STATE: &str = "user.local-cloud-state";

/// Extended-attribute key carrying the last-modified timestamp string.
pub const XATTR_LAST_MODIFIED_TIME: &str = "user.last-modified-time";

/// Extended-attribute key flagging external modification since last sync.
pub const XATTR_WAS_EXTERNALLY_MODIFIED: &str = "user.was-externally-modified";

/// Fixed internal folder name a set's bundle is stored under locally. On
/// upload the folder is renamed to the set's display name.
pub const SET_FOLDER_PLACEHOLDER: &str = "_set";

/// Primary content file inside a set bundle, relative to the set directory.
pub const SET_SONG_FILE: &str = "Song.abl";

/// Remote path of a set's id-named directory: `<sets root>/<set id>`.
pub fn remote_set_dir(set_id: &str) -> String {
    format!("{DEVICE_SET_DIR_PATH}/{set_id}")
}
