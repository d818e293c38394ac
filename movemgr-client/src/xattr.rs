//! Typed codec between the device's extended-attribute protocol and
//! [`SetMetadata`].
//!
//! The device exposes per-set metadata as `user.*` extended attributes on the
//! set's id-named directory. Reads go through `getfattr -d -m . <path>`,
//! whose output is `key="value"` lines preceded by a `# file:` comment;
//! writes go through one `setfattr -n <key> -v <value> <path>` per key. This
//! module keeps that textual protocol out of the business logic.

use std::collections::HashMap;

use movemgr_core::device::{
    XATTR_LAST_MODIFIED_TIME, XATTR_LOCAL_CLOUD_STATE, XATTR_SONG_COLOR, XATTR_SONG_INDEX,
    XATTR_WAS_EXTERNALLY_MODIFIED,
};
use movemgr_core::SetMetadata;

use crate::error::ClientError;

/// Tokenize `getfattr -d` output into a key/value map.
///
/// Comment lines (`# file: ...`) and blanks are skipped. Values keep exactly
/// what the dump printed, minus one level of surrounding double quotes.
pub fn parse_attr_dump(output: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        attrs.insert(key.to_string(), unquote(raw).to_string());
    }
    attrs
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw)
}

/// Build a [`SetMetadata`] from a dumped attribute map.
///
/// `index` and `color` are required and must parse; the state and timestamp
/// attributes are optional because older firmware omits them.
pub fn metadata_from_attrs(
    set_id: &str,
    name: &str,
    path: &str,
    attrs: &HashMap<String, String>,
) -> Result<SetMetadata, ClientError> {
    Ok(SetMetadata {
        id: set_id.to_string(),
        name: name.to_string(),
        index: required_u8(attrs, XATTR_SONG_INDEX, path)?,
        color: required_u8(attrs, XATTR_SONG_COLOR, path)?,
        local_cloud_state: attrs.get(XATTR_LOCAL_CLOUD_STATE).cloned(),
        last_modified_time: attrs.get(XATTR_LAST_MODIFIED_TIME).cloned(),
        was_externally_modified: attrs
            .get(XATTR_WAS_EXTERNALLY_MODIFIED)
            .map(|v| v == "true")
            .unwrap_or(false),
    })
}

fn required_u8(
    attrs: &HashMap<String, String>,
    key: &str,
    path: &str,
) -> Result<u8, ClientError> {
    let value = attrs.get(key).ok_or_else(|| ClientError::MissingAttribute {
        key: key.to_string(),
        path: path.to_string(),
    })?;
    value.parse().map_err(|_| ClientError::BadAttribute {
        key: key.to_string(),
        value: value.clone(),
    })
}

/// The attribute writes an upload must perform, in order.
///
/// Cloud state and last-modified are only written when present; the
/// externally-modified flag is always reset to `false` since the manager is
/// now the last writer.
pub fn attr_writes(meta: &SetMetadata) -> Vec<(&'static str, String)> {
    let mut writes = vec![
        (XATTR_SONG_INDEX, meta.index.to_string()),
        (XATTR_SONG_COLOR, meta.color.to_string()),
    ];
    if let Some(state) = &meta.local_cloud_state {
        writes.push((XATTR_LOCAL_CLOUD_STATE, state.clone()));
    }
    if let Some(modified) = &meta.last_modified_time {
        writes.push((XATTR_LAST_MODIFIED_TIME, modified.clone()));
    }
    writes.push((XATTR_WAS_EXTERNALLY_MODIFIED, "false".to_string()));
    writes
}
