//! Tag reconciliation for accounts
//!
//! Computes what changed between two tag maps and applies it: removed keys
//! are untagged first, then new or changed pairs are tagged.

use tracing::debug;

use orgmove_common::{OrganizationsApi, PlacementError, Result, Tag, TagMap};

/// Tags present in `old` but not in `new`
pub fn removed_tags(old: &TagMap, new: &TagMap) -> TagMap {
    old.iter()
        .filter(|(k, _)| !new.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Tags in `new` that are missing from `old` or have a different value
pub fn updated_tags(old: &TagMap, new: &TagMap) -> TagMap {
    new.iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Convert a tag map into the remote representation
pub fn to_remote_tags(tags: &TagMap) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Bring the tags of `resource_id` from `old` to `new`
pub async fn update_tags(
    api: &dyn OrganizationsApi,
    resource_id: &str,
    old: &TagMap,
    new: &TagMap,
) -> Result<()> {
    let removed = removed_tags(old, new);
    if !removed.is_empty() {
        let keys: Vec<String> = removed.into_keys().collect();
        debug!(resource = %resource_id, keys = ?keys, "Removing tags");
        api.untag_resource(resource_id, &keys)
            .await
            .map_err(|cause| PlacementError::Tagging {
                action: "untagging",
                resource_id: resource_id.to_string(),
                cause,
            })?;
    }

    let updated = updated_tags(old, new);
    if !updated.is_empty() {
        debug!(resource = %resource_id, count = updated.len(), "Applying tags");
        api.tag_resource(resource_id, &to_remote_tags(&updated))
            .await
            .map_err(|cause| PlacementError::Tagging {
                action: "tagging",
                resource_id: resource_id.to_string(),
                cause,
            })?;
    }

    Ok(())
}
