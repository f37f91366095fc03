//! Direct parent lookup
//!
//! Cheaper than a full catalog walk when only the immediate parent of a known
//! account or unit is needed.

use orgmove_common::{OrganizationalUnit, OrganizationsApi, ParentType, PlacementError, Result};

/// The organizational unit directly above `child_id`
pub async fn find_parent_unit(
    api: &dyn OrganizationsApi,
    child_id: &str,
) -> Result<OrganizationalUnit> {
    let parents = api.list_parents(child_id).await?;

    let parent_id = parents
        .iter()
        .find(|p| p.parent_type == ParentType::OrganizationalUnit)
        .map(|p| p.id.clone())
        .ok_or_else(|| PlacementError::not_found(format!("no OU parent found for {}", child_id)))?;

    api.describe_organizational_unit(&parent_id)
        .await?
        .ok_or_else(|| PlacementError::not_found(format!("parent OU {} not found", parent_id)))
}

/// The id of the organization root directly above `child_id`
pub async fn find_parent_root_id(api: &dyn OrganizationsApi, child_id: &str) -> Result<String> {
    let parents = api.list_parents(child_id).await?;

    parents
        .into_iter()
        .find(|p| p.parent_type == ParentType::Root)
        .map(|p| p.id)
        .ok_or_else(|| {
            PlacementError::not_found(format!(
                "no organization root parent found for {}",
                child_id
            ))
        })
}
