//! Account location resolution
//!
//! Finds the unit that directly holds an account by walking the whole
//! organization and scanning each unit's membership. The catalog is rebuilt
//! on every call; nothing is cached, since the tree may be changed by other
//! actors between calls.

use tracing::{debug, info};

use orgmove_common::remote::UNIT_NOT_FOUND_CODE;
use orgmove_common::{OrganizationalUnit, OrganizationsApi, PlacementError, Result, TraversalPolicy};

use crate::walker::build_catalog;

/// Whether `account_id` is directly in `unit_id`, scanning every page
///
/// Stops at the first page containing the account.
pub async fn unit_contains_account(
    api: &dyn OrganizationsApi,
    unit_id: &str,
    account_id: &str,
) -> Result<bool> {
    let mut next_token: Option<String> = None;

    loop {
        let page = api
            .list_accounts_for_parent(unit_id, next_token.take())
            .await
            .map_err(|cause| PlacementError::Pagination {
                operation: "accounts",
                parent_id: unit_id.to_string(),
                cause,
            })?;

        if page.items.iter().any(|a| a.id == account_id) {
            return Ok(true);
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => return Ok(false),
        }
    }
}

/// Fetch the organization root as a traversable unit
pub async fn organization_root(api: &dyn OrganizationsApi) -> Result<OrganizationalUnit> {
    let roots = api.list_roots().await?;
    roots
        .first()
        .map(OrganizationalUnit::from)
        .ok_or_else(|| PlacementError::not_found("no organization root"))
}

/// Whether `unit_id` names the organization root or an existing unit
pub async fn unit_exists(api: &dyn OrganizationsApi, unit_id: &str) -> Result<bool> {
    if api.list_roots().await?.iter().any(|r| r.id == unit_id) {
        return Ok(true);
    }

    match api.describe_organizational_unit(unit_id).await {
        Ok(unit) => Ok(unit.is_some()),
        Err(e) if e.code_equals(UNIT_NOT_FOUND_CODE) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the unit currently holding `account_id`
///
/// Returns `(unit_id, unit_name)`. Units are scanned in unspecified order; an
/// account belongs to exactly one parent, so the first hit is the answer.
pub async fn find_account_unit(
    api: &dyn OrganizationsApi,
    account_id: &str,
    policy: TraversalPolicy,
) -> Result<(String, String)> {
    let root = organization_root(api).await?;
    let catalog = build_catalog(api, &root, policy).await?;

    for (unit_id, unit_name) in catalog.iter() {
        if unit_contains_account(api, unit_id, account_id).await? {
            info!(account = %account_id, unit = %unit_id, "Resolved account unit");
            return Ok((unit_id.to_string(), unit_name.to_string()));
        }
    }

    debug!(
        account = %account_id,
        units = catalog.len(),
        skipped = catalog.skipped_subtrees(),
        "Account not found in any unit"
    );
    Err(PlacementError::not_found(format!(
        "no OU found for account {}.",
        account_id
    )))
}
