//! Account move execution
//!
//! Issues a single move between two declared parents. The control plane
//! applies moves asynchronously; use [`crate::poller`] to confirm the result.
//! A rejected move says nothing about where the account is now.

use tracing::{info, warn};

use orgmove_common::{MoveAccountRequest, OrganizationsApi, PlacementError, Result};

use crate::lookup::find_account;

/// Move `account_id` from `source_ou` to `destination_ou`
///
/// Fails fast with the lookup error if the account is absent or suspended.
pub async fn move_account(
    api: &dyn OrganizationsApi,
    account_id: &str,
    source_ou: &str,
    destination_ou: &str,
) -> Result<()> {
    let account = find_account(api, account_id).await?;

    let request = MoveAccountRequest::new(account.id, source_ou, destination_ou);
    if let Err(cause) = api.move_account(&request).await {
        warn!(
            account = %account_id,
            from = %source_ou,
            to = %destination_ou,
            error = %cause,
            "Move rejected"
        );
        return Err(PlacementError::RemoteRejected {
            account_id: account_id.to_string(),
            source_unit: source_ou.to_string(),
            destination_unit: destination_ou.to_string(),
            request: request.to_string(),
            cause,
        });
    }

    info!(account = %account_id, from = %source_ou, to = %destination_ou, "Move issued");
    Ok(())
}
