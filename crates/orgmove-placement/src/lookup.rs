//! Account lookup
//!
//! A suspended account is unusable for placement, so it is reported the same
//! way as one that does not exist.

use tracing::debug;

use orgmove_common::{
    Account, AccountStatus, OrganizationsApi, PlacementError, Result, TraversalPolicy,
    ACCOUNT_NOT_FOUND_CODE,
};

use crate::resolver::find_account_unit;

/// Fetch an account, classifying absence and suspension as `NotFound`
pub async fn find_account(api: &dyn OrganizationsApi, account_id: &str) -> Result<Account> {
    let request = format!("DescribeAccount {{ AccountId: {} }}", account_id);

    let account = match api.describe_account(account_id).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return Err(PlacementError::not_found_for(
                format!("account not found, {}", account_id),
                request,
            ))
        }
        Err(e) if e.code_equals(ACCOUNT_NOT_FOUND_CODE) => {
            return Err(PlacementError::not_found_for(e.to_string(), request));
        }
        Err(e) => return Err(PlacementError::Remote(e)),
    };

    if account.status == AccountStatus::Suspended {
        debug!(account = %account_id, "Account is suspended, treating as absent");
        return Err(PlacementError::not_found_for(
            account.status.to_string(),
            request,
        ));
    }

    Ok(account)
}

/// Fetch an account together with the unit that currently holds it
///
/// Returns the account, the unit id and the unit name.
pub async fn find_account_with_unit(
    api: &dyn OrganizationsApi,
    account_id: &str,
    policy: TraversalPolicy,
) -> Result<(Account, String, String)> {
    let account = find_account(api, account_id).await?;
    let (unit_id, unit_name) = find_account_unit(api, &account.id, policy).await?;
    Ok((account, unit_id, unit_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockApi;
    use orgmove_common::{InMemoryOrganization, RemoteError};

    #[tokio::test]
    async fn active_account_is_returned() {
        let mut api = MockApi::new();
        api.expect_describe_account()
            .returning(|id| Ok(Some(Account::new(id, "prod"))));

        let account = find_account(&api, "111111111111").await.unwrap();
        assert_eq!(account.id, "111111111111");
        assert_eq!(account.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn not_found_code_is_not_found() {
        let mut api = MockApi::new();
        api.expect_describe_account()
            .returning(|_| Err(RemoteError::new(ACCOUNT_NOT_FOUND_CODE, "no such account")));

        let err = find_account(&api, "111111111111").await.unwrap_err();
        match err {
            PlacementError::NotFound { message, request } => {
                assert!(message.contains("no such account"));
                assert!(request.unwrap().contains("111111111111"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_payload_is_not_found() {
        let mut api = MockApi::new();
        api.expect_describe_account().returning(|_| Ok(None));

        let err = find_account(&api, "111111111111").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("account not found, 111111111111"));
    }

    #[tokio::test]
    async fn suspended_account_is_not_found() {
        let mut api = MockApi::new();
        api.expect_describe_account().returning(|id| {
            Ok(Some(Account {
                id: id.to_string(),
                name: "old".to_string(),
                status: AccountStatus::Suspended,
            }))
        });

        let err = find_account(&api, "111111111111").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("SUSPENDED"));
    }

    #[tokio::test]
    async fn pending_closure_is_still_usable() {
        let mut api = MockApi::new();
        api.expect_describe_account().returning(|id| {
            Ok(Some(Account {
                id: id.to_string(),
                name: "closing".to_string(),
                status: AccountStatus::PendingClosure,
            }))
        });

        assert!(find_account(&api, "1").await.is_ok());
    }

    #[tokio::test]
    async fn other_remote_errors_propagate() {
        let mut api = MockApi::new();
        api.expect_describe_account()
            .returning(|_| Err(RemoteError::new("TooManyRequestsException", "slow down")));

        let err = find_account(&api, "111111111111").await.unwrap_err();
        assert!(matches!(err, PlacementError::Remote(_)));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn account_with_unit_combines_lookup_and_resolution() {
        let org = InMemoryOrganization::new("r-root", "Root");
        org.add_unit("ou-root-aaa", "Sandbox", "r-root")
            .add_account("111111111111", "dev", "ou-root-aaa");

        let (account, unit_id, unit_name) =
            find_account_with_unit(&org, "111111111111", TraversalPolicy::Strict)
                .await
                .unwrap();
        assert_eq!(account.name, "dev");
        assert_eq!(unit_id, "ou-root-aaa");
        assert_eq!(unit_name, "Sandbox");

        let err = find_account_with_unit(&org, "222222222222", TraversalPolicy::Strict)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
