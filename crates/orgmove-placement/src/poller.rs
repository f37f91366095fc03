//! Move confirmation polling
//!
//! After a move the control plane may keep listing the account under its old
//! parent for a while. The poller lists the target unit (every page) until
//! the account shows up.
//!
//! With the default [`PollConfig`] there is no attempt limit: a move that never
//! becomes visible keeps the poll, and the reconciler's move lock, busy until
//! the cancellation token fires. Listing errors end the poll immediately.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use orgmove_common::{OrganizationsApi, PlacementError, PollConfig, Result};

use crate::resolver::unit_contains_account;

/// Wait until `account_id` is listed directly under `unit_id`
pub async fn await_unit_membership(
    api: &dyn OrganizationsApi,
    account_id: &str,
    unit_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(PlacementError::Cancelled);
        }
        attempt = attempt.saturating_add(1);

        if unit_contains_account(api, unit_id, account_id).await? {
            info!(account = %account_id, unit = %unit_id, attempt, "Confirmed account membership");
            return Ok(());
        }

        if config.exhausted(attempt) {
            return Err(PlacementError::ConfirmationFailed {
                account_id: account_id.to_string(),
                unit_id: unit_id.to_string(),
                attempts: attempt,
            });
        }

        debug!(
            account = %account_id,
            unit = %unit_id,
            attempt,
            delay_ms = config.interval.as_millis() as u64,
            "Account not yet listed, waiting"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(PlacementError::Cancelled),
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::mock::MockApi;
    use orgmove_common::{Account, InMemoryOrganization, MoveAccountRequest, OrganizationsApi, Page, RemoteError};

    fn fast() -> PollConfig {
        PollConfig::unbounded().interval(Duration::from_millis(1))
    }

    fn org() -> InMemoryOrganization {
        let org = InMemoryOrganization::new("r-root", "Root").with_page_size(1);
        org.add_unit("ou-a", "A", "r-root")
            .add_unit("ou-b", "B", "r-root")
            .add_account("100000000000", "filler", "ou-b")
            .add_account("111111111111", "dev", "ou-a");
        org
    }

    #[tokio::test]
    async fn returns_immediately_when_present() {
        let org = org();
        await_unit_membership(&org, "111111111111", "ou-a", &fast(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(org.listing_calls("ou-a"), 1);
    }

    #[tokio::test]
    async fn waits_out_eventual_consistency() {
        let org = org().with_move_lag(3);
        org.move_account(&MoveAccountRequest::new("111111111111", "ou-a", "ou-b"))
            .await
            .unwrap();

        await_unit_membership(&org, "111111111111", "ou-b", &fast(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(org.move_log()[0].observed_at.is_some());
    }

    #[tokio::test]
    async fn checks_beyond_the_first_page() {
        // page size 1: the account sorts after the filler, so it is on page two
        let org = org();
        org.move_account(&MoveAccountRequest::new("111111111111", "ou-a", "ou-b"))
            .await
            .unwrap();

        await_unit_membership(
            &org,
            "111111111111",
            "ou-b",
            &PollConfig::with_max_attempts(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn bounded_poll_gives_up() {
        let org = org();
        let err = await_unit_membership(
            &org,
            "111111111111",
            "ou-b",
            &PollConfig::with_max_attempts(3).interval(Duration::from_millis(1)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            PlacementError::ConfirmationFailed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected ConfirmationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_error_ends_poll() {
        let mut api = MockApi::new();
        api.expect_list_accounts_for_parent()
            .times(1)
            .returning(|_, _| Err(RemoteError::message("access denied")));

        let err = await_unit_membership(&api, "1", "ou-b", &fast(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlacementError::Pagination { .. }));
    }

    #[tokio::test]
    async fn unbounded_poll_keeps_going_until_visible() {
        let mut api = MockApi::new();
        let mut calls = 0;
        api.expect_list_accounts_for_parent()
            .times(50)
            .returning(move |_, _| {
                calls += 1;
                if calls < 50 {
                    Ok(Page::last(Vec::new()))
                } else {
                    Ok(Page::last(vec![Account::new("1", "one")]))
                }
            });

        await_unit_membership(&api, "1", "ou-b", &fast(), &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancellation_interrupts_wait() {
        let org = org();
        let cancel = CancellationToken::new();
        let config = PollConfig::unbounded().interval(Duration::from_secs(3600));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = await_unit_membership(&org, "111111111111", "ou-b", &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PlacementError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_token_skips_listing() {
        let org = org();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = await_unit_membership(&org, "111111111111", "ou-a", &fast(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PlacementError::Cancelled));
        assert_eq!(org.listing_calls("ou-a"), 0);
    }
}
