//! Placement reconciler
//!
//! Drives a placement declaration through its lifecycle:
//! Absent → Pending → Confirmed → Absent
//!
//! - **create**: move source → destination, wait until the destination lists
//!   the account, then record the placement
//! - **read**: re-check the account; if it disappeared remotely the record is
//!   dropped without error (drift)
//! - **update**: move to the new destination and confirm
//! - **delete**: confirm the account is still in the destination, move it
//!   back to the source, and confirm the reversal
//!
//! Every move+confirm sequence runs under one move lock shared by all clones
//! of a reconciler, so at most one such sequence is in flight at a time even
//! for unrelated accounts. The lock is held for the whole confirmation poll;
//! with an unbounded poll a move that never becomes visible blocks every other
//! placement until [`Reconciler::shutdown`] cancels it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use orgmove_common::{OrganizationsApi, PlacementError, PlacementKey, ReconcilerConfig, Result};

use crate::lookup::find_account;
use crate::mover::move_account;
use crate::poller::await_unit_membership;
use crate::resolver::{find_account_unit, unit_exists};

/// Lifecycle phase of a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementPhase {
    /// No placement recorded
    Absent,
    /// Move issued, not yet confirmed
    Pending,
    /// Placement recorded and verified
    Confirmed,
}

impl fmt::Display for PlacementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementPhase::Absent => write!(f, "Absent"),
            PlacementPhase::Pending => write!(f, "Pending"),
            PlacementPhase::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// A declared placement as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPlacement {
    /// Account to place
    pub account_id: String,
    /// Unit the account is currently in
    pub source_ou: String,
    /// Unit the account should be moved into
    pub destination_ou: String,
}

impl DesiredPlacement {
    /// Build a declaration
    pub fn new(
        account_id: impl Into<String>,
        source_ou: impl Into<String>,
        destination_ou: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            source_ou: source_ou.into(),
            destination_ou: destination_ou.into(),
        }
    }

    /// Structured identity of this declaration
    pub fn key(&self) -> PlacementKey {
        PlacementKey::new(&*self.account_id, &*self.source_ou, &*self.destination_ou)
    }
}

impl From<PlacementKey> for DesiredPlacement {
    fn from(key: PlacementKey) -> Self {
        Self {
            account_id: key.account_id,
            source_ou: key.source_ou,
            destination_ou: key.destination_ou,
        }
    }
}

/// Persisted record of a confirmed placement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementState {
    /// External key, `account/source/destination`
    pub id: String,
    /// Account that was placed
    pub account_id: String,
    /// Unit the account was moved out of
    pub source_ou: String,
    /// Unit the account now resides in
    pub destination_ou: String,
}

impl PlacementState {
    /// Record for a key; the id is derived from the three fields
    pub fn from_key(key: &PlacementKey) -> Self {
        Self {
            id: key.to_string(),
            account_id: key.account_id.clone(),
            source_ou: key.source_ou.clone(),
            destination_ou: key.destination_ou.clone(),
        }
    }

    /// Structured identity of this record
    pub fn key(&self) -> PlacementKey {
        PlacementKey::new(&*self.account_id, &*self.source_ou, &*self.destination_ou)
    }
}

/// Reconciles placement declarations against the organization
#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn OrganizationsApi>,
    config: Arc<ReconcilerConfig>,
    move_lock: Arc<Mutex<()>>,
    cancel: CancellationToken,
}

impl Reconciler {
    /// Create a reconciler with its own move lock
    pub fn new(api: Arc<dyn OrganizationsApi>, config: ReconcilerConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
            move_lock: Arc::new(Mutex::new(())),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel in-flight and future confirmation polls
    pub fn shutdown(&self) {
        info!("Cancelling placement confirmation polls");
        self.cancel.cancel();
    }

    /// Resolve the unit currently holding an account
    pub async fn resolve(&self, account_id: &str) -> Result<(String, String)> {
        find_account_unit(self.api.as_ref(), account_id, self.config.traversal).await
    }

    /// Move the account to its destination and record the placement
    pub async fn create(&self, desired: &DesiredPlacement) -> Result<PlacementState> {
        let key = desired.key();
        transition(&key, PlacementPhase::Absent, PlacementPhase::Pending);

        self.move_and_confirm(&key.account_id, &key.source_ou, &key.destination_ou, None)
            .await?;

        transition(&key, PlacementPhase::Pending, PlacementPhase::Confirmed);
        self.read(&PlacementState::from_key(&key), true)
            .await?
            .ok_or_else(|| PlacementError::not_found(format!("account {} disappeared", key.account_id)))
    }

    /// Refresh a recorded placement
    ///
    /// Returns `None` when the account no longer exists (or is suspended) and
    /// the record is not new; the caller should drop it.
    pub async fn read(&self, state: &PlacementState, is_new: bool) -> Result<Option<PlacementState>> {
        let key = state.key();

        let account = match find_account(self.api.as_ref(), &key.account_id).await {
            Ok(account) => account,
            Err(e) if e.is_not_found() && !is_new => {
                warn!(
                    placement = %state.id,
                    error = %e,
                    "Account does not exist, removing from state"
                );
                transition(&key, PlacementPhase::Confirmed, PlacementPhase::Absent);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let key = PlacementKey::new(account.id, key.source_ou, key.destination_ou);
        Ok(Some(PlacementState::from_key(&key)))
    }

    /// Apply a changed declaration to a recorded placement
    ///
    /// The account is moved out of the unit it currently occupies: the old
    /// destination when the account is unchanged, the declared source when a
    /// different account is named. A change of source alone only re-verifies
    /// residency. A changed source must name an existing unit, since delete
    /// moves the account back there. Returns `None` on drift, like
    /// [`Reconciler::read`].
    pub async fn update(
        &self,
        old: &PlacementState,
        desired: &DesiredPlacement,
    ) -> Result<Option<PlacementState>> {
        let old_key = old.key();
        let new_key = desired.key();

        if old_key == new_key {
            return self.read(old, false).await;
        }

        if let Err(e) = find_account(self.api.as_ref(), &new_key.account_id).await {
            if e.is_not_found() {
                warn!(
                    placement = %old.id,
                    error = %e,
                    "Account does not exist, removing from state"
                );
                transition(&old_key, PlacementPhase::Confirmed, PlacementPhase::Absent);
                return Ok(None);
            }
            return Err(e);
        }

        if new_key.source_ou != old_key.source_ou
            && !unit_exists(self.api.as_ref(), &new_key.source_ou).await?
        {
            return Err(PlacementError::UnknownUnit(new_key.source_ou.clone()));
        }

        let from = if old_key.account_id == new_key.account_id {
            old_key.destination_ou.as_str()
        } else {
            new_key.source_ou.as_str()
        };

        transition(&new_key, PlacementPhase::Confirmed, PlacementPhase::Pending);
        if from == new_key.destination_ou {
            self.confirm_residency(&new_key.account_id, &new_key.destination_ou)
                .await?;
        } else {
            self.move_and_confirm(
                &new_key.account_id,
                from,
                &new_key.destination_ou,
                Some(format!("error updating account move for {}", new_key.account_id)),
            )
            .await?;
        }
        transition(&new_key, PlacementPhase::Pending, PlacementPhase::Confirmed);

        self.read(&PlacementState::from_key(&new_key), false).await
    }

    /// Revert a placement by moving the account back to its source
    ///
    /// Aborts without moving anything if the account cannot be confirmed in
    /// the destination first.
    pub async fn delete(&self, state: &PlacementState) -> Result<()> {
        let key = state.key();
        let _guard = self.move_lock.lock().await;

        await_unit_membership(
            self.api.as_ref(),
            &key.account_id,
            &key.destination_ou,
            &self.config.poll,
            &self.cancel,
        )
        .await
        .map_err(|e| {
            PlacementError::confirmation(
                format!(
                    "account {} not in correct ou, {}",
                    key.account_id, key.destination_ou
                ),
                e,
            )
        })?;

        transition(&key, PlacementPhase::Confirmed, PlacementPhase::Pending);
        let back = key.reversed();
        move_account(
            self.api.as_ref(),
            &back.account_id,
            &back.source_ou,
            &back.destination_ou,
        )
        .await
        .map_err(|e| {
            PlacementError::move_failed(
                format!("error reverting account move for {}", back.account_id),
                e,
            )
        })?;

        await_unit_membership(
            self.api.as_ref(),
            &back.account_id,
            &back.destination_ou,
            &self.config.poll,
            &self.cancel,
        )
        .await
        .map_err(|e| {
            PlacementError::confirmation(
                format!(
                    "unable to move account {} to {}",
                    back.account_id, back.destination_ou
                ),
                e,
            )
        })?;

        transition(&key, PlacementPhase::Pending, PlacementPhase::Absent);
        Ok(())
    }

    /// Adopt an existing placement from its persisted id
    pub async fn import(&self, id: &str) -> Result<PlacementState> {
        let key: PlacementKey = id.parse()?;
        self.read(&PlacementState::from_key(&key), false)
            .await?
            .ok_or_else(|| PlacementError::not_found(format!("account {} not found", key.account_id)))
    }

    async fn move_and_confirm(
        &self,
        account_id: &str,
        from: &str,
        to: &str,
        context: Option<String>,
    ) -> Result<()> {
        let _guard = self.move_lock.lock().await;

        move_account(self.api.as_ref(), account_id, from, to)
            .await
            .map_err(|e| match context {
                Some(context) => PlacementError::move_failed(context, e),
                None => e,
            })?;

        await_unit_membership(
            self.api.as_ref(),
            account_id,
            to,
            &self.config.poll,
            &self.cancel,
        )
        .await
        .map_err(|e| {
            PlacementError::confirmation(
                format!("unable to move account {} to {}", account_id, to),
                e,
            )
        })
    }

    async fn confirm_residency(&self, account_id: &str, unit_id: &str) -> Result<()> {
        let _guard = self.move_lock.lock().await;

        await_unit_membership(
            self.api.as_ref(),
            account_id,
            unit_id,
            &self.config.poll,
            &self.cancel,
        )
        .await
        .map_err(|e| {
            PlacementError::confirmation(
                format!("account {} not in correct ou, {}", account_id, unit_id),
                e,
            )
        })
    }
}

fn transition(key: &PlacementKey, from: PlacementPhase, to: PlacementPhase) {
    info!(placement = %key, from = %from, to = %to, "Placement phase transition");
}
