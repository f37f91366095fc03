//! In-memory organization backend
//!
//! Implements [`OrganizationsApi`] over a serializable tree. Used by tests and
//! by the CLI simulator. Beyond plain storage it models the behaviour the
//! reconciler has to tolerate:
//!
//! - pagination with a configurable page size
//! - eventually consistent moves: after a move, the destination's membership
//!   listing keeps showing the old placement for `move_lag` listings
//! - injected listing failures for chosen parents and move rejection
//!
//! Every move is recorded with the instant it was issued and the instant the
//! destination listing first showed the account, so callers can check that
//! move+confirm windows never overlapped.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::remote::{
    Account, AccountStatus, MoveAccountRequest, OrganizationalUnit, OrganizationsApi, Page,
    Parent, ParentType, RemoteError, Root, Tag, TagMap, ACCOUNT_NOT_FOUND_CODE,
    DESTINATION_PARENT_NOT_FOUND_CODE, SOURCE_PARENT_NOT_FOUND_CODE, TARGET_NOT_FOUND_CODE,
};

/// Default number of items per listing page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A unit and the parent it hangs off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    /// Unit identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Parent unit or root identifier
    pub parent_id: String,
}

/// An account and the parent it is placed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: AccountStatus,
    /// Parent unit or root identifier
    pub parent_id: String,
    /// Tags on the account
    #[serde(default)]
    pub tags: TagMap,
}

/// Serializable contents of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSnapshot {
    /// The organization root
    pub root: Root,
    /// All units below the root
    #[serde(default)]
    pub units: Vec<UnitRecord>,
    /// All accounts
    #[serde(default)]
    pub accounts: Vec<AccountRecord>,
}

/// A move accepted by the backend
#[derive(Debug, Clone)]
pub struct MoveRecord {
    /// The accepted request
    pub request: MoveAccountRequest,
    /// When the move was accepted
    pub issued_at: Instant,
    /// When a destination listing first showed the account
    pub observed_at: Option<Instant>,
}

/// A move whose result is not yet visible in listings
#[derive(Debug, Clone)]
struct PendingMove {
    from: String,
    to: String,
    stale_listings: u32,
}

#[derive(Debug)]
struct State {
    snapshot: OrganizationSnapshot,
    pending: HashMap<String, PendingMove>,
    failing_parents: HashSet<String>,
    failing_unit_parents: HashSet<String>,
    reject_moves: Option<RemoteError>,
    moves: Vec<MoveRecord>,
    listing_calls: HashMap<String, u32>,
}

impl State {
    fn is_parent(&self, id: &str) -> bool {
        self.snapshot.root.id == id || self.snapshot.units.iter().any(|u| u.id == id)
    }

    fn account(&self, id: &str) -> Option<&AccountRecord> {
        self.snapshot.accounts.iter().find(|a| a.id == id)
    }

    fn account_mut(&mut self, id: &str) -> Option<&mut AccountRecord> {
        self.snapshot.accounts.iter_mut().find(|a| a.id == id)
    }

    fn parent_of(&self, child_id: &str) -> Option<&str> {
        if let Some(account) = self.account(child_id) {
            return Some(&account.parent_id);
        }
        self.snapshot
            .units
            .iter()
            .find(|u| u.id == child_id)
            .map(|u| u.parent_id.as_str())
    }

    fn check_listing(&mut self, parent_id: &str) -> Result<(), RemoteError> {
        *self.listing_calls.entry(parent_id.to_string()).or_default() += 1;
        if self.failing_parents.contains(parent_id) {
            return Err(RemoteError::new(
                "ServiceException",
                format!("injected failure listing {}", parent_id),
            ));
        }
        if !self.is_parent(parent_id) {
            return Err(RemoteError::new(
                "ParentNotFoundException",
                format!("parent {} not found", parent_id),
            ));
        }
        Ok(())
    }

    /// Accounts as currently visible under `parent_id`, honouring pending moves
    fn visible_members(&self, parent_id: &str) -> Vec<Account> {
        let mut members: Vec<Account> = self
            .snapshot
            .accounts
            .iter()
            .filter(|a| {
                let visible_parent = match self.pending.get(&a.id) {
                    Some(p) if p.stale_listings > 0 => p.from.as_str(),
                    _ => a.parent_id.as_str(),
                };
                visible_parent == parent_id
            })
            .map(|a| Account {
                id: a.id.clone(),
                name: a.name.clone(),
                status: a.status,
            })
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        members
    }

    /// Age every pending move into `parent_id` by one listing
    fn age_pending(&mut self, parent_id: &str) {
        let mut settled = Vec::new();
        for (account_id, pending) in self.pending.iter_mut() {
            if pending.to == parent_id {
                pending.stale_listings = pending.stale_listings.saturating_sub(1);
                if pending.stale_listings == 0 {
                    settled.push(account_id.clone());
                }
            }
        }
        for account_id in settled {
            self.pending.remove(&account_id);
        }
    }

    fn record_observed(&mut self, parent_id: &str, members: &[Account]) {
        let now = Instant::now();
        for account in members {
            if let Some(record) = self
                .moves
                .iter_mut()
                .rev()
                .find(|m| m.request.account_id == account.id)
            {
                if record.request.destination_parent_id == parent_id && record.observed_at.is_none()
                {
                    record.observed_at = Some(now);
                }
            }
        }
    }
}

/// Thread-safe in-memory organization
#[derive(Debug)]
pub struct InMemoryOrganization {
    state: Mutex<State>,
    page_size: usize,
    move_lag: u32,
}

impl InMemoryOrganization {
    /// Create an organization with only a root
    pub fn new(root_id: impl Into<String>, root_name: impl Into<String>) -> Self {
        Self::from_snapshot(OrganizationSnapshot {
            root: Root {
                id: root_id.into(),
                name: root_name.into(),
            },
            units: Vec::new(),
            accounts: Vec::new(),
        })
    }

    /// Create an organization from a snapshot
    pub fn from_snapshot(snapshot: OrganizationSnapshot) -> Self {
        Self {
            state: Mutex::new(State {
                snapshot,
                pending: HashMap::new(),
                failing_parents: HashSet::new(),
                failing_unit_parents: HashSet::new(),
                reject_moves: None,
                moves: Vec::new(),
                listing_calls: HashMap::new(),
            }),
            page_size: DEFAULT_PAGE_SIZE,
            move_lag: 0,
        }
    }

    /// Set the number of items per listing page (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set how many destination listings miss a move after it is accepted
    pub fn with_move_lag(mut self, listings: u32) -> Self {
        self.move_lag = listings;
        self
    }

    /// Add a unit under `parent_id`
    pub fn add_unit(&self, id: &str, name: &str, parent_id: &str) -> &Self {
        self.state.lock().snapshot.units.push(UnitRecord {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        });
        self
    }

    /// Add an active account under `parent_id`
    pub fn add_account(&self, id: &str, name: &str, parent_id: &str) -> &Self {
        self.state.lock().snapshot.accounts.push(AccountRecord {
            id: id.to_string(),
            name: name.to_string(),
            status: AccountStatus::Active,
            parent_id: parent_id.to_string(),
            tags: TagMap::new(),
        });
        self
    }

    /// Change an account's status; returns false if the account is unknown
    pub fn set_account_status(&self, id: &str, status: AccountStatus) -> bool {
        match self.state.lock().account_mut(id) {
            Some(account) => {
                account.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove an account entirely
    pub fn remove_account(&self, id: &str) {
        self.state.lock().snapshot.accounts.retain(|a| a.id != id);
    }

    /// Make every listing under `parent_id` fail
    pub fn fail_listing(&self, parent_id: &str) {
        self.state
            .lock()
            .failing_parents
            .insert(parent_id.to_string());
    }

    /// Make only child unit listings under `parent_id` fail; account listings
    /// keep working
    pub fn fail_unit_listing(&self, parent_id: &str) {
        self.state
            .lock()
            .failing_unit_parents
            .insert(parent_id.to_string());
    }

    /// Stop injecting listing failures
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_parents.clear();
        state.failing_unit_parents.clear();
        state.reject_moves = None;
    }

    /// Reject every subsequent move with `error`
    pub fn reject_moves(&self, error: RemoteError) {
        self.state.lock().reject_moves = Some(error);
    }

    /// Authoritative parent of an account, ignoring listing lag
    pub fn parent_of(&self, account_id: &str) -> Option<String> {
        self.state
            .lock()
            .account(account_id)
            .map(|a| a.parent_id.clone())
    }

    /// Tags currently on an account
    pub fn tags_of(&self, account_id: &str) -> TagMap {
        self.state
            .lock()
            .account(account_id)
            .map(|a| a.tags.clone())
            .unwrap_or_default()
    }

    /// Every move accepted so far, in order
    pub fn move_log(&self) -> Vec<MoveRecord> {
        self.state.lock().moves.clone()
    }

    /// Number of listing calls (units or accounts) made against `parent_id`
    pub fn listing_calls(&self, parent_id: &str) -> u32 {
        self.state
            .lock()
            .listing_calls
            .get(parent_id)
            .copied()
            .unwrap_or(0)
    }

    /// Copy of the current contents, with pending moves applied
    pub fn snapshot(&self) -> OrganizationSnapshot {
        self.state.lock().snapshot.clone()
    }

    fn paginate<T: Clone>(&self, items: &[T], next_token: Option<String>) -> Result<Page<T>, RemoteError> {
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| RemoteError::new("InvalidInputException", format!("bad token {}", token)))?,
            None => 0,
        };
        let end = (start + self.page_size).min(items.len());
        let page = items.get(start..end).unwrap_or_default().to_vec();
        if end < items.len() {
            Ok(Page::with_next(page, end.to_string()))
        } else {
            Ok(Page::last(page))
        }
    }
}

#[async_trait]
impl OrganizationsApi for InMemoryOrganization {
    async fn describe_account(&self, account_id: &str) -> Result<Option<Account>, RemoteError> {
        let state = self.state.lock();
        match state.account(account_id) {
            Some(a) => Ok(Some(Account {
                id: a.id.clone(),
                name: a.name.clone(),
                status: a.status,
            })),
            None => Err(RemoteError::new(
                ACCOUNT_NOT_FOUND_CODE,
                format!("account {} not found", account_id),
            )),
        }
    }

    async fn list_roots(&self) -> Result<Vec<Root>, RemoteError> {
        Ok(vec![self.state.lock().snapshot.root.clone()])
    }

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<OrganizationalUnit>, RemoteError> {
        let units = {
            let mut state = self.state.lock();
            state.check_listing(parent_id)?;
            if state.failing_unit_parents.contains(parent_id) {
                return Err(RemoteError::new(
                    "ServiceException",
                    format!("injected failure listing units under {}", parent_id),
                ));
            }
            let mut units: Vec<OrganizationalUnit> = state
                .snapshot
                .units
                .iter()
                .filter(|u| u.parent_id == parent_id)
                .map(|u| OrganizationalUnit::new(u.id.clone(), u.name.clone()))
                .collect();
            units.sort_by(|a, b| a.id.cmp(&b.id));
            units
        };
        self.paginate(&units, next_token)
    }

    async fn list_accounts_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Account>, RemoteError> {
        let members = {
            let mut state = self.state.lock();
            state.check_listing(parent_id)?;
            if next_token.is_none() {
                state.age_pending(parent_id);
            }
            let members = state.visible_members(parent_id);
            state.record_observed(parent_id, &members);
            members
        };
        self.paginate(&members, next_token)
    }

    async fn move_account(&self, request: &MoveAccountRequest) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        if let Some(err) = &state.reject_moves {
            return Err(err.clone());
        }
        if !state.is_parent(&request.destination_parent_id) {
            return Err(RemoteError::new(
                DESTINATION_PARENT_NOT_FOUND_CODE,
                format!("destination {} not found", request.destination_parent_id),
            ));
        }
        let current = match state.account(&request.account_id) {
            Some(a) => a.parent_id.clone(),
            None => {
                return Err(RemoteError::new(
                    ACCOUNT_NOT_FOUND_CODE,
                    format!("account {} not found", request.account_id),
                ))
            }
        };
        if current != request.source_parent_id {
            return Err(RemoteError::new(
                SOURCE_PARENT_NOT_FOUND_CODE,
                format!(
                    "account {} is not in {}",
                    request.account_id, request.source_parent_id
                ),
            ));
        }
        if request.source_parent_id == request.destination_parent_id {
            return Err(RemoteError::new(
                "DuplicateAccountException",
                format!(
                    "account {} is already in {}",
                    request.account_id, request.destination_parent_id
                ),
            ));
        }

        if let Some(account) = state.account_mut(&request.account_id) {
            account.parent_id = request.destination_parent_id.clone();
        }
        if self.move_lag > 0 {
            state.pending.insert(
                request.account_id.clone(),
                PendingMove {
                    from: request.source_parent_id.clone(),
                    to: request.destination_parent_id.clone(),
                    stale_listings: self.move_lag,
                },
            );
        } else {
            state.pending.remove(&request.account_id);
        }
        state.moves.push(MoveRecord {
            request: request.clone(),
            issued_at: Instant::now(),
            observed_at: None,
        });
        debug!(
            account = %request.account_id,
            from = %request.source_parent_id,
            to = %request.destination_parent_id,
            "Accepted move"
        );
        Ok(())
    }

    async fn list_parents(&self, child_id: &str) -> Result<Vec<Parent>, RemoteError> {
        let state = self.state.lock();
        let parent_id = state.parent_of(child_id).ok_or_else(|| {
            RemoteError::new("ChildNotFoundException", format!("{} not found", child_id))
        })?;
        let parent_type = if parent_id == state.snapshot.root.id {
            ParentType::Root
        } else {
            ParentType::OrganizationalUnit
        };
        Ok(vec![Parent {
            id: parent_id.to_string(),
            parent_type,
        }])
    }

    async fn describe_organizational_unit(
        &self,
        unit_id: &str,
    ) -> Result<Option<OrganizationalUnit>, RemoteError> {
        Ok(self
            .state
            .lock()
            .snapshot
            .units
            .iter()
            .find(|u| u.id == unit_id)
            .map(|u| OrganizationalUnit::new(u.id.clone(), u.name.clone())))
    }

    async fn tag_resource(&self, resource_id: &str, tags: &[Tag]) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let account = state.account_mut(resource_id).ok_or_else(|| {
            RemoteError::new(TARGET_NOT_FOUND_CODE, format!("{} not found", resource_id))
        })?;
        for tag in tags {
            account.tags.insert(tag.key.clone(), tag.value.clone());
        }
        Ok(())
    }

    async fn untag_resource(&self, resource_id: &str, keys: &[String]) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let account = state.account_mut(resource_id).ok_or_else(|| {
            RemoteError::new(TARGET_NOT_FOUND_CODE, format!("{} not found", resource_id))
        })?;
        for key in keys {
            account.tags.remove(key);
        }
        Ok(())
    }
}
