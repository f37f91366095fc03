//! Account placement for organizations
//!
//! Finds where an account lives in an organization hierarchy, moves it
//! between organizational units, and waits for the move to become visible.
//!
//! ## Flow
//!
//! ```text
//! create(account, src, dst)
//! ─────────────────────────
//! 1. Take the move lock
//! 2. DescribeAccount            (lookup: absent or suspended → NotFound)
//! 3. MoveAccount src → dst      (mover: rejection → RemoteRejected)
//! 4. ListAccountsForParent(dst) (poller: every page, until listed)
//! 5. Release the move lock
//! 6. Record account/src/dst
//! ```
//!
//! Resolution walks the unit tree from the organization root (walker) and
//! scans each unit's accounts (resolver). The control plane is reached only
//! through [`orgmove_common::OrganizationsApi`].

#![deny(missing_docs)]

pub mod lookup;
pub mod mover;
pub mod parents;
pub mod poller;
pub mod reconciler;
pub mod resolver;
pub mod tags;
pub mod walker;

pub use lookup::{find_account, find_account_with_unit};
pub use mover::move_account;
pub use parents::{find_parent_root_id, find_parent_unit};
pub use poller::await_unit_membership;
pub use reconciler::{DesiredPlacement, PlacementPhase, PlacementState, Reconciler};
pub use resolver::{find_account_unit, organization_root, unit_contains_account, unit_exists};
pub use tags::update_tags;
pub use walker::{build_catalog, Catalog};
