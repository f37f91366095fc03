//! Shared building blocks for orgmove
//!
//! - [`remote`] - the organization control plane interface and its data types
//! - [`error`] - placement error taxonomy
//! - [`key`] - structured placement identity
//! - [`config`] - reconciler configuration (file + environment)
//! - [`memory`] - in-memory organization backend
//! - [`telemetry`] - tracing subscriber setup

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod remote;
pub mod telemetry;

pub use config::{PollConfig, ReconcilerConfig, TraversalPolicy};
pub use error::{PlacementError, Result};
pub use key::PlacementKey;
pub use memory::{InMemoryOrganization, OrganizationSnapshot};
pub use remote::{
    Account, AccountStatus, MoveAccountRequest, OrganizationalUnit, OrganizationsApi, Page,
    Parent, ParentType, RemoteError, Root, Tag, TagMap, ACCOUNT_NOT_FOUND_CODE,
};
