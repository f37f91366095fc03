//! Remote organization control plane interface
//!
//! The control plane owns the organization tree (root, organizational units)
//! and the accounts placed in it. Everything in this workspace talks to it
//! through [`OrganizationsApi`], so production transports and the in-memory
//! backend are interchangeable.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote error code returned when an account does not exist
pub const ACCOUNT_NOT_FOUND_CODE: &str = "AccountNotFoundException";

/// Remote error code returned when a move names the wrong source parent
pub const SOURCE_PARENT_NOT_FOUND_CODE: &str = "SourceParentNotFoundException";

/// Remote error code returned when a move names an unknown destination
pub const DESTINATION_PARENT_NOT_FOUND_CODE: &str = "DestinationParentNotFoundException";

/// Remote error code returned when describing an unknown unit
pub const UNIT_NOT_FOUND_CODE: &str = "OrganizationalUnitNotFoundException";

/// Remote error code returned when tagging an unknown resource
pub const TARGET_NOT_FOUND_CODE: &str = "TargetNotFoundException";

/// Lifecycle status of an account as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Account is usable
    #[default]
    Active,
    /// Account is suspended and treated as absent for placement
    Suspended,
    /// Account is being closed
    PendingClosure,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::PendingClosure => "PENDING_CLOSURE",
        };
        f.write_str(s)
    }
}

/// An account placed somewhere in the organization tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Globally unique account identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Lifecycle status
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    /// Create an active account
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: AccountStatus::Active,
        }
    }
}

/// A node of the organization tree that can hold accounts and child units
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    /// Unit identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl OrganizationalUnit {
    /// Create a unit from its id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The single root of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Root identifier
    pub id: String,
    /// Display name
    pub name: String,
}

impl From<&Root> for OrganizationalUnit {
    fn from(root: &Root) -> Self {
        OrganizationalUnit::new(root.id.clone(), root.name.clone())
    }
}

/// Kind of parent returned by [`OrganizationsApi::list_parents`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParentType {
    /// The organization root
    Root,
    /// An organizational unit
    OrganizationalUnit,
}

/// Direct parent of an account or unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    /// Parent identifier
    pub id: String,
    /// Parent kind
    pub parent_type: ParentType,
}

/// Key-value metadata attached to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

/// Tags keyed by name, the shape tag diffs are computed over
pub type TagMap = BTreeMap<String, String>;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Continuation token; `None` when the listing is exhausted
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A final page with no continuation
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// A page followed by more results
    pub fn with_next(items: Vec<T>, next_token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(next_token.into()),
        }
    }
}

/// Request to move an account between two parents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAccountRequest {
    /// Account to move
    pub account_id: String,
    /// Parent the account is expected to be in
    pub source_parent_id: String,
    /// Parent the account should end up in
    pub destination_parent_id: String,
}

impl MoveAccountRequest {
    /// Build a move request
    pub fn new(
        account_id: impl Into<String>,
        source_parent_id: impl Into<String>,
        destination_parent_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            source_parent_id: source_parent_id.into(),
            destination_parent_id: destination_parent_id.into(),
        }
    }
}

impl fmt::Display for MoveAccountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MoveAccount {{ AccountId: {}, SourceParentId: {}, DestinationParentId: {} }}",
            self.account_id, self.source_parent_id, self.destination_parent_id
        )
    }
}

/// Error reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Machine-readable error code, when the control plane sent one
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl RemoteError {
    /// Error with a code
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Error without a code (transport failures, throttling, ...)
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Whether the error carries the given code
    pub fn code_equals(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Operations consumed from the organization control plane
#[async_trait]
pub trait OrganizationsApi: Send + Sync {
    /// Describe a single account; `Ok(None)` when the response has no payload
    async fn describe_account(&self, account_id: &str) -> Result<Option<Account>, RemoteError>;

    /// List organization roots
    async fn list_roots(&self) -> Result<Vec<Root>, RemoteError>;

    /// List the direct child units of a parent, one page at a time
    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<OrganizationalUnit>, RemoteError>;

    /// List the accounts directly under a parent, one page at a time
    async fn list_accounts_for_parent(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> Result<Page<Account>, RemoteError>;

    /// Move an account from one parent to another
    ///
    /// The move is applied asynchronously; listings may not reflect it yet
    /// when this returns.
    async fn move_account(&self, request: &MoveAccountRequest) -> Result<(), RemoteError>;

    /// List the direct parents of an account or unit
    async fn list_parents(&self, child_id: &str) -> Result<Vec<Parent>, RemoteError>;

    /// Describe a single organizational unit
    async fn describe_organizational_unit(
        &self,
        unit_id: &str,
    ) -> Result<Option<OrganizationalUnit>, RemoteError>;

    /// Add or overwrite tags on a resource
    async fn tag_resource(&self, resource_id: &str, tags: &[Tag]) -> Result<(), RemoteError>;

    /// Remove tags from a resource by key
    async fn untag_resource(&self, resource_id: &str, keys: &[String]) -> Result<(), RemoteError>;
}
