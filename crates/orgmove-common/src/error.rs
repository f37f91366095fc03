//! Error types for placement operations
//!
//! `NotFound` is kept distinct from every other failure so the reconciler can
//! tell "the account disappeared remotely" (clear state) apart from "the
//! operation failed" (surface the error).

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias for placement operations
pub type Result<T> = std::result::Result<T, PlacementError>;

/// Errors from lookup, traversal, move and reconcile operations
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Account absent, suspended, or not located in any unit
    #[error("not found: {message}")]
    NotFound {
        /// What could not be found
        message: String,
        /// Request that produced the result, for diagnostics
        request: Option<String>,
    },

    /// The control plane refused a move
    #[error("account not found in ou, {source_unit}")]
    RemoteRejected {
        /// Account that was being moved
        account_id: String,
        /// Declared source parent
        source_unit: String,
        /// Declared destination parent
        destination_unit: String,
        /// Rejected request, for diagnostics
        request: String,
        /// Error returned by the control plane
        #[source]
        cause: RemoteError,
    },

    /// A listing call failed part way through pagination
    #[error("error listing {operation} under {parent_id}: {cause}")]
    Pagination {
        /// Listing being performed (e.g. "organizational units")
        operation: &'static str,
        /// Parent being listed
        parent_id: String,
        /// Error returned by the control plane
        #[source]
        cause: RemoteError,
    },

    /// A move could not be confirmed
    #[error("{message}: {cause}")]
    Confirmation {
        /// Description of what was not confirmed
        message: String,
        /// Failure that stopped the confirmation poll
        #[source]
        cause: Box<PlacementError>,
    },

    /// A move issued on behalf of an update or revert failed
    #[error("{message}: {cause}")]
    MoveFailed {
        /// What the move was for
        message: String,
        /// Failure returned by the move
        #[source]
        cause: Box<PlacementError>,
    },

    /// The confirmation poll gave up after its configured attempt budget
    #[error("account {account_id} not observed in {unit_id} after {attempts} attempts")]
    ConfirmationFailed {
        /// Account being waited for
        account_id: String,
        /// Unit expected to contain it
        unit_id: String,
        /// Number of listings performed
        attempts: u32,
    },

    /// Any other control plane error
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Tagging or untagging a resource failed
    #[error("error {action} resource ({resource_id}): {cause}")]
    Tagging {
        /// "tagging" or "untagging"
        action: &'static str,
        /// Resource being tagged
        resource_id: String,
        /// Error returned by the control plane
        #[source]
        cause: RemoteError,
    },

    /// A declared unit does not exist in the organization
    #[error("organizational unit {0} not found")]
    UnknownUnit(String),

    /// A placement id could not be parsed
    #[error("invalid placement id '{0}': expected <account>/<source-ou>/<destination-ou>")]
    InvalidKey(String),

    /// The operation was cancelled by shutdown
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl PlacementError {
    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            request: None,
        }
    }

    /// Create a not-found error carrying the originating request
    pub fn not_found_for(msg: impl Into<String>, request: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            request: Some(request.into()),
        }
    }

    /// Wrap a poll failure with what was being confirmed
    ///
    /// Cancellation passes through unwrapped so callers can match on it.
    pub fn confirmation(msg: impl Into<String>, cause: PlacementError) -> Self {
        match cause {
            PlacementError::Cancelled => PlacementError::Cancelled,
            cause => Self::Confirmation {
                message: msg.into(),
                cause: Box::new(cause),
            },
        }
    }

    /// Wrap a failed move with what it was for
    ///
    /// A vanished account and cancellation pass through unwrapped so callers
    /// can still match on them.
    pub fn move_failed(msg: impl Into<String>, cause: PlacementError) -> Self {
        match cause {
            cause @ (PlacementError::NotFound { .. } | PlacementError::Cancelled) => cause,
            cause => Self::MoveFailed {
                message: msg.into(),
                cause: Box::new(cause),
            },
        }
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the account is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlacementError::NotFound { .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            PlacementError::Confirmation { cause, .. }
            | PlacementError::MoveFailed { cause, .. } => cause.is_retryable(),
            other => matches!(
                other,
                PlacementError::Pagination { .. }
                    | PlacementError::Remote(_)
                    | PlacementError::ConfirmationFailed { .. }
            ),
        }
    }
}
