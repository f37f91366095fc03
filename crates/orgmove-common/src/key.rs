//! Structured identity of a placement declaration
//!
//! A placement is identified by the account and the two units it moves
//! between. The `account/source/destination` string form only exists at the
//! persistence boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// Separator used in the persisted id
pub const KEY_SEPARATOR: char = '/';

/// Composite key of a placement declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementKey {
    /// Account being placed
    pub account_id: String,
    /// Unit the account is moved out of
    pub source_ou: String,
    /// Unit the account is moved into
    pub destination_ou: String,
}

impl PlacementKey {
    /// Build a key from its three parts
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

    /// The key for moving the same account back where it came from
    pub fn reversed(&self) -> Self {
        Self {
            account_id: self.account_id.clone(),
            source_ou: self.destination_ou.clone(),
            destination_ou: self.source_ou.clone(),
        }
    }
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.account_id,
            self.source_ou,
            self.destination_ou,
            sep = KEY_SEPARATOR
        )
    }
}

impl FromStr for PlacementKey {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [account, source, destination]
                if !account.is_empty() && !source.is_empty() && !destination.is_empty() =>
            {
                Ok(Self::new(*account, *source, *destination))
            }
            _ => Err(PlacementError::InvalidKey(s.to_string())),
        }
    }
}
