//! CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use orgmove_common::{InMemoryOrganization, OrganizationSnapshot, ReconcilerConfig};
use orgmove_placement::Reconciler;

use crate::{Error, Result};

pub mod placement;
pub mod tag;
pub mod tree;

/// An organization file opened for one command
pub struct Session {
    path: PathBuf,
    org: Arc<InMemoryOrganization>,
    reconciler: Reconciler,
}

impl Session {
    /// Load the organization file and reconciler configuration
    pub fn open(org_path: &Path, config_path: Option<&Path>) -> Result<Self> {
        let data = std::fs::read_to_string(org_path)?;
        let snapshot: OrganizationSnapshot =
            serde_json::from_str(&data).map_err(|e| Error::InvalidOrganization {
                path: org_path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(
            path = %org_path.display(),
            units = snapshot.units.len(),
            accounts = snapshot.accounts.len(),
            "Loaded organization"
        );

        let config = ReconcilerConfig::load(config_path)?;
        let org = Arc::new(InMemoryOrganization::from_snapshot(snapshot));
        let reconciler = Reconciler::new(org.clone(), config);

        Ok(Self {
            path: org_path.to_path_buf(),
            org,
            reconciler,
        })
    }

    pub fn org(&self) -> &InMemoryOrganization {
        &self.org
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Write the organization back to its file
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.org.snapshot())?;
        std::fs::write(&self.path, data + "\n")?;
        debug!(path = %self.path.display(), "Saved organization");
        Ok(())
    }
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Organization file with `111111111111` in Sandbox
    pub fn write_org(dir: &Path) -> PathBuf {
        let org = InMemoryOrganization::new("r-root", "Root");
        org.add_unit("ou-root-aaa", "Sandbox", "r-root")
            .add_unit("ou-root-bbb", "Workloads", "r-root")
            .add_unit("ou-root-ccc", "Quarantine", "r-root")
            .add_unit("ou-bbb-prod", "Prod", "ou-root-bbb")
            .add_account("111111111111", "dev", "ou-root-aaa")
            .add_account("999999999999", "management", "r-root");

        let path = dir.join("organization.json");
        std::fs::write(&path, serde_json::to_string(&org.snapshot()).unwrap()).unwrap();
        path
    }

    pub fn reopen(path: &Path) -> Session {
        Session::open(path, None).unwrap()
    }
}
