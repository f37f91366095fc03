//! Organization hierarchy traversal
//!
//! Flattens the unit tree below a root into a [`Catalog`]. Every level is
//! listed through paginated calls, and every recursive call returns its own
//! `Result` so the [`TraversalPolicy`] decides explicitly whether a failed
//! subtree aborts the traversal or is skipped.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use orgmove_common::{OrganizationalUnit, OrganizationsApi, PlacementError, Result, TraversalPolicy};

/// Flattened `unit id -> unit name` mapping of an organization tree
///
/// Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    units: HashMap<String, String>,
    skipped_subtrees: usize,
}

impl Catalog {
    /// Catalog seeded with a single unit (normally the root)
    pub fn seeded(unit: &OrganizationalUnit) -> Self {
        let mut catalog = Self::default();
        catalog.insert(unit);
        catalog
    }

    /// Add a unit
    pub fn insert(&mut self, unit: &OrganizationalUnit) {
        self.units.insert(unit.id.clone(), unit.name.clone());
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether a unit id is present
    pub fn contains(&self, unit_id: &str) -> bool {
        self.units.contains_key(unit_id)
    }

    /// Name of a unit
    pub fn name_of(&self, unit_id: &str) -> Option<&str> {
        self.units.get(unit_id).map(String::as_str)
    }

    /// Iterate `(id, name)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.units.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    /// Subtrees left out because listing them failed under `Lenient`
    pub fn skipped_subtrees(&self) -> usize {
        self.skipped_subtrees
    }
}

/// Units found below one parent, plus how many subtrees were skipped
#[derive(Debug, Default)]
pub struct Subtree {
    /// Every unit below the parent, depth-first
    pub units: Vec<OrganizationalUnit>,
    /// Number of child subtrees that failed and were skipped
    pub skipped: usize,
}

/// List the direct child units of a parent, following every page
pub async fn list_child_units(
    api: &dyn OrganizationsApi,
    parent_id: &str,
) -> Result<Vec<OrganizationalUnit>> {
    let mut units = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let page = api
            .list_organizational_units_for_parent(parent_id, next_token.take())
            .await
            .map_err(|cause| PlacementError::Pagination {
                operation: "organizational units",
                parent_id: parent_id.to_string(),
                cause,
            })?;

        debug!(parent = %parent_id, count = page.items.len(), "Listed child units page");
        units.extend(page.items);

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    Ok(units)
}

/// Depth-first expansion of every unit below `unit`
///
/// Listing the direct children of `unit` always propagates its error. A
/// failure inside a child's subtree propagates under `Strict` and is logged
/// and skipped under `Lenient`.
pub fn list_units_recursive<'a>(
    api: &'a dyn OrganizationsApi,
    unit: &'a OrganizationalUnit,
    policy: TraversalPolicy,
) -> BoxFuture<'a, Result<Subtree>> {
    async move {
        let children = list_child_units(api, &unit.id).await?;
        let mut subtree = Subtree::default();

        for child in children {
            let descendants = list_units_recursive(api, &child, policy).await;
            subtree.units.push(child.clone());

            match (descendants, policy) {
                (Ok(deeper), _) => {
                    subtree.units.extend(deeper.units);
                    subtree.skipped += deeper.skipped;
                }
                (Err(e), TraversalPolicy::Strict) => return Err(e),
                (Err(e), TraversalPolicy::Lenient) => {
                    warn!(
                        unit = %child.id,
                        error = %e,
                        "Skipping subtree that could not be listed"
                    );
                    subtree.skipped += 1;
                }
            }
        }

        Ok(subtree)
    }
    .boxed()
}

/// Build a fresh catalog of `root` and everything below it
pub async fn build_catalog(
    api: &dyn OrganizationsApi,
    root: &OrganizationalUnit,
    policy: TraversalPolicy,
) -> Result<Catalog> {
    let subtree = list_units_recursive(api, root, policy).await?;

    let mut catalog = Catalog::seeded(root);
    for unit in &subtree.units {
        catalog.insert(unit);
    }
    catalog.skipped_subtrees = subtree.skipped;

    debug!(
        root = %root.id,
        units = catalog.len(),
        skipped = catalog.skipped_subtrees,
        "Built unit catalog"
    );
    Ok(catalog)
}
