//! Tree command

use std::collections::BTreeMap;
use std::fmt::Write;

use orgmove_common::{AccountStatus, OrganizationSnapshot};

use super::Session;
use crate::Result;

pub fn run(session: &Session) -> Result<()> {
    print!("{}", render(&session.org().snapshot()));
    Ok(())
}

/// Render the unit tree, units before accounts, each sorted by id
pub fn render(snapshot: &OrganizationSnapshot) -> String {
    let mut units: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
    for unit in &snapshot.units {
        units
            .entry(unit.parent_id.as_str())
            .or_default()
            .push((unit.id.as_str(), unit.name.as_str()));
    }
    let mut accounts: BTreeMap<&str, Vec<(&str, &str, AccountStatus)>> = BTreeMap::new();
    for account in &snapshot.accounts {
        accounts
            .entry(account.parent_id.as_str())
            .or_default()
            .push((account.id.as_str(), account.name.as_str(), account.status));
    }
    for children in units.values_mut() {
        children.sort();
    }
    for members in accounts.values_mut() {
        members.sort_by(|a, b| a.0.cmp(b.0));
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", snapshot.root.name, snapshot.root.id);
    render_children(&snapshot.root.id, 1, &units, &accounts, &mut out);
    out
}

fn render_children(
    parent_id: &str,
    depth: usize,
    units: &BTreeMap<&str, Vec<(&str, &str)>>,
    accounts: &BTreeMap<&str, Vec<(&str, &str, AccountStatus)>>,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);

    for (id, name) in units.get(parent_id).into_iter().flatten() {
        let _ = writeln!(out, "{indent}{name} ({id})");
        render_children(id, depth + 1, units, accounts, out);
    }
    for (id, name, status) in accounts.get(parent_id).into_iter().flatten() {
        match status {
            AccountStatus::Active => {
                let _ = writeln!(out, "{indent}- {id} {name}");
            }
            other => {
                let _ = writeln!(out, "{indent}- {id} {name} [{other}]");
            }
        }
    }
}
