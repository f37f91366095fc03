//! Placement commands

use clap::Args;
use serde::Serialize;
use tracing::info;

use orgmove_common::PlacementKey;
use orgmove_placement::{DesiredPlacement, PlacementState};

use super::{print_json, Session};
use crate::Result;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Account id
    pub account_id: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Account id
    pub account_id: String,
    /// Unit the account is in now
    pub source_ou: String,
    /// Unit to move the account into
    pub destination_ou: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Recorded placement id (account/source/destination)
    pub id: String,
    /// Account id
    pub account_id: String,
    /// Declared source unit
    pub source_ou: String,
    /// New destination unit
    pub destination_ou: String,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Recorded placement id (account/source/destination)
    pub id: String,
}

#[derive(Debug, Serialize)]
struct Resolved {
    account_id: String,
    unit_id: String,
    unit_name: String,
}

pub async fn resolve(session: &Session, args: ResolveArgs) -> Result<()> {
    let (unit_id, unit_name) = session.reconciler().resolve(&args.account_id).await?;
    print_json(&Resolved {
        account_id: args.account_id,
        unit_id,
        unit_name,
    })
}

pub async fn create(session: &Session, args: CreateArgs) -> Result<()> {
    let desired = DesiredPlacement::new(args.account_id, args.source_ou, args.destination_ou);
    let state = session.reconciler().create(&desired).await?;
    session.save()?;
    print_json(&state)
}

pub async fn read(session: &Session, args: IdArgs) -> Result<()> {
    let state = recorded(&args.id)?;
    match session.reconciler().read(&state, false).await? {
        Some(state) => print_json(&state),
        None => {
            info!(placement = %args.id, "Placement no longer exists");
            print_json(&Option::<PlacementState>::None)
        }
    }
}

pub async fn update(session: &Session, args: UpdateArgs) -> Result<()> {
    let old = recorded(&args.id)?;
    let desired = DesiredPlacement::new(args.account_id, args.source_ou, args.destination_ou);

    let state = session.reconciler().update(&old, &desired).await?;
    session.save()?;
    print_json(&state)
}

pub async fn delete(session: &Session, args: IdArgs) -> Result<()> {
    let state = recorded(&args.id)?;
    session.reconciler().delete(&state).await?;
    session.save()?;
    info!(placement = %args.id, "Placement deleted");
    Ok(())
}

fn recorded(id: &str) -> Result<PlacementState> {
    let key: PlacementKey = id.parse()?;
    Ok(PlacementState::from_key(&key))
}
