//! Tag command

use clap::Args;

use orgmove_common::TagMap;
use orgmove_placement::{find_account, update_tags};

use super::{print_json, Session};
use crate::{Error, Result};

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Account id
    pub account_id: String,
    /// Tags to set (key=value)
    #[arg(long = "set")]
    pub set: Vec<String>,
    /// Tag keys to remove
    #[arg(long = "remove")]
    pub remove: Vec<String>,
}

pub async fn run(session: &Session, args: TagArgs) -> Result<()> {
    let account = find_account(session.org(), &args.account_id).await?;

    let old = session.org().tags_of(&account.id);
    let new = desired_tags(&old, &args.set, &args.remove)?;

    update_tags(session.org(), &account.id, &old, &new).await?;
    session.save()?;
    print_json(&new)
}

/// Apply `key=value` assignments and removals to a copy of `current`
pub fn desired_tags(current: &TagMap, set: &[String], remove: &[String]) -> Result<TagMap> {
    let mut tags = current.clone();
    for key in remove {
        tags.remove(key);
    }
    for pair in set {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("tag must be key=value, got {pair}")))?;
        if key.is_empty() {
            return Err(Error::validation(format!("tag key is empty in {pair}")));
        }
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}
