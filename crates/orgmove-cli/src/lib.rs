//! orgmove CLI library
//!
//! Drives account placement against an organization stored in a JSON file.
//! Commands that move or retag accounts write the file back.

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// orgmove - place accounts in organizational units
#[derive(Parser, Debug)]
#[command(name = "orgmove")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Organization file (JSON snapshot)
    #[arg(long, global = true, env = "ORGMOVE_ORG", default_value = "organization.json")]
    pub org: PathBuf,

    /// Reconciler configuration file (JSON)
    #[arg(long, global = true, env = "ORGMOVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which unit an account is in
    Resolve(commands::placement::ResolveArgs),
    /// Move an account and record the placement
    Create(commands::placement::CreateArgs),
    /// Refresh a recorded placement by id
    Read(commands::placement::IdArgs),
    /// Retarget a recorded placement
    Update(commands::placement::UpdateArgs),
    /// Move an account back to its source
    Delete(commands::placement::IdArgs),
    /// Print the unit tree with its accounts
    Tree,
    /// Set or remove account tags
    Tag(commands::tag::TagArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let session = commands::Session::open(&self.org, self.config.as_deref())?;

        match self.command {
            Commands::Resolve(args) => commands::placement::resolve(&session, args).await,
            Commands::Create(args) => commands::placement::create(&session, args).await,
            Commands::Read(args) => commands::placement::read(&session, args).await,
            Commands::Update(args) => commands::placement::update(&session, args).await,
            Commands::Delete(args) => commands::placement::delete(&session, args).await,
            Commands::Tree => commands::tree::run(&session),
            Commands::Tag(args) => commands::tag::run(&session, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "orgmove",
            "create",
            "111111111111",
            "ou-root-aaa",
            "ou-root-bbb",
            "--org",
            "org.json",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(cli.org, PathBuf::from("org.json"));
        assert!(cli.json_logs);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.account_id, "111111111111");
                assert_eq!(args.source_ou, "ou-root-aaa");
                assert_eq!(args.destination_ou, "ou-root-bbb");
            }
            other => panic!("expected create, got {other:?}"),
        }
    }

    #[test]
    fn parses_update_with_id_and_new_declaration() {
        let cli = Cli::try_parse_from([
            "orgmove",
            "--org",
            "org.json",
            "update",
            "111111111111/ou-root-aaa/ou-root-bbb",
            "111111111111",
            "ou-root-aaa",
            "ou-root-ccc",
        ])
        .unwrap();

        match cli.command {
            Commands::Update(args) => {
                assert_eq!(args.id, "111111111111/ou-root-aaa/ou-root-bbb");
                assert_eq!(args.destination_ou, "ou-root-ccc");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_three_arguments() {
        assert!(Cli::try_parse_from(["orgmove", "create", "111111111111", "ou-root-aaa"]).is_err());
    }
}
