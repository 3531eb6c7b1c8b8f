//! Command-line front end for the SharePoint REST client.
//!
//! Usage:
//! ```bash
//! sharepoint lists                              # List lists and libraries
//! sharepoint count Documents                    # Count items
//! sharepoint items Documents -x due="Due Date"  # List items with an extra field
//! sharepoint item Documents 7                   # Show one item
//! sharepoint upload Documents report.pdf        # Upload a file
//! sharepoint update Documents 7 SP.Data.DocumentsItem -p '{"Title":"New"}'
//! sharepoint delete Documents 7                 # Delete an item
//! sharepoint me                                 # Current user's profile
//! sharepoint profile 'i:0#.f|membership|jane@contoso.com'
//! sharepoint context-info                       # Site context and form digest
//! ```
//!
//! The site and credentials come from a `sharepoint.toml` profile.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod session;

#[derive(Debug, Parser)]
#[command(name = "sharepoint", author, version, about)]
struct Cli {
    /// Profile file to use instead of searching for `sharepoint.toml`.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every list and library of the site
    Lists(commands::read::ListsArgs),

    /// Count the items of a list
    Count(commands::read::CountArgs),

    /// List the items of a list
    Items(commands::read::ItemsArgs),

    /// Show one item
    Item(commands::read::ItemArgs),

    /// Upload a file into a document library
    Upload(commands::write::UploadArgs),

    /// Merge properties into an item
    Update(commands::write::UpdateArgs),

    /// Delete an item
    Delete(commands::write::DeleteArgs),

    /// Show the profile of the signed-in user
    Me,

    /// Show the profile of an account
    Profile(commands::profile::ProfileArgs),

    /// Show site context information
    ContextInfo,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lists(_) => f.debug_tuple("Lists").finish(),
            Self::Count(_) => f.debug_tuple("Count").finish(),
            Self::Items(_) => f.debug_tuple("Items").finish(),
            Self::Item(_) => f.debug_tuple("Item").finish(),
            Self::Upload(_) => f.debug_tuple("Upload").finish(),
            Self::Update(_) => f.debug_tuple("Update").finish(),
            Self::Delete(_) => f.debug_tuple("Delete").finish(),
            Self::Me => f.debug_tuple("Me").finish(),
            Self::Profile(_) => f.debug_tuple("Profile").finish(),
            Self::ContextInfo => f.debug_tuple("ContextInfo").finish(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .init();

    let cli = Cli::parse();
    let mut client = session::connect(cli.config.as_deref()).await?;

    match &cli.command {
        Command::Lists(args) => commands::read::lists(args, &client).await,
        Command::Count(args) => commands::read::count(args, &client).await,
        Command::Items(args) => commands::read::items(args, &client).await,
        Command::Item(args) => commands::read::item(args, &client).await,
        Command::Upload(args) => commands::write::upload(args, &mut client).await,
        Command::Update(args) => commands::write::update(args, &mut client).await,
        Command::Delete(args) => commands::write::delete(args, &mut client).await,
        Command::Me => commands::profile::me(&client).await,
        Command::Profile(args) => commands::profile::profile(args, &client).await,
        Command::ContextInfo => commands::context::run(&client).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse_command(argv: &[&str]) -> Result<Command, clap::Error> {
        Ok(Cli::try_parse_from(argv.iter().copied())?.command)
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = Cli::try_parse_from(["sharepoint"]).expect_err("expected clap parse error");
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let err = Cli::try_parse_from(["sharepoint", "not-a-command"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_config_flag_is_global() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["sharepoint", "lists", "--config", "site.toml"])?;
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));

        let cli = Cli::try_parse_from(["sharepoint", "me"])?;
        assert!(cli.config.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_lists_collects_repeated_extra_fields() -> Result<(), clap::Error> {
        let command = parse_command(&[
            "sharepoint",
            "lists",
            "-x",
            "modified=LastItemModifiedDate",
            "--extra",
            "hidden=Hidden",
        ])?;

        let Command::Lists(args) = command else {
            panic!("expected Command::Lists");
        };

        assert_eq!(
            args.extra.extra,
            [
                ("modified".to_string(), "LastItemModifiedDate".to_string()),
                ("hidden".to_string(), "Hidden".to_string()),
            ]
        );
        assert_eq!(args.extra.fields().len(), 2);
        Ok(())
    }

    #[test]
    fn test_cli_rejects_malformed_extra_field() {
        let err = Cli::try_parse_from(["sharepoint", "lists", "-x", "no-equals"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_count_requires_library() {
        let err = Cli::try_parse_from(["sharepoint", "count"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_items_parses_library_and_extra() -> Result<(), clap::Error> {
        let command = parse_command(&["sharepoint", "items", "Docs", "-x", "due=Due Date"])?;

        let Command::Items(args) = command else {
            panic!("expected Command::Items");
        };

        assert_eq!(args.library, "Docs");
        assert_eq!(args.extra.extra, [("due".to_string(), "Due Date".to_string())]);
        Ok(())
    }

    #[test]
    fn test_cli_item_requires_numeric_id() {
        let err = Cli::try_parse_from(["sharepoint", "item", "Docs", "seven"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_upload_defaults() -> Result<(), clap::Error> {
        let command = parse_command(&["sharepoint", "upload", "Docs", "report.pdf"])?;

        let Command::Upload(args) = command else {
            panic!("expected Command::Upload");
        };

        assert_eq!(args.library, "Docs");
        assert_eq!(args.file, PathBuf::from("report.pdf"));
        assert!(!args.overwrite);
        assert!(args.properties.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_upload_parses_overwrite_and_properties() -> Result<(), clap::Error> {
        let command = parse_command(&[
            "sharepoint",
            "upload",
            "Docs",
            "report.pdf",
            "--overwrite",
            "-p",
            "@props.json",
        ])?;

        let Command::Upload(args) = command else {
            panic!("expected Command::Upload");
        };

        assert!(args.overwrite);
        assert_eq!(args.properties.as_deref(), Some("@props.json"));
        Ok(())
    }

    #[test]
    fn test_cli_update_requires_properties() {
        let err = Cli::try_parse_from(["sharepoint", "update", "Docs", "3", "SP.Data.DocsItem"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_update_parses_all_arguments() -> Result<(), clap::Error> {
        let command = parse_command(&[
            "sharepoint",
            "update",
            "Docs",
            "3",
            "SP.Data.DocsItem",
            "--properties",
            r#"{"Title":"New"}"#,
        ])?;

        let Command::Update(args) = command else {
            panic!("expected Command::Update");
        };

        assert_eq!(args.id, 3);
        assert_eq!(args.entity_type, "SP.Data.DocsItem");
        assert_eq!(args.properties, r#"{"Title":"New"}"#);
        Ok(())
    }

    #[test]
    fn test_cli_delete_requires_id() {
        let err = Cli::try_parse_from(["sharepoint", "delete", "Docs"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_profile_requires_account() {
        let err = Cli::try_parse_from(["sharepoint", "profile"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_command_debug_shows_variant_name_without_inner_args() -> Result<(), clap::Error> {
        let test_cases = [
            ("sharepoint lists", "Lists"),
            ("sharepoint count Docs", "Count"),
            ("sharepoint items Docs", "Items"),
            ("sharepoint item Docs 1", "Item"),
            ("sharepoint upload Docs a.txt", "Upload"),
            ("sharepoint update Docs 1 T -p {}", "Update"),
            ("sharepoint delete Docs 1", "Delete"),
            ("sharepoint me", "Me"),
            ("sharepoint profile jane", "Profile"),
            ("sharepoint context-info", "ContextInfo"),
        ];

        for (argv, expected_variant) in test_cases {
            let command = parse_command(&argv.split_whitespace().collect::<Vec<_>>())?;
            let debug_output = format!("{command:?}");
            assert_eq!(debug_output, expected_variant, "for argv: {argv}");
        }

        Ok(())
    }
}
