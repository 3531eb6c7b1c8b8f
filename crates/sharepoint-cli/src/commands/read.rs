//! Read-only list and item commands.

use anyhow::{Context, Result};
use clap::Args;
use sharepoint_rest::SharePointClient;

use super::{ExtraArgs, print_json};

#[derive(Args)]
pub struct ListsArgs {
    #[command(flatten)]
    pub extra: ExtraArgs,
}

#[derive(Args)]
pub struct CountArgs {
    /// List or library title.
    pub library: String,
}

#[derive(Args)]
pub struct ItemsArgs {
    /// List or library title.
    pub library: String,

    #[command(flatten)]
    pub extra: ExtraArgs,
}

#[derive(Args)]
pub struct ItemArgs {
    /// List or library title.
    pub library: String,

    /// Item ID.
    pub id: u64,

    #[command(flatten)]
    pub extra: ExtraArgs,
}

pub async fn lists(args: &ListsArgs, client: &SharePointClient) -> Result<()> {
    let lists = client
        .get_lists(&args.extra.fields())
        .await
        .context("failed to fetch lists")?;
    print_json(&lists)
}

pub async fn count(args: &CountArgs, client: &SharePointClient) -> Result<()> {
    let count = client
        .get_list_item_count(&args.library)
        .await
        .with_context(|| format!("failed to count items in {}", args.library))?;
    print_json(&count)
}

pub async fn items(args: &ItemsArgs, client: &SharePointClient) -> Result<()> {
    let items = client
        .get_list_items(&args.library, &args.extra.fields())
        .await
        .with_context(|| format!("failed to fetch items of {}", args.library))?;
    print_json(&items)
}

pub async fn item(args: &ItemArgs, client: &SharePointClient) -> Result<()> {
    let item = client
        .get_list_item(&args.library, args.id, &args.extra.fields())
        .await
        .with_context(|| format!("failed to fetch item {} of {}", args.id, args.library))?;
    print_json(&item)
}
