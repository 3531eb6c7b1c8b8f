//! Commands that change list content.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde_json::{Map, json};
use sharepoint_rest::SharePointClient;

use super::{print_json, read_properties};

#[derive(Args)]
pub struct UploadArgs {
    /// Document library title.
    pub library: String,

    /// File to upload.
    pub file: PathBuf,

    /// Replace an existing file with the same name.
    #[arg(long)]
    pub overwrite: bool,

    /// Item properties as JSON (inline or @file.json).
    #[arg(short, long)]
    pub properties: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// List or library title.
    pub library: String,

    /// Item ID.
    pub id: u64,

    /// Entity type name, e.g. `SP.Data.DocumentsItem`.
    pub entity_type: String,

    /// Properties to merge as JSON (inline or @file.json).
    #[arg(short, long)]
    pub properties: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// List or library title.
    pub library: String,

    /// Item ID.
    pub id: u64,
}

pub async fn upload(args: &UploadArgs, client: &mut SharePointClient) -> Result<()> {
    let properties = match &args.properties {
        Some(input) => read_properties(input)?,
        None => Map::new(),
    };

    eprintln!(
        "{} Uploading {} to {}",
        style("→").cyan(),
        style(args.file.display()).bold(),
        style(&args.library).bold()
    );

    let uploaded = client
        .upload_list_item(&args.library, &args.file, &properties, args.overwrite)
        .await
        .with_context(|| format!("failed to upload {}", args.file.display()))?;

    eprintln!("{} Uploaded", style("✓").green().bold());
    print_json(&json!({ "uploaded": uploaded }))
}

pub async fn update(args: &UpdateArgs, client: &mut SharePointClient) -> Result<()> {
    let properties = read_properties(&args.properties)?;

    let updated = client
        .update_list_item(&args.library, args.id, &properties, &args.entity_type)
        .await
        .with_context(|| format!("failed to update item {} of {}", args.id, args.library))?;

    eprintln!("{} Updated item {}", style("✓").green().bold(), args.id);
    print_json(&json!({ "updated": updated }))
}

pub async fn delete(args: &DeleteArgs, client: &mut SharePointClient) -> Result<()> {
    let deleted = client
        .delete_list_item(&args.library, args.id)
        .await
        .with_context(|| format!("failed to delete item {} of {}", args.id, args.library))?;

    eprintln!("{} Deleted item {}", style("✓").green().bold(), args.id);
    print_json(&json!({ "deleted": deleted }))
}
