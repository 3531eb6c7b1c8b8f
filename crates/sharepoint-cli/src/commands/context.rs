//! `sharepoint context-info` command implementation.

use anyhow::{Context, Result};
use sharepoint_rest::SharePointClient;

use super::print_json;

pub async fn run(client: &SharePointClient) -> Result<()> {
    let info = client
        .get_context_info()
        .await
        .context("failed to fetch context information")?;
    print_json(&info)
}
