//! User profile commands.

use anyhow::{Context, Result};
use clap::Args;
use sharepoint_rest::SharePointClient;

use super::print_json;

#[derive(Args)]
pub struct ProfileArgs {
    /// Account name, e.g. `i:0#.f|membership|jane@contoso.com`.
    pub account: String,
}

/// Only works with a profile in `user` auth mode.
pub async fn me(client: &SharePointClient) -> Result<()> {
    let profile = client
        .get_current_user_profile()
        .await
        .context("failed to fetch current user profile")?;
    print_json(&profile)
}

pub async fn profile(args: &ProfileArgs, client: &SharePointClient) -> Result<()> {
    let profile = client
        .get_user_profile(&args.account)
        .await
        .with_context(|| format!("failed to fetch profile of {}", args.account))?;
    print_json(&profile)
}
