//! Profile loading and authentication shared by every command.

use std::path::Path;

use anyhow::{Context, Result};
use sharepoint_rest::{AuthConfig, ProfileConfig, SharePointClient};
use tracing::{debug, info};

/// Loads the profile, builds a client and acquires an access token.
///
/// With `config_path` set the file must exist; otherwise the standard
/// resolution order is searched.
pub async fn connect(config_path: Option<&Path>) -> Result<SharePointClient> {
    let profile = load_profile(config_path)?;
    let auth = profile
        .auth
        .as_ref()
        .context("profile has no [auth] table")?;

    let mut client = SharePointClient::new(profile.client_config()?)?;
    authenticate(&mut client, auth).await?;
    Ok(client)
}

fn load_profile(config_path: Option<&Path>) -> Result<ProfileConfig> {
    match config_path {
        Some(path) => {
            debug!(path = %path.display(), "Loading profile");
            ProfileConfig::load(path)
                .with_context(|| format!("failed to load profile: {}", path.display()))
        }
        None => ProfileConfig::resolve()
            .context("failed to load profile")?
            .context("no profile found; create sharepoint.toml or set SHAREPOINT_CONFIG_PATH"),
    }
}

async fn authenticate(client: &mut SharePointClient, auth: &AuthConfig) -> Result<()> {
    match auth {
        AuthConfig::App {
            acs_url,
            client_id,
            secret,
            resource,
        } => {
            info!("Authenticating with app credentials");
            client
                .token_from_app(acs_url, client_id, secret, resource)
                .await
                .context("failed to acquire app token")?;
        }
        AuthConfig::User {
            context_token,
            secret,
        } => {
            info!("Authenticating with context token");
            client
                .token_from_user(context_token, secret)
                .await
                .context("failed to acquire user token")?;
        }
    }
    Ok(())
}
