//! Client configuration and profile files.
//!
//! [`ClientConfig`] is what [`SharePointClient::new`](crate::SharePointClient::new)
//! consumes. [`ProfileConfig`] is the on-disk TOML form used by command-line
//! front ends; it bundles the site settings with the credentials for one of
//! the two token flows.
//!
//! # Resolution Algorithm
//!
//! [`ProfileConfig::resolve`] looks for a profile in this order:
//!
//! 1. `SHAREPOINT_CONFIG_PATH` environment variable
//! 2. `sharepoint.toml` in the current directory
//! 3. `sharepoint.toml` in any parent directory
//! 4. `sharepoint/config.toml` in the XDG config directory
//!
//! # Example
//!
//! ```toml
//! [site]
//! url = "https://contoso.sharepoint.com"
//! path = "/sites/dev"
//! timeout_secs = 30
//!
//! [auth]
//! mode = "app"
//! acs_url = "https://accounts.accesscontrol.windows.net/<realm>/tokens/OAuth/2"
//! client_id = "11111111-2222-3333-4444-555555555555@<realm>"
//! secret = "env:SHAREPOINT_CLIENT_SECRET"
//! resource = "00000003-0000-0ff1-ce00-000000000000/contoso.sharepoint.com@<realm>"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SharePointError;

/// Environment variable that points at an explicit profile file.
pub const CONFIG_PATH_ENV: &str = "SHAREPOINT_CONFIG_PATH";

/// File name searched for in the current and parent directories.
pub const PROFILE_FILE_NAME: &str = "sharepoint.toml";

/// Prefix marking a secret that should be read from the environment.
const ENV_SECRET_PREFIX: &str = "env:";

/// Settings for a [`SharePointClient`](crate::SharePointClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute URL of the SharePoint host, e.g. `https://contoso.sharepoint.com`.
    pub url: String,

    /// Server-relative path of the site collection, e.g. `/sites/dev`.
    pub path: String,

    /// Disables TLS certificate and host name verification.
    ///
    /// Only meant for on-premises farms with self-signed certificates.
    pub accept_invalid_certs: bool,

    /// Timeout applied to every request.
    pub timeout: Option<Duration>,

    /// Reuse a form digest until it expires instead of fetching a new one
    /// before every write.
    pub cache_form_digest: bool,

    /// Overrides the `User-Agent` header.
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            accept_invalid_certs: false,
            timeout: None,
            cache_form_digest: false,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn cache_form_digest(mut self, cache: bool) -> Self {
        self.cache_form_digest = cache;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Checks the URL and path, returning the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::Config`] if the URL is empty, not an
    /// absolute URL with a host, or the path is empty.
    pub fn validate(&self) -> Result<Url, SharePointError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(SharePointError::Config(
                "application URL is empty or not set".to_string(),
            ));
        }

        let parsed = Url::parse(url)
            .ok()
            .filter(|parsed| parsed.has_host() && !parsed.cannot_be_a_base())
            .ok_or_else(|| SharePointError::Config(format!("application URL is invalid: {url}")))?;

        if self.path.trim().is_empty() {
            return Err(SharePointError::Config(
                "application URL path is empty or not set".to_string(),
            ));
        }

        Ok(parsed)
    }
}

/// Errors that can occur while resolving or loading a profile.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a profile file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error when a profile is malformed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Profile file not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// The profile parsed but holds unusable values.
    #[error("invalid profile: {0}")]
    Invalid(String),

    /// The `[site]` table does not form a valid client configuration.
    #[error(transparent)]
    Client(#[from] SharePointError),
}

/// A profile file: one site plus, optionally, how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub site: SiteConfig,

    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

/// The `[site]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub url: String,
    pub path: String,

    #[serde(default)]
    pub accept_invalid_certs: bool,

    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub cache_form_digest: bool,

    pub user_agent: Option<String>,
}

/// The `[auth]` table, discriminated by `mode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AuthConfig {
    /// App-only client credentials.
    App {
        acs_url: String,
        client_id: String,
        secret: String,
        resource: String,
    },

    /// A context token handed to the add-in by SharePoint.
    User {
        context_token: String,
        secret: String,
    },
}

impl ProfileConfig {
    /// Loads a profile from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if:
    /// - The file does not exist (returns `NotFound`)
    /// - The file exists but cannot be read (returns `Io`)
    /// - The file cannot be parsed as TOML
    /// - A secret references an unset environment variable
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        Self::parse(&contents)
    }

    /// Parses a profile from TOML text and resolves `env:` secrets.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the text is not a valid profile or a
    /// secret references an unset environment variable.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut profile: Self = toml::from_str(contents)?;
        if let Some(auth) = profile.auth.as_mut() {
            auth.resolve_env_secrets()?;
        }
        Ok(profile)
    }

    /// Finds and loads a profile using the resolution algorithm.
    ///
    /// Returns `Ok(None)` when no profile exists anywhere; a missing file is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found profile cannot be read or
    /// parsed.
    pub fn resolve() -> Result<Option<Self>, ConfigError> {
        // Step 1: Environment variable override
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
            && path.exists()
        {
            debug!(path = %path.display(), "Loading profile from environment override");
            return Self::load(&path).map(Some);
        }

        // Steps 2 and 3: current directory, then its ancestors
        let current = std::env::current_dir()?;
        for dir in current.ancestors() {
            let path = dir.join(PROFILE_FILE_NAME);
            if path.exists() {
                debug!(path = %path.display(), "Loading profile");
                return Self::load(&path).map(Some);
            }
        }

        // Step 4: XDG config directory
        if let Some(path) = xdg_profile_path()
            && path.exists()
        {
            debug!(path = %path.display(), "Loading profile from config directory");
            return Self::load(&path).map(Some);
        }

        Ok(None)
    }

    /// Converts the `[site]` table into a validated [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Client`] if the URL or path is invalid.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let site = &self.site;
        let mut config = ClientConfig::new(&site.url, &site.path)
            .accept_invalid_certs(site.accept_invalid_certs)
            .cache_form_digest(site.cache_form_digest);
        if let Some(secs) = site.timeout_secs {
            config = config.timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &site.user_agent {
            config = config.user_agent(user_agent);
        }

        config.validate()?;
        Ok(config)
    }
}

impl AuthConfig {
    fn resolve_env_secrets(&mut self) -> Result<(), ConfigError> {
        match self {
            Self::App { secret, .. } => resolve_env_secret(secret),
            Self::User {
                context_token,
                secret,
            } => {
                resolve_env_secret(context_token)?;
                resolve_env_secret(secret)
            }
        }
    }
}

fn resolve_env_secret(value: &mut String) -> Result<(), ConfigError> {
    if let Some(var) = value.strip_prefix(ENV_SECRET_PREFIX) {
        let resolved = std::env::var(var).map_err(|_| {
            ConfigError::Invalid(format!("environment variable {var} is not set"))
        })?;
        *value = resolved;
    }
    Ok(())
}

/// `<config dir>/sharepoint/config.toml`, if the platform has a config dir.
fn xdg_profile_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("sharepoint").join("config.toml"))
}
