//! Client library for the SharePoint REST API.
//!
//! The crate wraps the OData verbose endpoints of a single SharePoint site:
//! acquiring an access token, reading lists and list items, uploading,
//! updating and deleting items, and reading user profiles.
//!
//! # Key Components
//!
//! - **Client**: [`SharePointClient`] holds the session state (access token,
//!   token origin, optional form digest cache) and performs every operation
//! - **Configuration**: [`ClientConfig`] for programmatic use and
//!   [`ProfileConfig`] for TOML profile files
//! - **Extra fields**: [`ExtraFields`] selects additional columns to copy
//!   into each record's `extra` map
//! - **Errors**: every failure surfaces as a [`SharePointError`]
//!
//! # Example
//!
//! ```no_run
//! use sharepoint_rest::{ClientConfig, ExtraFields, SharePointClient};
//!
//! # async fn example() -> sharepoint_rest::Result<()> {
//! let mut client = SharePointClient::new(ClientConfig::new(
//!     "https://contoso.sharepoint.com",
//!     "/sites/dev",
//! ))?;
//! client
//!     .token_from_app(
//!         "https://accounts.accesscontrol.windows.net/realm/tokens/OAuth/2",
//!         "client-id@realm",
//!         "secret",
//!         "00000003-0000-0ff1-ce00-000000000000/contoso.sharepoint.com@realm",
//!     )
//!     .await?;
//!
//! let extra = ExtraFields::new().field("due", "Due Date");
//! for list in client.get_lists(&ExtraFields::new()).await? {
//!     println!("{} ({} items)", list.title, list.item_count);
//! }
//! let items = client.get_list_items("Documents", &extra).await?;
//! println!("{} documents", items.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Read operations take `&self`. Token acquisition and writes take
//! `&mut self` because they update the session (token, origin, cached
//! digest). Wrap the client in a `tokio::sync::Mutex` to share it.

mod client;
pub mod config;
mod error;
mod fields;
mod models;
mod response;
mod token;

pub use client::SharePointClient;
pub use config::{AuthConfig, ClientConfig, ConfigError, ProfileConfig, SiteConfig};
pub use error::{Result, SharePointError};
pub use fields::{ExtraFields, FieldValue};
pub use models::{
    ContextInfo, FormDigest, ItemRecord, ListRecord, TokenOrigin, TokenResult, UserProfile,
};
