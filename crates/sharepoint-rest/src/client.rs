//! The SharePoint REST client.
//!
//! Every operation follows the same shape: check preconditions locally, build
//! the endpoint URL under `<site>/_api/`, attach the bearer token (plus a form
//! digest for writes), send, and decode the body once through
//! [`ApiResponse`].

use std::{fmt, path::Path};

use chrono::Utc;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{
    RequestBuilder, Url,
    header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, IF_MATCH},
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::ClientConfig,
    error::{Result, SharePointError},
    fields::ExtraFields,
    models::{
        ContextInfo, FormDigest, ItemRecord, ListRecord, TokenOrigin, TokenResult, UserProfile,
        WireContextInfo, WireEntity, WireItem, WireItemCount, WireList, WireUploadedFile,
    },
    response::{ApiResponse, Results, Verbose},
    token::{ClientCredentialsGrant, ContextTokenClaims, RefreshTokenGrant, TokenResponse},
};

/// Media type of OData verbose requests and responses.
const ODATA_VERBOSE: &str = "application/json;odata=verbose";

/// Header carrying the form digest on state-changing requests.
const REQUEST_DIGEST: &str = "X-RequestDigest";

/// Header tunnelling MERGE and DELETE through POST.
const HTTP_METHOD_OVERRIDE: &str = "X-HTTP-Method";

/// A cached digest is refreshed this many seconds before it expires.
const DIGEST_EXPIRY_MARGIN_SECS: i64 = 30;

/// Characters escaped in OData literals placed in a URL path. `%`, `?` and
/// `#` would otherwise start an escape, the query or the fragment.
const ODATA_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Session with one SharePoint site.
///
/// The client holds the access token obtained by
/// [`token_from_user`](Self::token_from_user) or
/// [`token_from_app`](Self::token_from_app) and attaches it to every
/// subsequent request. Methods that change session state take `&mut self`;
/// share a client between tasks behind a lock.
///
/// ```no_run
/// use sharepoint_rest::{ClientConfig, ExtraFields, SharePointClient};
///
/// # async fn example() -> sharepoint_rest::Result<()> {
/// let config = ClientConfig::new("https://contoso.sharepoint.com", "/sites/dev");
/// let mut client = SharePointClient::new(config)?;
///
/// client
///     .token_from_app(
///         "https://accounts.accesscontrol.windows.net/realm/tokens/OAuth/2",
///         "client-id@realm",
///         "secret",
///         "00000003-0000-0ff1-ce00-000000000000/contoso.sharepoint.com@realm",
///     )
///     .await?;
///
/// for item in client.get_list_items("Documents", &ExtraFields::new()).await? {
///     println!("{} {:?}", item.id, item.title);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SharePointClient {
    http: reqwest::Client,
    config: ClientConfig,
    base_url: Url,
    site_url: String,
    access_token: Option<String>,
    origin: TokenOrigin,
    digest: Option<FormDigest>,
}

impl fmt::Debug for SharePointClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePointClient")
            .field("site_url", &self.site_url)
            .field("has_token", &self.access_token.is_some())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SharePointClient {
    /// Validates `config` and prepares the HTTP client. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::Config`] if the URL is missing or invalid
    /// or the path is empty, and [`SharePointError::Http`] if the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.validate()?;

        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder.build()?;

        let site_url = site_url(&base_url, &config.path);
        debug!(%site_url, "Created SharePoint client");

        Ok(Self {
            http,
            config,
            base_url,
            site_url,
            access_token: None,
            origin: TokenOrigin::default(),
            digest: None,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL of the site, without a trailing slash.
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// The current access token, if one has been acquired.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Who the current token was issued to. Defaults to [`TokenOrigin::App`].
    pub fn origin(&self) -> TokenOrigin {
        self.origin
    }

    // ------------------------------------------------------------------------
    // Token acquisition
    // ------------------------------------------------------------------------

    /// Exchanges a context token for an access token on behalf of the user
    /// who launched the add-in.
    ///
    /// The context token's signature is not verified.
    ///
    /// # Errors
    ///
    /// Returns an error if either argument is empty, the context token or
    /// its embedded app context cannot be decoded, the request fails, or the
    /// token service answers with an error.
    #[instrument(skip_all)]
    pub async fn token_from_user(&mut self, context_token: &str, secret: &str) -> Result<TokenResult> {
        require(context_token, "context token")?;
        require(secret, "secret")?;

        let claims = ContextTokenClaims::decode_unverified(context_token, secret)?;
        let host = self
            .base_url
            .host_str()
            .ok_or_else(|| SharePointError::Config("application URL has no host".to_string()))?;
        let resource = claims.resource_for_host(host);
        let app_context = claims.app_context()?;
        let sts_url = parse_absolute_url(
            &app_context.security_token_service_uri,
            "security token service URI",
        )?;

        let grant = RefreshTokenGrant {
            grant_type: "refresh_token",
            client_id: &claims.aud,
            client_secret: secret,
            refresh_token: &claims.refreshtoken,
            resource: &resource,
        };

        debug!(url = %sts_url, "Requesting user access token");
        let response: TokenResponse = self
            .send(self.with_timeout(self.http.post(sts_url).form(&grant)))
            .await?;

        info!("Acquired access token for user");
        Ok(self.store_token(response, TokenOrigin::User))
    }

    /// Acquires an app-only access token through client credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if any argument is empty, `acs_url` is not an
    /// absolute URL, the request fails, or the token service answers with an
    /// error.
    #[instrument(skip_all)]
    pub async fn token_from_app(
        &mut self,
        acs_url: &str,
        client_id: &str,
        secret: &str,
        resource: &str,
    ) -> Result<TokenResult> {
        require(acs_url, "access control service URL")?;
        let acs_url = parse_absolute_url(acs_url, "access control service URL")?;
        require(client_id, "client ID")?;
        require(secret, "secret")?;
        require(resource, "resource")?;

        let grant = ClientCredentialsGrant {
            grant_type: "client_credentials",
            client_id,
            client_secret: secret,
            resource,
        };

        debug!(url = %acs_url, "Requesting app access token");
        let response: TokenResponse = self
            .send(self.with_timeout(self.http.post(acs_url).form(&grant)))
            .await?;

        info!("Acquired access token for app");
        Ok(self.store_token(response, TokenOrigin::App))
    }

    fn store_token(&mut self, response: TokenResponse, origin: TokenOrigin) -> TokenResult {
        let result = TokenResult::from(response);
        self.access_token = Some(result.access_token.clone());
        self.origin = origin;
        self.digest = None;
        result
    }

    // ------------------------------------------------------------------------
    // Context information
    // ------------------------------------------------------------------------

    /// Fetches the site's context information, including a new form digest.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::MissingToken`] without a token, otherwise
    /// any transport, decoding or API error.
    #[instrument(skip(self))]
    pub async fn get_context_info(&self) -> Result<ContextInfo> {
        let token = self.require_token()?;
        let url = self.endpoint("contextinfo")?;

        debug!(%url, "Fetching context information");
        let Verbose { d }: Verbose<WireContextInfo> = self
            .send(
                self.authorized(self.http.post(url), token)
                    .header(CONTENT_LENGTH, 0_u64),
            )
            .await?;

        let info = d.get_context_web_information;
        Ok(ContextInfo {
            library_version: info.library_version,
            form_digest: FormDigest {
                value: info.form_digest_value,
                timeout_seconds: info.form_digest_timeout_seconds,
                expires_at: Utc::now()
                    .timestamp()
                    .saturating_add(info.form_digest_timeout_seconds),
            },
            site_full_url: info.site_full_url,
            web_full_url: info.web_full_url,
        })
    }

    /// Returns a digest for the next write: a fresh one, or the cached one
    /// when caching is enabled and it has not expired.
    async fn form_digest(&mut self) -> Result<String> {
        if self.config.cache_form_digest
            && let Some(digest) = &self.digest
            && digest.is_valid_at(Utc::now().timestamp() + DIGEST_EXPIRY_MARGIN_SECS)
        {
            debug!("Reusing cached form digest");
            return Ok(digest.value.clone());
        }

        let digest = self.get_context_info().await?.form_digest;
        let value = digest.value.clone();
        if self.config.cache_form_digest {
            debug!(expires_at = digest.expires_at, "Caching form digest");
            self.digest = Some(digest);
        }
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    /// Lists every list and library of the site.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::InvalidProperty`] if `extra` names a field
    /// a list lacks, besides the usual token, transport and API errors.
    #[instrument(skip(self, extra))]
    pub async fn get_lists(&self, extra: &ExtraFields) -> Result<Vec<ListRecord>> {
        let token = self.require_token()?;
        let url = self.endpoint("web/Lists")?;

        debug!(%url, "Fetching lists");
        let Verbose { d }: Verbose<Results<WireEntity<WireList>>> =
            self.send(self.authorized(self.http.get(url), token)).await?;

        d.results
            .into_iter()
            .map(|entity| {
                Ok(ListRecord {
                    extra: extra.extract(&entity.raw)?,
                    guid: entity.fields.id,
                    title: entity.fields.title,
                    description: entity.fields.description,
                    item_count: entity.fields.item_count,
                    created: entity.fields.created,
                })
            })
            .collect()
    }

    /// Returns the number of items in a list.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` is empty, or the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn get_list_item_count(&self, library: &str) -> Result<u64> {
        let token = self.require_token()?;
        require(library, "library")?;
        let url = self.endpoint(&format!("{}/itemCount", list_path(library)))?;

        debug!(%url, "Fetching item count");
        let Verbose { d }: Verbose<WireItemCount> =
            self.send(self.authorized(self.http.get(url), token)).await?;
        Ok(d.item_count)
    }

    /// Lists the items of a list.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` is empty, `extra`
    /// names a missing field, or the request fails.
    #[instrument(skip(self, extra))]
    pub async fn get_list_items(
        &self,
        library: &str,
        extra: &ExtraFields,
    ) -> Result<Vec<ItemRecord>> {
        let token = self.require_token()?;
        require(library, "library")?;
        let url = self.endpoint(&format!("{}/items", list_path(library)))?;

        debug!(%url, "Fetching list items");
        let Verbose { d }: Verbose<Results<WireEntity<WireItem>>> =
            self.send(self.authorized(self.http.get(url), token)).await?;

        d.results
            .into_iter()
            .map(|entity| item_record(entity, extra))
            .collect()
    }

    /// Fetches one item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` is empty, `id` is
    /// zero, `extra` names a missing field, or the request fails.
    #[instrument(skip(self, extra))]
    pub async fn get_list_item(
        &self,
        library: &str,
        id: u64,
        extra: &ExtraFields,
    ) -> Result<ItemRecord> {
        let token = self.require_token()?;
        require(library, "library")?;
        require_id(id)?;
        let url = self.endpoint(&item_path(library, id))?;

        debug!(%url, "Fetching list item");
        let Verbose { d }: Verbose<WireEntity<WireItem>> =
            self.send(self.authorized(self.http.get(url), token)).await?;
        item_record(d, extra)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Uploads a file into a document library and then sets its metadata.
    ///
    /// These are two separate requests. If setting the metadata fails, the
    /// uploaded file stays in the library without it.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` is empty, the file
    /// cannot be read, or either request fails.
    #[instrument(skip(self, file, properties))]
    pub async fn upload_list_item(
        &mut self,
        library: &str,
        file: impl AsRef<Path>,
        properties: &Map<String, Value>,
        overwrite: bool,
    ) -> Result<bool> {
        let file = file.as_ref();
        self.require_token()?;
        require(library, "library")?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SharePointError::InvalidArgument(format!("invalid file name: {}", file.display()))
            })?;
        let data = tokio::fs::read(file)
            .await
            .map_err(|source| SharePointError::File {
                path: file.to_path_buf(),
                source,
            })?;

        let digest = self.form_digest().await?;
        let token = self.require_token()?;
        let url = self.endpoint(&format!(
            "web/GetFolderByServerRelativeUrl({})/Files/Add(url={},overwrite='{overwrite}')",
            path_literal(&format!("Lists/{library}")),
            path_literal(file_name),
        ))?;

        debug!(%url, bytes = data.len(), "Uploading file");
        let Verbose { d }: Verbose<WireUploadedFile> = self
            .send(
                self.authorized(self.http.post(url), token)
                    .header(REQUEST_DIGEST, digest)
                    .query(&[
                        ("$select", "ListItemAllFields/Id"),
                        ("$expand", "ListItemAllFields"),
                    ])
                    .body(data),
            )
            .await?;

        let item = d.list_item_all_fields;
        info!(id = item.id, "Uploaded file");

        self.update_list_item(library, item.id, properties, &item.metadata.entity_type)
            .await
    }

    /// Merges `properties` into an existing item.
    ///
    /// The request always carries `IF-MATCH: *`, so concurrent edits are
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` or `entity_type` is
    /// empty, `id` is zero, or the request fails.
    #[instrument(skip(self, properties))]
    pub async fn update_list_item(
        &mut self,
        library: &str,
        id: u64,
        properties: &Map<String, Value>,
        entity_type: &str,
    ) -> Result<bool> {
        self.require_token()?;
        require(library, "library")?;
        require_id(id)?;
        require(entity_type, "entity type")?;

        let digest = self.form_digest().await?;
        let token = self.require_token()?;
        let url = self.endpoint(&item_path(library, id))?;

        let mut body = Map::new();
        body.insert(
            "__metadata".to_string(),
            serde_json::json!({ "type": entity_type }),
        );
        body.extend(properties.clone());
        let data = Value::Object(body).to_string().into_bytes();

        debug!(%url, "Updating list item");
        let _: IgnoredAny = self
            .send(
                self.authorized(self.http.post(url), token)
                    .header(REQUEST_DIGEST, digest)
                    .header(HTTP_METHOD_OVERRIDE, "MERGE")
                    .header(IF_MATCH, "*")
                    .header(CONTENT_TYPE, ODATA_VERBOSE)
                    .header(CONTENT_LENGTH, data.len())
                    .body(data),
            )
            .await?;

        info!(id, "Updated list item");
        Ok(true)
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `library` is empty, `id` is
    /// zero, or the request fails.
    #[instrument(skip(self))]
    pub async fn delete_list_item(&mut self, library: &str, id: u64) -> Result<bool> {
        self.require_token()?;
        require(library, "library")?;
        require_id(id)?;

        let digest = self.form_digest().await?;
        let token = self.require_token()?;
        let url = self.endpoint(&item_path(library, id))?;

        debug!(%url, "Deleting list item");
        let _: IgnoredAny = self
            .send(
                self.authorized(self.http.post(url), token)
                    .header(REQUEST_DIGEST, digest)
                    .header(HTTP_METHOD_OVERRIDE, "DELETE")
                    .header(IF_MATCH, "*")
                    .header(CONTENT_LENGTH, 0_u64),
            )
            .await?;

        info!(id, "Deleted list item");
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // User profiles
    // ------------------------------------------------------------------------

    /// Returns the profile of the user the token was issued to.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::MissingToken`] without a token and
    /// [`SharePointError::TokenOrigin`] when the token was issued to the app.
    #[instrument(skip(self))]
    pub async fn get_current_user_profile(&self) -> Result<UserProfile> {
        let token = self.require_token()?;
        if self.origin != TokenOrigin::User {
            return Err(SharePointError::TokenOrigin);
        }
        let url = self.endpoint("SP.UserProfiles.PeopleManager/GetMyProperties")?;

        debug!(%url, "Fetching current user profile");
        let Verbose { d }: Verbose<UserProfile> =
            self.send(self.authorized(self.http.get(url), token)).await?;
        Ok(d)
    }

    /// Returns the profile of `account`, e.g. `i:0#.f|membership|jane@contoso.com`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no token, `account` is empty, or the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn get_user_profile(&self, account: &str) -> Result<UserProfile> {
        let token = self.require_token()?;
        require(account, "account")?;
        let url = self.endpoint("SP.UserProfiles.PeopleManager/GetPropertiesFor(accountName=@v)")?;

        debug!(%url, "Fetching user profile");
        let Verbose { d }: Verbose<UserProfile> = self
            .send(
                self.authorized(self.http.post(url), token)
                    .query(&[("@v", odata_string(account))])
                    .header(CONTENT_LENGTH, 0_u64),
            )
            .await?;
        Ok(d)
    }

    // ------------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------------

    fn require_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(SharePointError::MissingToken)
    }

    fn endpoint(&self, resource: &str) -> Result<Url> {
        Url::parse(&format!("{}/_api/{resource}", self.site_url))
            .map_err(|e| SharePointError::InvalidArgument(format!("invalid request URL: {e}")))
    }

    fn with_timeout(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        self.with_timeout(request)
            .bearer_auth(token)
            .header(ACCEPT, ODATA_VERBOSE)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        let decoded = ApiResponse::<T>::from_body(status, &body)?;
        if let ApiResponse::Error(message) = &decoded {
            warn!(status, %message, "SharePoint returned an error");
        }
        decoded.into_result()
    }
}

fn item_record(entity: WireEntity<WireItem>, extra: &ExtraFields) -> Result<ItemRecord> {
    let extra = extra.extract(&entity.raw)?;
    let item = entity.fields;
    Ok(ItemRecord {
        id: item.id,
        guid: item.guid,
        title: item.title,
        entity_type: item.metadata.entity_type,
        uri: item.metadata.uri,
        created: item.created,
        modified: item.modified,
        author_id: item.author_id,
        editor_id: item.editor_id,
        extra,
    })
}

fn require(value: &str, name: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SharePointError::MissingArgument(name));
    }
    Ok(())
}

fn require_id(id: u64) -> Result<()> {
    if id == 0 {
        return Err(SharePointError::MissingArgument("item ID"));
    }
    Ok(())
}

fn parse_absolute_url(value: &str, name: &str) -> Result<Url> {
    Url::parse(value)
        .ok()
        .filter(Url::has_host)
        .ok_or_else(|| SharePointError::InvalidArgument(format!("{name} is invalid: {value}")))
}

/// Joins the host URL and the site path without doubling slashes.
fn site_url(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim().trim_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Quotes an OData string literal, doubling embedded single quotes.
fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quotes an OData string literal and escapes it for use in a URL path.
fn path_literal(value: &str) -> String {
    utf8_percent_encode(&odata_string(value), ODATA_PATH).to_string()
}

fn list_path(library: &str) -> String {
    format!("web/Lists/GetByTitle({})", path_literal(library))
}

fn item_path(library: &str, id: u64) -> String {
    format!("{}/items({id})", list_path(library))
}
