//! Token exchange payloads.
//!
//! SharePoint add-ins receive a signed context token when a user launches
//! them. The token is decoded here without verifying its signature; the
//! caller is expected to have validated it already.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    error::{Result, SharePointError},
    models::TokenResult,
};

/// Claims read from a context token.
#[derive(Debug, Deserialize)]
pub(crate) struct ContextTokenClaims {
    pub aud: String,
    pub appctxsender: String,
    pub appctx: String,
    pub refreshtoken: String,
}

/// The JSON document embedded in the `appctx` claim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AppContext {
    pub security_token_service_uri: String,
}

impl ContextTokenClaims {
    /// Decodes a context token without verifying its signature, expiry or
    /// audience.
    pub(crate) fn decode_unverified(token: &str, secret: &str) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    pub(crate) fn app_context(&self) -> Result<AppContext> {
        serde_json::from_str(&self.appctx).map_err(SharePointError::AppContext)
    }

    /// Builds the `resource` parameter by inserting the API host before the
    /// realm: `<principal>@<realm>` becomes `<principal>/<host>@<realm>`.
    pub(crate) fn resource_for_host(&self, host: &str) -> String {
        self.appctxsender.replace('@', &format!("/{host}@"))
    }
}

/// Form body for the user flow.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshTokenGrant<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
    pub resource: &'a str,
}

/// Form body for the app-only flow.
#[derive(Debug, Serialize)]
pub(crate) struct ClientCredentialsGrant<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub resource: &'a str,
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(deserialize_with = "epoch_seconds")]
    pub not_before: DateTime<Utc>,
    #[serde(deserialize_with = "epoch_seconds")]
    pub expires_on: DateTime<Utc>,
}

impl From<TokenResponse> for TokenResult {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            not_before: response.not_before,
            expires_on: response.expires_on,
        }
    }
}

/// Accepts Unix epoch seconds as a JSON number or a numeric string; the
/// token service sends the latter.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Epoch {
        Number(i64),
        Text(String),
    }

    let seconds = match Epoch::deserialize(deserializer)? {
        Epoch::Number(seconds) => seconds,
        Epoch::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid epoch timestamp: {text}")))?,
    };

    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| de::Error::custom(format!("epoch timestamp out of range: {seconds}")))
}
