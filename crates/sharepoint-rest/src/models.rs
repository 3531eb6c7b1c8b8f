//! Records returned by the client and the wire shapes they are mapped from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::fields::FieldValue;

/// Which identity an access token was issued to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOrigin {
    /// Issued on behalf of a user through a context token.
    User,
    /// Issued to the application through client credentials.
    #[default]
    App,
}

/// A freshly acquired access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResult {
    pub access_token: String,
    pub not_before: DateTime<Utc>,
    pub expires_on: DateTime<Utc>,
}

/// Anti-forgery token required by every state-changing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormDigest {
    pub value: String,
    pub timeout_seconds: i64,
    /// Unix epoch second after which the digest is no longer accepted.
    pub expires_at: i64,
}

impl FormDigest {
    /// Whether the digest is still valid at `now` (Unix epoch seconds).
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Result of `/_api/contextinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextInfo {
    pub library_version: String,
    pub form_digest: FormDigest,
    pub site_full_url: Option<String>,
    pub web_full_url: Option<String>,
}

/// A list or document library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRecord {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub item_count: u64,
    pub created: DateTime<Utc>,
    pub extra: BTreeMap<String, FieldValue>,
}

/// A list item or document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub id: u64,
    pub guid: String,
    pub title: Option<String>,
    pub entity_type: String,
    pub uri: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub author_id: u64,
    pub editor_id: u64,
    pub extra: BTreeMap<String, FieldValue>,
}

/// A user profile from the people manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename(deserialize = "AccountName"))]
    pub account: String,
    #[serde(rename(deserialize = "Email"))]
    pub email: Option<String>,
    #[serde(rename(deserialize = "DisplayName"))]
    pub name: Option<String>,
    #[serde(rename(deserialize = "PersonalUrl"))]
    pub url: Option<String>,
    #[serde(rename(deserialize = "PictureUrl"))]
    pub picture: Option<String>,
    #[serde(rename(deserialize = "Title"))]
    pub title: Option<String>,
}

// ============================================================================
// Wire types
// ============================================================================

/// An entity decoded both into its typed fields and as the raw JSON object,
/// so caller-selected extra fields can be read from the latter.
#[derive(Debug)]
pub(crate) struct WireEntity<T> {
    pub fields: T,
    pub raw: Map<String, Value>,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for WireEntity<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let fields = T::deserialize(Value::Object(raw.clone())).map_err(serde::de::Error::custom)?;
        Ok(Self { fields, raw })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireContextInfo {
    pub get_context_web_information: WireContextWebInformation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireContextWebInformation {
    pub form_digest_timeout_seconds: i64,
    pub form_digest_value: String,
    pub library_version: String,
    #[serde(default)]
    pub site_full_url: Option<String>,
    #[serde(default)]
    pub web_full_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub item_count: u64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMetadata {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireItem {
    #[serde(rename = "__metadata")]
    pub metadata: WireMetadata,
    pub id: u64,
    #[serde(rename = "GUID")]
    pub guid: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub author_id: u64,
    pub editor_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireItemCount {
    pub item_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireUploadedFile {
    pub list_item_all_fields: WireUploadedItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireUploadedItem {
    #[serde(rename = "__metadata")]
    pub metadata: WireMetadata,
    pub id: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_token_origin_defaults_to_app() {
        assert_eq!(TokenOrigin::default(), TokenOrigin::App);
    }

    #[test]
    fn test_form_digest_expires_at_boundary() {
        let digest = FormDigest {
            value: "0xABC".to_string(),
            timeout_seconds: 1800,
            expires_at: 1_000,
        };
        assert!(digest.is_valid_at(999));
        assert!(!digest.is_valid_at(1_000));
    }

    #[test]
    fn test_user_profile_maps_people_manager_fields() {
        let profile: UserProfile = serde_json::from_value(json!({
            "__metadata": { "type": "SP.UserProfiles.PersonProperties" },
            "AccountName": "i:0#.f|membership|jane@contoso.com",
            "Email": "jane@contoso.com",
            "DisplayName": "Jane Doe",
            "PersonalUrl": "https://contoso-my.sharepoint.com/personal/jane/",
            "PictureUrl": null,
            "Title": "Engineer"
        }))
        .unwrap();

        assert_eq!(profile.account, "i:0#.f|membership|jane@contoso.com");
        assert_eq!(profile.email.as_deref(), Some("jane@contoso.com"));
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
        assert!(profile.picture.is_none());
        assert_eq!(profile.title.as_deref(), Some("Engineer"));

        let serialized = serde_json::to_value(&profile).unwrap();
        assert_eq!(serialized["name"], "Jane Doe");
    }

    #[test]
    fn test_wire_item_reads_metadata_and_guid() {
        let item: WireItem = serde_json::from_value(json!({
            "__metadata": {
                "id": "Web/Lists(guid'1')/Items(7)",
                "uri": "https://contoso.sharepoint.com/_api/Web/Lists(guid'1')/Items(7)",
                "type": "SP.Data.DocumentsItem"
            },
            "Id": 7,
            "ID": 7,
            "GUID": "0f5d5b0e-8a9c-4b7e-9d0a-3f2f1c7b9e11",
            "Title": null,
            "Created": "2020-01-01T00:00:00Z",
            "Modified": "2020-01-02T00:00:00Z",
            "AuthorId": 11,
            "EditorId": 12
        }))
        .unwrap();

        assert_eq!(item.id, 7);
        assert_eq!(item.metadata.entity_type, "SP.Data.DocumentsItem");
        assert!(item.title.is_none());
        assert_eq!(item.editor_id, 12);
    }

    #[test]
    fn test_wire_entity_keeps_raw_object() {
        let entity: WireEntity<WireItemCount> =
            serde_json::from_value(json!({ "ItemCount": 3, "Custom_x0020_Field": "x" })).unwrap();

        assert_eq!(entity.fields.item_count, 3);
        assert_eq!(entity.raw["Custom_x0020_Field"], "x");
    }

    #[test]
    fn test_wire_entity_reports_missing_typed_field() {
        let err = serde_json::from_value::<WireEntity<WireItemCount>>(json!({ "Other": 1 }))
            .unwrap_err();
        assert!(err.to_string().contains("ItemCount"));
    }
}
