//! Request and response DTOs used by the bundled services.
//!
//! Only the fields the client itself relies on are typed; callers that need
//! the full payload can read the response as `serde_json::Value`.

use serde::{Deserialize, Serialize};

/// Email and password for a session login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A management API user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authtoken: Option<String>,
}

/// `{"user": {...}}` envelope returned by login and get-user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    #[serde(default)]
    pub notice: Option<String>,
    pub user: User,
}

/// `{"notice": "..."}` answer of logout and most write operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub notice: String,
}

/// Entries, assets and target environments for a bulk publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkPublishDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<BulkEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<BulkAsset>,
    pub locales: Vec<String>,
    pub environments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkEntry {
    pub uid: String,
    pub content_type: String,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkAsset {
    pub uid: String,
}
