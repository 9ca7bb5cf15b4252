//! URL record entity representing a short code mapping.

use serde::{Deserialize, Serialize};

/// A mapping between a long URL and its short code.
///
/// Serialized with the field names used by the JSON-lines file backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Opaque identifier: client correlation id for batch creation, otherwise
    /// generated by the backend.
    #[serde(rename = "uuid", default)]
    pub id: String,
    #[serde(rename = "original_url")]
    pub original: String,
    #[serde(rename = "short_url")]
    pub short: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl UrlRecord {
    /// Creates a live record.
    pub fn new(
        id: impl Into<String>,
        original: impl Into<String>,
        short: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original: original.into(),
            short: short.into(),
            user_id: user_id.into(),
            is_deleted: false,
        }
    }

    /// Builds the request handed to the deletion worker: only the short code
    /// and the owner are used to match stored rows.
    pub fn deletion(short: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            short: short.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Returns true if this delete request targets `stored`.
    ///
    /// Rows match by short code and owning user.
    pub fn matches_deletion(&self, stored: &UrlRecord) -> bool {
        self.short == stored.short && self.user_id == stored.user_id
    }
}
