//! Galleries and assets.

use serde::{Deserialize, Serialize};

/// A media gallery grouping assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    #[serde(alias = "mediaGroupingID")]
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub asset_ids: Vec<i64>,
}

/// An uploaded media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(alias = "mediaID")]
    pub id: i64,

    /// Public URL of the file on the owning instance's CDN.
    pub url: String,

    pub file_name: String,

    /// Gallery the asset belongs to, if any (instance-local id).
    #[serde(default, alias = "mediaGroupingID")]
    pub gallery_id: Option<i64>,

    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl Asset {
    /// Cross-instance identity of the asset.
    ///
    /// Asset URLs carry an instance-specific host, so the file name is the
    /// stable part. Compared case-insensitively.
    #[must_use]
    pub fn origin_key(&self) -> String {
        self.file_name.to_lowercase()
    }
}
