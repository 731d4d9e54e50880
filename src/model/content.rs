//! Content items and the delta-sync cursor.
//!
//! Field values are free-form JSON. References to other entities appear in a
//! few well-known shapes:
//!
//! - single content link: `{"contentid": 12}`
//! - linked list: `{"referencename": "posts", "sortids": "4,5,6"}`
//! - gallery: `{"galleryid": 3}`
//! - asset attachment: `{"url": "https://cdn/…/file.png", ...}` (alone or in an array)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CONTENT_ID_KEY: &str = "contentid";
pub const SORT_IDS_KEY: &str = "sortids";
pub const GALLERY_ID_KEY: &str = "galleryid";
pub const URL_KEY: &str = "url";

/// Publishing state of a content item or page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Published,
    #[default]
    Staging,
    Deleted,
}

/// A content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(alias = "contentID")]
    pub id: i64,

    pub container_reference_name: String,

    /// Instance-local model id.
    #[serde(alias = "contentDefinitionID")]
    pub model_id: i64,

    #[serde(default)]
    pub state: ItemState,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    /// Ids of every content item this item links to, in field order.
    #[must_use]
    pub fn content_references(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for value in self.fields.values() {
            collect_content_ids(value, &mut ids);
        }
        ids
    }
}

fn collect_content_ids(value: &Value, out: &mut Vec<i64>) {
    match value {
        Value::Object(obj) => {
            if let Some(id) = obj.get(CONTENT_ID_KEY).and_then(Value::as_i64) {
                out.push(id);
            }
            if let Some(sort_ids) = obj.get(SORT_IDS_KEY).and_then(Value::as_str) {
                out.extend(parse_sort_ids(sort_ids));
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_content_ids(item, out);
            }
        }
        _ => {}
    }
}

/// Parse a comma-separated id list, ignoring blanks and junk.
#[must_use]
pub fn parse_sort_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Render an id list back to the comma-separated wire form.
#[must_use]
pub fn format_sort_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Opaque delta-sync cursor returned by the remote content sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncToken(pub String);

impl SyncToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a content delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDelta {
    pub items: Vec<ContentItem>,
    pub next_cursor: SyncToken,
    #[serde(default)]
    pub has_more: bool,
}
