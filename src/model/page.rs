//! Page templates, pages and sitemap entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::content::ItemState;

/// A page template: a named layout with content zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(alias = "pageTemplateID")]
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub zones: Vec<String>,
}

/// Listing entry for a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: i64,
    pub name: String,
}

/// A module placed in a page zone, backed by a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneModule {
    pub module: String,
    #[serde(alias = "contentID")]
    pub content_id: i64,
}

/// A page in the sitemap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(alias = "pageID")]
    pub id: i64,

    #[serde(default)]
    pub name: String,

    pub path: String,

    #[serde(default)]
    pub title: String,

    /// Folder pages and links have no template.
    #[serde(default, alias = "pageTemplateID")]
    pub template_id: Option<i64>,

    #[serde(default)]
    pub parent_id: Option<i64>,

    /// Content item rendered by a dynamic page.
    #[serde(default)]
    pub dynamic_content_item_id: Option<i64>,

    #[serde(default)]
    pub zones: BTreeMap<String, Vec<ZoneModule>>,

    #[serde(default)]
    pub state: ItemState,
}

/// A sitemap entry: one page reference for a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRef {
    #[serde(alias = "pageID")]
    pub page_id: i64,
    pub path: String,
}
