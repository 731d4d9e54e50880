//! Content models (schemas) and the containers that hold their items.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Field type whose values reference other content items.
pub const CONTENT_FIELD_TYPE: &str = "Content";

/// Settings key naming the referenced model on a `Content` field.
pub const CONTENT_DEFINITION_SETTING: &str = "ContentDefinition";

/// Whether a model describes content items or page modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    #[default]
    Content,
    Page,
}

/// A single field definition on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl FieldDef {
    /// Reference name of the model this field links to, for `Content` fields.
    #[must_use]
    pub fn referenced_model(&self) -> Option<&str> {
        if self.field_type != CONTENT_FIELD_TYPE {
            return None;
        }
        self.settings
            .get(CONTENT_DEFINITION_SETTING)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// A content or page model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: i64,

    pub reference_name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub fields: Vec<FieldDef>,

    #[serde(default, rename = "contentDefinitionType")]
    pub kind: ModelKind,
}

impl Model {
    /// The (name, type) pairs used for schema compatibility checks.
    #[must_use]
    pub fn field_signature(&self) -> BTreeSet<(&str, &str)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.field_type.as_str()))
            .collect()
    }

    /// Reference names of other models linked through `Content` fields.
    #[must_use]
    pub fn referenced_models(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter_map(FieldDef::referenced_model)
            .filter(|name| *name != self.reference_name)
            .collect()
    }
}

/// Listing entry for a model; `get_model_by_id` returns the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub id: i64,
    pub reference_name: String,
    #[serde(default)]
    pub display_name: String,
}

/// A column shown in a container's list view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub field_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sort_order: i32,
}

/// A content container (list or single item) bound to one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(alias = "contentViewID")]
    pub id: i64,

    pub reference_name: String,

    /// Instance-local model id.
    #[serde(alias = "contentDefinitionID")]
    pub model_id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub columns: Vec<ColumnRef>,
}

impl Container {
    /// Reference-name prefix of containers the CMS creates for itself.
    pub const SYSTEM_PREFIX: &'static str = "_System";

    /// System containers carry no user-defined model (model id ≤ 0) or use a
    /// reserved reference name.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.model_id <= 0 || self.reference_name.starts_with(Self::SYSTEM_PREFIX)
    }
}

/// Listing entry for a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub id: i64,
    pub reference_name: String,
}
