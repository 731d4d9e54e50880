//! Entity kinds and their fixed dependency order.

use serde::{Deserialize, Serialize};

/// One of the seven entity types that make up an instance's content graph.
///
/// Variant order is the dependency order used by both pull and push:
/// galleries, assets, models, containers, content items, templates, pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gallery,
    Asset,
    Model,
    Container,
    ContentItem,
    Template,
    Page,
}

impl EntityKind {
    /// All kinds in dependency order.
    pub const ORDERED: [Self; 7] = [
        Self::Gallery,
        Self::Asset,
        Self::Model,
        Self::Container,
        Self::ContentItem,
        Self::Template,
        Self::Page,
    ];

    /// Snake-case identifier used in JSON output and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::Asset => "asset",
            Self::Model => "model",
            Self::Container => "container",
            Self::ContentItem => "content_item",
            Self::Template => "template",
            Self::Page => "page",
        }
    }

    /// Human-readable plural label for progress output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Gallery => "Galleries",
            Self::Asset => "Assets",
            Self::Model => "Models",
            Self::Container => "Containers",
            Self::ContentItem => "Content Items",
            Self::Template => "Templates",
            Self::Page => "Pages",
        }
    }

    /// Folder (relative to a run's base path) holding one JSON document per entity.
    #[must_use]
    pub const fn folder(&self) -> &'static str {
        match self {
            Self::Gallery => "galleries",
            Self::Asset => "assets/json",
            Self::Model => "models",
            Self::Container => "containers",
            Self::ContentItem => "item",
            Self::Template => "templates",
            Self::Page => "pages",
        }
    }

    /// Position in the dependency order.
    #[must_use]
    pub const fn stage(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_matches_stage() {
        for (i, kind) in EntityKind::ORDERED.iter().enumerate() {
            assert_eq!(kind.stage(), i);
        }
        assert!(EntityKind::Model < EntityKind::Container);
        assert!(EntityKind::Template < EntityKind::Page);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&EntityKind::ContentItem).unwrap();
        assert_eq!(json, "\"content_item\"");
    }
}
