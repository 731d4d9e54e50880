//! Data model for the CMS content graph.
//!
//! Fields are semantic rather than wire-exact; serde aliases accept the
//! management API's spellings (`contentID`, `mediaID`, ...).
//!
//! - [`EntityKind`] and its fixed dependency order
//! - Galleries and assets
//! - Models and containers
//! - Content items and the delta-sync cursor
//! - Templates, pages and sitemap entries

pub mod content;
pub mod kind;
pub mod media;
pub mod page;
pub mod schema;

pub use content::{ContentDelta, ContentItem, ItemState, SyncToken};
pub use kind::EntityKind;
pub use media::{Asset, Gallery};
pub use page::{Page, PageRef, Template, TemplateSummary, ZoneModule};
pub use schema::{
    ColumnRef, Container, ContainerSummary, FieldDef, Model, ModelKind, ModelSummary,
};
