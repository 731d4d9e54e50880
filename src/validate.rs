//! Input validation for command arguments.
//!
//! Kind names resolve in three tiers: exact match → synonym lookup → error
//! with the closest suggestion. Instance ids must be GUIDs.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::EntityKind;

// ── Kind names ───────────────────────────────────────────────

pub static KIND_NAMES: LazyLock<HashMap<&str, EntityKind>> = LazyLock::new(|| {
    [
        ("galleries", EntityKind::Gallery),
        ("assets", EntityKind::Asset),
        ("models", EntityKind::Model),
        ("containers", EntityKind::Container),
        ("content", EntityKind::ContentItem),
        ("templates", EntityKind::Template),
        ("pages", EntityKind::Page),
    ]
    .into_iter()
    .collect()
});

pub static KIND_SYNONYMS: LazyLock<HashMap<&str, EntityKind>> = LazyLock::new(|| {
    [
        ("gallery", EntityKind::Gallery),
        ("assetgalleries", EntityKind::Gallery),
        ("asset", EntityKind::Asset),
        ("media", EntityKind::Asset),
        ("files", EntityKind::Asset),
        ("model", EntityKind::Model),
        ("contentmodels", EntityKind::Model),
        ("schemas", EntityKind::Model),
        ("container", EntityKind::Container),
        ("lists", EntityKind::Container),
        ("items", EntityKind::ContentItem),
        ("item", EntityKind::ContentItem),
        ("contentitems", EntityKind::ContentItem),
        ("content_items", EntityKind::ContentItem),
        ("template", EntityKind::Template),
        ("pagetemplates", EntityKind::Template),
        ("page", EntityKind::Page),
        ("sitemap", EntityKind::Page),
    ]
    .into_iter()
    .collect()
});

/// Resolve one kind name.
pub fn normalize_kind(input: &str) -> std::result::Result<EntityKind, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    if let Some(&kind) = KIND_NAMES.get(lower.as_str()) {
        return Ok(kind);
    }
    if let Some(&kind) = KIND_SYNONYMS.get(lower.as_str()) {
        return Ok(kind);
    }

    Err((input.to_string(), closest_kind(&lower)))
}

/// Parse `--kinds` values into a deduplicated list in dependency order.
///
/// Values may be comma separated. No values selects every kind.
///
/// # Errors
///
/// Returns [`Error::InvalidKind`] for the first unknown name.
pub fn parse_kinds<S: AsRef<str>>(values: &[S]) -> Result<Vec<EntityKind>> {
    let mut kinds = Vec::new();
    for raw in values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .filter(|v| !v.trim().is_empty())
    {
        let kind = normalize_kind(raw).map_err(|(input, suggestion)| {
            Error::InvalidKind(match suggestion {
                Some(s) => format!("{input} (did you mean '{s}'?)"),
                None => input,
            })
        })?;
        kinds.push(kind);
    }

    if kinds.is_empty() {
        return Ok(EntityKind::ORDERED.to_vec());
    }
    kinds.sort_unstable();
    kinds.dedup();
    Ok(kinds)
}

/// Instance ids are GUIDs. Returns the canonical lowercase form.
///
/// # Errors
///
/// Returns [`Error::InvalidInstance`] when `input` is not a GUID.
pub fn validate_instance_id(input: &str) -> Result<String> {
    uuid::Uuid::parse_str(input.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| Error::InvalidInstance(input.to_string()))
}

/// Reject empty or whitespace-only values.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming `field`.
pub fn validate_non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Closest canonical kind name within edit distance 3.
fn closest_kind(input: &str) -> Option<String> {
    let mut best: Option<(EntityKind, usize)> = None;

    for (&name, &kind) in KIND_NAMES.iter().chain(KIND_SYNONYMS.iter()) {
        let dist = levenshtein_distance(input, name);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            best = Some((kind, dist));
        }
    }

    best.and_then(|(kind, _)| {
        KIND_NAMES
            .iter()
            .find(|&(_, &k)| k == kind)
            .map(|(&name, _)| name.to_string())
    })
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("models"), Ok(EntityKind::Model));
        assert_eq!(normalize_kind("Model"), Ok(EntityKind::Model));
        assert_eq!(normalize_kind("items"), Ok(EntityKind::ContentItem));
        assert_eq!(normalize_kind(" content "), Ok(EntityKind::ContentItem));
        assert_eq!(normalize_kind("sitemap"), Ok(EntityKind::Page));
    }

    #[test]
    fn test_normalize_kind_suggestion() {
        let (input, suggestion) = normalize_kind("modles").unwrap_err();
        assert_eq!(input, "modles");
        assert_eq!(suggestion.as_deref(), Some("models"));

        let (_, suggestion) = normalize_kind("zzzzzzzzzzzz").unwrap_err();
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_parse_kinds_default_is_all() {
        let none: [&str; 0] = [];
        assert_eq!(parse_kinds(&none).unwrap(), EntityKind::ORDERED.to_vec());
    }

    #[test]
    fn test_parse_kinds_ordered_and_deduplicated() {
        let kinds = parse_kinds(&["pages,models", "model", "galleries"]).unwrap();
        assert_eq!(
            kinds,
            vec![EntityKind::Gallery, EntityKind::Model, EntityKind::Page]
        );
    }

    #[test]
    fn test_parse_kinds_invalid() {
        let err = parse_kinds(&["models", "widgets"]).unwrap_err();
        assert!(matches!(err, Error::InvalidKind(ref s) if s.starts_with("widgets")));
    }

    #[test]
    fn test_validate_instance_id() {
        assert_eq!(
            validate_instance_id("3F2B8C9E-1D4A-4E6B-9C1F-7A2D5E8B0C3A").unwrap(),
            "3f2b8c9e-1d4a-4e6b-9c1f-7a2d5e8b0c3a"
        );
        assert!(matches!(
            validate_instance_id("not-a-guid"),
            Err(Error::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_validate_non_empty() {
        assert_eq!(validate_non_empty("locale", " en-us ").unwrap(), "en-us");
        assert!(matches!(
            validate_non_empty("locale", "  "),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }
}
