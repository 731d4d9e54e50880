//! Status command implementation.

use serde::Serialize;
use std::path::PathBuf;

use super::{Output, mode_label};
use crate::cli::StatusArgs;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::EntityKind;
use crate::store::LocalStore;
use crate::validate::{validate_instance_id, validate_non_empty};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    instance: String,
    locale: String,
    preview: bool,
    base_path: PathBuf,
    exists: bool,
    kinds: Vec<KindCount>,
    lists: usize,
    sync_token: Option<String>,
    sitemap_channels: Vec<String>,
}

#[derive(Serialize)]
struct KindCount {
    kind: EntityKind,
    documents: usize,
    digest: Option<String>,
}

/// Execute status command.
///
/// Reads only the local store; no API token is needed. Each populated kind
/// also reports a SHA-256 fingerprint of its documents.
///
/// # Errors
///
/// Returns an error for invalid arguments or an unreadable sync state file.
pub fn execute(args: &StatusArgs, config: &SyncConfig, output: Output) -> Result<()> {
    let instance = validate_instance_id(&args.source)?;
    let locale = validate_non_empty(
        "locale",
        args.locale.as_deref().unwrap_or(&config.default_locale),
    )?;
    let preview = args.mode.is_preview();
    let store = config.store_root().store_for(&instance, &locale, preview);

    let status = collect(&store, instance, locale, preview)?;

    if output.json {
        println!("{}", serde_json::to_string(&status)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    println!(
        "Local store for {} ({}, {})",
        status.instance,
        status.locale,
        mode_label(status.preview)
    );
    println!("  Location: {}", status.base_path.display());
    if !status.exists {
        println!();
        println!("Nothing pulled yet.");
        println!();
        println!(
            "Pull with: cms-sync pull --source {} --locale {}",
            status.instance, status.locale
        );
        return Ok(());
    }

    println!();
    for entry in &status.kinds {
        match &entry.digest {
            Some(digest) => println!(
                "  {:<14} {:>6}  {}",
                entry.kind.label(),
                entry.documents,
                &digest[..12]
            ),
            None => println!("  {:<14} {:>6}", entry.kind.label(), entry.documents),
        }
    }
    println!("  {:<14} {:>6}", "Lists", status.lists);
    println!();
    match &status.sync_token {
        Some(token) => println!("  Sync token: {token}"),
        None => println!("  Sync token: none (next content pull is a full sync)"),
    }
    if status.sitemap_channels.is_empty() {
        println!("  Sitemaps:   none");
    } else {
        println!("  Sitemaps:   {}", status.sitemap_channels.join(", "));
    }

    Ok(())
}

fn collect(
    store: &LocalStore,
    instance: String,
    locale: String,
    preview: bool,
) -> Result<StatusOutput> {
    let exists = store.exists();
    let sync_token = if exists {
        store
            .read_sync_token()
            .map_err(|e| Error::Other(e.to_string()))?
            .map(|t| t.as_str().to_string())
    } else {
        None
    };
    let mut kinds = Vec::with_capacity(EntityKind::ORDERED.len());
    for kind in EntityKind::ORDERED {
        kinds.push(KindCount {
            kind,
            documents: store.count(kind),
            digest: store
                .kind_digest(kind)
                .map_err(|e| Error::Other(e.to_string()))?,
        });
    }

    Ok(StatusOutput {
        instance,
        locale,
        preview,
        base_path: store.base_path().to_path_buf(),
        exists,
        kinds,
        lists: store.list_count(),
        sync_token,
        sitemap_channels: store.sitemap_channels(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gallery, PageRef, SyncToken};

    #[test]
    fn test_collect_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("missing"));
        let status = collect(&store, "i".into(), "en-us".into(), false).unwrap();
        assert!(!status.exists);
        assert!(status.kinds.iter().all(|k| k.documents == 0 && k.digest.is_none()));
        assert!(status.sync_token.is_none());
        assert!(status.sitemap_channels.is_empty());
    }

    #[test]
    fn test_collect_populated_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path());
        store.ensure_base_dirs().unwrap();
        let gallery = Gallery {
            id: 7,
            name: "Banners".into(),
            description: None,
            asset_ids: Vec::new(),
        };
        store.write_entity(EntityKind::Gallery, "7", &gallery).unwrap();
        store.write_sync_token(&SyncToken("42".into())).unwrap();
        store
            .write_sitemap(
                "website",
                &[PageRef {
                    page_id: 1,
                    path: "/".into(),
                }],
            )
            .unwrap();

        let status = collect(&store, "i".into(), "en-us".into(), true).unwrap();
        assert!(status.exists);
        let galleries = status
            .kinds
            .iter()
            .find(|k| k.kind == EntityKind::Gallery)
            .unwrap();
        assert_eq!(galleries.documents, 1);
        assert_eq!(galleries.digest.as_ref().map(String::len), Some(64));
        assert!(status
            .kinds
            .iter()
            .filter(|k| k.kind != EntityKind::Gallery)
            .all(|k| k.digest.is_none()));
        assert_eq!(status.sync_token.as_deref(), Some("42"));
        assert_eq!(status.sitemap_channels, vec!["website".to_string()]);
    }
}
