//! Rewriting of references embedded in content item fields.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::mapper::{NameKey, ReferenceMapper};
use crate::model::content::{
    CONTENT_ID_KEY, GALLERY_ID_KEY, SORT_IDS_KEY, URL_KEY, format_sort_ids, parse_sort_ids,
};

/// Dropped content references, by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DroppedRefs {
    pub not_on_source: usize,
    pub not_on_destination: usize,
}

/// Translates source-instance references in field values to the target.
///
/// - content links and linked lists: mapped ids; misses are dropped
/// - gallery links: mapped id; a miss clears the link
/// - asset URLs: target URL of the same file; a miss keeps the source URL
pub(crate) struct FieldRewriter<'a> {
    mapper: &'a ReferenceMapper,
    /// Content ids present in the local snapshot.
    local_content: &'a HashSet<i64>,
    /// Source asset URL → asset natural key.
    asset_keys: &'a HashMap<String, NameKey>,
}

impl<'a> FieldRewriter<'a> {
    pub fn new(
        mapper: &'a ReferenceMapper,
        local_content: &'a HashSet<i64>,
        asset_keys: &'a HashMap<String, NameKey>,
    ) -> Self {
        Self {
            mapper,
            local_content,
            asset_keys,
        }
    }

    pub fn rewrite(&self, fields: &Map<String, Value>) -> (Map<String, Value>, DroppedRefs) {
        let mut dropped = DroppedRefs::default();
        let rewritten = fields
            .iter()
            .filter_map(|(name, value)| {
                self.rewrite_value(value, &mut dropped)
                    .map(|v| (name.clone(), v))
            })
            .collect();
        (rewritten, dropped)
    }

    fn content_id(&self, id: i64, dropped: &mut DroppedRefs) -> Option<i64> {
        if let Some(target) = self.mapper.content_items.target_id_for(id) {
            return Some(target);
        }
        if self.local_content.contains(&id) {
            dropped.not_on_destination += 1;
        } else {
            dropped.not_on_source += 1;
        }
        None
    }

    /// `None` drops the value from its parent field or list.
    fn rewrite_value(&self, value: &Value, dropped: &mut DroppedRefs) -> Option<Value> {
        match value {
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .filter_map(|v| self.rewrite_value(v, dropped))
                    .collect(),
            )),
            Value::Object(obj) => self.rewrite_object(obj, dropped).map(Value::Object),
            other => Some(other.clone()),
        }
    }

    fn rewrite_object(
        &self,
        obj: &Map<String, Value>,
        dropped: &mut DroppedRefs,
    ) -> Option<Map<String, Value>> {
        let mut out = obj.clone();

        if let Some(id) = obj.get(CONTENT_ID_KEY).and_then(Value::as_i64) {
            let target = self.content_id(id, dropped)?;
            out.insert(CONTENT_ID_KEY.to_string(), Value::from(target));
        }

        if let Some(raw) = obj.get(SORT_IDS_KEY).and_then(Value::as_str) {
            let ids: Vec<i64> = parse_sort_ids(raw)
                .into_iter()
                .filter_map(|id| self.content_id(id, dropped))
                .collect();
            out.insert(SORT_IDS_KEY.to_string(), Value::from(format_sort_ids(&ids)));
        }

        if let Some(id) = obj.get(GALLERY_ID_KEY).and_then(Value::as_i64) {
            match self.mapper.galleries.target_id_for(id) {
                Some(target) => {
                    out.insert(GALLERY_ID_KEY.to_string(), Value::from(target));
                }
                None => {
                    out.remove(GALLERY_ID_KEY);
                }
            }
        }

        if let Some(url) = obj.get(URL_KEY).and_then(Value::as_str) {
            let target_url = self
                .asset_keys
                .get(url)
                .and_then(|key| self.mapper.assets.get_mapping(key).target)
                .map(|asset| asset.url.clone());
            if let Some(target_url) = target_url {
                out.insert(URL_KEY.to_string(), Value::from(target_url));
            }
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{Side, SourceId};
    use crate::model::{Asset, ContentItem, Gallery, ItemState};
    use serde_json::json;

    fn mapper() -> ReferenceMapper {
        let mut mapper = ReferenceMapper::new();
        let item = ContentItem {
            id: 1,
            container_reference_name: "posts".into(),
            model_id: 1,
            state: ItemState::Published,
            fields: Map::new(),
        };
        mapper.content_items.add_record(Side::Source, item.clone());
        mapper
            .content_items
            .resolve(&SourceId(1), ContentItem { id: 901, ..item });

        let gallery = Gallery {
            id: 3,
            name: "Heroes".into(),
            description: None,
            asset_ids: vec![],
        };
        mapper.galleries.add_record(Side::Source, gallery.clone());
        mapper
            .galleries
            .add_record(Side::Target, Gallery { id: 903, ..gallery });

        let asset = Asset {
            id: 4,
            url: "https://cdn/a/logo.png".into(),
            file_name: "logo.png".into(),
            gallery_id: None,
            size: 0,
        };
        mapper.assets.add_record(Side::Source, asset.clone());
        mapper.assets.add_record(
            Side::Target,
            Asset {
                id: 904,
                url: "https://cdn/b/logo.png".into(),
                ..asset
            },
        );
        mapper
    }

    #[test]
    fn test_rewrites_every_reference_shape() {
        let mapper = mapper();
        let local: HashSet<i64> = [1, 2].into_iter().collect();
        let assets: HashMap<String, NameKey> = [(
            "https://cdn/a/logo.png".to_string(),
            NameKey::new("logo.png"),
        )]
        .into_iter()
        .collect();
        let rewriter = FieldRewriter::new(&mapper, &local, &assets);

        let fields = json!({
            "title": "Hello",
            "author": {"contentid": 1},
            "editor": {"contentid": 2},
            "related": {"referencename": "posts", "sortids": "1,2,7"},
            "cards": [{"contentid": 1}, {"contentid": 7}],
            "gallery": {"galleryid": 3},
            "oldGallery": {"galleryid": 99},
            "image": {"url": "https://cdn/a/logo.png", "label": "Logo"},
            "external": {"url": "https://elsewhere/x.png"}
        });
        let (out, dropped) = rewriter.rewrite(fields.as_object().unwrap());

        assert_eq!(out["title"], "Hello");
        assert_eq!(out["author"]["contentid"], 901);
        assert!(!out.contains_key("editor"));
        assert_eq!(out["related"]["sortids"], "901");
        assert_eq!(out["cards"], json!([{"contentid": 901}]));
        assert_eq!(out["gallery"]["galleryid"], 903);
        assert!(out["oldGallery"].get("galleryid").is_none());
        assert_eq!(out["image"]["url"], "https://cdn/b/logo.png");
        assert_eq!(out["image"]["label"], "Logo");
        assert_eq!(out["external"]["url"], "https://elsewhere/x.png");

        // editor(2) and sortids 2 are local-only; 7 twice is unknown.
        assert_eq!(dropped.not_on_destination, 2);
        assert_eq!(dropped.not_on_source, 2);
    }
}
