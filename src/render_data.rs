//! Matching sprites to their entries in an atlas render data map.
//!
//! A sprite dump carries the key of its own render data, the atlas stores the
//! same keys in `m_RenderDataMap` in its own order. Keys are compared field by
//! field, there is no partial match.

use std::{collections::HashMap, fmt};

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    dump::Dump,
    error::{Error, Result},
    fields, key_index,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderDataKey {
    pub data0: u32,
    pub data1: u32,
    pub data2: u32,
    pub data3: u32,
    pub second: i64,
}

impl RenderDataKey {
    /// Read a key laid out as `{"first": {"data[0]": .., ..}, "second": ..}`
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(RenderDataKey {
            data0: fields::get_u32(value, &["first", "data[0]"])?,
            data1: fields::get_u32(value, &["first", "data[1]"])?,
            data2: fields::get_u32(value, &["first", "data[2]"])?,
            data3: fields::get_u32(value, &["first", "data[3]"])?,
            second: fields::get_i64(value, &["second"])?,
        })
    }

    /// The key a sprite dump reports for itself
    pub fn from_sprite(sprite: &Value) -> Result<Self> {
        Self::from_value(fields::get(sprite, &["m_RenderDataKey"])?)
    }
}

impl fmt::Display for RenderDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"first\"[{}, {}, {}, {}], \"second\": {}",
            self.data0, self.data1, self.data2, self.data3, self.second
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ExtractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}, failed {}, total {}",
            self.processed, self.failed, self.total
        )
    }
}

/// Atlas index -> render data key, for every sprite whose path id is packed in the atlas
pub fn extract_sprite_keys<'a>(
    sprites: impl IntoIterator<Item = &'a Dump>,
    path_id_to_index: &HashMap<i64, usize>,
) -> (HashMap<usize, RenderDataKey>, ExtractReport) {
    let mut keys = HashMap::new();
    let mut report = ExtractReport::default();

    for sprite in sprites {
        report.total += 1;

        let id = sprite.identifier();
        let Some(&index) = path_id_to_index.get(&id.path_id) else {
            let miss = Error::LookupMiss(format!("Path ID {} not found in atlas", id.path_id));
            warn!("{}: {miss}", sprite.file_name());
            report.failed += 1;
            continue;
        };

        match RenderDataKey::from_sprite(&sprite.document) {
            Ok(key) => {
                keys.insert(index, key);
                report.processed += 1;
            }
            Err(e) => {
                warn!("{}: {e}", sprite.file_name());
                report.failed += 1;
            }
        }
    }

    info!("Render data keys from sprite dumps: {report}");
    (keys, report)
}

/// Keys of the atlas render data map, in stored order
pub fn extract_atlas_keys(atlas: &Value) -> Result<Vec<RenderDataKey>> {
    fields::get_array(atlas, &["m_RenderDataMap", "Array"])?
        .iter()
        .map(|entry| RenderDataKey::from_value(fields::get(entry, &["first"])?))
        .collect()
}

/// Position in `atlas_keys` of the sprite at `index`. Linear scan, the first
/// equal key wins if the atlas holds duplicates.
pub fn resolve(
    index: usize,
    sprite_keys: &HashMap<usize, RenderDataKey>,
    atlas_keys: &[RenderDataKey],
) -> Option<usize> {
    let key = sprite_keys.get(&index)?;
    atlas_keys.iter().position(|k| k == key)
}

pub fn resolve_all(
    sprite_keys: &HashMap<usize, RenderDataKey>,
    atlas_keys: &[RenderDataKey],
) -> HashMap<usize, Option<usize>> {
    sprite_keys
        .keys()
        .map(|&index| (index, resolve(index, sprite_keys, atlas_keys)))
        .collect()
}

/// Everything needed to go from a sprite path id to its atlas render data entry
#[derive(Debug, Clone)]
pub struct AtlasMatch {
    pub path_id_to_index: HashMap<i64, usize>,
    /// Atlas index -> position in `m_RenderDataMap.Array`
    pub resolved: HashMap<usize, Option<usize>>,
    pub report: ExtractReport,
}

impl AtlasMatch {
    pub fn build<'a>(atlas: &Value, sprites: impl IntoIterator<Item = &'a Dump>) -> Result<Self> {
        let path_id_to_index = key_index::build_path_id_to_index(atlas)?;
        let atlas_keys = extract_atlas_keys(atlas)?;
        let (sprite_keys, report) = extract_sprite_keys(sprites, &path_id_to_index);
        let resolved = resolve_all(&sprite_keys, &atlas_keys);

        Ok(AtlasMatch {
            path_id_to_index,
            resolved,
            report,
        })
    }

    /// `(atlas index, render data position)` of a sprite
    pub fn locate(&self, path_id: i64) -> Result<(usize, usize)> {
        let &index = self.path_id_to_index.get(&path_id).ok_or_else(|| {
            Error::LookupMiss(format!("Path ID {path_id} not found in atlas packed sprites"))
        })?;

        match self.resolved.get(&index) {
            Some(Some(position)) => Ok((index, *position)),
            _ => Err(Error::LookupMiss(format!(
                "Sprite with path ID {path_id} is not present in target atlas"
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::dump::DumpKind;

    pub(crate) fn key(seed: u32) -> RenderDataKey {
        RenderDataKey {
            data0: seed,
            data1: seed + 1,
            data2: seed + 2,
            data3: seed + 3,
            second: 21300000,
        }
    }

    pub(crate) fn key_json(key: &RenderDataKey) -> Value {
        json!({
            "first": {
                "data[0]": key.data0,
                "data[1]": key.data1,
                "data[2]": key.data2,
                "data[3]": key.data3,
            },
            "second": key.second,
        })
    }

    fn sprite(file_name: &str, key: &RenderDataKey) -> Dump {
        Dump {
            path: PathBuf::from(file_name),
            kind: DumpKind::Sprite,
            document: json!({"m_Rect": {}, "m_RenderDataKey": key_json(key)}),
        }
    }

    #[test]
    fn test_key_from_sprite() {
        let doc = json!({"m_RenderDataKey": {
            "first": {"data[0]": "1", "data[1]": 2, "data[2]": 3, "data[3]": 4294967295u32},
            "second": -7,
        }});

        let key = RenderDataKey::from_sprite(&doc).unwrap();

        assert_eq!(
            key,
            RenderDataKey {
                data0: 1,
                data1: 2,
                data2: 3,
                data3: u32::MAX,
                second: -7
            }
        );
    }

    #[test]
    fn test_extract_sprite_keys_counts_misses() {
        let sprites = [
            sprite("A-CAB-h-10.json", &key(1)),
            sprite("B-CAB-h-20.json", &key(2)),
            sprite("C-CAB-h-99.json", &key(3)),
        ];
        let path_id_to_index = HashMap::from([(10, 0), (20, 1)]);

        let (keys, report) = extract_sprite_keys(&sprites, &path_id_to_index);

        assert_eq!(keys, HashMap::from([(0, key(1)), (1, key(2))]));
        assert_eq!(
            report,
            ExtractReport {
                processed: 2,
                failed: 1,
                total: 3
            }
        );
        assert_eq!(report.to_string(), "processed 2, failed 1, total 3");
    }

    #[test]
    fn test_extract_atlas_keys_in_order() {
        let atlas = json!({"m_RenderDataMap": {"Array": [
            {"first": key_json(&key(5)), "second": {}},
            {"first": key_json(&key(1)), "second": {}},
        ]}});

        assert_eq!(extract_atlas_keys(&atlas).unwrap(), vec![key(5), key(1)]);
    }

    #[test]
    fn test_resolve_missing() {
        let sprite_keys = HashMap::from([(0, key(1))]);
        let atlas_keys = [key(2), key(3)];

        assert_eq!(resolve(0, &sprite_keys, &atlas_keys), None);
        // no sprite key for this index at all
        assert_eq!(resolve(4, &sprite_keys, &atlas_keys), None);
    }

    #[test]
    fn test_resolve_first_match() {
        let sprite_keys = HashMap::from([(0, key(1)), (1, key(2))]);
        let atlas_keys = [key(2), key(1), key(7), key(1)];

        assert_eq!(resolve(0, &sprite_keys, &atlas_keys), Some(1));
        assert_eq!(
            resolve_all(&sprite_keys, &atlas_keys),
            HashMap::from([(0, Some(1)), (1, Some(0))])
        );
    }

    #[test]
    fn test_atlas_match_locate() {
        let atlas = json!({
            "m_PackedSprites": {"Array": [{"m_PathID": 10}, {"m_PathID": 20}, {"m_PathID": 30}]},
            "m_RenderDataMap": {"Array": [
                {"first": key_json(&key(2)), "second": {}},
                {"first": key_json(&key(1)), "second": {}},
            ]},
        });
        let sprites = [
            sprite("A-CAB-h-10.json", &key(1)),
            sprite("B-CAB-h-20.json", &key(2)),
            sprite("C-CAB-h-30.json", &key(9)),
        ];

        let matched = AtlasMatch::build(&atlas, &sprites).unwrap();

        assert_eq!(matched.locate(10).unwrap(), (0, 1));
        assert_eq!(matched.locate(20).unwrap(), (1, 0));
        assert!(matches!(matched.locate(30), Err(Error::LookupMiss(..))));
        assert!(matches!(matched.locate(40), Err(Error::LookupMiss(..))));
        assert_eq!(matched.report.processed, 3);
    }

    #[test]
    fn test_resolve_requires_all_fields() {
        let mut near = key(1);
        near.second += 1;
        let sprite_keys = HashMap::from([(0, key(1))]);

        assert_eq!(resolve(0, &sprite_keys, &[near]), None);
    }
}
