//! Sprite geometry as a texture slicer sees it.
//!
//! The geometry table is the hand-off format with the host editor: the
//! editor's slicing metadata is exported into it and [`crate::patch`] trusts
//! it over both dumps. [`metas_from_dumps`] goes the other way and rebuilds a
//! table from a dump folder.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dump::{Dump, DumpKind},
    error::{Error, Result},
    fields,
    patch::DuplicateNamer,
    render_data::AtlasMatch,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Reads `{x, y, width, height}`
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Rect {
            x: fields::get_f64(value, &["x"])?,
            y: fields::get_f64(value, &["y"])?,
            width: fields::get_f64(value, &["width"])?,
            height: fields::get_f64(value, &["height"])?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Vec2 {
            x: fields::get_f64(value, &["x"])?,
            y: fields::get_f64(value, &["y"])?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Vec4 {
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Vec4 {
            x: fields::get_f64(value, &["x"])?,
            y: fields::get_f64(value, &["y"])?,
            z: fields::get_f64(value, &["z"])?,
            w: fields::get_f64(value, &["w"])?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteMeta {
    pub name: String,
    pub rect: Rect,
    pub pivot: Vec2,
    #[serde(default)]
    pub border: Vec4,
}

impl SpriteMeta {
    /// Always derived from pivot and rect size, never read from a dump
    pub fn offset(&self) -> Vec2 {
        Vec2 {
            x: self.pivot.x * self.rect.width,
            y: self.pivot.y * self.rect.height,
        }
    }
}

/// Authoritative geometry, stored as a JSON list of [`SpriteMeta`]
#[derive(Debug, Clone, Default)]
pub struct GeometryTable {
    metas: Vec<SpriteMeta>,
    by_name: HashMap<String, usize>,
}

impl GeometryTable {
    pub fn new(metas: Vec<SpriteMeta>) -> Self {
        let mut by_name = HashMap::new();
        for (i, meta) in metas.iter().enumerate() {
            // First sprite of a name wins, like a lookup by name in the sheet
            by_name.entry(meta.name.clone()).or_insert(i);
        }
        GeometryTable { metas, by_name }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|e| Error::io(path, e))?;
        let metas: Vec<SpriteMeta> =
            serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(metas))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let f = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut f = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut f, &self.metas).map_err(|e| Error::io(path, e.into()))?;
        f.flush().map_err(|e| Error::io(path, e))
    }

    pub fn get(&self, name: &str) -> Option<&SpriteMeta> {
        self.by_name.get(name).map(|&i| &self.metas[i])
    }

    pub fn metas(&self) -> &[SpriteMeta] {
        &self.metas
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }
}

/// Atlas side of [`metas_from_dumps`]
pub struct AtlasSource<'a> {
    pub document: &'a Value,
    pub matched: &'a AtlasMatch,
    /// Only keep render data backed by this texture
    pub texture_path_id: Option<i64>,
}

/// Rebuild sprite metas from a folder of dumps.
///
/// Pivot and border always come from the sprite dump. The rect comes from the
/// atlas render data when an atlas is given, otherwise from the sprite's own
/// `m_Rect`.
pub fn metas_from_dumps<'a>(
    dumps: impl IntoIterator<Item = &'a Dump>,
    atlas: Option<&AtlasSource>,
) -> (Vec<SpriteMeta>, usize) {
    let mut namer = DuplicateNamer::default();
    let mut metas = vec![];
    let mut skipped = 0;

    for dump in dumps.into_iter().filter(|d| d.kind == DumpKind::Sprite) {
        let id = dump.identifier();
        let name = namer.assign(&id.name);

        match meta_from_dump(dump, &name, id.path_id, atlas) {
            Ok(Some(meta)) => {
                debug!("Loaded sprite {}", meta.name);
                metas.push(meta);
            }
            Ok(None) => skipped += 1,
            Err(e) => {
                warn!("Skipping {}: {e}", dump.file_name());
                skipped += 1;
            }
        }
    }

    (metas, skipped)
}

fn meta_from_dump(
    dump: &Dump,
    name: &str,
    path_id: i64,
    atlas: Option<&AtlasSource>,
) -> Result<Option<SpriteMeta>> {
    let sprite = &dump.document;
    let pivot = Vec2::from_value(fields::get(sprite, &["m_Pivot"])?)?;
    let border = Vec4::from_value(fields::get(sprite, &["m_Border"])?)?;

    let rect = match atlas {
        None => Rect::from_value(fields::get(sprite, &["m_Rect"])?)?,
        Some(atlas) => {
            let (_, position) = atlas.matched.locate(path_id)?;
            let position = position.to_string();
            let entry = fields::get(
                atlas.document,
                &["m_RenderDataMap", "Array", position.as_str()],
            )?;

            if let Some(texture_path_id) = atlas.texture_path_id {
                let entry_texture = fields::get_i64(entry, &["second", "texture", "m_PathID"])?;
                if entry_texture != texture_path_id {
                    debug!("{name} belongs to texture {entry_texture}, skipping");
                    return Ok(None);
                }
            }

            Rect::from_value(fields::get(entry, &["second", "textureRect"])?)?
        }
    };

    Ok(Some(SpriteMeta {
        name: name.to_string(),
        rect,
        pivot,
        border,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::render_data::tests::{key, key_json};

    pub(crate) fn meta(
        name: &str,
        rect: [f64; 4],
        pivot: [f64; 2],
        border: [f64; 4],
    ) -> SpriteMeta {
        SpriteMeta {
            name: name.to_string(),
            rect: Rect {
                x: rect[0],
                y: rect[1],
                width: rect[2],
                height: rect[3],
            },
            pivot: Vec2 {
                x: pivot[0],
                y: pivot[1],
            },
            border: Vec4 {
                x: border[0],
                y: border[1],
                z: border[2],
                w: border[3],
            },
        }
    }

    fn sprite(file_name: &str, seed: u32) -> Dump {
        Dump {
            path: PathBuf::from(file_name),
            kind: DumpKind::Sprite,
            document: json!({
                "m_Rect": {"x": 1, "y": 2, "width": 3, "height": 4},
                "m_Pivot": {"x": 0.5, "y": 0.25},
                "m_Border": {"x": 0, "y": 0, "z": 0, "w": 0},
                "m_RenderDataKey": key_json(&key(seed)),
            }),
        }
    }

    #[test]
    fn test_offset() {
        let m = meta("a", [0.0, 0.0, 32.0, 16.0], [0.5, 0.25], [0.0; 4]);

        assert_eq!(m.offset(), Vec2 { x: 16.0, y: 4.0 });
    }

    #[test]
    fn test_table_round_trip_and_first_name_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        let table = GeometryTable::new(vec![
            meta("Arm", [0.0, 0.0, 8.0, 8.0], [0.5, 0.5], [0.0; 4]),
            meta("Arm", [9.0, 9.0, 8.0, 8.0], [0.5, 0.5], [0.0; 4]),
        ]);

        table.save(&path).unwrap();
        let loaded = GeometryTable::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("Arm").unwrap().rect.x, 0.0);
        assert!(loaded.get("Leg").is_none());
    }

    #[test]
    fn test_border_defaults() {
        let metas: Vec<SpriteMeta> = serde_json::from_value(json!([{
            "name": "a",
            "rect": {"x": 0, "y": 0, "width": 1, "height": 1},
            "pivot": {"x": 0.5, "y": 0.5},
        }]))
        .unwrap();

        assert_eq!(metas[0].border, Vec4::default());
    }

    #[test]
    fn test_metas_without_atlas() {
        let dumps = [sprite("Arm-CAB-h-1.json", 1), sprite("Arm-CAB-h-2.json", 2)];

        let (metas, skipped) = metas_from_dumps(&dumps, None);

        assert_eq!(skipped, 0);
        let names = metas.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["Arm", "Arm #1"]);
        assert_eq!(
            metas[0].rect,
            Rect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: 4.0
            }
        );
        assert_eq!(metas[0].pivot, Vec2 { x: 0.5, y: 0.25 });
    }

    #[test]
    fn test_metas_from_atlas_with_texture_filter() {
        let atlas = json!({
            "m_PackedSprites": {"Array": [{"m_PathID": 1}, {"m_PathID": 2}]},
            "m_RenderDataMap": {"Array": [
                {"first": key_json(&key(2)), "second": {
                    "texture": {"m_PathID": 500},
                    "textureRect": {"x": 10, "y": 10, "width": 5, "height": 5},
                }},
                {"first": key_json(&key(1)), "second": {
                    "texture": {"m_PathID": 400},
                    "textureRect": {"x": 20, "y": 20, "width": 6, "height": 6},
                }},
            ]},
        });
        let dumps = [
            sprite("Arm-CAB-h-1.json", 1),
            sprite("Leg-CAB-h-2.json", 2),
            sprite("Eye-CAB-h-3.json", 3),
        ];
        let matched = AtlasMatch::build(&atlas, &dumps).unwrap();

        let source = AtlasSource {
            document: &atlas,
            matched: &matched,
            texture_path_id: None,
        };
        let (metas, skipped) = metas_from_dumps(&dumps, Some(&source));
        assert_eq!(skipped, 1);
        assert_eq!(
            metas[0].rect,
            Rect {
                x: 20.0,
                y: 20.0,
                width: 6.0,
                height: 6.0
            }
        );
        assert_eq!(
            metas[1].rect,
            Rect {
                x: 10.0,
                y: 10.0,
                width: 5.0,
                height: 5.0
            }
        );

        let source = AtlasSource {
            texture_path_id: Some(500),
            ..source
        };
        let (metas, skipped) = metas_from_dumps(&dumps, Some(&source));
        assert_eq!(skipped, 2);
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].name, "Leg");
    }
}
