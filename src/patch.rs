use std::collections::HashSet;

use serde_json::Value;

use crate::{
    error::Result,
    fields::{self, float},
    meta::{Rect, SpriteMeta, Vec2, Vec4},
};

/// Absolute tolerance used for every float comparison
pub const EPSILON: f64 = 1e-4;

pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Gives repeated sprite names a `" #<n>"` suffix, where `n` is the number of
/// sprites named before it in this run.
#[derive(Debug, Default)]
pub struct DuplicateNamer {
    seen: HashSet<String>,
    counter: usize,
}

impl DuplicateNamer {
    pub fn assign(&mut self, name: &str) -> String {
        let name = if self.seen.contains(name) {
            format!("{name} #{}", self.counter)
        } else {
            name.to_string()
        };
        self.counter += 1;
        self.seen.insert(name.clone());
        name
    }
}

/// Write authoritative geometry into a sprite dump and its atlas render data
/// entry. The rect goes into the atlas `textureRect`, pivot / border / offset
/// into the sprite.
///
/// Returns whether any pivot, border or rect value moved by more than [`EPSILON`].
pub fn merge_geometry(
    sprite: &mut Value,
    atlas_entry: &mut Value,
    meta: &SpriteMeta,
) -> Result<bool> {
    let pivot = Vec2::from_value(fields::get(sprite, &["m_Pivot"])?)?;
    let border = Vec4::from_value(fields::get(sprite, &["m_Border"])?)?;
    let rect = Rect::from_value(fields::get(atlas_entry, &["second", "textureRect"])?)?;
    // Read but not compared, fails early so nothing is half written
    Vec2::from_value(fields::get(sprite, &["m_Offset"])?)?;

    let changed = [
        (pivot.x, meta.pivot.x),
        (pivot.y, meta.pivot.y),
        (border.x, meta.border.x),
        (border.y, meta.border.y),
        (border.z, meta.border.z),
        (border.w, meta.border.w),
        (rect.x, meta.rect.x),
        (rect.y, meta.rect.y),
        (rect.width, meta.rect.width),
        (rect.height, meta.rect.height),
    ]
    .iter()
    .any(|&(old, new)| !is_close(old, new));

    fields::set(sprite, &["m_Pivot", "x"], float(meta.pivot.x))?;
    fields::set(sprite, &["m_Pivot", "y"], float(meta.pivot.y))?;
    fields::set(sprite, &["m_Border", "x"], float(meta.border.x))?;
    fields::set(sprite, &["m_Border", "y"], float(meta.border.y))?;
    fields::set(sprite, &["m_Border", "z"], float(meta.border.z))?;
    fields::set(sprite, &["m_Border", "w"], float(meta.border.w))?;

    fields::set(atlas_entry, &["second", "textureRect", "x"], float(meta.rect.x))?;
    fields::set(atlas_entry, &["second", "textureRect", "y"], float(meta.rect.y))?;
    fields::set(atlas_entry, &["second", "textureRect", "width"], float(meta.rect.width))?;
    fields::set(atlas_entry, &["second", "textureRect", "height"], float(meta.rect.height))?;

    let offset = meta.offset();
    fields::set(sprite, &["m_Offset", "x"], float(offset.x))?;
    fields::set(sprite, &["m_Offset", "y"], float(offset.y))?;

    Ok(changed)
}
