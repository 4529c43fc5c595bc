//! Lining up an owning export with its source export.
//!
//! Files are paired by base name (the name without its identity suffix, and
//! for re-exported sheets also without the duplicate suffix), and the owning
//! file takes over the source file's full name. The atlas level
//! identity (packed sprite list, name table, texture reference) is copied
//! from the source atlas.

use std::{
    collections::{HashMap, VecDeque},
    fmt, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use regex::Regex;
use serde_json::Value;
use tracing::{error, info};

use crate::{
    error::{Error, Result},
    fields,
    identifier::CAB_MARKER,
};

fn stem(file_name: &str) -> &str {
    file_name.strip_suffix(".json").unwrap_or(file_name)
}

/// Everything before the last match of `re`, or the whole input
fn cut_at_last<'a>(input: &'a str, re: &Regex) -> &'a str {
    match re.find_iter(input).last() {
        Some(m) => &input[..m.start()],
        None => input,
    }
}

/// File name with its identity suffix (from the last `-CAB-`) removed
pub fn base_name(file_name: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"-CAB-").expect("valid regex"));

    cut_at_last(stem(file_name), re)
}

/// Sprite name (before the first `-CAB-`) with its last `" #<n>"` duplicate
/// suffix removed, so `Arm #1-CAB-g-6.json` pairs with a source `Arm`
pub fn base_name_without_duplicate_suffix(file_name: &str) -> &str {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r" #").expect("valid regex"));

    let name = match stem(file_name).split_once(CAB_MARKER) {
        Some((name, _)) => name,
        None => stem(file_name),
    };
    cut_at_last(name, re)
}

/// How owning file names are reduced to the base name they are paired on.
/// Source names always use [`base_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwningBaseName {
    /// Same as the source side
    IdentitySuffix,
    /// Also drop the duplicate suffix of re-exported sheet sprites
    DuplicateSuffix,
}

impl OwningBaseName {
    pub fn apply(self, file_name: &str) -> &str {
        match self {
            OwningBaseName::IdentitySuffix => base_name(file_name),
            OwningBaseName::DuplicateSuffix => base_name_without_duplicate_suffix(file_name),
        }
    }
}

/// Source file names queued per base name, in enumeration order
#[derive(Debug, Default)]
pub struct SourceQueues {
    queues: HashMap<String, VecDeque<String>>,
}

impl SourceQueues {
    pub fn from_names<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Self {
        let mut queues = HashMap::<_, VecDeque<_>>::new();
        for name in names {
            let name = name.as_ref();
            queues
                .entry(base_name(name).to_string())
                .or_default()
                .push_back(name.to_string());
        }
        SourceQueues { queues }
    }

    /// Next unused source name for this base name
    pub fn pop(&mut self, base_name: &str) -> Option<String> {
        self.queues.get_mut(base_name)?.pop_front()
    }

    pub fn contains(&self, base_name: &str) -> bool {
        self.queues.contains_key(base_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub renames: Vec<Rename>,
    /// Owning files with no source counterpart left
    pub unmatched: Vec<String>,
}

/// Pair each owning file with the next source file of the same base name
pub fn plan_renames<S: AsRef<str>, O: AsRef<str>>(
    source_names: impl IntoIterator<Item = S>,
    owning_names: impl IntoIterator<Item = O>,
    owning_base_name: OwningBaseName,
) -> RenamePlan {
    let mut queues = SourceQueues::from_names(source_names);
    let mut plan = RenamePlan::default();

    for owning in owning_names {
        let owning = owning.as_ref();
        let base = owning_base_name.apply(owning);
        match queues.pop(base) {
            Some(to) => plan.renames.push(Rename {
                from: owning.to_string(),
                to,
            }),
            None => {
                error!("Failed to process {owning}: no source dump named {base:?}");
                plan.unmatched.push(owning.to_string());
            }
        }
    }

    plan
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: usize,
    pub errors: usize,
}

impl fmt::Display for RenameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "renamed {}, {} error(s)", self.renamed, self.errors)
    }
}

/// Carry out a plan inside `directory`. Unmatched files count as errors. A
/// rename onto an existing file is refused for that file only.
pub fn apply_renames(directory: &Path, plan: &RenamePlan) -> RenameReport {
    let mut report = RenameReport {
        renamed: 0,
        errors: plan.unmatched.len(),
    };

    for rename in &plan.renames {
        match rename_file(directory, rename) {
            Ok(()) => report.renamed += 1,
            Err(e) => {
                error!("Failed to rename {} to {}: {e}", rename.from, rename.to);
                report.errors += 1;
            }
        }
    }

    info!("Fixed names in {directory:?}: {report}");
    report
}

fn rename_file(directory: &Path, rename: &Rename) -> Result<()> {
    if rename.from == rename.to {
        return Ok(());
    }

    let from: PathBuf = directory.join(&rename.from);
    let to = directory.join(&rename.to);
    if to.exists() {
        return Err(Error::io(
            &to,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target already exists"),
        ));
    }

    fs::rename(&from, &to).map_err(|e| Error::io(&from, e))
}

/// Copy `m_PackedSprites` and `m_PackedSpriteNamesToIndex` from the source
/// atlas, then point every render data entry at the source texture
pub fn propagate_atlas_identity(source: &Value, owning: &mut Value) -> Result<()> {
    let texture_path_id = source_texture_path_id(source)?;

    for field in ["m_PackedSprites", "m_PackedSpriteNamesToIndex"] {
        let value = fields::get(source, &[field])?.clone();
        fields::set(owning, &[field], value)?;
    }

    replace_texture_path_ids(owning, &texture_path_id)
}

/// Texture path id of the first render data entry. Every entry of one atlas is
/// assumed to sit on the same texture.
pub fn source_texture_path_id(atlas: &Value) -> Result<Value> {
    let entries = fields::get_array(atlas, &["m_RenderDataMap", "Array"])?;
    let first = entries.first().ok_or_else(|| {
        Error::Precondition("Source atlas has an empty render data map".to_string())
    })?;

    Ok(fields::get(first, &["second", "texture", "m_PathID"])?.clone())
}

pub fn replace_texture_path_ids(atlas: &mut Value, texture_path_id: &Value) -> Result<()> {
    let entries = fields::get_mut(atlas, &["m_RenderDataMap", "Array"])?
        .as_array_mut()
        .ok_or_else(|| Error::field("m_RenderDataMap.Array"))?;

    for entry in entries {
        fields::set(entry, &["second", "texture", "m_PathID"], texture_path_id.clone())?;
    }

    Ok(())
}

/// Point a sprite dump at the source atlas
pub fn retarget_sprite_atlas(sprite: &mut Value, atlas_path_id: i64) -> Result<()> {
    fields::set(sprite, &["m_SpriteAtlas", "m_PathID"], Value::from(atlas_path_id))
}

/// Point a sprite dump's render data at the source texture
pub fn retarget_sprite_texture(sprite: &mut Value, texture_path_id: &Value) -> Result<()> {
    fields::set(sprite, &["m_RD", "texture", "m_PathID"], texture_path_id.clone())
}
