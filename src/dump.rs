use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use glob::Pattern;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{Error, Result},
    identifier::CompositeIdentifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Sprite,
    Atlas,
    Other,
}

impl DumpKind {
    /// Sprites are recognised by `m_Rect`, atlases by `m_PackedSprites`
    pub fn classify(document: &Value) -> Self {
        if is_sprite_dump(document) {
            DumpKind::Sprite
        } else if is_atlas_dump(document) {
            DumpKind::Atlas
        } else {
            DumpKind::Other
        }
    }
}

pub fn is_sprite_dump(document: &Value) -> bool {
    document.get("m_Rect").is_some()
}

pub fn is_atlas_dump(document: &Value) -> bool {
    document.get("m_PackedSprites").is_some()
}

/// Order in which a dump folder is enumerated.
///
/// Duplicate name suffixes and base name correlation pair files up by
/// enumeration position, so the order is part of the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ListingOrder {
    /// Whatever the OS directory listing yields
    #[default]
    FileSystem,
    /// Sorted by file name
    FileName,
}

#[derive(Debug, Clone)]
pub struct Dump {
    pub path: PathBuf,
    pub kind: DumpKind,
    pub document: Value,
}

impl Dump {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or_default()
    }

    pub fn is_sprite(&self) -> bool {
        self.kind == DumpKind::Sprite
    }

    /// Identifier parsed from the file name, falling back to the sentinel path id
    pub fn identifier(&self) -> CompositeIdentifier {
        CompositeIdentifier::from_path_or_sentinel(&self.path)
    }
}

/// Paths of the top level `*.json` files in a folder
pub fn list_json_files(directory: &Path, order: ListingOrder) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new("*.json").expect("valid glob");

    let entries = fs::read_dir(directory).map_err(|e| {
        Error::Precondition(format!("Failed to list dump folder {directory:?}: {e}"))
    })?;

    let mut paths = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| pattern.matches(f))
        })
        .collect::<Vec<_>>();

    if order == ListingOrder::FileName {
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(paths)
}

/// Lazily load and classify every dump in a folder. Each file is parsed as it
/// is reached; failures are yielded alongside the path so the caller can skip them.
pub fn list_dumps(
    directory: &Path,
    order: ListingOrder,
) -> Result<impl Iterator<Item = std::result::Result<Dump, (PathBuf, Error)>>> {
    let paths = list_json_files(directory, order)?;

    Ok(paths.into_iter().map(|path| match load_dump(&path) {
        Ok(dump) => Ok(dump),
        Err(e) => Err((path, e)),
    }))
}

pub fn load_document(path: &Path) -> Result<Value> {
    let f = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(BufReader::new(f)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_dump(path: &Path) -> Result<Dump> {
    let document = load_document(path)?;
    let kind = DumpKind::classify(&document);
    debug!("Loaded {:?} as {:?}", path, kind);

    Ok(Dump {
        path: path.to_path_buf(),
        kind,
        document,
    })
}

/// Write a document indented, keeping its field order
pub fn write_dump(path: &Path, document: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let f = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut f = BufWriter::new(f);

    serde_json::to_writer_pretty(&mut f, document).map_err(|e| Error::io(path, e.into()))?;
    f.flush().map_err(|e| Error::io(path, e))
}

/// First atlas dump in a folder, in listing order
pub fn find_atlas(directory: &Path, order: ListingOrder) -> Result<Option<PathBuf>> {
    let found = list_dumps(directory, order)?
        .filter_map(|d| d.ok())
        .find(|d| d.kind == DumpKind::Atlas)
        .map(|d| d.path);

    Ok(found)
}

/// Use the explicit atlas path if given, otherwise look for one in the folder
pub fn locate_atlas(
    explicit: Option<&Path>,
    directory: &Path,
    order: ListingOrder,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::Precondition(format!(
                "Atlas dump {path:?} does not exist"
            )));
        }
        return Ok(path.to_path_buf());
    }

    find_atlas(directory, order)?.ok_or_else(|| {
        Error::Precondition(format!(
            "Could not find an atlas dump in {directory:?}, please pass one explicitly"
        ))
    })
}
