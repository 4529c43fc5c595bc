use std::{fmt, path::Path};

use anyhow::{Context, Result};
use iterators_extended::bucket::Bucket;
use tracing::warn;

use crate::{
    dump::{list_dumps, Dump, ListingOrder},
    VERBOSE,
};

pub mod fix_atlas;
pub mod fix_sprites;
pub mod list;
pub mod patch;
pub mod sheet;

/// Error text for a per-file failure, with the full chain when verbose
pub(crate) fn error_message<E: fmt::Debug + fmt::Display>(e: &E) -> String {
    if VERBOSE.get().copied().unwrap_or(false) {
        format!("{e:?}")
    } else {
        format!("{e}")
    }
}

/// Every readable dump of a folder in listing order. Unreadable files are
/// logged and counted, they never abort the command.
pub(crate) fn load_dumps(
    directory: &Path,
    order: ListingOrder,
    unreadable: &mut usize,
) -> Result<Vec<Dump>> {
    let (dumps, errors) = list_dumps(directory, order)
        .with_context(|| format!("Failed to list dumps in {:?}", directory))?
        .bucket_result();

    for (path, e) in &errors {
        warn!("Skipping {:?}: {}", path, error_message(e));
    }
    *unreadable += errors.len();

    Ok(dumps)
}

pub(crate) fn load_sprites(
    directory: &Path,
    order: ListingOrder,
    unreadable: &mut usize,
) -> Result<Vec<Dump>> {
    let mut dumps = load_dumps(directory, order, unreadable)?;
    dumps.retain(Dump::is_sprite);
    Ok(dumps)
}

pub(crate) fn file_names(dumps: &[Dump]) -> Vec<String> {
    dumps.iter().map(|d| d.file_name().to_string()).collect()
}
