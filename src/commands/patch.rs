use std::{fmt, fs, path::PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::{error_message, load_sprites};
use crate::{
    dump::{load_document, locate_atlas, write_dump, ListingOrder},
    fields,
    meta::GeometryTable,
    patch::{merge_geometry, DuplicateNamer},
    render_data::AtlasMatch,
};

#[derive(Debug, Clone)]
pub struct PatchConfig {
    /// Reference dumps to patch, left untouched on disk
    pub source_dir: PathBuf,
    /// Authoritative geometry table
    pub geometry: PathBuf,
    /// Changed dumps are written here under their original names
    pub output_dir: PathBuf,
    /// Source atlas dump, looked up in `source_dir` when not given
    pub atlas: Option<PathBuf>,
    /// Delete the files already in `output_dir` first
    pub clean_output: bool,
    pub order: ListingOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub written: usize,
    pub unchanged: usize,
    /// Sprites the geometry table has no entry for
    pub no_meta: usize,
    /// Path id or render data key not found in the atlas
    pub missed: usize,
    pub failed: usize,
    pub unreadable: usize,
    pub atlas_written: bool,
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "written {}, unchanged {}, not in geometry table {}, not in atlas {}, failed {}, \
             unreadable {}, atlas written: {}",
            self.written,
            self.unchanged,
            self.no_meta,
            self.missed,
            self.failed,
            self.unreadable,
            self.atlas_written
        )
    }
}

fn clean_output_dir(config: &PatchConfig) -> Result<()> {
    if !config.output_dir.exists() {
        return Ok(());
    }

    let mut removed = 0;
    for entry in fs::read_dir(&config.output_dir).context("Failed to list output folder")? {
        let path = entry.context("Failed to list output folder")?.path();
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            removed += 1;
        }
    }
    info!("Removed {removed} file(s) from {:?}", config.output_dir);

    Ok(())
}

/// Apply the geometry table to the source sprite dumps and atlas, writing the
/// changed documents to the output folder
pub fn patch_dumps(config: &PatchConfig) -> Result<PatchReport> {
    // Everything that can abort the run happens before the first write
    let atlas_path = locate_atlas(config.atlas.as_deref(), &config.source_dir, config.order)?;
    let mut atlas = load_document(&atlas_path).context("Failed to load source atlas dump")?;
    let table = GeometryTable::load(&config.geometry).context("Failed to load geometry table")?;
    info!("Loaded {} sprite(s) from the geometry table", table.len());

    let mut report = PatchReport::default();
    let mut sprites = load_sprites(&config.source_dir, config.order, &mut report.unreadable)?;

    let matched =
        AtlasMatch::build(&atlas, &sprites).context("Failed to index source atlas dump")?;

    let atlas_file_name = atlas_path
        .file_name()
        .context("Atlas path has no file name")?;
    let atlas_out_path = config.output_dir.join(atlas_file_name);

    if config.clean_output {
        clean_output_dir(config)?;
    }
    fs::create_dir_all(&config.output_dir).context("Failed to create output folder")?;

    // Set as soon as the in-memory atlas is modified, whether or not the
    // sprite dump itself could be written
    let mut any_changed = false;
    let mut namer = DuplicateNamer::default();
    for sprite in &mut sprites {
        let id = sprite.identifier();
        let name = namer.assign(&id.name);

        let Some(meta) = table.get(&name) else {
            debug!("{name} is not in the geometry table");
            report.no_meta += 1;
            continue;
        };

        let (index, position) = match matched.locate(id.path_id) {
            Ok(found) => found,
            Err(e) => {
                warn!("Skipping {name}: {}", error_message(&e));
                report.missed += 1;
                continue;
            }
        };

        let position_key = position.to_string();
        let merged = fields::get_mut(
            &mut atlas,
            &["m_RenderDataMap", "Array", position_key.as_str()],
        )
        .and_then(|entry| merge_geometry(&mut sprite.document, entry, meta));

        match merged {
            Ok(true) => {
                any_changed = true;
                let out_path = config.output_dir.join(sprite.file_name());
                match write_dump(&out_path, &sprite.document) {
                    Ok(()) => {
                        info!(
                            "Modified {name}, {}, atlas index: {index}, \
                             render data index: {position}",
                            id.path_id
                        );
                        report.written += 1;
                    }
                    Err(e) => {
                        warn!("Failed to write {:?}: {}", out_path, error_message(&e));
                        report.failed += 1;
                    }
                }
            }
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                warn!("Failed to patch {name}: {}", error_message(&e));
                report.failed += 1;
            }
        }
    }

    if any_changed {
        match write_dump(&atlas_out_path, &atlas) {
            Ok(()) => report.atlas_written = true,
            Err(e) => {
                error!("Failed to write {:?}: {}", atlas_out_path, error_message(&e));
                report.failed += 1;
            }
        }
    } else {
        info!("Did not modify anything.");
    }

    info!("Patch finished: {report}");
    Ok(report)
}
