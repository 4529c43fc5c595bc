use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::load_dumps;
use crate::{
    dump::{load_document, locate_atlas, ListingOrder},
    meta::{metas_from_dumps, AtlasSource, GeometryTable},
    render_data::AtlasMatch,
};

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub source_dir: PathBuf,
    pub output: PathBuf,
    /// Read rects from this atlas. With `use_atlas` and no path, the atlas is
    /// looked up in `source_dir`.
    pub atlas: Option<PathBuf>,
    pub use_atlas: bool,
    pub texture_path_id: Option<i64>,
    pub order: ListingOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SheetReport {
    pub exported: usize,
    pub skipped: usize,
    pub unreadable: usize,
}

/// Rebuild a geometry table from a folder of sprite dumps
pub fn export_sheet(config: &SheetConfig) -> Result<SheetReport> {
    let atlas_path = if config.use_atlas || config.atlas.is_some() {
        Some(locate_atlas(
            config.atlas.as_deref(),
            &config.source_dir,
            config.order,
        )?)
    } else {
        None
    };
    let atlas = atlas_path
        .as_deref()
        .map(load_document)
        .transpose()
        .context("Failed to load source atlas dump")?;

    let mut report = SheetReport::default();
    let dumps = load_dumps(&config.source_dir, config.order, &mut report.unreadable)?;

    let matched = atlas
        .as_ref()
        .map(|atlas| AtlasMatch::build(atlas, dumps.iter().filter(|d| d.is_sprite())))
        .transpose()
        .context("Failed to index source atlas dump")?;

    let source = atlas.as_ref().zip(matched.as_ref()).map(|(document, matched)| AtlasSource {
        document,
        matched,
        texture_path_id: config.texture_path_id,
    });

    let (metas, skipped) = metas_from_dumps(&dumps, source.as_ref());
    report.exported = metas.len();
    report.skipped = skipped;

    GeometryTable::new(metas)
        .save(&config.output)
        .with_context(|| format!("Failed to write {:?}", config.output))?;

    info!(
        "Exported {} sprite(s) to {:?}, skipped {}, unreadable {}",
        report.exported, config.output, report.skipped, report.unreadable
    );
    Ok(report)
}
