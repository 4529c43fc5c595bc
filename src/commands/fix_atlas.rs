use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use super::{error_message, file_names, load_sprites};
use crate::{
    correlate::{
        apply_renames, plan_renames, propagate_atlas_identity, retarget_sprite_atlas,
        OwningBaseName, RenameReport,
    },
    dump::{load_document, locate_atlas, write_dump, ListingOrder},
    identifier::{project_id, CompositeIdentifier},
};

#[derive(Debug, Clone)]
pub struct FixAtlasConfig {
    /// The user's re-exported dumps, fixed in place
    pub owning_dir: PathBuf,
    /// Reference dumps the identity is copied from
    pub source_dir: PathBuf,
    pub source_atlas: Option<PathBuf>,
    pub owning_atlas: Option<PathBuf>,
    pub order: ListingOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixAtlasReport {
    pub retargeted: usize,
    pub failed: usize,
    pub unreadable: usize,
    pub renames: RenameReport,
}

/// Make the owning export point at the source atlas: copy the atlas identity
/// and texture reference, retarget every owning sprite at the source atlas and
/// rename the owning sprite dumps to their source names
pub fn fix_atlas(config: &FixAtlasConfig) -> Result<FixAtlasReport> {
    let source_atlas_path =
        locate_atlas(config.source_atlas.as_deref(), &config.source_dir, config.order)
            .context("Could not find source atlas dump")?;
    let owning_atlas_path =
        locate_atlas(config.owning_atlas.as_deref(), &config.owning_dir, config.order)
            .context("Could not find owning atlas dump")?;

    let source_atlas_id = CompositeIdentifier::from_path(&source_atlas_path)
        .context("Source atlas dump name does not carry a path id")?;
    if project_id(&source_atlas_path.to_string_lossy()).is_none() {
        warn!("{:?} is an invalid source atlas dump path", source_atlas_path);
    }

    let source_atlas =
        load_document(&source_atlas_path).context("Failed to load source atlas dump")?;
    let mut owning_atlas =
        load_document(&owning_atlas_path).context("Failed to load owning atlas dump")?;
    propagate_atlas_identity(&source_atlas, &mut owning_atlas)
        .context("Failed to copy atlas identity from source atlas")?;

    let mut report = FixAtlasReport::default();
    let source_sprites = load_sprites(&config.source_dir, config.order, &mut report.unreadable)?;
    let mut owning_sprites =
        load_sprites(&config.owning_dir, config.order, &mut report.unreadable)?;
    if owning_sprites.is_empty() {
        return Err(anyhow!("No sprite dumps found in {:?}", config.owning_dir));
    }

    // All inputs are in memory, start writing
    write_dump(&owning_atlas_path, &owning_atlas)
        .with_context(|| format!("Failed to write {:?}", owning_atlas_path))?;
    info!(
        "Copied packed sprites and render data texture from {:?} into {:?}",
        source_atlas_path, owning_atlas_path
    );

    for sprite in &mut owning_sprites {
        let result = retarget_sprite_atlas(&mut sprite.document, source_atlas_id.path_id)
            .and_then(|_| write_dump(&sprite.path, &sprite.document));
        match result {
            Ok(()) => report.retargeted += 1,
            Err(e) => {
                warn!("Failed to retarget {}: {}", sprite.file_name(), error_message(&e));
                report.failed += 1;
            }
        }
    }
    info!("Fixed sprite atlas path id in {} dump file(s)", report.retargeted);

    // Owning sprites come from a re-exported sheet and carry " #<n>" duplicate suffixes
    let plan = plan_renames(
        file_names(&source_sprites),
        file_names(&owning_sprites),
        OwningBaseName::DuplicateSuffix,
    );
    report.renames = apply_renames(&config.owning_dir, &plan);

    Ok(report)
}
