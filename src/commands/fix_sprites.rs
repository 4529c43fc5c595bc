use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use super::{error_message, file_names, load_sprites};
use crate::{
    correlate::{
        apply_renames, plan_renames, retarget_sprite_texture, OwningBaseName, RenameReport,
    },
    dump::{write_dump, ListingOrder},
    fields,
};

#[derive(Debug, Clone)]
pub struct FixSpritesConfig {
    pub owning_dir: PathBuf,
    pub source_dir: PathBuf,
    pub order: ListingOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixSpritesReport {
    pub retargeted: usize,
    pub failed: usize,
    pub unreadable: usize,
    pub renames: RenameReport,
}

/// Rename the owning sprite dumps after their source counterparts and point
/// their render data at the source texture
pub fn fix_sprites(config: &FixSpritesConfig) -> Result<FixSpritesReport> {
    let mut report = FixSpritesReport::default();

    let source_sprites = load_sprites(&config.source_dir, config.order, &mut report.unreadable)?;
    let first = source_sprites
        .first()
        .ok_or_else(|| anyhow!("No source sprite dump found in {:?}", config.source_dir))?;
    let texture_path_id = fields::get(&first.document, &["m_RD", "texture", "m_PathID"])
        .with_context(|| format!("Failed to read texture path id from {}", first.file_name()))?
        .clone();
    info!("Using texture path id {texture_path_id} from {}", first.file_name());

    let mut owning_sprites =
        load_sprites(&config.owning_dir, config.order, &mut report.unreadable)?;

    for sprite in &mut owning_sprites {
        let result = retarget_sprite_texture(&mut sprite.document, &texture_path_id)
            .and_then(|_| write_dump(&sprite.path, &sprite.document));
        match result {
            Ok(()) => report.retargeted += 1,
            Err(e) => {
                warn!("Failed to retarget {}: {}", sprite.file_name(), error_message(&e));
                report.failed += 1;
            }
        }
    }
    info!("Fixed texture path id in {} dump file(s)", report.retargeted);

    let plan = plan_renames(
        file_names(&source_sprites),
        file_names(&owning_sprites),
        OwningBaseName::IdentitySuffix,
    );
    report.renames = apply_renames(&config.owning_dir, &plan);

    Ok(report)
}
