use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use sprite_dump_tools::{
    commands::{
        fix_atlas::{fix_atlas, FixAtlasConfig},
        fix_sprites::{fix_sprites, FixSpritesConfig},
        list::list_dumps_in,
        patch::{patch_dumps, PatchConfig},
        sheet::{export_sheet, SheetConfig},
    },
    dump::ListingOrder,
    VERBOSE,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Subcommand)]
enum Command {
    /// List the dumps in a folder with their kind and identifier
    List {
        folder: PathBuf,
        /// Glob patterns to filter the file names
        #[clap(default_value = "*.json")]
        #[arg(num_args = 1..)]
        globs: Vec<Pattern>,
    },
    /// Export a geometry table from a folder of sprite dumps
    Sheet {
        source_folder: PathBuf,
        /// Path to write the geometry table to
        output: PathBuf,
        /// Read rects from the atlas render data instead of the sprites
        #[arg(long, default_value_t = false)]
        use_atlas: bool,
        /// Atlas dump to read rects from, implies --use-atlas
        #[arg(long)]
        atlas: Option<PathBuf>,
        /// Only export sprites whose render data sits on this texture
        #[arg(long, allow_negative_numbers = true)]
        texture_path_id: Option<i64>,
    },
    /// Apply a geometry table to the source dumps, writing changed dumps to a folder
    Patch {
        source_folder: PathBuf,
        /// Geometry table, as written by `sheet`
        geometry: PathBuf,
        output_folder: PathBuf,
        /// Source atlas dump, found in the source folder when omitted
        #[arg(long)]
        atlas: Option<PathBuf>,
        /// Delete the files in the output folder first
        #[arg(long, default_value_t = false)]
        clean: bool,
    },
    /// Point an owning export at the source atlas and rename its sprite dumps
    FixAtlas {
        owning_folder: PathBuf,
        source_folder: PathBuf,
        #[arg(long)]
        source_atlas: Option<PathBuf>,
        #[arg(long)]
        owning_atlas: Option<PathBuf>,
    },
    /// Rename an owning export's sprite dumps and point them at the source texture
    FixSprites {
        owning_folder: PathBuf,
        source_folder: PathBuf,
    },
}

/// Reconciles Unity sprite and sprite atlas JSON dumps between two exports of
/// the same asset. Progress is logged to stderr.
#[derive(Parser, Debug)]
#[command(name = "sprite_dumps")]
#[clap(version)]
struct Cli {
    /// Verbose logging and printing of non-fatal error messages
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Order in which dump folders are enumerated
    #[arg(long, value_enum, default_value_t = ListingOrder::FileSystem, global = true)]
    order: ListingOrder,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug)]
struct Args {
    command: Command,
    order: ListingOrder,
    verbose: bool,
}

/// Validates user input and constructs a valid input state
fn parse_args() -> Result<Args> {
    let cli = Cli::parse();

    match &cli.command {
        Command::List { folder, .. } => {
            ensure!(folder.is_dir(), "Dump folder doesn't exist");
        }
        Command::Sheet {
            source_folder,
            atlas,
            ..
        } => {
            ensure!(source_folder.is_dir(), "Source folder doesn't exist");
            if let Some(atlas) = atlas {
                ensure!(atlas.is_file(), "Atlas dump doesn't exist");
            }
        }
        Command::Patch {
            source_folder,
            geometry,
            output_folder,
            atlas,
            ..
        } => {
            ensure!(source_folder.is_dir(), "Source folder doesn't exist");
            ensure!(geometry.is_file(), "Geometry table doesn't exist");
            ensure!(
                source_folder != output_folder,
                "Output folder must differ from the source folder"
            );
            if let Some(atlas) = atlas {
                ensure!(atlas.is_file(), "Atlas dump doesn't exist");
            }
        }
        Command::FixAtlas {
            owning_folder,
            source_folder,
            ..
        }
        | Command::FixSprites {
            owning_folder,
            source_folder,
        } => {
            ensure!(owning_folder.is_dir(), "Owning folder doesn't exist");
            ensure!(source_folder.is_dir(), "Source folder doesn't exist");
            ensure!(
                owning_folder != source_folder,
                "Owning folder must differ from the source folder"
            );
        }
    }

    Ok(Args {
        command: cli.command,
        order: cli.order,
        verbose: cli.verbose,
    })
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| (if verbose { "debug" } else { "info" }).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() -> Result<()> {
    let args = parse_args()?;
    VERBOSE.set(args.verbose).unwrap();
    init_tracing(args.verbose);

    let order = args.order;
    match args.command {
        Command::List { folder, globs } => {
            list_dumps_in(&folder, &globs, order).context("List command failed")?
        }
        Command::Sheet {
            source_folder,
            output,
            use_atlas,
            atlas,
            texture_path_id,
        } => {
            let config = SheetConfig {
                source_dir: source_folder,
                output,
                atlas,
                use_atlas,
                texture_path_id,
                order,
            };
            export_sheet(&config).context("Sheet command failed")?;
        }
        Command::Patch {
            source_folder,
            geometry,
            output_folder,
            atlas,
            clean,
        } => {
            let config = PatchConfig {
                source_dir: source_folder,
                geometry,
                output_dir: output_folder,
                atlas,
                clean_output: clean,
                order,
            };
            patch_dumps(&config).context("Patch command failed")?;
        }
        Command::FixAtlas {
            owning_folder,
            source_folder,
            source_atlas,
            owning_atlas,
        } => {
            let config = FixAtlasConfig {
                owning_dir: owning_folder,
                source_dir: source_folder,
                source_atlas,
                owning_atlas,
                order,
            };
            let report = fix_atlas(&config).context("Fix Atlas command failed")?;
            info!(
                "Fix atlas finished: retargeted {}, failed {}, unreadable {}, {}",
                report.retargeted, report.failed, report.unreadable, report.renames
            );
        }
        Command::FixSprites {
            owning_folder,
            source_folder,
        } => {
            let config = FixSpritesConfig {
                owning_dir: owning_folder,
                source_dir: source_folder,
                order,
            };
            let report = fix_sprites(&config).context("Fix Sprites command failed")?;
            info!(
                "Fix sprites finished: retargeted {}, failed {}, unreadable {}, {}",
                report.retargeted, report.failed, report.unreadable, report.renames
            );
        }
    }

    Ok(())
}
