use std::{
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::warn;

use crate::{
    dump::{list_dumps, Dump, ListingOrder},
    identifier::CompositeIdentifier,
};

/// One line per dump: kind, parsed name and path id, file name
fn describe(dump: &Dump) -> String {
    let id = match CompositeIdentifier::from_path(&dump.path) {
        Ok(id) => format!("{}\t{}", id.name, id.path_id),
        Err(_) => "?\t?".to_string(),
    };
    format!("{:?}\t{}\t{}", dump.kind, id, dump.file_name())
}

/// List dumps whose file name matches any of the glob patterns
pub fn list_dumps_in(directory: &Path, patterns: &[Pattern], order: ListingOrder) -> Result<()> {
    // Use a buffered writer since folders can hold thousands of dumps
    let mut stdout = BufWriter::new(io::stdout().lock());

    list_dumps(directory, order)
        .context("Failed to list dump folder")?
        .filter_map(|d| {
            d.inspect_err(|(path, e)| warn!("Skipping {:?}: {e}", path))
                .ok()
        })
        .filter(|dump| patterns.iter().any(|p| p.matches(dump.file_name())))
        .try_for_each(|dump| {
            writeln!(stdout, "{}", describe(&dump)).context("Failed to write to stdout")
        })?;

    stdout.flush().context("Failed to flush stdout")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::dump::DumpKind;

    #[test]
    fn test_describe() {
        let dump = Dump {
            path: PathBuf::from("/dumps/Hero-CAB-abc--5.json"),
            kind: DumpKind::Sprite,
            document: json!({"m_Rect": {}}),
        };
        assert_eq!(describe(&dump), "Sprite\tHero\t-5\tHero-CAB-abc--5.json");

        let dump = Dump {
            path: PathBuf::from("/dumps/texture.json"),
            kind: DumpKind::Other,
            document: json!({}),
        };
        assert_eq!(describe(&dump), "Other\t?\t?\ttexture.json");
    }
}
