//! Composite dump names: `<name>-CAB-<digest>-<pathId>`
//!
//! The exporter writes the path id straight after a `-`, so a negative id ends
//! up as `<digest>--<magnitude>`. Split on `-` that is three segments with an
//! empty middle one, which is how the sign is recognised.

use std::{fmt, path::Path, sync::OnceLock};

use regex::Regex;
use tracing::error;

use crate::error::{Error, Result};

pub const CAB_MARKER: &str = "-CAB-";

/// Path id used when a name could not be parsed
pub const INVALID_PATH_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeIdentifier {
    pub name: String,
    /// Archive digest, normally 32 hex digits
    pub cab: String,
    pub path_id: i64,
}

impl CompositeIdentifier {
    pub fn new(name: impl Into<String>, cab: impl Into<String>, path_id: i64) -> Self {
        CompositeIdentifier {
            name: name.into(),
            cab: cab.into(),
            path_id,
        }
    }

    /// Parse a dump file name, with or without the `.json` extension
    pub fn parse(file_name: &str) -> Result<Self> {
        let stem = file_name.strip_suffix(".json").unwrap_or(file_name);

        let format_error = |reason: &str| Error::Format {
            name: stem.to_string(),
            reason: reason.to_string(),
        };

        let (name, rest) = stem
            .split_once(CAB_MARKER)
            .ok_or_else(|| format_error("no -CAB- marker"))?;

        let segments = rest.split('-').collect::<Vec<_>>();
        let negative = match segments.len() {
            2 => false,
            3 => true,
            n => return Err(format_error(&format!("expected 2 or 3 segments, found {n}"))),
        };

        let magnitude = segments[segments.len() - 1]
            .parse::<i64>()
            .map_err(|e| format_error(&format!("bad path id: {e}")))?;

        Ok(CompositeIdentifier {
            name: name.to_string(),
            cab: segments[0].to_string(),
            path_id: if negative { -magnitude } else { magnitude },
        })
    }

    /// Like [`parse`](Self::parse), but logs the error and falls back to
    /// [`INVALID_PATH_ID`] so a batch can continue
    pub fn parse_or_sentinel(file_name: &str) -> Self {
        Self::parse(file_name).unwrap_or_else(|e| {
            error!("{e}");
            let stem = file_name.strip_suffix(".json").unwrap_or(file_name);
            let (name, cab) = match stem.split_once(CAB_MARKER) {
                Some((name, rest)) => (name, rest.split('-').next().unwrap_or_default()),
                None => (stem, ""),
            };
            CompositeIdentifier::new(name, cab, INVALID_PATH_ID)
        })
    }

    /// Parse the file name component of a path
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path.file_name().and_then(|f| f.to_str()).ok_or_else(|| {
            Error::Format {
                name: path.display().to_string(),
                reason: "not a valid UTF-8 file name".to_string(),
            }
        })?;
        Self::parse(file_name)
    }

    pub fn from_path_or_sentinel(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy())
            .unwrap_or_default();
        Self::parse_or_sentinel(&file_name)
    }

    /// File name without extension
    pub fn format(&self) -> String {
        format!("{}{CAB_MARKER}{}-{}", self.name, self.cab, self.path_id)
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.format())
    }
}

impl fmt::Display for CompositeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (path id {})", self.name, self.path_id)
    }
}

/// The 32 hex digit archive digest embedded in a dump path
pub fn project_id(path: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"-CAB-([a-fA-F0-9]{32})-").expect("valid regex"));

    re.captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
