use std::path::PathBuf;

/// Failures raised while reading and reconciling dumps.
///
/// Everything except [`Error::Precondition`] is scoped to a single file: the
/// caller logs it, counts it and carries on with the rest of the batch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filename does not follow `<name>-CAB-<digest>-<pathId>`
    #[error("{name:?} does not fit the dump name format: {reason}")]
    Format { name: String, reason: String },

    /// Document is not valid JSON
    #[error("Failed to parse dump {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is missing or has an unexpected type
    #[error("Field {field} is missing or malformed")]
    Field { field: String },

    /// A path id or render data key was not found in a table it should be in
    #[error("{0}")]
    LookupMiss(String),

    /// A required top-level input is missing, the run must not continue
    #[error("{0}")]
    Precondition(String),

    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn field(field: impl Into<String>) -> Self {
        Error::Field {
            field: field.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
