use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading a listing catalog. Once a catalog is loaded
/// nothing downstream can fail.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate job id '{0}' in catalog")]
    DuplicateId(String),
}
