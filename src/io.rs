use std::path::Path;

use crate::error::LoadError;

/// Read a whole file. Runs on loader worker threads.
pub(crate) fn load_binary(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
