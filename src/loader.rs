use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Read the whole file at `path` as UTF-8 text.
pub fn load(path: &Path) -> Result<String> {
    let mut bytes = Vec::new();
    {
        let mut file = File::open(path).map_err(|e| Error::file_access(path, e))?;
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::file_access(path, e))?;
    }
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read input");

    String::from_utf8(bytes).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })
}
