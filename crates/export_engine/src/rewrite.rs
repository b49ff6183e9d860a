use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use export_core::{is_markdown_name, rewrite_reference_text};

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: PersistError },
}

/// Rewrites encoded link segments in a markdown file in place.
///
/// Must run while the file still has its on-disk export name. Returns the
/// number of references changed; non-markdown files and files without
/// matches are left untouched and report zero.
pub fn rewrite_references(path: &Path) -> Result<usize, RewriteError> {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(0);
    };
    if !is_markdown_name(name) {
        return Ok(0);
    }

    let content = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let Some(rewritten) = rewrite_reference_text(&content) else {
        return Ok(0);
    };

    AtomicFileWriter::for_file(path)
        .write(name, &rewritten.text)
        .map_err(|source| RewriteError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(rewritten.references)
}
