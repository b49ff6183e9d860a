use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open archive {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read archive {path:?}: {source}")]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Unpacks a zip archive into `destination` and returns the number of files written.
///
/// Entries whose names would escape `destination` are skipped.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<usize, ExtractError> {
    let file = File::open(archive_path).map_err(|source| ExtractError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| ExtractError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    fs::create_dir_all(destination).map_err(|source| ExtractError::Write {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut files = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| ExtractError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })?;

        let Some(relative) = entry.enclosed_name().map(|name| name.to_path_buf()) else {
            engine_warn!("Skipping archive entry with unsafe path {:?}", entry.name());
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| ExtractError::Write {
                path: target.clone(),
                source,
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ExtractError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut out = File::create(&target).map_err(|source| ExtractError::Write {
            path: target.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut out).map_err(|source| ExtractError::Write {
            path: target.clone(),
            source,
        })?;
        files += 1;
    }

    engine_info!("Extracted {} files from {:?}", files, archive_path);
    Ok(files)
}
