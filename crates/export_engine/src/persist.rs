use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("working directory {path:?} unusable: {message}")]
    WorkingDir { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Deletes `dir` with everything in it, then recreates it empty.
///
/// A missing directory is not an error. A directory that is, or contains,
/// the current directory is refused.
pub fn reset_working_dir(dir: &Path) -> Result<(), PersistError> {
    let cwd = std::env::current_dir()?;
    ensure_not_enclosing(dir, &cwd)?;

    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(PersistError::WorkingDir {
                path: dir.to_path_buf(),
                message: err.to_string(),
            })
        }
    }
    fs::create_dir_all(dir).map_err(|e| PersistError::WorkingDir {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::WorkingDir {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}

fn ensure_not_enclosing(dir: &Path, cwd: &Path) -> Result<(), PersistError> {
    // Nothing to protect if it does not exist yet.
    let Ok(dir) = fs::canonicalize(dir) else {
        return Ok(());
    };
    let cwd = fs::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf());
    if cwd.starts_with(&dir) {
        return Err(PersistError::WorkingDir {
            path: dir,
            message: "refusing to delete a directory containing the current directory".to_string(),
        });
    }
    Ok(())
}

/// Atomically replaces files inside one directory: write a temp file, then rename.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writer for the directory containing `path`.
    pub fn for_file(path: &Path) -> Self {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir.to_path_buf())
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{ensure_not_enclosing, PersistError};

    #[test]
    fn current_directory_and_its_ancestors_are_refused() {
        let temp = tempfile::TempDir::new().unwrap();
        let cwd = temp.path().join("project/sub");
        fs::create_dir_all(&cwd).unwrap();

        for dir in [cwd.clone(), temp.path().join("project"), temp.path().to_path_buf()] {
            let err = ensure_not_enclosing(&dir, &cwd).unwrap_err();
            assert!(matches!(err, PersistError::WorkingDir { .. }));
        }
        assert!(cwd.is_dir());
    }

    #[test]
    fn relative_spelling_of_the_current_directory_is_refused() {
        let temp = tempfile::TempDir::new().unwrap();
        let cwd = temp.path().join("project");
        fs::create_dir_all(&cwd).unwrap();

        assert!(ensure_not_enclosing(&cwd.join("."), &cwd).is_err());
        assert!(ensure_not_enclosing(&cwd.join("../project"), &cwd).is_err());
    }

    #[test]
    fn sibling_child_and_missing_dirs_are_allowed() {
        let temp = tempfile::TempDir::new().unwrap();
        let cwd = temp.path().join("project");
        let sibling = temp.path().join("project-workspace");
        fs::create_dir_all(&cwd).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::create_dir_all(cwd.join("workspace")).unwrap();

        assert!(ensure_not_enclosing(&sibling, &cwd).is_ok());
        assert!(ensure_not_enclosing(&cwd.join("workspace"), &cwd).is_ok());
        assert!(ensure_not_enclosing(&temp.path().join("missing"), &cwd).is_ok());
    }
}
