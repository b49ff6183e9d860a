use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info, engine_warn};
use export_core::{strip_dir_suffix, strip_hash_suffix, NameError, EXPORT_ROOT_NAME};

use crate::rewrite::rewrite_references;
use crate::{ExportEvent, NodeKind, ProgressSink};

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("cannot strip hash suffix from {path:?}: {source}")]
    MalformedName { path: PathBuf, source: NameError },
    #[error("name {path:?} is not valid UTF-8")]
    NonUtf8Name { path: PathBuf },
    #[error("renaming {from:?} would overwrite existing {to:?}")]
    NameCollision { from: PathBuf, to: PathBuf },
    #[error("extraction root {root:?} holds {entries} entries, nothing to normalize")]
    UnexpectedLayout { root: PathBuf, entries: usize },
    #[error("io error at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// A node scheduled for normalization, addressed by its pre-rename path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode {
    pub path: PathBuf,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizeSummary {
    pub export_root: PathBuf,
    pub files_renamed: usize,
    pub dirs_renamed: usize,
    pub references_rewritten: usize,
    pub rewrite_failures: usize,
}

/// Gathers the extraction under `export` and strips hash suffixes from
/// everything below it.
///
/// Files are rewritten before they are renamed; a directory is renamed only
/// after all of its descendants.
pub fn normalize_tree(
    raw_root: &Path,
    sink: &dyn ProgressSink,
) -> Result<NormalizeSummary, NormalizeError> {
    let export_root = prepare_export_root(raw_root, sink)?;
    let plan = post_order(&export_root)?;
    engine_debug!("Normalizing {} nodes under {:?}", plan.len(), export_root);

    let mut summary = NormalizeSummary {
        export_root,
        ..NormalizeSummary::default()
    };

    for node in plan {
        let name = utf8_name(&node.path)?;
        match node.kind {
            NodeKind::File => {
                match rewrite_references(&node.path) {
                    Ok(0) => {}
                    Ok(count) => {
                        summary.references_rewritten += count;
                        sink.emit(ExportEvent::ReferencesRewritten {
                            path: node.path.clone(),
                            count,
                        });
                    }
                    Err(err) => {
                        engine_warn!("Skipping reference rewrite: {}", err);
                        summary.rewrite_failures += 1;
                        sink.emit(ExportEvent::RewriteFailed {
                            path: node.path.clone(),
                            message: err.to_string(),
                        });
                    }
                }

                let stripped =
                    strip_hash_suffix(name).map_err(|source| NormalizeError::MalformedName {
                        path: node.path.clone(),
                        source,
                    })?;
                if rename_node(&node.path, &stripped, NodeKind::File, sink)? {
                    summary.files_renamed += 1;
                }
            }
            NodeKind::Directory => {
                let stripped = strip_dir_suffix(name);
                if rename_node(&node.path, &stripped, NodeKind::Directory, sink)? {
                    summary.dirs_renamed += 1;
                }
            }
        }
    }

    engine_info!(
        "Normalized {:?}: {} files, {} directories renamed, {} references rewritten",
        summary.export_root,
        summary.files_renamed,
        summary.dirs_renamed,
        summary.references_rewritten
    );
    Ok(summary)
}

/// Establishes `raw_root/export` as the root of the extracted tree.
///
/// An extraction holding exactly one directory and nothing else has that
/// directory renamed to `export`. Any other layout (top-level pages, several
/// directories) is moved as a whole into a new `export` directory. An empty
/// extraction is a [`NormalizeError::UnexpectedLayout`].
pub fn prepare_export_root(
    raw_root: &Path,
    sink: &dyn ProgressSink,
) -> Result<PathBuf, NormalizeError> {
    let children = sorted_children(raw_root)?;

    match children.as_slice() {
        [] => Err(NormalizeError::UnexpectedLayout {
            root: raw_root.to_path_buf(),
            entries: 0,
        }),
        [only] if only.kind == NodeKind::Directory => {
            rename_node(&only.path, EXPORT_ROOT_NAME, NodeKind::Directory, sink)?;
            Ok(raw_root.join(EXPORT_ROOT_NAME))
        }
        _ => wrap_under_export_root(raw_root, &children),
    }
}

fn wrap_under_export_root(
    raw_root: &Path,
    children: &[PlannedNode],
) -> Result<PathBuf, NormalizeError> {
    let export_root = raw_root.join(EXPORT_ROOT_NAME);
    // A top-level entry may already be called `export`; stage under a free name.
    let staging = if children.iter().any(|child| child.path == export_root) {
        free_sibling(raw_root, EXPORT_ROOT_NAME)
    } else {
        export_root.clone()
    };
    fs::create_dir(&staging).map_err(io_at(&staging))?;

    for child in children {
        let Some(name) = child.path.file_name() else {
            continue;
        };
        fs::rename(&child.path, staging.join(name)).map_err(io_at(&child.path))?;
    }
    if staging != export_root {
        fs::rename(&staging, &export_root).map_err(io_at(&staging))?;
    }

    engine_info!(
        "Moved {} top-level entries under {:?}",
        children.len(),
        export_root
    );
    Ok(export_root)
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> NormalizeError {
    let path = path.to_path_buf();
    move |source| NormalizeError::Io { path, source }
}

fn free_sibling(dir: &Path, base: &str) -> PathBuf {
    (1..)
        .map(|n| dir.join(format!(".{base}-{n}")))
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
        .unwrap_or_else(|| dir.join(format!(".{base}-staging")))
}

/// Lists every node under `root` (excluding `root`) in post-order: each
/// directory appears after all of its descendants, siblings in name order.
///
/// Paths are the current ones. They stay valid while the plan is executed
/// in order, since a directory is renamed only after everything inside it.
pub fn post_order(root: &Path) -> Result<Vec<PlannedNode>, NormalizeError> {
    struct Frame {
        dir: PathBuf,
        children: std::vec::IntoIter<PlannedNode>,
    }

    let mut plan = Vec::new();
    let mut stack = vec![Frame {
        dir: root.to_path_buf(),
        children: sorted_children(root)?.into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        match frame.children.next() {
            Some(node) if node.kind == NodeKind::Directory => {
                let children = sorted_children(&node.path)?.into_iter();
                stack.push(Frame {
                    dir: node.path,
                    children,
                });
            }
            Some(node) => plan.push(node),
            None => {
                if let Some(done) = stack.pop() {
                    if !stack.is_empty() {
                        plan.push(PlannedNode {
                            path: done.dir,
                            kind: NodeKind::Directory,
                        });
                    }
                }
            }
        }
    }

    Ok(plan)
}

fn sorted_children(dir: &Path) -> Result<Vec<PlannedNode>, NormalizeError> {
    let io_err = |source| NormalizeError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        // Symlinks are renamed like files and never followed.
        let kind = if entry.file_type().map_err(io_err)?.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        children.push(PlannedNode {
            path: entry.path(),
            kind,
        });
    }
    children.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(children)
}

fn utf8_name(path: &Path) -> Result<&str, NormalizeError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| NormalizeError::NonUtf8Name {
            path: path.to_path_buf(),
        })
}

/// Renames `from` to `new_name` in the same directory. Returns `false` when
/// the name is already `new_name`.
fn rename_node(
    from: &Path,
    new_name: &str,
    kind: NodeKind,
    sink: &dyn ProgressSink,
) -> Result<bool, NormalizeError> {
    if from.file_name().and_then(|name| name.to_str()) == Some(new_name) {
        return Ok(false);
    }
    let to = from.with_file_name(new_name);
    if fs::symlink_metadata(&to).is_ok() {
        return Err(NormalizeError::NameCollision {
            from: from.to_path_buf(),
            to,
        });
    }

    fs::rename(from, &to).map_err(|source| NormalizeError::Io {
        path: from.to_path_buf(),
        source,
    })?;
    engine_debug!("Renamed {:?} -> {:?}", from, to);
    sink.emit(ExportEvent::Renamed {
        from: from.to_path_buf(),
        to,
        kind,
    });
    Ok(true)
}
