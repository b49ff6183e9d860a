/// Width of the content hash the export system appends to every name
/// (a space followed by 32 hex digits).
pub const HASH_SUFFIX_LEN: usize = 33;

/// Fixed name given to the top-level directory of an extracted export.
pub const EXPORT_ROOT_NAME: &str = "export";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("file name {name:?} has no extension to anchor the hash suffix")]
    MissingExtension { name: String },
    #[error("file name {name:?} is too short before its extension to carry a hash suffix")]
    StemTooShort { name: String },
}

/// Strips the hash suffix from a file name, keeping its extension.
///
/// `"Notes 0123456789abcdef0123456789abcdef.md"` becomes `"Notes.md"`.
/// Names of at most [`HASH_SUFFIX_LEN`] characters are returned unchanged.
/// Lengths are counted in characters, not bytes.
pub fn strip_hash_suffix(name: &str) -> Result<String, NameError> {
    if name.chars().count() <= HASH_SUFFIX_LEN {
        return Ok(name.to_string());
    }

    let dot = extension_start(name).ok_or_else(|| NameError::MissingExtension {
        name: name.to_string(),
    })?;
    let (stem, extension) = name.split_at(dot);

    let stem_len = stem.chars().count();
    if stem_len < HASH_SUFFIX_LEN {
        return Err(NameError::StemTooShort {
            name: name.to_string(),
        });
    }

    let mut stripped: String = stem.chars().take(stem_len - HASH_SUFFIX_LEN).collect();
    stripped.push_str(extension);
    Ok(stripped)
}

/// Strips the hash suffix from a directory name by trimming a fixed number
/// of trailing characters. Short names are returned unchanged.
pub fn strip_dir_suffix(name: &str) -> String {
    let len = name.chars().count();
    if len <= HASH_SUFFIX_LEN {
        return name.to_string();
    }
    name.chars().take(len - HASH_SUFFIX_LEN).collect()
}

/// Byte index of the last `.` that is followed only by ASCII letters.
fn extension_start(name: &str) -> Option<usize> {
    let dot = name.rfind('.')?;
    let extension = &name[dot + 1..];
    if !extension.is_empty() && extension.bytes().all(|b| b.is_ascii_alphabetic()) {
        Some(dot)
    } else {
        None
    }
}
