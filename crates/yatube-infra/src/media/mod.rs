//! Storage for uploaded post images.

mod local;
mod memory;

pub use local::LocalMediaStorage;
pub use memory::InMemoryMediaStorage;

use yatube_core::ports::MediaError;

/// Reduce a client-supplied file name to a safe base name: spaces become
/// underscores and anything outside `[A-Za-z0-9_.-]` is dropped.
pub(crate) fn valid_name(file_name: &str) -> Result<String, MediaError> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(MediaError::InvalidName(file_name.to_string()));
    }
    Ok(cleaned)
}

/// `upload_to/name`, rejecting directory names that would escape the root.
pub(crate) fn join_name(upload_to: &str, name: &str) -> Result<String, MediaError> {
    let dir = upload_to.trim_matches('/');
    if dir.split('/').any(|part| part == ".." || part.is_empty()) && !dir.is_empty() {
        return Err(MediaError::InvalidName(upload_to.to_string()));
    }
    if dir.is_empty() {
        Ok(name.to_string())
    } else {
        Ok(format!("{}/{}", dir, name))
    }
}

/// `photo.png` -> `photo_a1b2c3d.png`
pub(crate) fn alternative_name(name: &str) -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(7).collect();
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}
