use std::path::Path;

/// Component-wise ancestor test: is `path` inside (or equal to) `base`?
///
/// `Path::starts_with` already compares whole components, so `/a/bc` is not
/// contained in `/a/b`.
pub fn contains(base: &Path, path: &Path) -> bool {
    path.starts_with(base)
}

/// Whether any path component *below* `root` is dot-prefixed.
///
/// The check is scoped to the watched root so that a root living under a
/// hidden directory (e.g. `~/.config/editor/packages`) does not suppress
/// every event beneath it.
pub fn is_hidden_within(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };

    rel.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
    })
}
