use std::path::PathBuf;
use tracing::warn;

/// Expands a leading `~` to the user's home directory. Expansion is
/// best-effort: when it fails the input comes back unchanged and the caller's
/// filesystem access decides whether that matters.
pub fn resolve(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
        warn!("could not determine home directory for `{path}`");
        return PathBuf::from(path);
    }

    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
        warn!("could not determine home directory for `{path}`");
        return PathBuf::from(path);
    }

    if path.starts_with('~') {
        // ~user form; no portable way to resolve another user's home
        warn!("cannot expand `{path}`, leaving it as-is");
    }

    PathBuf::from(path)
}
