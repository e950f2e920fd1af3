use std::path::{Path, PathBuf};

/// Resolve the specmap project root.
///
/// Priority:
/// 1. `--root` flag / `SPECMAP_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.specmap/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_root(&cwd).unwrap_or(cwd)
}

/// Nearest ancestor of `start` (inclusive) holding a `.specmap/` directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(specmap_core::paths::SPECMAP_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Directory `init` scaffolds into: the explicit root or `cwd`, never a
/// parent project.
pub fn resolve_base(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_specmap_dir_from_subdir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".specmap")).unwrap();
        let subdir = dir.path().join("01-specifications/features/001-auth");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_project_root(&subdir).as_deref(), Some(dir.path()));
    }

    #[test]
    fn no_project_above() {
        let dir = TempDir::new().unwrap();
        assert!(find_project_root(dir.path()).is_none());
    }
}
