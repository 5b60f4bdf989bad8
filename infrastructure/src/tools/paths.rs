//! Path resolution for the file-reading adapters.

use std::path::{Path, PathBuf};

use agentic_domain::ToolError;

use super::settings::FILESYSTEM_READ;

/// Resolve `requested` against an optional root directory.
///
/// Without a root the path is used as given. With a root, relative paths
/// are joined to it and the canonical result must stay inside the root;
/// anything else is a [`ToolError::CapabilityDenied`].
pub fn resolve(root: Option<&Path>, requested: &str) -> Result<PathBuf, ToolError> {
    let requested = Path::new(requested);
    let Some(root) = root else {
        return Ok(requested.to_path_buf());
    };

    let candidate = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let canonical_root = root
        .canonicalize()
        .map_err(|e| ToolError::Execution(format!("cannot open root {}: {}", root.display(), e)))?;
    let canonical = candidate.canonicalize().map_err(|e| {
        ToolError::Execution(format!("cannot open {}: {}", candidate.display(), e))
    })?;

    if !canonical.starts_with(&canonical_root) {
        return Err(ToolError::CapabilityDenied(format!(
            "{} outside {}",
            FILESYSTEM_READ,
            canonical_root.display()
        )));
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_root_passes_through() {
        assert_eq!(resolve(None, "a/b.csv").unwrap(), PathBuf::from("a/b.csv"));
    }

    #[test]
    fn test_relative_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("data.csv"), "a\n1\n").unwrap();
        let resolved = resolve(Some(dir.path()), "data.csv").unwrap();
        assert!(resolved.ends_with("data.csv"));
    }

    #[test]
    fn test_escape_is_denied() {
        let outer = tempfile::tempdir().unwrap();
        let root = outer.path().join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(outer.path().join("secret.txt"), "x").unwrap();

        let err = resolve(Some(&root), "../secret.txt").unwrap_err();
        assert!(matches!(err, ToolError::CapabilityDenied(_)));
    }

    #[test]
    fn test_missing_file_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(Some(dir.path()), "missing.csv").unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
