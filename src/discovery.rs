//! Spec discovery.
//!
//! There is no manifest listing the specs, membership is decided by the file
//! extension alone. Only the top level of the root directory is scanned.

use camino::{Utf8Path, Utf8PathBuf};
use glob::glob;
use serde::Serialize;

use crate::error::DiscoveryError;
use crate::ident::SPEC_EXTENSIONS;

/// A discovered spec file. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpecFile {
    path: Utf8PathBuf,
}

impl SpecFile {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.path.as_str())
    }
}

/// Lists the spec files directly under `root`, sorted by file name.
///
/// A missing directory, or one without any spec in it, yields an empty list.
pub fn discover(root: &Utf8Path) -> Result<Vec<SpecFile>, DiscoveryError> {
    let mut specs = Vec::new();
    for ext in SPEC_EXTENSIONS {
        for path in glob(&pattern(root, ext))? {
            let path = Utf8PathBuf::try_from(path?)?;
            if path.is_file() {
                specs.push(SpecFile::new(path));
            }
        }
    }

    specs.sort_by(|a, b| a.file_name().cmp(b.file_name()).then_with(|| a.path.cmp(&b.path)));
    specs.dedup();

    tracing::debug!(root = %root, count = specs.len(), "discovered spec files");

    Ok(specs)
}

/// Top-level glob for `ext` under `root`. An empty root is the current
/// directory.
fn pattern(root: &Utf8Path, ext: &str) -> String {
    let root = if root.as_str().is_empty() { "." } else { root.as_str() };
    format!("{}/*.{ext}", glob::Pattern::escape(root))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_empty_root_is_current_dir() {
        assert_eq!(pattern(Utf8Path::new(""), "yml"), "./*.yml");
        assert_eq!(pattern(Utf8Path::new("openApi"), "yaml"), "openApi/*.yaml");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let (_dir, root) = tempdir();
        let specs = discover(&root.join("does-not-exist")).unwrap();
        assert!(specs.is_empty());
    }

    #[test]
    fn test_filters_by_extension() {
        let (_dir, root) = tempdir();
        fs::write(root.join("billing_api.yaml"), "openapi: 3.0.0").unwrap();
        fs::write(root.join("hex-tractor-open-api.yml"), "openapi: 3.0.0").unwrap();
        fs::write(root.join("README.md"), "# specs").unwrap();
        fs::write(root.join("schema.json"), "{}").unwrap();

        let specs = discover(&root).unwrap();
        let names: Vec<_> = specs.iter().map(SpecFile::file_name).collect();
        assert_eq!(names, ["billing_api.yaml", "hex-tractor-open-api.yml"]);
    }

    #[test]
    fn test_does_not_recurse() {
        let (_dir, root) = tempdir();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("nested/inner-api.yml"), "openapi: 3.0.0").unwrap();
        fs::create_dir_all(root.join("folder.yml")).unwrap();
        fs::write(root.join("outer-api.yml"), "openapi: 3.0.0").unwrap();

        let specs = discover(&root).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].file_name(), "outer-api.yml");
    }

    #[test]
    fn test_root_with_glob_characters() {
        let (_dir, tmp) = tempdir();
        let root = tmp.join("specs [v1]");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("users-api.yml"), "openapi: 3.0.0").unwrap();

        let specs = discover(&root).unwrap();
        assert_eq!(specs.len(), 1);
    }
}
