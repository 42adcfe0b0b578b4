use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::unit::TaskRegistry;

/// Name of the source set every generated unit is compiled into.
pub const COMMON_MAIN: &str = "commonMain";

/// A named compilation input set. All generated units feed the same set,
/// they are not compiled separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSet {
    pub name: String,
    dirs: Vec<Utf8PathBuf>,
}

impl SourceSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirs: Vec::new(),
        }
    }

    /// `commonMain` with the generated sources of every unit registered.
    pub fn common_main(registry: &TaskRegistry) -> Self {
        let mut set = Self::new(COMMON_MAIN);
        for unit in registry {
            set.register(unit.source_dir());
        }
        set
    }

    /// Adds `dir` unless it is already part of the set. Returns whether the
    /// set changed.
    pub fn register(&mut self, dir: impl Into<Utf8PathBuf>) -> bool {
        let dir = dir.into();
        if self.dirs.contains(&dir) {
            return false;
        }
        tracing::debug!(set = %self.name, %dir, "registered source directory");
        self.dirs.push(dir);
        true
    }

    pub fn dirs(&self) -> &[Utf8PathBuf] {
        &self.dirs
    }

    pub fn contains(&self, dir: &Utf8Path) -> bool {
        self.dirs.iter().any(|d| d == dir)
    }
}
