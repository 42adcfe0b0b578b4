//! The aggregating `index.ts` of the script variant.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::unit::TaskRegistry;

/// Re-exports every generated module under its namespace, one line per unit
/// in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barrel {
    lines: Vec<String>,
}

impl Barrel {
    pub fn from_registry(registry: &TaskRegistry) -> Self {
        let lines = registry
            .iter()
            .map(|unit| {
                format!(
                    "export * as {} from '{}';",
                    unit.ident.namespace_name,
                    unit.module_specifier()
                )
            })
            .collect();

        Self { lines }
    }

    /// Newline terminated file contents.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Writes `index.ts` into `dir`, leaving the file untouched when its
    /// contents are already up to date.
    pub fn write(&self, dir: &Utf8Path) -> std::io::Result<Utf8PathBuf> {
        let path = dir.join("index.ts");
        let text = self.render();

        let unchanged = fs::read_to_string(&path).is_ok_and(|existing| existing == text);
        if unchanged {
            tracing::debug!(%path, "index file is up to date");
            return Ok(path);
        }

        fs::create_dir_all(dir)?;
        fs::write(&path, text)?;
        tracing::info!(%path, exports = self.lines.len(), "wrote index file");

        Ok(path)
    }
}
