//! Derivation of stable names from a spec file name.
//!
//! Every name used downstream (build task handle, package segment, exported
//! namespace) comes from [`DerivedIdentifier::derive`], so renaming a spec
//! file is the only way to rename its generated client.

use camino::Utf8Path;
use serde::Serialize;

use crate::error::IdentifierError;

/// File extensions recognised as OpenAPI specs.
pub const SPEC_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Marker suffixes removed from the file stem, highest priority first. At
/// most one of them is stripped.
const SUFFIXES: [&str; 4] = ["-open-api", "_open_api", "-api", "_api"];

const DELIMITERS: [char; 2] = ['-', '_'];

/// Names derived from a single spec file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DerivedIdentifier {
    /// File stem without the marker suffix, e.g. `hex-tractor`.
    pub base_name: String,
    /// Identifier-safe build handle, e.g. `hexTractor`.
    pub task_id: String,
    /// Lower-case package segment, e.g. `hextractor`.
    pub package_name: String,
    /// Exported namespace, e.g. `HexTractor`.
    pub namespace_name: String,
}

impl DerivedIdentifier {
    /// Derives the identifier bundle for `file_name`.
    ///
    /// This never fails; degenerate names are reported by
    /// [`DerivedIdentifier::validate`].
    ///
    /// ```rust
    /// use specweave::DerivedIdentifier;
    ///
    /// let ident = DerivedIdentifier::derive("hex-tractor-open-api.yml");
    /// assert_eq!(ident.task_id, "hexTractor");
    /// assert_eq!(ident.namespace_name, "HexTractor");
    /// assert_eq!(ident.package_name, "hextractor");
    /// ```
    pub fn derive(file_name: &str) -> Self {
        let stem = Utf8Path::new(file_name).file_stem().unwrap_or(file_name);
        let base_name = strip_marker(stem);

        let tokens: Vec<&str> = base_name
            .split(DELIMITERS)
            .filter(|token| !token.is_empty())
            .collect();

        let task_id = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match i {
                0 => token.to_lowercase(),
                _ => capitalize(token),
            })
            .collect();

        let namespace_name = tokens.iter().map(|token| capitalize(token)).collect();
        let package_name = tokens.concat().to_lowercase();

        Self {
            base_name: base_name.to_string(),
            task_id,
            package_name,
            namespace_name,
        }
    }

    /// Rejects identifiers that can't be used as a task handle or exported
    /// namespace.
    pub fn validate(&self, file: &Utf8Path) -> Result<(), IdentifierError> {
        let degenerate = |reason: &str| IdentifierError::Degenerate {
            file: file.to_owned(),
            reason: reason.to_string(),
        };

        if self.base_name.is_empty() {
            return Err(degenerate("base name is empty once the suffix is removed"));
        }

        if self.namespace_name.is_empty() {
            return Err(degenerate("base name consists of delimiters only"));
        }

        if !is_identifier(&self.namespace_name) {
            return Err(degenerate(&format!(
                "'{}' is not a valid identifier",
                self.namespace_name
            )));
        }

        Ok(())
    }
}

fn strip_marker(stem: &str) -> &str {
    SUFFIXES
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem)
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric())
}
