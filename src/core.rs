use camino::Utf8PathBuf;
use serde::Serialize;

use crate::platform::Target;

/// A 32-byte BLAKE3 hash used to fingerprint generation inputs.
///
/// A unit whose fingerprint matches the one recorded by its previous run is
/// considered up to date and the external generator is not invoked again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct Hash32([u8; 32]);

impl<T> From<T> for Hash32
where
    T: Into<[u8; 32]>,
{
    fn from(value: T) -> Self {
        Hash32(value.into())
    }
}

impl Hash32 {
    /// Hashes several parts, each length-prefixed so that `["ab", "c"]` and
    /// `["a", "bc"]` never produce the same fingerprint.
    pub(crate) fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    pub(crate) fn to_hex(self) -> String {
        crate::utils::hex(&self.0)
    }
}

impl std::fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

/// Which flavour of client generation the pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// One Kotlin multiplatform generation task per spec, wired into the host
    /// build graph ahead of every compilation, packaging and publishing task.
    Graph,
    /// One TypeScript module per spec plus an aggregating `index.ts`.
    Script,
}

/// How generation units are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    /// One unit after another in discovery order, stopping at the first
    /// failure.
    Sequential,
    /// Units run on the rayon pool. No new unit is started once one failed.
    Parallel,
}

/// Per-run configuration threaded through discovery, derivation, the unit
/// factory and the wiring engine.
///
/// # Example
///
/// ```rust
/// use specweave::{Context, Variant};
///
/// let ctx = Context::new("openApi", "generated/typescript").variant(Variant::Script);
/// assert_eq!(ctx.namespace_root, "com");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory scanned for `*.yml` / `*.yaml` specs.
    pub spec_root: Utf8PathBuf,
    /// Shared root under which every unit receives its own output directory.
    pub generation_root: Utf8PathBuf,
    /// Prefix of every generated package, e.g. `com` in `com.billing.api`.
    pub namespace_root: String,
    pub variant: Variant,
    /// Platforms the host toolchain builds for.
    pub targets: Vec<Target>,
    pub execution: Execution,
    /// Re-run every unit even when its stamp says it is up to date.
    pub force: bool,
}

impl Context {
    pub fn new(spec_root: impl Into<Utf8PathBuf>, generation_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            spec_root: spec_root.into(),
            generation_root: generation_root.into(),
            namespace_root: "com".to_string(),
            variant: Variant::Graph,
            targets: Target::ALL.to_vec(),
            execution: Execution::Sequential,
            force: false,
        }
    }

    pub fn namespace_root(mut self, root: impl Into<String>) -> Self {
        self.namespace_root = root.into();
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Directory holding the up-to-date stamps of every unit.
    pub(crate) fn stamp_dir(&self) -> Utf8PathBuf {
        self.generation_root.join(".specweave")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_parts_is_length_prefixed() {
        let a = Hash32::hash_parts([b"ab".as_slice(), b"c".as_slice()]);
        let b = Hash32::hash_parts([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_hex() {
        let hex = Hash32::hash_parts([b"hex-tractor".as_slice()]).to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_context_defaults() {
        let ctx = Context::new("openApi", "build/generated");
        assert_eq!(ctx.variant, Variant::Graph);
        assert_eq!(ctx.execution, Execution::Sequential);
        assert_eq!(ctx.targets.len(), Target::ALL.len());
        assert_eq!(ctx.stamp_dir(), "build/generated/.specweave");
    }
}
