//! Generation units and the registry that owns them.
//!
//! A [`RegistryBuilder`] accepts specs one at a time and refuses any spec
//! whose derived names would clash with an earlier one. Once
//! [`RegistryBuilder::finish`] is called the resulting [`TaskRegistry`] is
//! read-only, which is what the wiring engine requires.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::core::Context;
use crate::discovery::SpecFile;
use crate::error::IdentifierError;
use crate::ident::DerivedIdentifier;

/// Prefix of every per-unit generation task in the host graph.
pub const GENERATE_TASK_PREFIX: &str = "openApiGenerate";

/// Aggregate task depending on every generation unit.
pub const AGGREGATE_TASK: &str = "openApiGenerateAll";

/// One generation task bound to exactly one spec and one output location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationUnit {
    /// Same as `ident.task_id`.
    pub id: String,
    pub spec: SpecFile,
    /// `{generation_root}/{task_id}`, never shared between units.
    pub output_dir: Utf8PathBuf,
    /// Flat module written by the script variant,
    /// `{generation_root}/{base_name}-api.ts`.
    pub module_file: Utf8PathBuf,
    pub api_package: String,
    pub model_package: String,
    pub invoker_package: String,
    pub ident: DerivedIdentifier,
}

impl GenerationUnit {
    fn new(ctx: &Context, spec: SpecFile, ident: DerivedIdentifier) -> Self {
        let package = format!("{}.{}", ctx.namespace_root, ident.package_name);

        Self {
            id: ident.task_id.clone(),
            output_dir: ctx.generation_root.join(&ident.task_id),
            module_file: ctx
                .generation_root
                .join(format!("{}-api.ts", ident.base_name)),
            api_package: format!("{package}.api"),
            model_package: format!("{package}.api.model"),
            invoker_package: format!("{package}.api.client"),
            spec,
            ident,
        }
    }

    pub fn input_path(&self) -> &Utf8Path {
        self.spec.path()
    }

    /// Name of this unit's generation step in the host graph.
    pub fn task_name(&self) -> String {
        format!("{GENERATE_TASK_PREFIX}{}", self.ident.namespace_name)
    }

    /// Generated Kotlin sources, fed into the shared `commonMain` set.
    pub fn source_dir(&self) -> Utf8PathBuf {
        self.output_dir.join("src/commonMain/kotlin")
    }

    /// Module specifier used by the index file, e.g. `./billing-api`.
    pub fn module_specifier(&self) -> String {
        format!("./{}-api", self.ident.base_name)
    }
}

/// The frozen, ordered set of generation units of a single run.
///
/// Iteration order is discovery order.
#[derive(Debug, Default, Serialize)]
pub struct TaskRegistry {
    units: Vec<GenerationUnit>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GenerationUnit> {
        self.index.get(id).map(|&i| &self.units[i])
    }

    pub fn units(&self) -> &[GenerationUnit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GenerationUnit> {
        self.units.iter()
    }
}

impl<'a> IntoIterator for &'a TaskRegistry {
    type Item = &'a GenerationUnit;
    type IntoIter = std::slice::Iter<'a, GenerationUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Claim {
    TaskId,
    Package,
    Namespace,
    OutputDir,
    Module,
}

impl Claim {
    fn label(self) -> &'static str {
        match self {
            Claim::TaskId => "task id",
            Claim::Package => "package name",
            Claim::Namespace => "namespace",
            Claim::OutputDir => "output directory",
            Claim::Module => "module file",
        }
    }
}

/// Builds a [`TaskRegistry`] out of discovered specs.
pub struct RegistryBuilder<'a> {
    ctx: &'a Context,
    units: Vec<GenerationUnit>,
    claims: HashMap<(Claim, String), usize>,
}

impl<'a> RegistryBuilder<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            units: Vec::new(),
            claims: HashMap::new(),
        }
    }

    /// Adds a unit for `spec`.
    ///
    /// Adding the same path twice is a no-op. Two different specs deriving
    /// the same task id, package, namespace, output directory or module file
    /// are rejected, and nothing is added.
    pub fn add(&mut self, spec: SpecFile) -> Result<&GenerationUnit, IdentifierError> {
        if let Some(i) = self.units.iter().position(|unit| unit.spec == spec) {
            return Ok(&self.units[i]);
        }

        let ident = DerivedIdentifier::derive(spec.file_name());
        ident.validate(spec.path())?;

        let unit = GenerationUnit::new(self.ctx, spec, ident);

        if unit.task_name() == AGGREGATE_TASK {
            return Err(IdentifierError::Degenerate {
                file: unit.spec.path().to_owned(),
                reason: format!("'{AGGREGATE_TASK}' is reserved"),
            });
        }

        let claims = [
            (Claim::TaskId, unit.ident.task_id.clone()),
            (Claim::Package, unit.ident.package_name.clone()),
            (Claim::Namespace, unit.ident.namespace_name.clone()),
            (Claim::OutputDir, unit.output_dir.to_string()),
            (Claim::Module, unit.module_file.to_string()),
        ];

        for claim in &claims {
            if let Some(&owner) = self.claims.get(claim) {
                return Err(IdentifierError::Collision {
                    kind: claim.0.label(),
                    value: claim.1.clone(),
                    first: self.units[owner].spec.path().to_owned(),
                    second: unit.spec.path().to_owned(),
                });
            }
        }

        let position = self.units.len();
        self.claims
            .extend(claims.into_iter().map(|claim| (claim, position)));

        tracing::debug!(id = %unit.id, spec = %unit.spec.path(), "registered generation unit");

        self.units.push(unit);
        Ok(&self.units[position])
    }

    pub fn extend(mut self, specs: impl IntoIterator<Item = SpecFile>) -> Result<Self, IdentifierError> {
        for spec in specs {
            self.add(spec)?;
        }
        Ok(self)
    }

    /// Freezes the registry. No unit can be added afterwards.
    pub fn finish(self) -> TaskRegistry {
        let index = self
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.id.clone(), i))
            .collect();

        TaskRegistry {
            units: self.units,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn ctx() -> Context {
        Context::new("openApi", "build/generated")
    }

    fn specs(names: &[&str]) -> Vec<SpecFile> {
        names
            .iter()
            .map(|name| SpecFile::new(format!("openApi/{name}")))
            .collect()
    }

    #[test]
    fn test_unit_layout() {
        let ctx = ctx();
        let registry = RegistryBuilder::new(&ctx)
            .extend(specs(&["hex-tractor-open-api.yml"]))
            .unwrap()
            .finish();

        let unit = registry.get("hexTractor").unwrap();
        assert_eq!(unit.output_dir, "build/generated/hexTractor");
        assert_eq!(unit.api_package, "com.hextractor.api");
        assert_eq!(unit.model_package, "com.hextractor.api.model");
        assert_eq!(unit.invoker_package, "com.hextractor.api.client");
        assert_eq!(unit.task_name(), "openApiGenerateHexTractor");
        assert_eq!(
            unit.source_dir(),
            "build/generated/hexTractor/src/commonMain/kotlin"
        );
        assert_eq!(unit.module_file, "build/generated/hex-tractor-api.ts");
        assert_eq!(unit.module_specifier(), "./hex-tractor-api");
        assert_eq!(unit.input_path(), "openApi/hex-tractor-open-api.yml");
    }

    #[test]
    fn test_one_unit_per_spec() {
        let ctx = ctx();
        let names = ["a-api.yml", "b_api.yaml", "c-open-api.yml", "d.yml"];
        let registry = RegistryBuilder::new(&ctx)
            .extend(specs(&names))
            .unwrap()
            .finish();

        assert_eq!(registry.len(), names.len());
        let dirs: HashSet<_> = registry.iter().map(|u| &u.output_dir).collect();
        let ids: HashSet<_> = registry.iter().map(|u| &u.id).collect();
        assert_eq!(dirs.len(), names.len());
        assert_eq!(ids.len(), names.len());
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let ctx = ctx();
        let registry = RegistryBuilder::new(&ctx)
            .extend(specs(&["zeta.yml", "alpha.yml"]))
            .unwrap()
            .finish();

        let ids: Vec<_> = registry.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["zeta", "alpha"]);
    }

    #[test]
    fn test_extension_collision() {
        let ctx = ctx();
        let err = RegistryBuilder::new(&ctx)
            .extend(specs(&["billing.yml", "billing.yaml"]))
            .err()
            .unwrap();

        match err {
            IdentifierError::Collision { kind, first, second, .. } => {
                assert_eq!(kind, "task id");
                assert_eq!(first, "openApi/billing.yml");
                assert_eq!(second, "openApi/billing.yaml");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_marker_collision() {
        let ctx = ctx();
        let result = RegistryBuilder::new(&ctx).extend(specs(&["billing-api.yml", "billing_open_api.yml"]));
        assert!(matches!(result, Err(IdentifierError::Collision { .. })));
    }

    #[test]
    fn test_package_only_collision() {
        let ctx = ctx();
        let err = RegistryBuilder::new(&ctx)
            .extend(specs(&["ab-c.yml", "a-bc.yml"]))
            .err()
            .unwrap();

        assert!(matches!(err, IdentifierError::Collision { kind: "package name", .. }));
    }

    #[test]
    fn test_failed_add_leaves_builder_untouched() {
        let ctx = ctx();
        let mut builder = RegistryBuilder::new(&ctx);
        builder.add(SpecFile::new("openApi/ab-c.yml")).unwrap();
        assert!(builder.add(SpecFile::new("openApi/a-bc.yml")).is_err());
        builder.add(SpecFile::new("openApi/other.yml")).unwrap();

        let registry = builder.finish();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("aBc").is_none());
    }

    #[test]
    fn test_same_path_twice_is_noop() {
        let ctx = ctx();
        let registry = RegistryBuilder::new(&ctx)
            .extend(specs(&["users.yml", "users.yml"]))
            .unwrap()
            .finish();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_degenerate_spec_is_rejected() {
        let ctx = ctx();
        let result = RegistryBuilder::new(&ctx).extend(specs(&["-open-api.yml"]));
        assert!(matches!(result, Err(IdentifierError::Degenerate { .. })));
    }

    #[test]
    fn test_reserved_aggregate_name() {
        let ctx = ctx();
        let result = RegistryBuilder::new(&ctx).extend(specs(&["all-api.yml"]));
        assert!(matches!(result, Err(IdentifierError::Degenerate { .. })));
    }

    #[test]
    fn test_custom_namespace_root() {
        let ctx = ctx().namespace_root("io.github.rotesblatt");
        let registry = RegistryBuilder::new(&ctx)
            .extend(specs(&["billing_api.yaml"]))
            .unwrap()
            .finish();
        assert_eq!(
            registry.get("billing").unwrap().api_package,
            "io.github.rotesblatt.billing.api"
        );
    }
}
