mod diagnostics;

use std::fs;
use std::time::Instant;

use camino::Utf8PathBuf;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::core::{Context, Execution, Hash32, Variant};
use crate::error::BuildError;
use crate::generator::Generator;
use crate::unit::{GenerationUnit, TaskRegistry};

pub use diagnostics::{Diagnostics, Outcome, UnitExecution};

/// Invokes the external generator once per unit of a frozen registry.
pub struct Runner<'a> {
    ctx: &'a Context,
    generator: &'a dyn Generator,
}

impl<'a> Runner<'a> {
    pub fn new(ctx: &'a Context, generator: &'a dyn Generator) -> Self {
        Self { ctx, generator }
    }

    /// Runs every unit, stopping at the first failure.
    ///
    /// In sequential mode units run in registry order and nothing runs after
    /// a failed unit. In parallel mode units that were already started are
    /// allowed to finish, but no further unit is started.
    pub fn run(&self, registry: &TaskRegistry) -> Result<Diagnostics, BuildError> {
        if registry.is_empty() {
            return Ok(Diagnostics::default());
        }

        let root_span = tracing::info_span!("generating");
        root_span.pb_set_length(registry.len() as u64);
        root_span.pb_set_style(&crate::utils::STYLE_BAR);
        root_span.pb_set_message("Generating clients...");
        let _enter = root_span.enter();

        let executions = match self.ctx.execution {
            Execution::Sequential => registry
                .iter()
                .map(|unit| self.run_tracked(&root_span, unit))
                .collect::<Result<Vec<_>, _>>()?,
            Execution::Parallel => registry
                .units()
                .par_iter()
                .map(|unit| self.run_tracked(&root_span, unit))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Diagnostics {
            executions,
            index: None,
        })
    }

    fn run_tracked(&self, root: &Span, unit: &GenerationUnit) -> Result<UnitExecution, BuildError> {
        let result = self.run_unit(root, unit);
        root.pb_inc(1);
        result
    }

    fn run_unit(&self, root: &Span, unit: &GenerationUnit) -> Result<UnitExecution, BuildError> {
        let span = tracing::info_span!(parent: root, "unit", id = %unit.id);
        span.pb_set_style(&crate::utils::STYLE_TASK);
        span.pb_set_message(&format!("Generating {}", unit.id));
        let _enter = span.enter();

        let start = Instant::now();
        let stamp = Stamp::compute(self.ctx, unit, self.generator)?;

        if !self.ctx.force && self.output_exists(unit) && stamp.is_current() {
            tracing::debug!(id = %unit.id, "up to date");
            return Ok(UnitExecution {
                unit: unit.id.clone(),
                outcome: Outcome::UpToDate,
                duration: start.elapsed(),
            });
        }

        stamp.clear()?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.generator.generate(unit)
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                return Err(BuildError::Generator {
                    unit: unit.id.clone(),
                    file: unit.input_path().to_owned(),
                    source,
                    blocked: Vec::new(),
                });
            }
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    String::from("unknown payload")
                };
                return Err(BuildError::Panic {
                    unit: unit.id.clone(),
                    message: msg,
                    blocked: Vec::new(),
                });
            }
        }

        stamp.write()?;

        let duration = start.elapsed();
        tracing::info!(id = %unit.id, spec = %unit.spec.file_name(), "generated in {duration:.2?}");

        Ok(UnitExecution {
            unit: unit.id.clone(),
            outcome: Outcome::Generated,
            duration,
        })
    }

    fn output_exists(&self, unit: &GenerationUnit) -> bool {
        match self.ctx.variant {
            Variant::Graph => unit.output_dir.is_dir(),
            Variant::Script => unit.module_file.is_file(),
        }
    }
}

/// Fingerprint of everything a unit's output depends on, recorded after a
/// successful run.
struct Stamp {
    path: Utf8PathBuf,
    hash: Hash32,
}

impl Stamp {
    fn compute(ctx: &Context, unit: &GenerationUnit, generator: &dyn Generator) -> Result<Self, BuildError> {
        let spec = fs::read(unit.input_path())
            .map_err(|e| BuildError::Spec(unit.input_path().to_owned(), e))?;
        let fingerprint = generator.fingerprint();

        let hash = Hash32::hash_parts([
            spec.as_slice(),
            fingerprint.as_bytes(),
            unit.api_package.as_bytes(),
            unit.model_package.as_bytes(),
            unit.invoker_package.as_bytes(),
            unit.output_dir.as_str().as_bytes(),
            unit.module_file.as_str().as_bytes(),
        ]);

        Ok(Self {
            path: ctx.stamp_dir().join(format!("{}.stamp", unit.id)),
            hash,
        })
    }

    fn is_current(&self) -> bool {
        fs::read_to_string(&self.path).is_ok_and(|text| text.trim() == self.hash.to_hex())
    }

    fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn write(&self) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, self.hash.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use camino::Utf8Path;

    use super::*;
    use crate::discovery::SpecFile;
    use crate::error::GeneratorError;
    use crate::unit::RegistryBuilder;

    /// Records invocations and fails for the listed unit ids.
    struct Recorder {
        calls: Mutex<Vec<String>>,
        failing: Vec<&'static str>,
    }

    impl Recorder {
        fn new(failing: &[&'static str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing: failing.to_vec(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Generator for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn fingerprint(&self) -> String {
            "recorder".into()
        }

        fn generate(&self, unit: &GenerationUnit) -> Result<(), GeneratorError> {
            self.calls.lock().unwrap().push(unit.id.clone());
            if self.failing.contains(&unit.id.as_str()) {
                return Err(GeneratorError::Exit {
                    program: "recorder".into(),
                    code: Some(1),
                    stderr: String::new(),
                });
            }
            fs::create_dir_all(&unit.output_dir).unwrap();
            Ok(())
        }
    }

    fn setup(names: &[&str]) -> (tempfile::TempDir, Context, TaskRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
        let specs = root.join("openApi");
        fs::create_dir_all(&specs).unwrap();

        let files: Vec<_> = names
            .iter()
            .map(|name| {
                let path = specs.join(name);
                fs::write(&path, format!("openapi: 3.0.0 # {name}")).unwrap();
                SpecFile::new(path)
            })
            .collect();

        let ctx = Context::new(&specs, root.join("build/generated"));
        let registry = RegistryBuilder::new(&ctx).extend(files).unwrap().finish();
        (dir, ctx, registry)
    }

    #[test]
    fn test_sequential_runs_in_order() {
        let (_dir, ctx, registry) = setup(&["zeta.yml", "alpha.yml", "mid.yml"]);
        let generator = Recorder::new(&[]);

        let diagnostics = Runner::new(&ctx, &generator).run(&registry).unwrap();
        assert_eq!(generator.calls(), ["zeta", "alpha", "mid"]);
        assert_eq!(diagnostics.generated(), 3);
    }

    #[test]
    fn test_fail_fast() {
        let (_dir, ctx, registry) = setup(&["a.yml", "b.yml", "c.yml"]);
        let generator = Recorder::new(&["b"]);

        let err = Runner::new(&ctx, &generator).run(&registry).unwrap_err();
        assert_eq!(err.unit(), Some("b"));
        assert_eq!(generator.calls(), ["a", "b"]);
    }

    #[test]
    fn test_second_run_is_up_to_date() {
        let (_dir, ctx, registry) = setup(&["a.yml", "b.yml"]);
        let generator = Recorder::new(&[]);
        let runner = Runner::new(&ctx, &generator);

        runner.run(&registry).unwrap();
        let diagnostics = runner.run(&registry).unwrap();

        assert_eq!(diagnostics.up_to_date(), 2);
        assert_eq!(generator.calls().len(), 2);
    }

    #[test]
    fn test_changed_spec_is_regenerated() {
        let (_dir, ctx, registry) = setup(&["a.yml", "b.yml"]);
        let generator = Recorder::new(&[]);
        let runner = Runner::new(&ctx, &generator);

        runner.run(&registry).unwrap();
        fs::write(registry.get("b").unwrap().input_path(), "openapi: 3.1.0").unwrap();
        let diagnostics = runner.run(&registry).unwrap();

        assert_eq!(diagnostics.generated(), 1);
        assert_eq!(generator.calls(), ["a", "b", "b"]);
    }

    #[test]
    fn test_force_ignores_stamps() {
        let (_dir, ctx, registry) = setup(&["a.yml"]);
        let ctx = ctx.force(true);
        let generator = Recorder::new(&[]);
        let runner = Runner::new(&ctx, &generator);

        runner.run(&registry).unwrap();
        runner.run(&registry).unwrap();
        assert_eq!(generator.calls(), ["a", "a"]);
    }

    #[test]
    fn test_missing_output_is_regenerated() {
        let (_dir, ctx, registry) = setup(&["a.yml"]);
        let generator = Recorder::new(&[]);
        let runner = Runner::new(&ctx, &generator);

        runner.run(&registry).unwrap();
        fs::remove_dir_all(&registry.get("a").unwrap().output_dir).unwrap();
        runner.run(&registry).unwrap();
        assert_eq!(generator.calls(), ["a", "a"]);
    }

    #[test]
    fn test_parallel_runs_every_unit() {
        let (_dir, ctx, registry) = setup(&["a.yml", "b.yml", "c.yml", "d.yml"]);
        let ctx = ctx.execution(Execution::Parallel);
        let generator = Recorder::new(&[]);

        let diagnostics = Runner::new(&ctx, &generator).run(&registry).unwrap();
        let mut calls = generator.calls();
        calls.sort();
        assert_eq!(calls, ["a", "b", "c", "d"]);

        let order: Vec<_> = diagnostics.executions.iter().map(|e| e.unit.as_str()).collect();
        assert_eq!(order, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parallel_failure() {
        let (_dir, ctx, registry) = setup(&["a.yml", "b.yml"]);
        let ctx = ctx.execution(Execution::Parallel);
        let generator = Recorder::new(&["a"]);

        let err = Runner::new(&ctx, &generator).run(&registry).unwrap_err();
        assert_eq!(err.unit(), Some("a"));
    }

    #[test]
    fn test_failed_unit_leaves_no_stamp() {
        let (_dir, ctx, registry) = setup(&["a.yml"]);
        let generator = Recorder::new(&["a"]);

        Runner::new(&ctx, &generator).run(&registry).unwrap_err();
        assert!(!ctx.stamp_dir().join("a.stamp").exists());
    }

    #[test]
    fn test_missing_spec_names_file() {
        let (_dir, ctx, registry) = setup(&["a.yml"]);
        fs::remove_file(registry.get("a").unwrap().input_path()).unwrap();
        let generator = Recorder::new(&[]);

        let err = Runner::new(&ctx, &generator).run(&registry).unwrap_err();
        assert!(matches!(err, BuildError::Spec(path, _) if path.ends_with("a.yml")));
    }
}
