//! Discovery, registration, wiring and generation of a whole spec directory.

use std::time::Instant;

use serde::Serialize;

use crate::barrel::Barrel;
use crate::core::{Context, Variant};
use crate::discovery::discover;
use crate::error::SpecweaveError;
use crate::generator::Generator;
use crate::graph::TaskGraph;
use crate::platform;
use crate::runner::{Diagnostics, Runner};
use crate::sourceset::SourceSet;
use crate::unit::{RegistryBuilder, TaskRegistry};
use crate::utils::as_overhead;
use crate::wiring::{DependencyEdge, Wiring, WiringReport};

/// Entry point of a run.
///
/// ```rust,no_run
/// use specweave::{Context, KotlinGenerator, Pipeline};
///
/// let pipeline = Pipeline::new(Context::new("openApi", "build/generated"));
/// let diagnostics = pipeline.run(&KotlinGenerator::new())?;
/// println!("{diagnostics}");
/// # Ok::<(), specweave::SpecweaveError>(())
/// ```
pub struct Pipeline {
    ctx: Context,
    extra_host_tasks: Vec<String>,
}

impl Pipeline {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            extra_host_tasks: Vec::new(),
        }
    }

    /// Registers an additional host task on top of the ones derived from the
    /// configured targets. Only used by the graph variant.
    pub fn host_task(mut self, name: impl Into<String>) -> Self {
        self.extra_host_tasks.push(name.into());
        self
    }

    /// Builds the registry and the wired task graph without generating
    /// anything.
    pub fn plan(&self) -> Result<Plan, SpecweaveError> {
        let specs = discover(&self.ctx.spec_root)?;
        let registry = RegistryBuilder::new(&self.ctx).extend(specs)?.finish();

        let mut graph = TaskGraph::new();
        if self.ctx.variant == Variant::Graph {
            graph.register_host_tasks(platform::host_tasks(&self.ctx.targets))?;
            graph.register_host_tasks(self.extra_host_tasks.iter().cloned())?;
        }
        graph.close_host_registration();

        let report = Wiring::standard(&self.ctx.targets).apply(&registry, &mut graph)?;

        let sources = match self.ctx.variant {
            Variant::Graph => Some(SourceSet::common_main(&registry)),
            Variant::Script => None,
        };

        Ok(Plan {
            variant: self.ctx.variant,
            registry,
            graph,
            sources,
            report,
        })
    }

    /// Plans, then invokes `generator` for every unit. The script variant
    /// additionally writes the index file, but only once every unit
    /// succeeded.
    pub fn run(&self, generator: &dyn Generator) -> Result<Diagnostics, SpecweaveError> {
        let start = Instant::now();
        let plan = self.plan()?;

        if plan.registry.is_empty() {
            tracing::warn!(root = %self.ctx.spec_root, "no OpenAPI specs found, nothing to generate");
            return Ok(Diagnostics::default());
        }

        tracing::info!(
            units = plan.registry.len(),
            generator = generator.name(),
            "generating clients"
        );

        let mut diagnostics = match Runner::new(&self.ctx, generator).run(&plan.registry) {
            Ok(diagnostics) => diagnostics,
            Err(err) => {
                let blocked = err.unit().map(|id| plan.blocked_by(id)).unwrap_or_default();
                if let Some(id) = err.unit() {
                    tracing::error!(unit = id, blocked = blocked.len(), "generation failed");
                }
                return Err(err.with_blocked(blocked).into());
            }
        };

        if self.ctx.variant == Variant::Script {
            let path = Barrel::from_registry(&plan.registry)
                .write(&self.ctx.generation_root)
                .map_err(crate::error::BuildError::from)?;
            diagnostics.index = Some(path);
        }

        tracing::info!("finished generation {}", as_overhead(start));

        Ok(diagnostics)
    }
}

/// Everything a run would do, computed before any generator is invoked.
pub struct Plan {
    pub variant: Variant,
    pub registry: TaskRegistry,
    pub graph: TaskGraph,
    /// Shared `commonMain` set, graph variant only.
    pub sources: Option<SourceSet>,
    pub report: WiringReport,
}

impl Plan {
    /// Every task that transitively waits for the generation step of unit
    /// `id`. Empty for unknown ids.
    pub fn blocked_by(&self, id: &str) -> Vec<String> {
        let Some(unit) = self.registry.get(id) else {
            return Vec::new();
        };

        let mut blocked: Vec<String> = self
            .graph
            .dependents_of(&unit.task_name())
            .map(|names| names.into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        blocked.sort();
        blocked
    }

    pub fn to_json(&self) -> Result<String, SpecweaveError> {
        let view = PlanView {
            variant: self.variant,
            units: &self.registry,
            sources: self.sources.as_ref(),
            consumers: &self.report.consumers,
            edges: &self.report.edges,
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

#[derive(Serialize)]
struct PlanView<'a> {
    variant: Variant,
    units: &'a TaskRegistry,
    sources: Option<&'a SourceSet>,
    consumers: &'a [(String, &'static str)],
    edges: &'a [DependencyEdge],
}
