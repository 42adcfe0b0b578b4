//! Dependency wiring.
//!
//! The set of generation units is only known once discovery ran, so consumer
//! tasks can't name their generation prerequisites up front. Instead a static
//! table of [`ConsumerRule`]s describes, by task name, which categories of
//! host task have to wait for generation. The table is evaluated once, against
//! a snapshot of the host task names, after the [`TaskRegistry`] is frozen.
//!
//! A second pass handles the per-platform relationships captured by
//! [`ChainRule`]s. Those are 1:1 (the metadata of platform X waits for the
//! compilation of platform X) rather than N:1, and are matched on the exact
//! platform name.

use std::borrow::Cow;

use serde::Serialize;

use crate::error::WiringError;
use crate::graph::{TaskGraph, TaskKind};
use crate::platform::Target;
use crate::unit::{AGGREGATE_TASK, TaskRegistry};

/// A predicate over task names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Exact(Cow<'static, str>),
    Prefix(Cow<'static, str>),
    Suffix(Cow<'static, str>),
    Contains(Cow<'static, str>),
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Predicate::Exact(value) => name == value.as_ref(),
            Predicate::Prefix(value) => name.starts_with(value.as_ref()),
            Predicate::Suffix(value) => name.ends_with(value.as_ref()),
            Predicate::Contains(value) => name.contains(value.as_ref()),
            Predicate::AllOf(all) => all.iter().all(|p| p.matches(name)),
            Predicate::AnyOf(any) => any.iter().any(|p| p.matches(name)),
        }
    }
}

fn prefix(value: &'static str) -> Predicate {
    Predicate::Prefix(Cow::Borrowed(value))
}

fn suffix(value: &'static str) -> Predicate {
    Predicate::Suffix(Cow::Borrowed(value))
}

fn contains(value: &'static str) -> Predicate {
    Predicate::Contains(Cow::Borrowed(value))
}

/// A category of host task that must wait for every generation unit, and
/// the kind recorded for the edges it produces.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerRule {
    pub name: &'static str,
    pub kind: EdgeKind,
    pub predicate: Predicate,
}

impl ConsumerRule {
    pub fn new(name: &'static str, predicate: Predicate) -> Self {
        Self {
            name,
            kind: EdgeKind::Generation,
            predicate,
        }
    }

    pub fn kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Per-platform dependency: tasks containing `{consumer_marker}{platform}`
/// and ending with `consumer_suffix` depend on `{producer_prefix}{platform}`.
#[derive(Debug, Clone, Serialize)]
pub struct ChainRule {
    pub name: &'static str,
    pub kind: EdgeKind,
    pub consumer_marker: &'static str,
    pub consumer_suffix: &'static str,
    pub producer_prefix: &'static str,
}

impl ChainRule {
    fn consumer_matches(&self, platform: &str, task: &str) -> bool {
        task.ends_with(self.consumer_suffix) && task.contains(&format!("{}{platform}", self.consumer_marker))
    }

    fn producer(&self, platform: &str) -> String {
        format!("{}{platform}", self.producer_prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Consumer waits for a generation unit.
    Generation,
    /// The aggregate task waits for a generation unit.
    Aggregate,
    /// Platform specific chain.
    Chain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub consumer: String,
    pub producer: String,
    pub kind: EdgeKind,
}

/// Audit trail of a wiring pass.
#[derive(Debug, Default, Serialize)]
pub struct WiringReport {
    /// Host tasks matched by a consumer rule, with the first matching rule.
    pub consumers: Vec<(String, &'static str)>,
    pub edges: Vec<DependencyEdge>,
}

impl WiringReport {
    pub fn edges_of(&self, kind: EdgeKind) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    fn push(&mut self, consumer: &str, producer: &str, kind: EdgeKind) {
        self.edges.push(DependencyEdge {
            consumer: consumer.to_string(),
            producer: producer.to_string(),
            kind,
        });
    }
}

/// The rule table plus the platforms the chain rules are evaluated for.
#[derive(Debug, Clone, Serialize)]
pub struct Wiring {
    pub rules: Vec<ConsumerRule>,
    pub chains: Vec<ChainRule>,
    pub platforms: Vec<&'static str>,
}

impl Wiring {
    /// Rules covering compilation, packaging, bundling, metadata and
    /// publishing tasks of a Kotlin multiplatform build.
    pub fn standard(targets: &[Target]) -> Self {
        let rules = vec![
            ConsumerRule::new("compilation", prefix("compileKotlin")),
            ConsumerRule::new("metadata-compilation", suffix("KotlinMetadata")),
            ConsumerRule::new("packaging", suffix("Jar")),
            ConsumerRule::new("compiled-library", suffix("Klibrary")),
            ConsumerRule::new(
                "bundling",
                Predicate::AnyOf(vec![
                    prefix("link"),
                    Predicate::AllOf(vec![prefix("assemble"), contains("Framework")]),
                ]),
            ),
            ConsumerRule::new(
                "publication-metadata",
                Predicate::AllOf(vec![contains("generateMetadataFileFor"), suffix("Publication")]),
            ),
            ConsumerRule::new(
                "pom",
                Predicate::AllOf(vec![prefix("generatePomFileFor"), suffix("Publication")]),
            ),
            ConsumerRule::new("publishing", prefix("publish")),
        ];

        let chains = vec![ChainRule {
            name: "metadata-after-compilation",
            kind: EdgeKind::Chain,
            consumer_marker: "generateMetadataFileFor",
            consumer_suffix: "Publication",
            producer_prefix: "compileKotlin",
        }];

        Self {
            rules,
            chains,
            platforms: targets.iter().map(|target| target.name()).collect(),
        }
    }

    /// First rule matching `task`, if any.
    pub fn rule_for(&self, task: &str) -> Option<&ConsumerRule> {
        self.rules.iter().find(|rule| rule.predicate.matches(task))
    }

    /// Adds every generation unit of `registry` to `graph` and wires it as a
    /// prerequisite of every consumer.
    ///
    /// Fails unless the host closed task registration, and fails when the
    /// graph has been wired before.
    pub fn apply(&self, registry: &TaskRegistry, graph: &mut TaskGraph) -> Result<WiringReport, WiringError> {
        graph.begin_wiring()?;

        let mut report = WiringReport::default();

        // Snapshot before generation tasks exist, they are never consumers.
        let consumers: Vec<(String, &ConsumerRule)> = graph
            .host_task_names()
            .into_iter()
            .filter_map(|task| self.rule_for(&task).map(|rule| (task, rule)))
            .collect();
        report.consumers = consumers
            .iter()
            .map(|(task, rule)| (task.clone(), rule.name))
            .collect();

        graph.add_internal_task(AGGREGATE_TASK, TaskKind::Aggregate)?;

        let producers: Vec<String> = registry.iter().map(|unit| unit.task_name()).collect();
        for (unit, producer) in registry.iter().zip(&producers) {
            graph.add_internal_task(
                producer.as_str(),
                TaskKind::Generate {
                    unit: unit.id.clone(),
                },
            )?;

            if graph.add_dependency(AGGREGATE_TASK, producer)? {
                report.push(AGGREGATE_TASK, producer, EdgeKind::Aggregate);
            }
        }

        for (consumer, rule) in &consumers {
            for producer in &producers {
                if graph.add_dependency(consumer, producer)? {
                    report.push(consumer, producer, rule.kind);
                }
            }
        }

        let hosts = graph.host_task_names();
        for platform in &self.platforms {
            for chain in &self.chains {
                let producer = chain.producer(platform);
                if !graph.contains(&producer) {
                    tracing::debug!(chain = chain.name, %producer, "chain producer not registered, skipping");
                    continue;
                }

                for consumer in hosts.iter().filter(|task| chain.consumer_matches(platform, task)) {
                    if graph.add_dependency(consumer, &producer)? {
                        report.push(consumer, &producer, chain.kind);
                    }
                }
            }
        }

        graph.topological_order()?;
        graph.finish_wiring();

        tracing::info!(
            units = registry.len(),
            consumers = report.consumers.len(),
            edges = report.edges.len(),
            "wired task graph"
        );

        Ok(report)
    }
}
