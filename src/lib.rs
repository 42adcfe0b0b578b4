#![forbid(unsafe_code)]
//! Turns a directory of OpenAPI specs into client generation tasks.
//!
//! Every `*.yml` / `*.yaml` file found directly in the spec directory becomes
//! one [`GenerationUnit`] with its own output directory and package names
//! derived from the file name. In the graph variant each unit is added to the
//! host [`TaskGraph`] as a generation task that every compilation, packaging,
//! bundling and publishing task has to wait for. In the script variant each
//! unit writes one module, and an `index.ts` re-exports all of them under
//! their namespaces.

mod barrel;
mod core;
mod discovery;
mod error;
mod generator;
mod graph;
mod ident;
mod pipeline;
mod platform;
mod runner;
mod sourceset;
mod unit;
mod utils;
mod wiring;

pub use crate::barrel::Barrel;
pub use crate::core::{Context, Execution, Variant};
pub use crate::discovery::{SpecFile, discover};
pub use crate::error::*;
pub use crate::generator::{Generator, KotlinGenerator, ZodGenerator};
pub use crate::graph::{TaskGraph, TaskKind, TaskNode};
pub use crate::ident::{DerivedIdentifier, SPEC_EXTENSIONS};
pub use crate::pipeline::{Pipeline, Plan};
pub use crate::platform::{Target, host_tasks};
pub use crate::runner::{Diagnostics, Outcome, Runner, UnitExecution};
pub use crate::sourceset::{COMMON_MAIN, SourceSet};
pub use crate::unit::{AGGREGATE_TASK, GENERATE_TASK_PREFIX, GenerationUnit, RegistryBuilder, TaskRegistry};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
pub use crate::wiring::{ChainRule, ConsumerRule, DependencyEdge, EdgeKind, Predicate, Wiring, WiringReport};
