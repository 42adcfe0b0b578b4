//! The host build graph we hand generation tasks and edges to.
//!
//! The graph has a simple lifecycle. The host toolchain first registers its
//! own tasks, then closes registration. Only then may the wiring engine add
//! the generation tasks and the edges that make every consumer wait for them,
//! and it may do so exactly once.
//!
//! Edges point from a producer to the task that depends on it, so a
//! topological order of the graph is a valid execution order.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use serde::Serialize;

use crate::error::WiringError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskKind {
    /// Registered by the host toolchain.
    Host,
    /// Generation step of one unit.
    Generate { unit: String },
    /// Depends on every generation step.
    Aggregate,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: TaskKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Closed,
    Wired,
}

pub struct TaskGraph {
    pub(crate) graph: Graph<TaskNode, ()>,
    names: HashMap<String, NodeIndex>,
    phase: Phase,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            names: HashMap::new(),
            phase: Phase::Registering,
        }
    }

    /// Registers a host task. Registering an existing name returns the
    /// existing node.
    pub fn register_host_task(&mut self, name: impl Into<String>) -> Result<NodeIndex, WiringError> {
        let name = name.into();

        if let Some(&index) = self.names.get(&name) {
            return Ok(index);
        }

        if self.phase != Phase::Registering {
            return Err(WiringError::RegistrationClosed(name));
        }

        Ok(self.insert(name, TaskKind::Host))
    }

    pub fn register_host_tasks<I, S>(&mut self, names: I) -> Result<(), WiringError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.register_host_task(name)?;
        }
        Ok(())
    }

    /// Ends the host registration phase. Wiring may start afterwards.
    pub fn close_host_registration(&mut self) {
        if self.phase == Phase::Registering {
            self.phase = Phase::Closed;
        }
    }

    pub fn is_wired(&self) -> bool {
        self.phase == Phase::Wired
    }

    pub(crate) fn begin_wiring(&self) -> Result<(), WiringError> {
        match self.phase {
            Phase::Registering => Err(WiringError::HostTasksPending),
            Phase::Closed => Ok(()),
            Phase::Wired => Err(WiringError::AlreadyWired),
        }
    }

    pub(crate) fn finish_wiring(&mut self) {
        self.phase = Phase::Wired;
    }

    /// Inserts a task owned by this crate (generation or aggregate).
    pub(crate) fn add_internal_task(
        &mut self,
        name: impl Into<String>,
        kind: TaskKind,
    ) -> Result<NodeIndex, WiringError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(WiringError::DuplicateTask(name));
        }
        Ok(self.insert(name, kind))
    }

    fn insert(&mut self, name: String, kind: TaskKind) -> NodeIndex {
        let index = self.graph.add_node(TaskNode {
            name: name.clone(),
            kind,
        });
        self.names.insert(name, index);
        index
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, WiringError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| WiringError::UnknownTask(name.to_string()))
    }

    /// Makes `consumer` depend on `producer`. Returns `false` when the edge
    /// already existed.
    pub fn add_dependency(&mut self, consumer: &str, producer: &str) -> Result<bool, WiringError> {
        let consumer = self.index_of(consumer)?;
        let producer = self.index_of(producer)?;

        if self.graph.find_edge(producer, consumer).is_some() {
            return Ok(false);
        }

        self.graph.add_edge(producer, consumer, ());
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&TaskNode> {
        self.names.get(name).map(|&index| &self.graph[index])
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.graph.node_weights()
    }

    /// Names of the tasks registered by the host, in registration order.
    pub fn host_task_names(&self) -> Vec<String> {
        self.tasks()
            .filter(|task| task.kind == TaskKind::Host)
            .map(|task| task.name.clone())
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of `name`, sorted.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&str>, WiringError> {
        let index = self.index_of(name)?;
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .map(|dep| self.graph[dep].name.as_str())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Every task that transitively depends on `name`, sorted. These are the
    /// tasks that can't run when `name` fails.
    pub fn dependents_of(&self, name: &str) -> Result<Vec<&str>, WiringError> {
        let start = self.index_of(name)?;
        let mut bfs = Bfs::new(&self.graph, start);
        let mut names = Vec::new();

        while let Some(index) = bfs.next(&self.graph) {
            if index != start {
                names.push(self.graph[index].name.as_str());
            }
        }

        names.sort_unstable();
        Ok(names)
    }

    /// Every task `name` transitively depends on, sorted.
    pub fn prerequisites_of(&self, name: &str) -> Result<Vec<&str>, WiringError> {
        let start = self.index_of(name)?;
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut names = Vec::new();

        while let Some(index) = bfs.next(reversed) {
            if index != start {
                names.push(self.graph[index].name.as_str());
            }
        }

        names.sort_unstable();
        Ok(names)
    }

    /// Tasks in an order that respects every dependency.
    pub fn topological_order(&self) -> Result<Vec<&str>, WiringError> {
        petgraph::algo::toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .map(|index| self.graph[index].name.as_str())
                    .collect()
            })
            .map_err(|cycle| WiringError::Cycle(self.graph[cycle.node_id()].name.clone()))
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskGraph {
    /// Renders the graph as a Mermaid flowchart. Host tasks without any
    /// dependency on generation are omitted to keep the chart readable.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let task = &self.graph[index];
            let connected = self.graph.neighbors_undirected(index).next().is_some();
            if task.kind == TaskKind::Host && !connected {
                continue;
            }

            let name = task.name.replace('"', "\\\"");
            match task.kind {
                TaskKind::Host => writeln!(f, "    {}[\"{}\"]", index.index(), name)?,
                TaskKind::Generate { .. } => writeln!(f, "    {}([\"{}\"])", index.index(), name)?,
                TaskKind::Aggregate => writeln!(f, "    {}{{\"{}\"}}", index.index(), name)?,
            }
        }

        for edge in self.graph.raw_edges() {
            writeln!(
                f,
                "    {} --> {}",
                edge.source().index(),
                edge.target().index()
            )?;
        }

        Ok(())
    }
}
