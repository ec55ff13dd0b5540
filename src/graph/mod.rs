// ABOUTME: Directed dependency graph over resource identifiers.
// ABOUTME: Kahn topological ordering, cycle reporting, and parallel-safe deployment waves.

mod error;

pub use error::{CyclicDependencyError, GraphError};

use nonempty::NonEmpty;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::types::ResourceId;

/// One deployment wave: resources whose dependencies are all in earlier waves.
pub type Batch = NonEmpty<ResourceId>;

/// Ordering constraints between resources.
///
/// Edges are stored twice: `dependents` maps a node to everything that must wait
/// for it, `dependencies` maps a node to everything it waits for. Node iteration
/// is sorted, so ordering and batching are deterministic for a given graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<ResourceId>,
    dependents: BTreeMap<ResourceId, Vec<ResourceId>>,
    dependencies: BTreeMap<ResourceId, Vec<ResourceId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, id: ResourceId) {
        if self.nodes.insert(id.clone()) {
            self.dependents.insert(id.clone(), Vec::new());
            self.dependencies.insert(id.clone(), Vec::new());
            tracing::debug!(resource = %id, "added graph node");
        }
    }

    /// Record that `dependent` must be deployed after `dependency`.
    ///
    /// Both endpoints are added as nodes if missing; duplicate edges are ignored.
    pub fn add_dependency(&mut self, dependent: ResourceId, dependency: ResourceId) {
        self.add_node(dependent.clone());
        self.add_node(dependency.clone());

        let forward = self.dependents.entry(dependency.clone()).or_default();
        if !forward.contains(&dependent) {
            forward.push(dependent.clone());
        }

        let reverse = self.dependencies.entry(dependent.clone()).or_default();
        if !reverse.contains(&dependency) {
            reverse.push(dependency.clone());
        }

        tracing::debug!(%dependent, %dependency, "added dependency");
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceId> {
        self.nodes.iter()
    }

    /// Nodes `id` depends on.
    pub fn dependencies(&self, id: &ResourceId) -> &[ResourceId] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes that depend on `id`.
    pub fn dependents(&self, id: &ResourceId) -> &[ResourceId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes in dependency order (Kahn's algorithm).
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependencyError` carrying a representative cycle when
    /// some nodes can never reach in-degree zero.
    pub fn ordered_resources(&self) -> Result<Vec<ResourceId>, CyclicDependencyError> {
        let mut in_degree: BTreeMap<&ResourceId, usize> = self
            .nodes
            .iter()
            .map(|node| (node, self.dependencies(node).len()))
            .collect();

        let mut queue: VecDeque<&ResourceId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut ordered = Vec::with_capacity(self.nodes.len());

        while let Some(node) = queue.pop_front() {
            ordered.push(node.clone());

            for dependent in self.dependents(node) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if ordered.len() < self.nodes.len() {
            let stuck: BTreeSet<&ResourceId> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(node, _)| node)
                .collect();
            let cycle_path = self.find_cycle_path(&stuck);
            tracing::warn!(stuck = stuck.len(), "dependency cycle detected");
            return Err(CyclicDependencyError { cycle_path });
        }

        tracing::debug!(nodes = ordered.len(), "topological sort complete");
        Ok(ordered)
    }

    /// Walk dependency edges inside the stuck set until a node repeats.
    ///
    /// Every stuck node still waits on at least one stuck node, so the walk
    /// cannot dead-end; the step bound only guards termination.
    fn find_cycle_path(&self, stuck: &BTreeSet<&ResourceId>) -> Vec<ResourceId> {
        let Some(&start) = stuck.iter().next() else {
            return Vec::new();
        };

        let limit = stuck.len() * 2;
        let mut path: Vec<&ResourceId> = vec![start];
        let mut current: &ResourceId = start;

        while path.len() <= limit {
            let Some(next) = self
                .dependencies(current)
                .iter()
                .find(|dep| stuck.contains(dep))
            else {
                break;
            };

            if let Some(pos) = path.iter().position(|seen| *seen == next) {
                let mut cycle: Vec<ResourceId> =
                    path[pos..].iter().map(|id| (*id).clone()).collect();
                cycle.push(next.clone());
                return cycle;
            }

            path.push(next);
            current = next;
        }

        path.into_iter().cloned().collect()
    }

    /// Whether the graph contains any cycle. Never fails.
    pub fn has_cycle(&self) -> bool {
        self.ordered_resources().is_err()
    }

    /// The representative cycle, or an empty path when the graph is acyclic.
    pub fn cycle_path(&self) -> Vec<ResourceId> {
        match self.ordered_resources() {
            Ok(_) => Vec::new(),
            Err(err) => err.cycle_path,
        }
    }

    /// Group nodes into waves that can deploy concurrently.
    ///
    /// Each wave holds every not-yet-scheduled node whose dependencies are all
    /// in earlier waves. Waves are disjoint and, concatenated, form a valid
    /// topological order.
    ///
    /// # Errors
    ///
    /// `GraphError::Cycle` for cyclic graphs; `GraphError::BatchStalled` if a
    /// round schedules nothing, which would indicate a bug in the ordering.
    pub fn deployment_batches(&self) -> Result<Vec<Batch>, GraphError> {
        let ordered = self.ordered_resources()?;
        let mut scheduled: BTreeSet<&ResourceId> = BTreeSet::new();
        let mut batches = Vec::new();

        while scheduled.len() < ordered.len() {
            let ready: Vec<ResourceId> = ordered
                .iter()
                .filter(|node| !scheduled.contains(node))
                .filter(|node| {
                    self.dependencies(node)
                        .iter()
                        .all(|dep| scheduled.contains(dep))
                })
                .cloned()
                .collect();

            let Some(batch) = NonEmpty::from_vec(ready) else {
                return Err(GraphError::BatchStalled {
                    remaining: ordered.len() - scheduled.len(),
                });
            };

            for node in batch.iter() {
                if let Some(stored) = self.nodes.get(node) {
                    scheduled.insert(stored);
                }
            }
            batches.push(batch);
        }

        tracing::debug!(batches = batches.len(), "created deployment batches");
        Ok(batches)
    }

    /// Remove all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.dependents.clear();
        self.dependencies.clear();
    }
}
