//! Dependency forest over the definitions of a registry.
//!
//! Edges point from a dependent to its prerequisites: a node's children are
//! the definitions it requires, its parent is the definition that listed it.
//! Nodes hold [`DefinitionId`] keys only; the registry stays the single owner
//! of the definitions themselves.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{DefinitionId, DefinitionRegistry, Kind, ResourceDefinition};
use crate::error::ConfigError;

/// Index of a node inside a [`DependencyForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    definition: DefinitionId,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One or more trees expressing "children must be available before the parent
/// can be created".
#[derive(Debug, Clone)]
pub struct DependencyForest {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    by_definition: HashMap<DefinitionId, NodeId>,
    /// Nodes reachable from a root, in pre-order.
    order: Vec<NodeId>,
}

impl DependencyForest {
    /// Build the forest for every definition in `registry`.
    ///
    /// Parent resolution scans applications, then services, in declaration
    /// order and picks the first definition that lists the node's name. A
    /// definition referenced by several others is therefore attached to the
    /// earliest one only.
    ///
    /// Children come from `requiredApplications`; a non-empty
    /// `requiredServices` list replaces them instead of extending them.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnresolvedDependency`] if any dependency name does not
    ///   match a definition of the referenced kind
    /// - [`ConfigError::UnsatisfiablePrerequisite`] if a definition that gets
    ///   created waits on an entitle-only one
    /// - [`ConfigError::DependencyCycle`] if prerequisites loop back on
    ///   themselves
    pub fn build(registry: &DefinitionRegistry) -> Result<Self, ConfigError> {
        let mut nodes: Vec<Node> = registry
            .ids()
            .map(|definition| Node {
                definition,
                parent: None,
                children: Vec::new(),
            })
            .collect();
        let by_definition: HashMap<DefinitionId, NodeId> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.definition, NodeId(i)))
            .collect();

        for node in &mut nodes {
            let Some(def) = registry.get(node.definition) else {
                continue;
            };
            node.children = resolve_children(registry, &by_definition, node.definition, def)?;
        }
        check_prerequisites(registry, &nodes)?;
        check_acyclic(registry, &nodes)?;

        for i in 0..nodes.len() {
            let id = nodes[i].definition;
            let Some(def) = registry.get(id) else {
                continue;
            };
            let Some(candidate) = first_dependent(registry, id, &def.name) else {
                continue;
            };
            let parent = by_definition[&candidate];
            if nodes[parent.0].children.contains(&NodeId(i)) {
                nodes[i].parent = Some(parent);
            } else {
                warn!(
                    definition = %def.name,
                    listed_by = registry.get(candidate).map_or("", |d| d.name.as_str()),
                    "Prerequisite dropped by requiredServices precedence, attaching as root"
                );
            }
        }

        let roots: Vec<NodeId> = (0..nodes.len())
            .map(NodeId)
            .filter(|id| nodes[id.0].parent.is_none())
            .collect();

        let mut forest = Self {
            nodes,
            roots,
            by_definition,
            order: Vec::new(),
        };
        forest.order = forest.pre_order();

        debug!(
            nodes = forest.nodes.len(),
            roots = forest.roots.len(),
            reachable = forest.order.len(),
            "Dependency forest built"
        );
        Ok(forest)
    }

    fn pre_order(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if visited[id.0] {
                    continue;
                }
                visited[id.0] = true;
                order.push(id);
                stack.extend(self.nodes[id.0].children.iter().rev().copied());
            }
        }
        order
    }

    /// Nodes without a parent.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Every node reachable from a root, each exactly once, in pre-order.
    ///
    /// Shared prerequisites are visited once.
    #[must_use]
    pub fn walk(&self) -> &[NodeId] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn definition(&self, node: NodeId) -> DefinitionId {
        self.nodes[node.0].definition
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Distance from the node's root; roots have depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.nodes[current.0].parent {
            depth += 1;
            current = parent;
            if depth >= self.nodes.len() {
                break;
            }
        }
        depth
    }

    /// Find the node wrapping `definition`, if it is reachable from a root.
    #[must_use]
    pub fn locate(&self, definition: DefinitionId) -> Option<NodeId> {
        self.by_definition
            .get(&definition)
            .copied()
            .filter(|id| self.order.contains(id))
    }
}

fn resolve_children(
    registry: &DefinitionRegistry,
    by_definition: &HashMap<DefinitionId, NodeId>,
    id: DefinitionId,
    def: &ResourceDefinition,
) -> Result<Vec<NodeId>, ConfigError> {
    let resolve = |kind: Kind, names: &[String]| -> Result<Vec<NodeId>, ConfigError> {
        names
            .iter()
            .map(|name| {
                registry
                    .find(kind, name)
                    .map(|dep| by_definition[&dep])
                    .ok_or_else(|| ConfigError::UnresolvedDependency {
                        kind: id.kind(),
                        name: def.name.clone(),
                        dependency_kind: kind,
                        dependency: name.clone(),
                    })
            })
            .collect()
    };

    let applications = resolve(Kind::Application, &def.required_applications)?;
    if def.required_services.is_empty() {
        return Ok(applications);
    }
    resolve(Kind::Service, &def.required_services)
}

/// Entitle-only definitions are never created, so nothing created may wait
/// on one.
fn check_prerequisites(registry: &DefinitionRegistry, nodes: &[Node]) -> Result<(), ConfigError> {
    for node in nodes {
        let Some(def) = registry.get(node.definition) else {
            continue;
        };
        if def.entitle_only {
            continue;
        }
        for &child in &node.children {
            let prerequisite = nodes[child.0].definition;
            if let Some(entitled) = registry.get(prerequisite).filter(|p| p.entitle_only) {
                return Err(ConfigError::UnsatisfiablePrerequisite {
                    kind: node.definition.kind(),
                    name: def.name.clone(),
                    prerequisite_kind: prerequisite.kind(),
                    prerequisite: entitled.name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Depth-first search over the prerequisite edges; reaching a node that is
/// still on the current path closes a cycle.
fn check_acyclic(registry: &DefinitionRegistry, nodes: &[Node]) -> Result<(), ConfigError> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    for start in 0..nodes.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::OnPath;
        let mut path = vec![(start, 0usize)];
        while let Some(frame) = path.last_mut() {
            let (node, next) = *frame;
            let Some(&child) = nodes[node].children.get(next) else {
                marks[node] = Mark::Done;
                path.pop();
                continue;
            };
            frame.1 += 1;
            match marks[child.0] {
                Mark::Unvisited => {
                    marks[child.0] = Mark::OnPath;
                    path.push((child.0, 0));
                }
                Mark::OnPath => {
                    let id = nodes[child.0].definition;
                    return Err(ConfigError::DependencyCycle {
                        kind: id.kind(),
                        name: registry.get(id).map(|d| d.name.clone()).unwrap_or_default(),
                    });
                }
                Mark::Done => {}
            }
        }
    }
    Ok(())
}

/// First definition (applications before services) listing `name` in either
/// of its dependency lists.
fn first_dependent(
    registry: &DefinitionRegistry,
    id: DefinitionId,
    name: &str,
) -> Option<DefinitionId> {
    registry
        .iter()
        .find(|(candidate, def)| *candidate != id && def.requires(name))
        .map(|(candidate, _)| candidate)
}
