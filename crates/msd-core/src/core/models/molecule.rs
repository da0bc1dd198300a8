use super::cursor::{BoundsError, Collection, Sequence};
use crate::core::utils::vector::{self, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Per-atom coefficients of a molecule node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeParameters {
    /// Spin magnitude.
    #[serde(rename = "Sm")]
    pub sm: f64,
    /// Upper bound of the flux magnitude.
    #[serde(rename = "Fm")]
    pub fm: f64,
    /// Coupling between the site's own spin and flux.
    #[serde(rename = "Je0m")]
    pub je0m: f64,
    /// Anisotropy.
    #[serde(rename = "Am")]
    pub am: Vector,
}

impl Default for NodeParameters {
    fn default() -> Self {
        Self {
            sm: 1.0,
            fm: 0.0,
            je0m: 0.0,
            am: vector::ZERO,
        }
    }
}

/// Per-bond coefficients of a molecule edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeParameters {
    #[serde(rename = "Jm")]
    pub jm: f64,
    #[serde(rename = "Je1m")]
    pub je1m: f64,
    #[serde(rename = "Jeem")]
    pub jeem: f64,
    #[serde(rename = "bm")]
    pub bm: f64,
    #[serde(rename = "Dm")]
    pub dm: Vector,
}

impl Default for EdgeParameters {
    fn default() -> Self {
        Self {
            jm: 0.0,
            je1m: 0.0,
            jeem: 0.0,
            bm: 0.0,
            dm: vector::ZERO,
        }
    }
}

/// One traversal direction of an edge.
///
/// Every edge identity owns exactly two entries: `source -> destination` with
/// `direction = 1` and the mirrored entry with `direction = -1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectedEdge {
    pub identity: usize,
    pub source: usize,
    pub destination: usize,
    pub direction: f64,
}

/// An append-only directed multigraph of molecule nodes and bonds.
///
/// Node indices and edge identities are assigned in creation order and never
/// change. The two lead nodes mark where the molecule attaches to the
/// ferromagnetic regions of a lattice; they are not validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoleculeGraph {
    nodes: Vec<NodeParameters>,
    edge_parameters: Vec<EdgeParameters>,
    adjacency: Vec<Vec<DirectedEdge>>,
    left_lead: usize,
    right_lead: usize,
}

impl MoleculeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph of `count` unconnected nodes sharing `parameters`.
    pub fn with_nodes(count: usize, parameters: NodeParameters) -> Self {
        Self {
            nodes: vec![parameters; count],
            adjacency: vec![Vec::new(); count],
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edge identities, i.e. logical bonds.
    pub fn edge_count(&self) -> usize {
        self.edge_parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edge_parameters.is_empty()
    }

    /// Appends a node and returns its index.
    pub fn create_node(&mut self, parameters: NodeParameters) -> usize {
        self.nodes.push(parameters);
        self.adjacency.push(Vec::new());
        self.nodes.len() - 1
    }

    /// Connects `a` to `b` and returns the new edge identity.
    ///
    /// Parallel edges and self-loops are accepted; each call creates a new
    /// identity with its own two traversal entries.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError`] if either node does not exist.
    pub fn connect_nodes(
        &mut self,
        a: usize,
        b: usize,
        parameters: EdgeParameters,
    ) -> Result<usize, BoundsError> {
        self.check_node(a)?;
        self.check_node(b)?;
        Ok(self.link(a, b, parameters))
    }

    /// Identity of the first edge from `a` to `b` in traversal order.
    pub fn edge_index(&self, a: usize, b: usize) -> Option<usize> {
        self.outgoing(a)
            .iter()
            .find(|edge| edge.destination == b)
            .map(|edge| edge.identity)
    }

    pub fn node_parameters(&self, node: usize) -> Result<&NodeParameters, BoundsError> {
        self.nodes
            .get(node)
            .ok_or_else(|| BoundsError::new(node as isize, self.nodes.len()))
    }

    pub fn set_node_parameters(
        &mut self,
        node: usize,
        parameters: NodeParameters,
    ) -> Result<(), BoundsError> {
        let len = self.nodes.len();
        let slot = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| BoundsError::new(node as isize, len))?;
        *slot = parameters;
        Ok(())
    }

    pub fn edge_parameters(&self, edge: usize) -> Result<&EdgeParameters, BoundsError> {
        self.edge_parameters
            .get(edge)
            .ok_or_else(|| BoundsError::new(edge as isize, self.edge_parameters.len()))
    }

    pub fn set_edge_parameters(
        &mut self,
        edge: usize,
        parameters: EdgeParameters,
    ) -> Result<(), BoundsError> {
        let len = self.edge_parameters.len();
        let slot = self
            .edge_parameters
            .get_mut(edge)
            .ok_or_else(|| BoundsError::new(edge as isize, len))?;
        *slot = parameters;
        Ok(())
    }

    /// Edge parameter records indexed by identity.
    pub fn edge_parameter_records(&self) -> &[EdgeParameters] {
        &self.edge_parameters
    }

    /// Overwrites every node and every edge with the given records.
    pub fn set_all_parameters(&mut self, node: &NodeParameters, edge: &EdgeParameters) {
        self.nodes.iter_mut().for_each(|p| *p = *node);
        self.edge_parameters.iter_mut().for_each(|p| *p = *edge);
    }

    pub fn left_lead(&self) -> usize {
        self.left_lead
    }

    pub fn right_lead(&self) -> usize {
        self.right_lead
    }

    pub fn set_left_lead(&mut self, node: usize) {
        self.left_lead = node;
    }

    pub fn set_right_lead(&mut self, node: usize) {
        self.right_lead = node;
    }

    pub fn set_leads(&mut self, left: usize, right: usize) {
        self.left_lead = left;
        self.right_lead = right;
    }

    /// Directed entries leaving `node`, in insertion order. Unknown nodes have none.
    pub fn outgoing(&self, node: usize) -> &[DirectedEdge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> Collection<Nodes<'_>> {
        Collection::new(Nodes { graph: self })
    }

    /// Every directed entry, grouped by source node.
    pub fn edges(&self) -> Collection<Edges<'_>> {
        let entries = self.adjacency.iter().flatten().copied().collect();
        Collection::new(Edges {
            graph: self,
            entries,
        })
    }

    /// One entry per edge identity: the first one met while scanning [`Self::edges`].
    pub fn edges_unique(&self) -> Collection<Edges<'_>> {
        let mut seen = vec![false; self.edge_parameters.len()];
        let entries = self
            .adjacency
            .iter()
            .flatten()
            .filter(|edge| !std::mem::replace(&mut seen[edge.identity], true))
            .copied()
            .collect();
        Collection::new(Edges {
            graph: self,
            entries,
        })
    }

    /// The directed entries leaving `node` as their own collection.
    pub fn adjacency_list(&self, node: usize) -> Result<Collection<Edges<'_>>, BoundsError> {
        self.check_node(node)?;
        Ok(Collection::new(Edges {
            graph: self,
            entries: self.adjacency[node].clone(),
        }))
    }

    // Registers parameters for an edge identity that has no traversal entries.
    pub(crate) fn push_detached_edge(&mut self, parameters: EdgeParameters) -> usize {
        self.edge_parameters.push(parameters);
        self.edge_parameters.len() - 1
    }

    fn link(&mut self, a: usize, b: usize, parameters: EdgeParameters) -> usize {
        let identity = self.edge_parameters.len();
        self.edge_parameters.push(parameters);
        self.adjacency[a].push(DirectedEdge {
            identity,
            source: a,
            destination: b,
            direction: 1.0,
        });
        self.adjacency[b].push(DirectedEdge {
            identity,
            source: b,
            destination: a,
            direction: -1.0,
        });
        identity
    }

    fn check_node(&self, node: usize) -> Result<(), BoundsError> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(BoundsError::new(node as isize, self.nodes.len()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView<'a> {
    pub index: usize,
    pub parameters: &'a NodeParameters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeView<'a> {
    pub index: usize,
    pub source: usize,
    pub destination: usize,
    pub direction: f64,
    pub parameters: &'a EdgeParameters,
}

#[derive(Debug, Clone)]
pub struct Nodes<'g> {
    graph: &'g MoleculeGraph,
}

impl Sequence for Nodes<'_> {
    type Item<'a>
        = NodeView<'a>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.graph.nodes.len()
    }

    fn element(&self, index: usize) -> NodeView<'_> {
        NodeView {
            index,
            parameters: &self.graph.nodes[index],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edges<'g> {
    graph: &'g MoleculeGraph,
    entries: Vec<DirectedEdge>,
}

impl Sequence for Edges<'_> {
    type Item<'a>
        = EdgeView<'a>
    where
        Self: 'a;

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn element(&self, index: usize) -> EdgeView<'_> {
        let edge = &self.entries[index];
        EdgeView {
            index: edge.identity,
            source: edge.source,
            destination: edge.destination,
            direction: edge.direction,
            parameters: &self.graph.edge_parameters[edge.identity],
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown molecule type '{0}' (expected LINEAR or CIRCULAR)")]
pub struct ParseMoleculeTypeError(pub String);

/// Built-in molecule shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum MoleculeType {
    /// A chain `0 - 1 - ... - (n-1)` with leads on both ends.
    Linear,
    /// The chain closed into a ring, with leads on opposite sides.
    Circular,
}

impl MoleculeType {
    pub fn build(self, node_count: usize) -> MoleculeGraph {
        let mut graph = MoleculeGraph::with_nodes(node_count, NodeParameters::default());
        for i in 1..node_count {
            graph.link(i - 1, i, EdgeParameters::default());
        }
        match self {
            MoleculeType::Linear => graph.set_leads(0, node_count.saturating_sub(1)),
            MoleculeType::Circular => {
                if node_count >= 2 {
                    graph.link(node_count - 1, 0, EdgeParameters::default());
                }
                graph.set_leads(0, node_count / 2);
            }
        }
        graph
    }
}

impl FromStr for MoleculeType {
    type Err = ParseMoleculeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LINEAR" | "LINEAR_MOL" => Ok(MoleculeType::Linear),
            "CIRCULAR" | "CIRCULAR_MOL" => Ok(MoleculeType::Circular),
            _ => Err(ParseMoleculeTypeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for MoleculeType {
    type Error = ParseMoleculeTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MoleculeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoleculeType::Linear => write!(f, "LINEAR"),
            MoleculeType::Circular => write!(f, "CIRCULAR"),
        }
    }
}
