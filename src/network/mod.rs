//! Sensor network graph with pure editing reducers.
//!
//! A [`NetworkGraph`] is an immutable snapshot. Every edit returns a new
//! graph that still remembers the original node set, so `reset` can always
//! restore it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::pipeline::Record;

pub type NodeId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Mean coordinate pair of the node's records.
    pub position: [f64; 2],
    pub records: usize,
    pub total_count: u64,
}

/// Undirected edge; `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
}

impl Edge {
    pub fn new(x: &str, y: &str) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self {
            a: a.to_string(),
            b: b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkGraph {
    current: Snapshot,
    original: Arc<Snapshot>,
}

impl Default for NetworkGraph {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl NetworkGraph {
    /// Build a graph whose original state is the given nodes and edges.
    /// Edges referencing unknown nodes are discarded.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let ids: BTreeSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges: BTreeSet<Edge> = edges
            .into_iter()
            .filter(|e| {
                e.a != e.b && ids.contains(e.a.as_str()) && ids.contains(e.b.as_str())
            })
            .collect();
        let snapshot = Snapshot {
            edges: edges.into_iter().collect(),
            nodes,
        };
        Self {
            original: Arc::new(snapshot.clone()),
            current: snapshot,
        }
    }

    /// One node per source, linking sources closer than `link_distance`.
    pub fn from_records(records: &[Record], link_distance: f64) -> Self {
        let mut grouped: BTreeMap<&str, (f64, f64, usize, u64)> = BTreeMap::new();
        for record in records {
            let Some(source) = record.source.as_deref() else {
                continue;
            };
            let entry = grouped.entry(source).or_default();
            entry.0 += record.coordinates[0];
            entry.1 += record.coordinates[1];
            entry.2 += 1;
            entry.3 = entry.3.saturating_add(record.count);
        }

        let nodes: Vec<Node> = grouped
            .into_iter()
            .map(|(id, (x, y, n, total))| Node {
                id: id.to_string(),
                position: [x / n as f64, y / n as f64],
                records: n,
                total_count: total,
            })
            .collect();

        let mut edges = Vec::new();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                if distance(a.position, b.position) <= link_distance {
                    edges.push(Edge::new(&a.id, &b.id));
                }
            }
        }
        Self::new(nodes, edges)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.current.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.current.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.current.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.current.nodes.is_empty()
    }

    /// Add a node; a node with an existing id replaces the old one.
    pub fn add_node(&self, node: Node) -> Self {
        let mut next = self.current.clone();
        match next.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => next.nodes.push(node),
        }
        self.with(next)
    }

    /// Link two present nodes.
    pub fn connect(&self, a: &str, b: &str) -> Self {
        let edge = Edge::new(a, b);
        if a == b || self.node(a).is_none() || self.node(b).is_none() {
            return self.clone();
        }
        let mut next = self.current.clone();
        if let Err(pos) = next.edges.binary_search(&edge) {
            next.edges.insert(pos, edge);
        }
        self.with(next)
    }

    /// Drop the given nodes and every edge touching them.
    pub fn remove_nodes<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let ids: BTreeSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        self.retain(|id| !ids.contains(id))
    }

    /// Keep only the given nodes and the edges between them.
    pub fn keep_nodes<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let ids: BTreeSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        self.retain(|id| ids.contains(id))
    }

    /// Back to the nodes and edges the graph was built with.
    pub fn reset(&self) -> Self {
        Self {
            current: (*self.original).clone(),
            original: Arc::clone(&self.original),
        }
    }

    fn retain(&self, keep: impl Fn(&str) -> bool) -> Self {
        let nodes: Vec<Node> = self
            .current
            .nodes
            .iter()
            .filter(|n| keep(&n.id))
            .cloned()
            .collect();
        let edges = self
            .current
            .edges
            .iter()
            .filter(|e| keep(&e.a) && keep(&e.b))
            .cloned()
            .collect();
        self.with(Snapshot { nodes, edges })
    }

    fn with(&self, current: Snapshot) -> Self {
        let Snapshot { nodes, edges } = current;
        let edges = edges
            .into_iter()
            .filter(|e| has_node(&nodes, &e.a) && has_node(&nodes, &e.b))
            .collect();
        Self {
            current: Snapshot { nodes, edges },
            original: Arc::clone(&self.original),
        }
    }
}

fn has_node(nodes: &[Node], id: &str) -> bool {
    nodes.iter().any(|n| n.id == id)
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}
