//! Dependency graph construction and traversal
//!
//! Edge direction encodes upstream -> downstream: an edge A -> B means B
//! consumes A. `add_dependency(source, target)` places the edge literally
//! as given; the pipeline layer is responsible for always passing
//! (upstream, downstream).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use dbt2cypher_core::ColumnRef;
use serde::{Deserialize, Serialize};

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A buildable table/view-level entity
    Unit,

    /// A column scoped to exactly one unit
    Column,
}

impl NodeKind {
    /// Graph label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unit => "Unit",
            Self::Column => "Column",
        }
    }
}

/// Edge relationship label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Lineage: the target consumes the source
    DependsOn,

    /// Ownership: the target column belongs to the source unit
    HasColumn,
}

impl Relationship {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "depends_on",
            Self::HasColumn => "has_column",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    source: String,
    target: String,
    relationship: Relationship,
}

/// Directed dependency graph over unit and column nodes.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, Node>,
    edges: Vec<Edge>,
    edge_index: HashSet<(String, String, Relationship)>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit node. Idempotent: re-adding the same key merges the
    /// properties instead of duplicating the node.
    pub fn add_unit(&mut self, key: &str, properties: BTreeMap<String, String>) {
        self.upsert(key, NodeKind::Unit, properties);
    }

    /// Add a column node addressed by its composite `unit.column` key.
    ///
    /// Keys without a separator are not column references and are rejected
    /// before insertion.
    pub fn add_column(
        &mut self,
        key: &str,
        properties: BTreeMap<String, String>,
    ) -> Result<(), GraphError> {
        ColumnRef::parse(key).map_err(|_| GraphError::MalformedColumnKey(key.to_string()))?;
        self.upsert(key, NodeKind::Column, properties);
        Ok(())
    }

    /// Insert a directed edge, auto-creating missing endpoints as bare
    /// nodes. Re-adding an identical edge is a no-op.
    pub fn add_dependency(&mut self, source: &str, target: &str, relationship: Relationship) {
        let target_kind = match relationship {
            Relationship::HasColumn => NodeKind::Column,
            Relationship::DependsOn => NodeKind::Unit,
        };
        self.ensure_node(source, NodeKind::Unit);
        self.ensure_node(target, target_kind);

        let index_key = (source.to_string(), target.to_string(), relationship);
        if self.edge_index.insert(index_key) {
            self.edges.push(Edge {
                source: source.to_string(),
                target: target.to_string(),
                relationship,
            });
        }
    }

    /// Immediate predecessors of a node (its direct upstreams).
    pub fn upstream_of(&self, key: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.target == key)
            .map(|e| e.source.as_str())
            .collect()
    }

    /// Immediate successors of a node (its direct downstreams).
    pub fn downstream_of(&self, key: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter(|e| e.source == key)
            .map(|e| e.target.as_str())
            .collect()
    }

    /// Whether a node with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// The kind of an existing node.
    pub fn kind_of(&self, key: &str) -> Option<NodeKind> {
        self.nodes.get(key).map(|n| n.kind)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Export a deterministic serializable representation: unit nodes
    /// before column nodes, each sorted by key; edges grouped by
    /// relationship, sorted by (source, target).
    pub fn export(&self) -> GraphExport {
        let mut nodes: Vec<ExportNode> = self
            .nodes
            .iter()
            .map(|(key, node)| ExportNode {
                key: key.clone(),
                kind: node.kind,
                properties: node.properties.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.key.cmp(&b.key)));

        let mut edges: Vec<ExportEdge> = self
            .edges
            .iter()
            .map(|e| ExportEdge {
                source: e.source.clone(),
                target: e.target.clone(),
                relationship: e.relationship,
            })
            .collect();
        edges.sort_by(|a, b| {
            a.relationship
                .cmp(&b.relationship)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.target.cmp(&b.target))
        });

        GraphExport { nodes, edges }
    }

    fn upsert(&mut self, key: &str, kind: NodeKind, properties: BTreeMap<String, String>) {
        match self.nodes.get_mut(key) {
            Some(node) => {
                // Explicit insertion wins over an auto-created bare node.
                node.kind = kind;
                node.properties.extend(properties);
            }
            None => {
                self.nodes.insert(key.to_string(), Node { kind, properties });
            }
        }
    }

    fn ensure_node(&mut self, key: &str, kind: NodeKind) {
        self.nodes.entry(key.to_string()).or_insert_with(|| Node {
            kind,
            properties: BTreeMap::new(),
        });
    }
}

/// Serializable node/edge representation of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    /// Unit nodes first, then column nodes, sorted by key
    pub nodes: Vec<ExportNode>,

    /// Edges grouped by relationship, sorted by (source, target)
    pub edges: Vec<ExportEdge>,
}

/// One exported node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    /// Fully-qualified identity key
    pub key: String,

    /// Node kind
    pub kind: NodeKind,

    /// Scalar properties
    pub properties: BTreeMap<String, String>,
}

/// One exported edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEdge {
    /// Upstream endpoint key
    pub source: String,

    /// Downstream endpoint key
    pub target: String,

    /// Relationship label
    pub relationship: Relationship,
}

/// Graph construction errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("malformed column key '{0}': expected '<unit>.<column>'")]
    MalformedColumnKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn re_adding_a_node_merges_properties() {
        let mut graph = DependencyGraph::new();
        graph.add_unit("db.main.orders", props(&[("name", "orders")]));
        graph.add_unit(
            "db.main.orders",
            props(&[("resource_type", "model"), ("name", "orders_v2")]),
        );

        assert_eq!(graph.node_count(), 1);
        let export = graph.export();
        assert_eq!(export.nodes[0].properties["name"], "orders_v2");
        assert_eq!(export.nodes[0].properties["resource_type"], "model");
    }

    #[test]
    fn bare_column_key_is_rejected() {
        let mut graph = DependencyGraph::new();
        let err = graph.add_column("unnamed", BTreeMap::new()).unwrap_err();
        assert!(matches!(err, GraphError::MalformedColumnKey(_)));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn dependency_auto_creates_bare_endpoints() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b", Relationship::DependsOn);

        assert!(graph.contains("a"));
        assert!(graph.contains("b"));
        assert_eq!(graph.kind_of("a"), Some(NodeKind::Unit));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn explicit_add_upgrades_auto_created_node() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("db.orders", "db.orders.id", Relationship::HasColumn);
        assert_eq!(graph.kind_of("db.orders.id"), Some(NodeKind::Column));

        graph
            .add_column("db.orders.id", props(&[("data_type", "INTEGER")]))
            .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.kind_of("db.orders.id"), Some(NodeKind::Column));
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b", Relationship::DependsOn);
        graph.add_dependency("a", "b", Relationship::DependsOn);
        assert_eq!(graph.edge_count(), 1);

        // Same endpoints, different relationship is a distinct edge
        graph.add_dependency("a", "b", Relationship::HasColumn);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn neighborhood_queries_are_immediate_only() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b", Relationship::DependsOn);
        graph.add_dependency("b", "c", Relationship::DependsOn);

        assert_eq!(graph.upstream_of("b").into_iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(
            graph.downstream_of("b").into_iter().collect::<Vec<_>>(),
            vec!["c"]
        );
        // No transitive closure at this layer
        assert!(graph.downstream_of("a").contains("b"));
        assert!(!graph.downstream_of("a").contains("c"));
    }

    #[test]
    fn cycles_are_represented_not_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b", Relationship::DependsOn);
        graph.add_dependency("b", "a", Relationship::DependsOn);

        assert_eq!(graph.edge_count(), 2);
        assert!(graph.upstream_of("a").contains("b"));
        assert!(graph.downstream_of("a").contains("b"));
    }

    #[test]
    fn export_orders_units_before_columns() {
        let mut graph = DependencyGraph::new();
        graph.add_column("db.z.col", BTreeMap::new()).unwrap();
        graph.add_unit("db.z", BTreeMap::new());
        graph.add_unit("db.a", BTreeMap::new());

        let export = graph.export();
        let keys: Vec<&str> = export.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["db.a", "db.z", "db.z.col"]);
    }

    #[test]
    fn export_groups_edges_by_relationship() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("u1", "u1.c", Relationship::HasColumn);
        graph.add_dependency("u2", "u1", Relationship::DependsOn);
        graph.add_dependency("u0", "u1", Relationship::DependsOn);

        let export = graph.export();
        let rels: Vec<Relationship> = export.edges.iter().map(|e| e.relationship).collect();
        assert_eq!(
            rels,
            vec![
                Relationship::DependsOn,
                Relationship::DependsOn,
                Relationship::HasColumn
            ]
        );
        assert_eq!(export.edges[0].source, "u0");
        assert_eq!(export.edges[1].source, "u2");
    }

    #[test]
    fn export_is_serializable() {
        let mut graph = DependencyGraph::new();
        graph.add_unit("db.a", BTreeMap::new());
        graph.add_dependency("db.a", "db.b", Relationship::DependsOn);

        let json = serde_json::to_string(&graph.export()).unwrap();
        assert!(json.contains("depends_on"));
        let parsed: GraphExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, graph.export());
    }
}
