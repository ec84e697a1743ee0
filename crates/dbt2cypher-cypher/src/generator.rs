//! Cypher statement generation
//!
//! Emits one idempotent MERGE statement per node and per edge. All node
//! statements come before all edge statements, so replaying the script
//! against an empty store never dangles. Output is byte-identical for the
//! same input graph: the export is already sorted and nothing
//! non-deterministic (timestamps, map iteration) reaches the text.

use dbt2cypher_graph::{ExportEdge, ExportNode, GraphExport, Relationship};

/// Generates a Cypher script from a graph export.
pub struct CypherGenerator<'a> {
    graph: &'a GraphExport,
}

impl<'a> CypherGenerator<'a> {
    /// Create a generator over an exported graph.
    pub fn new(graph: &'a GraphExport) -> Self {
        Self { graph }
    }

    /// Generate the full script: node statements first (unit nodes before
    /// column nodes), then edge statements grouped by relationship.
    pub fn generate(&self) -> Result<String, CypherError> {
        let mut statements = Vec::with_capacity(self.graph.nodes.len() + self.graph.edges.len() + 1);
        statements.push("// dbt2cypher lineage export".to_string());

        for node in &self.graph.nodes {
            statements.push(self.node_statement(node)?);
        }

        for edge in &self.graph.edges {
            statements.push(self.edge_statement(edge)?);
        }

        tracing::debug!(
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            "generated cypher script"
        );

        let mut script = statements.join("\n");
        script.push('\n');
        Ok(script)
    }

    fn node_statement(&self, node: &ExportNode) -> Result<String, CypherError> {
        if node.key.is_empty() {
            return Err(CypherError::EmptyKey {
                kind: node.kind.label(),
            });
        }

        let mut statement = format!(
            "MERGE (n:{} {{key: '{}'}})",
            node.kind.label(),
            escape(&node.key)
        );

        if !node.properties.is_empty() {
            let assignments: Vec<String> = node
                .properties
                .iter()
                .map(|(name, value)| {
                    Ok(format!("n.{} = '{}'", property_ident(name)?, escape(value)))
                })
                .collect::<Result<_, CypherError>>()?;
            statement.push_str(" SET ");
            statement.push_str(&assignments.join(", "));
        }

        statement.push(';');
        Ok(statement)
    }

    fn edge_statement(&self, edge: &ExportEdge) -> Result<String, CypherError> {
        if edge.source.is_empty() || edge.target.is_empty() {
            return Err(CypherError::EmptyKey { kind: "edge" });
        }

        Ok(format!(
            "MATCH (a {{key: '{}'}}), (b {{key: '{}'}}) MERGE (a)-[:{}]->(b);",
            escape(&edge.source),
            escape(&edge.target),
            relationship_label(edge.relationship)
        ))
    }
}

/// Cypher relationship type for an edge label
fn relationship_label(relationship: Relationship) -> &'static str {
    match relationship {
        Relationship::DependsOn => "DEPENDS_ON",
        Relationship::HasColumn => "HAS_COLUMN",
    }
}

/// Escape a value for a single-quoted Cypher string literal.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a property name as a Cypher identifier, backtick-quoting
/// anything that is not a plain identifier.
fn property_ident(name: &str) -> Result<String, CypherError> {
    if name.is_empty() || name.contains('`') {
        return Err(CypherError::InvalidPropertyName(name.to_string()));
    }

    let plain = name
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));

    if plain {
        Ok(name.to_string())
    } else {
        Ok(format!("`{}`", name))
    }
}

/// Generation errors
#[derive(Debug, thiserror::Error)]
pub enum CypherError {
    #[error("cannot emit statement for {kind} with an empty key")]
    EmptyKey { kind: &'static str },

    #[error("property name '{0}' cannot be rendered as a Cypher identifier")]
    InvalidPropertyName(String),
}
