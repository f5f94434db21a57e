//! Lineage inference and graph queries.
//!
//! [`extract`] turns foreign keys and naming conventions into candidate edges; [`graph`]
//! answers neighborhood and global queries over edges already persisted in the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{catalog_table, lineage_edge};

pub mod extract;
pub mod graph;

pub use extract::{foreign_key_edges, merge_candidates, naming_edges};
pub use graph::{global_graph, neighborhood};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
    ForeignKey,
    Transformation,
    Unknown,
}

impl TransformationType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransformationType::ForeignKey => "foreign_key",
            TransformationType::Transformation => "transformation",
            TransformationType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransformationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "foreign_key" => Ok(TransformationType::ForeignKey),
            "transformation" => Ok(TransformationType::Transformation),
            "unknown" => Ok(TransformationType::Unknown),
            other => Err(format!("unknown transformation type: {other}")),
        }
    }
}

/// Directed edge: data flows from `source_table_id` into `target_table_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub source_table_id: Uuid,
    pub target_table_id: Uuid,
    pub transformation_type: TransformationType,
    pub detail: String,
}

impl From<lineage_edge::Model> for LineageEdge {
    fn from(m: lineage_edge::Model) -> Self {
        Self {
            source_table_id: m.source_table_id,
            target_table_id: m.target_table_id,
            // rows written by older tooling may carry free-form values
            transformation_type: m
                .transformation_type
                .parse()
                .unwrap_or(TransformationType::Unknown),
            detail: m.detail,
        }
    }
}

/// A cataloged table as seen by lineage: identity plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableNode {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub schema_name: String,
    pub table_name: String,
}

impl From<&catalog_table::Model> for TableNode {
    fn from(m: &catalog_table::Model) -> Self {
        Self {
            id: m.id,
            connection_id: m.connection_id,
            schema_name: m.schema_name.clone(),
            table_name: m.table_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Center,
    Upstream,
    Downstream,
    Source,
    Transform,
    Target,
}

impl NodeRole {
    /// Rendering hint from the table name: `summary`/`analytics` are targets, a `raw_` prefix
    /// marks a source, everything else is a transform.
    pub fn infer(table_name: &str) -> Self {
        let lower = table_name.to_lowercase();
        if is_sink_name(&lower) {
            NodeRole::Target
        } else if lower.starts_with(RAW_PREFIX) {
            NodeRole::Source
        } else {
            NodeRole::Transform
        }
    }
}

pub(crate) const RAW_PREFIX: &str = "raw_";

pub(crate) fn is_sink_name(lower: &str) -> bool {
    lower.contains("summary") || lower.contains("analytics")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(flatten)]
    pub table: TableNode,
    pub role: NodeRole,
    /// Signed distance from the center of a neighborhood query: negative upstream, positive
    /// downstream. Absent in global graphs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageGraph {
    pub fn node(&self, id: Uuid) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.table.id == id)
    }
}
