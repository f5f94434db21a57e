use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

use super::{LineageEdge, RAW_PREFIX, TableNode, TransformationType, is_sink_name};
use crate::source::ForeignKey;

/// One edge per foreign key, from the constrained table to the referenced one.
///
/// Endpoints are resolved against the cataloged `tables` of `connection_id`; a constraint
/// touching a table not yet cataloged is dropped.
pub fn foreign_key_edges(
    connection_id: Uuid,
    foreign_keys: &[ForeignKey],
    tables: &[TableNode],
) -> Vec<LineageEdge> {
    let by_name: HashMap<(&str, &str), Uuid> = tables
        .iter()
        .filter(|t| t.connection_id == connection_id)
        .map(|t| ((t.schema_name.as_str(), t.table_name.as_str()), t.id))
        .collect();

    foreign_keys
        .iter()
        .filter_map(|fk| {
            let source = by_name.get(&(fk.schema_name.as_str(), fk.table_name.as_str()));
            let target =
                by_name.get(&(fk.referenced_schema.as_str(), fk.referenced_table.as_str()));
            match (source, target) {
                (Some(&source_table_id), Some(&target_table_id)) => Some(LineageEdge {
                    source_table_id,
                    target_table_id,
                    transformation_type: TransformationType::ForeignKey,
                    detail: format!("FOREIGN KEY {}", fk.constraint_name),
                }),
                _ => {
                    debug!(
                        constraint = %fk.constraint_name,
                        "Skipping foreign key with uncataloged endpoint"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Pair `raw_*` tables with `*summary*`/`*analytics*` tables whose name contains the raw
/// table's stem. Underscores are ignored and names compare case-insensitively.
pub fn naming_edges(tables: &[TableNode]) -> Vec<LineageEdge> {
    let squash = |s: &str| s.to_lowercase().replace('_', "");

    let sinks: Vec<(&TableNode, String)> = tables
        .iter()
        .filter(|t| is_sink_name(&t.table_name.to_lowercase()))
        .map(|t| (t, squash(&t.table_name)))
        .collect();

    let mut edges = Vec::new();
    for raw in tables {
        let lower = raw.table_name.to_lowercase();
        let Some(rest) = lower.strip_prefix(RAW_PREFIX) else {
            continue;
        };
        let stem = squash(rest);
        if stem.is_empty() {
            continue;
        }

        for (sink, squashed) in &sinks {
            if sink.id == raw.id || !squashed.contains(&stem) {
                continue;
            }
            edges.push(LineageEdge {
                source_table_id: raw.id,
                target_table_id: sink.id,
                transformation_type: TransformationType::Transformation,
                detail: format!(
                    "naming convention: {} -> {}",
                    raw.table_name, sink.table_name
                ),
            });
        }
    }
    edges
}

/// Concatenate candidate batches, keeping the first edge seen for each `(source, target)`.
pub fn merge_candidates(batches: impl IntoIterator<Item = Vec<LineageEdge>>) -> Vec<LineageEdge> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|e| seen.insert((e.source_table_id, e.target_table_id)))
        .collect()
}
