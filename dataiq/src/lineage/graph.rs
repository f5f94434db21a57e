use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use super::{GraphNode, LineageEdge, LineageGraph, NodeRole, TableNode};

/// Adjacency over a borrowed edge list, indexed both ways.
struct EdgeIndex<'a> {
    edges: &'a [LineageEdge],
    outgoing: HashMap<Uuid, Vec<usize>>,
    incoming: HashMap<Uuid, Vec<usize>>,
}

#[derive(Clone, Copy)]
enum Direction {
    Upstream,
    Downstream,
}

impl<'a> EdgeIndex<'a> {
    fn new(edges: &'a [LineageEdge]) -> Self {
        let mut outgoing: HashMap<Uuid, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (i, e) in edges.iter().enumerate() {
            outgoing.entry(e.source_table_id).or_default().push(i);
            incoming.entry(e.target_table_id).or_default().push(i);
        }
        Self {
            edges,
            outgoing,
            incoming,
        }
    }

    fn neighbors(&self, id: Uuid, dir: Direction) -> impl Iterator<Item = Uuid> + '_ {
        let slots = match dir {
            Direction::Upstream => self.incoming.get(&id),
            Direction::Downstream => self.outgoing.get(&id),
        };
        slots.into_iter().flatten().map(move |&i| match dir {
            Direction::Upstream => self.edges[i].source_table_id,
            Direction::Downstream => self.edges[i].target_table_id,
        })
    }
}

/// Breadth-first walk from `center` in one direction, at most `depth` hops.
/// Returns `(table_id, hops)` for every node reached, excluding `center`.
fn walk(index: &EdgeIndex<'_>, center: Uuid, dir: Direction, depth: usize) -> Vec<(Uuid, usize)> {
    let mut visited = HashSet::from([center]);
    let mut reached = Vec::new();
    let mut queue = VecDeque::from([(center, 0usize)]);

    while let Some((id, hops)) = queue.pop_front() {
        if hops == depth {
            continue;
        }
        for next in index.neighbors(id, dir) {
            if visited.insert(next) {
                reached.push((next, hops + 1));
                queue.push_back((next, hops + 1));
            }
        }
    }
    reached
}

/// Nodes within `depth` hops upstream and downstream of `center`, tagged by direction and
/// signed level.
///
/// Each direction is walked independently, so a node reached upstream is still expanded
/// downstream. A node found by both walks is reported once with its upstream tag. Edge
/// endpoints missing from `tables` are left out.
///
/// Only edges with both endpoints among the returned nodes are included. Edges that merely
/// touch a boundary node and lead outside the neighborhood are dropped on purpose, so the
/// result is narrower than "every edge touching a traversed node".
pub fn neighborhood(
    center: &TableNode,
    tables: &[TableNode],
    edges: &[LineageEdge],
    depth: usize,
) -> LineageGraph {
    let lookup: HashMap<Uuid, &TableNode> = tables.iter().map(|t| (t.id, t)).collect();
    let index = EdgeIndex::new(edges);

    let mut placed = HashSet::from([center.id]);
    let mut nodes = vec![GraphNode {
        table: center.clone(),
        role: NodeRole::Center,
        level: Some(0),
    }];

    for (dir, role, sign) in [
        (Direction::Upstream, NodeRole::Upstream, -1),
        (Direction::Downstream, NodeRole::Downstream, 1),
    ] {
        for (id, hops) in walk(&index, center.id, dir, depth) {
            if !placed.insert(id) {
                continue;
            }
            if let Some(table) = lookup.get(&id) {
                nodes.push(GraphNode {
                    table: (*table).clone(),
                    role,
                    level: Some(sign * hops as i32),
                });
            }
        }
    }

    let members: HashSet<Uuid> = nodes.iter().map(|n| n.table.id).collect();
    LineageGraph {
        edges: edges_within(edges, &members),
        nodes,
    }
}

/// Every given table with a name-inferred role, plus the edges between them.
pub fn global_graph(tables: &[TableNode], edges: &[LineageEdge]) -> LineageGraph {
    let members: HashSet<Uuid> = tables.iter().map(|t| t.id).collect();
    LineageGraph {
        nodes: tables
            .iter()
            .map(|t| GraphNode {
                table: t.clone(),
                role: NodeRole::infer(&t.table_name),
                level: None,
            })
            .collect(),
        edges: edges_within(edges, &members),
    }
}

fn edges_within(edges: &[LineageEdge], members: &HashSet<Uuid>) -> Vec<LineageEdge> {
    edges
        .iter()
        .filter(|e| members.contains(&e.source_table_id) && members.contains(&e.target_table_id))
        .cloned()
        .collect()
}
