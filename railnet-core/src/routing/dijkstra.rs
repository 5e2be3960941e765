use std::{cmp::Ordering, collections::BinaryHeap};

use fixedbitset::FixedBitSet;
use hashbrown::HashMap;
use petgraph::{
    Direction as Orientation,
    graph::{EdgeIndex, NodeIndex},
    visit::EdgeRef,
};

use super::search_graph::SearchGraph;
use crate::Cost;

#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: Cost,
    node: NodeIndex,
}

impl Eq for State {}

// Min-heap by cost, node index breaks ties so pops are deterministic
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Settled costs and the arc each node was reached by.
#[derive(Debug)]
pub(crate) struct ShortestPaths {
    start: NodeIndex,
    costs: HashMap<NodeIndex, Cost>,
    predecessors: HashMap<NodeIndex, EdgeIndex>,
}

impl ShortestPaths {
    pub(crate) fn cost_to(&self, node: NodeIndex) -> Option<Cost> {
        self.costs.get(&node).copied()
    }

    pub(crate) fn reaches(&self, node: NodeIndex) -> bool {
        self.costs.contains_key(&node)
    }

    /// Arcs from the start to `node`. Empty when `node` is the start.
    pub(crate) fn path_to(&self, graph: &SearchGraph, node: NodeIndex) -> Option<Vec<EdgeIndex>> {
        if !self.reaches(node) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = node;
        while current != self.start {
            let arc = *self.predecessors.get(&current)?;
            path.push(arc);
            current = graph.arc(arc).from;
            if path.len() > graph.graph.node_count() {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }
}

/// Dijkstra over the search graph from `start`, stopping once `target` is
/// settled. Among equal-cost arcs into a node the smaller tie key wins.
pub(crate) fn shortest_paths(
    graph: &SearchGraph,
    start: NodeIndex,
    target: Option<NodeIndex>,
) -> ShortestPaths {
    run(graph, start, target, Orientation::Outgoing)
}

/// Costs of reaching `target` from every node that can reach it.
pub(crate) fn costs_to(graph: &SearchGraph, target: NodeIndex) -> ShortestPaths {
    run(graph, target, None, Orientation::Incoming)
}

fn run(
    graph: &SearchGraph,
    start: NodeIndex,
    target: Option<NodeIndex>,
    orientation: Orientation,
) -> ShortestPaths {
    let node_count = graph.graph.node_count();
    let mut costs: HashMap<NodeIndex, Cost> = HashMap::with_capacity(node_count);
    let mut predecessors: HashMap<NodeIndex, EdgeIndex> = HashMap::with_capacity(node_count);
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::with_capacity(node_count / 4 + 1);

    heap.push(State {
        cost: 0.0,
        node: start,
    });
    costs.insert(start, 0.0);

    while let Some(State { cost, node }) = heap.pop() {
        if settled.contains(node.index()) {
            continue;
        }
        settled.insert(node.index());

        if target == Some(node) {
            break;
        }

        for edge in graph.graph.edges_directed(node, orientation) {
            let arc = edge.weight();
            let next = match orientation {
                Orientation::Outgoing => edge.target(),
                Orientation::Incoming => edge.source(),
            };
            if settled.contains(next.index()) {
                continue;
            }
            let next_cost = cost + arc.cost;

            match costs.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    predecessors.insert(next, edge.id());
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    let best = *entry.get();
                    if next_cost < best {
                        *entry.get_mut() = next_cost;
                        predecessors.insert(next, edge.id());
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    } else if next_cost == best {
                        let wins_tie = predecessors
                            .get(&next)
                            .is_none_or(|&current| arc.tie < graph.arc(current).tie);
                        if wins_tie {
                            predecessors.insert(next, edge.id());
                        }
                    }
                }
            }
        }
    }

    ShortestPaths {
        start,
        costs,
        predecessors,
    }
}
