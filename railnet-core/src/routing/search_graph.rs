//! Immutable snapshot of the traversable part of a network, as seen by one
//! line under one weighting policy.

use hashbrown::{HashMap, HashSet};
use log::trace;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use crate::model::{Edge, EdgeId, Heading, Line, NodeId, RoutePathSegment, TrainId};
use crate::network::Network;
use crate::weighting::{CostModel, WeightingPolicy};
use crate::{Cost, Time};

/// Secondary ordering of arcs with equal total cost. Smaller wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TieKey {
    /// Edges with a defined base time come first.
    undefined_base_time: bool,
    /// Ghost edges need no live confirmation from their endpoints.
    needs_confirmation: bool,
    edge: EdgeId,
}

/// One traversable heading of an edge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchArc {
    pub(crate) from: NodeIndex,
    pub(crate) to: NodeIndex,
    pub(crate) edge: EdgeId,
    pub(crate) heading: Heading,
    pub(crate) cost: Cost,
    pub(crate) time: Option<Time>,
    pub(crate) weight: f32,
    pub(crate) tie: TieKey,
}

/// Headings of bidirectional edges held by the active routes of other trains.
#[derive(Debug, Default, Clone)]
pub(crate) struct Reservations {
    held: HashMap<EdgeId, HashSet<Heading>>,
}

impl Reservations {
    pub(crate) fn of_others(network: &Network, train: TrainId) -> Self {
        let mut held: HashMap<EdgeId, HashSet<Heading>> = HashMap::new();
        for line in network.lines().filter(|line| line.train() != train) {
            let Some(route) = line.active_route() else {
                continue;
            };
            if route.is_complete() {
                continue;
            }
            for segment in route.segments() {
                let reserves = network
                    .edge(segment.edge)
                    .is_some_and(|edge| edge.direction().reserves_heading());
                if reserves {
                    held.entry(segment.edge).or_default().insert(segment.heading);
                }
            }
        }
        Self { held }
    }

    pub(crate) fn blocks(&self, edge: EdgeId, heading: Heading) -> bool {
        self.held
            .get(&edge)
            .is_some_and(|headings| headings.contains(&heading.reversed()))
    }
}

#[derive(Debug)]
pub(crate) struct SearchGraph {
    pub(crate) graph: DiGraph<NodeId, SearchArc>,
    index: HashMap<NodeId, NodeIndex>,
    arcs_by_edge: HashMap<EdgeId, Vec<EdgeIndex>>,
    /// Arcs left out because another train holds the opposite heading.
    blocked: HashSet<(EdgeId, Heading)>,
}

impl SearchGraph {
    /// Snapshot `network` for `line`. With `reservations`, headings held
    /// in the opposite direction by other trains are left out.
    pub(crate) fn build(
        network: &Network,
        line: &Line,
        policy: &WeightingPolicy,
        reservations: Option<&Reservations>,
    ) -> Self {
        // Rail-type factors only refine generated routes.
        let model = CostModel::new(
            policy,
            line.weights(),
            network.edge_map(),
            line.toggles().allow_auto_route_gen,
        );

        let mut node_ids: Vec<NodeId> = network.nodes().map(|node| node.id()).collect();
        node_ids.sort_unstable();

        let mut graph = DiGraph::with_capacity(node_ids.len(), network.edge_count() * 2);
        let index: HashMap<NodeId, NodeIndex> = node_ids
            .iter()
            .map(|&node| (node, graph.add_node(node)))
            .collect();

        let mut edges: Vec<&Edge> = network.edges().collect();
        edges.sort_unstable_by_key(|edge| edge.id());

        let mut arcs_by_edge: HashMap<EdgeId, Vec<EdgeIndex>> = HashMap::new();
        let mut blocked = HashSet::new();

        for edge in edges {
            let id = edge.id();
            if line.is_restricted(id) {
                trace!("Edge {id} is restricted for line {}", line.id());
                continue;
            }
            if edge.is_self_loop() {
                continue;
            }
            let ghost = edge
                .endpoints()
                .into_iter()
                .flatten()
                .any(|node| network.node(node).is_some_and(|node| !node.is_responsive()));
            if ghost && !policy.allow_ghost_paths {
                trace!("Edge {id} touches an unresponsive node, ghost paths disabled");
                continue;
            }
            let Some(cost) = model.edge_cost(edge) else {
                trace!("Edge {id} has no allowed source for an active cost dimension");
                continue;
            };
            let tie = TieKey {
                undefined_base_time: edge.base_time().is_none(),
                needs_confirmation: !ghost,
                edge: id,
            };

            for heading in [Heading::AToB, Heading::BToA] {
                if !edge.direction().permits(heading) {
                    continue;
                }
                let Some((from, to)) = edge.oriented(heading) else {
                    continue;
                };
                let (Some(&from), Some(&to)) = (index.get(&from), index.get(&to)) else {
                    continue;
                };
                if edge.direction().reserves_heading()
                    && reservations.is_some_and(|held| held.blocks(id, heading))
                {
                    blocked.insert((id, heading));
                    continue;
                }
                let arc = graph.add_edge(
                    from,
                    to,
                    SearchArc {
                        from,
                        to,
                        edge: id,
                        heading,
                        cost: cost.cost,
                        time: cost.time.map(|time| time.as_time()),
                        weight: cost.weight,
                        tie,
                    },
                );
                arcs_by_edge.entry(id).or_default().push(arc);
            }
        }

        Self {
            graph,
            index,
            arcs_by_edge,
            blocked,
        }
    }

    pub(crate) fn index_of(&self, node: NodeId) -> Option<NodeIndex> {
        self.index.get(&node).copied()
    }

    pub(crate) fn node_id(&self, index: NodeIndex) -> NodeId {
        self.graph[index]
    }

    pub(crate) fn arcs_of(&self, edge: EdgeId) -> &[EdgeIndex] {
        self.arcs_by_edge.get(&edge).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn contains_edge(&self, edge: EdgeId) -> bool {
        self.arcs_by_edge.contains_key(&edge)
    }

    pub(crate) fn is_blocked(&self, edge: EdgeId, heading: Heading) -> bool {
        self.blocked.contains(&(edge, heading))
    }

    pub(crate) fn arc(&self, arc: EdgeIndex) -> &SearchArc {
        &self.graph[arc]
    }

    pub(crate) fn segment(&self, arc: EdgeIndex, required: bool) -> RoutePathSegment {
        let data = self.arc(arc);
        RoutePathSegment {
            edge: data.edge,
            heading: data.heading,
            from: self.node_id(data.from),
            to: self.node_id(data.to),
            required,
            average_time: data.time,
            weight: data.weight,
            cost: data.cost,
        }
    }
}
