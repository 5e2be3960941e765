use log::{debug, warn};
use petgraph::graph::EdgeIndex;

use super::dijkstra::{costs_to, shortest_paths};
use super::search_graph::{Reservations, SearchGraph};
use crate::model::{Direction, EdgeId, Heading, Line, NodeId, Route, RoutePathSegment, TrainId};
use crate::network::Network;
use crate::weighting::WeightingPolicy;
use crate::{Cost, RouteError};

/// Outcome of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub segments: Vec<RoutePathSegment>,
    /// Checkpoints in the order they are visited, including a closing
    /// return to the start for loops.
    pub order: Vec<NodeId>,
    /// Checkpoints dropped under `ignore_on_error`.
    pub skipped: Vec<NodeId>,
    pub looping: bool,
}

impl RoutePlan {
    pub fn total_cost(&self) -> Cost {
        self.segments.iter().map(|segment| segment.cost).sum()
    }

    pub fn into_route(self, train: TrainId, destroy_on_complete: bool) -> Route {
        Route::new(train, self.segments, self.looping, destroy_on_complete)
            .with_skipped(self.skipped)
    }

    /// First segment whose heading another train of `network` now holds the
    /// other way.
    pub(crate) fn conflicting_edge(&self, network: &Network, train: TrainId) -> Option<EdgeId> {
        let held = Reservations::of_others(network, train);
        self.segments
            .iter()
            .find(|segment| held.blocks(segment.edge, segment.heading))
            .map(|segment| segment.edge)
    }
}

/// Plans routes for one line over a snapshot of its network.
///
/// The snapshot leaves out closed, restricted and unresolvable edges as well
/// as bidirectional headings held the other way by other trains.
pub struct Router<'a> {
    network: &'a Network,
    line: &'a Line,
    policy: &'a WeightingPolicy,
    graph: SearchGraph,
}

impl<'a> Router<'a> {
    pub fn new(network: &'a Network, line: &'a Line) -> Self {
        let policy = line.policy().unwrap_or_else(|| network.policy());
        let reservations = Reservations::of_others(network, line.train());
        let graph = SearchGraph::build(network, line, policy, Some(&reservations));
        Self {
            network,
            line,
            policy,
            graph,
        }
    }

    /// Plan the line's checkpoints under its toggles.
    ///
    /// # Errors
    ///
    /// [`RouteError::NoCheckpoints`] for an empty checkpoint list, otherwise
    /// the first hop error that `ignore_on_error` may not skip.
    pub fn plan(&self) -> Result<RoutePlan, RouteError> {
        let toggles = self.line.toggles();
        self.plan_stops(
            self.line.checkpoints(),
            toggles.looping,
            toggles.ordered_points,
            toggles.ignore_on_error,
            self.line.required_edges(),
        )
    }

    /// Plan a single, non-looping leg. Required edges of the line do not
    /// apply to such temporary routes.
    ///
    /// # Errors
    ///
    /// [`RouteError::NoPathFound`] or [`RouteError::DirectionConflict`].
    pub fn plan_leg(&self, from: NodeId, to: NodeId) -> Result<RoutePlan, RouteError> {
        self.plan_stops(&[from, to], false, true, false, Vec::new())
    }

    fn plan_stops(
        &self,
        stops: &[NodeId],
        looping: bool,
        ordered: bool,
        ignore_on_error: bool,
        required: Vec<EdgeId>,
    ) -> Result<RoutePlan, RouteError> {
        let (Some(&first), Some(&last)) = (stops.first(), stops.last()) else {
            return Err(RouteError::NoCheckpoints);
        };
        let mut required = self.check_required(required, first, last, ignore_on_error)?;

        let mut order = if ordered {
            stops.to_vec()
        } else {
            self.nearest_first(stops)
        };
        if looping && order.len() > 1 && order.last() != Some(&first) {
            order.push(first);
        }

        let mut segments = Vec::new();
        let mut skipped = Vec::new();
        let mut current = first;
        for &target in &order[1..] {
            if target == current {
                continue;
            }
            match self.hop(current, target, &mut required) {
                Ok(hop) => {
                    segments.extend(hop);
                    current = target;
                }
                Err(err) if ignore_on_error && err.is_ignorable() => {
                    warn!(
                        "Skipping checkpoint {target} of line {}: {err}",
                        self.line.id()
                    );
                    skipped.push(target);
                }
                Err(err) => return Err(err),
            }
        }

        if segments.is_empty() && !skipped.is_empty() {
            return Err(RouteError::NoPathFound {
                from: first,
                to: last,
            });
        }
        for edge in required {
            warn!(
                "Required edge {edge} lies on no path of line {}, ignoring it",
                self.line.id()
            );
        }
        debug!(
            "Planned {} segments for line {} ({} checkpoints skipped)",
            segments.len(),
            self.line.id(),
            skipped.len()
        );

        Ok(RoutePlan {
            segments,
            order,
            skipped,
            looping,
        })
    }

    /// Drop requirements that can never hold, or fail on them.
    fn check_required(
        &self,
        required: Vec<EdgeId>,
        from: NodeId,
        to: NodeId,
        ignore_on_error: bool,
    ) -> Result<Vec<EdgeId>, RouteError> {
        let mut kept = Vec::with_capacity(required.len());
        for edge in required {
            let Some(track) = self.network.edge(edge) else {
                warn!("Required edge {edge} is not part of the network, ignoring it");
                continue;
            };
            if self.graph.contains_edge(edge) {
                kept.push(edge);
                continue;
            }
            let err = if self.graph.is_blocked(edge, Heading::AToB)
                || self.graph.is_blocked(edge, Heading::BToA)
            {
                RouteError::DirectionConflict { edge }
            } else {
                RouteError::UnsatisfiableRequiredEdge { edge, from, to }
            };
            if !ignore_on_error {
                return Err(err);
            }
            let why = if self.line.is_restricted(edge) {
                "restricted"
            } else if track.direction() == Direction::Closed {
                "closed"
            } else {
                "not traversable"
            };
            warn!("Dropping required edge {edge}: it is {why}");
        }
        Ok(kept)
    }

    /// Greedy visiting order: always the cheapest remaining checkpoint next.
    /// Unreachable checkpoints keep their relative order at the end.
    fn nearest_first(&self, stops: &[NodeId]) -> Vec<NodeId> {
        let Some((&first, rest)) = stops.split_first() else {
            return Vec::new();
        };
        let mut order = vec![first];
        let mut remaining = rest.to_vec();
        let mut current = first;

        while !remaining.is_empty() {
            let paths = self
                .graph
                .index_of(current)
                .map(|start| shortest_paths(&self.graph, start, None));
            let nearest = remaining
                .iter()
                .enumerate()
                .filter_map(|(position, &node)| {
                    let cost = paths.as_ref()?.cost_to(self.graph.index_of(node)?)?;
                    Some((cost, node, position))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

            match nearest {
                Some((_, node, position)) => {
                    remaining.remove(position);
                    order.push(node);
                    current = node;
                }
                None => order.append(&mut remaining),
            }
        }
        order
    }

    /// Cheapest path `from` -> `to` that passes every still pending required
    /// edge lying on some walk between them.
    fn hop(
        &self,
        from: NodeId,
        to: NodeId,
        required: &mut Vec<EdgeId>,
    ) -> Result<Vec<RoutePathSegment>, RouteError> {
        let (Some(start), Some(goal)) = (self.graph.index_of(from), self.graph.index_of(to)) else {
            return Err(RouteError::NoPathFound { from, to });
        };
        let mut paths = shortest_paths(&self.graph, start, None);
        if !paths.reaches(goal) {
            return Err(self.diagnose(from, to));
        }
        let to_goal = costs_to(&self.graph, goal);

        let mut relevant: Vec<EdgeId> = required
            .iter()
            .copied()
            .filter(|&edge| {
                self.graph.arcs_of(edge).iter().any(|&arc| {
                    let arc = self.graph.arc(arc);
                    paths.reaches(arc.from) && to_goal.reaches(arc.to)
                })
            })
            .collect();

        let mut arcs: Vec<EdgeIndex> = Vec::new();
        while !relevant.is_empty() {
            let nearest = relevant
                .iter()
                .flat_map(|&edge| self.graph.arcs_of(edge).iter().copied())
                .filter_map(|index| {
                    let arc = self.graph.arc(index);
                    if !to_goal.reaches(arc.to) {
                        return None;
                    }
                    paths
                        .cost_to(arc.from)
                        .map(|cost| (cost + arc.cost, arc.tie, index))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            let Some((_, _, via)) = nearest else {
                return Err(RouteError::UnsatisfiableRequiredEdge {
                    edge: relevant[0],
                    from,
                    to,
                });
            };

            let mut leg = paths
                .path_to(&self.graph, self.graph.arc(via).from)
                .ok_or(RouteError::NoPathFound { from, to })?;
            leg.push(via);
            for &index in &leg {
                let edge = self.graph.arc(index).edge;
                relevant.retain(|&pending| pending != edge);
            }
            arcs.extend(leg);
            paths = shortest_paths(&self.graph, self.graph.arc(via).to, None);
        }

        let tail = paths
            .path_to(&self.graph, goal)
            .ok_or(RouteError::NoPathFound { from, to })?;
        arcs.extend(tail);

        for &index in &arcs {
            let edge = self.graph.arc(index).edge;
            required.retain(|&pending| pending != edge);
        }
        Ok(arcs
            .into_iter()
            .map(|index| {
                let edge = self.graph.arc(index).edge;
                self.graph.segment(index, self.line.is_required(edge))
            })
            .collect())
    }

    /// Tell a reservation conflict apart from a plain missing path.
    fn diagnose(&self, from: NodeId, to: NodeId) -> RouteError {
        let unreachable = RouteError::NoPathFound { from, to };
        let relaxed = SearchGraph::build(self.network, self.line, self.policy, None);
        let (Some(start), Some(goal)) = (relaxed.index_of(from), relaxed.index_of(to)) else {
            return unreachable;
        };
        let Some(path) = shortest_paths(&relaxed, start, Some(goal)).path_to(&relaxed, goal) else {
            return unreachable;
        };
        path.into_iter()
            .map(|index| relaxed.arc(index))
            .find(|arc| self.graph.is_blocked(arc.edge, arc.heading))
            .map_or(unreachable, |arc| RouteError::DirectionConflict { edge: arc.edge })
    }
}
