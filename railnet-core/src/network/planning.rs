//! Route planning and route progress of the lines in a network.

use log::{info, warn};

use super::{Network, Notification};
use crate::model::{
    Advance, DEFAULT_WEIGHT, EdgeId, GeometryPart, Heading, Line, LineId, NodeId, Route,
    RoutePathSegment, TrainId,
};
use crate::routing::{RoutePlan, Router};
use crate::weighting::CostModel;
use crate::{RouteError, Time};

/// What a recorded traversal did to the train's route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteProgress {
    Advanced,
    /// A looping route wrapped around; carries the completed cycles.
    LoopCompleted(u32),
    /// The primary route is done and kept.
    Completed,
    /// The temporary route is done; the train follows its primary again.
    ReturnedToPrimary,
    /// The route is done and the line was removed.
    Destroyed,
}

impl Network {
    /// Plan the primary route of a train's line.
    ///
    /// On failure the line is docked at its last safe node if it has
    /// `dock_on_error` set.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownTrain`], [`RouteError::AutoRouteGenDisabled`] for
    /// a fixed route, or the planning error.
    pub fn plan_line(&mut self, train: TrainId) -> Result<&Route, RouteError> {
        let line = self
            .routing_table
            .get(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        if !line.toggles().allow_auto_route_gen && line.primary().is_some() {
            return Err(RouteError::AutoRouteGenDisabled(train));
        }
        let plan = Router::new(self, line).plan();
        self.install_plan(train, plan)
    }

    /// Install the outcome of a search computed against this network.
    pub(crate) fn install_plan(
        &mut self,
        train: TrainId,
        plan: Result<RoutePlan, RouteError>,
    ) -> Result<&Route, RouteError> {
        let line = self
            .routing_table
            .get_mut(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        match plan {
            Ok(plan) => {
                let first = plan.order.first().copied();
                info!(
                    "Line {} planned: {} segments, cost {:.1}",
                    line.id(),
                    plan.segments.len(),
                    plan.total_cost()
                );
                let destroy = line.toggles().destroy_on_complete;
                line.set_primary(plan.into_route(train, destroy));
                line.undock();
                if let Some(first) = first {
                    self.notify(first, Notification::RouteChanged { train });
                }
                self.routing_table
                    .get(&train)
                    .and_then(Line::primary)
                    .ok_or(RouteError::NoActiveRoute(train))
            }
            Err(err) => {
                self.dock_after_failure(train, &err);
                Err(err)
            }
        }
    }

    /// Dock the line at its last safe node if it has `dock_on_error` set.
    pub(crate) fn dock_after_failure(&mut self, train: TrainId, err: &RouteError) {
        let Some(line) = self.routing_table.get_mut(&train) else {
            return;
        };
        if !line.toggles().dock_on_error {
            warn!("Planning line {} failed: {err}", line.id());
            return;
        }
        let at = line.last_safe_node();
        warn!("Docking line {} at {at:?}: {err}", line.id());
        line.dock(at, err.to_string());
        if let Some(at) = at {
            self.notify(
                at,
                Notification::LineDocked {
                    train,
                    reason: err.to_string(),
                },
            );
        }
    }

    /// Replan every line whose route went stale. A stale temporary route is
    /// dropped in favour of the primary first.
    pub fn replan_stale_lines(&mut self) -> Vec<(TrainId, Result<(), RouteError>)> {
        let mut stale: Vec<TrainId> = Vec::new();
        let mut released: Vec<TrainId> = Vec::new();
        for line in self.routing_table.values_mut() {
            if line.secondary().is_some_and(Route::is_stale) {
                warn!("Dropping stale temporary route of line {}", line.id());
                line.set_secondary(None);
                released.push(line.train());
            }
            let primary_stale = line.primary().is_some_and(Route::is_stale);
            if primary_stale && line.toggles().allow_auto_route_gen {
                stale.push(line.train());
            }
        }
        for train in released {
            self.release_lock(train);
        }
        stale.sort_unstable();

        stale
            .into_iter()
            .map(|train| {
                let plan = self
                    .routing_table
                    .get(&train)
                    .ok_or(RouteError::UnknownTrain(train))
                    .and_then(|line| Router::new(self, line).plan());
                let result = self.install_plan(train, plan).map(|_| ());
                (train, result)
            })
            .collect()
    }

    /// The route a line currently follows.
    pub fn route(&self, line: LineId) -> Option<&Route> {
        self.line_by_id(line).and_then(Line::active_route)
    }

    /// Record that `train` passed `edge`, folding a measured time into the
    /// line's weights.
    ///
    /// # Errors
    ///
    /// [`RouteError::OffRoute`] if `edge` is not the next segment; the route
    /// is then left unchanged, the measurement is kept.
    pub fn record_traversal(
        &mut self,
        train: TrainId,
        edge: EdgeId,
        measured_time: Option<Time>,
    ) -> Result<RouteProgress, RouteError> {
        let line = self
            .routing_table
            .get_mut(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        if let Some(time) = measured_time {
            line.segment_weight_mut(edge).record_measurement(time);
        }

        let on_secondary = line.is_on_secondary();
        let route = line
            .active_route_mut()
            .ok_or(RouteError::NoActiveRoute(train))?;
        let Some(next) = route.next_segment().cloned() else {
            return Err(RouteError::NoActiveRoute(train));
        };
        if next.edge != edge {
            return Err(RouteError::OffRoute {
                train,
                expected: Some(next.edge),
                actual: edge,
            });
        }
        let advance = route.advance();
        let destroy = route.destroy_on_complete();

        let progress = match advance {
            Advance::Moved => RouteProgress::Advanced,
            Advance::LoopCompleted(count) => {
                self.notify(next.to, Notification::LoopCompleted { train, count });
                RouteProgress::LoopCompleted(count)
            }
            Advance::Completed if on_secondary => {
                line.set_secondary(None);
                self.release_lock(train);
                info!("Train {train} finished its temporary route");
                RouteProgress::ReturnedToPrimary
            }
            Advance::Completed => {
                self.notify(next.to, Notification::RouteCompleted { train });
                if destroy {
                    self.remove_line(train);
                    info!("Train {train} completed its route, line removed");
                    RouteProgress::Destroyed
                } else {
                    RouteProgress::Completed
                }
            }
        };
        Ok(progress)
    }

    /// Send the train on a detour to `destination` and back to where it
    /// stands, as a temporary route.
    ///
    /// # Errors
    ///
    /// [`RouteError::SubroutineDisabled`], [`RouteError::RouteLocked`],
    /// [`RouteError::AlreadyAtDestination`] or a planning error. The line is
    /// unchanged on error.
    pub fn start_subroutine(
        &mut self,
        train: TrainId,
        destination: NodeId,
    ) -> Result<&Route, RouteError> {
        let line = self
            .routing_table
            .get(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        if !line.toggles().allow_subroutine {
            return Err(RouteError::SubroutineDisabled(train));
        }
        if line.is_locked() {
            return Err(RouteError::RouteLocked(train));
        }
        let from = line
            .last_safe_node()
            .ok_or(RouteError::NoActiveRoute(train))?;
        if from == destination {
            return Err(RouteError::AlreadyAtDestination {
                train,
                node: destination,
            });
        }

        let router = Router::new(self, line);
        let mut out = router.plan_leg(from, destination)?;
        let back = router.plan_leg(destination, from)?;
        out.segments.extend(back.segments);
        out.order.push(from);
        let route = out.into_route(train, false);

        let line = self
            .routing_table
            .get_mut(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        line.set_secondary(Some(route));
        self.notify(destination, Notification::RouteChanged { train });
        self.routing_table
            .get(&train)
            .and_then(Line::secondary)
            .ok_or(RouteError::NoActiveRoute(train))
    }

    /// Install a hand-picked chain of edges as the primary route, starting
    /// at the line's first checkpoint. Automatic regeneration is switched
    /// off for the line.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidFixedRoute`] if the edges do not form a
    /// traversable chain.
    pub fn set_fixed_route(
        &mut self,
        train: TrainId,
        edges: &[EdgeId],
    ) -> Result<&Route, RouteError> {
        let line = self
            .routing_table
            .get(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        let mut cursor = *line
            .checkpoints()
            .first()
            .ok_or(RouteError::NoCheckpoints)?;

        let policy = line.policy().unwrap_or(&self.policy);
        let model = CostModel::new(
            policy,
            line.weights(),
            &self.edges,
            line.toggles().allow_auto_route_gen,
        );
        let mut segments = Vec::with_capacity(edges.len());
        for &edge_id in edges {
            let edge = self.edges.get(&edge_id).ok_or_else(|| {
                RouteError::InvalidFixedRoute(format!("unknown edge {edge_id}"))
            })?;
            let heading = edge.heading_from(cursor).ok_or_else(|| {
                RouteError::InvalidFixedRoute(format!("edge {edge_id} does not touch {cursor}"))
            })?;
            if !edge.direction().permits(heading) {
                return Err(RouteError::InvalidFixedRoute(format!(
                    "edge {edge_id} cannot be traversed {heading:?}"
                )));
            }
            let (from, to) = edge.oriented(heading).ok_or_else(|| {
                RouteError::InvalidFixedRoute(format!("edge {edge_id} is open"))
            })?;
            let cost = model.edge_cost(edge);
            segments.push(RoutePathSegment {
                edge: edge_id,
                heading,
                from,
                to,
                required: line.is_required(edge_id),
                average_time: cost
                    .and_then(|cost| cost.time)
                    .map(|time| time.as_time())
                    .or(edge.base_time()),
                weight: line
                    .segment_weight(edge_id)
                    .map_or(DEFAULT_WEIGHT, |weight| weight.weight()),
                cost: cost.map_or(0.0, |cost| cost.cost),
            });
            cursor = to;
        }

        let toggles = *line.toggles();
        let route = Route::new(train, segments, toggles.looping, toggles.destroy_on_complete);
        let line = self
            .routing_table
            .get_mut(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        line.toggles_mut().allow_auto_route_gen = false;
        line.set_primary(route);
        line.set_secondary(None);
        line.undock();
        info!("Line {} follows a fixed route of {} edges", line.id(), edges.len());
        self.routing_table
            .get(&train)
            .and_then(Line::primary)
            .ok_or(RouteError::NoActiveRoute(train))
    }

    /// Mapped track of the train's active route in travel order. Unmapped
    /// edges contribute nothing.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownTrain`] or [`RouteError::NoActiveRoute`].
    pub fn route_geometry(&self, train: TrainId) -> Result<Vec<GeometryPart>, RouteError> {
        let route = self
            .line(train)
            .ok_or(RouteError::UnknownTrain(train))?
            .active_route()
            .ok_or(RouteError::NoActiveRoute(train))?;

        let mut parts = Vec::new();
        for segment in route.segments() {
            let Some(edge) = self.edge(segment.edge) else {
                continue;
            };
            match segment.heading {
                Heading::AToB => parts.extend_from_slice(edge.geometry()),
                Heading::BToA => parts.extend(edge.geometry().iter().rev().map(
                    |part| GeometryPart {
                        a: part.b,
                        b: part.a,
                        rail: part.rail,
                    },
                )),
            }
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Direction, LineStatus, LineToggles, Node};

    struct Fixture {
        network: Network,
        a: NodeId,
        b: NodeId,
        c: NodeId,
        ab: EdgeId,
        bc: EdgeId,
    }

    fn fixture() -> Fixture {
        let mut network = Network::new("test");
        let [a, b, c] = ["A", "B", "C"].map(|name| network.add_node(Node::station(name)).unwrap());
        let ab = network
            .connect_nodes(a, b, Direction::Bidirectional, 2)
            .unwrap();
        let bc = network
            .connect_nodes(b, c, Direction::Bidirectional, 3)
            .unwrap();
        Fixture {
            network,
            a,
            b,
            c,
            ab,
            bc,
        }
    }

    fn once() -> LineToggles {
        LineToggles {
            looping: false,
            destroy_on_complete: false,
            ..LineToggles::default()
        }
    }

    #[test]
    fn test_loop_counts_and_never_completes() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, f.b, f.a]));
        f.network.plan_line(train).unwrap();

        assert_eq!(
            f.network.record_traversal(train, f.ab, Some(2)).unwrap(),
            RouteProgress::Advanced
        );
        assert_eq!(
            f.network.record_traversal(train, f.ab, Some(4)).unwrap(),
            RouteProgress::LoopCompleted(1)
        );
        assert_eq!(
            f.network.record_traversal(train, f.ab, None).unwrap(),
            RouteProgress::Advanced
        );
        let line = f.network.line(train).unwrap();
        assert!(!line.primary().unwrap().is_complete());
        assert_eq!(line.segment_weight(f.ab).unwrap().real_time(), Some(3));
    }

    #[test]
    fn test_single_pass_completes_and_is_destroyed() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network.insert_line(
            Line::new(train, vec![f.a, f.b]).with_toggles(LineToggles {
                looping: false,
                ..LineToggles::default()
            }),
        );
        f.network.plan_line(train).unwrap();

        assert_eq!(
            f.network.record_traversal(train, f.ab, None).unwrap(),
            RouteProgress::Destroyed
        );
        assert!(f.network.line(train).is_none());
    }

    #[test]
    fn test_off_route_traversal_is_rejected() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, f.c]).with_toggles(once()));
        f.network.plan_line(train).unwrap();

        assert_eq!(
            f.network.record_traversal(train, f.bc, None),
            Err(RouteError::OffRoute {
                train,
                expected: Some(f.ab),
                actual: f.bc
            })
        );
        assert_eq!(f.network.line(train).unwrap().primary().unwrap().position(), 0);
    }

    #[test]
    fn test_failed_plan_docks_line() {
        let mut f = fixture();
        let island = f.network.add_node(Node::station("island")).unwrap();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, island]).with_toggles(once()));

        assert!(f.network.plan_line(train).is_err());
        assert_eq!(
            f.network.line(train).unwrap().status(),
            &LineStatus::Docked {
                at: Some(f.a),
                reason: RouteError::NoPathFound {
                    from: f.a,
                    to: island
                }
                .to_string()
            }
        );
    }

    #[test]
    fn test_closing_an_edge_marks_route_stale_and_replans() {
        let mut f = fixture();
        let detour = f
            .network
            .connect_nodes(f.a, f.c, Direction::Bidirectional, 20)
            .unwrap();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, f.c]).with_toggles(once()));
        f.network.plan_line(train).unwrap();

        f.network.set_direction(f.bc, Direction::Closed).unwrap();
        assert!(f.network.line(train).unwrap().primary().unwrap().is_stale());

        let results = f.network.replan_stale_lines();
        assert_eq!(results, vec![(train, Ok(()))]);
        let route = f.network.line(train).unwrap().primary().unwrap();
        assert_eq!(route.edges().collect::<Vec<_>>(), vec![detour]);
        assert!(!route.is_stale());
    }

    #[test]
    fn test_subroutine_returns_to_primary() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, f.b]).with_toggles(once()));
        f.network.plan_line(train).unwrap();

        let detour = f.network.start_subroutine(train, f.c).unwrap();
        assert_eq!(detour.edges().collect::<Vec<_>>(), vec![f.ab, f.bc, f.bc, f.ab]);

        for edge in [f.ab, f.bc, f.bc] {
            assert_eq!(
                f.network.record_traversal(train, edge, None).unwrap(),
                RouteProgress::Advanced
            );
        }
        assert_eq!(
            f.network.record_traversal(train, f.ab, None).unwrap(),
            RouteProgress::ReturnedToPrimary
        );
        assert!(!f.network.line(train).unwrap().is_on_secondary());
    }

    #[test]
    fn test_subroutine_to_own_node_is_rejected() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a, f.b]).with_toggles(once()));
        f.network.plan_line(train).unwrap();

        assert_eq!(
            f.network.start_subroutine(train, f.a).unwrap_err(),
            RouteError::AlreadyAtDestination { train, node: f.a }
        );
        assert!(f.network.line(train).unwrap().secondary().is_none());
    }

    #[test]
    fn test_fixed_route_must_be_a_chain() {
        let mut f = fixture();
        let train = TrainId::new();
        f.network
            .insert_line(Line::new(train, vec![f.a]).with_toggles(once()));

        assert!(matches!(
            f.network.set_fixed_route(train, &[f.bc]),
            Err(RouteError::InvalidFixedRoute(_))
        ));
        let route = f.network.set_fixed_route(train, &[f.ab, f.bc]).unwrap();
        assert_eq!(route.end(), Some(f.c));
        assert_eq!(route.total_cost(), 5.0);
        assert_eq!(
            f.network.plan_line(train).unwrap_err(),
            RouteError::AutoRouteGenDisabled(train)
        );
    }

    #[test]
    fn test_route_by_line_id() {
        let mut f = fixture();
        let train = TrainId::new();
        let line = Line::new(train, vec![f.a, f.b]).with_toggles(once());
        let id = line.id();
        f.network.insert_line(line);
        assert!(f.network.route(id).is_none());

        f.network.plan_line(train).unwrap();
        assert_eq!(f.network.route(id).unwrap().end(), Some(f.b));
    }
}
