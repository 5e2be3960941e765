//! Process-wide owner of all networks and of nodes not yet bound to one.

use std::sync::Arc;

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use rayon::prelude::*;

use super::{CommandHandler, CommandParam, NetCommand, Network, NetworkId, NetworkSnapshot};
use crate::model::{Line, Node, NodeId, TrainId};
use crate::routing::{RoutePlan, Router};
use crate::{Error, GraphError, RouteError};

pub type SharedNetwork = Arc<RwLock<Network>>;

/// Result of planning one line during [`Registry::plan_all`].
pub type PlanReport = (NetworkId, TrainId, Result<(), RouteError>);

#[derive(Debug, Default)]
pub struct Registry {
    networks: HashMap<NetworkId, SharedNetwork>,
    /// Nodes known to the process but not part of any network.
    unbound: HashMap<NodeId, Node>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_network(&mut self, domain: impl Into<String>) -> SharedNetwork {
        self.insert_network(Network::new(domain))
    }

    pub fn insert_network(&mut self, network: Network) -> SharedNetwork {
        let id = network.id();
        info!("Registered network {} ({id})", network.domain());
        let shared = Arc::new(RwLock::new(network));
        self.networks.insert(id, Arc::clone(&shared));
        shared
    }

    pub fn network(&self, id: NetworkId) -> Option<SharedNetwork> {
        self.networks.get(&id).cloned()
    }

    pub fn network_by_domain(&self, domain: &str) -> Option<SharedNetwork> {
        self.networks
            .values()
            .find(|network| network.read().domain() == domain)
            .cloned()
    }

    /// Drop a network. Its nodes return to the unbound pool without edges.
    pub fn remove_network(&mut self, id: NetworkId) -> Option<SharedNetwork> {
        let shared = self.networks.remove(&id)?;
        let released = shared.write().release_nodes();
        info!("Removed network {id}, {} nodes unbound", released.len());
        self.unbound
            .extend(released.into_iter().map(|node| (node.id(), node)));
        Some(shared)
    }

    pub fn network_ids(&self) -> Vec<NetworkId> {
        self.networks.keys().copied().sorted().collect()
    }

    /// Put a node into the unbound pool.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeAlreadyBound`] if the node points at a network or
    /// its identity is already known.
    pub fn register_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        let known = self.unbound.contains_key(&id) || self.locate_node(id).is_some();
        if node.network().is_some() || known {
            return Err(GraphError::NodeAlreadyBound(id));
        }
        self.unbound.insert(id, node);
        Ok(id)
    }

    pub fn unbound_node(&self, id: NodeId) -> Option<&Node> {
        self.unbound.get(&id)
    }

    /// Move a node from the unbound pool into a network.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNetwork`], or [`GraphError::UnknownNode`] if the
    /// node is not in the pool.
    pub fn bind_node(&mut self, node: NodeId, network: NetworkId) -> Result<(), Error> {
        let shared = self
            .networks
            .get(&network)
            .ok_or(Error::UnknownNetwork(network))?;
        let pending = self
            .unbound
            .remove(&node)
            .ok_or(GraphError::UnknownNode(node))?;
        let mut guard = shared.write();
        if let Err(err) = guard.add_node(pending.clone()) {
            self.unbound.insert(node, pending);
            return Err(err.into());
        }
        debug!("Bound node {node} to network {}", guard.domain());
        Ok(())
    }

    /// Take a node out of its network and back into the unbound pool.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`] if no network holds the node.
    pub fn unbind_node(&mut self, node: NodeId) -> Result<(), Error> {
        let network = self
            .locate_node(node)
            .ok_or(GraphError::UnknownNode(node))?;
        let shared = self
            .networks
            .get(&network)
            .ok_or(Error::UnknownNetwork(network))?;
        let removed = shared.write().remove_node(node)?;
        self.unbound.insert(node, removed);
        Ok(())
    }

    /// The network holding `node`, by scanning all networks.
    pub fn locate_node(&self, node: NodeId) -> Option<NetworkId> {
        self.networks
            .iter()
            .find(|(_, network)| network.read().contains_node(node))
            .map(|(&id, _)| id)
    }

    /// # Errors
    ///
    /// [`GraphError::UnknownNode`] if no network holds the node. Unbound
    /// nodes have no clients.
    pub fn connected_clients(&self, node: NodeId) -> Result<Vec<NodeId>, Error> {
        if self.unbound.contains_key(&node) {
            return Ok(Vec::new());
        }
        let network = self
            .locate_node(node)
            .ok_or(GraphError::UnknownNode(node))?;
        let shared = self
            .networks
            .get(&network)
            .ok_or(Error::UnknownNetwork(network))?;
        Ok(shared.read().connected_clients(node)?)
    }

    /// Route a command to wherever the node lives. Unbound nodes only take
    /// the notification toggles; unknown nodes refuse.
    pub fn dispatch(&mut self, node: NodeId, command: NetCommand, param: &CommandParam) -> bool {
        if let Some(pending) = self.unbound.get_mut(&node) {
            return command.is_update() && pending.handle_command(command, param);
        }
        let Some(network) = self.locate_node(node) else {
            debug!("Dropping {command:?} for unknown node {node}");
            return false;
        };
        self.networks
            .get(&network)
            .is_some_and(|shared| shared.write().dispatch(node, command, param))
    }

    /// Plan every line of every network.
    ///
    /// Searches of one network run in parallel against the same state. The
    /// results are then installed in train order, and a result that runs
    /// against a heading installed before it is planned again.
    pub fn plan_all(&self) -> Vec<PlanReport> {
        let mut reports = Vec::new();
        for (&id, shared) in self.networks.iter().sorted_by_key(|(id, _)| **id) {
            let guard = shared.upgradable_read();
            let network: &Network = &guard;
            let trains: Vec<TrainId> = network
                .lines()
                .filter(|line| line.toggles().allow_auto_route_gen || line.primary().is_none())
                .map(Line::train)
                .sorted()
                .collect();

            let plans: Vec<(TrainId, Result<RoutePlan, RouteError>)> = trains
                .par_iter()
                .map(|&train| {
                    let plan = network
                        .line(train)
                        .ok_or(RouteError::UnknownTrain(train))
                        .and_then(|line| Router::new(network, line).plan());
                    (train, plan)
                })
                .collect();

            let mut network = RwLockUpgradableReadGuard::upgrade(guard);
            for (train, plan) in plans {
                let plan = match plan {
                    Ok(found) => match found.conflicting_edge(&network, train) {
                        Some(edge) => {
                            debug!("Replanning train {train}, edge {edge} is taken the other way");
                            network
                                .line(train)
                                .ok_or(RouteError::UnknownTrain(train))
                                .and_then(|line| Router::new(&network, line).plan())
                        }
                        None => Ok(found),
                    },
                    Err(err) => Err(err),
                };
                let result = network.install_plan(train, plan).map(|_| ());
                reports.push((id, train, result));
            }
        }
        reports
    }

    /// Snapshots of all networks in identity order.
    pub fn snapshot(&self) -> Vec<NetworkSnapshot> {
        self.networks
            .iter()
            .sorted_by_key(|(id, _)| **id)
            .map(|(_, shared)| shared.read().snapshot())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Direction, LineToggles};

    #[test]
    fn test_bind_and_unbind_node() {
        let mut registry = Registry::new();
        let network = registry.create_network("overworld");
        let id = network.read().id();
        let node = registry.register_node(Node::station("A")).unwrap();
        assert_eq!(registry.locate_node(node), None);

        registry.bind_node(node, id).unwrap();
        assert_eq!(registry.locate_node(node), Some(id));
        assert!(registry.unbound_node(node).is_none());

        registry.unbind_node(node).unwrap();
        assert_eq!(registry.locate_node(node), None);
        assert_eq!(registry.unbound_node(node).unwrap().network(), None);
    }

    #[test]
    fn test_removed_network_releases_nodes() {
        let mut registry = Registry::new();
        let shared = registry.create_network("overworld");
        let id = shared.read().id();
        let (a, b) = {
            let mut network = shared.write();
            let a = network.add_node(Node::station("A")).unwrap();
            let b = network.add_node(Node::station("B")).unwrap();
            network
                .connect_nodes(a, b, Direction::Bidirectional, 3)
                .unwrap();
            (a, b)
        };

        registry.remove_network(id).unwrap();
        assert!(registry.network(id).is_none());
        for node in [a, b] {
            let released = registry.unbound_node(node).unwrap();
            assert_eq!(released.network(), None);
            assert!(released.edges().is_empty());
        }
        assert_eq!(shared.read().edge_count(), 0);
    }

    #[test]
    fn test_unbound_node_takes_only_update_commands() {
        let mut registry = Registry::new();
        let node = registry.register_node(Node::station("A")).unwrap();
        assert!(!registry.dispatch(node, NetCommand::RouteDefault, &CommandParam::None));
        assert!(registry.dispatch(node, NetCommand::UpdateDisable, &CommandParam::None));
        assert!(!registry.unbound_node(node).unwrap().notifications_enabled());
    }

    #[test]
    fn test_unknown_node_refuses() {
        let mut registry = Registry::new();
        registry.create_network("overworld");
        assert!(!registry.dispatch(NodeId::new(), NetCommand::Route, &CommandParam::None));
    }

    #[test]
    fn test_plan_all_respects_headings_installed_first() {
        let mut registry = Registry::new();
        let shared = registry.create_network("overworld");
        let (east, west, edge) = {
            let mut network = shared.write();
            let a = network.add_node(Node::station("A")).unwrap();
            let b = network.add_node(Node::station("B")).unwrap();
            let edge = network
                .connect_nodes(a, b, Direction::Bidirectional, 4)
                .unwrap();
            let one_way = LineToggles {
                looping: false,
                ..LineToggles::default()
            };
            let east = TrainId::from_u128(1);
            let west = TrainId::from_u128(2);
            network.insert_line(Line::new(east, vec![a, b]).with_toggles(one_way));
            network.insert_line(Line::new(west, vec![b, a]).with_toggles(one_way));
            (east, west, edge)
        };

        let mut results: Vec<(TrainId, Result<(), RouteError>)> = registry
            .plan_all()
            .into_iter()
            .map(|(_, train, result)| (train, result))
            .collect();
        results.sort_by_key(|(train, _)| *train);
        assert_eq!(
            results,
            vec![
                (east, Ok(())),
                (west, Err(RouteError::DirectionConflict { edge }))
            ]
        );
        assert!(shared.read().line(west).unwrap().primary().is_none());
    }

    #[test]
    fn test_plan_all_plans_every_network() {
        let mut registry = Registry::new();
        for domain in ["overworld", "nether"] {
            let shared = registry.create_network(domain);
            let mut network = shared.write();
            let a = network.add_node(Node::station("A")).unwrap();
            let b = network.add_node(Node::station("B")).unwrap();
            network
                .connect_nodes(a, b, Direction::Bidirectional, 4)
                .unwrap();
            network.insert_line(Line::new(TrainId::new(), vec![a, b]));
        }

        let reports = registry.plan_all();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|(_, _, result)| result.is_ok()));
        for snapshot in registry.snapshot() {
            assert!(snapshot.lines[0].primary().is_some());
        }
    }
}
