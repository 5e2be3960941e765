//! Commands sent to network nodes and their effect on the routing table.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{Network, Notification};
use crate::model::{NodeId, TrainId};
use crate::routing::Router;
use crate::{Error, RouteError};

/// Command set understood by network nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetCommand {
    /// Temporary route to a destination.
    Route,
    /// Temporary route that no automatic reroute may replace.
    RouteLocked,
    /// Back to the default route, releasing any lock.
    RouteDefault,
    /// Replace the checkpoints and recompute the default route.
    RouteSet,
    UpdateDisable,
    UpdateEnable,
}

impl NetCommand {
    pub fn is_update(self) -> bool {
        matches!(self, NetCommand::UpdateDisable | NetCommand::UpdateEnable)
    }
}

/// Payload of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandParam {
    #[default]
    None,
    Train(TrainId),
    Route {
        train: TrainId,
        destination: NodeId,
    },
    Checkpoints {
        train: TrainId,
        checkpoints: Vec<NodeId>,
    },
}

impl CommandParam {
    pub fn train(&self) -> Option<TrainId> {
        match self {
            CommandParam::None => None,
            CommandParam::Train(train)
            | CommandParam::Route { train, .. }
            | CommandParam::Checkpoints { train, .. } => Some(*train),
        }
    }
}

/// Anything that can accept or refuse a [`NetCommand`].
pub trait CommandHandler {
    /// Returns whether the command was accepted.
    fn handle_command(&mut self, command: NetCommand, param: &CommandParam) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Accepted,
    Refused(String),
    /// The node accepted, but the route search behind the command failed.
    Failed(RouteError),
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted)
    }
}

impl From<CommandOutcome> for bool {
    fn from(outcome: CommandOutcome) -> Self {
        outcome.is_accepted()
    }
}

impl Network {
    /// Deliver `command` to `node` and apply its routing effect.
    ///
    /// Unknown nodes refuse without touching any state. A failed search for a
    /// temporary route docks the line if it has `dock_on_error` set; a failed
    /// `ROUTE_SET` leaves the line as it was.
    pub fn dispatch(&mut self, node: NodeId, command: NetCommand, param: &CommandParam) -> bool {
        self.dispatch_outcome(node, command, param).is_accepted()
    }

    /// Like [`Network::dispatch`], with the refusal as an error.
    ///
    /// # Errors
    ///
    /// [`Error::CommandRefused`] if the node or the routing table refused,
    /// [`Error::Route`] if the search behind the command failed.
    pub fn dispatch_strict(
        &mut self,
        node: NodeId,
        command: NetCommand,
        param: &CommandParam,
    ) -> Result<(), Error> {
        match self.dispatch_outcome(node, command, param) {
            CommandOutcome::Accepted => Ok(()),
            CommandOutcome::Refused(_) => Err(Error::CommandRefused { node, command }),
            CommandOutcome::Failed(err) => Err(err.into()),
        }
    }

    pub fn dispatch_outcome(
        &mut self,
        node: NodeId,
        command: NetCommand,
        param: &CommandParam,
    ) -> CommandOutcome {
        let Some(target) = self.nodes.get(&node) else {
            debug!("Dropping {command:?} for unknown node {node}");
            return CommandOutcome::Refused(format!("unknown node {node}"));
        };
        // The node keeps its old state when the routing effect is refused.
        if let Err(reason) = self.check_effect(node, command, param) {
            return CommandOutcome::Refused(reason);
        }
        let mut handler = target.clone();
        if !handler.handle_command(command, param) {
            return CommandOutcome::Refused(format!(
                "{} {} refused {command:?}",
                target.kind().name(),
                target.label()
            ));
        }
        if let Err(err) = self.apply_effect(node, command, param) {
            return CommandOutcome::Failed(err);
        }
        if let Some(stored) = self.nodes.get_mut(&node) {
            *stored = handler;
        }
        info!("Node {node} accepted {command:?}");
        CommandOutcome::Accepted
    }

    /// Whether the routing table lets the command through.
    fn check_effect(
        &self,
        node: NodeId,
        command: NetCommand,
        param: &CommandParam,
    ) -> Result<(), String> {
        if command.is_update() {
            return Ok(());
        }
        let train = param
            .train()
            .ok_or_else(|| format!("{command:?} needs a train"))?;
        let line = self
            .line(train)
            .ok_or_else(|| RouteError::UnknownTrain(train).to_string())?;
        match command {
            NetCommand::Route | NetCommand::RouteLocked => {
                if line.is_locked() {
                    return Err(RouteError::RouteLocked(train).to_string());
                }
                // ROUTE_LOCKED ignores allow_temporary_routes.
                if command == NetCommand::Route && !line.toggles().allow_temporary_routes {
                    return Err(format!("line {} takes no temporary routes", line.id()));
                }
                let destination = destination_of(node, param);
                if line.last_safe_node() == Some(destination) {
                    return Err(RouteError::AlreadyAtDestination {
                        train,
                        node: destination,
                    }
                    .to_string());
                }
                Ok(())
            }
            NetCommand::RouteSet => {
                if !line.toggles().allow_auto_route_gen {
                    return Err(RouteError::AutoRouteGenDisabled(train).to_string());
                }
                Ok(())
            }
            NetCommand::RouteDefault | NetCommand::UpdateDisable | NetCommand::UpdateEnable => {
                Ok(())
            }
        }
    }

    fn apply_effect(
        &mut self,
        node: NodeId,
        command: NetCommand,
        param: &CommandParam,
    ) -> Result<(), RouteError> {
        let Some(train) = param.train() else {
            return Ok(());
        };
        match command {
            NetCommand::Route | NetCommand::RouteLocked => self.adopt_temporary(
                train,
                destination_of(node, param),
                command == NetCommand::RouteLocked,
            ),
            NetCommand::RouteDefault => {
                let line = self
                    .routing_table
                    .get_mut(&train)
                    .ok_or(RouteError::UnknownTrain(train))?;
                if line.take_secondary().is_some() {
                    debug!("Train {train} returns to its default route");
                }
                self.release_lock(train);
                Ok(())
            }
            NetCommand::RouteSet => {
                let CommandParam::Checkpoints { checkpoints, .. } = param else {
                    return Ok(());
                };
                self.replace_checkpoints(train, checkpoints.clone())
            }
            NetCommand::UpdateDisable | NetCommand::UpdateEnable => Ok(()),
        }
    }

    /// Plan from the train's position to `destination` and install the
    /// result as the secondary route, or as the primary when the line
    /// always updates its route.
    fn adopt_temporary(
        &mut self,
        train: TrainId,
        destination: NodeId,
        lock: bool,
    ) -> Result<(), RouteError> {
        let line = self.line(train).ok_or(RouteError::UnknownTrain(train))?;
        let from = line
            .last_safe_node()
            .ok_or(RouteError::NoActiveRoute(train))?;
        let destroy = line.toggles().destroy_on_complete;
        let replace_primary = line.toggles().always_update_route;
        let planned = Router::new(self, line).plan_leg(from, destination);
        let plan = match planned {
            Ok(plan) => plan,
            Err(err) => {
                self.dock_after_failure(train, &err);
                return Err(err);
            }
        };
        let route = plan.into_route(train, destroy);

        let line = self
            .routing_table
            .get_mut(&train)
            .ok_or(RouteError::UnknownTrain(train))?;
        if replace_primary {
            line.set_primary(route);
            line.set_secondary(None);
        } else {
            line.set_secondary(Some(route));
        }
        if lock {
            line.set_locked(true);
        }
        self.notify(destination, Notification::RouteChanged { train });
        Ok(())
    }

    /// Plan the new checkpoints on a copy of the line and only install them
    /// once planning succeeded.
    fn replace_checkpoints(
        &mut self,
        train: TrainId,
        checkpoints: Vec<NodeId>,
    ) -> Result<(), RouteError> {
        let mut candidate = self
            .line(train)
            .cloned()
            .ok_or(RouteError::UnknownTrain(train))?;
        candidate.set_checkpoints(checkpoints);
        let route = Router::new(self, &candidate)
            .plan()?
            .into_route(train, candidate.toggles().destroy_on_complete);
        candidate.set_primary(route);
        candidate.undock();
        if let Some(first) = candidate.checkpoints().first().copied() {
            self.notify(first, Notification::RouteChanged { train });
        }
        self.routing_table.insert(train, candidate);
        Ok(())
    }
}

/// Where a `ROUTE` or `ROUTE_LOCKED` sends the train: the named destination,
/// else the addressed node.
fn destination_of(node: NodeId, param: &CommandParam) -> NodeId {
    match param {
        CommandParam::Route { destination, .. } => *destination,
        _ => node,
    }
}
