//! Lines bind a train to its routes, checkpoints and routing policy.

use hashbrown::HashMap;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{EdgeId, LineId, NodeId, TrainId};
use super::route::Route;
use crate::weighting::WeightingPolicy;
use crate::{Fuel, Time};

/// Neutral per-edge weight.
pub const DEFAULT_WEIGHT: f32 = 1.0;

/// Per-line overrides for one edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentWeight {
    edge: EdgeId,
    /// Measured traversal time, running average over `samples`.
    #[serde(default)]
    real_time: Option<Time>,
    #[serde(default)]
    samples: u32,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    restricted: bool,
    #[serde(default = "default_weight", deserialize_with = "deserialize_weight")]
    weight: f32,
    #[serde(default)]
    fuel_consumption: Option<Fuel>,
}

fn default_weight() -> f32 {
    DEFAULT_WEIGHT
}

fn deserialize_weight<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    f32::deserialize(deserializer).map(normalize_weight)
}

/// Weights cannot be zero; zero means "no effect". Negative or non-finite
/// weights would break the search and are treated the same way.
fn normalize_weight(weight: f32) -> f32 {
    if weight == 0.0 {
        DEFAULT_WEIGHT
    } else if !weight.is_finite() || weight < 0.0 {
        warn!("Ignoring invalid segment weight {weight}, using {DEFAULT_WEIGHT}");
        DEFAULT_WEIGHT
    } else {
        weight
    }
}

impl SegmentWeight {
    pub fn new(edge: EdgeId) -> Self {
        Self {
            edge,
            real_time: None,
            samples: 0,
            required: false,
            restricted: false,
            weight: DEFAULT_WEIGHT,
            fuel_consumption: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.set_weight(weight);
        self
    }

    #[must_use]
    pub fn with_real_time(mut self, real_time: Time) -> Self {
        self.set_real_time(Some(real_time));
        self
    }

    #[must_use]
    pub fn with_fuel(mut self, fuel: Fuel) -> Self {
        self.fuel_consumption = Some(fuel);
        self
    }

    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn real_time(&self) -> Option<Time> {
        self.real_time
    }

    /// Overwrite the measured time and restart averaging from it.
    pub fn set_real_time(&mut self, real_time: Option<Time>) {
        self.real_time = real_time;
        self.samples = u32::from(real_time.is_some());
    }

    /// Fold one measured traversal into the running average.
    pub fn record_measurement(&mut self, time: Time) {
        let samples = u64::from(self.samples);
        self.real_time = Some(match self.real_time {
            Some(average) if samples > 0 => (average * samples + time) / (samples + 1),
            _ => time,
        });
        self.samples = self.samples.saturating_add(1);
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    pub fn set_restricted(&mut self, restricted: bool) {
        self.restricted = restricted;
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: f32) {
        self.weight = normalize_weight(weight);
    }

    pub fn fuel_consumption(&self) -> Option<Fuel> {
        self.fuel_consumption
    }

    pub fn set_fuel_consumption(&mut self, fuel: Option<Fuel>) {
        self.fuel_consumption = fuel;
    }
}

/// Behavioural switches of a line.
///
/// These are consulted by the router and by the network's route bookkeeping;
/// cost-source switches live in [`WeightingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineToggles {
    /// Checkpoints must be visited in list order.
    pub ordered_points: bool,
    /// Repeat the route continuously.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Allow automatic detours (refuelling) on the secondary route.
    pub allow_subroutine: bool,
    /// Allow regenerating the route from weights instead of a fixed path.
    pub allow_auto_route_gen: bool,
    /// Allow short-lived reroutes.
    pub allow_temporary_routes: bool,
    /// Skip errored checkpoints instead of failing.
    pub ignore_on_error: bool,
    /// Halt at the last safe node on an error that cannot be ignored.
    pub dock_on_error: bool,
    /// An adopted temporary route replaces the primary.
    pub always_update_route: bool,
    pub destroy_on_complete: bool,
}

impl Default for LineToggles {
    fn default() -> Self {
        Self {
            ordered_points: true,
            looping: true,
            allow_subroutine: true,
            allow_auto_route_gen: true,
            allow_temporary_routes: true,
            ignore_on_error: false,
            dock_on_error: true,
            always_update_route: false,
            destroy_on_complete: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStatus {
    #[default]
    Running,
    /// Halted at `at` until the routing error is resolved.
    Docked { at: Option<NodeId>, reason: String },
}

/// A train's binding to its routes and routing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    id: LineId,
    train: TrainId,
    primary: Option<Route>,
    /// Temporary route (refuelling, congestion). Falls back to primary once done.
    secondary: Option<Route>,
    weights: HashMap<EdgeId, SegmentWeight>,
    checkpoints: Vec<NodeId>,
    toggles: LineToggles,
    /// Overrides the network-wide policy when set.
    policy: Option<WeightingPolicy>,
    locked: bool,
    status: LineStatus,
}

impl Line {
    pub fn new(train: TrainId, checkpoints: Vec<NodeId>) -> Self {
        Self {
            id: LineId::new(),
            train,
            primary: None,
            secondary: None,
            weights: HashMap::new(),
            checkpoints,
            toggles: LineToggles::default(),
            policy: None,
            locked: false,
            status: LineStatus::Running,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: LineId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_toggles(mut self, toggles: LineToggles) -> Self {
        self.toggles = toggles;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: WeightingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_segment(mut self, weight: SegmentWeight) -> Self {
        self.set_segment_weight(weight);
        self
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn train(&self) -> TrainId {
        self.train
    }

    pub fn checkpoints(&self) -> &[NodeId] {
        &self.checkpoints
    }

    pub fn set_checkpoints(&mut self, checkpoints: Vec<NodeId>) {
        self.checkpoints = checkpoints;
    }

    pub fn toggles(&self) -> &LineToggles {
        &self.toggles
    }

    pub fn toggles_mut(&mut self) -> &mut LineToggles {
        &mut self.toggles
    }

    pub fn policy(&self) -> Option<&WeightingPolicy> {
        self.policy.as_ref()
    }

    pub fn set_policy(&mut self, policy: Option<WeightingPolicy>) {
        self.policy = policy;
    }

    pub fn weights(&self) -> &HashMap<EdgeId, SegmentWeight> {
        &self.weights
    }

    pub fn segment_weight(&self, edge: EdgeId) -> Option<&SegmentWeight> {
        self.weights.get(&edge)
    }

    /// Overrides for `edge`, created with neutral values if missing.
    pub fn segment_weight_mut(&mut self, edge: EdgeId) -> &mut SegmentWeight {
        self.weights
            .entry(edge)
            .or_insert_with(|| SegmentWeight::new(edge))
    }

    pub fn set_segment_weight(&mut self, weight: SegmentWeight) {
        self.weights.insert(weight.edge(), weight);
    }

    pub fn is_restricted(&self, edge: EdgeId) -> bool {
        self.weights.get(&edge).is_some_and(SegmentWeight::is_restricted)
    }

    pub fn is_required(&self, edge: EdgeId) -> bool {
        self.weights.get(&edge).is_some_and(SegmentWeight::is_required)
    }

    /// Required edges in identity order.
    pub fn required_edges(&self) -> Vec<EdgeId> {
        let mut required: Vec<EdgeId> = self
            .weights
            .values()
            .filter(|weight| weight.is_required())
            .map(SegmentWeight::edge)
            .collect();
        required.sort_unstable();
        required
    }

    pub(crate) fn forget_edge(&mut self, edge: EdgeId) {
        self.weights.remove(&edge);
    }

    pub fn primary(&self) -> Option<&Route> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&Route> {
        self.secondary.as_ref()
    }

    pub fn set_primary(&mut self, route: Route) {
        self.primary = Some(route);
    }

    pub fn set_secondary(&mut self, route: Option<Route>) {
        self.secondary = route;
    }

    pub fn take_secondary(&mut self) -> Option<Route> {
        self.secondary.take()
    }

    /// The route the train currently follows: a non-empty secondary, else
    /// the primary.
    pub fn active_route(&self) -> Option<&Route> {
        match &self.secondary {
            Some(route) if !route.is_empty() => Some(route),
            _ => self.primary.as_ref(),
        }
    }

    pub fn active_route_mut(&mut self) -> Option<&mut Route> {
        match &mut self.secondary {
            Some(route) if !route.is_empty() => Some(route),
            _ => self.primary.as_mut(),
        }
    }

    pub fn is_on_secondary(&self) -> bool {
        self.secondary.as_ref().is_some_and(|route| !route.is_empty())
    }

    pub(crate) fn routes_mut(&mut self) -> impl Iterator<Item = &mut Route> {
        self.primary.iter_mut().chain(self.secondary.iter_mut())
    }

    /// Locked lines take no automatic reroutes until released.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn status(&self) -> &LineStatus {
        &self.status
    }

    pub fn is_docked(&self) -> bool {
        matches!(self.status, LineStatus::Docked { .. })
    }

    pub(crate) fn dock(&mut self, at: Option<NodeId>, reason: String) {
        self.status = LineStatus::Docked { at, reason };
    }

    pub(crate) fn undock(&mut self) {
        self.status = LineStatus::Running;
    }

    /// Where a halted train waits: its current position, else its first
    /// checkpoint.
    pub fn last_safe_node(&self) -> Option<NodeId> {
        self.active_route()
            .and_then(Route::current_node)
            .or_else(|| self.checkpoints.first().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Heading, RoutePathSegment};

    #[test]
    fn test_zero_weight_is_neutral() {
        let mut weight = SegmentWeight::new(EdgeId::from_u128(1));
        weight.set_weight(0.0);
        assert_eq!(weight.weight(), 1.0);

        weight.set_weight(2.5);
        assert_eq!(weight.weight(), 2.5);

        weight.set_weight(-3.0);
        assert_eq!(weight.weight(), 1.0);
    }

    #[test]
    fn test_zero_weight_from_json_is_neutral() {
        let edge = EdgeId::from_u128(1);
        let json = format!(r#"{{"edge":"{}","weight":0.0}}"#, edge.as_uuid());
        let weight: SegmentWeight = serde_json::from_str(&json).unwrap();
        assert_eq!(weight.weight(), 1.0);
        assert_eq!(weight.real_time(), None);
    }

    #[test]
    fn test_running_average() {
        let mut weight = SegmentWeight::new(EdgeId::from_u128(1));
        weight.record_measurement(10);
        weight.record_measurement(20);
        weight.record_measurement(30);
        assert_eq!(weight.real_time(), Some(20));
        assert_eq!(weight.samples(), 3);
    }

    #[test]
    fn test_required_edges_are_sorted() {
        let line = Line::new(TrainId::from_u128(1), vec![])
            .with_segment(SegmentWeight::new(EdgeId::from_u128(9)).required())
            .with_segment(SegmentWeight::new(EdgeId::from_u128(2)).required())
            .with_segment(SegmentWeight::new(EdgeId::from_u128(5)).restricted());
        assert_eq!(
            line.required_edges(),
            vec![EdgeId::from_u128(2), EdgeId::from_u128(9)]
        );
        assert!(line.is_restricted(EdgeId::from_u128(5)));
    }

    #[test]
    fn test_empty_secondary_does_not_mask_primary() {
        let train = TrainId::from_u128(1);
        let segment = RoutePathSegment {
            edge: EdgeId::from_u128(1),
            heading: Heading::AToB,
            from: NodeId::from_u128(1),
            to: NodeId::from_u128(2),
            required: false,
            average_time: Some(2),
            weight: 1.0,
            cost: 2.0,
        };
        let mut line = Line::new(train, vec![NodeId::from_u128(1)]);
        line.set_primary(Route::new(train, vec![segment], false, false));
        line.set_secondary(Some(Route::new(train, Vec::new(), false, false)));

        assert!(!line.is_on_secondary());
        assert_eq!(line.active_route(), line.primary());
        assert_eq!(
            line.active_route_mut()
                .and_then(|route| route.next_segment().map(|next| next.edge)),
            Some(EdgeId::from_u128(1))
        );
    }

    #[test]
    fn test_toggles_default_from_empty_config() {
        let toggles: LineToggles = serde_json::from_str("{}").unwrap();
        assert_eq!(toggles, LineToggles::default());
        let toggles: LineToggles = serde_json::from_str(r#"{"loop": false}"#).unwrap();
        assert!(!toggles.looping);
    }
}
