use hashbrown::HashMap;

use super::{CostDimension, WeightingPolicy};
use crate::model::{DEFAULT_WEIGHT, Edge, EdgeId, SegmentWeight};
use crate::{Cost, Time};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    RealTime,
    Inferred,
    Mapped,
    BaseModel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub value: f64,
    pub source: DataSource,
}

impl Resolved {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn as_time(&self) -> Time {
        self.value.round().max(0.0) as Time
    }
}

/// Cost of one edge under a policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    pub cost: Cost,
    pub time: Option<Resolved>,
    pub weight: f32,
}

/// Cost function of one line over one network.
///
/// Built once per search: the sibling ratios used for inference are computed
/// up front from the line's measured overrides.
#[derive(Debug)]
pub struct CostModel<'a> {
    policy: &'a WeightingPolicy,
    weights: &'a HashMap<EdgeId, SegmentWeight>,
    dimensions: Vec<(CostDimension, f64)>,
    /// Mean measured / base time over measured edges.
    time_ratio: Option<f64>,
    /// Mean fuel per tick over measured edges.
    fuel_rate: Option<f64>,
    per_rail_type: bool,
}

impl<'a> CostModel<'a> {
    pub fn new(
        policy: &'a WeightingPolicy,
        weights: &'a HashMap<EdgeId, SegmentWeight>,
        edges: &HashMap<EdgeId, Edge>,
        per_rail_type: bool,
    ) -> Self {
        let time_ratio = mean(weights.values().filter_map(|weight| {
            let measured = weight.real_time()?;
            let base = edges.get(&weight.edge())?.base_time()?;
            (base > 0).then(|| measured as f64 / base as f64)
        }));
        let fuel_rate = mean(weights.values().filter_map(|weight| {
            let fuel = weight.fuel_consumption()?;
            let measured = weight.real_time()?;
            (measured > 0).then(|| f64::from(fuel) / measured as f64)
        }));

        Self {
            policy,
            weights,
            dimensions: policy.active_dimensions(),
            time_ratio,
            fuel_rate,
            per_rail_type: per_rail_type
                && policy.allow_advanced_time_calc
                && policy.allow_map_data,
        }
    }

    pub fn policy(&self) -> &WeightingPolicy {
        self.policy
    }

    fn time_precedence(&self) -> [DataSource; 4] {
        if self.policy.allow_map_data && self.policy.prefer_mapped_paths {
            [
                DataSource::RealTime,
                DataSource::Mapped,
                DataSource::Inferred,
                DataSource::BaseModel,
            ]
        } else {
            [
                DataSource::RealTime,
                DataSource::Inferred,
                DataSource::Mapped,
                DataSource::BaseModel,
            ]
        }
    }

    fn time_from(&self, edge: &Edge, source: DataSource) -> Option<f64> {
        match source {
            DataSource::RealTime => {
                if !self.policy.allow_real_time_sync {
                    return None;
                }
                self.weights
                    .get(&edge.id())
                    .and_then(SegmentWeight::real_time)
                    .map(|time| time as f64)
            }
            DataSource::Inferred => {
                if !self.policy.assume_enabled() {
                    return None;
                }
                let ratio = self.time_ratio?;
                let model = edge.base_time().map(|base| base as f64).or_else(|| {
                    self.policy
                        .allow_map_data
                        .then(|| edge.mapped_time(self.policy.mapped_speed, false))
                        .flatten()
                });
                model.map(|time| time * ratio)
            }
            DataSource::Mapped => {
                if !self.policy.allow_map_data {
                    return None;
                }
                edge.mapped_time(self.policy.mapped_speed, self.per_rail_type)
            }
            DataSource::BaseModel => {
                if !self.policy.allow_base_model {
                    return None;
                }
                edge.base_time().map(|base| base as f64)
            }
        }
    }

    pub fn resolve_time(&self, edge: &Edge) -> Option<Resolved> {
        self.time_precedence().into_iter().find_map(|source| {
            self.time_from(edge, source)
                .map(|value| Resolved { value, source })
        })
    }

    /// Only the map measures length.
    pub fn resolve_distance(&self, edge: &Edge) -> Option<Resolved> {
        if !self.policy.allow_map_data {
            return None;
        }
        edge.actual_length().map(|length| Resolved {
            value: f64::from(length),
            source: DataSource::Mapped,
        })
    }

    pub fn resolve_fuel(&self, edge: &Edge, time: Option<Resolved>) -> Option<Resolved> {
        if self.policy.allow_real_time_sync {
            let measured = self
                .weights
                .get(&edge.id())
                .and_then(SegmentWeight::fuel_consumption);
            if let Some(fuel) = measured {
                return Some(Resolved {
                    value: f64::from(fuel),
                    source: DataSource::RealTime,
                });
            }
        }
        if self.policy.assume_enabled() {
            let rate = self.fuel_rate?;
            return time.map(|time| Resolved {
                value: time.value * rate,
                source: DataSource::Inferred,
            });
        }
        None
    }

    /// Ticks per block, so faster edges cost less.
    fn resolve_pace(&self, time: Option<Resolved>, edge: &Edge) -> Option<f64> {
        let time = time?;
        let distance = self.resolve_distance(edge)?;
        (distance.value > 0.0).then(|| time.value / distance.value)
    }

    /// Weighted cost of `edge`, or `None` when an active dimension cannot be
    /// resolved from any allowed source. Without active dimensions every
    /// edge costs 1.
    pub fn edge_cost(&self, edge: &Edge) -> Option<EdgeCost> {
        let time = self.resolve_time(edge);
        let mut cost = if self.dimensions.is_empty() { 1.0 } else { 0.0 };
        for &(dimension, coefficient) in &self.dimensions {
            let value = match dimension {
                CostDimension::Time => time?.value,
                CostDimension::Distance => self.resolve_distance(edge)?.value,
                CostDimension::Fuel => self.resolve_fuel(edge, time)?.value,
                CostDimension::Speed => self.resolve_pace(time, edge)?,
            };
            cost += coefficient * value;
        }

        let weight = self
            .weights
            .get(&edge.id())
            .map_or(DEFAULT_WEIGHT, SegmentWeight::weight);
        if self.policy.weighted_segments {
            cost *= f64::from(weight);
        }

        Some(EdgeCost { cost, time, weight })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, GeometryPart, NodeId};

    fn edge(id: u128, base_time: Option<Time>) -> Edge {
        let mut edge = Edge::new(
            EdgeId::from_u128(id),
            Some(NodeId::from_u128(1)),
            Some(NodeId::from_u128(2)),
            Direction::Bidirectional,
        );
        edge.set_base_time(base_time);
        edge
    }

    fn mapped(mut edge: Edge, length: i32) -> Edge {
        let part = GeometryPart::new([0, 0, 0], [length, 0, 0], None).unwrap();
        let base = edge.base_time();
        edge.record_geometry(edge.map_ticket(), vec![part], base)
            .unwrap();
        edge
    }

    fn edges(list: &[Edge]) -> HashMap<EdgeId, Edge> {
        list.iter().map(|edge| (edge.id(), edge.clone())).collect()
    }

    #[test]
    fn test_real_time_beats_base_model() {
        let policy = WeightingPolicy::default();
        let measured = edge(1, Some(10));
        let weights: HashMap<_, _> = [(
            measured.id(),
            SegmentWeight::new(measured.id()).with_real_time(14),
        )]
        .into_iter()
        .collect();
        let all = edges(&[measured.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);

        let time = model.resolve_time(&measured).unwrap();
        assert_eq!(time.source, DataSource::RealTime);
        assert_eq!(time.value, 14.0);
    }

    #[test]
    fn test_inferred_from_siblings() {
        let policy = WeightingPolicy::default();
        let measured = edge(1, Some(10));
        let unmeasured = edge(2, Some(20));
        let weights: HashMap<_, _> = [(
            measured.id(),
            SegmentWeight::new(measured.id()).with_real_time(15),
        )]
        .into_iter()
        .collect();
        let all = edges(&[measured, unmeasured.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);

        let time = model.resolve_time(&unmeasured).unwrap();
        assert_eq!(time.source, DataSource::Inferred);
        assert_eq!(time.value, 30.0);
    }

    #[test]
    fn test_prefer_mapped_outranks_inferred() {
        let policy = WeightingPolicy {
            prefer_mapped_paths: true,
            mapped_speed: 1.0,
            ..WeightingPolicy::default()
        };
        let measured = edge(1, Some(10));
        let unmeasured = mapped(edge(2, Some(20)), 50);
        let weights: HashMap<_, _> = [(
            measured.id(),
            SegmentWeight::new(measured.id()).with_real_time(5),
        )]
        .into_iter()
        .collect();
        let all = edges(&[measured, unmeasured.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);

        let time = model.resolve_time(&unmeasured).unwrap();
        assert_eq!(time.source, DataSource::Mapped);
        assert_eq!(time.value, 50.0);
    }

    #[test]
    fn test_unresolvable_dimension_excludes_edge() {
        let policy = WeightingPolicy {
            weighted_distance: true,
            ..WeightingPolicy::default()
        };
        let unmapped = edge(1, Some(10));
        let weights = HashMap::new();
        let all = edges(&[unmapped.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);
        assert_eq!(model.edge_cost(&unmapped), None);
    }

    #[test]
    fn test_no_source_allowed_excludes_edge() {
        let policy = WeightingPolicy {
            allow_base_model: false,
            ..WeightingPolicy::default()
        };
        let plain = edge(1, Some(10));
        let weights = HashMap::new();
        let all = edges(&[plain.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);
        assert_eq!(model.edge_cost(&plain), None);
    }

    #[test]
    fn test_weighted_sum_and_segment_weight() {
        let policy = WeightingPolicy {
            weighted_distance: true,
            weight_time: 2.0,
            weight_distance: 0.5,
            ..WeightingPolicy::default()
        };
        let track = mapped(edge(1, Some(10)), 8);
        let weights: HashMap<_, _> = [(
            track.id(),
            SegmentWeight::new(track.id()).with_weight(3.0),
        )]
        .into_iter()
        .collect();
        let all = edges(&[track.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);

        // (2 * 10 + 0.5 * 8) * 3
        let cost = model.edge_cost(&track).unwrap();
        assert_eq!(cost.cost, 72.0);
        assert_eq!(cost.weight, 3.0);
    }

    #[test]
    fn test_fuel_inferred_from_rate() {
        let policy = WeightingPolicy {
            weighted_time: false,
            weighted_fuel: true,
            ..WeightingPolicy::default()
        };
        let measured = edge(1, Some(10));
        let unmeasured = edge(2, Some(40));
        let weights: HashMap<_, _> = [(
            measured.id(),
            SegmentWeight::new(measured.id())
                .with_real_time(10)
                .with_fuel(5),
        )]
        .into_iter()
        .collect();
        let all = edges(&[measured, unmeasured.clone()]);
        let model = CostModel::new(&policy, &weights, &all, false);

        // time inferred as 40 (ratio 1.0), fuel at 0.5 per tick
        assert_eq!(model.edge_cost(&unmeasured).unwrap().cost, 20.0);
    }
}
