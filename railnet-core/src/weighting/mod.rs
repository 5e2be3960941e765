//! Weighting policy: which cost dimensions drive route search and which data
//! sources may supply them.

mod cost;

pub use cost::{CostModel, DataSource, EdgeCost, Resolved};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostDimension {
    Fuel,
    Speed,
    Time,
    Distance,
}

/// Selection of cost dimensions and data sources.
///
/// The default weighs time only, with every data source allowed except the
/// per-rail-type time calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingPolicy {
    pub weighted_fuel: bool,
    pub weighted_speed: bool,
    pub weighted_time: bool,
    pub weighted_distance: bool,
    /// Multiply edge costs by the line's per-edge scalar weights.
    pub weighted_segments: bool,

    pub weight_fuel: f32,
    pub weight_speed: f32,
    pub weight_time: f32,
    pub weight_distance: f32,

    /// Measured traversal times override model values.
    pub allow_real_time_sync: bool,
    /// Infer unmeasured times from measured sibling edges.
    /// Only effective together with `allow_real_time_sync`.
    pub allow_real_time_assume: bool,
    /// Use map-derived lengths and time estimates.
    pub allow_map_data: bool,
    /// Use the static base time of an edge.
    pub allow_base_model: bool,
    /// Map-derived estimates outrank inferred ones.
    pub prefer_mapped_paths: bool,
    /// Apply rail-type speed factors to map-derived times.
    pub allow_advanced_time_calc: bool,
    /// Plan over edges whose endpoints do not respond.
    pub allow_ghost_paths: bool,

    /// Blocks per tick assumed when turning a mapped length into a time.
    pub mapped_speed: f64,
}

impl Default for WeightingPolicy {
    fn default() -> Self {
        Self {
            weighted_fuel: false,
            weighted_speed: false,
            weighted_time: true,
            weighted_distance: false,
            weighted_segments: true,
            weight_fuel: 1.0,
            weight_speed: 1.0,
            weight_time: 1.0,
            weight_distance: 1.0,
            allow_real_time_sync: true,
            allow_real_time_assume: true,
            allow_map_data: true,
            allow_base_model: true,
            prefer_mapped_paths: false,
            allow_advanced_time_calc: false,
            allow_ghost_paths: true,
            mapped_speed: 8.0,
        }
    }
}

impl WeightingPolicy {
    /// Active dimensions with their coefficients.
    pub fn active_dimensions(&self) -> Vec<(CostDimension, f64)> {
        [
            (CostDimension::Fuel, self.weighted_fuel, self.weight_fuel),
            (CostDimension::Speed, self.weighted_speed, self.weight_speed),
            (CostDimension::Time, self.weighted_time, self.weight_time),
            (
                CostDimension::Distance,
                self.weighted_distance,
                self.weight_distance,
            ),
        ]
        .into_iter()
        .filter(|&(_, active, _)| active)
        .map(|(dimension, _, weight)| (dimension, f64::from(weight)))
        .collect()
    }

    pub fn assume_enabled(&self) -> bool {
        self.allow_real_time_sync && self.allow_real_time_assume
    }

    /// Check coefficients and the mapped speed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] for negative or non-finite coefficients or a
    /// non-positive mapped speed.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, weight) in [
            ("weight_fuel", self.weight_fuel),
            ("weight_speed", self.weight_speed),
            ("weight_time", self.weight_time),
            ("weight_distance", self.weight_distance),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidData(format!(
                    "{name} must be finite and non-negative, got {weight}"
                )));
            }
        }
        if !self.mapped_speed.is_finite() || self.mapped_speed <= 0.0 {
            return Err(Error::InvalidData(format!(
                "mapped_speed must be positive, got {}",
                self.mapped_speed
            )));
        }
        Ok(())
    }
}
