//! Non-dispatchable generators: photovoltaic array and wind turbine.
//!
//! Their production is fixed by the weather forecast, so the problem builder folds it
//! into the right-hand side of the electrical balance rather than into variables.
use super::bracket;
use crate::input::is_sorted_and_unique;
use crate::units::{Area, Dimensionless, Irradiance, Power, Speed};
use anyhow::{Result, ensure};
use serde::Deserialize;

/// A photovoltaic array.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct Pv {
    /// Module area in square metres
    pub area: Area,
    /// Overall system efficiency
    pub eta: Dimensionless,
}

impl Pv {
    /// Electrical production at the given irradiance.
    pub fn production(&self, direct: Irradiance, diffuse: Irradiance) -> Power {
        (direct + diffuse) * self.area * self.eta
    }

    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.area.is_finite() && self.area > Area(0.0),
            "Module area must be a finite, positive number"
        );
        ensure!(
            self.eta > Dimensionless(0.0) && self.eta <= Dimensionless(1.0),
            "Efficiencies must lie in the interval (0, 1]"
        );
        Ok(())
    }
}

/// A wind turbine characterised by its power curve.
///
/// `power[i]` is the electrical output at wind speed `velocity[i]`. Lookups between grid
/// points are interpolated linearly; lookups outside the curve are clamped to the edge.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct WindTurbine {
    /// Wind speed axis, strictly increasing
    pub velocity: Vec<Speed>,
    /// Electrical output at each wind speed
    pub power: Vec<Power>,
}

impl WindTurbine {
    /// Electrical production at the given wind speed.
    pub fn production(&self, wind: Speed) -> Power {
        let (lower, upper, weight) = bracket(&self.velocity, wind);
        Power::from(self.power[lower].value() * (1.0 - weight) + self.power[upper].value() * weight)
    }

    /// Check that the power curve is non-empty and well formed.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.velocity.is_empty(), "The power curve cannot be empty");
        ensure!(
            is_sorted_and_unique(&self.velocity) && self.velocity[0] >= Speed(0.0),
            "Wind speeds must be non-negative and strictly increasing"
        );
        ensure!(
            self.power.len() == self.velocity.len(),
            "The power curve must have one output value per wind speed"
        );
        ensure!(
            self.power
                .iter()
                .all(|value| value.is_finite() && *value >= Power(0.0)),
            "All power curve entries must be finite, non-negative numbers"
        );
        Ok(())
    }
}
