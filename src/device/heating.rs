//! Dispatchable heat generators: boiler, CHP unit, electrical heater and heat pump.
//!
//! Each device carries its nominal parameters plus the on/off state committed by the
//! previous scheduling horizon. The [`HeatUnitModel`] adapter maps nominal parameters and
//! a forecast onto the per-timestep bounds and coefficients the problem builder needs.
use super::bracket;
use crate::input::is_sorted_and_unique;
use crate::units::{Celsius, Dimensionless, Power};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Identifies one of the dispatchable heat generator kinds.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatUnitKind {
    Boiler,
    Chp,
    ElectricalHeater,
    HeatPump,
}

/// A gas boiler with an affine efficiency model.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct Boiler {
    /// Nominal heat output in watts
    pub q_nominal: Power,
    /// Fuel-to-heat efficiency
    pub eta: Dimensionless,
    /// Maximum storage temperature this device may heat up to
    pub t_max: Celsius,
    /// Minimum fraction of nominal output while on (1 = two-point control)
    pub lower_activation_limit: Dimensionless,
    /// Whether the device was running at the end of the previous horizon
    #[serde(default)]
    pub initially_on: bool,
}

impl Boiler {
    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.q_nominal.is_finite() && self.q_nominal > Power(0.0),
            "Nominal heat output must be a finite, positive number"
        );
        check_efficiency(self.eta)?;
        check_activation_limit(self.lower_activation_limit)?;
        ensure!(self.t_max.is_finite(), "Maximum temperature must be finite");
        Ok(())
    }

    /// Per-timestep bounds and coefficients for the problem builder.
    pub fn model(&self, horizon: usize) -> HeatUnitModel {
        HeatUnitModel {
            kind: HeatUnitKind::Boiler,
            q_max: vec![self.q_nominal; horizon],
            lower_activation_limit: self.lower_activation_limit,
            t_max: self.t_max,
            initially_on: self.initially_on,
            fuel_per_heat: Dimensionless(1.0) / self.eta,
            electricity_per_heat: vec![Dimensionless(0.0); horizon],
            electricity_yield: Dimensionless(0.0),
        }
    }
}

/// A combined-heat-and-power unit.
///
/// Electrical output is tied to heat output through the power-to-heat ratio sigma, so the
/// problem builder only carries a heat variable for this device.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct Chp {
    /// Nominal electrical output in watts
    pub p_nominal: Power,
    /// Nominal heat output in watts
    pub q_nominal: Power,
    /// Overall fuel-to-(power+heat) efficiency
    pub omega: Dimensionless,
    /// Maximum storage temperature this device may heat up to
    pub t_max: Celsius,
    /// Minimum fraction of nominal output while on (1 = two-point control)
    pub lower_activation_limit: Dimensionless,
    /// Whether the device was running at the end of the previous horizon
    #[serde(default)]
    pub initially_on: bool,
}

impl Chp {
    /// The power-to-heat ratio of the unit.
    pub fn sigma(&self) -> Dimensionless {
        self.p_nominal / self.q_nominal
    }

    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.p_nominal.is_finite() && self.p_nominal > Power(0.0),
            "Nominal electrical output must be a finite, positive number"
        );
        ensure!(
            self.q_nominal.is_finite() && self.q_nominal > Power(0.0),
            "Nominal heat output must be a finite, positive number"
        );
        check_efficiency(self.omega)?;
        check_activation_limit(self.lower_activation_limit)?;
        ensure!(self.t_max.is_finite(), "Maximum temperature must be finite");
        Ok(())
    }

    /// Per-timestep bounds and coefficients for the problem builder.
    pub fn model(&self, horizon: usize) -> HeatUnitModel {
        let sigma = self.sigma();
        HeatUnitModel {
            kind: HeatUnitKind::Chp,
            q_max: vec![self.q_nominal; horizon],
            lower_activation_limit: self.lower_activation_limit,
            t_max: self.t_max,
            initially_on: self.initially_on,
            fuel_per_heat: (Dimensionless(1.0) + sigma) / self.omega,
            electricity_per_heat: vec![Dimensionless(0.0); horizon],
            electricity_yield: sigma,
        }
    }
}

/// A resistive heater converting grid electricity into heat.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct ElectricalHeater {
    /// Nominal electrical draw in watts
    pub p_nominal: Power,
    /// Electricity-to-heat efficiency
    pub eta: Dimensionless,
    /// Maximum storage temperature this device may heat up to
    pub t_max: Celsius,
    /// Minimum fraction of nominal output while on (1 = two-point control)
    pub lower_activation_limit: Dimensionless,
    /// Whether the device was running at the end of the previous horizon
    #[serde(default)]
    pub initially_on: bool,
}

impl ElectricalHeater {
    /// Nominal heat output, derived from the electrical rating.
    pub fn q_nominal(&self) -> Power {
        self.p_nominal * self.eta
    }

    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.p_nominal.is_finite() && self.p_nominal > Power(0.0),
            "Nominal electrical draw must be a finite, positive number"
        );
        check_efficiency(self.eta)?;
        check_activation_limit(self.lower_activation_limit)?;
        ensure!(self.t_max.is_finite(), "Maximum temperature must be finite");
        Ok(())
    }

    /// Per-timestep bounds and coefficients for the problem builder.
    pub fn model(&self, horizon: usize) -> HeatUnitModel {
        HeatUnitModel {
            kind: HeatUnitKind::ElectricalHeater,
            q_max: vec![self.q_nominal(); horizon],
            lower_activation_limit: self.lower_activation_limit,
            t_max: self.t_max,
            initially_on: self.initially_on,
            fuel_per_heat: Dimensionless(0.0),
            electricity_per_heat: vec![Dimensionless(1.0) / self.eta; horizon],
            electricity_yield: Dimensionless(0.0),
        }
    }
}

/// A heat pump characterised by a manufacturer table.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct HeatPump {
    /// Manufacturer characteristic table over (ambient temperature x flow temperature)
    pub table: HeatPumpTable,
    /// Maximum storage temperature this device may heat up to
    pub t_max: Celsius,
    /// Minimum fraction of nominal output while on (1 = two-point control)
    pub lower_activation_limit: Dimensionless,
    /// Whether the device was running at the end of the previous horizon
    #[serde(default)]
    pub initially_on: bool,
}

impl HeatPump {
    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        self.table
            .validate()
            .context("Invalid heat pump characteristic table")?;
        check_activation_limit(self.lower_activation_limit)?;
        ensure!(self.t_max.is_finite(), "Maximum temperature must be finite");
        Ok(())
    }

    /// Per-timestep bounds and coefficients for the problem builder.
    ///
    /// Both series must have the same length; the maximum heat output and the electrical
    /// draw per unit heat are interpolated at each timestep's operating point.
    pub fn model(&self, ambient: &[Celsius], flow: &[Celsius]) -> HeatUnitModel {
        let (q_max, electricity_per_heat) = ambient
            .iter()
            .zip(flow)
            .map(|(&ambient, &flow)| {
                let heat = self.table.heat_output(ambient, flow);
                let draw = self.table.electrical_draw(ambient, flow);
                (heat, draw / heat)
            })
            .unzip();

        HeatUnitModel {
            kind: HeatUnitKind::HeatPump,
            q_max,
            lower_activation_limit: self.lower_activation_limit,
            t_max: self.t_max,
            initially_on: self.initially_on,
            fuel_per_heat: Dimensionless(0.0),
            electricity_per_heat,
            electricity_yield: Dimensionless(0.0),
        }
    }
}

/// Manufacturer data for a heat pump.
///
/// `heat[i][j]` and `power[i][j]` give the heat output and electrical draw at ambient
/// temperature `ambient[i]` and flow temperature `flow[j]`. Lookups between grid points
/// are interpolated bilinearly; lookups outside the grid are clamped to the edge.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct HeatPumpTable {
    /// Ambient temperature axis, strictly increasing
    pub ambient: Vec<Celsius>,
    /// Flow temperature axis, strictly increasing
    pub flow: Vec<Celsius>,
    /// Heat output at each grid point
    pub heat: Vec<Vec<Power>>,
    /// Electrical draw at each grid point
    pub power: Vec<Vec<Power>>,
}

impl HeatPumpTable {
    /// Check that the table is non-empty, rectangular and positive with sorted axes.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.ambient.is_empty() && !self.flow.is_empty(),
            "Temperature axes cannot be empty"
        );
        ensure!(
            is_sorted_and_unique(&self.ambient) && is_sorted_and_unique(&self.flow),
            "Temperature axes must be strictly increasing"
        );

        for (name, grid) in [("heat", &self.heat), ("power", &self.power)] {
            ensure!(
                grid.len() == self.ambient.len()
                    && grid.iter().all(|row| row.len() == self.flow.len()),
                "The {name} grid must have one row per ambient temperature \
                 and one column per flow temperature"
            );
            ensure!(
                grid.iter()
                    .flatten()
                    .all(|value| value.is_finite() && *value > Power(0.0)),
                "All {name} grid entries must be finite, positive numbers"
            );
        }

        Ok(())
    }

    /// The heat output at the given operating point.
    pub fn heat_output(&self, ambient: Celsius, flow: Celsius) -> Power {
        self.interpolate(&self.heat, ambient, flow)
    }

    /// The electrical draw at the given operating point.
    pub fn electrical_draw(&self, ambient: Celsius, flow: Celsius) -> Power {
        self.interpolate(&self.power, ambient, flow)
    }

    /// The coefficient of performance at the given operating point.
    pub fn cop(&self, ambient: Celsius, flow: Celsius) -> Dimensionless {
        self.heat_output(ambient, flow) / self.electrical_draw(ambient, flow)
    }

    fn interpolate(&self, grid: &[Vec<Power>], ambient: Celsius, flow: Celsius) -> Power {
        let (a0, a1, wa) = bracket(&self.ambient, ambient);
        let (f0, f1, wf) = bracket(&self.flow, flow);
        let at_a0 = grid[a0][f0].value() * (1.0 - wf) + grid[a0][f1].value() * wf;
        let at_a1 = grid[a1][f0].value() * (1.0 - wf) + grid[a1][f1].value() * wf;
        Power::from(at_a0 * (1.0 - wa) + at_a1 * wa)
    }
}

/// Per-timestep bounds and objective coefficients for one dispatchable heat generator.
///
/// This is the view of a device the problem builder works with: `q_max[t]` bounds the
/// heat variable, `fuel_per_heat` scales the gas cost, `electricity_per_heat[t]` is the
/// grid draw tied to each unit of heat and `electricity_yield` the generation tied to it
/// (non-zero for the CHP unit only).
#[derive(PartialEq, Debug, Clone)]
pub struct HeatUnitModel {
    /// Which device this view was derived from
    pub kind: HeatUnitKind,
    /// Maximum heat output per timestep
    pub q_max: Vec<Power>,
    /// Minimum fraction of `q_max` while on
    pub lower_activation_limit: Dimensionless,
    /// Maximum storage temperature while this device runs
    pub t_max: Celsius,
    /// On/off state at the end of the previous horizon
    pub initially_on: bool,
    /// Units of gas burned per unit of heat
    pub fuel_per_heat: Dimensionless,
    /// Units of electricity drawn per unit of heat, per timestep
    pub electricity_per_heat: Vec<Dimensionless>,
    /// Units of electricity generated per unit of heat
    pub electricity_yield: Dimensionless,
}

/// Check that an efficiency lies in (0, 1].
fn check_efficiency(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(0.0) && value <= Dimensionless(1.0),
        "Efficiencies must lie in the interval (0, 1]"
    );
    Ok(())
}

/// Check that a lower activation limit lies in [0, 1].
fn check_activation_limit(value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value >= Dimensionless(0.0) && value <= Dimensionless(1.0),
        "The lower activation limit must lie in the interval [0, 1]"
    );
    Ok(())
}
