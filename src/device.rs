//! The devices making up a building energy system.
use crate::forecast::Forecast;
use crate::units::{Power, UnitType};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use unicase::UniCase;

pub mod deferrable;
pub mod generation;
pub mod heating;
pub mod storage;

use deferrable::DeferrableLoad;
use generation::{Pv, WindTurbine};
use heating::{Boiler, Chp, ElectricalHeater, HeatPump, HeatUnitModel};
use storage::{Battery, BatteryModel, Inverter, ThermalStorage};

/// A building energy system: every device is optional.
///
/// An absent device contributes no variables, constraints or cost terms to the
/// scheduling problem.
#[derive(PartialEq, Debug, Clone, Default, Deserialize)]
pub struct Bes {
    pub battery: Option<Battery>,
    pub thermal_storage: Option<ThermalStorage>,
    pub boiler: Option<Boiler>,
    pub chp: Option<Chp>,
    pub electrical_heater: Option<ElectricalHeater>,
    pub heat_pump: Option<HeatPump>,
    /// Inverter on the grid-to-battery (charging) path
    pub inverter_ac_dc: Option<Inverter>,
    /// Inverter on the battery-to-grid (discharging) path
    pub inverter_dc_ac: Option<Inverter>,
    pub pv: Option<Pv>,
    pub wind_turbine: Option<WindTurbine>,
    #[serde(default, rename = "deferrable_load")]
    pub deferrable_loads: Vec<DeferrableLoad>,
}

impl Bes {
    /// Check every device present in the system.
    pub fn validate(&self) -> Result<()> {
        if let Some(battery) = &self.battery {
            battery.validate().context("Invalid battery")?;
        }
        if let Some(storage) = &self.thermal_storage {
            storage.validate().context("Invalid thermal storage")?;
        }
        if let Some(boiler) = &self.boiler {
            boiler.validate().context("Invalid boiler")?;
        }
        if let Some(chp) = &self.chp {
            chp.validate().context("Invalid CHP unit")?;
        }
        if let Some(heater) = &self.electrical_heater {
            heater.validate().context("Invalid electrical heater")?;
        }
        if let Some(heat_pump) = &self.heat_pump {
            heat_pump.validate().context("Invalid heat pump")?;
        }
        for (role, inverter) in [
            ("AC-to-DC", &self.inverter_ac_dc),
            ("DC-to-AC", &self.inverter_dc_ac),
        ] {
            if let Some(inverter) = inverter {
                inverter
                    .validate()
                    .with_context(|| format!("Invalid {role} inverter"))?;
            }
        }
        if let Some(pv) = &self.pv {
            pv.validate().context("Invalid PV array")?;
        }
        if let Some(turbine) = &self.wind_turbine {
            turbine.validate().context("Invalid wind turbine")?;
        }
        for load in &self.deferrable_loads {
            load.validate()
                .with_context(|| format!("Invalid deferrable load {}", load.id))?;
        }
        ensure!(
            self.deferrable_loads
                .iter()
                .map(|load| UniCase::new(load.id.to_string()))
                .all_unique(),
            "Deferrable load IDs must be unique"
        );
        Ok(())
    }

    /// Whether any device can put heat into the thermal subsystem.
    pub fn has_heat_source(&self) -> bool {
        self.boiler.is_some()
            || self.chp.is_some()
            || self.electrical_heater.is_some()
            || self.heat_pump.is_some()
            || self.thermal_storage.is_some()
    }

    /// Problem-builder views of all dispatchable heat generators, in a fixed order.
    pub fn heat_unit_models(&self, forecast: &Forecast) -> Vec<HeatUnitModel> {
        let horizon = forecast.len();
        let mut models = Vec::new();
        if let Some(boiler) = &self.boiler {
            models.push(boiler.model(horizon));
        }
        if let Some(chp) = &self.chp {
            models.push(chp.model(horizon));
        }
        if let Some(heater) = &self.electrical_heater {
            models.push(heater.model(horizon));
        }
        if let Some(heat_pump) = &self.heat_pump {
            models.push(heat_pump.model(&forecast.t_ambient, &forecast.t_flow));
        }
        models
    }

    /// Problem-builder view of the battery with inverter limits folded in.
    pub fn battery_model(&self) -> Option<BatteryModel> {
        self.battery.as_ref().map(|battery| {
            BatteryModel::new(
                battery,
                self.inverter_ac_dc.as_ref(),
                self.inverter_dc_ac.as_ref(),
            )
        })
    }

    /// Combined PV and wind production per timestep of the forecast window.
    pub fn renewable_production(&self, forecast: &Forecast) -> Vec<Power> {
        (0..forecast.len())
            .map(|t| {
                let mut production = Power(0.0);
                if let Some(pv) = &self.pv {
                    production = production
                        + pv.production(
                            forecast.irradiance_direct[t],
                            forecast.irradiance_diffuse[t],
                        );
                }
                if let Some(turbine) = &self.wind_turbine {
                    production = production + turbine.production(forecast.wind_speed[t]);
                }
                production
            })
            .collect()
    }
}

/// Locate `value` on a sorted interpolation axis, clamping to the ends.
///
/// Returns the bracketing indices and the weight of the upper one.
pub(crate) fn bracket<T: UnitType + PartialOrd>(axis: &[T], value: T) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if value <= axis[0] {
        return (0, 0, 0.0);
    }
    if value >= axis[last] {
        return (last, last, 0.0);
    }

    let upper = axis.partition_point(|a| *a <= value);
    let lower = upper - 1;
    let span = axis[upper].value() - axis[lower].value();
    (lower, upper, (value.value() - axis[lower].value()) / span)
}
