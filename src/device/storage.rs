//! Storage devices: battery (with optional inverters) and stratified thermal storage.
use crate::units::{
    Celsius, Dimensionless, Energy, EnergyPerCelsius, Mass, Power, PowerPerCelsius,
    WATER_SPECIFIC_HEAT,
};
use anyhow::{Result, ensure};
use serde::Deserialize;

/// An electrochemical battery.
///
/// The state of charge and the charge and discharge powers are all expressed on the DC
/// side; inverter limits and conversion factors are folded in by [`BatteryModel::new`].
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct Battery {
    /// Usable capacity in joules
    pub capacity: Energy,
    /// State of charge at the start of the schedule
    pub soc_init: Energy,
    /// Fraction of the state of charge lost per timestep
    pub self_discharge: Dimensionless,
    /// Charging efficiency
    pub eta_charge: Dimensionless,
    /// Discharging efficiency
    pub eta_discharge: Dimensionless,
    /// Nominal charging power
    pub p_charge_nominal: Power,
    /// Nominal discharging power
    pub p_discharge_nominal: Power,
}

impl Battery {
    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity.is_finite() && self.capacity > Energy(0.0),
            "Battery capacity must be a finite, positive number"
        );
        ensure!(
            self.soc_init >= Energy(0.0) && self.soc_init <= self.capacity,
            "The initial state of charge must lie between zero and the capacity"
        );
        ensure!(
            self.self_discharge >= Dimensionless(0.0) && self.self_discharge < Dimensionless(1.0),
            "The self-discharge rate must lie in the interval [0, 1)"
        );
        for eta in [self.eta_charge, self.eta_discharge] {
            ensure!(
                eta > Dimensionless(0.0) && eta <= Dimensionless(1.0),
                "Efficiencies must lie in the interval (0, 1]"
            );
        }
        for power in [self.p_charge_nominal, self.p_discharge_nominal] {
            ensure!(
                power.is_finite() && power > Power(0.0),
                "Nominal powers must be finite, positive numbers"
            );
        }
        Ok(())
    }
}

/// An inverter coupling the battery to the AC bus.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct Inverter {
    /// Nominal AC-side power
    pub p_nominal: Power,
    /// Conversion efficiency
    pub eta: Dimensionless,
}

impl Inverter {
    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.p_nominal.is_finite() && self.p_nominal > Power(0.0),
            "Nominal inverter power must be a finite, positive number"
        );
        ensure!(
            self.eta > Dimensionless(0.0) && self.eta <= Dimensionless(1.0),
            "Efficiencies must lie in the interval (0, 1]"
        );
        Ok(())
    }
}

/// Battery bounds and AC coupling factors for the problem builder.
///
/// `ac_per_charge` is the AC power drawn from the bus per unit of DC charging power and
/// `ac_per_discharge` the AC power delivered per unit of DC discharging power. Without
/// inverters both factors are one and the nominal powers bound the variables directly.
#[derive(PartialEq, Debug, Clone)]
pub struct BatteryModel {
    pub capacity: Energy,
    pub soc_init: Energy,
    pub self_discharge: Dimensionless,
    pub eta_charge: Dimensionless,
    pub eta_discharge: Dimensionless,
    pub p_charge_max: Power,
    pub p_discharge_max: Power,
    pub ac_per_charge: Dimensionless,
    pub ac_per_discharge: Dimensionless,
}

impl BatteryModel {
    /// Fold the inverter ratings and efficiencies into the battery's bounds.
    pub fn new(battery: &Battery, ac_dc: Option<&Inverter>, dc_ac: Option<&Inverter>) -> Self {
        let (p_charge_max, ac_per_charge) = match ac_dc {
            Some(inverter) => (
                battery
                    .p_charge_nominal
                    .min(inverter.p_nominal * inverter.eta),
                Dimensionless(1.0) / inverter.eta,
            ),
            None => (battery.p_charge_nominal, Dimensionless(1.0)),
        };
        let (p_discharge_max, ac_per_discharge) = match dc_ac {
            Some(inverter) => (
                battery
                    .p_discharge_nominal
                    .min(inverter.p_nominal / inverter.eta),
                inverter.eta,
            ),
            None => (battery.p_discharge_nominal, Dimensionless(1.0)),
        };

        BatteryModel {
            capacity: battery.capacity,
            soc_init: battery.soc_init,
            self_discharge: battery.self_discharge,
            eta_charge: battery.eta_charge,
            eta_discharge: battery.eta_discharge,
            p_charge_max,
            p_discharge_max,
            ac_per_charge,
            ac_per_discharge,
        }
    }
}

/// A stratified hot water tank modelled with a single mixed temperature.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct ThermalStorage {
    /// Water mass in kilograms
    pub capacity: Mass,
    /// Temperature at the start of the schedule
    pub t_init: Celsius,
    /// Lowest temperature at which the tank still covers the heat demand
    pub t_min: Celsius,
    /// Highest temperature the tank may reach
    pub t_max: Celsius,
    /// Temperature of the room the tank stands in
    pub t_surroundings: Celsius,
    /// Standing loss coefficient towards the surroundings
    pub k_losses: PowerPerCelsius,
}

impl ThermalStorage {
    /// The tank's heat capacity.
    pub fn heat_capacity(&self) -> EnergyPerCelsius {
        self.capacity * WATER_SPECIFIC_HEAT
    }

    /// Check that the device parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity.is_finite() && self.capacity > Mass(0.0),
            "Storage capacity must be a finite, positive number"
        );
        ensure!(
            self.t_min <= self.t_max,
            "The minimum temperature cannot exceed the maximum temperature"
        );
        ensure!(
            self.t_init >= self.t_min && self.t_init <= self.t_max,
            "The initial temperature must lie between the minimum and maximum temperatures"
        );
        ensure!(
            self.k_losses.is_finite() && self.k_losses >= PowerPerCelsius(0.0),
            "The loss coefficient must be a finite, non-negative number"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{battery, inverter, thermal_storage};
    use crate::units::UnitType;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_battery_model_without_inverters(battery: Battery) {
        let model = BatteryModel::new(&battery, None, None);
        assert_eq!(model.p_charge_max, battery.p_charge_nominal);
        assert_eq!(model.p_discharge_max, battery.p_discharge_nominal);
        assert_eq!(model.ac_per_charge, Dimensionless(1.0));
        assert_eq!(model.ac_per_discharge, Dimensionless(1.0));
    }

    #[rstest]
    fn test_battery_model_with_inverters(battery: Battery, inverter: Inverter) {
        let model = BatteryModel::new(&battery, Some(&inverter), Some(&inverter));

        // 3 kW AC at 96% conversion limits DC charging to 2.88 kW
        assert_approx_eq!(f64, model.p_charge_max.value(), 3000.0 * 0.96);
        assert_approx_eq!(f64, model.ac_per_charge.value(), 1.0 / 0.96);

        // Delivering 3 kW AC takes 3.125 kW DC, below the 4 kW battery rating
        assert_approx_eq!(f64, model.p_discharge_max.value(), 3000.0 / 0.96);
        assert_approx_eq!(f64, model.ac_per_discharge.value(), 0.96);
    }

    #[rstest]
    fn test_battery_validate_rejects_bad_parameters(battery: Battery) {
        for broken in [
            Battery {
                capacity: Energy(-1.0),
                ..battery.clone()
            },
            Battery {
                soc_init: battery.capacity + Energy(1.0),
                ..battery.clone()
            },
            Battery {
                self_discharge: Dimensionless(1.0),
                ..battery.clone()
            },
            Battery {
                eta_charge: Dimensionless(0.0),
                ..battery.clone()
            },
        ] {
            assert!(broken.validate().is_err());
        }
        assert!(battery.validate().is_ok());
    }

    #[rstest]
    fn test_thermal_storage_heat_capacity(thermal_storage: ThermalStorage) {
        assert_approx_eq!(
            f64,
            thermal_storage.heat_capacity().value(),
            300.0 * 4180.0
        );
    }

    #[rstest]
    fn test_thermal_storage_validate_rejects_bad_parameters(thermal_storage: ThermalStorage) {
        for broken in [
            ThermalStorage {
                t_min: Celsius(70.0),
                ..thermal_storage.clone()
            },
            ThermalStorage {
                t_init: Celsius(10.0),
                ..thermal_storage.clone()
            },
            ThermalStorage {
                k_losses: PowerPerCelsius(-0.5),
                ..thermal_storage.clone()
            },
        ] {
            assert!(broken.validate().is_err());
        }
        assert!(thermal_storage.validate().is_ok());
    }
}
