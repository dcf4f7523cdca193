//! The committed schedule accumulated over a rolling-horizon run.
//!
//! Every series is indexed by absolute timestep and grows only when the controller
//! commits the first steps of a solved horizon. All series always share the same
//! committed length.
use crate::device::Bes;
use crate::device::deferrable::LoadID;
use crate::device::heating::HeatUnitKind;
use crate::units::{Celsius, Energy, Money, Power};
use indexmap::IndexMap;

/// Grid exchange and operating cost for one committed timestep.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct GridRecord {
    pub import: Power,
    pub export: Power,
    pub cost: Money,
}

/// Battery operation for one committed timestep.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct BatteryRecord {
    pub p_charge: Power,
    pub p_discharge: Power,
    pub soc: Energy,
}

/// Thermal storage state for one committed timestep.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct StorageRecord {
    pub temperature: Celsius,
}

/// Operation of one dispatchable heat generator for one committed timestep.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct HeatUnitRecord {
    pub heat: Power,
    pub on: bool,
}

/// Operation of one deferrable load for one committed timestep.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LoadRecord {
    pub p_electrical: Power,
    pub q_thermal: Power,
    pub soc: Energy,
    pub on: bool,
    pub start: bool,
}

/// The committed schedule of a whole simulation run.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScheduleLog {
    pub grid: Vec<GridRecord>,
    pub battery: Vec<BatteryRecord>,
    pub storage: Vec<StorageRecord>,
    pub heat_units: IndexMap<HeatUnitKind, Vec<HeatUnitRecord>>,
    pub loads: IndexMap<LoadID, Vec<LoadRecord>>,
}

impl ScheduleLog {
    /// An empty log with one series registered per device present in the system.
    ///
    /// Registering the keys up front keeps the output files stable even when a run
    /// commits nothing.
    pub fn new(bes: &Bes) -> Self {
        let mut log = ScheduleLog::default();
        if bes.boiler.is_some() {
            log.heat_units.insert(HeatUnitKind::Boiler, Vec::new());
        }
        if bes.chp.is_some() {
            log.heat_units.insert(HeatUnitKind::Chp, Vec::new());
        }
        if bes.electrical_heater.is_some() {
            log.heat_units
                .insert(HeatUnitKind::ElectricalHeater, Vec::new());
        }
        if bes.heat_pump.is_some() {
            log.heat_units.insert(HeatUnitKind::HeatPump, Vec::new());
        }
        for load in &bes.deferrable_loads {
            log.loads.insert(load.id.clone(), Vec::new());
        }
        log
    }

    /// The number of committed timesteps.
    pub fn committed_len(&self) -> usize {
        self.grid.len()
    }

    /// The total operating cost of all committed timesteps.
    pub fn total_cost(&self) -> Money {
        self.grid
            .iter()
            .fold(Money(0.0), |total, record| total + record.cost)
    }
}
