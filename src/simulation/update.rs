//! Code for committing the leading steps of a solved horizon.
//!
//! Only the first `used` steps of each schedule are acted upon; the rest of the horizon exists to
//! keep those steps far-sighted and is discarded. Committing appends the used steps to the
//! [`ScheduleLog`] and rolls the device states forward so the next horizon starts where this one
//! left off.
use super::optimisation::Solution;
use crate::device::Bes;
use crate::device::heating::HeatUnitKind;
use crate::schedule::{
    BatteryRecord, GridRecord, HeatUnitRecord, LoadRecord, ScheduleLog, StorageRecord,
};
use crate::units::{Celsius, Energy};
use log::debug;

/// Commit the first `used` steps of a solved horizon.
///
/// Appends one record per used step to `log` and updates the initial states in `bes` (battery and
/// load charge, storage temperature, on/off flags, start histories) to the values at the last used
/// step.
///
/// # Panics
///
/// Panics if `used` is zero or exceeds the solution's horizon.
pub fn commit_schedule(bes: &mut Bes, log: &mut ScheduleLog, solution: &Solution, used: usize) {
    assert!(
        used >= 1 && used <= solution.horizon(),
        "Can only commit between one step and the whole horizon"
    );
    debug!("Committing {used} of {} scheduled steps", solution.horizon());

    let variables = solution.variables();
    for t in 0..used {
        log.grid.push(GridRecord {
            import: solution.get_solution_value(&variables.import[t]),
            export: solution.get_solution_value(&variables.export[t]),
            cost: solution.step_cost(t),
        });
    }

    if let Some(battery_vars) = &variables.battery {
        for t in 0..used {
            log.battery.push(BatteryRecord {
                p_charge: solution.get_solution_value(&battery_vars.p_charge[t]),
                p_discharge: solution.get_solution_value(&battery_vars.p_discharge[t]),
                soc: solution.get_solution_value(&battery_vars.soc[t]),
            });
        }

        // Solver tolerances can leave a value a hair outside its bounds, which the next horizon's
        // validation would reject
        let soc: Energy = solution.get_solution_value(&battery_vars.soc[used - 1]);
        let battery = bes
            .battery
            .as_mut()
            .expect("Battery variables without a battery");
        battery.soc_init = soc.max(Energy(0.0)).min(battery.capacity);
    }

    if !variables.storage_temperature.is_empty() {
        for t in 0..used {
            log.storage.push(StorageRecord {
                temperature: solution.get_solution_value(&variables.storage_temperature[t]),
            });
        }

        let temperature: Celsius =
            solution.get_solution_value(&variables.storage_temperature[used - 1]);
        let storage = bes
            .thermal_storage
            .as_mut()
            .expect("Storage variables without a thermal storage");
        storage.t_init = temperature.max(storage.t_min).min(storage.t_max);
    }

    for ((kind, records), unit_vars) in log.heat_units.iter_mut().zip(&variables.heat_units) {
        for t in 0..used {
            records.push(HeatUnitRecord {
                heat: solution.get_solution_value(&unit_vars.heat[t]),
                on: solution.is_set(&unit_vars.on[t]),
            });
        }

        let on_at_end = solution.is_set(&unit_vars.on[used - 1]);
        let message = "Heat unit variables without the matching device";
        match kind {
            HeatUnitKind::Boiler => bes.boiler.as_mut().expect(message).initially_on = on_at_end,
            HeatUnitKind::Chp => bes.chp.as_mut().expect(message).initially_on = on_at_end,
            HeatUnitKind::ElectricalHeater => {
                bes.electrical_heater.as_mut().expect(message).initially_on = on_at_end;
            }
            HeatUnitKind::HeatPump => {
                bes.heat_pump.as_mut().expect(message).initially_on = on_at_end;
            }
        }
    }

    for (records, (load, load_vars)) in log
        .loads
        .values_mut()
        .zip(bes.deferrable_loads.iter_mut().zip(&variables.loads))
    {
        let mut starts = Vec::with_capacity(used);
        for t in 0..used {
            let start = solution.is_set(&load_vars.start[t]);
            starts.push(start);
            records.push(LoadRecord {
                p_electrical: solution.get_solution_value(&load_vars.p_electrical[t]),
                q_thermal: solution.get_solution_value(&load_vars.q_thermal[t]),
                soc: solution.get_solution_value(&load_vars.soc[t]),
                on: solution.is_set(&load_vars.on[t]),
                start,
            });
        }

        let soc: Energy = solution.get_solution_value(&load_vars.soc[used - 1]);
        load.soc_init = soc.max(Energy(0.0)).min(load.capacity);
        load.push_history(&starts);
    }
}
