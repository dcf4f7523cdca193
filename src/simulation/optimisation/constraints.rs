//! Code for adding constraints to the scheduling problem.
//!
//! Constraints are grouped into families. The problem builder records how many rows each
//! family contributed; the infeasibility diagnostics rebuild the problem with one family
//! skipped at a time to find out which families make an infeasible horizon infeasible.
use super::{Variable, VariableMap};
use crate::device::Bes;
use crate::device::heating::HeatUnitModel;
use crate::device::storage::BatteryModel;
use crate::forecast::Forecast;
use crate::units::{Power, Seconds, UnitType};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use strum::IntoEnumIterator;

/// One family of structurally related constraint rows.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "title_case")]
pub enum ConstraintFamily {
    /// Grid, generator, battery and load powers balance the electrical demand
    ElectricalBalance,
    /// Heat production, draws and storage drift balance the heat demand
    ThermalBalance,
    /// Battery state of charge follows charging, discharging and self-discharge
    BatteryDynamics,
    /// On/off states change through start and shutdown indicators
    StateTransitions,
    /// Heat output lies between the activation limit and the maximum while on
    ActivationLimits,
    /// Storage temperature respects the ceiling of every running heat generator
    TemperatureCeiling,
    /// Load draws and states follow the committed cycle profile
    CyclePower,
    /// A started cycle runs to completion
    MinimumRuntime,
    /// Load state of charge accrues gains and resets on start
    LoadChargeDynamics,
    /// Big-M rows tying the reset amount to the pre-start state of charge
    ResetLinearisation,
    /// A cycle starts before the state of charge would overflow
    ForcedStart,
    /// A cycle may only start above the permission threshold
    StartPermission,
}

/// The number of rows each constraint family added to the problem.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RowCounts(IndexMap<ConstraintFamily, usize>);

impl RowCounts {
    fn record(&mut self, family: ConstraintFamily, rows: usize) {
        self.0.insert(family, rows);
    }

    /// The number of rows the given family contributed.
    pub fn rows_for(&self, family: ConstraintFamily) -> usize {
        self.0.get(&family).copied().unwrap_or(0)
    }

    /// The total number of rows in the problem.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// The families that contributed at least one row.
    pub fn active_families(&self) -> impl Iterator<Item = ConstraintFamily> + '_ {
        self.0
            .iter()
            .filter(|(_, rows)| **rows > 0)
            .map(|(family, _)| *family)
    }
}

/// Everything the constraint builders need to know about the horizon.
pub(crate) struct ConstraintContext<'a> {
    pub bes: &'a Bes,
    pub forecast: &'a Forecast,
    pub heat_units: &'a [HeatUnitModel],
    pub battery: Option<&'a BatteryModel>,
    pub renewables: &'a [Power],
    /// Absolute timestep the horizon window starts at
    pub start_step: usize,
    pub timestep: Seconds,
}

/// Add every constraint family to the problem, skipping at most one.
pub(crate) fn add_constraints(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
    skip: Option<ConstraintFamily>,
) -> RowCounts {
    let mut counts = RowCounts::default();
    for family in ConstraintFamily::iter() {
        if Some(family) == skip {
            continue;
        }
        let rows = match family {
            ConstraintFamily::ElectricalBalance => {
                add_electrical_balance(problem, variables, context)
            }
            ConstraintFamily::ThermalBalance => add_thermal_balance(problem, variables, context),
            ConstraintFamily::BatteryDynamics => add_battery_dynamics(problem, variables, context),
            ConstraintFamily::StateTransitions => {
                add_state_transitions(problem, variables, context)
            }
            ConstraintFamily::ActivationLimits => {
                add_activation_limits(problem, variables, context)
            }
            ConstraintFamily::TemperatureCeiling => {
                add_temperature_ceiling(problem, variables, context)
            }
            ConstraintFamily::CyclePower => add_cycle_power(problem, variables, context),
            ConstraintFamily::MinimumRuntime => add_minimum_runtime(problem, variables, context),
            ConstraintFamily::LoadChargeDynamics => {
                add_load_charge_dynamics(problem, variables, context)
            }
            ConstraintFamily::ResetLinearisation => {
                add_reset_linearisation(problem, variables, context)
            }
            ConstraintFamily::ForcedStart => add_forced_start(problem, variables, context),
            ConstraintFamily::StartPermission => add_start_permission(problem, variables, context),
        };
        counts.record(family, rows);
    }
    counts
}

/// Balance the electrical bus at every timestep.
///
/// Import, CHP generation and battery discharge cover the fixed demand net of renewable
/// production plus export, heater and heat pump draws, load draws and battery charging.
fn add_electrical_balance(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let horizon = context.forecast.len();
    let mut terms = Vec::new();
    for t in 0..horizon {
        terms.push((variables.import[t], 1.0));
        terms.push((variables.export[t], -1.0));
        for (unit, vars) in context.heat_units.iter().zip(&variables.heat_units) {
            let coeff = unit.electricity_yield.value() - unit.electricity_per_heat[t].value();
            if coeff != 0.0 {
                terms.push((vars.heat[t], coeff));
            }
        }
        for vars in &variables.loads {
            terms.push((vars.p_electrical[t], -1.0));
        }
        if let (Some(model), Some(vars)) = (context.battery, &variables.battery) {
            terms.push((vars.p_charge[t], -model.ac_per_charge.value()));
            terms.push((vars.p_discharge[t], model.ac_per_discharge.value()));
        }

        let rhs = context.forecast.demand_electrical[t].value() - context.renewables[t].value();
        problem.add_row(rhs..=rhs, terms.drain(0..));
    }
    horizon
}

/// Balance the thermal subsystem at every timestep.
///
/// With storage, the tank temperature absorbs the difference between production and
/// demand; losses drift it towards the surroundings. Without storage, production must
/// match demand exactly.
fn add_thermal_balance(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    if context.heat_units.is_empty() && context.bes.thermal_storage.is_none() {
        return 0;
    }

    let horizon = context.forecast.len();
    let mut terms = Vec::new();
    match &context.bes.thermal_storage {
        Some(storage) => {
            let capacity_per_step = storage.heat_capacity().value() / context.timestep.value();
            let losses = storage.k_losses.value();
            for t in 0..horizon {
                terms.push((variables.storage_temperature[t], capacity_per_step + losses));
                let mut rhs = losses * storage.t_surroundings.value()
                    - context.forecast.total_heat_demand(t).value();
                if t == 0 {
                    rhs += capacity_per_step * storage.t_init.value();
                } else {
                    terms.push((variables.storage_temperature[t - 1], -capacity_per_step));
                }
                for vars in &variables.heat_units {
                    terms.push((vars.heat[t], -1.0));
                }
                for vars in &variables.loads {
                    terms.push((vars.q_thermal[t], 1.0));
                }
                problem.add_row(rhs..=rhs, terms.drain(0..));
            }
        }
        None => {
            for t in 0..horizon {
                for vars in &variables.heat_units {
                    terms.push((vars.heat[t], 1.0));
                }
                for vars in &variables.loads {
                    terms.push((vars.q_thermal[t], -1.0));
                }
                let rhs = context.forecast.total_heat_demand(t).value();
                problem.add_row(rhs..=rhs, terms.drain(0..));
            }
        }
    }
    horizon
}

/// Tie the battery state of charge to charging, discharging and self-discharge.
fn add_battery_dynamics(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let (Some(model), Some(vars)) = (context.battery, &variables.battery) else {
        return 0;
    };

    let dt = context.timestep.value();
    let retention = 1.0 - model.self_discharge.value();
    let horizon = vars.soc.len();
    for t in 0..horizon {
        let mut terms = vec![
            (vars.soc[t], 1.0),
            (vars.p_charge[t], -dt * model.eta_charge.value()),
            (vars.p_discharge[t], dt / model.eta_discharge.value()),
        ];
        let rhs = if t == 0 {
            retention * model.soc_init.value()
        } else {
            terms.push((vars.soc[t - 1], -retention));
            0.0
        };
        problem.add_row(rhs..=rhs, terms);
    }
    horizon
}

/// Couple on/off states to start and shutdown indicators for every binary device.
fn add_state_transitions(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (unit, vars) in context.heat_units.iter().zip(&variables.heat_units) {
        rows += add_mode_rows(
            problem,
            &vars.on,
            &vars.start,
            &vars.shutdown,
            unit.initially_on,
        );
    }
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        rows += add_mode_rows(
            problem,
            &vars.on,
            &vars.start,
            &vars.shutdown,
            load.initially_on(),
        );
    }
    rows
}

/// Mode rows for one device: `x[t] - x[t-1] = y[t] - z[t]` and `y[t] + z[t] <= 1`.
fn add_mode_rows(
    problem: &mut Problem,
    on: &[Variable],
    start: &[Variable],
    shutdown: &[Variable],
    initially_on: bool,
) -> usize {
    let horizon = on.len();
    for t in 0..horizon {
        let mut terms = vec![(on[t], 1.0), (start[t], -1.0), (shutdown[t], 1.0)];
        let rhs = if t == 0 {
            if initially_on { 1.0 } else { 0.0 }
        } else {
            terms.push((on[t - 1], -1.0));
            0.0
        };
        problem.add_row(rhs..=rhs, terms);
        problem.add_row(..=1.0, [(start[t], 1.0), (shutdown[t], 1.0)]);
    }
    2 * horizon
}

/// Keep heat output between the activation limit and the maximum while a device is on.
fn add_activation_limits(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (unit, vars) in context.heat_units.iter().zip(&variables.heat_units) {
        let limit = unit.lower_activation_limit.value();
        for t in 0..unit.q_max.len() {
            let q_max = unit.q_max[t].value();
            problem.add_row(..=0.0, [(vars.heat[t], 1.0), (vars.on[t], -q_max)]);
            problem.add_row(..=0.0, [(vars.heat[t], -1.0), (vars.on[t], limit * q_max)]);
            rows += 2;
        }
    }
    rows
}

/// Cap the storage temperature at each running device's own ceiling.
///
/// While a device is off the tank may go up to its own maximum; while the device runs the
/// tank must stay below the device's flow ceiling.
fn add_temperature_ceiling(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let Some(storage) = &context.bes.thermal_storage else {
        return 0;
    };

    let mut rows = 0;
    for (unit, vars) in context.heat_units.iter().zip(&variables.heat_units) {
        let headroom = storage.t_max.value() - unit.t_max.value();
        if headroom <= 0.0 {
            continue;
        }
        for t in 0..vars.on.len() {
            problem.add_row(
                ..=storage.t_max.value(),
                [(variables.storage_temperature[t], 1.0), (vars.on[t], headroom)],
            );
            rows += 1;
        }
    }
    rows
}

/// Tie each load's state and draws to the starts of the current cycle.
///
/// A start `tau` steps ago contributes `profile[tau]` to the draw at the current step.
/// Starts before the horizon are constants read from the committed history and move to
/// the right-hand side.
fn add_cycle_power(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        let cycle_len = load.profile_len();
        for t in 0..vars.on.len() {
            // On/off state equals "some start happened within the last cycle"
            let mut terms = vec![(vars.on[t], 1.0)];
            let mut history = 0.0;
            for tau in 0..cycle_len {
                match t.checked_sub(tau) {
                    Some(s) => terms.push((vars.start[s], -1.0)),
                    None if load.past_start(tau - t) => history += 1.0,
                    None => {}
                }
            }
            problem.add_row(history..=history, terms);

            // Draws follow the cycle profiles
            for (profile, power) in [
                (&load.load_electrical, &vars.p_electrical),
                (&load.load_thermal, &vars.q_thermal),
            ] {
                let mut terms = vec![(power[t], 1.0)];
                let mut history = 0.0;
                for tau in 0..cycle_len {
                    match t.checked_sub(tau) {
                        Some(s) => terms.push((vars.start[s], -profile[tau].value())),
                        None if load.past_start(tau - t) => history += profile[tau].value(),
                        None => {}
                    }
                }
                problem.add_row(history..=history, terms);
            }
            rows += 3;
        }
    }
    rows
}

/// Forbid shutting a load down while a cycle started within the last cycle length runs.
fn add_minimum_runtime(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        let cycle_len = load.profile_len();
        for t in 0..vars.shutdown.len() {
            let mut terms = vec![(vars.shutdown[t], 1.0)];
            let mut limit = 1.0;
            for tau in 1..cycle_len {
                match t.checked_sub(tau) {
                    Some(s) => terms.push((vars.start[s], 1.0)),
                    None if load.past_start(tau - t) => limit -= 1.0,
                    None => {}
                }
            }
            problem.add_row(..=limit, terms);
            rows += 1;
        }
    }
    rows
}

/// Accrue gains into each load's state of charge, with a reset on cycle start.
fn add_load_charge_dynamics(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        for t in 0..vars.soc.len() {
            let mut terms = vec![(vars.soc[t], 1.0), (vars.reset[t], 1.0)];
            let mut rhs = load.gain_at(context.start_step + t).value();
            if t == 0 {
                rhs += load.soc_init.value();
            } else {
                terms.push((vars.soc[t - 1], -1.0));
            }
            problem.add_row(rhs..=rhs, terms);
            rows += 1;
        }
    }
    rows
}

/// Big-M rows making `reset[t]` equal `start[t] * soc[t-1]`.
fn add_reset_linearisation(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        let big_m = load.big_m().value();
        for t in 0..vars.reset.len() {
            problem.add_row(..=0.0, [(vars.reset[t], 1.0), (vars.start[t], -big_m)]);
            if t == 0 {
                let soc_init = load.soc_init.value();
                problem.add_row(..=soc_init, [(vars.reset[t], 1.0)]);
                problem.add_row(
                    (soc_init - big_m)..,
                    [(vars.reset[t], 1.0), (vars.start[t], -big_m)],
                );
            } else {
                problem.add_row(..=0.0, [(vars.reset[t], 1.0), (vars.soc[t - 1], -1.0)]);
                problem.add_row(
                    (-big_m)..,
                    [
                        (vars.reset[t], 1.0),
                        (vars.soc[t - 1], -1.0),
                        (vars.start[t], -big_m),
                    ],
                );
            }
            rows += 3;
        }
    }
    rows
}

/// Force a cycle start before the state of charge would overflow the capacity.
fn add_forced_start(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        let big_m = load.big_m().value();
        for t in 0..vars.start.len() {
            let mut limit = load.capacity.value() - load.gain_at(context.start_step + t).value();
            let mut terms = vec![(vars.start[t], -big_m)];
            if t == 0 {
                limit -= load.soc_init.value();
            } else {
                terms.push((vars.soc[t - 1], 1.0));
            }
            problem.add_row(..=limit, terms);
            rows += 1;
        }
    }
    rows
}

/// Permit a cycle start only once the state of charge has reached the threshold.
fn add_start_permission(
    problem: &mut Problem,
    variables: &VariableMap,
    context: &ConstraintContext,
) -> usize {
    let mut rows = 0;
    for (load, vars) in context.bes.deferrable_loads.iter().zip(&variables.loads) {
        let threshold = load.soc_may_run.value();
        for t in 0..vars.start.len() {
            if t == 0 {
                problem.add_row((-load.soc_init.value()).., [(vars.start[t], -threshold)]);
            } else {
                problem.add_row(0.0.., [(vars.soc[t - 1], 1.0), (vars.start[t], -threshold)]);
            }
            rows += 1;
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{bes, forecast};
    use crate::simulation::optimisation::{assemble_problem, build_problem};
    use rstest::rstest;

    const TIMESTEP: Seconds = Seconds(900.0);

    #[rstest]
    fn test_row_counts_per_family(bes: Bes, forecast: Forecast) {
        let problem = build_problem(&bes, &forecast, 0, TIMESTEP).unwrap();
        let counts = problem.row_counts();
        let h = forecast.len();

        assert_eq!(counts.rows_for(ConstraintFamily::ElectricalBalance), h);
        assert_eq!(counts.rows_for(ConstraintFamily::ThermalBalance), h);
        assert_eq!(counts.rows_for(ConstraintFamily::BatteryDynamics), h);
        // Four heat units plus one load, two rows each per step
        assert_eq!(counts.rows_for(ConstraintFamily::StateTransitions), 5 * 2 * h);
        assert_eq!(counts.rows_for(ConstraintFamily::ActivationLimits), 4 * 2 * h);
        // Only the heat pump's ceiling lies below the tank maximum
        assert_eq!(counts.rows_for(ConstraintFamily::TemperatureCeiling), h);
        assert_eq!(counts.rows_for(ConstraintFamily::CyclePower), 3 * h);
        assert_eq!(counts.rows_for(ConstraintFamily::MinimumRuntime), h);
        assert_eq!(counts.rows_for(ConstraintFamily::LoadChargeDynamics), h);
        assert_eq!(counts.rows_for(ConstraintFamily::ResetLinearisation), 3 * h);
        assert_eq!(counts.rows_for(ConstraintFamily::ForcedStart), h);
        assert_eq!(counts.rows_for(ConstraintFamily::StartPermission), h);
    }

    #[rstest]
    fn test_skipping_a_family_drops_its_rows(bes: Bes, forecast: Forecast) {
        let full = build_problem(&bes, &forecast, 0, TIMESTEP).unwrap();
        let skipped = assemble_problem(
            &bes,
            &forecast,
            0,
            TIMESTEP,
            Some(ConstraintFamily::ElectricalBalance),
        );

        let h = forecast.len();
        assert_eq!(
            skipped.row_counts().rows_for(ConstraintFamily::ElectricalBalance),
            0
        );
        assert_eq!(skipped.row_counts().total(), full.row_counts().total() - h);
    }

    #[rstest]
    fn test_active_families_excludes_absent_devices(bes: Bes, forecast: Forecast) {
        let battery_only = Bes {
            battery: bes.battery,
            ..Bes::default()
        };
        let mut cold = forecast;
        cold.demand_heat = vec![Power(0.0); cold.len()];
        cold.demand_hot_water = vec![Power(0.0); cold.len()];

        let problem = build_problem(&battery_only, &cold, 0, TIMESTEP).unwrap();
        let families: Vec<_> = problem.row_counts().active_families().collect();
        assert_eq!(
            families,
            vec![
                ConstraintFamily::ElectricalBalance,
                ConstraintFamily::BatteryDynamics
            ]
        );
    }
}
