//! Code for building the scheduling problem for one horizon window.
//!
//! The problem is a mixed-integer linear program over `horizon` timesteps. Continuous
//! variables carry grid exchange, device powers and states of charge; binary variables
//! carry the on/off, start and shutdown modes of devices under two-point or modulating
//! control. The objective minimises operating cost: fuel and import bills minus export
//! and feed-in remuneration.
use crate::device::Bes;
use crate::device::heating::HeatUnitModel;
use crate::device::storage::BatteryModel;
use crate::forecast::Forecast;
use crate::units::{Dimensionless, Money, Power, Seconds, UnitType};
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use thiserror::Error;

pub mod constraints;
pub use constraints::{ConstraintFamily, RowCounts};
use constraints::ConstraintContext;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// An error preventing the horizon problem from being built.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A device carries parameters outside its physical range
    #[error("invalid device configuration")]
    Device(#[source] anyhow::Error),
    /// The forecast series are inconsistent or unphysical
    #[error("invalid forecast")]
    Forecast(#[source] anyhow::Error),
    /// The horizon window contains no timesteps
    #[error("the horizon window contains no timesteps")]
    EmptyHorizon,
    /// Heat is demanded but no device can supply it
    #[error("heat is demanded but the system has no heat source")]
    MissingHeatSource,
    /// The timestep length is not a positive number of seconds
    #[error("the timestep length must be a positive number of seconds")]
    InvalidTimestep,
}

/// The objective coefficient of one column, tagged with its timestep.
///
/// Keeping these alongside the problem lets the committed cost of any step be recomputed
/// from a solution without asking the solver for a partial objective.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColumnCost {
    /// Horizon-relative timestep the column belongs to
    pub step: usize,
    /// Objective coefficient of the column
    pub coeff: f64,
}

/// Per-timestep variables for the battery.
pub struct BatteryVars {
    /// DC charging power
    pub p_charge: Vec<Variable>,
    /// DC discharging power
    pub p_discharge: Vec<Variable>,
    /// State of charge at the end of each timestep
    pub soc: Vec<Variable>,
}

/// Per-timestep variables for one dispatchable heat generator.
pub struct HeatUnitVars {
    /// Heat output
    pub heat: Vec<Variable>,
    /// On/off mode (binary)
    pub on: Vec<Variable>,
    /// Start indicator (binary)
    pub start: Vec<Variable>,
    /// Shutdown indicator (binary)
    pub shutdown: Vec<Variable>,
}

/// Per-timestep variables for one deferrable load.
pub struct LoadVars {
    /// Electrical draw
    pub p_electrical: Vec<Variable>,
    /// Heat draw
    pub q_thermal: Vec<Variable>,
    /// State of charge at the end of each timestep
    pub soc: Vec<Variable>,
    /// Linearised state-of-charge reset on cycle start
    pub reset: Vec<Variable>,
    /// On/off mode (binary)
    pub on: Vec<Variable>,
    /// Start indicator (binary)
    pub start: Vec<Variable>,
    /// Shutdown indicator (binary)
    pub shutdown: Vec<Variable>,
}

/// A map for easy lookup of variables in the problem.
///
/// Variables are grouped by device family; each group holds one variable per timestep of
/// the horizon. `variable_to_index` tracks the order in which columns were added, which
/// is the order the solver reports values in.
#[derive(Default)]
pub struct VariableMap {
    /// Power imported from the grid
    pub import: Vec<Variable>,
    /// Power exported to the grid
    pub export: Vec<Variable>,
    /// Battery variables, when a battery is present
    pub battery: Option<BatteryVars>,
    /// Thermal storage temperature, empty without storage
    pub storage_temperature: Vec<Variable>,
    /// One entry per dispatchable heat generator, in [`Bes::heat_unit_models`] order
    pub heat_units: Vec<HeatUnitVars>,
    /// One entry per deferrable load, in declaration order
    pub loads: Vec<LoadVars>,
    /// Maps each variable to its index in the solution array
    variable_to_index: IndexMap<Variable, usize>,
    /// Next variable index to assign
    next_index: usize,
}

impl VariableMap {
    fn add_variable(&mut self, var: Variable) {
        self.variable_to_index.insert(var, self.next_index);
        self.next_index += 1;
    }

    /// The number of variables in the problem.
    pub fn len(&self) -> usize {
        self.next_index
    }

    /// Whether the problem has no variables at all.
    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }
}

/// A ready-to-solve scheduling problem for one horizon window.
pub struct SchedulingProblem {
    pub(crate) problem: Problem,
    pub(crate) variables: VariableMap,
    pub(crate) column_costs: Vec<ColumnCost>,
    pub(crate) row_counts: RowCounts,
    pub(crate) horizon: usize,
    pub(crate) start_step: usize,
}

impl SchedulingProblem {
    /// The number of timesteps covered by this problem.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The absolute timestep the horizon window starts at.
    pub fn start_step(&self) -> usize {
        self.start_step
    }

    /// The number of rows added per constraint family.
    pub fn row_counts(&self) -> &RowCounts {
        &self.row_counts
    }

    /// The number of decision variables.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
}

/// The solution to a scheduling problem.
pub struct Solution {
    pub(crate) solution: highs::Solution,
    pub(crate) variables: VariableMap,
    pub(crate) column_costs: Vec<ColumnCost>,
    pub(crate) horizon: usize,
    pub(crate) start_step: usize,
}

impl Solution {
    /// The value of one variable, converted to the requested unit type.
    pub fn get_solution_value<T>(&self, var: &Variable) -> T
    where
        T: UnitType,
    {
        let index = self.variables.variable_to_index[var];
        T::new(self.solution.columns()[index])
    }

    /// Whether a binary variable is set in the solution.
    ///
    /// Mixed-integer solutions report binaries as floats close to 0 or 1.
    pub fn is_set(&self, var: &Variable) -> bool {
        self.get_solution_value::<Dimensionless>(var).value() > 0.5
    }

    /// The variables of the solved problem.
    pub fn variables(&self) -> &VariableMap {
        &self.variables
    }

    /// The number of timesteps covered by the solved problem.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The absolute timestep the horizon window starts at.
    pub fn start_step(&self) -> usize {
        self.start_step
    }

    /// The objective value, recomputed from the cost coefficients.
    pub fn objective_value(&self) -> Money {
        Money(
            self.column_costs
                .iter()
                .zip(self.solution.columns())
                .map(|(cost, value)| cost.coeff * value)
                .sum(),
        )
    }

    /// The operating cost contributed by one horizon-relative timestep.
    pub fn step_cost(&self, step: usize) -> Money {
        Money(
            self.column_costs
                .iter()
                .zip(self.solution.columns())
                .filter(|(cost, _)| cost.step == step)
                .map(|(cost, value)| cost.coeff * value)
                .sum(),
        )
    }
}

/// Build the scheduling problem for one horizon window.
///
/// # Arguments
///
/// * `bes` - The building energy system
/// * `forecast` - The forecast window covering exactly the horizon
/// * `start_step` - Absolute timestep the window starts at
/// * `timestep` - Length of one timestep
pub fn build_problem(
    bes: &Bes,
    forecast: &Forecast,
    start_step: usize,
    timestep: Seconds,
) -> Result<SchedulingProblem, BuildError> {
    if forecast.is_empty() {
        return Err(BuildError::EmptyHorizon);
    }
    if !timestep.is_finite() || timestep <= Seconds(0.0) {
        return Err(BuildError::InvalidTimestep);
    }
    bes.validate().map_err(BuildError::Device)?;
    forecast.validate().map_err(BuildError::Forecast)?;

    let loads_need_heat = bes
        .deferrable_loads
        .iter()
        .flat_map(|load| &load.load_thermal)
        .any(|q| *q > Power(0.0));
    if (forecast.has_heat_demand() || loads_need_heat) && !bes.has_heat_source() {
        return Err(BuildError::MissingHeatSource);
    }

    Ok(assemble_problem(bes, forecast, start_step, timestep, None))
}

/// Assemble the problem without re-validating the inputs.
///
/// `skip` omits one constraint family; the infeasibility diagnostics use this to probe
/// which families are implicated.
pub(crate) fn assemble_problem(
    bes: &Bes,
    forecast: &Forecast,
    start_step: usize,
    timestep: Seconds,
    skip: Option<ConstraintFamily>,
) -> SchedulingProblem {
    let mut problem = Problem::default();
    let mut variables = VariableMap::default();
    let mut column_costs = Vec::new();

    let heat_units = bes.heat_unit_models(forecast);
    let battery = bes.battery_model();
    let renewables = bes.renewable_production(forecast);

    add_grid_variables(
        &mut problem,
        &mut variables,
        &mut column_costs,
        forecast,
        timestep,
    );
    if let Some(model) = &battery {
        add_battery_variables(&mut problem, &mut variables, &mut column_costs, model);
    }
    if let Some(storage) = &bes.thermal_storage {
        let horizon = forecast.len();
        for t in 0..horizon {
            let var = add_continuous(
                &mut problem,
                &mut variables,
                &mut column_costs,
                t,
                0.0,
                storage.t_min.value()..=storage.t_max.value(),
            );
            variables.storage_temperature.push(var);
        }
    }
    add_heat_unit_variables(
        &mut problem,
        &mut variables,
        &mut column_costs,
        &heat_units,
        forecast,
        timestep,
    );
    add_load_variables(&mut problem, &mut variables, &mut column_costs, bes);

    let context = ConstraintContext {
        bes,
        forecast,
        heat_units: &heat_units,
        battery: battery.as_ref(),
        renewables: &renewables,
        start_step,
        timestep,
    };
    let row_counts = constraints::add_constraints(&mut problem, &variables, &context, skip);

    SchedulingProblem {
        problem,
        variables,
        column_costs,
        row_counts,
        horizon: forecast.len(),
        start_step,
    }
}

/// Add a continuous column and record its cost coefficient.
fn add_continuous(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    step: usize,
    coeff: f64,
    bounds: impl std::ops::RangeBounds<f64>,
) -> Variable {
    let var = problem.add_column(coeff, bounds);
    column_costs.push(ColumnCost { step, coeff });
    variables.add_variable(var);
    var
}

/// Add a zero-cost binary column.
fn add_binary(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    step: usize,
) -> Variable {
    let var = problem.add_integer_column(0.0, 0.0..=1.0);
    column_costs.push(ColumnCost { step, coeff: 0.0 });
    variables.add_variable(var);
    var
}

/// Add grid import and export variables.
///
/// Import costs the tariff price per unit of energy; export earns the remuneration, so
/// its coefficient is negative.
fn add_grid_variables(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    forecast: &Forecast,
    timestep: Seconds,
) {
    let dt = timestep.value();
    for t in 0..forecast.len() {
        let coeff = forecast.price_import[t].value() * dt;
        let var = add_continuous(problem, variables, column_costs, t, coeff, 0.0..);
        variables.import.push(var);
    }
    for t in 0..forecast.len() {
        let coeff = -forecast.revenue_export[t].value() * dt;
        let var = add_continuous(problem, variables, column_costs, t, coeff, 0.0..);
        variables.export.push(var);
    }
}

/// Add battery charge, discharge and state-of-charge variables.
fn add_battery_variables(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    model: &BatteryModel,
) {
    let horizon = variables.import.len();
    let mut vars = BatteryVars {
        p_charge: Vec::with_capacity(horizon),
        p_discharge: Vec::with_capacity(horizon),
        soc: Vec::with_capacity(horizon),
    };
    for t in 0..horizon {
        let var = add_continuous(
            problem,
            variables,
            column_costs,
            t,
            0.0,
            0.0..=model.p_charge_max.value(),
        );
        vars.p_charge.push(var);
    }
    for t in 0..horizon {
        let var = add_continuous(
            problem,
            variables,
            column_costs,
            t,
            0.0,
            0.0..=model.p_discharge_max.value(),
        );
        vars.p_discharge.push(var);
    }
    for t in 0..horizon {
        let var = add_continuous(
            problem,
            variables,
            column_costs,
            t,
            0.0,
            0.0..=model.capacity.value(),
        );
        vars.soc.push(var);
    }
    variables.battery = Some(vars);
}

/// Add heat, on, start and shutdown variables for every dispatchable heat generator.
///
/// The heat column carries the device's fuel cost net of any feed-in remuneration tied to
/// its output; electricity drawn by heat generators is costed through the import column.
fn add_heat_unit_variables(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    heat_units: &[HeatUnitModel],
    forecast: &Forecast,
    timestep: Seconds,
) {
    let dt = timestep.value();
    for model in heat_units {
        let horizon = model.q_max.len();
        let mut vars = HeatUnitVars {
            heat: Vec::with_capacity(horizon),
            on: Vec::with_capacity(horizon),
            start: Vec::with_capacity(horizon),
            shutdown: Vec::with_capacity(horizon),
        };
        for t in 0..horizon {
            let coeff = (model.fuel_per_heat.value() * forecast.price_gas[t].value()
                - model.electricity_yield.value() * forecast.revenue_chp[t].value())
                * dt;
            let var = add_continuous(
                problem,
                variables,
                column_costs,
                t,
                coeff,
                0.0..=model.q_max[t].value(),
            );
            vars.heat.push(var);
        }
        for t in 0..horizon {
            vars.on.push(add_binary(problem, variables, column_costs, t));
        }
        for t in 0..horizon {
            vars.start
                .push(add_binary(problem, variables, column_costs, t));
        }
        for t in 0..horizon {
            vars.shutdown
                .push(add_binary(problem, variables, column_costs, t));
        }
        variables.heat_units.push(vars);
    }
}

/// Add power, state-of-charge, reset and mode variables for every deferrable load.
fn add_load_variables(
    problem: &mut Problem,
    variables: &mut VariableMap,
    column_costs: &mut Vec<ColumnCost>,
    bes: &Bes,
) {
    let horizon = variables.import.len();
    for load in &bes.deferrable_loads {
        let mut vars = LoadVars {
            p_electrical: Vec::with_capacity(horizon),
            q_thermal: Vec::with_capacity(horizon),
            soc: Vec::with_capacity(horizon),
            reset: Vec::with_capacity(horizon),
            on: Vec::with_capacity(horizon),
            start: Vec::with_capacity(horizon),
            shutdown: Vec::with_capacity(horizon),
        };
        for t in 0..horizon {
            let var = add_continuous(problem, variables, column_costs, t, 0.0, 0.0..);
            vars.p_electrical.push(var);
        }
        for t in 0..horizon {
            let var = add_continuous(problem, variables, column_costs, t, 0.0, 0.0..);
            vars.q_thermal.push(var);
        }
        for t in 0..horizon {
            let var = add_continuous(
                problem,
                variables,
                column_costs,
                t,
                0.0,
                0.0..=load.capacity.value(),
            );
            vars.soc.push(var);
        }
        for t in 0..horizon {
            let var = add_continuous(
                problem,
                variables,
                column_costs,
                t,
                0.0,
                0.0..=load.big_m().value(),
            );
            vars.reset.push(var);
        }
        for t in 0..horizon {
            vars.on.push(add_binary(problem, variables, column_costs, t));
        }
        for t in 0..horizon {
            vars.start
                .push(add_binary(problem, variables, column_costs, t));
        }
        for t in 0..horizon {
            vars.shutdown
                .push(add_binary(problem, variables, column_costs, t));
        }
        variables.loads.push(vars);
    }
}
