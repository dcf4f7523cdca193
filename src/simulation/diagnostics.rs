//! Diagnostics for horizons the solver reports as infeasible.
//!
//! When a horizon has no feasible schedule, we re-solve it repeatedly, each time leaving one
//! constraint family out of the problem. If dropping a family makes the horizon solvable, that
//! family is implicated in the conflict. The report cannot point at a single row, but it narrows
//! the search to, say, "Thermal Balance" (undersized heat units) rather than leaving the user
//! with a bare "infeasible" from the solver.
use super::optimisation::{ConstraintFamily, RowCounts, assemble_problem};
use super::solver::{SolveError, SolveOptions, solve};
use crate::device::Bes;
use crate::forecast::Forecast;
use crate::units::Seconds;
use itertools::Itertools;
use log::debug;
use std::fmt;
use strum::IntoEnumIterator;

/// Time limit for each probe solve.
///
/// Probes only need to distinguish "feasible" from "infeasible", so we cap them rather than let a
/// degenerate relaxation run the full solve budget.
const PROBE_TIME_LIMIT: Seconds = Seconds(10.0);

/// The outcome of probing an infeasible horizon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfeasibilityReport {
    /// Constraint families whose removal restores feasibility
    pub implicated: Vec<ConstraintFamily>,
}

impl fmt::Display for InfeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.implicated.is_empty() {
            write!(
                f,
                "removing no single constraint family restores feasibility; \
                 the conflict spans multiple families"
            )
        } else {
            write!(
                f,
                "removing any one of these constraint families restores feasibility: {}",
                self.implicated.iter().join(", ")
            )
        }
    }
}

/// Probe an infeasible horizon by re-solving it without each constraint family in turn.
///
/// Families that contributed no rows to the original problem are skipped. A probe whose relaxation
/// solves, or becomes unbounded, implicates the family it dropped; a probe that stays infeasible
/// rules its family out.
///
/// # Arguments
///
/// * `bes` - The building energy system being scheduled
/// * `forecast` - The forecast window the infeasible problem was built from
/// * `start_step` - Absolute timestep at which the window starts
/// * `timestep` - Duration of one timestep
/// * `row_counts` - Row counts of the infeasible problem
pub fn diagnose_infeasibility(
    bes: &Bes,
    forecast: &Forecast,
    start_step: usize,
    timestep: Seconds,
    row_counts: &RowCounts,
) -> InfeasibilityReport {
    let options = SolveOptions {
        time_limit: Some(PROBE_TIME_LIMIT),
    };
    let mut implicated = Vec::new();
    for family in ConstraintFamily::iter() {
        if row_counts.rows_for(family) == 0 {
            continue;
        }

        debug!("Probing horizon without {family} constraints");
        let probe = assemble_problem(bes, forecast, start_step, timestep, Some(family));
        match solve(probe, &options) {
            Ok(_) | Err(SolveError::Unbounded) => implicated.push(family),
            Err(_) => {}
        }
    }

    InfeasibilityReport { implicated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::heating::Boiler;
    use crate::fixture::{boiler, forecast};
    use crate::simulation::optimisation::build_problem;
    use crate::units::Power;
    use rstest::rstest;

    const TIMESTEP: Seconds = Seconds(900.0);

    #[rstest]
    fn test_diagnose_undersized_boiler(boiler: Boiler, forecast: Forecast) {
        // A lone 5 kW boiler cannot meet a 50 kW heat demand
        let bes = Bes {
            boiler: Some(boiler),
            ..Bes::default()
        };
        let mut forecast = forecast;
        forecast.demand_heat = vec![Power(50_000.0); forecast.len()];

        let problem = build_problem(&bes, &forecast, 0, TIMESTEP).unwrap();
        let row_counts = problem.row_counts().clone();
        let report = diagnose_infeasibility(&bes, &forecast, 0, TIMESTEP, &row_counts);
        assert_eq!(report.implicated, vec![ConstraintFamily::ThermalBalance]);
    }

    #[rstest]
    fn test_report_display() {
        let report = InfeasibilityReport::default();
        assert!(report.to_string().contains("no single constraint family"));

        let report = InfeasibilityReport {
            implicated: vec![
                ConstraintFamily::ThermalBalance,
                ConstraintFamily::ActivationLimits,
            ],
        };
        assert!(
            report
                .to_string()
                .contains("Thermal Balance, Activation Limits")
        );
    }
}
