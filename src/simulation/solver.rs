//! Code for solving a scheduling problem with the HiGHS solver.
use super::optimisation::{SchedulingProblem, Solution};
use crate::units::Seconds;
use highs::{HighsModelStatus, Sense};
use thiserror::Error;

/// Why the solver failed to produce a usable schedule.
#[derive(Error, Debug)]
pub enum SolveError {
    /// No feasible schedule exists for the horizon
    #[error("no feasible schedule exists for this horizon")]
    Infeasible,
    /// The objective can be driven arbitrarily low
    #[error(
        "the objective is unbounded; check that the export remuneration \
         does not exceed the import price"
    )]
    Unbounded,
    /// The time limit expired before a first schedule was found
    #[error("the time limit expired before a first schedule was found")]
    NoIncumbent,
    /// Any other solver status
    #[error("unexpected solver status: {0:?}")]
    Unexpected(HighsModelStatus),
}

/// How good a returned solution is.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolveStatus {
    /// Proven optimal
    Optimal,
    /// Best schedule found when the time limit expired
    TimeLimit,
}

/// Options controlling a single solve.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SolveOptions {
    /// Abort the solve once this much wall-clock time has passed
    pub time_limit: Option<Seconds>,
}

/// Solve a scheduling problem.
///
/// The solver always runs single-threaded with a fixed random seed so that repeated runs
/// of the same horizon commit identical schedules.
pub fn solve(
    problem: SchedulingProblem,
    options: &SolveOptions,
) -> Result<(Solution, SolveStatus), SolveError> {
    let SchedulingProblem {
        problem,
        variables,
        column_costs,
        row_counts: _,
        horizon,
        start_step,
    } = problem;

    let mut model = problem.optimise(Sense::Minimise);
    model.set_option("threads", 1);
    model.set_option("random_seed", 0);
    if let Some(limit) = options.time_limit {
        model.set_option("time_limit", limit.value());
    }
    enable_highs_logging(&mut model);

    let solved = model.solve();
    match solved.status() {
        HighsModelStatus::Optimal => {
            let solution = Solution {
                solution: solved.get_solution(),
                variables,
                column_costs,
                horizon,
                start_step,
            };
            Ok((solution, SolveStatus::Optimal))
        }
        HighsModelStatus::ReachedTimeLimit => {
            // HiGHS reports whatever incumbent it had when the clock ran out; accept it
            // only if it is a complete assignment
            let raw = solved.get_solution();
            let complete = raw.columns().len() == column_costs.len()
                && raw.columns().iter().all(|value| value.is_finite());
            if !complete {
                return Err(SolveError::NoIncumbent);
            }
            let solution = Solution {
                solution: raw,
                variables,
                column_costs,
                horizon,
                start_step,
            };
            Ok((solution, SolveStatus::TimeLimit))
        }
        HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
            Err(SolveError::Infeasible)
        }
        HighsModelStatus::Unbounded => Err(SolveError::Unbounded),
        status => Err(SolveError::Unexpected(status)),
    }
}

/// Enable logging for the HiGHS solver
fn enable_highs_logging(model: &mut highs::Model) {
    // **HACK**: Skip this step if logging is disabled (e.g. when running tests)
    if let Ok(log_level) = std::env::var("BESCHED_LOG_LEVEL") {
        if log_level.eq_ignore_ascii_case("off") {
            return;
        }
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Bes;
    use crate::fixture::{battery, bes, forecast};
    use crate::forecast::Forecast;
    use crate::simulation::optimisation::build_problem;
    use crate::units::{MoneyPerEnergy, Power};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    const TIMESTEP: Seconds = Seconds(900.0);

    /// An idle battery with zero demand has nothing to do and costs nothing.
    #[rstest]
    fn test_solve_idle_battery(battery: crate::device::storage::Battery, forecast: Forecast) {
        let bes = Bes {
            battery: Some(battery),
            ..Bes::default()
        };
        let mut quiet = forecast;
        quiet.demand_electrical = vec![Power(0.0); quiet.len()];
        quiet.demand_heat = vec![Power(0.0); quiet.len()];
        quiet.demand_hot_water = vec![Power(0.0); quiet.len()];
        // No feed-in remuneration, so there is no arbitrage to play
        quiet.revenue_export = vec![MoneyPerEnergy(0.0); quiet.len()];

        let problem = build_problem(&bes, &quiet, 0, TIMESTEP).unwrap();
        let (solution, status) = solve(problem, &SolveOptions::default()).unwrap();

        assert_eq!(status, SolveStatus::Optimal);
        assert_approx_eq!(f64, solution.objective_value().value(), 0.0);
        let vars = solution.variables();
        for t in 0..quiet.len() {
            assert_approx_eq!(
                f64,
                solution
                    .get_solution_value::<Power>(&vars.import[t])
                    .value(),
                0.0
            );
        }
    }

    /// Demand beyond every generator's combined maximum has no feasible schedule.
    #[rstest]
    fn test_solve_reports_infeasible(bes: Bes, forecast: Forecast) {
        let undersized = Bes {
            boiler: bes.boiler,
            ..Bes::default()
        };
        let mut hungry = forecast;
        hungry.demand_heat = vec![Power(50_000.0); hungry.len()];

        let problem = build_problem(&undersized, &hungry, 0, TIMESTEP).unwrap();
        let result = solve(problem, &SolveOptions::default());
        assert!(matches!(result, Err(SolveError::Infeasible)));
    }

    /// Export paying more than import costs creates an infinite arbitrage.
    #[rstest]
    fn test_solve_reports_unbounded(forecast: Forecast) {
        let mut skewed = forecast;
        skewed.demand_heat = vec![Power(0.0); skewed.len()];
        skewed.demand_hot_water = vec![Power(0.0); skewed.len()];
        skewed.revenue_export = vec![MoneyPerEnergy(1.0e-6); skewed.len()];

        let problem = build_problem(&Bes::default(), &skewed, 0, TIMESTEP).unwrap();
        let result = solve(problem, &SolveOptions::default());
        assert!(matches!(
            result,
            Err(SolveError::Unbounded | SolveError::Infeasible)
        ));
    }
}
