//! Functionality for running the rolling-horizon scheduling simulation.
//!
//! The simulation walks forward through time in horizons. Each iteration builds a scheduling
//! problem over the next `horizon` timesteps, solves it, commits the first `used_horizon` steps
//! and rolls the device states forward. Looking further ahead than we commit keeps the committed
//! steps far-sighted: the solver will not, say, drain the battery just before an expensive
//! evening if the horizon can see that evening coming.
use crate::device::Bes;
use crate::forecast::ForecastProvider;
use crate::schedule::ScheduleLog;
use crate::units::Seconds;
use anyhow::{Context, Result, bail, ensure};
use log::{info, warn};
use serde::Deserialize;

pub mod diagnostics;
use diagnostics::diagnose_infeasibility;
pub mod optimisation;
use optimisation::build_problem;
pub mod solver;
use solver::{SolveError, SolveOptions, SolveStatus, solve};
pub mod update;
use update::commit_schedule;

/// Parameters controlling the rolling-horizon loop.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct SimulationParams {
    /// Duration of one timestep
    pub timestep: Seconds,
    /// Number of timesteps each scheduling problem looks ahead
    pub horizon: usize,
    /// Number of leading timesteps committed from each solved horizon
    pub used_horizon: usize,
    /// Total number of timesteps to schedule
    pub total_timesteps: usize,
    /// Wall-clock limit for each solve, if any
    #[serde(default)]
    pub time_limit: Option<Seconds>,
}

impl SimulationParams {
    /// Check the parameters for validity, returning an error if not.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.timestep.is_finite() && self.timestep > Seconds(0.0),
            "The timestep must be positive and finite"
        );
        ensure!(
            self.horizon >= 1,
            "The horizon must cover at least one timestep"
        );
        ensure!(
            (1..=self.horizon).contains(&self.used_horizon),
            "The used horizon must lie between one and the horizon length"
        );
        ensure!(
            self.total_timesteps >= 1,
            "The simulation must cover at least one timestep"
        );
        if let Some(time_limit) = self.time_limit {
            ensure!(
                time_limit.is_finite() && time_limit > Seconds(0.0),
                "The solver time limit must be positive and finite"
            );
        }
        Ok(())
    }

    fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_limit: self.time_limit,
        }
    }
}

/// Run the simulation.
///
/// Schedules `params.total_timesteps` timesteps, committing them into `log` and rolling the
/// device states in `bes` forward as it goes. The final horizons shrink once fewer than
/// `params.horizon` timesteps remain.
///
/// On an infeasible horizon, the committed part of the schedule stays in `log` and the error
/// names the constraint families implicated in the conflict.
///
/// # Arguments
///
/// * `bes` - The building energy system to schedule
/// * `provider` - Source of forecast windows
/// * `params` - Parameters for the rolling-horizon loop
/// * `log` - The schedule to append committed steps to
pub fn run(
    bes: &mut Bes,
    provider: &impl ForecastProvider,
    params: &SimulationParams,
    log: &mut ScheduleLog,
) -> Result<()> {
    params.validate().context("Invalid simulation parameters")?;

    let options = params.solve_options();
    let mut start = log.committed_len();
    while start < params.total_timesteps {
        let horizon = params.horizon.min(params.total_timesteps - start);
        let used = params.used_horizon.min(horizon);
        info!(
            "Scheduling timesteps {start} to {}, committing {used}",
            start + horizon - 1
        );

        let forecast = provider.forecast(start, horizon).with_context(|| {
            format!("No forecast for timesteps {start} to {}", start + horizon - 1)
        })?;
        let problem = build_problem(bes, &forecast, start, params.timestep).with_context(|| {
            format!("Could not build the scheduling problem at timestep {start}")
        })?;
        let row_counts = problem.row_counts().clone();

        let (solution, status) = match solve(problem, &options) {
            Ok(result) => result,
            Err(SolveError::Infeasible) => {
                let report =
                    diagnose_infeasibility(bes, &forecast, start, params.timestep, &row_counts);
                bail!(
                    "No feasible schedule for timesteps {start} to {}; {report}",
                    start + horizon - 1
                );
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Solving failed at timestep {start}"));
            }
        };
        if status == SolveStatus::TimeLimit {
            warn!(
                "Solver hit the time limit at timestep {start}; committing its incumbent schedule"
            );
        }

        commit_schedule(bes, log, &solution, used);
        start += used;
    }

    info!(
        "Scheduled {} timesteps at a total grid cost of {}",
        log.committed_len(),
        log.total_cost().value()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::heating::Boiler;
    use crate::fixture::{assert_error, bes, boiler, forecast};
    use crate::forecast::Forecast;
    use crate::units::Power;
    use rstest::{fixture, rstest};

    #[fixture]
    fn params() -> SimulationParams {
        SimulationParams {
            timestep: Seconds(900.0),
            horizon: 2,
            used_horizon: 1,
            total_timesteps: 4,
            time_limit: None,
        }
    }

    #[rstest]
    #[case(Seconds(0.0), 2, 1, 4, "The timestep must be positive and finite")]
    #[case(Seconds(900.0), 0, 1, 4, "The horizon must cover at least one timestep")]
    #[case(
        Seconds(900.0),
        2,
        3,
        4,
        "The used horizon must lie between one and the horizon length"
    )]
    #[case(
        Seconds(900.0),
        2,
        0,
        4,
        "The used horizon must lie between one and the horizon length"
    )]
    #[case(
        Seconds(900.0),
        2,
        1,
        0,
        "The simulation must cover at least one timestep"
    )]
    fn test_params_validate_invalid(
        #[case] timestep: Seconds,
        #[case] horizon: usize,
        #[case] used_horizon: usize,
        #[case] total_timesteps: usize,
        #[case] message: &str,
    ) {
        let params = SimulationParams {
            timestep,
            horizon,
            used_horizon,
            total_timesteps,
            time_limit: None,
        };
        assert_error!(params.validate(), message);
    }

    #[rstest]
    fn test_run_commits_all_timesteps(bes: Bes, forecast: Forecast, params: SimulationParams) {
        let mut bes = bes;
        let mut log = ScheduleLog::new(&bes);
        run(&mut bes, &forecast, &params, &mut log).unwrap();
        assert_eq!(log.committed_len(), params.total_timesteps);
        assert_eq!(log.battery.len(), params.total_timesteps);
        assert_eq!(log.storage.len(), params.total_timesteps);
    }

    #[rstest]
    fn test_run_shrinks_final_horizon(bes: Bes, forecast: Forecast, params: SimulationParams) {
        // With a horizon of 3 committed 2 at a time, the last iteration sees only 2 steps
        let mut bes = bes;
        let params = SimulationParams {
            horizon: 3,
            used_horizon: 2,
            ..params
        };
        let mut log = ScheduleLog::new(&bes);
        run(&mut bes, &forecast, &params, &mut log).unwrap();
        assert_eq!(log.committed_len(), params.total_timesteps);
    }

    #[rstest]
    fn test_run_infeasible_names_families(
        boiler: Boiler,
        forecast: Forecast,
        params: SimulationParams,
    ) {
        let mut bes = Bes {
            boiler: Some(boiler),
            ..Bes::default()
        };
        let mut forecast = forecast;
        forecast.demand_heat = vec![Power(50_000.0); forecast.len()];

        let mut log = ScheduleLog::new(&bes);
        let error = run(&mut bes, &forecast, &params, &mut log)
            .unwrap_err()
            .to_string();
        assert!(error.contains("No feasible schedule for timesteps 0 to 1"));
        assert!(error.contains("Thermal Balance"));
    }
}
