//! Deferrable appliance loads such as dishwashers or washing machines.
//!
//! A deferrable load accumulates a state of charge (dirty dishes, laundry) from
//! exogenous gains and discharges it by running one fixed-length cycle. The scheduler
//! decides when each cycle starts; once started it runs to completion.
use crate::id::define_id_type;
use crate::units::{Energy, Power};
use anyhow::{Result, ensure};
use serde::Deserialize;

define_id_type! {LoadID}

/// An appliance whose cycles can be shifted in time.
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct DeferrableLoad {
    /// Unique identifier for this appliance
    pub id: LoadID,
    /// State of charge at which a cycle must start
    pub capacity: Energy,
    /// State of charge at the start of the schedule
    pub soc_init: Energy,
    /// State of charge above which a cycle may start
    pub soc_may_run: Energy,
    /// Exogenous gains per timestep, repeated cyclically over the schedule
    pub gains: Vec<Energy>,
    /// Electrical draw over one cycle, one value per timestep
    pub load_electrical: Vec<Power>,
    /// Heat draw over one cycle, one value per timestep
    pub load_thermal: Vec<Power>,
    /// Cycle starts committed by previous horizons, oldest first
    #[serde(default)]
    pub start_history: Vec<bool>,
}

impl DeferrableLoad {
    /// The number of timesteps one cycle takes.
    pub fn profile_len(&self) -> usize {
        self.load_electrical.len()
    }

    /// The largest single-timestep gain.
    pub fn max_gain(&self) -> Energy {
        self.gains.iter().copied().fold(Energy(0.0), Energy::max)
    }

    /// Big-M constant for linearising the state-of-charge reset on cycle start.
    ///
    /// The state of charge never exceeds the capacity plus one timestep's gain, so this
    /// bounds the reset amount.
    pub fn big_m(&self) -> Energy {
        self.capacity + self.max_gain()
    }

    /// The gain at an absolute timestep of the schedule.
    pub fn gain_at(&self, timestep: usize) -> Energy {
        self.gains[timestep % self.gains.len()]
    }

    /// Whether a cycle started `steps_back` timesteps before the current horizon.
    ///
    /// Timesteps older than the recorded history count as no start.
    pub fn past_start(&self, steps_back: usize) -> bool {
        let len = self.start_history.len();
        (1..=len).contains(&steps_back) && self.start_history[len - steps_back]
    }

    /// Whether a cycle was still running at the last committed timestep.
    ///
    /// A cycle starting `L` steps back occupies exactly the last `L` committed steps, so
    /// any start in the trailing window means the device was on.
    pub fn initially_on(&self) -> bool {
        (1..=self.profile_len()).any(|steps_back| self.past_start(steps_back))
    }

    /// Append committed starts, keeping only the trailing cycle-length window.
    pub fn push_history(&mut self, starts: &[bool]) {
        self.start_history.extend_from_slice(starts);
        let excess = self.start_history.len().saturating_sub(self.profile_len());
        self.start_history.drain(..excess);
    }

    /// Check that the load parameters are physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.capacity.is_finite() && self.capacity > Energy(0.0),
            "Load capacity must be a finite, positive number"
        );
        ensure!(
            self.soc_init >= Energy(0.0) && self.soc_init <= self.capacity,
            "The initial state of charge must lie between zero and the capacity"
        );
        ensure!(
            self.soc_may_run >= Energy(0.0) && self.soc_may_run <= self.capacity,
            "The start threshold must lie between zero and the capacity"
        );
        ensure!(
            !self.gains.is_empty()
                && self
                    .gains
                    .iter()
                    .all(|gain| gain.is_finite() && *gain >= Energy(0.0)),
            "Gains must be a non-empty series of finite, non-negative numbers"
        );
        ensure!(
            !self.load_electrical.is_empty(),
            "The cycle profile cannot be empty"
        );
        ensure!(
            self.load_thermal.len() == self.load_electrical.len(),
            "The electrical and heat cycle profiles must have the same length"
        );
        for profile in [&self.load_electrical, &self.load_thermal] {
            ensure!(
                profile
                    .iter()
                    .all(|value| value.is_finite() && *value >= Power(0.0)),
                "Cycle profiles must contain finite, non-negative numbers"
            );
        }
        ensure!(
            self.start_history.len() <= self.profile_len(),
            "The start history cannot be longer than the cycle profile"
        );
        ensure!(
            self.start_history.iter().filter(|&&start| start).count() <= 1,
            "The start history cannot contain more than one start per cycle"
        );
        Ok(())
    }
}
