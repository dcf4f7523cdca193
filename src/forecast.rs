//! Forecast series driving the scheduler.
//!
//! A [`Forecast`] bundles every exogenous per-timestep series: demands, weather and
//! tariffs. The rolling-horizon controller obtains one window at a time through the
//! [`ForecastProvider`] trait; a complete [`Forecast`] acts as a perfect-foresight
//! provider by handing out copies of its own subranges.
use crate::units::{
    Celsius, Dimensionless, Irradiance, MoneyPerEnergy, Power, Pressure, Speed, UnitType,
};
use anyhow::{Result, ensure};

/// Exogenous per-timestep series over some span of the schedule.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Forecast {
    /// Fixed electrical demand of the building
    pub demand_electrical: Vec<Power>,
    /// Space heating demand
    pub demand_heat: Vec<Power>,
    /// Domestic hot water demand
    pub demand_hot_water: Vec<Power>,
    /// Ambient air temperature
    pub t_ambient: Vec<Celsius>,
    /// Required flow temperature of the heating circuit
    pub t_flow: Vec<Celsius>,
    /// Direct irradiance on the PV modules
    pub irradiance_direct: Vec<Irradiance>,
    /// Diffuse irradiance on the PV modules
    pub irradiance_diffuse: Vec<Irradiance>,
    /// Wind speed at hub height
    pub wind_speed: Vec<Speed>,
    /// Relative humidity of the ambient air
    pub humidity: Vec<Dimensionless>,
    /// Atmospheric pressure
    pub pressure: Vec<Pressure>,
    /// Price of electricity imported from the grid
    pub price_import: Vec<MoneyPerEnergy>,
    /// Remuneration for electricity exported to the grid
    pub revenue_export: Vec<MoneyPerEnergy>,
    /// Price of gas
    pub price_gas: Vec<MoneyPerEnergy>,
    /// Feed-in remuneration for CHP generation
    pub revenue_chp: Vec<MoneyPerEnergy>,
}

impl Forecast {
    /// The number of timesteps covered.
    pub fn len(&self) -> usize {
        self.demand_electrical.len()
    }

    /// Whether the forecast covers no timesteps at all.
    pub fn is_empty(&self) -> bool {
        self.demand_electrical.is_empty()
    }

    /// Space heating plus domestic hot water demand at one timestep.
    pub fn total_heat_demand(&self, timestep: usize) -> Power {
        self.demand_heat[timestep] + self.demand_hot_water[timestep]
    }

    /// Whether any timestep carries non-zero heat or hot water demand.
    pub fn has_heat_demand(&self) -> bool {
        self.demand_heat
            .iter()
            .chain(&self.demand_hot_water)
            .any(|demand| *demand > Power(0.0))
    }

    /// A copy of the subrange `[start, start + len)`.
    ///
    /// # Panics
    ///
    /// Panics if the subrange extends past the end of the forecast.
    pub fn window(&self, start: usize, len: usize) -> Forecast {
        let range = start..start + len;
        Forecast {
            demand_electrical: self.demand_electrical[range.clone()].to_vec(),
            demand_heat: self.demand_heat[range.clone()].to_vec(),
            demand_hot_water: self.demand_hot_water[range.clone()].to_vec(),
            t_ambient: self.t_ambient[range.clone()].to_vec(),
            t_flow: self.t_flow[range.clone()].to_vec(),
            irradiance_direct: self.irradiance_direct[range.clone()].to_vec(),
            irradiance_diffuse: self.irradiance_diffuse[range.clone()].to_vec(),
            wind_speed: self.wind_speed[range.clone()].to_vec(),
            humidity: self.humidity[range.clone()].to_vec(),
            pressure: self.pressure[range.clone()].to_vec(),
            price_import: self.price_import[range.clone()].to_vec(),
            revenue_export: self.revenue_export[range.clone()].to_vec(),
            price_gas: self.price_gas[range.clone()].to_vec(),
            revenue_chp: self.revenue_chp[range].to_vec(),
        }
    }

    /// Check that the series are non-empty, equally long and physically meaningful.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.is_empty(), "Forecasts cannot be empty");

        let len = self.len();
        check_series("electrical demand", &self.demand_electrical, len)?;
        check_series("heat demand", &self.demand_heat, len)?;
        check_series("hot water demand", &self.demand_hot_water, len)?;
        check_series("direct irradiance", &self.irradiance_direct, len)?;
        check_series("diffuse irradiance", &self.irradiance_diffuse, len)?;
        check_series("wind speed", &self.wind_speed, len)?;
        check_series("humidity", &self.humidity, len)?;
        check_series("pressure", &self.pressure, len)?;
        check_series("import price", &self.price_import, len)?;
        check_series("export remuneration", &self.revenue_export, len)?;
        check_series("gas price", &self.price_gas, len)?;
        check_series("CHP remuneration", &self.revenue_chp, len)?;

        for (name, series) in [
            ("ambient temperature", &self.t_ambient),
            ("flow temperature", &self.t_flow),
        ] {
            ensure!(
                series.len() == len,
                "The {name} series must have one value per timestep"
            );
            ensure!(
                series.iter().all(|value| value.is_finite()),
                "All {name} values must be finite"
            );
        }

        Ok(())
    }
}

/// Check length, finiteness and non-negativity of one series.
fn check_series<T: UnitType + PartialOrd>(name: &str, series: &[T], len: usize) -> Result<()> {
    ensure!(
        series.len() == len,
        "The {name} series must have one value per timestep"
    );
    ensure!(
        series
            .iter()
            .all(|value| value.value().is_finite() && *value >= T::new(0.0)),
        "All {name} values must be finite, non-negative numbers"
    );
    Ok(())
}

/// Source of forecast windows for the rolling-horizon controller.
pub trait ForecastProvider {
    /// The series for timesteps `[start, start + len)`.
    fn forecast(&self, start: usize, len: usize) -> Result<Forecast>;
}

impl ForecastProvider for Forecast {
    fn forecast(&self, start: usize, len: usize) -> Result<Forecast> {
        ensure!(
            start + len <= self.len(),
            "Forecast window {start}..{} extends past the last known timestep {}",
            start + len,
            self.len()
        );
        Ok(self.window(start, len))
    }
}
