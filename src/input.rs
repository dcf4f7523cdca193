//! Code for reading scenario input files.
//!
//! A scenario lives in a directory containing `scenario.toml` (simulation parameters and device
//! configuration) and three CSV files with one row per timestep: `weather.csv`, `demand.csv` and
//! `prices.csv`.
use crate::device::Bes;
use crate::forecast::Forecast;
use crate::simulation::SimulationParams;
use crate::units::{Celsius, Dimensionless, Irradiance, MoneyPerEnergy, Power, Pressure, Speed};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

const SCENARIO_FILE_NAME: &str = "scenario.toml";
const WEATHER_FILE_NAME: &str = "weather.csv";
const DEMAND_FILE_NAME: &str = "demand.csv";
const PRICES_FILE_NAME: &str = "prices.csv";

/// A complete scenario read from a directory.
#[derive(PartialEq, Debug, Clone)]
pub struct Scenario {
    /// The devices making up the building energy system
    pub bes: Bes,
    /// Exogenous series covering the whole simulation
    pub forecast: Forecast,
    /// Parameters for the rolling-horizon loop
    pub params: SimulationParams,
}

/// Represents the contents of `scenario.toml`.
#[derive(Debug, Deserialize, PartialEq)]
struct ScenarioFile {
    simulation: SimulationParams,
    #[serde(flatten)]
    bes: Bes,
}

/// One row of `weather.csv`.
#[derive(Debug, Deserialize, PartialEq)]
struct WeatherRow {
    t_ambient: Celsius,
    t_flow: Celsius,
    irradiance_direct: Irradiance,
    irradiance_diffuse: Irradiance,
    wind_speed: Speed,
    humidity: Dimensionless,
    pressure: Pressure,
}

/// One row of `demand.csv`.
#[derive(Debug, Deserialize, PartialEq)]
struct DemandRow {
    demand_electrical: Power,
    demand_heat: Power,
    demand_hot_water: Power,
}

/// One row of `prices.csv`.
#[derive(Debug, Deserialize, PartialEq)]
struct PriceRow {
    price_import: MoneyPerEnergy,
    revenue_export: MoneyPerEnergy,
    price_gas: MoneyPerEnergy,
    revenue_chp: MoneyPerEnergy,
}

impl Scenario {
    /// Read a scenario from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing the scenario files
    ///
    /// # Returns
    ///
    /// The validated scenario or an error if any file is missing or invalid.
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<Scenario> {
        let scenario_dir = scenario_dir.as_ref();
        let file_path = scenario_dir.join(SCENARIO_FILE_NAME);
        let file: ScenarioFile = read_toml(&file_path)?;
        file.simulation
            .validate()
            .with_context(|| input_err_msg(&file_path))?;
        file.bes
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        let forecast = read_forecast(scenario_dir)?;
        forecast.validate().context("Invalid forecast series")?;
        ensure!(
            forecast.len() >= file.simulation.total_timesteps,
            "The forecast series cover {} timesteps but the simulation needs {}",
            forecast.len(),
            file.simulation.total_timesteps
        );

        Ok(Scenario {
            bes: file.bes,
            forecast,
            params: file.simulation,
        })
    }
}

/// Read the weather, demand and price series for a scenario.
fn read_forecast(scenario_dir: &Path) -> Result<Forecast> {
    let mut forecast = Forecast::default();

    let file_path = scenario_dir.join(WEATHER_FILE_NAME);
    for row in read_csv::<WeatherRow>(&file_path)? {
        forecast.t_ambient.push(row.t_ambient);
        forecast.t_flow.push(row.t_flow);
        forecast.irradiance_direct.push(row.irradiance_direct);
        forecast.irradiance_diffuse.push(row.irradiance_diffuse);
        forecast.wind_speed.push(row.wind_speed);
        forecast.humidity.push(row.humidity);
        forecast.pressure.push(row.pressure);
    }

    let file_path = scenario_dir.join(DEMAND_FILE_NAME);
    for row in read_csv::<DemandRow>(&file_path)? {
        forecast.demand_electrical.push(row.demand_electrical);
        forecast.demand_heat.push(row.demand_heat);
        forecast.demand_hot_water.push(row.demand_hot_water);
    }

    let file_path = scenario_dir.join(PRICES_FILE_NAME);
    for row in read_csv::<PriceRow>(&file_path)? {
        forecast.price_import.push(row.price_import);
        forecast.revenue_export.push(row.revenue_export);
        forecast.price_gas.push(row.price_gas);
        forecast.revenue_chp.push(row.revenue_chp);
    }

    Ok(forecast)
}

/// Parse a TOML file at the specified path.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let records = csv::Reader::from_path(file_path)
        .and_then(|reader| reader.into_deserialize().collect::<csv::Result<Vec<T>>>())
        .with_context(|| input_err_msg(file_path))?;
    Ok(records.into_iter())
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().to_string_lossy())
}

/// Check that the slice is sorted in ascending order and contains no duplicates.
pub fn is_sorted_and_unique<T: PartialOrd>(values: &[T]) -> bool {
    values.windows(2).all(|pair| pair[0] < pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::units::Seconds;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_scenario_toml(dir: &Path, total_timesteps: usize) {
        let mut file = File::create(dir.join(SCENARIO_FILE_NAME)).unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "timestep = 900.0").unwrap();
        writeln!(file, "horizon = 2").unwrap();
        writeln!(file, "used_horizon = 1").unwrap();
        writeln!(file, "total_timesteps = {total_timesteps}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "[battery]").unwrap();
        writeln!(file, "capacity = 14400000.0").unwrap();
        writeln!(file, "soc_init = 7200000.0").unwrap();
        writeln!(file, "self_discharge = 0.001").unwrap();
        writeln!(file, "eta_charge = 0.95").unwrap();
        writeln!(file, "eta_discharge = 0.95").unwrap();
        writeln!(file, "p_charge_nominal = 4000.0").unwrap();
        writeln!(file, "p_discharge_nominal = 4000.0").unwrap();
    }

    fn write_series_csvs(dir: &Path) {
        let mut file = File::create(dir.join(WEATHER_FILE_NAME)).unwrap();
        writeln!(
            file,
            "t_ambient,t_flow,irradiance_direct,irradiance_diffuse,wind_speed,humidity,pressure"
        )
        .unwrap();
        writeln!(file, "0.0,45.0,100.0,50.0,3.0,0.8,101300.0").unwrap();
        writeln!(file, "5.0,45.0,200.0,80.0,4.0,0.75,101300.0").unwrap();

        let mut file = File::create(dir.join(DEMAND_FILE_NAME)).unwrap();
        writeln!(file, "demand_electrical,demand_heat,demand_hot_water").unwrap();
        writeln!(file, "500.0,0.0,0.0").unwrap();
        writeln!(file, "600.0,0.0,0.0").unwrap();

        let mut file = File::create(dir.join(PRICES_FILE_NAME)).unwrap();
        writeln!(file, "price_import,revenue_export,price_gas,revenue_chp").unwrap();
        writeln!(file, "8.3e-8,2.2e-8,1.9e-8,1.4e-8").unwrap();
        writeln!(file, "5.6e-8,2.2e-8,1.9e-8,1.4e-8").unwrap();
    }

    #[test]
    fn test_scenario_from_path() {
        let dir = tempdir().unwrap();
        write_scenario_toml(dir.path(), 2);
        write_series_csvs(dir.path());

        let scenario = Scenario::from_path(dir.path()).unwrap();
        assert_eq!(scenario.params.timestep, Seconds(900.0));
        assert_eq!(scenario.params.total_timesteps, 2);
        assert!(scenario.bes.battery.is_some());
        assert!(scenario.bes.boiler.is_none());
        assert_eq!(scenario.forecast.len(), 2);
        assert_eq!(scenario.forecast.demand_electrical[1], Power(600.0));
        assert_eq!(scenario.forecast.wind_speed[0], Speed(3.0));
    }

    #[test]
    fn test_scenario_from_path_missing_file() {
        let dir = tempdir().unwrap();
        write_scenario_toml(dir.path(), 2);

        let error = Scenario::from_path(dir.path()).unwrap_err();
        assert!(format!("{error:#}").contains("Error reading"));
    }

    #[test]
    fn test_scenario_from_path_short_series() {
        let dir = tempdir().unwrap();
        write_scenario_toml(dir.path(), 4);
        write_series_csvs(dir.path());

        assert_error!(
            Scenario::from_path(dir.path()),
            "The forecast series cover 2 timesteps but the simulation needs 4"
        );
    }

    #[test]
    fn test_read_csv_bad_row() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(DEMAND_FILE_NAME);
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "demand_electrical,demand_heat,demand_hot_water").unwrap();
            writeln!(file, "500.0,not_a_number,0.0").unwrap();
        }

        let result = read_csv::<DemandRow>(&file_path).map(Iterator::count);
        assert!(result.is_err());
    }

    #[test]
    fn test_is_sorted_and_unique() {
        assert!(is_sorted_and_unique::<f64>(&[]));
        assert!(is_sorted_and_unique(&[1.0]));
        assert!(is_sorted_and_unique(&[1.0, 2.0, 3.0]));
        assert!(!is_sorted_and_unique(&[1.0, 1.0]));
        assert!(!is_sorted_and_unique(&[2.0, 1.0]));
    }
}
