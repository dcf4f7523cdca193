//! The module responsible for writing output data to disk.
use crate::device::deferrable::LoadID;
use crate::device::heating::HeatUnitKind;
use crate::schedule::ScheduleLog;
use crate::units::{Celsius, Energy, Money, Power};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "besched_results";

/// The output file name for grid exchange and cost
const GRID_FILE_NAME: &str = "grid.csv";

/// The output file name for the battery schedule
const BATTERY_FILE_NAME: &str = "battery.csv";

/// The output file name for the thermal storage schedule
const STORAGE_FILE_NAME: &str = "storage.csv";

/// The output file name for heat unit schedules
const HEAT_UNITS_FILE_NAME: &str = "heat_units.csv";

/// The output file name for deferrable load schedules
const LOADS_FILE_NAME: &str = "loads.csv";

/// Get the scenario name from the specified directory path
pub fn get_output_dir(scenario_dir: &Path) -> Result<PathBuf> {
    // Get the scenario name from the dir path. This ends up being convoluted because we need to
    // check for all possible errors. Ugh.
    let scenario_dir = scenario_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to scenario")?;

    let scenario_name = scenario_dir
        .file_name()
        .context("Scenario cannot be in root folder")?
        .to_str()
        .context("Invalid chars in scenario dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, scenario_name].iter().collect())
}

/// Create a new output directory for the scenario specified at `scenario_dir`.
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Represents a row in the grid CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GridRow {
    timestep: usize,
    import: Power,
    export: Power,
    cost: Money,
}

/// Represents a row in the battery CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BatteryRow {
    timestep: usize,
    p_charge: Power,
    p_discharge: Power,
    soc: Energy,
}

/// Represents a row in the thermal storage CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct StorageRow {
    timestep: usize,
    temperature: Celsius,
}

/// Represents a row in the heat units CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct HeatUnitRow {
    timestep: usize,
    unit: HeatUnitKind,
    heat: Power,
    on: bool,
}

/// Represents a row in the deferrable loads CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct LoadRow {
    timestep: usize,
    load_id: LoadID,
    p_electrical: Power,
    q_thermal: Power,
    soc: Energy,
    on: bool,
    start: bool,
}

/// An object for writing committed schedules to file
pub struct DataWriter {
    grid_writer: csv::Writer<File>,
    battery_writer: csv::Writer<File>,
    storage_writer: csv::Writer<File>,
    heat_units_writer: csv::Writer<File>,
    loads_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            grid_writer: new_writer(GRID_FILE_NAME)?,
            battery_writer: new_writer(BATTERY_FILE_NAME)?,
            storage_writer: new_writer(STORAGE_FILE_NAME)?,
            heat_units_writer: new_writer(HEAT_UNITS_FILE_NAME)?,
            loads_writer: new_writer(LOADS_FILE_NAME)?,
        })
    }

    /// Write a committed schedule to the output CSV files.
    ///
    /// Files for devices the system does not contain are left empty.
    pub fn write_schedule(&mut self, log: &ScheduleLog) -> Result<()> {
        for (timestep, record) in log.grid.iter().enumerate() {
            let row = GridRow {
                timestep,
                import: record.import,
                export: record.export,
                cost: record.cost,
            };
            self.grid_writer.serialize(row)?;
        }

        for (timestep, record) in log.battery.iter().enumerate() {
            let row = BatteryRow {
                timestep,
                p_charge: record.p_charge,
                p_discharge: record.p_discharge,
                soc: record.soc,
            };
            self.battery_writer.serialize(row)?;
        }

        for (timestep, record) in log.storage.iter().enumerate() {
            let row = StorageRow {
                timestep,
                temperature: record.temperature,
            };
            self.storage_writer.serialize(row)?;
        }

        for (unit, records) in &log.heat_units {
            for (timestep, record) in records.iter().enumerate() {
                let row = HeatUnitRow {
                    timestep,
                    unit: *unit,
                    heat: record.heat,
                    on: record.on,
                };
                self.heat_units_writer.serialize(row)?;
            }
        }

        for (load_id, records) in &log.loads {
            for (timestep, record) in records.iter().enumerate() {
                let row = LoadRow {
                    timestep,
                    load_id: load_id.clone(),
                    p_electrical: record.p_electrical,
                    q_thermal: record.q_thermal,
                    soc: record.soc,
                    on: record.on,
                    start: record.start,
                };
                self.loads_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.grid_writer.flush()?;
        self.battery_writer.flush()?;
        self.storage_writer.flush()?;
        self.heat_units_writer.flush()?;
        self.loads_writer.flush()?;

        Ok(())
    }
}
