//! Fixtures for tests

use crate::device::Bes;
use crate::device::deferrable::DeferrableLoad;
use crate::device::generation::{Pv, WindTurbine};
use crate::device::heating::{Boiler, Chp, ElectricalHeater, HeatPump, HeatPumpTable};
use crate::device::storage::{Battery, Inverter, ThermalStorage};
use crate::forecast::Forecast;
use crate::units::{
    Area, Celsius, Dimensionless, Energy, Irradiance, Mass, MoneyPerEnergy, Power,
    PowerPerCelsius, Pressure, Speed,
};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn boiler() -> Boiler {
    Boiler {
        q_nominal: Power(5000.0),
        eta: Dimensionless(0.9),
        t_max: Celsius(70.0),
        lower_activation_limit: Dimensionless(1.0),
        initially_on: false,
    }
}

#[fixture]
pub fn chp() -> Chp {
    Chp {
        p_nominal: Power(3000.0),
        q_nominal: Power(6000.0),
        omega: Dimensionless(0.85),
        t_max: Celsius(70.0),
        lower_activation_limit: Dimensionless(0.5),
        initially_on: false,
    }
}

#[fixture]
pub fn electrical_heater() -> ElectricalHeater {
    ElectricalHeater {
        p_nominal: Power(2000.0),
        eta: Dimensionless(0.98),
        t_max: Celsius(70.0),
        lower_activation_limit: Dimensionless(0.0),
        initially_on: false,
    }
}

#[fixture]
pub fn heat_pump_table() -> HeatPumpTable {
    HeatPumpTable {
        ambient: vec![Celsius(-10.0), Celsius(10.0)],
        flow: vec![Celsius(35.0), Celsius(55.0)],
        heat: vec![
            vec![Power(4000.0), Power(3500.0)],
            vec![Power(7000.0), Power(6000.0)],
        ],
        power: vec![
            vec![Power(1600.0), Power(1750.0)],
            vec![Power(1750.0), Power(2000.0)],
        ],
    }
}

#[fixture]
pub fn heat_pump(heat_pump_table: HeatPumpTable) -> HeatPump {
    HeatPump {
        table: heat_pump_table,
        t_max: Celsius(55.0),
        lower_activation_limit: Dimensionless(0.5),
        initially_on: false,
    }
}

#[fixture]
pub fn battery() -> Battery {
    Battery {
        capacity: Energy(14_400_000.0),
        soc_init: Energy(7_200_000.0),
        self_discharge: Dimensionless(0.001),
        eta_charge: Dimensionless(0.95),
        eta_discharge: Dimensionless(0.95),
        p_charge_nominal: Power(4000.0),
        p_discharge_nominal: Power(4000.0),
    }
}

#[fixture]
pub fn inverter() -> Inverter {
    Inverter {
        p_nominal: Power(3000.0),
        eta: Dimensionless(0.96),
    }
}

#[fixture]
pub fn thermal_storage() -> ThermalStorage {
    ThermalStorage {
        capacity: Mass(300.0),
        t_init: Celsius(45.0),
        t_min: Celsius(40.0),
        t_max: Celsius(70.0),
        t_surroundings: Celsius(20.0),
        k_losses: PowerPerCelsius(1.5),
    }
}

#[fixture]
pub fn pv() -> Pv {
    Pv {
        area: Area(20.0),
        eta: Dimensionless(0.18),
    }
}

#[fixture]
pub fn wind_turbine() -> WindTurbine {
    WindTurbine {
        velocity: vec![Speed(2.0), Speed(5.0), Speed(10.0)],
        power: vec![Power(0.0), Power(1000.0), Power(3000.0)],
    }
}

#[fixture]
pub fn deferrable_load() -> DeferrableLoad {
    DeferrableLoad {
        id: "dishwasher".into(),
        capacity: Energy(10.0),
        soc_init: Energy(4.0),
        soc_may_run: Energy(8.0),
        gains: vec![Energy(2.0)],
        load_electrical: vec![Power(100.0), Power(200.0), Power(100.0)],
        load_thermal: vec![Power(0.0), Power(50.0), Power(0.0)],
        start_history: Vec::new(),
    }
}

#[fixture]
pub fn bes(
    battery: Battery,
    inverter: Inverter,
    thermal_storage: ThermalStorage,
    boiler: Boiler,
    chp: Chp,
    electrical_heater: ElectricalHeater,
    heat_pump: HeatPump,
    pv: Pv,
    wind_turbine: WindTurbine,
    deferrable_load: DeferrableLoad,
) -> Bes {
    Bes {
        battery: Some(battery),
        thermal_storage: Some(thermal_storage),
        boiler: Some(boiler),
        chp: Some(chp),
        electrical_heater: Some(electrical_heater),
        heat_pump: Some(heat_pump),
        inverter_ac_dc: Some(inverter.clone()),
        inverter_dc_ac: Some(inverter),
        pv: Some(pv),
        wind_turbine: Some(wind_turbine),
        deferrable_loads: vec![deferrable_load],
    }
}

#[fixture]
pub fn forecast() -> Forecast {
    Forecast {
        demand_electrical: vec![Power(500.0), Power(600.0), Power(550.0), Power(500.0)],
        demand_heat: vec![Power(2000.0), Power(2000.0), Power(1500.0), Power(1000.0)],
        demand_hot_water: vec![Power(0.0), Power(100.0), Power(0.0), Power(200.0)],
        t_ambient: vec![Celsius(-5.0), Celsius(0.0), Celsius(5.0), Celsius(10.0)],
        t_flow: vec![Celsius(45.0), Celsius(45.0), Celsius(40.0), Celsius(40.0)],
        irradiance_direct: vec![
            Irradiance(0.0),
            Irradiance(100.0),
            Irradiance(300.0),
            Irradiance(200.0),
        ],
        irradiance_diffuse: vec![
            Irradiance(50.0),
            Irradiance(80.0),
            Irradiance(120.0),
            Irradiance(100.0),
        ],
        wind_speed: vec![Speed(3.0), Speed(4.0), Speed(6.0), Speed(5.0)],
        humidity: vec![Dimensionless(0.8); 4],
        pressure: vec![Pressure(101_300.0); 4],
        price_import: vec![
            MoneyPerEnergy(8.3e-8),
            MoneyPerEnergy(8.3e-8),
            MoneyPerEnergy(5.6e-8),
            MoneyPerEnergy(5.6e-8),
        ],
        revenue_export: vec![MoneyPerEnergy(2.2e-8); 4],
        price_gas: vec![MoneyPerEnergy(1.9e-8); 4],
        revenue_chp: vec![MoneyPerEnergy(1.4e-8); 4],
    }
}
