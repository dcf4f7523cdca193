#![allow(missing_docs)]

//! This module defines unit types for physical and economic quantities and their conversions.
//!
//! All quantities are stored in SI base units: watts, joules, seconds, kilograms, degrees
//! Celsius and currency units per joule. The optimisation matrix itself works on raw `f64`
//! coefficients; these types guard the arithmetic on the way in (device parameters,
//! forecasts) and on the way out (committed schedules).

/// Represents a dimensionless quantity (efficiencies, fractions, ratios).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Add,
    derive_more::Sub,
)]
#[serde(transparent)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Returns true if this value is neither infinite nor NaN.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 / rhs.0)
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

/// Common interface for unit types, used when reading solver columns back into typed values.
pub trait UnitType: Copy {
    /// Wrap a raw value in base units.
    fn new(value: f64) -> Self;
    /// The raw value in base units.
    fn value(self) -> f64;
}

impl UnitType for Dimensionless {
    fn new(value: f64) -> Self {
        Self(value)
    }

    fn value(self) -> f64 {
        self.0
    }
}

macro_rules! unit_struct {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Add,
            derive_more::Sub,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn from(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Returns true if this value is neither infinite nor NaN.
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// Returns the smaller of two values.
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// Returns the larger of two values.
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl crate::units::UnitType for $name {
            fn new(value: f64) -> Self {
                Self(value)
            }

            fn value(self) -> f64 {
                self.0
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name::from(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name::from(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name::from(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless::from(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::from(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 / rhs.0)
            }
        }
    };
}

// Base quantities
unit_struct!(Power, "Power in watts.");
unit_struct!(Energy, "Energy in joules.");
unit_struct!(Money, "Cost or revenue in currency units.");
unit_struct!(Seconds, "A duration in seconds.");
unit_struct!(
    Celsius,
    "A temperature, or temperature difference, in degrees Celsius."
);
unit_struct!(Mass, "Mass in kilograms.");
unit_struct!(Area, "Area in square metres.");
unit_struct!(Speed, "Speed in metres per second.");
unit_struct!(Irradiance, "Radiative power density in watts per square metre.");
unit_struct!(Pressure, "Atmospheric pressure in pascals.");

// Derived quantities
unit_struct!(MoneyPerEnergy, "Price in currency units per joule.");
unit_struct!(PowerPerCelsius, "Heat transmission in watts per kelvin.");
unit_struct!(EnergyPerCelsius, "Heat capacity in joules per kelvin.");
unit_struct!(
    SpecificHeat,
    "Specific heat capacity in joules per kilogram-kelvin."
);

// Multiplication rules
impl_mul!(Power, Seconds, Energy);
impl_mul!(MoneyPerEnergy, Energy, Money);
impl_mul!(PowerPerCelsius, Celsius, Power);
impl_mul!(EnergyPerCelsius, Celsius, Energy);
impl_mul!(Mass, SpecificHeat, EnergyPerCelsius);
impl_mul!(Irradiance, Area, Power);

// Division rules
impl_div!(Energy, Seconds, Power);
impl_div!(Energy, Celsius, EnergyPerCelsius);
impl_div!(Money, Energy, MoneyPerEnergy);
impl_div!(Energy, EnergyPerCelsius, Celsius);

/// Specific heat capacity of water, used to convert tank mass into heat capacity.
pub const WATER_SPECIFIC_HEAT: SpecificHeat = SpecificHeat(4180.0);
