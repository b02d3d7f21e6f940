//! Sensor subsystem: individual readers, range mapping and the aggregating
//! [`SensorBank`].
//!
//! Readers return raw values; the telemetry cycle maps them to engineering
//! units with [`luminosity_percent`] and [`voltage_scaled`].  A failed
//! climate read is not an error for the cycle: it becomes
//! [`ClimateReading::FAILED`] (NaN fields) and flows into the published
//! payloads and the display.

pub mod climate;
pub mod light;
pub mod voltage;

use log::warn;

use crate::pins::ADC_MAX_RAW;
use climate::ClimateRead;
use light::LightSensor;
use voltage::VoltageSensor;

/// Upper end of the luminosity scale (percent).
pub const LUMINOSITY_MAX: i32 = 100;
/// Upper end of the voltage scale.
pub const VOLTAGE_MAX: i32 = 300;

/// Temperature (°C) and relative humidity (%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateReading {
    /// Sentinel for a read that produced no measurement.
    pub const FAILED: Self = Self {
        temperature_c: f32::NAN,
        humidity_pct: f32::NAN,
    };

    pub fn is_valid(&self) -> bool {
        !self.temperature_c.is_nan() && !self.humidity_pct.is_nan()
    }
}

impl Default for ClimateReading {
    fn default() -> Self {
        Self::FAILED
    }
}

/// Fixed-precision decimal with the `nan` spelling for a failed read,
/// shared by the wire payloads and the display.
pub struct Decimal(pub f32, pub usize);

impl core::fmt::Display for Decimal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.is_nan() {
            f.write_str("nan")
        } else {
            write!(f, "{:.*}", self.1, self.0)
        }
    }
}

/// Linear integer re-mapping with truncation toward zero, the classic
/// microcontroller `map()`.
pub const fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Raw 12-bit light reading to 0–100 %.  Raw values above full scale clamp.
pub const fn luminosity_percent(raw: u16) -> u8 {
    let raw = if raw > ADC_MAX_RAW { ADC_MAX_RAW } else { raw };
    map_range(raw as i32, 0, ADC_MAX_RAW as i32, 0, LUMINOSITY_MAX) as u8
}

/// Raw 12-bit voltage reading to 0–300.  Raw values above full scale clamp.
pub const fn voltage_scaled(raw: u16) -> u16 {
    let raw = if raw > ADC_MAX_RAW { ADC_MAX_RAW } else { raw };
    map_range(raw as i32, 0, ADC_MAX_RAW as i32, 0, VOLTAGE_MAX) as u16
}

/// Aggregates the three independent readers.
pub struct SensorBank<C: ClimateRead> {
    pub light: LightSensor,
    pub voltage: VoltageSensor,
    pub climate: C,
    climate_failures: u32,
}

impl<C: ClimateRead> SensorBank<C> {
    /// Construct a new bank.  Drivers are built in main where peripheral
    /// ownership is established.
    pub fn new(light: LightSensor, voltage: VoltageSensor, climate: C) -> Self {
        Self {
            light,
            voltage,
            climate,
            climate_failures: 0,
        }
    }

    pub fn read_luminosity_raw(&mut self) -> u16 {
        self.light.read_raw()
    }

    pub fn read_voltage_raw(&mut self) -> u16 {
        self.voltage.read_raw()
    }

    /// Climate reading, or the NaN sentinel when the sensor fails.
    pub fn read_climate(&mut self) -> ClimateReading {
        match self.climate.read() {
            Ok(reading) => reading,
            Err(e) => {
                self.climate_failures = self.climate_failures.wrapping_add(1);
                warn!("Climate read failed ({e}), publishing sentinel");
                ClimateReading::FAILED
            }
        }
    }

    /// Failed climate reads since boot.
    pub fn climate_failures(&self) -> u32 {
        self.climate_failures
    }
}
