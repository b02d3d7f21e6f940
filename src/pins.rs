//! GPIO / peripheral pin assignments for the LampNode board (ESP32-WROOM).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  `DeviceConfig` carries the same numbers so the
//! boot log shows the wiring actually in use.

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Onboard LED (D4) driven by the remote on/off command.  HIGH = on.
pub const OUTPUT_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1, 12-bit)
// ---------------------------------------------------------------------------

/// LDR voltage divider (ambient light).  ADC1 channel 6.
pub const LIGHT_ADC_GPIO: i32 = 34;
/// Potentiometer standing in for the mains voltage sensor.  ADC1 channel 7.
pub const VOLTAGE_ADC_GPIO: i32 = 35;

/// Full-scale raw reading of the 12-bit ADC.
pub const ADC_MAX_RAW: u16 = 4095;

// ---------------------------------------------------------------------------
// Sensors: Digital
// ---------------------------------------------------------------------------

/// DHT22 single-wire data line (open drain, external pull-up).
pub const DHT_GPIO: i32 = 15;
