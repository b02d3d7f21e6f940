//! DHT22 (AM2302) temperature + humidity sensor.
//!
//! Single-wire protocol over an open-drain GPIO with external pull-up:
//!
//! ```text
//!  host   ▔▔╲____1.1ms____╱▔▔▔ release
//!  sensor                      ╲_80µs_╱▔80µs▔╲ 40 × (╲_50µs_╱▔26µs=0 | 70µs=1▔╲)
//! ```
//!
//! Frame: humidity ×10 (u16), temperature ×10 (sign bit + 15 bits),
//! checksum = low byte of the sum of the first four bytes.
//!
//! The bit-banged reader is generic over embedded-hal 1.0 so it runs on the
//! ESP-IDF `PinDriver` and on host test doubles alike.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::ClimateReading;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Host start pulse (datasheet: ≥1 ms).
const START_LOW_US: u32 = 1_100;
/// Upper bound for any single line phase.
const PHASE_TIMEOUT_US: u32 = 100;
/// High phases longer than this encode a `1`.
const BIT_THRESHOLD_US: u32 = 40;

/// Anything that can produce a climate reading.
pub trait ClimateRead {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Decode a raw 5-byte DHT22 frame.
pub fn decode_frame(frame: &[u8; 5]) -> Result<ClimateReading, SensorError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(SensorError::ChecksumMismatch);
    }

    let humidity = u16::from_be_bytes([frame[0], frame[1]]) as f32 / 10.0;
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]) as f32 / 10.0;
    let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };

    Ok(ClimateReading {
        temperature_c: temperature,
        humidity_pct: humidity,
    })
}

/// Free-running microsecond counter used to time line phases.
pub trait MicrosClock {
    fn now_us(&mut self) -> u64;
}

/// Bit-banged DHT22 reader.
///
/// Phase lengths are measured against `timer`'s clock, so the cost of a
/// GPIO read does not skew the bit decision.
pub struct Dht22<P, T> {
    pin: P,
    timer: T,
}

impl<P, T> Dht22<P, T>
where
    P: InputPin + OutputPin,
    T: DelayNs + MicrosClock,
{
    /// `pin` must already be configured open-drain; it is left released (high).
    pub fn new(pin: P, timer: T) -> Self {
        Self { pin, timer }
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        self.pin.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.timer.delay_us(START_LOW_US);
        self.pin.set_high().map_err(|_| SensorError::GpioFailed)?;

        // Pull-up phase, then the sensor's 80 µs low / 80 µs high response.
        self.wait_while(true)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_while(false)?;
            let high_us = self.wait_while(true)?;
            if high_us > BIT_THRESHOLD_US {
                frame[bit / 8] |= 1 << (7 - bit % 8);
            }
        }
        Ok(frame)
    }

    /// Wait while the line stays at `high`; returns the elapsed microseconds.
    fn wait_while(&mut self, high: bool) -> Result<u32, SensorError> {
        let start = self.timer.now_us();
        loop {
            let level = self.pin.is_high().map_err(|_| SensorError::GpioFailed)?;
            let elapsed = self.timer.now_us().saturating_sub(start);
            if level != high {
                return Ok(u32::try_from(elapsed).unwrap_or(u32::MAX));
            }
            if elapsed > u64::from(PHASE_TIMEOUT_US) {
                return Err(SensorError::Timeout);
            }
        }
    }
}

impl<P, T> ClimateRead for Dht22<P, T>
where
    P: InputPin + OutputPin,
    T: DelayNs + MicrosClock,
{
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let frame = self.read_frame()?;
        decode_frame(&frame)
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_BITS: AtomicU32 = AtomicU32::new(25.0f32.to_bits());
#[cfg(not(target_os = "espidf"))]
static SIM_HUMIDITY_BITS: AtomicU32 = AtomicU32::new(40.0f32.to_bits());
#[cfg(not(target_os = "espidf"))]
static SIM_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate(temperature_c: f32, humidity_pct: f32) {
    SIM_TEMP_BITS.store(temperature_c.to_bits(), Ordering::Relaxed);
    SIM_HUMIDITY_BITS.store(humidity_pct.to_bits(), Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_climate_failure(fail: bool) {
    SIM_FAIL.store(fail, Ordering::Relaxed);
}

/// Host stand-in for the DHT22, fed through the `sim_*` setters.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimClimate;

#[cfg(not(target_os = "espidf"))]
impl ClimateRead for SimClimate {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        if SIM_FAIL.load(Ordering::Relaxed) {
            return Err(SensorError::Timeout);
        }
        Ok(ClimateReading {
            temperature_c: f32::from_bits(SIM_TEMP_BITS.load(Ordering::Relaxed)),
            humidity_pct: f32::from_bits(SIM_HUMIDITY_BITS.load(Ordering::Relaxed)),
        })
    }
}
