//! Hardware adapter: bridges the sensor bank and the lamp output to the
//! domain port traits.
//!
//! This is the only module the telemetry cycle reaches the peripherals
//! through.  On non-espidf targets the ADC readers fall back to their
//! simulation statics and the climate reader is whatever `C` is plugged in.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::output::DigitalOutput;
use crate::error::ActuatorError;
use crate::sensors::climate::ClimateRead;
use crate::sensors::{ClimateReading, SensorBank};

pub struct HardwareAdapter<C: ClimateRead, P: OutputPin> {
    sensors: SensorBank<C>,
    output: DigitalOutput<P>,
}

impl<C: ClimateRead, P: OutputPin> HardwareAdapter<C, P> {
    pub fn new(sensors: SensorBank<C>, output: DigitalOutput<P>) -> Self {
        Self { sensors, output }
    }

    pub fn sensors(&self) -> &SensorBank<C> {
        &self.sensors
    }

    pub fn output(&self) -> &DigitalOutput<P> {
        &self.output
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<C: ClimateRead, P: OutputPin> SensorPort for HardwareAdapter<C, P> {
    fn read_luminosity_raw(&mut self) -> u16 {
        self.sensors.read_luminosity_raw()
    }

    fn read_voltage_raw(&mut self) -> u16 {
        self.sensors.read_voltage_raw()
    }

    fn read_climate(&mut self) -> ClimateReading {
        self.sensors.read_climate()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<C: ClimateRead, P: OutputPin> ActuatorPort for HardwareAdapter<C, P> {
    fn write_output(&mut self, high: bool) -> Result<(), ActuatorError> {
        self.output.write(high)
    }
}
