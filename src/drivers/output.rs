//! Lamp output driver (single push-pull GPIO).
//!
//! Generic over an embedded-hal `OutputPin`: `PinDriver<Output>` on the
//! device, any recording double on the host.  Holds the last level that
//! was actually written so a failed write is observable.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::error::ActuatorError;

pub struct DigitalOutput<P: OutputPin> {
    pin: P,
    level: Option<bool>,
    failures: u32,
}

impl<P: OutputPin> DigitalOutput<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            level: None,
            failures: 0,
        }
    }

    pub fn write(&mut self, high: bool) -> Result<(), ActuatorError> {
        let result = if high { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => {
                self.level = Some(high);
                Ok(())
            }
            Err(_) => {
                self.failures = self.failures.wrapping_add(1);
                warn!("Output pin write failed (high={})", high);
                Err(ActuatorError::GpioWriteFailed)
            }
        }
    }

    /// Last level successfully written; `None` before the first write.
    pub fn level(&self) -> Option<bool> {
        self.level
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
