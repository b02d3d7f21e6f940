//! Blocking delay and microsecond clock adapter.
//!
//! Implements embedded-hal's [`DelayNs`] for the cycle's pacing tick and
//! the connectivity retry sleeps, and [`MicrosClock`] for timing the
//! DHT22 line phases.
//!
//! - **`target_os = "espidf"`**: millisecond sleeps go through
//!   `FreeRtos::delay_ms` (yields to the IDF tasks, feeds the idle
//!   watchdog); sub-millisecond waits busy-wait on `Ets`.  The clock is
//!   `esp_timer_get_time`.
//! - **`not(target_os = "espidf")`**: `std::thread::sleep` and a
//!   process-wide `Instant`.

use embedded_hal::delay::DelayNs;

use crate::sensors::climate::MicrosClock;

#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::{Ets, FreeRtos};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDelay;

impl SystemDelay {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        Ets::delay_us(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        Ets::delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

#[cfg(not(target_os = "espidf"))]
impl DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(target_os = "espidf")]
impl MicrosClock for SystemDelay {
    fn now_us(&mut self) -> u64 {
        // Microseconds since boot; never negative.
        let t = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        u64::try_from(t).unwrap_or(0)
    }
}

#[cfg(not(target_os = "espidf"))]
impl MicrosClock for SystemDelay {
    fn now_us(&mut self) -> u64 {
        static ORIGIN: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
        let elapsed = ORIGIN.get_or_init(std::time::Instant::now).elapsed();
        u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
    }
}
