//! Voltage sensor (potentiometer on ADC1, stands in for a scaled mains tap).
//!
//! On ESP-IDF: reads ADC1_CH7.  On host/test: reads a static AtomicU16.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::pins::ADC_MAX_RAW;

#[cfg(not(target_os = "espidf"))]
static SIM_VOLTAGE_ADC: AtomicU16 = AtomicU16::new(2048);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_voltage_adc(raw: u16) {
    SIM_VOLTAGE_ADC.store(raw, Ordering::Relaxed);
}

pub struct VoltageSensor {
    _adc_gpio: i32,
}

impl VoltageSensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self { _adc_gpio: adc_gpio }
    }

    pub fn read_raw(&self) -> u16 {
        self.read_adc().min(ADC_MAX_RAW)
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_VOLTAGE)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_VOLTAGE_ADC.load(Ordering::Relaxed)
    }
}
