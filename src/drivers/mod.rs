//! Peripheral bring-up and the lamp output driver.

pub mod hw_init;
pub mod output;
