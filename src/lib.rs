//! LampNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation adapters instead.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod error;
pub mod pins;

pub mod adapters;
pub mod drivers;
pub mod sensors;
