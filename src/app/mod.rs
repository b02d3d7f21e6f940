//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the behaviour of the lamp node: the telemetry
//! cycle, inbound command handling and the output controller.  All
//! interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod output;
pub mod ports;
pub mod service;
