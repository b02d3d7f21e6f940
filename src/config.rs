//! Device configuration
//!
//! The static configuration record of the lamp node.  Everything is fixed
//! at build time: defaults are compiled in and the network fields may be
//! overridden through `LAMPNODE_*` environment variables seen by the
//! compiler.  There is no runtime reconfiguration.

use core::fmt::Write as _;

use heapless::String as HString;
use serde::{Deserialize, Serialize};

use crate::app::commands::MAX_DEVICE_ID_LEN;
use crate::error::Error;
use crate::pins;

/// Capacity of every derived channel name.
pub const CHANNEL_CAP: usize = 64;

/// A broker channel (topic) name.
pub type ChannelName = HString<CHANNEL_CAP>;

/// Core device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    // --- Network ---
    /// Wi-Fi network name
    pub wifi_ssid: String,
    /// Wi-Fi passphrase (empty = open network)
    pub wifi_password: String,

    // --- Broker ---
    pub broker_host: String,
    pub broker_port: u16,
    /// MQTT client identifier presented at session establishment
    pub client_id: String,

    // --- Identity / channels ---
    /// Device identifier; prefixes the command payloads (`<id>@on|`)
    pub device_id: String,
    /// Root of every channel name
    pub topic_prefix: String,
    /// Companion device publishing temperature and humidity
    pub climate_device_id: String,
    /// Companion device publishing voltage
    pub voltage_device_id: String,

    // --- Pins ---
    pub output_gpio: i32,
    pub light_adc_gpio: i32,
    pub voltage_adc_gpio: i32,
    pub dht_gpio: i32,

    // --- Timing ---
    /// Pacing delay after the status publish; the cycle's rate limiter
    pub cycle_pacing_ms: u32,
    /// Sleep between broker session attempts
    pub session_retry_ms: u32,
    /// Sleep between network link status polls
    pub link_poll_ms: u32,
    /// Upper bound on waiting for the broker to acknowledge one session attempt
    pub session_wait_ms: u32,
    /// Settle time after peripheral bring-up, before the first cycle
    pub boot_settle_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // Network
            wifi_ssid: option_env!("LAMPNODE_WIFI_SSID").unwrap_or("Wokwi-GUEST").into(),
            wifi_password: option_env!("LAMPNODE_WIFI_PASSWORD").unwrap_or("").into(),

            // Broker
            broker_host: option_env!("LAMPNODE_BROKER_HOST").unwrap_or("127.0.0.1").into(),
            broker_port: parse_port(option_env!("LAMPNODE_BROKER_PORT")),
            client_id: "fiware_003".into(),

            // Identity / channels
            device_id: "lamp003".into(),
            topic_prefix: "/TEF".into(),
            climate_device_id: "DHT001".into(),
            voltage_device_id: "POT001".into(),

            // Pins
            output_gpio: pins::OUTPUT_GPIO,
            light_adc_gpio: pins::LIGHT_ADC_GPIO,
            voltage_adc_gpio: pins::VOLTAGE_ADC_GPIO,
            dht_gpio: pins::DHT_GPIO,

            // Timing
            cycle_pacing_ms: 1000,  // ~1 cycle/s
            session_retry_ms: 2000,
            link_poll_ms: 100,
            session_wait_ms: 5000,
            boot_settle_ms: 5000,
        }
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    raw.and_then(|p| p.parse().ok()).unwrap_or(1883)
}

/// Every channel the node publishes to or subscribes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels {
    /// `s|on` / `s|off`
    pub status: ChannelName,
    pub luminosity: ChannelName,
    pub temperature: ChannelName,
    pub humidity: ChannelName,
    pub voltage: ChannelName,
    /// Inbound on/off commands
    pub command: ChannelName,
}

impl DeviceConfig {
    /// Derive all channel names from the prefix and device ids.
    ///
    /// Names that would overflow [`CHANNEL_CAP`] are truncated;
    /// [`validate`](Self::validate) rejects such configurations up front.
    pub fn channels(&self) -> Channels {
        let p = self.topic_prefix.as_str();
        Channels {
            status: channel(format_args!("{p}/{}/attrs", self.device_id)),
            luminosity: channel(format_args!("{p}/{}/attrs/l", self.device_id)),
            temperature: channel(format_args!("{p}/{}/attrs/t", self.climate_device_id)),
            humidity: channel(format_args!("{p}/{}/attrs/h", self.climate_device_id)),
            voltage: channel(format_args!("{p}/{}/attrs/v", self.voltage_device_id)),
            command: channel(format_args!("{p}/{}/cmd", self.device_id)),
        }
    }

    /// `mqtt://host:port` broker URL.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }

    /// Reject configurations the device cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        validate_ssid(&self.wifi_ssid)?;
        validate_password(&self.wifi_password)?;

        if self.broker_host.is_empty() {
            return Err(Error::Config("broker_host empty"));
        }
        if self.broker_port == 0 {
            return Err(Error::Config("broker_port must be non-zero"));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id empty"));
        }
        if self.device_id.is_empty()
            || self.climate_device_id.is_empty()
            || self.voltage_device_id.is_empty()
        {
            return Err(Error::Config("device ids must be non-empty"));
        }
        if self.device_id.len() > MAX_DEVICE_ID_LEN {
            return Err(Error::Config("device_id too long for command patterns"));
        }
        // Longest derived name: "<prefix>/<id>/attrs/x".
        let longest_id = self
            .device_id
            .len()
            .max(self.climate_device_id.len())
            .max(self.voltage_device_id.len());
        if self.topic_prefix.len() + longest_id + "//attrs/x".len() > CHANNEL_CAP {
            return Err(Error::Config("channel name too long"));
        }
        if self.cycle_pacing_ms == 0 || self.session_retry_ms == 0 || self.link_poll_ms == 0 {
            return Err(Error::Config("timing intervals must be non-zero"));
        }
        Ok(())
    }
}

fn channel(args: core::fmt::Arguments<'_>) -> ChannelName {
    let mut name = ChannelName::new();
    let _ = name.write_fmt(args);
    name
}

// ───────────────────────────────────────────────────────────────
// Credential validation (WPA2 rules)
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// SSID must be 1–32 printable ASCII bytes.
pub fn validate_ssid(ssid: &str) -> Result<(), Error> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(Error::Config("SSID invalid (must be 1-32 printable ASCII bytes)"));
    }
    Ok(())
}

/// Password must be empty (open network) or 8–64 bytes.
pub fn validate_password(password: &str) -> Result<(), Error> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(Error::Config("password invalid (must be 8-64 bytes, or empty for open)"));
    }
    Ok(())
}
