//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`], the network link underneath the broker
//! session.  `begin()` only issues the join request; the connectivity
//! supervisor polls [`is_up`](LinkPort::is_up) until association and DHCP
//! complete.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in STA mode.
//! - **all other targets**: a scripted link that comes up after a fixed
//!   number of status polls, for host-side tests.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::LinkPort;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

#[cfg(not(target_os = "espidf"))]
use core::cell::Cell;

// ───────────────────────────────────────────────────────────────
// WiFi adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: EspWifi<'static>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    configured: bool,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    /// Credentials must already have passed `config::validate_ssid` /
    /// `validate_password`; over-long values are rejected here too.
    pub fn new(wifi: EspWifi<'static>, ssid: &str, password: &str) -> Result<Self, CommsError> {
        Ok(Self {
            wifi,
            ssid: ssid.try_into().map_err(|_| CommsError::WifiConfigFailed)?,
            password: password.try_into().map_err(|_| CommsError::WifiConfigFailed)?,
            configured: false,
        })
    }

    fn configure(&mut self) -> Result<(), CommsError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.clone(),
            password: self.password.clone(),
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&cfg).map_err(|e| {
            warn!("WiFi: set_configuration failed: {e}");
            CommsError::WifiConfigFailed
        })?;
        self.wifi.start().map_err(|e| {
            warn!("WiFi: start failed: {e}");
            CommsError::WifiConfigFailed
        })?;
        self.configured = true;
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl LinkPort for WifiAdapter {
    fn begin(&mut self) -> Result<(), CommsError> {
        if !self.configured {
            self.configure()?;
        }
        info!("WiFi: joining '{}'", self.ssid);
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed: {e}");
            CommsError::WifiConnectFailed
        })
    }

    fn is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn ip_address(&self) -> Option<[u8; 4]> {
        self.wifi
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip.octets())
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter (host simulation)
// ───────────────────────────────────────────────────────────────

/// Simulated station: after `begin()`, `is_up()` turns true on the
/// `up_after_polls`-th status poll.
#[cfg(not(target_os = "espidf"))]
pub struct WifiAdapter {
    ssid: heapless::String<32>,
    up_after_polls: u32,
    begun: bool,
    polls: Cell<u32>,
    begins: u32,
    fail_begins: u32,
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new(ssid: &str, up_after_polls: u32) -> Self {
        let mut s = heapless::String::new();
        for c in ssid.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        Self {
            ssid: s,
            up_after_polls,
            begun: false,
            polls: Cell::new(0),
            begins: 0,
            fail_begins: 0,
        }
    }

    /// Make the next `n` `begin()` calls fail.
    pub fn sim_fail_begins(&mut self, n: u32) {
        self.fail_begins = n;
    }

    /// Drop the link; it comes back `up_after_polls` polls after the
    /// next `begin()`.
    pub fn sim_drop(&mut self) {
        info!("WiFi(sim): link dropped");
        self.begun = false;
        self.polls.set(0);
    }

    pub fn begins(&self) -> u32 {
        self.begins
    }
}

#[cfg(not(target_os = "espidf"))]
impl LinkPort for WifiAdapter {
    fn begin(&mut self) -> Result<(), CommsError> {
        self.begins += 1;
        if self.fail_begins > 0 {
            self.fail_begins -= 1;
            return Err(CommsError::WifiConnectFailed);
        }
        info!("WiFi(sim): joining '{}'", self.ssid);
        self.begun = true;
        self.polls.set(0);
        Ok(())
    }

    fn is_up(&self) -> bool {
        if !self.begun {
            return false;
        }
        let polls = self.polls.get().saturating_add(1);
        self.polls.set(polls);
        polls > self.up_after_polls
    }

    fn ip_address(&self) -> Option<[u8; 4]> {
        (self.begun && self.polls.get() > self.up_after_polls).then_some([10, 0, 0, 42])
    }
}
