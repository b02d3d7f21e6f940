//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                     |
//! |------------|--------------------|---------------------------------|
//! | `wifi`     | LinkPort           | ESP-IDF WiFi STA                |
//! | `mqtt`     | TransportPort      | esp-mqtt client                 |
//! | `hardware` | SensorPort         | ADC1 (light, voltage), DHT22    |
//! |            | ActuatorPort       | Lamp output GPIO                |
//! | `display`  | DisplayPort        | Frame buffer + debug log        |
//! | `log_sink` | EventSink          | Serial log output               |
//! | `time`     | DelayNs            | FreeRTOS delay / std sleep      |

pub mod display;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
