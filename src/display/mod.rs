//! Status screen: snapshot, alert thresholds and the fixed text layout.
//!
//! ```text
//!  y=25   Temperature: 25.00 C       white, size 2
//!  y=75   Humidity: 40.00 %
//!  y=125  Luminosity: 50 lx
//!  y=175  Voltage: 150 V
//!  y=200  ALERT: Low light!          red, only when tripped
//!  y=225  ALERT: Voltage drop!
//!  y=250  ALERT: High temperature!
//!  y=275  ALERT: High humidity!
//! ```
//!
//! Every render is a full redraw.  Alert lines keep their slot whether or
//! not the lines above them are drawn.

use core::fmt::Write as _;

use heapless::{String as HString, Vec as HVec};

use crate::app::ports::{Color, DisplayPort};
use crate::sensors::Decimal;

/// Low-light alert below this luminosity (%).
pub const LOW_LIGHT_PCT: u8 = 35;
/// Low-voltage alert below this scaled voltage.
pub const LOW_VOLTAGE: u16 = 100;
/// High-temperature alert above this (°C).
pub const HIGH_TEMPERATURE_C: f32 = 60.0;
/// High-humidity alert above this (%).
pub const HIGH_HUMIDITY_PCT: f32 = 70.0;

const LEFT_X: u16 = 10;
const TEXT_SIZE: u8 = 2;
const VALUE_ROWS: [u16; 4] = [25, 75, 125, 175];
const ALERT_ROWS: [u16; 4] = [200, 225, 250, 275];

pub const LINE_CAP: usize = 40;
/// Four value lines plus up to four alerts.
pub const MAX_LINES: usize = 8;

/// The latest readings as shown on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySnapshot {
    pub luminosity_pct: u8,
    pub voltage: u16,
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl DisplaySnapshot {
    pub fn alerts(&self) -> AlertFlags {
        AlertFlags::evaluate(self)
    }
}

/// Independent threshold alerts.  Derived on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertFlags {
    pub low_light: bool,
    pub low_voltage: bool,
    pub high_temperature: bool,
    pub high_humidity: bool,
}

impl AlertFlags {
    /// Strict comparisons; a NaN climate field never trips an alert.
    pub fn evaluate(s: &DisplaySnapshot) -> Self {
        Self {
            low_light: s.luminosity_pct < LOW_LIGHT_PCT,
            low_voltage: s.voltage < LOW_VOLTAGE,
            high_temperature: s.temperature_c > HIGH_TEMPERATURE_C,
            high_humidity: s.humidity_pct > HIGH_HUMIDITY_PCT,
        }
    }

    pub fn any(&self) -> bool {
        self.low_light || self.low_voltage || self.high_temperature || self.high_humidity
    }

    pub fn count(&self) -> usize {
        [self.low_light, self.low_voltage, self.high_temperature, self.high_humidity]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub x: u16,
    pub y: u16,
    pub size: u8,
    pub color: Color,
    pub text: HString<LINE_CAP>,
}

fn line(y: u16, color: Color, args: core::fmt::Arguments<'_>) -> TextLine {
    let mut text = HString::new();
    // Longest line is well under LINE_CAP; overflow would only truncate.
    let _ = text.write_fmt(args);
    TextLine {
        x: LEFT_X,
        y,
        size: TEXT_SIZE,
        color,
        text,
    }
}

/// Lay out one frame, top to bottom.
pub fn compose(s: &DisplaySnapshot) -> HVec<TextLine, MAX_LINES> {
    let mut lines = HVec::new();
    let alerts = s.alerts();

    let values = [
        line(VALUE_ROWS[0], Color::White, format_args!("Temperature: {} C", Decimal(s.temperature_c, 2))),
        line(VALUE_ROWS[1], Color::White, format_args!("Humidity: {} %", Decimal(s.humidity_pct, 2))),
        line(VALUE_ROWS[2], Color::White, format_args!("Luminosity: {} lx", s.luminosity_pct)),
        line(VALUE_ROWS[3], Color::White, format_args!("Voltage: {} V", s.voltage)),
    ];
    for l in values {
        let _ = lines.push(l);
    }

    let tripped = [
        (alerts.low_light, "ALERT: Low light!"),
        (alerts.low_voltage, "ALERT: Voltage drop!"),
        (alerts.high_temperature, "ALERT: High temperature!"),
        (alerts.high_humidity, "ALERT: High humidity!"),
    ];
    for (row, (on, text)) in ALERT_ROWS.iter().zip(tripped) {
        if on {
            let _ = lines.push(line(*row, Color::Red, format_args!("{text}")));
        }
    }
    lines
}

/// Full-redraw renderer.
#[derive(Debug, Default)]
pub struct DisplayRenderer {
    frames: u32,
}

impl DisplayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear, then draw every line of [`compose`].  Returns the alerts shown.
    pub fn render(&mut self, snapshot: &DisplaySnapshot, display: &mut impl DisplayPort) -> AlertFlags {
        display.clear();
        for l in compose(snapshot) {
            display.draw_text(l.x, l.y, l.size, l.color, &l.text);
        }
        self.frames = self.frames.wrapping_add(1);
        snapshot.alerts()
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }
}
