//! Log-backed status screen.
//!
//! Implements [`DisplayPort`] without a panel driver: every frame is kept
//! in memory and, on `clear()`, the previous frame is logged at debug
//! level.  Swap in a real ILI9341 adapter behind the same trait.

use log::debug;

use crate::app::ports::{Color, DisplayPort};
use crate::display::{LINE_CAP, MAX_LINES};

/// One drawn line: position, size, colour, text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnText {
    pub x: u16,
    pub y: u16,
    pub size: u8,
    pub color: Color,
    pub text: heapless::String<LINE_CAP>,
}

#[derive(Debug, Default)]
pub struct LogDisplay {
    frame: heapless::Vec<DrawnText, MAX_LINES>,
    clears: u32,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines drawn since the last `clear()`.
    pub fn frame(&self) -> &[DrawnText] {
        &self.frame
    }

    pub fn clears(&self) -> u32 {
        self.clears
    }
}

impl DisplayPort for LogDisplay {
    fn clear(&mut self) {
        for l in &self.frame {
            debug!("TFT   | ({:>3},{:>3}) {:?} {}", l.x, l.y, l.color, l.text);
        }
        self.frame.clear();
        self.clears = self.clears.wrapping_add(1);
    }

    fn draw_text(&mut self, x: u16, y: u16, size: u8, color: Color, text: &str) {
        let mut s = heapless::String::new();
        for c in text.chars() {
            if s.push(c).is_err() {
                break;
            }
        }
        // Frames never exceed MAX_LINES; extra draws are dropped.
        let _ = self.frame.push(DrawnText {
            x,
            y,
            size,
            color,
            text: s,
        });
    }
}
