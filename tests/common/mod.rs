//! Synthetic scenes for integration tests: an 8x8 LED matrix painted into a frame.
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use occ_decoder::Telemetry;

pub const SYNC: u8 = 0b1011_1001;
/// Bottom-left and bottom-right LEDs, lit so the grid spans all eight rows.
pub const CORNER_MARKERS: u32 = 0x0000_0081;

pub struct MatrixScene {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Top-left pixel of LED (0, 0).
    pub origin: (u32, u32),
    pub pitch: u32,
    pub led_size: u32,
    pub background: [u8; 3],
    pub led_color: [u8; 3],
}

impl Default for MatrixScene {
    fn default() -> Self {
        Self {
            frame_width: 320,
            frame_height: 240,
            origin: (120, 60),
            pitch: 12,
            led_size: 5,
            background: [30, 35, 40],
            led_color: [255, 240, 200],
        }
    }
}

impl MatrixScene {
    /// Paints every set bit of `word` (bit 0 most significant) as a lit LED.
    pub fn render(&self, word: u64) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.frame_width, self.frame_height, Rgb(self.background));
        for index in 0..64u32 {
            if (word >> (63 - index)) & 1 == 0 {
                continue;
            }
            let x0 = self.origin.0 + (index % 8) * self.pitch;
            let y0 = self.origin.1 + (index / 8) * self.pitch;
            for y in y0..y0 + self.led_size {
                for x in x0..x0 + self.led_size {
                    img.put_pixel(x, y, Rgb(self.led_color));
                }
            }
        }
        img
    }

    pub fn render_payload(&self, telemetry: Telemetry) -> RgbImage {
        self.render(telemetry.encode(SYNC, CORNER_MARKERS).word())
    }

    /// Detector box around the matrix with `margin` pixels of background.
    pub fn bbox(&self, margin: u32) -> (f32, f32, f32, f32) {
        let span = 7 * self.pitch + self.led_size;
        (
            (self.origin.0 - margin) as f32,
            (self.origin.1 - margin) as f32,
            (self.origin.0 + span + margin) as f32,
            (self.origin.1 + span + margin) as f32,
        )
    }
}
