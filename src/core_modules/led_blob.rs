// THEORY:
// A `LedBlob` is the decoder's notion of "one illuminated LED": a connected bright
// component of the threshold mask, summarized by its bounding box. Like the
// engine's `SmartBlob`, it is a stateless data container. It describes a
// detection in the current frame only and carries no identity across frames.

/// A point in region pixel coordinates, with sub-pixel precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A connected bright component of the LED mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedBlob {
    /// Column of the leftmost pixel.
    pub x: u32,
    /// Row of the topmost pixel.
    pub y: u32,
    /// Bounding-box width in pixels (inclusive extent).
    pub width: u32,
    /// Bounding-box height in pixels (inclusive extent).
    pub height: u32,
    /// Number of foreground pixels in the component.
    pub pixel_count: usize,
}

impl LedBlob {
    /// Center of the bounding box, `(x + w/2, y + h/2)`.
    pub fn center(&self) -> Point {
        Point {
            x: self.x as f64 + self.width as f64 / 2.0,
            y: self.y as f64 + self.height as f64 / 2.0,
        }
    }

    /// True when both sides lie strictly between `min` and `max`.
    pub fn fits(&self, min: u32, max: u32) -> bool {
        min < self.width && self.width < max && min < self.height && self.height < max
    }
}
