// THEORY:
// The `Region` is the input unit of the decoder: the rectangular patch of a video
// frame that the external object detector believes contains the LED matrix. It is
// a "dumb", borrowed view over caller-owned bytes. The decoder reads it once per
// call and never keeps it.
//
// Key architectural principles:
// 1.  **Zero-Copy Cropping**: A region carries its own row stride, so the crop of
//     a detector box is just an offset into the full frame buffer. No pixels are
//     copied until the thresholder produces its intensity plane.
// 2.  **Explicit Channel Layout**: Cameras hand out BGR, image files decode to RGB,
//     test fixtures are often grayscale. The layout is part of the view so the
//     luminance weights are always applied to the right channel.
// 3.  **Rec. 601 Luminance**: Intensity uses the same 0.299/0.587/0.114 weights as
//     the engine's `Pixel::luminance`, which is also what camera pipelines use for
//     their grayscale conversion.

use crate::error::{Error, Result};
use image::{GrayImage, RgbImage, RgbaImage};

/// Byte order of one pixel in a region buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Gray,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::Rgb | ChannelLayout::Bgr => 3,
            ChannelLayout::Rgba | ChannelLayout::Bgra => 4,
        }
    }

    /// Rec. 601 luma of one pixel, rounded to the nearest byte.
    #[inline]
    pub fn luminance(self, px: &[u8]) -> u8 {
        let (r, g, b) = match self {
            ChannelLayout::Gray => return px[0],
            ChannelLayout::Rgb | ChannelLayout::Rgba => (px[0], px[1], px[2]),
            ChannelLayout::Bgr | ChannelLayout::Bgra => (px[2], px[1], px[0]),
        };
        let luma = 0.299_f32 * r as f32 + 0.587_f32 * g as f32 + 0.114_f32 * b as f32;
        luma.round().clamp(0.0, 255.0) as u8
    }
}

/// An axis-aligned pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A read-only view of a rectangular sub-image.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    /// Bytes between the starts of two consecutive rows.
    stride: usize,
    layout: ChannelLayout,
}

impl<'a> Region<'a> {
    /// Wraps a tightly packed buffer.
    pub fn new(data: &'a [u8], width: u32, height: u32, layout: ChannelLayout) -> Result<Self> {
        let stride = width as usize * layout.channels();
        Self::with_stride(data, width, height, stride, layout)
    }

    /// Wraps a buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        layout: ChannelLayout,
    ) -> Result<Self> {
        let row_bytes = width as usize * layout.channels();
        if stride < row_bytes {
            return Err(Error::InvalidConfig(format!(
                "stride {stride} is shorter than a {width}-pixel row"
            )));
        }
        let needed = if width == 0 || height == 0 {
            0
        } else {
            (height as usize - 1) * stride + row_bytes
        };
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            layout,
        })
    }

    /// Narrows this view to `rect`, clamped to the view's bounds.
    pub fn crop(&self, rect: PixelRect) -> Region<'a> {
        let x = rect.x.min(self.width);
        let y = rect.y.min(self.height);
        let width = rect.width.min(self.width - x);
        let height = rect.height.min(self.height - y);
        let offset = if width == 0 || height == 0 {
            0
        } else {
            y as usize * self.stride + x as usize * self.layout.channels()
        };
        let data: &'a [u8] = self.data;
        Region {
            data: &data[offset..],
            width,
            height,
            stride: self.stride,
            layout: self.layout,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The bytes of one pixel.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        let channels = self.layout.channels();
        let start = y as usize * self.stride + x as usize * channels;
        &data[start..start + channels]
    }

    /// Converts the region to a single-channel intensity plane.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.layout.luminance(self.pixel(x, y))])
        })
    }
}

impl<'a> From<&'a GrayImage> for Region<'a> {
    fn from(img: &'a GrayImage) -> Self {
        Region {
            data: img.as_raw(),
            width: img.width(),
            height: img.height(),
            stride: img.width() as usize,
            layout: ChannelLayout::Gray,
        }
    }
}

impl<'a> From<&'a RgbImage> for Region<'a> {
    fn from(img: &'a RgbImage) -> Self {
        Region {
            data: img.as_raw(),
            width: img.width(),
            height: img.height(),
            stride: img.width() as usize * 3,
            layout: ChannelLayout::Rgb,
        }
    }
}

impl<'a> From<&'a RgbaImage> for Region<'a> {
    fn from(img: &'a RgbaImage) -> Self {
        Region {
            data: img.as_raw(),
            width: img.width(),
            height: img.height(),
            stride: img.width() as usize * 4,
            layout: ChannelLayout::Rgba,
        }
    }
}
