// THEORY:
// The thresholder is the first stage of the decoder. It turns a color region into
// a binary "LED-on" mask in which every lit LED pixel is foreground (255) and
// everything else is background (0).
//
// A global threshold does not work here: the matrix is photographed under
// arbitrary ambient light, the diffuser glows around lit LEDs and the exposure
// drifts from frame to frame. Instead every pixel is compared with the
// Gaussian-weighted mean of its own `window x window` neighborhood, and only
// pixels that stand out by more than `bias` grey levels are kept. An isolated
// LED is much brighter than its surroundings, while a flat bright background is
// not brighter than itself and drops out.
//
// Algorithm:
// 1.  Rec. 601 intensity plane (see `Region::to_luma`).
// 2.  Separable Gaussian blur, kernel size `window`, sigma derived from the window
//     as 0.3 * ((window - 1) / 2 - 1) + 0.8, replicated borders, mean rounded to
//     the nearest grey level.
// 3.  `foreground = intensity - mean > bias`.

use crate::core_modules::region::Region;
use image::{GrayImage, Luma};

/// Foreground value in the mask.
pub const FOREGROUND: u8 = 255;

/// Standard deviation used for a Gaussian window of the given size.
pub fn window_sigma(window: u32) -> f32 {
    0.3 * ((window as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1D Gaussian kernel of odd length `window`.
pub fn gaussian_kernel(window: u32) -> Vec<f32> {
    let sigma = window_sigma(window);
    let radius = (window / 2) as i32;
    let scale = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (scale * (i * i) as f32).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Gaussian-weighted local mean of every pixel, rounded to a grey level.
pub fn local_mean(luma: &GrayImage, window: u32) -> GrayImage {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let kernel = gaussian_kernel(window);
    let radius = (window / 2) as i64;
    let w = width as usize;
    let h = height as usize;

    // Horizontal pass into a float plane, then vertical pass back to bytes.
    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, w as i64 - 1) as u32;
                acc += weight * luma.get_pixel(sx, y as u32)[0] as f32;
            }
            horizontal[y * w + x] = acc;
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0f32;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = (y as i64 + k as i64 - radius).clamp(0, h as i64 - 1) as usize;
            acc += weight * horizontal[sy * w + x as usize];
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// Produces the binary LED mask for a region. An empty region yields an empty mask.
pub fn threshold_region(region: &Region<'_>, window: u32, bias: f32) -> GrayImage {
    if region.is_empty() {
        return GrayImage::new(region.width(), region.height());
    }
    let luma = region.to_luma();
    let mean = local_mean(&luma, window);
    GrayImage::from_fn(luma.width(), luma.height(), |x, y| {
        let delta = luma.get_pixel(x, y)[0] as f32 - mean.get_pixel(x, y)[0] as f32;
        Luma([if delta > bias { FOREGROUND } else { 0 }])
    })
}
