// THEORY:
// The `blob_detector` is the spatial grouping stage of the decoder. It scans the
// binary LED mask for connected foreground components and keeps the ones whose
// size is plausible for a single LED.
//
// Key architectural principles & algorithm steps:
// 1.  **Seeding**: The mask is scanned in raster order. Every foreground pixel that
//     has not been visited yet seeds a new component, which makes the output
//     order deterministic (top-to-bottom, then left-to-right by first pixel).
// 2.  **Region Growing**: From each seed the component is grown with an iterative
//     flood fill over the 8 neighbors, marking pixels in a `visited` plane so
//     no pixel is claimed twice.
// 3.  **Data Aggregation**: While growing, the component's bounding box and pixel
//     count are accumulated and packaged into a `LedBlob`.
// 4.  **Size Filtering**: Only blobs whose bounding-box width and height both lie
//     strictly inside (`min_size`, `max_size`) survive. Tiny components are sensor
//     speckle; huge ones are merged LEDs, reflections or the housing.
// 5.  **Stateless Utility**: `find_blobs` has no memory of previous frames. An
//     empty result is legal and is handled one stage later by the grid estimator.

use crate::core_modules::led_blob::LedBlob;
use crate::core_modules::threshold::FOREGROUND;
use image::GrayImage;

pub mod blob_detector {
    use super::*;

    /// Finds every 8-connected foreground component of `mask`, unfiltered.
    pub fn find_components(mask: &GrayImage) -> Vec<LedBlob> {
        let (width, height) = mask.dimensions();
        let w = width as usize;
        let mut visited = vec![false; w * height as usize];
        let mut blobs = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = y as usize * w + x as usize;
                if visited[index] || mask.get_pixel(x, y)[0] != FOREGROUND {
                    continue;
                }
                visited[index] = true;
                blobs.push(grow_component(mask, &mut visited, x, y));
            }
        }

        blobs
    }

    /// Finds components and keeps those that look like a single LED.
    pub fn find_blobs(mask: &GrayImage, min_size: u32, max_size: u32) -> Vec<LedBlob> {
        find_components(mask)
            .into_iter()
            .filter(|blob| blob.fits(min_size, max_size))
            .collect()
    }

    /// Flood fill from a seed that is already marked visited.
    fn grow_component(mask: &GrayImage, visited: &mut [bool], seed_x: u32, seed_y: u32) -> LedBlob {
        let (width, height) = mask.dimensions();
        let mut stack = vec![(seed_x, seed_y)];
        let mut min_x = seed_x;
        let mut min_y = seed_y;
        let mut max_x = seed_x;
        let mut max_y = seed_y;
        let mut pixel_count = 0usize;

        while let Some((cx, cy)) = stack.pop() {
            pixel_count += 1;
            min_x = min_x.min(cx);
            min_y = min_y.min(cy);
            max_x = max_x.max(cx);
            max_y = max_y.max(cy);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = cx as i64 + dx;
                    let ny = cy as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    let index = ny as usize * width as usize + nx as usize;
                    if !visited[index] && mask.get_pixel(nx as u32, ny as u32)[0] == FOREGROUND {
                        visited[index] = true;
                        stack.push((nx as u32, ny as u32));
                    }
                }
            }
        }

        LedBlob {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            pixel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::blob_detector::*;
    use crate::core_modules::threshold::FOREGROUND;
    use image::{GrayImage, Luma};

    fn fill(mask: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                mask.put_pixel(xx, yy, Luma([FOREGROUND]));
            }
        }
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        let mask = GrayImage::new(50, 50);
        assert!(find_blobs(&mask, 2, 20).is_empty());
    }

    #[test]
    fn single_five_by_five_blob_is_centered() {
        let mut mask = GrayImage::new(40, 40);
        fill(&mut mask, 10, 20, 5, 5);
        let blobs = find_blobs(&mask, 2, 20);
        assert_eq!(blobs.len(), 1);
        let center = blobs[0].center();
        // Geometric center of pixels 10..=14 is 12.0, the box center is 12.5.
        assert!((center.x - 12.0).abs() <= 0.5);
        assert!((center.y - 22.0).abs() <= 0.5);
        assert_eq!(blobs[0].pixel_count, 25);
    }

    #[test]
    fn diagonal_pixels_join_one_component() {
        let mut mask = GrayImage::new(10, 10);
        for i in 2..7 {
            mask.put_pixel(i, i, Luma([FOREGROUND]));
        }
        let components = find_components(&mask);
        assert_eq!(components.len(), 1);
        assert_eq!((components[0].width, components[0].height), (5, 5));
    }

    #[test]
    fn speckle_and_merged_blobs_are_rejected() {
        let mut mask = GrayImage::new(80, 80);
        fill(&mut mask, 1, 1, 2, 2); // speckle
        fill(&mut mask, 10, 10, 25, 6); // merged row of LEDs
        fill(&mut mask, 50, 50, 4, 4); // a real LED
        let blobs = find_blobs(&mask, 2, 20);
        assert_eq!(blobs.len(), 1);
        assert_eq!((blobs[0].x, blobs[0].y), (50, 50));
    }

    #[test]
    fn output_is_in_raster_order() {
        let mut mask = GrayImage::new(60, 60);
        fill(&mut mask, 40, 5, 4, 4);
        fill(&mut mask, 5, 5, 4, 4);
        fill(&mut mask, 20, 30, 4, 4);
        let origins: Vec<(u32, u32)> = find_blobs(&mask, 2, 20)
            .iter()
            .map(|b| (b.x, b.y))
            .collect();
        assert_eq!(origins, vec![(5, 5), (40, 5), (20, 30)]);
    }
}
