// THEORY:
// The `pipeline` module is the frame-level driver around the decoding core. The
// core only knows how to decode one region; a deployment has a camera, an object
// detector that finds the LED matrix in each frame, and somewhere to send the
// results. Those three collaborators are modelled as traits so the loop can be
// wired to real back-ends (video files, an inference runtime, an overlay
// renderer) or to fakes in tests without the loop knowing the difference.
//
// Per frame:
// 1.  The detector proposes boxes.
// 2.  A caller-supplied predicate decides which boxes are LED matrices worth
//     decoding (typically a class-id and confidence check).
// 3.  Each qualifying box is clamped to the frame and cropped as a zero-copy
//     `Region`, then handed to the `LedMatrixDecoder`.
// 4.  The sink receives one `FrameReport` with every decode plus the session
//     snapshots at that point.
//
// Two meters run side by side. The decoder's session counts decoded regions. The
// pipeline's link meter counts video frames: a frame is good when at least one of
// its boxes decoded, so a frame in which the detector lost the matrix counts as a
// failure. The link meter is the one that reflects what the receiver actually got.
//
// Frames are processed strictly in arrival order, which is what keeps the
// decoder's persisted grid and statistics meaningful.

use crate::config::DecoderConfig;
use crate::core_modules::frame_decoder::FrameRecord;
use crate::core_modules::region::{ChannelLayout, PixelRect, Region};
use crate::core_modules::session::{SessionAccumulator, SessionSnapshot};
use crate::decoder::LedMatrixDecoder;
use crate::error::{Error, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Configuration for the frame pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub decoder: DecoderConfig,
    /// Skip boxes whose left edge truncates to column 0. Such boxes are usually
    /// clipped by the frame border and only show part of the matrix.
    pub skip_left_edge_boxes: bool,
    /// Frames buffered between acquisition and decoding in the pipelined runner.
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            skip_left_edge_boxes: true,
            channel_capacity: 4,
        }
    }
}

/// One captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub layout: ChannelLayout,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(index: u64, width: u32, height: u32, layout: ChannelLayout, data: Vec<u8>) -> Result<Self> {
        let needed = width as usize * height as usize * layout.channels();
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            index,
            width,
            height,
            layout,
            data,
        })
    }

    pub fn from_rgb(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            width: image.width(),
            height: image.height(),
            layout: ChannelLayout::Rgb,
            data: image.into_raw(),
        }
    }

    /// The whole frame as a region.
    pub fn region(&self) -> Result<Region<'_>> {
        Region::new(&self.data, self.width, self.height, self.layout)
    }
}

/// Axis-aligned box in frame pixel coordinates, corners `(x0, y0)` and `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Truncates the corners to whole pixels and clamps them to the frame.
    /// `None` when nothing of the box is left.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        let clamp = |v: f32, max: u32| -> u32 {
            if v.is_nan() || v <= 0.0 {
                0
            } else {
                (v as u32).min(max)
            }
        };
        let x0 = clamp(self.x0, frame_width);
        let y0 = clamp(self.y0, frame_height);
        let x1 = clamp(self.x1, frame_width);
        let y1 = clamp(self.y1, frame_height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// One box proposed by the object detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_id: u32,
}

/// Produces frames in arrival order. `None` ends the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<I: Iterator<Item = Frame>> FrameSource for I {
    fn next_frame(&mut self) -> Option<Frame> {
        self.next()
    }
}

/// Finds candidate LED matrices in a frame.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection>;
}

impl<F: FnMut(&Frame) -> Vec<Detection>> Detector for F {
    fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        self(frame)
    }
}

/// Receives the decoding results of every frame.
pub trait ResultSink {
    fn publish(&mut self, report: &FrameReport);
}

impl ResultSink for Vec<FrameReport> {
    fn publish(&mut self, report: &FrameReport) {
        self.push(report.clone());
    }
}

/// A decoded box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxDecode {
    pub detection: Detection,
    pub record: FrameRecord,
}

/// Everything the pipeline learned from one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub decodes: Vec<BoxDecode>,
    /// Decoded regions so far.
    pub session: SessionSnapshot,
    /// Video frames so far, valid when at least one box decoded.
    pub link: SessionSnapshot,
}

impl FrameReport {
    /// Telemetry of the first valid decode in this frame, if any.
    pub fn first_valid(&self) -> Option<&BoxDecode> {
        self.decodes.iter().find(|d| d.record.valid)
    }
}

/// Synchronous frame loop around one `LedMatrixDecoder`.
pub struct OccPipeline {
    decoder: LedMatrixDecoder,
    config: PipelineConfig,
    link: SessionAccumulator,
}

impl OccPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.channel_capacity == 0 {
            return Err(Error::InvalidConfig(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            decoder: LedMatrixDecoder::new(config.decoder.clone())?,
            config,
            link: SessionAccumulator::new(),
        })
    }

    /// Decodes every qualifying detection of one frame.
    pub fn process_frame<P>(&mut self, frame: &Frame, detections: &[Detection], qualifies: &mut P) -> Result<FrameReport>
    where
        P: FnMut(&Detection) -> bool,
    {
        let _span = tracing::debug_span!("frame", index = frame.index).entered();
        let started = Instant::now();
        let full = frame.region()?;
        let mut decodes = Vec::new();

        for detection in detections {
            if !qualifies(detection) {
                continue;
            }
            let Some(rect) = detection.bbox.to_pixel_rect(frame.width, frame.height) else {
                debug!(bbox = ?detection.bbox, "box has no area inside the frame, skipped");
                continue;
            };
            if self.config.skip_left_edge_boxes && rect.x == 0 {
                debug!(bbox = ?detection.bbox, "box touches the left frame edge, skipped");
                continue;
            }
            let record = self.decoder.decode(&full.crop(rect));
            decodes.push(BoxDecode {
                detection: *detection,
                record,
            });
        }

        let frame_valid = decodes.iter().any(|d| d.record.valid);
        if decodes.is_empty() {
            debug!("no qualifying box, frame counted as lost");
        }
        self.link.record(frame_valid, started.elapsed());

        Ok(FrameReport {
            frame_index: frame.index,
            decodes,
            session: self.decoder.snapshot(),
            link: self.link.snapshot(),
        })
    }

    /// Drains `source`, publishing one report per frame. Returns the final link snapshot.
    pub fn run<S, D, P, K>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        mut qualifies: P,
        sink: &mut K,
    ) -> Result<SessionSnapshot>
    where
        S: FrameSource + ?Sized,
        D: Detector + ?Sized,
        P: FnMut(&Detection) -> bool,
        K: ResultSink + ?Sized,
    {
        while let Some(frame) = source.next_frame() {
            let detections = detector.detect(&frame);
            let report = self.process_frame(&frame, &detections, &mut qualifies)?;
            sink.publish(&report);
        }
        Ok(self.link.snapshot())
    }

    /// Video frames seen so far, including frames without a qualifying box.
    pub fn frames_seen(&self) -> u64 {
        self.link.total()
    }

    /// Frame-level counters: one entry per video frame.
    pub fn link_snapshot(&self) -> SessionSnapshot {
        self.link.snapshot()
    }

    pub fn decoder(&self) -> &LedMatrixDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut LedMatrixDecoder {
        &mut self.decoder
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_is_truncated_and_clamped() {
        let bbox = BoundingBox {
            x0: 10.7,
            y0: -3.0,
            x1: 250.2,
            y1: 40.9,
        };
        let rect = bbox.to_pixel_rect(200, 100).expect("overlaps the frame");
        assert_eq!(
            rect,
            PixelRect {
                x: 10,
                y: 0,
                width: 190,
                height: 40
            }
        );
    }

    #[test]
    fn box_outside_the_frame_has_no_rect() {
        let bbox = BoundingBox {
            x0: 300.0,
            y0: 10.0,
            x1: 320.0,
            y1: 30.0,
        };
        assert_eq!(bbox.to_pixel_rect(200, 100), None);
    }

    #[test]
    fn short_frame_buffer_is_rejected() {
        let err = Frame::new(0, 10, 10, ChannelLayout::Bgr, vec![0; 299]).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { needed: 300, .. }));
    }

    #[test]
    fn rejected_and_left_edge_boxes_are_not_decoded() {
        let mut pipeline = OccPipeline::new(PipelineConfig::default()).unwrap();
        let frame = Frame::from_rgb(0, RgbImage::new(64, 64));
        let detection = |x0: f32, class_id| Detection {
            bbox: BoundingBox {
                x0,
                y0: 5.0,
                x1: x0 + 30.0,
                y1: 35.0,
            },
            confidence: 0.9,
            class_id,
        };
        let detections = [detection(0.4, 0), detection(10.0, 1), detection(10.0, 0)];
        let report = pipeline
            .process_frame(&frame, &detections, &mut |d: &Detection| d.class_id == 0)
            .unwrap();
        assert_eq!(report.decodes.len(), 1);
        assert_eq!(report.decodes[0].detection.bbox.x0, 10.0);
        assert_eq!(pipeline.frames_seen(), 1);
        assert_eq!(report.session.total, 1);
        assert_eq!(report.link.total, 1);
    }

    #[test]
    fn frame_without_detections_counts_as_lost() {
        let mut pipeline = OccPipeline::new(PipelineConfig::default()).unwrap();
        let frame = Frame::from_rgb(0, RgbImage::new(64, 64));
        let report = pipeline
            .process_frame(&frame, &[], &mut |_: &Detection| true)
            .unwrap();
        assert!(report.decodes.is_empty());
        assert_eq!(report.session.total, 0);
        assert_eq!((report.link.total, report.link.valid), (1, 0));
        assert_eq!(report.link.bit_error_rate, 1.0);
        assert_eq!(pipeline.link_snapshot(), report.link);
    }
}
