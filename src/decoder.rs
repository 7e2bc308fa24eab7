// THEORY:
// The `LedMatrixDecoder` is the top-level API of the decoding core. It encapsulates
// the full stage stack into one call per detected LED-matrix region:
//
//   region -> mask -> blobs -> grid -> bits -> frame record -> session statistics
//
// It owns the only state that outlives a frame: the last good grid (for the
// stale-grid fallback) and the session accumulator. Both are updated exactly once
// per `decode` call, so feeding regions in frame-arrival order is all a caller
// needs for correct statistics. One decoder serves one frame stream; callers with
// several sources create one decoder each, or wrap a shared one in a lock.
//
// `decode` never fails. Every per-frame condition (empty blob set, degenerate
// region, header mismatch, cold start) is folded into the returned record.

use crate::config::{DecoderConfig, GridRetention};
use crate::core_modules::bit_sampler::sample_bits;
use crate::core_modules::blob_detector::blob_detector;
use crate::core_modules::frame_decoder::{FrameRecord, FrameStatus, GridSource, decode_frame};
use crate::core_modules::grid_estimator::{Grid, GridEstimate, estimate_grid};
use crate::core_modules::led_blob::Point;
use crate::core_modules::region::Region;
use crate::core_modules::session::{SessionAccumulator, SessionSnapshot};
use crate::core_modules::threshold::threshold_region;
use crate::error::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct LedMatrixDecoder {
    config: DecoderConfig,
    last_grid: Option<Grid>,
    session: SessionAccumulator,
}

impl LedMatrixDecoder {
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            last_grid: None,
            session: SessionAccumulator::new(),
        })
    }

    /// Decodes one region and accounts for it in the session.
    pub fn decode(&mut self, region: &Region<'_>) -> FrameRecord {
        let started = Instant::now();
        let sequence = self.session.total() + 1;

        // Stage 1: LED mask
        let mask = threshold_region(region, self.config.threshold_window, self.config.threshold_bias);

        // Stage 2: blobs
        let blobs =
            blob_detector::find_blobs(&mask, self.config.min_blob_size, self.config.max_blob_size);
        debug!(
            sequence,
            width = region.width(),
            height = region.height(),
            blobs = blobs.len(),
            "region segmented"
        );

        // Stage 3: grid, with stale fallback
        let estimate = estimate_grid(&blobs, self.last_grid.as_ref());
        let (grid, grid_source) = match estimate {
            GridEstimate::Fresh(grid) => (grid, GridSource::Fresh),
            GridEstimate::Stale(grid) => {
                debug!(sequence, "no blobs survived, reusing previous grid");
                (grid, GridSource::Stale)
            }
            GridEstimate::Unavailable => {
                warn!(sequence, "no blobs and no previous grid, frame skipped");
                let record = FrameRecord {
                    sequence,
                    valid: false,
                    status: FrameStatus::NoGrid,
                    telemetry: None,
                    grid_source: GridSource::None,
                    blob_count: 0,
                    bits: None,
                };
                self.finish(&record, started);
                return record;
            }
        };

        // Stage 4: bits
        let centers: Vec<Point> = blobs.iter().map(|b| b.center()).collect();
        let bits = sample_bits(&grid, &centers);

        // Stage 5: header and payload
        let (status, telemetry) = decode_frame(&bits, self.config.sync_pattern);
        let valid = status == FrameStatus::Decoded;

        if grid_source == GridSource::Fresh
            && (valid || self.config.grid_retention == GridRetention::Derived)
        {
            self.last_grid = Some(grid);
        }

        let record = FrameRecord {
            sequence,
            valid,
            status,
            telemetry,
            grid_source,
            blob_count: blobs.len(),
            bits: Some(bits),
        };
        self.finish(&record, started);
        record
    }

    /// Stage 6: statistics, plus the periodic session report.
    fn finish(&mut self, record: &FrameRecord, started: Instant) {
        self.session.record(record.valid, started.elapsed());
        if self.session.report_due(self.config.report_every) {
            let snapshot = self.session.snapshot();
            info!(
                total = snapshot.total,
                valid = snapshot.valid,
                ber = snapshot.bit_error_rate,
                mean_latency_ms = snapshot.mean_latency_ms,
                "session report"
            );
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// The grid the next blob-less region would fall back to.
    pub fn last_grid(&self) -> Option<&Grid> {
        self.last_grid.as_ref()
    }

    /// Clears the session counters. The remembered grid is kept.
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Paints 4x4 LEDs on a dark 10 px pitch for every set bit of `word`.
    fn led_matrix(word: u64) -> GrayImage {
        let mut img = GrayImage::from_pixel(100, 100, Luma([15]));
        for index in 0..64 {
            if (word >> (63 - index)) & 1 == 1 {
                let (row, col) = ((index / 8) as u32, (index % 8) as u32);
                for y in 0..4 {
                    for x in 0..4 {
                        img.put_pixel(12 + col * 10 + x, 12 + row * 10 + y, Luma([240]));
                    }
                }
            }
        }
        img
    }

    const CORNERS: u64 = 0x0000_0000_0000_0081;

    fn payload_word(temperature: u8, humidity: u8, distance: u8) -> u64 {
        0xB900_0000_0000_0000
            | (u64::from(temperature) << 48)
            | (u64::from(humidity) << 40)
            | (u64::from(distance) << 32)
            | CORNERS
    }

    #[test]
    fn cold_start_without_blobs_is_an_invalid_frame() {
        let mut decoder = LedMatrixDecoder::new(DecoderConfig::default()).unwrap();
        let dark = GrayImage::from_pixel(50, 50, Luma([20]));
        let record = decoder.decode(&Region::from(&dark));
        assert!(!record.valid);
        assert_eq!(record.status, FrameStatus::NoGrid);
        assert_eq!(record.telemetry, None);
        let snapshot = decoder.snapshot();
        assert_eq!((snapshot.total, snapshot.valid), (1, 0));
        assert_eq!(snapshot.bit_error_rate, 1.0);
    }

    #[test]
    fn degenerate_region_follows_the_empty_blob_path() {
        let mut decoder = LedMatrixDecoder::new(DecoderConfig::default()).unwrap();
        let empty = GrayImage::new(0, 0);
        let record = decoder.decode(&Region::from(&empty));
        assert_eq!(record.status, FrameStatus::NoGrid);
    }

    #[test]
    fn rendered_matrix_decodes_end_to_end() {
        let mut decoder = LedMatrixDecoder::new(DecoderConfig::default()).unwrap();
        let img = led_matrix(payload_word(25, 60, 100));
        let record = decoder.decode(&Region::from(&img));
        assert_eq!(record.status, FrameStatus::Decoded);
        let telemetry = record.telemetry.expect("valid frame");
        assert_eq!(
            (telemetry.temperature, telemetry.humidity, telemetry.distance),
            (25, 60, 100)
        );
        assert_eq!(record.grid_source, GridSource::Fresh);
        assert!(decoder.last_grid().is_some());
    }

    #[test]
    fn blank_frame_after_a_good_one_uses_the_stale_grid() {
        let mut decoder = LedMatrixDecoder::new(DecoderConfig::default()).unwrap();
        let good = led_matrix(payload_word(30, 40, 50));
        assert!(decoder.decode(&Region::from(&good)).valid);

        let blank = GrayImage::from_pixel(100, 100, Luma([15]));
        let record = decoder.decode(&Region::from(&blank));
        assert_eq!(record.grid_source, GridSource::Stale);
        assert_eq!(record.status, FrameStatus::HeaderMismatch);
        assert_eq!(record.sequence, 2);
        assert_eq!(decoder.snapshot().bit_error_rate, 0.5);
    }

    #[test]
    fn decoded_retention_ignores_grids_from_bad_frames() {
        let config = DecoderConfig {
            grid_retention: GridRetention::Decoded,
            ..DecoderConfig::default()
        };
        let mut decoder = LedMatrixDecoder::new(config).unwrap();
        // Corner LEDs only: a grid can be derived but the header is zero.
        let corners = led_matrix(0x8100_0000_0000_0081);
        let record = decoder.decode(&Region::from(&corners));
        assert_eq!(record.status, FrameStatus::HeaderMismatch);
        assert!(decoder.last_grid().is_none());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn session_report_is_logged_every_n_regions() {
        let config = DecoderConfig {
            report_every: Some(2),
            ..DecoderConfig::default()
        };
        let mut decoder = LedMatrixDecoder::new(config).unwrap();
        let img = led_matrix(payload_word(25, 60, 100));

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..5 {
                decoder.decode(&Region::from(&img));
            }
        });

        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.matches("session report").count(), 2);
        assert!(text.contains("total=4"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DecoderConfig {
            threshold_window: 4,
            ..DecoderConfig::default()
        };
        assert!(LedMatrixDecoder::new(config).is_err());
    }
}
