// THEORY:
// This file is the main entry point for the `occ_decoder` library crate. It
// decodes sensor telemetry (temperature, humidity, distance) that a transmitter
// blinks out on an 8x8 LED matrix and a camera films. An external object
// detector has already located the matrix; this crate turns the cropped region
// into a validated frame of telemetry.
//
// The primary exports are:
// - `LedMatrixDecoder`: the per-region decoding core with its persisted grid and
//   session statistics.
// - `OccPipeline` / `ParallelPipeline`: frame loops that drive an external
//   detector, frame source and result sink around the decoder.
// - The data structures those produce (`FrameRecord`, `Telemetry`, `SessionSnapshot`).
//
// The individual stages (`core_modules`) are public for callers that want to run
// or test a single stage, but the decoder is the intended interface.

pub mod config;
pub mod core_modules;
pub mod decoder;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{DecoderConfig, GridRetention};
pub use core_modules::bit_sampler::Bitstream;
pub use core_modules::frame_decoder::{FrameRecord, FrameStatus, GridSource, Telemetry};
pub use core_modules::grid_estimator::Grid;
pub use core_modules::region::{ChannelLayout, PixelRect, Region};
pub use core_modules::session::SessionSnapshot;
pub use decoder::LedMatrixDecoder;
pub use error::{Error, Result};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{
    BoundingBox, Detection, Detector, Frame, FrameReport, FrameSource, OccPipeline, PipelineConfig,
    ResultSink,
};
