pub mod bit_sampler;
pub mod blob_detector;
pub mod frame_decoder;
pub mod grid_estimator;
pub mod led_blob;
pub mod region;
pub mod session;
pub mod threshold;
