// THEORY:
// The pipelined runner overlaps the two halves of the frame loop. Acquiring a
// frame and running the object detector on it is by far the slowest step, while
// decoding a cropped region is cheap. Running them back to back leaves the decoder
// idle while the detector works and vice versa.
//
// Architecture:
// 1.  **Acquisition Task**: A spawned tokio task pulls frames from the source
//     stream and pushes `(frame, detections)` into a bounded channel. The bound
//     gives back-pressure so a fast camera cannot queue up unbounded memory. The
//     detector itself runs on tokio's blocking pool, so a model-backed detector
//     never stalls a runtime worker and detection overlaps decoding even on a
//     current-thread runtime.
// 2.  **Decode Loop**: The caller's task receives from the channel and drives the
//     `OccPipeline`. A single-producer single-consumer channel is FIFO, so frames
//     are decoded in exactly the order they arrived, and the decoder's grid and
//     statistics are only ever touched from this one task.
// 3.  **Shutdown**: When the stream ends the acquisition task drops its sender,
//     the decode loop drains what is left and the task is joined. If the task or
//     the detector panicked the run fails with `PipelineClosed`.

use crate::core_modules::session::SessionSnapshot;
use crate::error::{Error, Result};
use crate::pipeline::{Detection, Detector, Frame, OccPipeline, PipelineConfig, ResultSink};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

pub struct ParallelPipeline {
    pipeline: OccPipeline,
    channel_capacity: usize,
}

impl ParallelPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let channel_capacity = config.channel_capacity;
        Ok(Self {
            pipeline: OccPipeline::new(config)?,
            channel_capacity,
        })
    }

    /// Decodes `frames` to completion, detecting frame N+1 while frame N is decoded.
    pub async fn run<S, D, P, K>(
        &mut self,
        frames: S,
        mut detector: D,
        mut qualifies: P,
        sink: &mut K,
    ) -> Result<SessionSnapshot>
    where
        S: Stream<Item = Frame> + Send + Unpin + 'static,
        D: Detector + Send + 'static,
        P: FnMut(&Detection) -> bool,
        K: ResultSink + ?Sized,
    {
        let (tx, mut rx) = mpsc::channel::<(Frame, Vec<Detection>)>(self.channel_capacity);

        let acquisition = tokio::spawn(async move {
            let mut frames = frames;
            while let Some(frame) = frames.next().await {
                // The detector moves onto the blocking pool and comes back with its output.
                let (returned, frame, detections) = tokio::task::spawn_blocking(move || {
                    let detections = detector.detect(&frame);
                    (detector, frame, detections)
                })
                .await
                .map_err(|_| Error::PipelineClosed("detector panicked"))?;
                detector = returned;
                if tx.send((frame, detections)).await.is_err() {
                    // Decode loop is gone; stop pulling frames.
                    break;
                }
            }
            Ok::<(), Error>(())
        });

        while let Some((frame, detections)) = rx.recv().await {
            let report = self
                .pipeline
                .process_frame(&frame, &detections, &mut qualifies)?;
            sink.publish(&report);
        }

        acquisition
            .await
            .map_err(|_| Error::PipelineClosed("acquisition task failed"))??;
        debug!(frames = self.pipeline.frames_seen(), "stream drained");
        Ok(self.pipeline.link_snapshot())
    }

    pub fn pipeline(&self) -> &OccPipeline {
        &self.pipeline
    }
}
