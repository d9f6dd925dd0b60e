// THEORY:
// Detector callbacks arrive from outside the crate, often on another thread. Instead of
// letting several callbacks mutate a session at once, every frame goes through a
// bounded channel to a single driver task that owns the `ScanSession`. Frames are
// therefore processed strictly in arrival order, and the debounce counter can never see
// two frames interleaved.
//
// - `ScanDriver::spawn` moves a session onto a tokio task and hands back a
//   `FrameSender` plus a `JoinHandle` that resolves to the final report.
// - `FrameSender::offer` never waits: when the queue is full the frame is dropped, like
//   a camera that skips frames while the consumer is busy.
// - `FrameSender::stop` ends the scan from the outside; the handle then resolves to
//   `ScanError::Cancelled`.
// - `run_scan` drives a session from any `Stream` of frames on the current task.

use crate::error::{Result, ScanError};
use crate::pipeline::{DetectorFrame, FrameOutcome, ScanReport, ScanSession};
use futures::{Stream, StreamExt};
use log::{debug, trace};
use rand::Rng;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Producer side of a running `ScanDriver`.
pub struct FrameSender {
    tx: mpsc::Sender<DetectorFrame>,
    stop_tx: oneshot::Sender<()>,
}

impl FrameSender {
    /// Queues a frame, waiting for room. Fails once the scan has finished.
    pub async fn send(&self, frame: DetectorFrame) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| ScanError::Cancelled)
    }

    /// Queues a frame if there is room. Returns `Ok(false)` when the frame was dropped.
    pub fn offer(&self, frame: DetectorFrame) -> Result<bool> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                trace!("frame queue full, dropping frame");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(ScanError::Cancelled),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Asks the driver to abandon the scan.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}

pub struct ScanDriver;

impl ScanDriver {
    pub fn spawn<R>(session: ScanSession<R>) -> (FrameSender, JoinHandle<Result<ScanReport>>)
    where
        R: Rng + Send + 'static,
    {
        let capacity = session.config().frame_queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        debug!("spawning {:?} scan driver (queue {capacity})", session.mode());
        let handle = tokio::spawn(drive(session, rx, stop_rx));
        (FrameSender { tx, stop_tx }, handle)
    }
}

async fn drive<R: Rng>(
    mut session: ScanSession<R>,
    mut rx: mpsc::Receiver<DetectorFrame>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<ScanReport> {
    // A dropped sender only disarms the stop branch; queued frames still drain.
    let mut stop_armed = true;
    loop {
        tokio::select! {
            biased;
            stop = &mut stop_rx, if stop_armed => {
                if stop.is_ok() {
                    session.stop();
                    return Err(ScanError::Cancelled);
                }
                stop_armed = false;
            }
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    session.stop();
                    return Err(ScanError::Cancelled);
                };
                if let Some(report) = step(&mut session, &frame)? {
                    return Ok(report);
                }
            }
        }
    }
}

/// Drives `session` from `frames` until it produces a report. A stream that ends
/// first cancels the scan.
pub async fn run_scan<R, S>(session: &mut ScanSession<R>, mut frames: S) -> Result<ScanReport>
where
    R: Rng,
    S: Stream<Item = DetectorFrame> + Unpin,
{
    while let Some(frame) = frames.next().await {
        if let Some(report) = step(session, &frame)? {
            return Ok(report);
        }
    }
    session.stop();
    Err(ScanError::Cancelled)
}

fn step<R: Rng>(session: &mut ScanSession<R>, frame: &DetectorFrame) -> Result<Option<ScanReport>> {
    match session.process_frame(frame)? {
        FrameOutcome::Complete(report) => Ok(Some(report)),
        FrameOutcome::Waiting(reason) => {
            trace!("waiting: {reason}");
            Ok(None)
        }
        FrameOutcome::Stopped => Err(ScanError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::body_classifier::{BodyShape, Gender};
    use crate::core_modules::height::{Height, HeightUnit};
    use crate::core_modules::landmark::{FaceLandmark, Landmark, LandmarkSet, PoseLandmark};
    use crate::core_modules::region::region::Region;
    use crate::core_modules::stability::DEFAULT_REQUIRED_FRAMES;
    use crate::core_modules::swatch::Swatch;
    use crate::pipeline::{ScanConfig, ScanRequest};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn height() -> Height {
        Height::new(5.5, HeightUnit::Feet).unwrap()
    }

    fn session(config: ScanConfig, request: ScanRequest) -> ScanSession<StdRng> {
        ScanSession::with_rng(config, request, StdRng::seed_from_u64(42)).unwrap()
    }

    fn pose(visibility: f64) -> DetectorFrame {
        let mut set = LandmarkSet::default();
        for (landmark, x, y) in [
            (PoseLandmark::LeftEye, 0.53, 0.2),
            (PoseLandmark::RightEye, 0.47, 0.2),
            (PoseLandmark::LeftShoulder, 0.65, 0.35),
            (PoseLandmark::RightShoulder, 0.35, 0.35),
            (PoseLandmark::LeftHip, 0.6, 0.6),
            (PoseLandmark::RightHip, 0.4, 0.6),
        ] {
            set.set(landmark as usize, Landmark::new(x, y).with_visibility(visibility));
        }
        DetectorFrame::Pose(set)
    }

    #[tokio::test]
    async fn driver_reports_after_stable_run() {
        let config = ScanConfig {
            frame_queue_capacity: 32,
            ..ScanConfig::default()
        };
        let (sender, handle) = ScanDriver::spawn(session(config, ScanRequest::body(height(), Gender::Male)));
        for _ in 0..DEFAULT_REQUIRED_FRAMES {
            sender.send(pose(0.9)).await.unwrap();
        }
        match handle.await.unwrap().unwrap() {
            ScanReport::Body(report) => {
                // shoulders 0.30, hips 0.20
                assert_eq!(report.shape, BodyShape::VShape);
                assert!((report.ratio - 1.5).abs() < 1e-9);
            }
            other => panic!("unexpected report {other:?}"),
        }
        assert!(sender.send(pose(0.9)).await.is_err());
    }

    #[tokio::test]
    async fn stop_cancels_a_running_scan() {
        let (sender, handle) =
            ScanDriver::spawn(session(ScanConfig::default(), ScanRequest::body(height(), Gender::Female)));
        sender.send(pose(0.9)).await.unwrap();
        sender.send(pose(0.9)).await.unwrap();
        sender.stop();
        assert!(matches!(handle.await.unwrap(), Err(ScanError::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_sender_drains_queued_frames() {
        let config = ScanConfig {
            required_frames: 2,
            ..ScanConfig::default()
        };
        let (sender, handle) = ScanDriver::spawn(session(config, ScanRequest::body(height(), Gender::Male)));
        sender.send(pose(0.9)).await.unwrap();
        sender.send(pose(0.9)).await.unwrap();
        drop(sender);
        assert!(matches!(handle.await.unwrap(), Ok(ScanReport::Body(_))));
    }

    #[tokio::test]
    async fn face_scan_ends_after_one_face() {
        let mut set = LandmarkSet::default();
        set.set(FaceLandmark::LeftJaw as usize, Landmark::new(0.3, 0.5));
        set.set(FaceLandmark::RightJaw as usize, Landmark::new(0.7, 0.5));
        set.set(FaceLandmark::Forehead as usize, Landmark::new(0.5, 0.2));
        set.set(FaceLandmark::Chin as usize, Landmark::new(0.5, 0.8));

        let (sender, handle) = ScanDriver::spawn(session(ScanConfig::default(), ScanRequest::face(height())));
        sender.send(DetectorFrame::NoDetection).await.unwrap();
        sender.send(DetectorFrame::Face(set.clone())).await.unwrap();
        assert!(matches!(handle.await.unwrap(), Ok(ScanReport::Face(_))));
        assert!(sender.is_closed());
        assert!(matches!(
            sender.offer(DetectorFrame::Face(set)),
            Err(ScanError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn offer_drops_frames_when_full() {
        let config = ScanConfig {
            frame_queue_capacity: 1,
            ..ScanConfig::default()
        };
        let (sender, handle) = ScanDriver::spawn(session(config, ScanRequest::body(height(), Gender::Male)));
        let mut accepted = 0;
        for _ in 0..64 {
            if sender.offer(pose(0.2)).unwrap() {
                accepted += 1;
            }
        }
        assert!(accepted >= 1);
        sender.stop();
        assert!(matches!(handle.await.unwrap(), Err(ScanError::Cancelled)));
    }

    #[tokio::test]
    async fn stream_with_a_visibility_drop_needs_a_fresh_run() {
        let n = DEFAULT_REQUIRED_FRAMES as usize;
        let mut frames = vec![pose(0.9); n - 1];
        frames.push(pose(0.1));
        frames.extend(vec![pose(0.9); n - 1]);

        let mut scan = session(ScanConfig::default(), ScanRequest::body(height(), Gender::Male));
        let result = run_scan(&mut scan, futures::stream::iter(frames.clone())).await;
        assert!(matches!(result, Err(ScanError::Cancelled)));

        let mut scan = session(ScanConfig::default(), ScanRequest::body(height(), Gender::Male));
        frames.push(pose(0.9));
        let report = run_scan(&mut scan, futures::stream::iter(frames)).await.unwrap();
        assert!(matches!(report, ScanReport::Body(_)));
        assert!(!scan.is_scanning());
    }

    #[tokio::test]
    async fn color_match_through_the_driver() {
        let bytes: Vec<u8> = [0xC9, 0x9B, 0x6D, 0xFF].iter().copied().cycle().take(8 * 8 * 4).collect();
        let region = Region::from_rgba(8, 8, &bytes).unwrap();

        let request = ScanRequest::color_match(Swatch::Honey.lab());
        let (sender, handle) = ScanDriver::spawn(session(ScanConfig::default(), request));
        sender.send(DetectorFrame::FaceRegion(region)).await.unwrap();
        match handle.await.unwrap().unwrap() {
            ScanReport::ColorMatch(report) => assert_eq!(report.score.percent(), 100),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[tokio::test]
    async fn color_match_without_a_face_fails() {
        let request = ScanRequest::color_match(Swatch::Honey.lab());
        let mut scan = session(ScanConfig::default(), request);
        let result = run_scan(&mut scan, futures::stream::iter(vec![DetectorFrame::NoDetection])).await;
        assert!(matches!(result, Err(ScanError::NoFaceDetected)));
    }
}
