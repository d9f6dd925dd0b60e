// THEORY:
// This file is the entry point for the `tone_scan` library crate. The public surface is
// the `ScanSession` in `pipeline` (one scan attempt fed frame by frame) and the
// `ScanDriver` in `stream_pipeline` (the same session moved onto a tokio task behind a
// bounded frame queue).
//
// `core_modules` holds the pieces the session is assembled from: the sRGB to CIE LAB
// conversion, the midtone skin-tone estimate, the match scorer, and the two landmark
// ratio classifiers. The detectors themselves live outside the crate; it only consumes
// their landmarks and cropped face regions.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod stream_pipeline;

pub use error::{Result, ScanError};
pub use pipeline::{
    DetectorFrame, FrameOutcome, MatchReport, ScanConfig, ScanMode, ScanReport, ScanRequest,
    ScanSession, ToneSampling, WaitReason,
};
pub use stream_pipeline::{FrameSender, ScanDriver, run_scan};
