// THEORY:
// The `pipeline` module is the top-level API. A `ScanSession` owns everything one scan
// attempt needs: the configuration, the requested mode and its preconditions, the
// current target color, the stability counter, the randomness source and the "is
// scanning" flag. Nothing lives in module globals, so a session can be reset and
// audited on its own.
//
// Each detector frame goes through exactly one handler, which checks the live flag
// before anything else and answers with a `FrameOutcome`:
// - `Waiting`: a transient condition (no detection, low visibility, still
//   stabilizing, degenerate geometry); keep sending frames.
// - `Complete`: a report was produced and the session has stopped.
// - `Stopped`: the frame arrived after the session ended and was ignored.
//
// Terminal failures for the attempt (no face in the single-shot color match, no
// midtone pixels) are `Err(ScanError)` and also stop the session.

use crate::core_modules::body_classifier::{self, BodyReport, BodyScale, Gender};
use crate::core_modules::face_classifier::{self, FaceReport};
use crate::core_modules::height::Height;
use crate::core_modules::lab::lab::{DeltaE, Lab};
use crate::core_modules::landmark::LandmarkSet;
use crate::core_modules::match_scorer::match_scorer::{self, MatchScore};
use crate::core_modules::region::region::{MidtoneBand, Region};
use crate::core_modules::stability::{DEFAULT_REQUIRED_FRAMES, STEADY_REQUIRED_FRAMES, StabilityCounter};
use crate::core_modules::swatch::{self, DEFAULT_TARGET, Swatch};
use crate::error::{Result, ScanError};
use crate::store::{self, KeyValueStore};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which pixels feed the skin-tone estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneSampling {
    /// Only pixels inside the midtone band.
    #[default]
    Midtone,
    /// Every pixel of the region.
    Full,
}

/// Configuration for a `ScanSession`, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Consecutive gated pose frames required before the body classifier fires.
    pub required_frames: u32,
    /// Shoulder and hip landmarks must report visibility strictly above this.
    pub visibility_threshold: f64,
    /// Eye distances below this (normalized units) are treated as sensor noise.
    pub min_eye_distance: f64,
    /// Assumed real-world inter-pupillary distance in centimetres.
    pub interpupillary_cm: f64,
    pub midtone_band: MidtoneBand,
    pub tone_sampling: ToneSampling,
    /// Match scores below this come with nutrition tips.
    pub nutrition_tip_below: u8,
    /// Capacity of the bounded frame queue used by `ScanDriver`.
    pub frame_queue_capacity: usize,
    /// When set, a face scan that receives a frame without a face fails instead of
    /// waiting for the next frame.
    pub face_single_attempt: bool,
    /// Color matches without a selected swatch fall back to `DEFAULT_TARGET`.
    pub use_default_target: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let scale = BodyScale::default();
        Self {
            required_frames: DEFAULT_REQUIRED_FRAMES,
            visibility_threshold: 0.5,
            min_eye_distance: scale.min_eye_distance,
            interpupillary_cm: scale.interpupillary_cm,
            midtone_band: MidtoneBand::SKIN,
            tone_sampling: ToneSampling::Midtone,
            nutrition_tip_below: 80,
            frame_queue_capacity: 8,
            face_single_attempt: false,
            use_default_target: false,
        }
    }
}

impl ScanConfig {
    /// Preset that waits for a full second of stable frames at 30 fps.
    pub fn steady() -> Self {
        Self {
            required_frames: STEADY_REQUIRED_FRAMES,
            ..Self::default()
        }
    }

    pub fn body_scale(&self) -> BodyScale {
        BodyScale {
            interpupillary_cm: self.interpupillary_cm,
            min_eye_distance: self.min_eye_distance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Face,
    Body,
    ColorMatch,
}

/// What the user asked for, checked before any frame is accepted.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub mode: ScanMode,
    pub height: Option<Height>,
    pub gender: Option<Gender>,
    pub target: Option<Lab>,
}

impl ScanRequest {
    pub fn face(height: Height) -> Self {
        Self {
            mode: ScanMode::Face,
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn body(height: Height, gender: Gender) -> Self {
        Self {
            mode: ScanMode::Body,
            height: Some(height),
            gender: Some(gender),
            ..Self::default()
        }
    }

    pub fn color_match(target: Lab) -> Self {
        Self {
            mode: ScanMode::ColorMatch,
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn validate(&self, config: &ScanConfig) -> Result<()> {
        match self.mode {
            ScanMode::Face => {
                self.height.ok_or(ScanError::MissingHeight)?;
            }
            ScanMode::Body => {
                self.height.ok_or(ScanError::MissingHeight)?;
                self.gender.ok_or(ScanError::MissingGender)?;
            }
            ScanMode::ColorMatch => {
                if self.target.is_none() && !config.use_default_target {
                    return Err(ScanError::MissingTarget);
                }
            }
        }
        Ok(())
    }
}

/// One delivery from the external detector.
#[derive(Debug, Clone)]
pub enum DetectorFrame {
    Face(LandmarkSet),
    Pose(LandmarkSet),
    /// Cropped face box for the color match.
    FaceRegion(Region),
    NoDetection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaitReason {
    NoDetection,
    LowVisibility,
    Stabilizing { count: u32, required: u32 },
    MissingLandmarks,
    EyesTooClose,
    DegenerateGeometry,
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitReason::NoDetection => f.write_str("nothing detected"),
            WaitReason::LowVisibility => f.write_str("shoulders or hips not clearly visible"),
            WaitReason::Stabilizing { count, required } => {
                write!(f, "stabilizing ({count}/{required} frames)")
            }
            WaitReason::MissingLandmarks => f.write_str("landmark set too small"),
            WaitReason::EyesTooClose => f.write_str("eye distance below noise floor"),
            WaitReason::DegenerateGeometry => f.write_str("degenerate landmark geometry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub score: MatchScore,
    pub estimate: Lab,
    pub target: Lab,
    pub delta_e: DeltaE,
    pub nutrition_tips: bool,
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Match: {}", self.score)?;
        if self.nutrition_tips {
            write!(f, "\nA few nutrition tips may help bring your tone closer to the target.")?;
        }
        Ok(())
    }
}

/// The terminal, human-facing result of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScanReport {
    Face(FaceReport),
    Body(BodyReport),
    ColorMatch(MatchReport),
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanReport::Face(report) => report.fmt(f),
            ScanReport::Body(report) => report.fmt(f),
            ScanReport::ColorMatch(report) => report.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Waiting(WaitReason),
    Complete(ScanReport),
    Stopped,
}

/// A single scan attempt and all the state it carries between frames.
pub struct ScanSession<R: Rng = StdRng> {
    config: ScanConfig,
    mode: ScanMode,
    height_cm: Option<f64>,
    gender: Option<Gender>,
    target: Option<Lab>,
    stability: StabilityCounter,
    rng: R,
    store: Option<Box<dyn KeyValueStore + Send>>,
    scanning: bool,
}

impl ScanSession<StdRng> {
    pub fn new(config: ScanConfig, request: ScanRequest) -> Result<Self> {
        Self::with_rng(config, request, StdRng::from_entropy())
    }
}

impl<R: Rng> ScanSession<R> {
    /// Builds a session around an explicit randomness source.
    pub fn with_rng(config: ScanConfig, request: ScanRequest, rng: R) -> Result<Self> {
        request.validate(&config)?;
        let target = match (request.mode, request.target) {
            (_, Some(target)) => Some(target),
            (ScanMode::ColorMatch, None) if config.use_default_target => Some(DEFAULT_TARGET),
            _ => None,
        };
        Ok(Self {
            stability: StabilityCounter::new(config.required_frames),
            mode: request.mode,
            height_cm: request.height.map(|h| h.cm()),
            gender: request.gender,
            target,
            rng,
            store: None,
            scanning: true,
            config,
        })
    }

    /// Sends every match score to `store` under the last-scan key.
    pub fn with_store(mut self, store: impl KeyValueStore + Send + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn stability_count(&self) -> u32 {
        self.stability.count()
    }

    pub fn target(&self) -> Option<Lab> {
        self.target
    }

    /// Replaces the target with the color of a hex code.
    pub fn select_target(&mut self, hex: &str) -> Result<Lab> {
        let lab = swatch::hex_to_lab(hex)?;
        debug!("selected target {hex} -> {lab}");
        self.target = Some(lab);
        Ok(lab)
    }

    pub fn select_swatch(&mut self, swatch: Swatch) -> Lab {
        let lab = swatch.lab();
        debug!("selected swatch {swatch} -> {lab}");
        self.target = Some(lab);
        lab
    }

    /// Stops accepting frames. Idempotent.
    pub fn stop(&mut self) {
        if self.scanning {
            debug!("{:?} scan stopped", self.mode);
        }
        self.scanning = false;
        self.stability.reset();
    }

    /// Re-arms a finished session for another attempt with the same request.
    pub fn restart(&mut self) {
        self.stability.reset();
        self.scanning = true;
    }

    pub fn process_frame(&mut self, frame: &DetectorFrame) -> Result<FrameOutcome> {
        if !self.scanning {
            return Ok(FrameOutcome::Stopped);
        }
        match frame {
            DetectorFrame::Face(landmarks) => self.process_face_frame(landmarks),
            DetectorFrame::Pose(landmarks) => self.process_pose_frame(landmarks),
            DetectorFrame::FaceRegion(region) => self
                .match_region(region)
                .map(|report| FrameOutcome::Complete(ScanReport::ColorMatch(report))),
            DetectorFrame::NoDetection => self.process_missing_detection(),
        }
    }

    /// Single-shot face classification: the first measurable face ends the session.
    pub fn process_face_frame(&mut self, landmarks: &LandmarkSet) -> Result<FrameOutcome> {
        if !self.scanning {
            return Ok(FrameOutcome::Stopped);
        }
        self.ensure_mode(ScanMode::Face)?;

        let measurement = match face_classifier::measure_face(landmarks) {
            Ok(measurement) => measurement,
            Err(reason) => {
                debug!("face frame skipped: {reason}");
                return Ok(FrameOutcome::Waiting(reason));
            }
        };
        let height_cm = self.height_cm.ok_or(ScanError::MissingHeight)?;
        let report = face_classifier::classify_face(&measurement, height_cm, &mut self.rng);
        info!("face ratio {:.3} classified as {}", report.ratio, report.level);
        self.stop();
        Ok(FrameOutcome::Complete(ScanReport::Face(report)))
    }

    /// Debounced body classification.
    pub fn process_pose_frame(&mut self, landmarks: &LandmarkSet) -> Result<FrameOutcome> {
        if !self.scanning {
            return Ok(FrameOutcome::Stopped);
        }
        self.ensure_mode(ScanMode::Body)?;

        if !body_classifier::torso_visible(landmarks, self.config.visibility_threshold) {
            if self.stability.count() > 0 {
                debug!("visibility lost after {} stable frames", self.stability.count());
            }
            self.stability.reset();
            return Ok(FrameOutcome::Waiting(WaitReason::LowVisibility));
        }

        if !self.stability.record_valid() {
            return Ok(FrameOutcome::Waiting(WaitReason::Stabilizing {
                count: self.stability.count(),
                required: self.stability.required(),
            }));
        }

        let measurement = match body_classifier::measure_body(landmarks, &self.config.body_scale()) {
            Ok(measurement) => measurement,
            Err(reason) => {
                debug!("pose frame skipped: {reason}");
                return Ok(FrameOutcome::Waiting(reason));
            }
        };
        let gender = self.gender.ok_or(ScanError::MissingGender)?;
        let height_cm = self.height_cm.ok_or(ScanError::MissingHeight)?;
        let report = body_classifier::classify_body(&measurement, gender, height_cm, &mut self.rng);
        info!(
            "shoulder/hip ratio {:.3} ({gender}) classified as {}",
            report.ratio, report.shape
        );
        self.stop();
        Ok(FrameOutcome::Complete(ScanReport::Body(report)))
    }

    /// Scores a cropped face region against the current target. Single-shot: the
    /// session stops whether or not a usable tone was found.
    pub fn match_region(&mut self, region: &Region) -> Result<MatchReport> {
        if !self.scanning {
            return Err(ScanError::Cancelled);
        }
        self.ensure_mode(ScanMode::ColorMatch)?;
        let target = self.target.ok_or(ScanError::MissingTarget)?;
        self.stop();

        let estimate = match self.config.tone_sampling {
            ToneSampling::Midtone => region.midtone_average_within(self.config.midtone_band),
            ToneSampling::Full => region.mean_lab(),
        }
        .ok_or(ScanError::NoMidtonePixels)?;

        let delta_e = match_scorer::delta_e(&estimate, &target);
        let score = match_scorer::score_from_delta_e(delta_e);
        if let Some(store) = self.store.as_mut() {
            store::record_last_scan(&mut **store, score);
        }
        info!("skin tone {estimate} vs target {target}: deltaE {delta_e:.2}, match {score}");

        Ok(MatchReport {
            score,
            estimate,
            target,
            delta_e,
            nutrition_tips: score.suggests_nutrition_tips(self.config.nutrition_tip_below),
        })
    }

    fn process_missing_detection(&mut self) -> Result<FrameOutcome> {
        match self.mode {
            ScanMode::ColorMatch => {
                self.stop();
                Err(ScanError::NoFaceDetected)
            }
            ScanMode::Face if self.config.face_single_attempt => {
                self.stop();
                Err(ScanError::NoFaceDetected)
            }
            ScanMode::Face => Ok(FrameOutcome::Waiting(WaitReason::NoDetection)),
            ScanMode::Body => {
                self.stability.reset();
                Ok(FrameOutcome::Waiting(WaitReason::NoDetection))
            }
        }
    }

    fn ensure_mode(&self, actual: ScanMode) -> Result<()> {
        if self.mode == actual {
            Ok(())
        } else {
            Err(ScanError::WrongMode {
                expected: self.mode,
                actual,
            })
        }
    }
}
