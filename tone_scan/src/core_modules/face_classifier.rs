// THEORY:
// The face classifier reduces a face mesh to one number, jaw width over face height,
// and reads a fat level off a three-rung ladder:
//
//   ratio > 0.85  → High
//   ratio > 0.75  → Medium
//   otherwise     → Low
//
// Each level carries a percentage band the estimate is drawn from and a fixed piece of
// advice. The scan is single-shot: the session classifies the first measurable face and
// stops.

use crate::core_modules::landmark::{FaceLandmark, LandmarkSet};
use crate::core_modules::threshold::{Bound, PercentBand, Rung, ThresholdLadder};
use crate::pipeline::WaitReason;
use log::trace;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Face heights at or below this are treated as a degenerate mesh.
const MIN_FACE_HEIGHT: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FatLevel {
    Low,
    Medium,
    High,
}

impl FatLevel {
    pub fn label(self) -> &'static str {
        match self {
            FatLevel::Low => "Low Fat",
            FatLevel::Medium => "Medium Fat",
            FatLevel::High => "High Fat",
        }
    }

    pub fn band(self) -> PercentBand {
        match self {
            FatLevel::Low => PercentBand::new(10.0, 17.0),
            FatLevel::Medium => PercentBand::new(18.0, 24.0),
            FatLevel::High => PercentBand::new(25.0, 30.0),
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            FatLevel::Low => "Great! Facial structure shows low fat levels. Maintain current habits.",
            FatLevel::Medium => {
                "Moderate range. Hydration and balanced eating can help refine specific features."
            }
            FatLevel::High => {
                "Consider adjusting your diet and doing regular cardio. Facial bloating detected."
            }
        }
    }
}

impl fmt::Display for FatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const FACE_FAT_RUNGS: &[Rung<FatLevel>] = &[
    Rung::new(Bound::Above(0.85), FatLevel::High),
    Rung::new(Bound::Above(0.75), FatLevel::Medium),
    Rung::new(Bound::Otherwise, FatLevel::Low),
];

pub const FACE_FAT_LADDER: ThresholdLadder<FatLevel> = ThresholdLadder::new(FACE_FAT_RUNGS);

pub fn classify_ratio(ratio: f64) -> FatLevel {
    FACE_FAT_LADDER
        .classify(ratio)
        .copied()
        .unwrap_or(FatLevel::Low)
}

/// Planar face extents measured from the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceMeasurement {
    pub width: f64,
    pub height: f64,
    pub ratio: f64,
}

pub fn measure_face(landmarks: &LandmarkSet) -> Result<FaceMeasurement, WaitReason> {
    let point = |landmark| {
        landmarks
            .face(landmark)
            .ok_or(WaitReason::MissingLandmarks)
    };
    let left_jaw = point(FaceLandmark::LeftJaw)?;
    let right_jaw = point(FaceLandmark::RightJaw)?;
    let forehead = point(FaceLandmark::Forehead)?;
    let chin = point(FaceLandmark::Chin)?;

    let width = left_jaw.planar_distance(right_jaw);
    let height = forehead.planar_distance(chin);
    if !(height > MIN_FACE_HEIGHT) {
        return Err(WaitReason::DegenerateGeometry);
    }
    let ratio = width / height;
    trace!("face width {width:.4}, height {height:.4}, ratio {ratio:.4}");
    Ok(FaceMeasurement {
        width,
        height,
        ratio,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReport {
    pub level: FatLevel,
    pub ratio: f64,
    pub estimated_percent: f64,
    pub advice: &'static str,
    pub height_cm: f64,
}

pub fn classify_face<R: Rng + ?Sized>(
    measurement: &FaceMeasurement,
    height_cm: f64,
    rng: &mut R,
) -> FaceReport {
    let level = classify_ratio(measurement.ratio);
    FaceReport {
        level,
        ratio: measurement.ratio,
        estimated_percent: level.band().draw(rng),
        advice: level.advice(),
        height_cm,
    }
}

impl fmt::Display for FaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Estimated Fat Level: {} (~{:.1}%)", self.level, self.estimated_percent)?;
        writeln!(f, "Face Ratio: {:.2}, Height: {:.1} cm", self.ratio, self.height_cm)?;
        write!(f, "Advice: {}", self.advice)
    }
}
