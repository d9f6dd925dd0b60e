// THEORY:
// The body classifier turns a stable pose into a named shape.
//
// Key steps:
// 1.  **Gate**: shoulders and hips must each report visibility above the threshold.
//     The session debounces this gate with a `StabilityCounter`.
// 2.  **Scale**: the eye-to-eye distance is taken to be a constant 6.3 cm, so
//     `6.3 / eye_distance` converts normalized pose units into centimetres. Eyes closer
//     than a noise floor are a transient sensor error; the frame is skipped.
// 3.  **Ratio**: shoulder width over hip width, both in centimetres.
// 4.  **Table**: a gender-specific `ThresholdLadder` names the shape. Each shape owns a
//     percentage band, a fat label and a description; an affirmation is drawn from a
//     shared pool.

use crate::core_modules::landmark::{LandmarkSet, PoseLandmark};
use crate::core_modules::threshold::{Bound, PercentBand, Rung, ThresholdLadder};
use crate::error::ScanError;
use crate::pipeline::WaitReason;
use log::trace;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(ScanError::Unrecognized {
                kind: "gender",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BodyShape {
    VShape,
    Trapezoid,
    Rectangle,
    OvalSoft,
    InvertedTriangle,
    HourglassRectangle,
    Pear,
}

impl BodyShape {
    pub fn name(self) -> &'static str {
        match self {
            BodyShape::VShape => "V-Shape/Athletic",
            BodyShape::Trapezoid => "Trapezoid/Balanced",
            BodyShape::Rectangle => "Rectangle",
            BodyShape::OvalSoft => "Oval/Soft",
            BodyShape::InvertedTriangle => "Inverted Triangle",
            BodyShape::HourglassRectangle => "Hourglass/Rectangle",
            BodyShape::Pear => "Pear Shape",
        }
    }

    pub fn fat_label(self) -> &'static str {
        match self {
            BodyShape::VShape => "Low / Fit",
            BodyShape::Trapezoid => "Average / Fit",
            BodyShape::Rectangle => "Average",
            BodyShape::OvalSoft => "High",
            BodyShape::InvertedTriangle => "Athletic",
            BodyShape::HourglassRectangle => "Balanced",
            BodyShape::Pear => "Natural",
        }
    }

    pub fn band(self) -> PercentBand {
        match self {
            BodyShape::VShape => PercentBand::new(8.0, 13.0),
            BodyShape::Trapezoid => PercentBand::new(14.0, 20.0),
            BodyShape::Rectangle => PercentBand::new(20.0, 25.0),
            BodyShape::OvalSoft => PercentBand::new(26.0, 34.0),
            BodyShape::InvertedTriangle => PercentBand::new(16.0, 20.0),
            BodyShape::HourglassRectangle => PercentBand::new(21.0, 27.0),
            BodyShape::Pear => PercentBand::new(22.0, 26.0),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BodyShape::VShape => {
                "Broad shoulders relative to waist. Indicates good muscle development."
            }
            BodyShape::Trapezoid => "Balanced proportions. Common for healthy fitness levels.",
            BodyShape::Rectangle => "Shoulders and hips are roughly equal width.",
            BodyShape::OvalSoft => {
                "Hips are wider than shoulders, often indicating higher body fat or softer frame."
            }
            BodyShape::InvertedTriangle => {
                "Shoulders broader than hips. Common in swimmers and athletes."
            }
            BodyShape::HourglassRectangle => {
                "Shoulders and hips are balanced. Classic feminine proportion."
            }
            BodyShape::Pear => "Hips wider than shoulders. Very common and natural distribution.",
        }
    }
}

impl fmt::Display for BodyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MALE_RUNGS: &[Rung<BodyShape>] = &[
    Rung::new(Bound::AtLeast(1.4), BodyShape::VShape),
    Rung::new(Bound::Above(1.1), BodyShape::Trapezoid),
    Rung::new(Bound::AtLeast(1.0), BodyShape::Rectangle),
    Rung::new(Bound::Otherwise, BodyShape::OvalSoft),
];

const FEMALE_RUNGS: &[Rung<BodyShape>] = &[
    Rung::new(Bound::Above(1.05), BodyShape::InvertedTriangle),
    Rung::new(Bound::AtLeast(0.90), BodyShape::HourglassRectangle),
    Rung::new(Bound::Otherwise, BodyShape::Pear),
];

pub const MALE_LADDER: ThresholdLadder<BodyShape> = ThresholdLadder::new(MALE_RUNGS);
pub const FEMALE_LADDER: ThresholdLadder<BodyShape> = ThresholdLadder::new(FEMALE_RUNGS);

pub const AFFIRMATIONS: [&str; 6] = [
    "Every body is a good body.",
    "Progress, not perfection.",
    "Strength comes in every shape.",
    "Consistency beats intensity. Keep showing up.",
    "Your health is more than a number.",
    "Fuel well, move often, rest deeply.",
];

pub fn ladder_for(gender: Gender) -> &'static ThresholdLadder<BodyShape> {
    match gender {
        Gender::Male => &MALE_LADDER,
        Gender::Female => &FEMALE_LADDER,
    }
}

pub fn classify_ratio(gender: Gender, ratio: f64) -> BodyShape {
    let fallback = match gender {
        Gender::Male => BodyShape::OvalSoft,
        Gender::Female => BodyShape::Pear,
    };
    ladder_for(gender).classify(ratio).copied().unwrap_or(fallback)
}

/// True when both shoulders and both hips clear `threshold`.
pub fn torso_visible(landmarks: &LandmarkSet, threshold: f64) -> bool {
    PoseLandmark::TORSO.iter().all(|&landmark| {
        landmarks
            .pose(landmark)
            .is_some_and(|point| point.is_visible(threshold))
    })
}

/// Physical-scale assumptions used to turn normalized pose units into centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyScale {
    pub interpupillary_cm: f64,
    pub min_eye_distance: f64,
}

impl Default for BodyScale {
    fn default() -> Self {
        Self {
            interpupillary_cm: 6.3,
            min_eye_distance: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyMeasurement {
    pub eye_distance: f64,
    pub scale_factor: f64,
    pub shoulder_cm: f64,
    pub hip_cm: f64,
    pub ratio: f64,
}

pub fn measure_body(landmarks: &LandmarkSet, scale: &BodyScale) -> Result<BodyMeasurement, WaitReason> {
    let point = |landmark| {
        landmarks
            .pose(landmark)
            .ok_or(WaitReason::MissingLandmarks)
    };
    let left_eye = point(PoseLandmark::LeftEye)?;
    let right_eye = point(PoseLandmark::RightEye)?;
    let left_shoulder = point(PoseLandmark::LeftShoulder)?;
    let right_shoulder = point(PoseLandmark::RightShoulder)?;
    let left_hip = point(PoseLandmark::LeftHip)?;
    let right_hip = point(PoseLandmark::RightHip)?;

    let eye_distance = left_eye.planar_distance(right_eye);
    if !(eye_distance >= scale.min_eye_distance) {
        return Err(WaitReason::EyesTooClose);
    }
    let scale_factor = scale.interpupillary_cm / eye_distance;

    let shoulder_cm = left_shoulder.planar_distance(right_shoulder) * scale_factor;
    let hip_cm = left_hip.planar_distance(right_hip) * scale_factor;
    if !(hip_cm > 0.0) {
        return Err(WaitReason::DegenerateGeometry);
    }
    let ratio = shoulder_cm / hip_cm;
    trace!("eyes {eye_distance:.4}, shoulders {shoulder_cm:.1} cm, hips {hip_cm:.1} cm, ratio {ratio:.3}");

    Ok(BodyMeasurement {
        eye_distance,
        scale_factor,
        shoulder_cm,
        hip_cm,
        ratio,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyReport {
    pub shape: BodyShape,
    pub gender: Gender,
    pub ratio: f64,
    pub shoulder_cm: f64,
    pub hip_cm: f64,
    pub estimated_percent: f64,
    pub affirmation: &'static str,
    pub height_cm: f64,
}

pub fn classify_body<R: Rng + ?Sized>(
    measurement: &BodyMeasurement,
    gender: Gender,
    height_cm: f64,
    rng: &mut R,
) -> BodyReport {
    let shape = classify_ratio(gender, measurement.ratio);
    let estimated_percent = shape.band().draw(rng);
    let affirmation = AFFIRMATIONS.choose(rng).copied().unwrap_or(AFFIRMATIONS[0]);
    BodyReport {
        shape,
        gender,
        ratio: measurement.ratio,
        shoulder_cm: measurement.shoulder_cm,
        hip_cm: measurement.hip_cm,
        estimated_percent,
        affirmation,
        height_cm,
    }
}

impl fmt::Display for BodyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Body Shape: {}", self.shape)?;
        writeln!(
            f,
            "Fat Level Estimate: {} (~{:.1}%)",
            self.shape.fat_label(),
            self.estimated_percent
        )?;
        writeln!(f, "{}", self.shape.description())?;
        writeln!(f, "Estimated Shoulder Width: {:.1} cm", self.shoulder_cm)?;
        writeln!(f, "Estimated Hip Width: {:.1} cm", self.hip_cm)?;
        write!(f, "{}", self.affirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmark::Landmark;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pose(eye_gap: f64, shoulders: f64, hips: f64, visibility: f64) -> LandmarkSet {
        let mut set = LandmarkSet::default();
        let mut put = |landmark: PoseLandmark, x: f64, y: f64| {
            set.set(landmark as usize, Landmark::new(x, y).with_visibility(visibility));
        };
        put(PoseLandmark::LeftEye, 0.5 + eye_gap / 2.0, 0.2);
        put(PoseLandmark::RightEye, 0.5 - eye_gap / 2.0, 0.2);
        put(PoseLandmark::LeftShoulder, 0.5 + shoulders / 2.0, 0.35);
        put(PoseLandmark::RightShoulder, 0.5 - shoulders / 2.0, 0.35);
        put(PoseLandmark::LeftHip, 0.5 + hips / 2.0, 0.6);
        put(PoseLandmark::RightHip, 0.5 - hips / 2.0, 0.6);
        set
    }

    #[test]
    fn male_table() {
        assert_eq!(classify_ratio(Gender::Male, 1.4), BodyShape::VShape);
        assert_eq!(classify_ratio(Gender::Male, 1.2), BodyShape::Trapezoid);
        assert_eq!(classify_ratio(Gender::Male, 1.1), BodyShape::Rectangle);
        assert_eq!(classify_ratio(Gender::Male, 1.05), BodyShape::Rectangle);
        assert_eq!(classify_ratio(Gender::Male, 1.0), BodyShape::Rectangle);
        assert_eq!(classify_ratio(Gender::Male, 0.95), BodyShape::OvalSoft);
    }

    #[test]
    fn female_table() {
        assert_eq!(classify_ratio(Gender::Female, 1.10), BodyShape::InvertedTriangle);
        assert_eq!(classify_ratio(Gender::Female, 1.05), BodyShape::HourglassRectangle);
        assert_eq!(classify_ratio(Gender::Female, 0.95), BodyShape::HourglassRectangle);
        assert_eq!(classify_ratio(Gender::Female, 0.90), BodyShape::HourglassRectangle);
        assert_eq!(classify_ratio(Gender::Female, 0.5), BodyShape::Pear);
    }

    #[test]
    fn gate_needs_all_torso_points() {
        assert!(torso_visible(&pose(0.05, 0.3, 0.25, 0.9), 0.5));
        assert!(!torso_visible(&pose(0.05, 0.3, 0.25, 0.5), 0.5));

        let mut one_hidden = pose(0.05, 0.3, 0.25, 0.9);
        one_hidden.set(
            PoseLandmark::LeftHip as usize,
            Landmark::new(0.6, 0.6).with_visibility(0.2),
        );
        assert!(!torso_visible(&one_hidden, 0.5));
        assert!(!torso_visible(&LandmarkSet::default(), 0.5));
    }

    #[test]
    fn widths_scale_by_eye_distance() {
        let measurement = measure_body(&pose(0.05, 0.3, 0.25, 0.9), &BodyScale::default()).unwrap();
        assert_abs_diff_eq!(measurement.scale_factor, 126.0, epsilon = 1e-6);
        assert_abs_diff_eq!(measurement.shoulder_cm, 37.8, epsilon = 1e-6);
        assert_abs_diff_eq!(measurement.hip_cm, 31.5, epsilon = 1e-6);
        assert_abs_diff_eq!(measurement.ratio, 1.2, epsilon = 1e-9);
    }

    #[test]
    fn tiny_eye_distance_is_skipped() {
        let result = measure_body(&pose(0.005, 0.3, 0.25, 0.9), &BodyScale::default());
        assert_eq!(result, Err(WaitReason::EyesTooClose));
    }

    #[test]
    fn zero_hip_width_is_degenerate() {
        let result = measure_body(&pose(0.05, 0.3, 0.0, 0.9), &BodyScale::default());
        assert_eq!(result, Err(WaitReason::DegenerateGeometry));
    }

    #[test]
    fn report_uses_shape_band_and_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        let measurement = measure_body(&pose(0.05, 0.36, 0.25, 0.9), &BodyScale::default()).unwrap();
        let report = classify_body(&measurement, Gender::Male, 180.0, &mut rng);
        assert_eq!(report.shape, BodyShape::VShape);
        assert!(BodyShape::VShape.band().contains(report.estimated_percent));
        assert!(AFFIRMATIONS.contains(&report.affirmation));
        assert!(report.to_string().contains("V-Shape/Athletic"));
    }

    #[test]
    fn gender_parses_from_cli_strings() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("m".parse::<Gender>().unwrap(), Gender::Male);
        assert!("other".parse::<Gender>().is_err());
    }
}
