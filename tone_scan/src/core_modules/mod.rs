pub mod body_classifier;
pub mod face_classifier;
pub mod height;
pub mod lab;
pub mod landmark;
pub mod match_scorer;
pub mod pixel;
pub mod region;
pub mod stability;
pub mod swatch;
pub mod threshold;
