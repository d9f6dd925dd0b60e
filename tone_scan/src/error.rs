use crate::pipeline::ScanMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a height is required before scanning")]
    MissingHeight,

    #[error("a gender must be selected for a body scan")]
    MissingGender,

    #[error("a target color must be selected before a color match")]
    MissingTarget,

    #[error("invalid height: {0}")]
    InvalidHeight(f64),

    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),

    #[error("unrecognized {kind}: {value:?}")]
    Unrecognized { kind: &'static str, value: String },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("region of interest is empty")]
    EmptyRegion,

    #[error("skin analysis failed: no usable midtone pixels")]
    NoMidtonePixels,

    #[error("face not detected, try again")]
    NoFaceDetected,

    #[error("{actual:?} input delivered to a {expected:?} scan")]
    WrongMode { expected: ScanMode, actual: ScanMode },

    #[error("scan cancelled before a result was produced")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
