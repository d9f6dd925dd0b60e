// THEORY:
// A `Region` is the cropped region of interest handed over by the face detector: a
// rectangular block of pixels whose only job is to summarize itself as one LAB color.
//
// Key principles:
// 1.  **Robust Averaging**: `midtone_average` keeps a pixel only when its lightness is
//     strictly inside the midtone band (30 < L < 70 by default). Specular highlights and
//     shadows fall outside and never bias the estimate.
// 2.  **Explicit Failure**: When no pixel survives the filter the result is `None`.
//     The session turns that into a terminal `NoMidtonePixels` for the attempt.
// 3.  **Data Container**: Like `Pixel`, a `Region` knows nothing about targets or scores.

pub mod region {
    use crate::core_modules::lab::lab::{Lab, Lightness};
    use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
    use crate::error::{Result, ScanError};
    use image::RgbaImage;
    use serde::{Deserialize, Serialize};

    /// Open lightness interval used by the skin-tone estimator.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct MidtoneBand {
        pub low: Lightness,
        pub high: Lightness,
    }

    impl MidtoneBand {
        pub const SKIN: MidtoneBand = MidtoneBand {
            low: 30.0,
            high: 70.0,
        };

        #[inline]
        pub fn contains(&self, lightness: Lightness) -> bool {
            lightness > self.low && lightness < self.high
        }
    }

    impl Default for MidtoneBand {
        fn default() -> Self {
            Self::SKIN
        }
    }

    /// Pixel-space rectangle, typically a detector's face box.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BoundingBox {
        pub x: u32,
        pub y: u32,
        pub width: u32,
        pub height: u32,
    }

    /// A rectangular block of RGBA pixels.
    #[derive(Debug, Clone)]
    pub struct Region {
        /// The width of the region in pixels.
        pub width: u32,
        /// The height of the region in pixels.
        pub height: u32,
        pixels: Vec<Pixel>,
    }

    impl Region {
        /// Wraps a tightly packed RGBA8 buffer of `width * height` pixels.
        pub fn from_rgba(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
            let expected = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(CHANNELS))
                .unwrap_or(usize::MAX);
            if bytes.len() != expected {
                return Err(ScanError::BufferSize {
                    expected,
                    actual: bytes.len(),
                });
            }
            let pixels = bytes
                .chunks_exact(CHANNELS)
                .map(Pixel::try_from)
                .collect::<Result<Vec<_>>>()?;
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        pub fn from_image(image: &RgbaImage) -> Self {
            let pixels = image
                .pixels()
                .map(|p| Pixel::new(p.0[0], p.0[1], p.0[2], p.0[3]))
                .collect();
            Self {
                width: image.width(),
                height: image.height(),
                pixels,
            }
        }

        /// Crops `bounds` out of `image`. The box is clamped to the image edges.
        pub fn crop(image: &RgbaImage, bounds: BoundingBox) -> Result<Self> {
            if bounds.x >= image.width() || bounds.y >= image.height() {
                return Err(ScanError::EmptyRegion);
            }
            let width = bounds.width.min(image.width() - bounds.x);
            let height = bounds.height.min(image.height() - bounds.y);
            if width == 0 || height == 0 {
                return Err(ScanError::EmptyRegion);
            }
            let cropped = image::imageops::crop_imm(image, bounds.x, bounds.y, width, height).to_image();
            Ok(Self::from_image(&cropped))
        }

        pub fn pixels(&self) -> &[Pixel] {
            &self.pixels
        }

        pub fn len(&self) -> usize {
            self.pixels.len()
        }

        pub fn is_empty(&self) -> bool {
            self.pixels.is_empty()
        }

        /// Mean LAB color over pixels whose lightness lies inside the default skin band.
        pub fn midtone_average(&self) -> Option<Lab> {
            self.midtone_average_within(MidtoneBand::SKIN)
        }

        pub fn midtone_average_within(&self, band: MidtoneBand) -> Option<Lab> {
            self.average_where(|lab| band.contains(lab.l))
        }

        /// Mean LAB color over every pixel, no filtering.
        pub fn mean_lab(&self) -> Option<Lab> {
            self.average_where(|_| true)
        }

        fn average_where(&self, accept: impl Fn(&Lab) -> bool) -> Option<Lab> {
            let mut sum_l = 0.0f64;
            let mut sum_a = 0.0f64;
            let mut sum_b = 0.0f64;
            let mut count = 0usize;

            for lab in self.pixels.iter().map(Pixel::lab) {
                if accept(&lab) {
                    sum_l += lab.l;
                    sum_a += lab.a;
                    sum_b += lab.b;
                    count += 1;
                }
            }

            if count == 0 {
                return None;
            }
            let count = count as f64;
            Some(Lab::new(sum_l / count, sum_a / count, sum_b / count))
        }
    }
}
