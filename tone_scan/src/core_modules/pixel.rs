// THEORY (Pixel):
// The `Pixel` module is the smallest unit of the colorimetric pipeline: a plain
// container for one RGBA sample plus the single-pixel transforms the matcher needs.
//
// Channel forms:
// - raw (0..255 bytes) as delivered by the region buffer or a swatch hex code
// - normalized (0..1 sRGB): divide by 255.0, still gamma-encoded
// - linearized (0..1 linear light): sRGB → linear via a 256-entry `OnceLock` LUT
//
// Alpha is carried through untouched; it never participates in color math.
// The LUT path and `lab::rgb_to_lab` share `lab::srgb_to_linear`, so `Pixel::lab`
// returns exactly what the float converter returns for `byte / 255.0`.

pub mod pixel {
    use crate::core_modules::lab::lab::{self, Lab};
    use crate::error::ScanError;
    use std::sync::OnceLock;

    pub type Byte = u8;
    pub type Channel = Byte;
    pub type NormalizedChannel = f64;
    pub type LinearizedChannel = f64;

    pub const CHANNELS: usize = 4;

    static SRGB_TO_LINEAR_LUT: OnceLock<[LinearizedChannel; 256]> = OnceLock::new();

    /// A single RGBA sample with 8-bit channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha channel value (0-255). Ignored by every color computation.
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, Channel::MAX)
        }

        #[inline]
        fn srgb_to_linear_from_byte(value: Byte) -> LinearizedChannel {
            let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
                let mut table = [0.0f64; 256];
                for (i, entry) in table.iter_mut().enumerate() {
                    *entry = lab::srgb_to_linear(i as NormalizedChannel / 255.0);
                }
                table
            });
            table[value as usize]
        }

        /// Gamma-encoded channels scaled to 0..1.
        pub fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            )
        }

        /// Linear-light channels in 0..1.
        pub fn linearized(&self) -> (LinearizedChannel, LinearizedChannel, LinearizedChannel) {
            (
                Self::srgb_to_linear_from_byte(self.red),
                Self::srgb_to_linear_from_byte(self.green),
                Self::srgb_to_linear_from_byte(self.blue),
            )
        }

        /// CIE L*a*b* of this pixel, alpha ignored.
        pub fn lab(&self) -> Lab {
            let (red, green, blue) = self.linearized();
            lab::linear_rgb_to_lab(red, green, blue)
        }
    }

    impl TryFrom<&[Byte]> for Pixel {
        type Error = ScanError;

        fn try_from(bytes: &[Byte]) -> Result<Self, Self::Error> {
            match *bytes {
                [red, green, blue, alpha] => Ok(Pixel::new(red, green, blue, alpha)),
                _ => Err(ScanError::BufferSize {
                    expected: CHANNELS,
                    actual: bytes.len(),
                }),
            }
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }
}
