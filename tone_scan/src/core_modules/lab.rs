// THEORY:
// The `lab` module is the colorimetric core of the matching pipeline. It owns the
// single conversion every other color computation goes through: gamma-encoded sRGB
// in [0,1] → linear RGB → CIE XYZ (D65) → CIE L*a*b*.
//
// Key principles:
// 1.  **One Conversion Path**: Both the float entry point (`rgb_to_lab`) and the byte
//     LUT path in `pixel` feed `linear_rgb_to_lab`, so the two agree bit for bit.
// 2.  **Purity**: No state, no error conditions. Inputs outside [0,1] are not guarded;
//     callers normalize first.
// 3.  **Perceptual Distance**: `Lab::delta_e` is the plain Euclidean (CIE76) distance.

pub mod lab {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    pub type Lightness = f64;
    pub type DeltaE = f64;

    /// D65 reference white in XYZ.
    pub const WHITE_POINT_D65: (f64, f64, f64) = (0.95047, 1.0, 1.08883);

    const SRGB_GAMMA_KNEE: f64 = 0.04045;
    const LAB_EPSILON: f64 = 0.008856;
    const LAB_LINEAR_SLOPE: f64 = 7.787;
    const LAB_LINEAR_OFFSET: f64 = 16.0 / 116.0;

    /// A CIE L*a*b* triple. `l` is nominally 0..100; `a` and `b` stay within roughly ±128.
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Lab {
        pub l: Lightness,
        pub a: f64,
        pub b: f64,
    }

    impl Lab {
        pub const fn new(l: Lightness, a: f64, b: f64) -> Self {
            Self { l, a, b }
        }

        /// Euclidean distance in LAB space.
        pub fn delta_e(&self, other: &Lab) -> DeltaE {
            ((self.l - other.l).powi(2) + (self.a - other.a).powi(2) + (self.b - other.b).powi(2))
                .sqrt()
        }
    }

    impl fmt::Display for Lab {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "L*{:.1} a*{:.1} b*{:.1}", self.l, self.a, self.b)
        }
    }

    /// Inverse sRGB transfer function on a normalized channel.
    #[inline]
    pub fn srgb_to_linear(channel: f64) -> f64 {
        if channel > SRGB_GAMMA_KNEE {
            ((channel + 0.055) / 1.055).powf(2.4)
        } else {
            channel / 12.92
        }
    }

    /// Converts gamma-encoded sRGB channels in [0,1] to LAB.
    pub fn rgb_to_lab(red: f64, green: f64, blue: f64) -> Lab {
        linear_rgb_to_lab(
            srgb_to_linear(red),
            srgb_to_linear(green),
            srgb_to_linear(blue),
        )
    }

    /// Converts already-linearized RGB channels in [0,1] to LAB.
    pub fn linear_rgb_to_lab(red: f64, green: f64, blue: f64) -> Lab {
        let x = red * 0.4124564 + green * 0.3575761 + blue * 0.1804375;
        let y = red * 0.2126729 + green * 0.7151522 + blue * 0.0721750;
        let z = red * 0.0193339 + green * 0.1191920 + blue * 0.9503041;

        let fx = lab_f(x / WHITE_POINT_D65.0);
        let fy = lab_f(y / WHITE_POINT_D65.1);
        let fz = lab_f(z / WHITE_POINT_D65.2);

        Lab {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        }
    }

    #[inline]
    fn lab_f(t: f64) -> f64 {
        if t > LAB_EPSILON {
            t.cbrt()
        } else {
            LAB_LINEAR_SLOPE * t + LAB_LINEAR_OFFSET
        }
    }
}

#[cfg(test)]
mod tests {
    use super::lab::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn white_maps_to_full_lightness() {
        let white = rgb_to_lab(1.0, 1.0, 1.0);
        assert_abs_diff_eq!(white.l, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(white.a, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(white.b, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn black_maps_to_zero_lightness() {
        let black = rgb_to_lab(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(black.l, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(black.a, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(black.b, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn lightness_stays_in_nominal_range() {
        let steps = [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0];
        for &r in &steps {
            for &g in &steps {
                for &b in &steps {
                    let lab = rgb_to_lab(r, g, b);
                    assert!(lab.l >= -1e-6 && lab.l <= 100.0 + 1e-3, "{r} {g} {b} -> {lab:?}");
                }
            }
        }
    }

    #[test]
    fn conversion_is_deterministic() {
        assert_eq!(rgb_to_lab(0.8, 0.6, 0.5), rgb_to_lab(0.8, 0.6, 0.5));
    }

    #[test]
    fn pure_red_matches_reference() {
        // Reference values for sRGB red under D65.
        let red = rgb_to_lab(1.0, 0.0, 0.0);
        assert_abs_diff_eq!(red.l, 53.24, epsilon = 0.05);
        assert_abs_diff_eq!(red.a, 80.09, epsilon = 0.1);
        assert_abs_diff_eq!(red.b, 67.20, epsilon = 0.1);
    }

    #[test]
    fn dark_channels_use_linear_segment() {
        assert_abs_diff_eq!(srgb_to_linear(0.04), 0.04 / 12.92, epsilon = 1e-12);
        let near_black = rgb_to_lab(0.01, 0.01, 0.01);
        assert!(near_black.l > 0.0 && near_black.l < 1.0);
    }

    #[test]
    fn delta_e_is_euclidean() {
        let a = Lab::new(50.0, 0.0, 0.0);
        let b = Lab::new(53.0, 4.0, 0.0);
        assert_abs_diff_eq!(a.delta_e(&b), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.delta_e(&a), 5.0, epsilon = 1e-12);
    }
}
