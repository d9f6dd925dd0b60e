// THEORY:
// The match scorer is the comparative half of the color pipeline. A `Lab` on its own
// says nothing; the scorer turns the distance between a skin-tone estimate and the
// chosen target into a bounded percentage.
//
// score = round(clamp(100 - 2 * deltaE, 0, 100))
//
// The mapping is monotonic and symmetric. deltaE = 0 gives 100 and anything at or
// beyond deltaE = 50 gives 0.

pub mod match_scorer {
    use crate::core_modules::lab::lab::{DeltaE, Lab};
    use serde::Serialize;
    use std::fmt;

    const POINTS_PER_DELTA_E: f64 = 2.0;

    /// Integer match percentage in `0..=100`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
    pub struct MatchScore(u8);

    impl MatchScore {
        pub const PERFECT: MatchScore = MatchScore(100);

        pub fn percent(self) -> u8 {
            self.0
        }

        /// True when the score falls below `threshold`, the point where nutrition tips
        /// are offered alongside the result.
        pub fn suggests_nutrition_tips(self, threshold: u8) -> bool {
            self.0 < threshold
        }
    }

    impl fmt::Display for MatchScore {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}%", self.0)
        }
    }

    pub fn delta_e(estimate: &Lab, target: &Lab) -> DeltaE {
        estimate.delta_e(target)
    }

    pub fn score(estimate: &Lab, target: &Lab) -> MatchScore {
        score_from_delta_e(delta_e(estimate, target))
    }

    pub fn score_from_delta_e(delta: DeltaE) -> MatchScore {
        let percent = (100.0 - POINTS_PER_DELTA_E * delta).clamp(0.0, 100.0).round();
        // NaN saturates to 0.
        MatchScore(percent as u8)
    }
}
