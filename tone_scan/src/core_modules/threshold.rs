// THEORY:
// Every ratio judgment in the crate is a ladder: an ordered list of rungs, each a lower
// bound and a category, evaluated top to bottom with the first admitting rung winning.
// The classifiers only hold data (`const` ladders); this module holds the walk.
//
// `PercentBand` is the companion type for the randomized estimate each category carries.

use rand::Rng;
use serde::Serialize;

/// Lower-bound condition of a rung.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Bound {
    /// Strictly greater than the value.
    Above(f64),
    /// Greater than or equal to the value.
    AtLeast(f64),
    /// Always admits; closes the ladder.
    Otherwise,
}

impl Bound {
    #[inline]
    pub fn admits(&self, value: f64) -> bool {
        match *self {
            Bound::Above(limit) => value > limit,
            Bound::AtLeast(limit) => value >= limit,
            Bound::Otherwise => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rung<T> {
    pub bound: Bound,
    pub value: T,
}

impl<T> Rung<T> {
    pub const fn new(bound: Bound, value: T) -> Self {
        Self { bound, value }
    }
}

/// Ordered, first-match-wins lookup table.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdLadder<T: 'static> {
    rungs: &'static [Rung<T>],
}

impl<T: 'static> ThresholdLadder<T> {
    pub const fn new(rungs: &'static [Rung<T>]) -> Self {
        Self { rungs }
    }

    pub fn rungs(&self) -> &'static [Rung<T>] {
        self.rungs
    }

    /// Returns the first rung admitting `value`. NaN only matches `Otherwise`.
    pub fn classify(&self, value: f64) -> Option<&'static T> {
        self.rungs
            .iter()
            .find(|rung| rung.bound.admits(value))
            .map(|rung| &rung.value)
    }
}

/// Half-open percentage range `[low, high)` a category's estimate is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentBand {
    pub low: f64,
    pub high: f64,
}

impl PercentBand {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const GRADE_RUNGS: &[Rung<char>] = &[
        Rung::new(Bound::AtLeast(0.9), 'A'),
        Rung::new(Bound::Above(0.8), 'B'),
        Rung::new(Bound::Otherwise, 'C'),
    ];
    const GRADES: ThresholdLadder<char> = ThresholdLadder::new(GRADE_RUNGS);

    const OPEN_ENDED_RUNGS: &[Rung<u8>] = &[Rung::new(Bound::Above(1.0), 1)];
    const OPEN_ENDED: ThresholdLadder<u8> = ThresholdLadder::new(OPEN_ENDED_RUNGS);

    #[test]
    fn first_matching_rung_wins() {
        assert_eq!(GRADES.classify(0.95), Some(&'A'));
        assert_eq!(GRADES.classify(0.9), Some(&'A'));
        assert_eq!(GRADES.classify(0.85), Some(&'B'));
        assert_eq!(GRADES.classify(0.8), Some(&'C'));
        assert_eq!(GRADES.classify(-3.0), Some(&'C'));
    }

    #[test]
    fn nan_only_reaches_the_fallback() {
        assert_eq!(GRADES.classify(f64::NAN), Some(&'C'));
        assert_eq!(OPEN_ENDED.classify(f64::NAN), None);
    }

    #[test]
    fn ladder_without_fallback_can_miss() {
        assert_eq!(OPEN_ENDED.classify(0.5), None);
        assert_eq!(OPEN_ENDED.classify(1.5), Some(&1));
    }

    #[test]
    fn band_draws_stay_in_range() {
        let band = PercentBand::new(8.0, 13.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert!(band.contains(band.draw(&mut rng)));
        }
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let band = PercentBand::new(18.0, 24.0);
        let first = band.draw(&mut StdRng::seed_from_u64(42));
        let second = band.draw(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }
}
