// THEORY:
// The `StabilityCounter` gives a scan "memory" across frames, the only state that
// survives from one detector callback to the next. It debounces pose locks: a
// classification fires only after `required` consecutive frames pass the visibility
// gate, and any failing frame sends the count back to zero.
//
// Lifecycle:
// - **Accumulate**: `record_valid` on every frame that passes the gate.
// - **Reset**: `reset` on a failing frame and again after a successful classification,
//   so no debounce progress leaks into the next scan.

pub const DEFAULT_REQUIRED_FRAMES: u32 = 15;
pub const STEADY_REQUIRED_FRAMES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityCounter {
    count: u32,
    required: u32,
}

impl StabilityCounter {
    /// A requirement of zero behaves like one: at least one valid frame is always needed.
    pub fn new(required: u32) -> Self {
        Self {
            count: 0,
            required: required.max(1),
        }
    }

    /// Counts one valid frame and reports whether the requirement is now met.
    pub fn record_valid(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.is_stable()
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn is_stable(&self) -> bool {
        self.count >= self.required
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn required(&self) -> u32 {
        self.required
    }
}

impl Default for StabilityCounter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_the_required_frame() {
        let mut counter = StabilityCounter::new(3);
        assert!(!counter.record_valid());
        assert!(!counter.record_valid());
        assert!(counter.record_valid());
    }

    #[test]
    fn invalid_frame_requires_a_fresh_run() {
        let n = DEFAULT_REQUIRED_FRAMES;
        let mut counter = StabilityCounter::default();
        for _ in 0..n - 1 {
            assert!(!counter.record_valid());
        }
        counter.reset();
        assert_eq!(counter.count(), 0);
        for _ in 0..n - 1 {
            assert!(!counter.record_valid());
        }
        assert!(counter.record_valid());
    }

    #[test]
    fn zero_requirement_still_needs_one_frame() {
        let mut counter = StabilityCounter::new(0);
        assert!(!counter.is_stable());
        assert!(counter.record_valid());
    }
}
