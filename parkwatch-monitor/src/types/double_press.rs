//! Double-press detection for the siren test key.
//!
//! ```text
//!  gap <  50 ms          bounce, ignored (marker kept)
//!  50 ms <= gap < 500 ms double press (marker cleared)
//!  gap >= 500 ms         independent single press
//! ```
//!
//! After a press, a single deadline [`deadline`](DoublePressDetector::deadline)
//! is pending; once it passes, [`expire`](DoublePressDetector::expire)
//! forgets the press so a late third press opens a fresh window instead
//! of chaining into a false double.

use std::time::Duration;

use tokio::time::Instant;

use crate::api_client::types::PressKind;

pub const BOUNCE_WINDOW: Duration = Duration::from_millis(50);
pub const DOUBLE_PRESS_WINDOW: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct DoublePressDetector {
    min_gap: Duration,
    max_gap: Duration,
    last_press: Option<Instant>,
}

impl Default for DoublePressDetector {
    fn default() -> Self {
        Self::new(BOUNCE_WINDOW, DOUBLE_PRESS_WINDOW)
    }
}

impl DoublePressDetector {
    pub fn new(min_gap: Duration, max_gap: Duration) -> Self {
        Self {
            min_gap,
            max_gap,
            last_press: None,
        }
    }

    /// Classify a press of the designated key at `now`.
    ///
    /// Never returns [`PressKind::Ignored`]; key filtering is the
    /// caller's job.
    pub fn press(&mut self, now: Instant) -> PressKind {
        let Some(last) = self.last_press else {
            self.last_press = Some(now);
            return PressKind::Single;
        };

        let gap = now.saturating_duration_since(last);
        if gap < self.min_gap {
            PressKind::Bounce
        } else if gap < self.max_gap {
            self.last_press = None;
            PressKind::Double
        } else {
            self.last_press = Some(now);
            PressKind::Single
        }
    }

    /// When the pending press marker lapses, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_press.map(|last| last + self.max_gap)
    }

    /// Drop the marker if its window has passed.
    pub fn expire(&mut self, now: Instant) {
        if self.deadline().is_some_and(|deadline| deadline <= now) {
            self.last_press = None;
        }
    }

    pub fn reset(&mut self) {
        self.last_press = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test_case(300, PressKind::Double ; "inside window")]
    #[test_case(40, PressKind::Bounce ; "too fast")]
    #[test_case(600, PressKind::Single ; "too slow")]
    #[test_case(50, PressKind::Double ; "lower edge inclusive")]
    #[test_case(499, PressKind::Double ; "just inside upper edge")]
    #[test_case(500, PressKind::Single ; "upper edge exclusive")]
    fn classifies_second_press(gap_ms: u64, expected: PressKind) {
        let mut detector = DoublePressDetector::default();
        let start = Instant::now();

        assert_eq!(detector.press(start), PressKind::Single);
        assert_eq!(detector.press(start + ms(gap_ms)), expected);
    }

    #[test]
    fn third_press_after_double_does_not_retrigger() {
        let mut detector = DoublePressDetector::default();
        let start = Instant::now();

        detector.press(start);
        assert_eq!(detector.press(start + ms(200)), PressKind::Double);
        assert_eq!(detector.press(start + ms(350)), PressKind::Single);
    }

    #[test]
    fn bounce_keeps_original_marker() {
        let mut detector = DoublePressDetector::default();
        let start = Instant::now();

        detector.press(start);
        assert_eq!(detector.press(start + ms(20)), PressKind::Bounce);
        // Gap is measured from the first press, not the bounce.
        assert_eq!(detector.press(start + ms(120)), PressKind::Double);
    }

    #[test]
    fn expire_clears_marker_after_silence() {
        let mut detector = DoublePressDetector::default();
        let start = Instant::now();

        detector.press(start);
        assert_eq!(detector.deadline(), Some(start + DOUBLE_PRESS_WINDOW));

        detector.expire(start + ms(499));
        assert!(detector.deadline().is_some());

        detector.expire(start + ms(500));
        assert_eq!(detector.deadline(), None);
    }

    #[test]
    fn slow_presses_never_pair() {
        let mut detector = DoublePressDetector::default();
        let start = Instant::now();

        for i in 0..5 {
            assert_eq!(detector.press(start + ms(600 * i)), PressKind::Single);
        }
    }

    #[test]
    fn no_deadline_without_press() {
        let mut detector = DoublePressDetector::default();
        assert_eq!(detector.deadline(), None);
        detector.press(Instant::now());
        detector.reset();
        assert_eq!(detector.deadline(), None);
    }
}
