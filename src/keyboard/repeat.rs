//! Key repeat scheduling
//!
//! The decoder only records when the next synthetic press is due; the run
//! loop is responsible for waking up and firing it.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRepeat {
    pub active: bool,
    /// XKB keycode (evdev code + 8) of the repeating key.
    pub keycode: u32,
    pub next: Option<Instant>,
    /// Repeats per second. Zero disables repeat.
    pub rate: u32,
    /// Milliseconds before the first repeat.
    pub delay: u32,
}

impl KeyRepeat {
    pub fn set_info(&mut self, rate: i32, delay: i32) {
        self.rate = rate.max(0) as u32;
        self.delay = delay.max(0) as u32;
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay as u64)
    }

    /// Interval between repeats once the delay has passed.
    pub fn period(&self) -> Duration {
        if self.rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.rate
        }
    }

    pub fn arm(&mut self, keycode: u32, now: Instant) {
        self.active = true;
        self.keycode = keycode;
        self.next = Some(now + self.delay());
    }

    /// Handle the release of `keycode`.
    ///
    /// Releasing the repeating key stops repeat. Releasing any other key
    /// pushes the pending repeat back by the delay and keeps it armed.
    pub fn release(&mut self, keycode: u32, now: Instant) {
        if keycode == self.keycode {
            self.active = false;
        } else {
            self.next = Some(now + self.delay());
        }
    }

    /// Keycode to fire if a repeat is due at `now`.
    pub fn due(&self, now: Instant) -> Option<u32> {
        match self.next {
            Some(next) if self.active && now >= next => Some(self.keycode),
            _ => None,
        }
    }

    /// When the next repeat is due, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.next.filter(|_| self.active)
    }

    /// Schedule the following repeat after one has fired. A rate dropped to
    /// zero while armed stops repeat.
    pub fn fired(&mut self, now: Instant) {
        if self.rate == 0 {
            self.active = false;
        } else if self.active {
            self.next = Some(now + self.period());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat() -> KeyRepeat {
        let mut repeat = KeyRepeat::default();
        repeat.set_info(25, 600);
        repeat
    }

    #[test]
    fn test_arm_schedules_after_delay() {
        let now = Instant::now();
        let mut repeat = repeat();
        repeat.arm(38, now);
        assert!(repeat.active);
        assert_eq!(repeat.keycode, 38);
        assert_eq!(repeat.next, Some(now + Duration::from_millis(600)));
        assert_eq!(repeat.deadline(), Some(now + Duration::from_millis(600)));
    }

    #[test]
    fn test_release_of_repeating_key_disarms() {
        let now = Instant::now();
        let mut repeat = repeat();
        repeat.arm(38, now);
        repeat.release(38, now);
        assert!(!repeat.active);
        assert_eq!(repeat.due(now + Duration::from_secs(5)), None);
        assert_eq!(repeat.deadline(), None);
    }

    #[test]
    fn test_release_of_other_key_refreshes_deadline() {
        let start = Instant::now();
        let mut repeat = repeat();
        repeat.arm(38, start);

        let later = start + Duration::from_millis(300);
        repeat.release(9, later);
        assert!(repeat.active);
        assert_eq!(repeat.keycode, 38);
        assert_eq!(repeat.next, Some(later + Duration::from_millis(600)));
    }

    #[test]
    fn test_due_and_fired() {
        let start = Instant::now();
        let mut repeat = repeat();
        repeat.arm(38, start);
        assert_eq!(repeat.due(start), None);

        let at = start + Duration::from_millis(600);
        assert_eq!(repeat.due(at), Some(38));
        repeat.fired(at);
        // 25 repeats per second.
        assert_eq!(repeat.next, Some(at + Duration::from_millis(40)));
    }

    #[test]
    fn test_negative_info_is_clamped() {
        let mut repeat = KeyRepeat::default();
        repeat.set_info(-1, -100);
        assert_eq!(repeat.rate, 0);
        assert_eq!(repeat.delay, 0);
        assert_eq!(repeat.period(), Duration::ZERO);
    }

    #[test]
    fn test_fast_rate_keeps_sub_millisecond_period() {
        let mut repeat = KeyRepeat::default();
        repeat.set_info(2000, 100);
        assert_eq!(repeat.period(), Duration::from_micros(500));

        repeat.set_info(3, 100);
        assert_eq!(repeat.period(), Duration::from_nanos(333_333_333));
    }

    #[test]
    fn test_rate_dropped_to_zero_stops_armed_repeat() {
        let start = Instant::now();
        let mut repeat = repeat();
        repeat.arm(38, start);
        repeat.set_info(0, 600);

        let at = start + Duration::from_millis(600);
        assert_eq!(repeat.due(at), Some(38));
        repeat.fired(at);
        assert!(!repeat.active);
        assert_eq!(repeat.deadline(), None);
    }
}
