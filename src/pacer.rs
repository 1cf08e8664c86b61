//! Frame-rate pacing for live output.

use std::thread;
use std::time::{Duration, Instant};

/// Time budget of one frame at `fps`: `1_000_000 / fps` microseconds.
pub fn frame_duration(fps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.max(1)))
}

/// How long to wait before the next frame, never negative.
pub fn remaining_delay(frame_duration: Duration, elapsed: Duration) -> Duration {
    frame_duration.saturating_sub(elapsed)
}

/// Spaces deliveries at least one frame duration apart.
///
/// When producing a frame takes longer than its budget the frame goes out
/// immediately. Later frames are not hurried to make up for it, so sustained
/// overload only lowers the effective frame rate.
#[derive(Debug)]
pub struct Pacer {
    frame_duration: Duration,
    last_mark: Instant,
}

impl Pacer {
    pub fn new(fps: u32) -> Self {
        Self {
            frame_duration: frame_duration(fps),
            last_mark: Instant::now(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Sleep out the rest of the current frame, run `deliver`, then start the next frame.
    pub fn pace<T>(&mut self, deliver: impl FnOnce() -> T) -> T {
        let remaining = remaining_delay(self.frame_duration, self.last_mark.elapsed());
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        let out = deliver();
        self.last_mark = Instant::now();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_uses_integer_micros() {
        assert_eq!(frame_duration(24), Duration::from_micros(41_666));
        assert_eq!(frame_duration(1), Duration::from_secs(1));
        assert_eq!(frame_duration(0), Duration::from_secs(1));
    }

    #[test]
    fn remaining_is_zero_once_budget_is_spent() {
        let d = frame_duration(24);
        assert_eq!(remaining_delay(d, d), Duration::ZERO);
        assert_eq!(remaining_delay(d, d + Duration::from_millis(500)), Duration::ZERO);
    }

    #[test]
    fn remaining_is_budget_minus_elapsed() {
        let d = Duration::from_millis(40);
        assert_eq!(remaining_delay(d, Duration::ZERO), d);
        assert_eq!(remaining_delay(d, Duration::from_millis(15)), Duration::from_millis(25));
    }

    #[test]
    fn consecutive_frames_are_spaced() {
        let mut pacer = Pacer::new(50);
        pacer.pace(|| ());
        let first = Instant::now();
        pacer.pace(|| ());
        assert!(first.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn late_frame_goes_out_at_once_and_the_next_one_waits() {
        let mut pacer = Pacer::new(50);
        let d = pacer.frame_duration();
        pacer.pace(|| ());

        // Caller overran the 20ms budget threefold.
        thread::sleep(Duration::from_millis(60));
        let late = Instant::now();
        assert_eq!(pacer.pace(|| 7), 7);
        assert!(late.elapsed() < d / 2, "late frame waited {:?}", late.elapsed());

        // The budget restarts from the late delivery; there is no catch-up burst.
        let next = Instant::now();
        pacer.pace(|| ());
        assert!(next.elapsed() >= d - Duration::from_millis(1), "next frame waited {:?}", next.elapsed());
    }
}
