//! Presentation timestamps for emitted frames
//!
//! Timestamps count in the active time scale: the native sample rate of the
//! codec, or an external scale imposed upstream. Rescaled increments are
//! truncated per frame, so every frame of a stream gets the same duration and
//! a timestamp is always `frames * frame_duration`.

use tracing::debug;

/// Frame-ordinal to timestamp conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackClock {
    sample_rate: u32,
    samples_per_frame: u32,
    timescale: Option<u32>,
    current: u64,
}

impl PlaybackClock {
    /// Create a clock at timestamp 0.
    ///
    /// `timescale` is the external scale, if any; a zero scale is ignored.
    pub fn new(sample_rate: u32, samples_per_frame: u32, timescale: Option<u32>) -> Self {
        Self {
            sample_rate,
            samples_per_frame,
            timescale: timescale.filter(|scale| *scale > 0),
            current: 0,
        }
    }

    /// Units per second of the timestamps this clock produces.
    pub fn timescale(&self) -> u32 {
        self.timescale.unwrap_or(self.sample_rate)
    }

    /// Whether an external time scale is in effect.
    pub fn is_external(&self) -> bool {
        self.timescale.is_some()
    }

    /// Convert a native sample count to the active time scale, truncating.
    pub fn rescale(&self, samples: u64) -> u64 {
        match self.timescale {
            Some(scale) if self.sample_rate > 0 => samples * scale as u64 / self.sample_rate as u64,
            _ => samples,
        }
    }

    /// Duration of one frame in the active time scale.
    pub fn frame_duration(&self) -> u64 {
        self.rescale(self.samples_per_frame as u64)
    }

    /// Advance past a frame of `nominal_frame_duration` native samples.
    pub fn advance(&mut self, nominal_frame_duration: u32) {
        self.current += self.rescale(nominal_frame_duration as u64);
    }

    /// Advance past one nominal frame.
    pub fn advance_frame(&mut self) {
        self.advance(self.samples_per_frame);
    }

    pub fn current_timestamp(&self) -> u64 {
        self.current
    }

    /// Timestamp of frame number `frames` counted from stream start.
    pub fn timestamp_of_frame(&self, frames: u64) -> u64 {
        frames * self.frame_duration()
    }

    /// `seconds` expressed in the active time scale, truncating.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.timescale() as f64) as u64
    }

    /// Jump to `timestamp` (seek or restart).
    pub fn reset_to(&mut self, timestamp: u64) {
        self.current = timestamp;
    }

    /// Adopt an upstream-provided timestamp without ever moving backwards.
    pub fn reanchor(&mut self, timestamp: u64) {
        if timestamp >= self.current {
            self.current = timestamp;
        } else {
            debug!(
                upstream = timestamp,
                current = self.current,
                "Ignoring upstream timestamp behind the clock"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn native_clock_counts_samples() {
        let mut clock = PlaybackClock::new(8000, 160, None);
        clock.advance_frame();
        clock.advance_frame();
        assert_eq!(clock.current_timestamp(), 320);
        assert_eq!(clock.timescale(), 8000);
        assert!(!clock.is_external());
    }

    #[test]
    fn external_scale_converts_each_frame() {
        let mut clock = PlaybackClock::new(16000, 320, Some(90000));
        clock.advance_frame();
        assert_eq!(clock.current_timestamp(), 1800);
        assert_eq!(clock.timescale(), 90000);
    }

    #[test]
    fn rescaled_increment_truncates() {
        // 160 * 1001 / 8000 = 20.02
        let mut clock = PlaybackClock::new(8000, 160, Some(1001));
        for _ in 0..50 {
            clock.advance_frame();
        }
        assert_eq!(clock.current_timestamp(), 1000);
        assert_eq!(clock.timestamp_of_frame(50), 1000);
    }

    #[test]
    fn zero_timescale_is_native() {
        let clock = PlaybackClock::new(8000, 160, Some(0));
        assert!(!clock.is_external());
        assert_eq!(clock.frame_duration(), 160);
    }

    #[test]
    fn reanchor_never_rewinds() {
        let mut clock = PlaybackClock::new(8000, 160, Some(1000));
        clock.reanchor(500);
        assert_eq!(clock.current_timestamp(), 500);
        clock.reanchor(100);
        assert_eq!(clock.current_timestamp(), 500);
    }

    #[test]
    fn seconds_to_ticks() {
        let clock = PlaybackClock::new(8000, 160, None);
        assert_eq!(clock.seconds_to_ticks(1.5), 12000);
        assert_eq!(clock.seconds_to_ticks(-3.0), 0);
    }

    proptest! {
        #[test]
        fn advancing_matches_frame_ordinal(
            frames in 0u64..5000,
            scale in prop::option::of(1u32..200_000),
            wideband in any::<bool>(),
        ) {
            let (rate, spf) = if wideband { (16000, 320) } else { (8000, 160) };
            let mut clock = PlaybackClock::new(rate, spf, scale);
            for _ in 0..frames {
                clock.advance_frame();
            }
            prop_assert_eq!(clock.current_timestamp(), clock.timestamp_of_frame(frames));
        }

        #[test]
        fn timestamps_strictly_increase_on_native_clock(frames in 1u64..1000) {
            let mut clock = PlaybackClock::new(8000, 160, None);
            let mut last = clock.current_timestamp();
            for _ in 0..frames {
                clock.advance_frame();
                prop_assert!(clock.current_timestamp() > last);
                last = clock.current_timestamp();
            }
        }
    }
}
