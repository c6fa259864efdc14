//! Linear ramp between two values over a fixed duration.

// -------------------------------------------------------------------------------------------------

/// A linear interpolation from `start` to `end` over `duration` seconds, holding `end`
/// afterwards. Used for all timed "macro + fine" offsets and gain multipliers of an operator.
///
/// The ramp can be sampled at arbitrary points in time via [`Self::value_at`], or run sample
/// by sample via [`Self::run`], which advances an internal elapsed time counter.
#[derive(Debug, Clone)]
pub struct RampSegment {
    start: f32,
    end: f32,
    duration: f32,
    elapsed: f64,
    time_step: f64,
}

impl RampSegment {
    /// Durations below this value get clamped.
    pub const MIN_DURATION: f32 = 0.001;

    /// Create a new, flat ramp at zero for the given sample rate.
    pub fn new(sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            start: 0.0,
            end: 0.0,
            duration: Self::MIN_DURATION,
            elapsed: 0.0,
            time_step: 1.0 / sample_rate.max(1) as f64,
        }
    }

    /// Create a new ramp with the given segment values.
    pub fn with_segment(sample_rate: u32, start: f32, end: f32, duration: f32) -> Self {
        let mut ramp = Self::new(sample_rate);
        ramp.configure(start, end, duration);
        ramp
    }

    /// Start value.
    #[inline]
    pub fn start(&self) -> f32 {
        self.start
    }
    /// End value.
    #[inline]
    pub fn end(&self) -> f32 {
        self.end
    }
    /// Duration in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }
    /// Elapsed time in seconds since the last restart.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    /// Set new segment values. Durations below [`Self::MIN_DURATION`] or invalid durations are
    /// clamped. Does not touch the elapsed time.
    pub fn configure(&mut self, start: f32, end: f32, duration: f32) {
        self.start = start;
        self.end = end;
        self.duration = if duration.is_finite() {
            duration.max(Self::MIN_DURATION)
        } else {
            Self::MIN_DURATION
        };
    }

    /// Reset elapsed time to zero.
    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    /// True when the elapsed time passed the ramp's duration.
    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration as f64
    }

    /// Ramp value at the given time in seconds. Times are clamped to `[0, duration]`.
    #[inline]
    pub fn value_at(&self, time: f32) -> f32 {
        // negative or NaN
        if !(time > 0.0) {
            return self.start;
        }
        if time >= self.duration {
            return self.end;
        }
        self.start + (self.end - self.start) * (time / self.duration)
    }

    /// Ramp value at the current elapsed time.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value_at(self.elapsed as f32)
    }

    /// Return the value at the current elapsed time and advance by one sample.
    #[inline]
    pub fn run(&mut self) -> f32 {
        let value = self.value();
        if !self.is_finished() {
            self.elapsed += self.time_step;
        }
        value
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    #[test]
    fn interpolation() {
        for (start, end, duration) in [(0.0, 1.0, 1.0), (1.0, 0.5, 1.2), (-12.0, 12.0, 300.0)] {
            let ramp = RampSegment::with_segment(44100, start, end, duration);
            for step in 0..=10 {
                let t = duration * step as f32 / 10.0;
                assert_eq_with_epsilon!(
                    ramp.value_at(t),
                    start + (end - start) * t / duration,
                    1e-4
                );
            }
            assert_eq!(ramp.value_at(duration + 1.0), end);
            assert_eq!(ramp.value_at(duration * 1000.0), end);
            assert_eq!(ramp.value_at(-1.0), start);
            assert_eq!(ramp.value_at(f32::NAN), start);
        }
    }

    #[test]
    fn duration_clamping() {
        let mut ramp = RampSegment::new(48000);
        ramp.configure(0.0, 1.0, 0.0);
        assert_eq!(ramp.duration(), RampSegment::MIN_DURATION);
        ramp.configure(0.0, 1.0, -5.0);
        assert_eq!(ramp.duration(), RampSegment::MIN_DURATION);
        ramp.configure(0.0, 1.0, f32::INFINITY);
        assert_eq!(ramp.duration(), RampSegment::MIN_DURATION);
        assert_eq!(ramp.value_at(0.01), 1.0);
    }

    #[test]
    fn run_and_restart() {
        let sample_rate = 1000;
        let mut ramp = RampSegment::with_segment(sample_rate, 1.0, 0.0, 0.1);
        assert_eq!(ramp.run(), 1.0);
        for _ in 0..49 {
            ramp.run();
        }
        assert_eq_with_epsilon!(ramp.value(), 0.5, 1e-3);
        for _ in 0..100 {
            ramp.run();
        }
        assert!(ramp.is_finished());
        assert_eq!(ramp.run(), 0.0);
        // keeps holding the end value
        let elapsed = ramp.elapsed();
        ramp.run();
        assert_eq!(ramp.elapsed(), elapsed);

        ramp.restart();
        assert_eq!(ramp.elapsed(), 0.0);
        assert_eq!(ramp.value(), 1.0);
    }
}
