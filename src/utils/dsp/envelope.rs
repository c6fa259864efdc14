//! Envelope follower for detecting signal levels.

/// One-pole envelope follower with separate attack and release time constants. Feeds the
/// limiter's gain reduction.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    current_value: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: u32,
}

impl EnvelopeFollower {
    /// Create a new envelope follower with the given sample rate and time constants.
    pub fn new(sample_rate: u32, attack_time: f32, release_time: f32) -> Self {
        let mut follower = Self {
            current_value: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
        };
        follower.set_attack_time(attack_time);
        follower.set_release_time(release_time);
        follower
    }

    /// Set a new attack time constant in seconds.
    pub fn set_attack_time(&mut self, time: f32) {
        self.attack_coeff = Self::coefficient(time, self.sample_rate);
    }

    /// Set a new release time constant in seconds.
    pub fn set_release_time(&mut self, time: f32) {
        self.release_coeff = Self::coefficient(time, self.sample_rate);
    }

    /// Process a single input value and return the current envelope value.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let coeff = if input > self.current_value {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.current_value = input + coeff * (self.current_value - input);
        self.current_value
    }

    /// Current envelope value.
    pub fn value(&self) -> f32 {
        self.current_value
    }

    /// Reset the envelope follower to the given value.
    pub fn reset(&mut self, value: f32) {
        self.current_value = value;
    }

    fn coefficient(time: f32, sample_rate: u32) -> f32 {
        if time > 0.0 {
            (-1.0 / (time * sample_rate as f32)).exp()
        } else {
            0.0
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_and_release() {
        let mut follower = EnvelopeFollower::new(1000, 0.001, 0.07);
        let attacked = follower.process(10.0);
        assert!(attacked > 6.0 && attacked < 10.0);
        for _ in 0..100 {
            follower.process(10.0);
        }
        assert!((follower.value() - 10.0).abs() < 1e-3);
        let released = follower.process(0.0);
        assert!(released > 8.0 && released < 10.0);

        let mut instant = EnvelopeFollower::new(1000, 0.0, 0.0);
        assert_eq!(instant.process(3.0), 3.0);
        assert_eq!(instant.process(-1.0), -1.0);
        instant.reset(0.5);
        assert_eq!(instant.value(), 0.5);
    }
}
