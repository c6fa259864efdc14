use std::fmt::Debug;

use crate::utils::{buffer::scale_buffer, panning_factors};

// -------------------------------------------------------------------------------------------------

/// Provides smooth transitions between a current and target f32 value, to avoid clicks when
/// changing gain or panning parameters while audio is running.
pub trait SmoothedValue: Debug {
    /// Access to the current, possibly ramped value.
    #[must_use]
    fn current(&self) -> f32;
    /// Access to the target value.
    #[must_use]
    fn target(&self) -> f32;

    /// Ramp, if needed, and get the current ramped value, else returns the target value.
    #[must_use]
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// Test if ramping is necessary. When no ramping is needed, the target value may be
    /// applied to whole blocks at once.
    #[must_use]
    fn need_ramp(&self) -> bool;
    /// Move current towards the target value.
    fn ramp(&mut self);

    /// Set current and target to the same value.
    fn init(&mut self, value: f32);
    /// Set a new target value.
    fn set_target(&mut self, target: f32);
}

// -------------------------------------------------------------------------------------------------

/// Apply a smoothed gain value to an interleaved buffer with the given channel count.
pub fn apply_smoothed_gain(
    buffer: &mut [f32],
    channel_count: usize,
    smoothed: &mut impl SmoothedValue,
) {
    if smoothed.need_ramp() {
        for frame in buffer.chunks_exact_mut(channel_count) {
            let gain = smoothed.next();
            for sample in frame {
                *sample *= gain;
            }
        }
    } else {
        let gain = smoothed.target();
        if (1.0 - gain).abs() > 0.000001 {
            scale_buffer(buffer, gain);
        }
    }
}

/// Apply a smoothed balance panning value in range `[-1, 1]` to an interleaved stereo buffer.
pub fn apply_smoothed_panning(buffer: &mut [f32], smoothed: &mut impl SmoothedValue) {
    if smoothed.need_ramp() {
        for frame in buffer.chunks_exact_mut(2) {
            let (pan_l, pan_r) = panning_factors(smoothed.next());
            frame[0] *= pan_l;
            frame[1] *= pan_r;
        }
    } else {
        let pan = smoothed.target();
        if pan.abs() > 0.000001 {
            let (pan_l, pan_r) = panning_factors(pan);
            for frame in buffer.chunks_exact_mut(2) {
                frame[0] *= pan_l;
                frame[1] *= pan_r;
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Exponential smoothed value, approaching the target with a configurable inertia.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    inertia: f32,
    sample_rate_comp: f32,
}

impl ExponentialSmoothedValue {
    pub const DEFAULT_INERTIA: f32 = 0.02;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        Self::with_inertia(value, Self::DEFAULT_INERTIA, sample_rate)
    }

    pub fn with_inertia(value: f32, inertia: f32, sample_rate: u32) -> Self {
        debug_assert!(inertia > 0.0 && inertia <= 1.0, "Invalid inertia");
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        Self {
            current: value,
            target: value,
            inertia: inertia.clamp(f32::EPSILON, 1.0),
            sample_rate_comp: 44100.0 / sample_rate.max(1) as f32,
        }
    }

    #[inline(always)]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn reset(&mut self) {
        self.init(self.target);
    }

    #[inline(always)]
    fn step(&self) -> f32 {
        ((self.target - self.current) * self.inertia * self.sample_rate_comp)
            .clamp(-(self.target - self.current).abs(), (self.target - self.current).abs())
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    fn need_ramp(&self) -> bool {
        const EPSILON: f32 = f32::EPSILON * 100.0;
        self.step().abs() > EPSILON
    }

    fn ramp(&mut self) {
        self.current += self.step();
    }

    fn init(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        if !self.need_ramp() {
            self.current = self.target;
        }
    }
}

// -------------------------------------------------------------------------------------------------
