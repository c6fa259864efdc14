//! Delay buffers to delay or lookup signals.

// -------------------------------------------------------------------------------------------------

/// Multi channel delay line buffer with fractional delay time support.
///
/// Delay lines are allocated once with a maximum delay time: reading and writing never
/// allocates, so they can be used in the audio thread.
#[derive(Debug, Default, Clone)]
pub struct DelayLine<const CHANNELS: usize> {
    buffer: Vec<f32>,
    buffer_mask: usize,
    write_pos: usize,
}

impl<const CHANNELS: usize> DelayLine<CHANNELS> {
    /// Create a new delay buffer with the given max delay time in sample frames.
    pub fn new(max_delay_frames: usize) -> Self {
        let (buffer, buffer_mask) = if max_delay_frames > 0 {
            let buffer_frames = (max_delay_frames + 1).next_power_of_two();
            (vec![0.0; buffer_frames * CHANNELS], buffer_frames - 1)
        } else {
            (vec![0.0; CHANNELS], 0)
        };
        let write_pos = 0;
        Self {
            buffer,
            buffer_mask,
            write_pos,
        }
    }

    /// Max supported delay in frames.
    pub fn max_delay_frames(&self) -> usize {
        self.buffer_mask
    }

    /// Reset the delay buffer and write position.
    pub fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Read a frame which got written `delay_pos` frames ago, interpolating linearly between
    /// frames. Delays are clamped to the delay line's max delay.
    #[inline]
    pub fn read(&self, delay_pos: f32) -> [f32; CHANNELS] {
        let delay_pos = delay_pos.clamp(1.0, self.max_delay_frames().max(1) as f32);

        let read_pos = self.write_pos as f32 - delay_pos;

        let read_pos_floor = read_pos.floor();
        let fraction = read_pos - read_pos_floor;

        let index1 = read_pos_floor as isize;
        let index2 = index1 + 1;

        let mut output = [0.0; CHANNELS];
        #[allow(clippy::needless_range_loop)]
        for ch in 0..CHANNELS {
            let sample_index1 = ((index1 as usize) & self.buffer_mask) * CHANNELS + ch;
            let sample_index2 = ((index2 as usize) & self.buffer_mask) * CHANNELS + ch;

            let val1 = self.buffer[sample_index1];
            let val2 = self.buffer[sample_index2];

            output[ch] = val1 + (val2 - val1) * fraction;
        }
        output
    }

    /// Write a new frame and advance the write position.
    #[inline]
    pub fn write(&mut self, frame: [f32; CHANNELS]) {
        let write_sample_index = self.write_pos * CHANNELS;
        self.buffer[write_sample_index..write_sample_index + CHANNELS].copy_from_slice(&frame);
        self.write_pos = (self.write_pos + 1) & self.buffer_mask;
    }

    /// Process and add a single new sample frame and return the delayed sample with the given
    /// feedback.
    #[inline]
    pub fn process_sample(
        &mut self,
        input: [f32; CHANNELS],
        feedback: f32,
        delay_pos: f32,
    ) -> [f32; CHANNELS] {
        let output = self.read(delay_pos);
        let mut frame = input;
        for (f, o) in frame.iter_mut().zip(output) {
            *f += o * feedback;
        }
        self.write(frame);
        output
    }
}

// -------------------------------------------------------------------------------------------------

/// Multi channel delay line which delays an input signal and keeps track of all channel's
/// peak values within the delay window. Used as lookahead buffer in the limiter.
///
/// The buffer is allocated for a maximum delay time; the actual delay can be changed without
/// reallocating.
#[derive(Debug, Default)]
pub struct LookupDelayLine<const CHANNELS: usize> {
    buffer: Vec<f32>,
    write_pos: usize,
    buffer_mask: usize,
    delay_frames: usize,
    peak_value: f32,
    peak_pos: usize,
}

impl<const CHANNELS: usize> LookupDelayLine<CHANNELS> {
    /// Create a new lookup delay for the given max delay time in seconds.
    pub fn new(sample_rate: u32, max_delay_time: f32, delay_time: f32) -> Self {
        let max_delay_frames = (max_delay_time.max(0.0) * sample_rate as f32).ceil() as usize;
        let buffer_frames = (max_delay_frames + 1).next_power_of_two();
        let buffer = vec![0.0; buffer_frames * CHANNELS];
        let buffer_mask = buffer_frames - 1;
        let mut delay_line = Self {
            buffer,
            buffer_mask,
            write_pos: 0,
            delay_frames: 0,
            peak_value: 0.0,
            peak_pos: 0,
        };
        delay_line.set_delay_time(sample_rate, delay_time);
        delay_line
    }

    /// Current delay in frames.
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Set a new delay time in seconds, clamped to the max delay time. Flushes the delay
    /// line when the delay changed.
    pub fn set_delay_time(&mut self, sample_rate: u32, delay_time: f32) {
        let delay_frames =
            ((delay_time.max(0.0) * sample_rate as f32).ceil() as usize).min(self.buffer_mask);
        if delay_frames != self.delay_frames {
            self.delay_frames = delay_frames;
            self.flush();
        }
    }

    /// Reset buffer content and peak tracking.
    pub fn flush(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.peak_value = 0.0;
        self.peak_pos = 0;
    }

    /// Process one frame. Writes the input frame to the delay line and returns the delayed
    /// frame.
    pub fn process(&mut self, input_frame: &[f32; CHANNELS]) -> [f32; CHANNELS] {
        if self.delay_frames == 0 {
            self.peak_value = Self::frame_peak(input_frame);
            return *input_frame;
        }

        let buffer_frames = self.buffer.len() / CHANNELS;
        let read_frame_index =
            (self.write_pos + buffer_frames - self.delay_frames) & self.buffer_mask;
        let read_sample_index = read_frame_index * CHANNELS;

        let mut delayed_frame = [0.0; CHANNELS];
        delayed_frame
            .copy_from_slice(&self.buffer[read_sample_index..read_sample_index + CHANNELS]);

        let write_sample_index = self.write_pos * CHANNELS;
        self.buffer[write_sample_index..write_sample_index + CHANNELS].copy_from_slice(input_frame);

        let peak_expired = self.peak_pos == read_frame_index;
        let new_peak = Self::frame_peak(input_frame);
        if new_peak >= self.peak_value {
            self.peak_value = new_peak;
            self.peak_pos = self.write_pos;
        } else if peak_expired {
            // rescan the lookahead window: the last `delay_frames` written frames
            self.peak_value = 0.0;
            for i in 0..self.delay_frames {
                let frame_index = (self.write_pos + buffer_frames - i) & self.buffer_mask;
                let sample_index = frame_index * CHANNELS;
                let frame_peak = self.buffer[sample_index..sample_index + CHANNELS]
                    .iter()
                    .fold(0.0f32, |max, &val| max.max(val.abs()));
                if frame_peak >= self.peak_value {
                    self.peak_value = frame_peak;
                    self.peak_pos = frame_index;
                }
            }
        }

        self.write_pos = (self.write_pos + 1) & self.buffer_mask;

        delayed_frame
    }

    /// Returns the absolute peak value in the delay line from all channels.
    pub fn peak_value(&self) -> f32 {
        self.peak_value
    }

    #[inline]
    fn frame_peak(frame: &[f32; CHANNELS]) -> f32 {
        frame.iter().fold(0.0f32, |max, &val| max.max(val.abs()))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_read_write() {
        let mut delay = DelayLine::<1>::new(8);
        assert_eq!(delay.max_delay_frames(), 15);
        for i in 1..=4 {
            delay.write([i as f32]);
        }
        assert_eq!(delay.read(1.0), [4.0]);
        assert_eq!(delay.read(3.0), [2.0]);
        assert_eq!(delay.read(1.5), [3.5]);
        // clamped to at least one frame
        assert_eq!(delay.read(0.0), [4.0]);
    }

    #[test]
    fn delay_feedback() {
        let mut delay = DelayLine::<2>::new(4);
        let mut outputs = Vec::new();
        outputs.push(delay.process_sample([1.0, -1.0], 0.5, 2.0));
        for _ in 0..6 {
            outputs.push(delay.process_sample([0.0, 0.0], 0.5, 2.0));
        }
        assert_eq!(outputs[2], [1.0, -1.0]);
        assert_eq!(outputs[4], [0.5, -0.5]);
        assert_eq!(outputs[6], [0.25, -0.25]);
    }

    #[test]
    fn lookup_delay_peaks() {
        let sample_rate = 1000;
        let mut delay = LookupDelayLine::<2>::new(sample_rate, 0.01, 0.003);
        assert_eq!(delay.delay_frames(), 3);
        assert_eq!(delay.process(&[0.5, -0.8]), [0.0, 0.0]);
        assert_eq!(delay.peak_value(), 0.8);
        delay.process(&[0.1, 0.1]);
        delay.process(&[0.2, 0.1]);
        assert_eq!(delay.process(&[0.1, 0.1]), [0.5, -0.8]);
        assert_eq!(delay.peak_value(), 0.2);

        delay.set_delay_time(sample_rate, 1.0);
        assert_eq!(delay.delay_frames(), 15);
        assert_eq!(delay.peak_value(), 0.0);
    }
}
