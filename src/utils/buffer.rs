// -------------------------------------------------------------------------------------------------

/// Fill the given buffer with silence.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

/// Multiply all samples in the given buffer with the given factor.
#[inline]
pub fn scale_buffer(buffer: &mut [f32], factor: f32) {
    for sample in buffer.iter_mut() {
        *sample *= factor;
    }
}

// -------------------------------------------------------------------------------------------------

/// Copy an interleaved stereo buffer into an interleaved buffer with the given channel layout.
///
/// Mono outputs get a downmix of both channels, layouts with more than two channels receive
/// the stereo signal in the first two channels and silence in all others. The output buffer's
/// frame count must match the stereo buffer's frame count.
pub fn stereo_to_interleaved(stereo: &[f32], output: &mut [f32], channel_count: usize) {
    debug_assert_eq!(
        stereo.len() / 2,
        output.len() / channel_count.max(1),
        "Frame counts should match"
    );
    match channel_count {
        0 => (),
        1 => {
            for (o, s) in output.iter_mut().zip(stereo.chunks_exact(2)) {
                *o = (s[0] + s[1]) * 0.5;
            }
        }
        2 => {
            output.copy_from_slice(&stereo[..output.len()]);
        }
        _ => {
            for (o, s) in output
                .chunks_exact_mut(channel_count)
                .zip(stereo.chunks_exact(2))
            {
                o[0] = s[0];
                o[1] = s[1];
                o[2..].fill(0.0);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_layouts() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, 0.0, 1.0];

        let mut mono = vec![9.0; 3];
        stereo_to_interleaved(&stereo, &mut mono, 1);
        assert_eq!(mono, vec![0.5, 0.5, 0.5]);

        let mut copy = vec![9.0; 6];
        stereo_to_interleaved(&stereo, &mut copy, 2);
        assert_eq!(copy, stereo);

        let mut quad = vec![9.0; 12];
        stereo_to_interleaved(&stereo, &mut quad, 4);
        assert_eq!(
            quad,
            vec![1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn scale_and_clear() {
        let mut buffer = vec![1.0, -2.0];
        scale_buffer(&mut buffer, 0.5);
        assert_eq!(buffer, vec![0.5, -1.0]);
        clear_buffer(&mut buffer);
        assert_eq!(buffer, vec![0.0, 0.0]);
    }
}
