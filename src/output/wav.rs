use std::{
    fs::File,
    io::BufWriter,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{
    error::Error,
    output::{source_matches_device, OutputDevice},
    source::{Source, SourceTime},
    utils::smoothed::{apply_smoothed_gain, ExponentialSmoothedValue, SmoothedValue},
};

// -------------------------------------------------------------------------------------------------

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNEL_COUNT: usize = 2;
const DEFAULT_DURATION: Duration = Duration::from_secs(u64::MAX);

const BUFFER_SIZE_FRAMES: usize = 1024;

// -------------------------------------------------------------------------------------------------

/// Audio output device, which writes audio into a wav file instead of playing it back.
///
/// NOTE: Unlike real-time output devices, the wav writer device is initially paused, so it
/// must be resumed manually after a source got set up. It then renders as fast as possible.
pub struct WavOutput {
    stream: Arc<Mutex<WavStream>>,
}

impl WavOutput {
    /// Open a wav output device to write at the given file using default specs and an
    /// endless duration.
    pub fn open<P: AsRef<Path>>(file_path: P) -> Result<Self, Error> {
        Self::open_with_specs(
            file_path,
            DEFAULT_SAMPLE_RATE,
            DEFAULT_CHANNEL_COUNT,
            DEFAULT_DURATION,
        )
    }

    /// Create a new wav output device with the given parameters.
    ///
    /// * `file_path`: Target file path. Should end with ".wav" extension.
    /// * `sample_rate`: Source and wav file's target sample rate.
    /// * `channel_count`: Source and wav file's channel layout.
    /// * `duration`: Max length of written content. When the source is exhausted, the wav
    ///   file will be closed automatically, so the duration also can be endless.
    ///
    /// Wav files contents are always saved as 32bit floats.
    pub fn open_with_specs<P: AsRef<Path>>(
        file_path: P,
        sample_rate: u32,
        channel_count: usize,
        duration: Duration,
    ) -> Result<Self, Error> {
        let spec = WavSpec {
            channels: channel_count as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(file_path.as_ref(), spec)
            .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;
        log::info!("Writing wav file '{}'", file_path.as_ref().display());

        let stream = Arc::new(Mutex::new(WavStream {
            writer: Some(writer),
            channel_count,
            sample_rate,
            source: None,
            smoothed_volume: ExponentialSmoothedValue::new(1.0, spec.sample_rate),
            buffer: vec![0.0; BUFFER_SIZE_FRAMES * channel_count],
            started: false,
            finished: false,
            playback_pos: 0,
            duration,
        }));

        // Start the stream in a new detached thread
        thread::spawn({
            let stream = Arc::clone(&stream);
            move || {
                loop {
                    // process the next audio slice
                    {
                        let mut stream = stream.lock().unwrap_or_else(PoisonError::into_inner);
                        if let Err(err) = stream.process() {
                            log::error!("Error processing WAV output: {err}");
                            stream.finished = true;
                        }
                        // Stop write loop when duration elapsed
                        if stream.finished {
                            stream.started = false;
                            stream.finalize();
                            break;
                        }
                    }
                    // sleep for a short time to avoid busy waiting
                    thread::sleep(Duration::from_millis(1));
                }
            }
        });

        Ok(Self { stream })
    }

    /// True when the wav file got finalized: the duration elapsed, the source got exhausted
    /// or the device got closed.
    pub fn is_finished(&self) -> bool {
        self.lock_stream().writer.is_none()
    }

    fn lock_stream(&self) -> MutexGuard<'_, WavStream> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputDevice for WavOutput {
    fn channel_count(&self) -> usize {
        self.lock_stream().channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.lock_stream().sample_rate
    }

    fn sample_position(&self) -> u64 {
        self.lock_stream().playback_pos
    }

    fn volume(&self) -> f32 {
        self.lock_stream().smoothed_volume.target()
    }

    fn set_volume(&mut self, volume: f32) {
        self.lock_stream().smoothed_volume.set_target(volume);
    }

    fn is_running(&self) -> bool {
        self.lock_stream().started
    }

    fn pause(&mut self) {
        self.lock_stream().started = false;
    }

    fn resume(&mut self) {
        let mut stream = self.lock_stream();
        stream.started = !stream.finished;
    }

    fn play(&mut self, source: Box<dyn Source>) {
        let mut stream = self.lock_stream();
        if source_matches_device(source.as_ref(), stream.sample_rate, stream.channel_count) {
            stream.source = Some(source);
        }
    }

    fn stop(&mut self) {
        self.lock_stream().source = None;
    }

    fn close(&mut self) {
        self.lock_stream().finished = true;
    }
}

// -------------------------------------------------------------------------------------------------

struct WavStream {
    writer: Option<WavWriter<BufWriter<File>>>,
    channel_count: usize,
    sample_rate: u32,
    source: Option<Box<dyn Source>>,
    smoothed_volume: ExponentialSmoothedValue,
    buffer: Vec<f32>,
    started: bool,
    finished: bool,
    playback_pos: u64,
    duration: Duration,
}

impl WavStream {
    fn process(&mut self) -> Result<(), Error> {
        // Do nothing when we didn't started yet
        if !self.started || self.finished {
            return Ok(());
        }
        // Calculate source time
        let pos_in_frames = self.playback_pos / self.channel_count as u64;
        let time = SourceTime {
            pos_in_frames,
            pos_instant: Instant::now(),
        };

        // Stop running when we've exceeded the duration
        let max_frames = (self.duration.as_secs_f64() * self.sample_rate as f64) as u64;
        if pos_in_frames >= max_frames {
            self.finished = true;
            return Ok(());
        }
        let frames = ((max_frames - pos_in_frames) as usize).min(BUFFER_SIZE_FRAMES);
        let buffer = &mut self.buffer[..frames * self.channel_count];

        // Write out as many samples as possible from the audio source to the buffer.
        let written = match self.source.as_mut() {
            Some(source) if source.is_exhausted() => {
                self.finished = true;
                return Ok(());
            }
            Some(source) => source.write(buffer, &time),
            None => {
                buffer.fill(0.0);
                buffer.len()
            }
        };
        // Pad missing samples with silence
        buffer[written..].fill(0.0);

        // Apply the global volume level
        apply_smoothed_gain(buffer, self.channel_count, &mut self.smoothed_volume);

        // Write to WAV file
        if let Some(writer) = self.writer.as_mut() {
            for sample in buffer.iter() {
                writer
                    .write_sample(*sample)
                    .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;
            }
        }

        self.playback_pos += buffer.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) {
        if let Some(writer) = self.writer.take() {
            match writer.finalize() {
                Ok(()) => log::info!("Finalized wav file"),
                Err(err) => log::error!("Failed to finalize WAV file: {err}"),
            }
        }
    }
}

impl Drop for WavStream {
    fn drop(&mut self) {
        self.finalize();
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FmSynth, SynthConfig};

    #[test]
    fn render_synth() -> Result<(), Box<Error>> {
        let path = std::env::temp_dir().join("fmchain-wav-output.wav");
        let mut output =
            WavOutput::open_with_specs(&path, 22050, 2, Duration::from_millis(500))?;
        let (mut synth, source) = FmSynth::new(SynthConfig::default().sample_rate(22050))?;
        synth.note_on(60, 127)?;
        output.play(Box::new(source));
        output.resume();

        let start = Instant::now();
        while !output.is_finished() && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(output.is_finished());
        assert!(!output.is_running());
        assert_eq!(output.sample_position(), 22050 / 2 * 2);

        let reader = hound::WavReader::open(&path)
            .map_err(|err| Error::OutputDeviceError(Box::new(err)))?;
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 22050 / 2 * 2);
        std::fs::remove_file(&path).map_err(Error::from)?;
        Ok(())
    }
}
