use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

#[cfg(feature = "assert-allocs")]
use assert_no_alloc::*;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    StreamConfig,
};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::{
    error::Error,
    output::{source_matches_device, OutputDevice},
    source::{Source, SourceTime},
};

// -------------------------------------------------------------------------------------------------

const PREFERRED_SAMPLE_FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;
const PREFERRED_SAMPLE_RATE: cpal::SampleRate = cpal::SampleRate(44100);
const PREFERRED_CHANNELS: cpal::ChannelCount = 2;
const PREFERRED_BUFFER_SIZE: cpal::BufferSize = if cfg!(debug_assertions) {
    cpal::BufferSize::Default
} else {
    cpal::BufferSize::Fixed(512)
};

// -------------------------------------------------------------------------------------------------

/// Available audio hosts for cpal output (platform specific)
pub enum AudioHostId {
    Default, // system default
    #[cfg(target_os = "windows")]
    Wasapi,
    #[cfg(target_os = "linux")]
    Alsa,
}

// -------------------------------------------------------------------------------------------------

/// Real-time audio output device, using cpal's default output device.
///
/// The cpal stream lives in a separate thread, which gets controlled via messages.
pub struct CpalOutput {
    channel_count: usize,
    sample_rate: u32,
    volume: f32,
    running: bool,
    playback_pos: Arc<AtomicU64>,
    callback_send: Sender<CallbackMsg>,
    stream_send: Sender<StreamMsg>,
    stream_thread: Option<thread::JoinHandle<()>>,
}

impl CpalOutput {
    pub fn open() -> Result<Self, Error> {
        Self::open_with_host(AudioHostId::Default)
    }

    pub fn open_with_host(host_id: AudioHostId) -> Result<Self, Error> {
        let host = match host_id {
            AudioHostId::Default => cpal::default_host(),
            #[cfg(target_os = "windows")]
            AudioHostId::Wasapi => cpal::host_from_id(cpal::HostId::Wasapi)
                .map_err(|err| Error::OutputDeviceError(Box::new(err)))?,
            #[cfg(target_os = "linux")]
            AudioHostId::Alsa => cpal::host_from_id(cpal::HostId::Alsa)
                .map_err(|err| Error::OutputDeviceError(Box::new(err)))?,
        };

        // Open the default output device.
        let device = host
            .default_output_device()
            .ok_or(cpal::DefaultStreamConfigError::DeviceNotAvailable)?;

        if let Ok(name) = device.name() {
            log::info!("Using audio device: {}", name);
        }

        // Get the preferred device config, so we know what sample format and sample rate
        // the device supports.
        let supported = Self::preferred_output_config(&device)?;
        let config = StreamConfig {
            buffer_size: PREFERRED_BUFFER_SIZE,
            ..supported.config()
        };
        let channel_count = config.channels as usize;
        let sample_rate = config.sample_rate.0;

        // Shared playback position counter
        let playback_pos = Arc::new(AtomicU64::new(0));

        let (callback_send, callback_recv) = bounded(16);
        let (stream_send, stream_recv) = unbounded();
        let (ready_send, ready_recv) = bounded(1);

        let stream_thread = thread::Builder::new()
            .name("audio_output".to_string())
            .spawn({
                let playback_pos = Arc::clone(&playback_pos);
                move || match Stream::open(device, config, playback_pos, callback_recv) {
                    Ok(stream) => {
                        let _ = ready_send.send(Ok(()));
                        stream.run(stream_recv);
                    }
                    Err(err) => {
                        let _ = ready_send.send(Err(err));
                    }
                }
            })?;

        ready_recv.recv().map_err(|_| {
            Error::OutputDeviceError("Audio output thread died unexpectedly".into())
        })??;

        Ok(Self {
            channel_count,
            sample_rate,
            volume: 1.0,
            running: true,
            playback_pos,
            callback_send,
            stream_send,
            stream_thread: Some(stream_thread),
        })
    }

    fn preferred_output_config(
        device: &cpal::Device,
    ) -> Result<cpal::SupportedStreamConfig, Error> {
        for s in device.supported_output_configs()? {
            let rates = s.min_sample_rate()..=s.max_sample_rate();
            if s.channels() == PREFERRED_CHANNELS
                && s.sample_format() == PREFERRED_SAMPLE_FORMAT
                && rates.contains(&PREFERRED_SAMPLE_RATE)
            {
                return Ok(s.with_sample_rate(PREFERRED_SAMPLE_RATE));
            }
        }

        Ok(device.default_output_config()?)
    }

    fn send_to_callback(&self, msg: CallbackMsg) {
        if self.callback_send.send(msg).is_err() {
            log::error!("Output stream callback is dead");
        }
    }

    fn send_to_stream(&self, msg: StreamMsg) {
        if self.stream_send.send(msg).is_err() {
            log::error!("Output stream thread is dead");
        }
    }
}

impl OutputDevice for CpalOutput {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn sample_position(&self) -> u64 {
        self.playback_pos.load(Ordering::Relaxed)
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.send_to_callback(CallbackMsg::SetVolume(volume));
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn pause(&mut self) {
        self.running = false;
        self.send_to_stream(StreamMsg::Pause);
        self.send_to_callback(CallbackMsg::Pause);
    }

    fn resume(&mut self) {
        self.running = true;
        self.send_to_stream(StreamMsg::Resume);
        self.send_to_callback(CallbackMsg::Resume);
    }

    fn play(&mut self, source: Box<dyn Source>) {
        if source_matches_device(source.as_ref(), self.sample_rate, self.channel_count) {
            self.send_to_callback(CallbackMsg::PlaySource(source));
        }
    }

    fn stop(&mut self) {
        self.send_to_callback(CallbackMsg::StopSource);
    }

    fn close(&mut self) {
        self.running = false;
        if let Some(thread) = self.stream_thread.take() {
            self.send_to_stream(StreamMsg::Close);
            if thread.join().is_err() {
                log::error!("Audio output thread panicked");
            }
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------------------------------------------------------------------------------------

struct Stream {
    stream: cpal::Stream,
    _device: cpal::Device,
}

impl Stream {
    fn open(
        device: cpal::Device,
        config: cpal::StreamConfig,
        playback_pos: Arc<AtomicU64>,
        callback_recv: Receiver<CallbackMsg>,
    ) -> Result<Self, Error> {
        let mut callback = StreamCallback {
            callback_recv,
            source: None,
            volume: 1.0,
            playback_pos,
            playback_pos_instant: Instant::now(),
            state: CallbackState::Playing,
        };

        log::info!("Opening output stream: {:?}", config);
        let stream = device.build_output_stream(
            &config,
            move |output, _| {
                callback.write_samples(output);
            },
            |err| {
                log::error!("Audio output error: {}", err);
            },
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _device: device,
            stream,
        })
    }

    fn run(self, stream_recv: Receiver<StreamMsg>) {
        for msg in stream_recv {
            match msg {
                StreamMsg::Pause => {
                    log::debug!("Pausing audio output stream");
                    if let Err(err) = self.stream.pause() {
                        log::error!("Failed to stop stream: {}", err);
                    }
                }
                StreamMsg::Resume => {
                    log::debug!("Resuming audio output stream");
                    if let Err(err) = self.stream.play() {
                        log::error!("Failed to start stream: {}", err);
                    }
                }
                StreamMsg::Close => {
                    log::debug!("Closing audio output stream");
                    let _ = self.stream.pause();
                    break;
                }
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

enum StreamMsg {
    Pause,
    Resume,
    Close,
}

enum CallbackMsg {
    PlaySource(Box<dyn Source>),
    StopSource,
    SetVolume(f32),
    Pause,
    Resume,
}

enum CallbackState {
    Playing,
    Paused,
}

struct StreamCallback {
    callback_recv: Receiver<CallbackMsg>,
    source: Option<Box<dyn Source>>,
    playback_pos: Arc<AtomicU64>,
    playback_pos_instant: Instant,
    state: CallbackState,
    volume: f32,
}

impl StreamCallback {
    fn write_samples(&mut self, output: &mut [f32]) {
        // Process any pending data messages.
        while let Ok(msg) = self.callback_recv.try_recv() {
            match msg {
                CallbackMsg::PlaySource(source) => {
                    self.source = Some(source);
                }
                CallbackMsg::StopSource => {
                    self.source = None;
                }
                CallbackMsg::SetVolume(volume) => {
                    self.volume = volume;
                }
                CallbackMsg::Pause => {
                    self.state = CallbackState::Paused;
                }
                CallbackMsg::Resume => {
                    self.state = CallbackState::Playing;
                }
            }
        }

        let written = match (&self.state, self.source.as_mut()) {
            (CallbackState::Playing, Some(source)) if !source.is_exhausted() => {
                // Write out as many samples as possible from the audio source to the output
                // buffer.
                let time = SourceTime {
                    pos_in_frames: self.playback_pos.load(Ordering::Relaxed)
                        / source.channel_count().max(1) as u64,
                    pos_instant: self.playback_pos_instant,
                };

                #[cfg(not(feature = "assert-allocs"))]
                let written = source.write(output, &time);
                #[cfg(feature = "assert-allocs")]
                let written = assert_no_alloc(|| source.write(output, &time));

                // Apply the global volume level.
                output[..written].iter_mut().for_each(|s| *s *= self.volume);
                written
            }
            _ => 0,
        };
        if matches!(self.state, CallbackState::Playing) {
            // Advance playback pos
            self.playback_pos
                .fetch_add(output.len() as u64, Ordering::Relaxed);
        }

        // Mute any remaining samples.
        output[written..].iter_mut().for_each(|s| *s = 0.0);
    }
}

// -------------------------------------------------------------------------------------------------

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(err: cpal::DefaultStreamConfigError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::SupportedStreamConfigsError> for Error {
    fn from(err: cpal::SupportedStreamConfigsError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(err: cpal::BuildStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(err: cpal::PlayStreamError) -> Error {
        Error::OutputDeviceError(Box::new(err))
    }
}
