use std::sync::Arc;

use basedrop::Owned;
use crossbeam_queue::ArrayQueue;

use crate::{
    chain::ModulationChain,
    operator::VoiceSignals,
    output_stage::OutputStage,
    parameters::SynthParameters,
    source::{Source, SourceTime},
    utils::buffer::stereo_to_interleaved,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Messages from the control thread's [`FmSynth`](crate::FmSynth) to its audio source.
///
/// A note message carries pitch, velocity and trigger together, so a note transition is
/// always applied as a whole.
pub(crate) enum SynthMessage {
    /// Start a note at `pitch` Hz, without pitch bend, with normalized velocity.
    NoteOn { pitch: f32, velocity: f32 },
    /// Release the sounding note.
    NoteOff,
    /// Set normalized aftertouch.
    Aftertouch(f32),
    /// Set the pitch bend frequency factor.
    PitchBend(f32),
    /// Immediately silence the chain.
    Reset,
    /// Apply a new parameter snapshot. Gets dropped into the control thread's collector.
    Parameters(Owned<SynthParameters>),
}

// -------------------------------------------------------------------------------------------------

/// The audio path of an [`FmSynth`](crate::FmSynth): renders the synth's modulation chain and
/// output stage. Control messages are drained at the start of every written buffer.
///
/// Renders stereo internally and maps the stereo signal to the source's channel layout.
pub struct FmSynthSource {
    sample_rate: u32,
    channel_count: usize,
    message_queue: Arc<ArrayQueue<SynthMessage>>,
    chain: ModulationChain,
    output_stage: OutputStage,
    signals: VoiceSignals,
    note_pitch: f32,
    pitch_bend: f32,
    stereo_buffer: Vec<f32>,
}

impl FmSynthSource {
    /// Frames rendered in one go.
    const BLOCK_FRAMES: usize = 256;

    pub(crate) fn new(
        sample_rate: u32,
        channel_count: usize,
        parameters: &SynthParameters,
        message_queue: Arc<ArrayQueue<SynthMessage>>,
    ) -> Result<Self, Error> {
        let chain = ModulationChain::from_parameters(sample_rate, parameters);
        let output_stage = OutputStage::new(sample_rate, &parameters.output)?;
        let signals = VoiceSignals::default();
        let note_pitch = signals.pitch;
        let pitch_bend = 1.0;
        let stereo_buffer = vec![0.0; Self::BLOCK_FRAMES * 2];
        Ok(Self {
            sample_rate,
            channel_count,
            message_queue,
            chain,
            output_stage,
            signals,
            note_pitch,
            pitch_bend,
            stereo_buffer,
        })
    }

    /// The synth's modulation chain.
    pub fn chain(&self) -> &ModulationChain {
        &self.chain
    }

    /// The synth's output stage.
    pub fn output_stage(&self) -> &OutputStage {
        &self.output_stage
    }

    /// Current voice signals: the bent pitch, velocity and aftertouch.
    pub fn signals(&self) -> &VoiceSignals {
        &self.signals
    }

    fn process_messages(&mut self) {
        while let Some(message) = self.message_queue.pop() {
            match message {
                SynthMessage::NoteOn { pitch, velocity } => {
                    self.note_pitch = pitch;
                    self.signals.pitch = pitch * self.pitch_bend;
                    self.signals.velocity = velocity;
                    self.chain.play();
                }
                SynthMessage::NoteOff => {
                    self.chain.stop();
                }
                SynthMessage::Aftertouch(value) => {
                    self.signals.aftertouch = value;
                }
                SynthMessage::PitchBend(factor) => {
                    self.pitch_bend = factor;
                    self.signals.pitch = self.note_pitch * factor;
                }
                SynthMessage::Reset => {
                    self.chain.reset();
                }
                SynthMessage::Parameters(parameters) => {
                    self.chain.apply_parameters(&parameters);
                    self.output_stage.apply_parameters(&parameters.output);
                }
            }
        }
    }
}

impl Source for FmSynthSource {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_exhausted(&self) -> bool {
        // produces silence when idle
        false
    }

    fn write(&mut self, output: &mut [f32], _time: &SourceTime) -> usize {
        self.process_messages();

        let channel_count = self.channel_count.max(1);
        let written = output.len() / channel_count * channel_count;
        for output_block in output[..written].chunks_mut(Self::BLOCK_FRAMES * channel_count) {
            let frames = output_block.len() / channel_count;
            let stereo_block = &mut self.stereo_buffer[..frames * 2];
            for frame in stereo_block.chunks_exact_mut(2) {
                let [left, right] = self.chain.process(&self.signals);
                frame[0] = left;
                frame[1] = right;
            }
            self.output_stage.process(stereo_block);
            stereo_to_interleaved(stereo_block, output_block, channel_count);
        }
        written
    }
}
