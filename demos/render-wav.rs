use std::{path::PathBuf, thread, time::Duration};

use arg::{parse_args, Args};

use fmchain::{
    outputs::WavOutput, Error, FmSynth, GuardedSource, OutputDevice, SynthConfig,
};

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const SAMPLE_RATE: u32 = 44100;

// (note, start time, duration) in seconds
const SEQUENCE: [(u8, f32, f32); 8] = [
    (48, 0.0, 0.9),
    (55, 1.0, 0.4),
    (60, 1.5, 0.4),
    (63, 2.0, 1.2),
    (62, 3.25, 0.2),
    (60, 3.5, 0.2),
    (58, 3.75, 0.2),
    (55, 4.0, 2.0),
];

// -------------------------------------------------------------------------------------------------

#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "o", long = "output")]
    /// Target wav file path. By default \"fmchain.wav\".
    output_path: Option<PathBuf>,
    #[arg(short = "p", long = "preset")]
    /// Optional JSON preset to load.
    preset_path: Option<PathBuf>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();
    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");

    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from("fmchain.wav"));
    let duration = SEQUENCE
        .iter()
        .map(|(_, start, length)| start + length)
        .fold(0.0f32, f32::max)
        + 2.0;

    // create the synth and load the preset, if any
    let (mut synth, source) = FmSynth::new(SynthConfig::default().sample_rate(SAMPLE_RATE))?;
    if let Some(preset_path) = &args.preset_path {
        synth.load_preset(preset_path)?;
    }

    // open the wav output and start writing
    let mut output = WavOutput::open_with_specs(
        &output_path,
        SAMPLE_RATE,
        2,
        Duration::from_secs_f32(duration),
    )?;
    output.play(Box::new(GuardedSource::new(source, "FM synth")));
    output.resume();

    // feed notes as the output proceeds
    let mut events = SEQUENCE
        .iter()
        .flat_map(|&(note, start, length)| [(start, Some(note)), (start + length, None)])
        .collect::<Vec<_>>();
    events.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut sounding = None;
    for (time, event) in events {
        let frame = (time * SAMPLE_RATE as f32) as u64;
        while output.sample_position() / 2 < frame {
            synth.tick()?;
            thread::sleep(Duration::from_micros(200));
        }
        match event {
            Some(note) => {
                synth.note_on(note, 110)?;
                sounding = Some(note);
            }
            None => {
                if let Some(note) = sounding.take() {
                    synth.note_off(note)?;
                }
            }
        }
    }

    while !output.is_finished() {
        synth.tick()?;
        thread::sleep(Duration::from_millis(10));
    }
    println!("Wrote {:.1} seconds to '{}'", duration, output_path.display());
    Ok(())
}
