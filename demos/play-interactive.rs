use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use arg::{parse_args, Args};
use device_query::{DeviceEvents, DeviceState, Keycode};

use fmchain::{
    event_source_or_fallback, outputs::DefaultOutputDevice, ChannelEventSource, Error,
    EventSource, FmSynth, GuardedSource, MidiEvent, OutputDevice, SynthConfig,
};

// -------------------------------------------------------------------------------------------------

// Only works when the global allocator is also the assert_no_alloc allocator.
#[cfg(feature = "assert-allocs")]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "p", long = "preset")]
    /// JSON preset to load on startup and to save on exit.
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

    // open default audio output
    let mut output = DefaultOutputDevice::open()?;

    // create the synth for the output's specs
    let config = SynthConfig::default()
        .sample_rate(output.sample_rate())
        .channel_count(output.channel_count());
    let (mut synth, source) = FmSynth::new(config)?;
    if let Some(preset_path) = &args.preset_path {
        if let Err(err) = synth.load_preset(preset_path) {
            log::warn!("Continuing with default parameters: {err}");
        }
    }
    output.play(Box::new(GuardedSource::new(source, "FM synth")));

    // print header
    println!("*** fmchain interactive playback example:");
    println!("  Use keys 'A, S, D, F, G, H, J, K' to play notes 'C, D, E, F, G, A, H, C'.");
    println!("  Arrow 'up/down' keys change the current octave.");
    println!("  Hold 'Space' as sustain pedal.");
    println!();
    println!("  To quit press 'Esc'.");
    println!();

    // key events get translated to note events
    let (sender, keyboard) = ChannelEventSource::new("Computer Keyboard");
    let mut events = event_source_or_fallback(Ok(Box::new(keyboard)));

    let quit = Arc::new(AtomicBool::new(false));
    let octave = Arc::new(AtomicU8::new(4));

    let device_state = DeviceState::new();

    let _key_down_guard = device_state.on_key_down({
        let quit = Arc::clone(&quit);
        let octave = Arc::clone(&octave);
        let sender = sender.clone();
        move |key: &Keycode| {
            let event = match key {
                Keycode::Escape => {
                    quit.store(true, Ordering::Relaxed);
                    None
                }
                Keycode::Up => {
                    let current = (octave.load(Ordering::Relaxed) + 1).min(8);
                    octave.store(current, Ordering::Relaxed);
                    println!("Changed octave to '{current}'");
                    None
                }
                Keycode::Down => {
                    let current = octave.load(Ordering::Relaxed).saturating_sub(1).max(1);
                    octave.store(current, Ordering::Relaxed);
                    println!("Changed octave to '{current}'");
                    None
                }
                Keycode::Space => Some(MidiEvent::ControlChange {
                    controller: MidiEvent::SUSTAIN_PEDAL,
                    value: 127,
                }),
                key => key_to_note(key).map(|note| MidiEvent::NoteOn {
                    note: note + 12 * (octave.load(Ordering::Relaxed) + 1),
                    velocity: 100,
                }),
            };
            if let Some(event) = event {
                let _ = sender.send(event);
            }
        }
    });

    let _key_up_guard = device_state.on_key_up({
        let octave = Arc::clone(&octave);
        move |key: &Keycode| {
            let event = match key {
                Keycode::Space => Some(MidiEvent::ControlChange {
                    controller: MidiEvent::SUSTAIN_PEDAL,
                    value: 0,
                }),
                key => key_to_note(key).map(|note| MidiEvent::NoteOff {
                    note: note + 12 * (octave.load(Ordering::Relaxed) + 1),
                }),
            };
            if let Some(event) = event {
                let _ = sender.send(event);
            }
        }
    });

    // run the control loop in the main thread
    while !quit.load(Ordering::Relaxed) {
        if let Some(event) = events.recv_timeout(Duration::from_millis(10))? {
            synth.handle_event(&event)?;
            synth.process_events(events.as_mut())?;
        }
        synth.tick()?;
    }

    println!("Shutting down...");
    if let Some(preset_path) = &args.preset_path {
        synth.save_preset(preset_path)?;
    }
    synth.reset()?;
    thread::sleep(Duration::from_millis(50));
    output.close();
    Ok(())
}

// -------------------------------------------------------------------------------------------------

fn key_to_note(keycode: &Keycode) -> Option<u8> {
    match keycode {
        Keycode::A => Some(0),  // C
        Keycode::W => Some(1),  // C#
        Keycode::S => Some(2),  // D
        Keycode::E => Some(3),  // D#
        Keycode::D => Some(4),  // E
        Keycode::F => Some(5),  // F
        Keycode::T => Some(6),  // F#
        Keycode::G => Some(7),  // G
        Keycode::Y => Some(8),  // G#
        Keycode::H => Some(9),  // A
        Keycode::U => Some(10), // A#
        Keycode::J => Some(11), // H
        Keycode::K => Some(12), // C'
        _ => None,
    }
}
