// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `synmidi` - printing note and chord tables, playing chord progressions and live MIDI input.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use log::{info, warn};
use structopt::StructOpt;

use syn_midi::chord::ChordBook;
use syn_midi::hz::Hz;
use syn_midi::live::{LiveInput, LiveStats, TransportEvent};
use syn_midi::oscillator::WaveShape;
use syn_midi::output::sox::{SoxSink, SoxTarget};
use syn_midi::render::SineBank;
use syn_midi::schedule::{PlaybackScheduler, ScheduleParams};
use syn_midi::tone::{Recorder, ToneGenerator};
use syn_midi::tuning;
use syn_midi::wave::AudioBuffer;

mod transport;

use transport::MidiConnection;

/// Played when `progression` is given no chords.
const DEFAULT_PROGRESSION: &[&str] = &["C4", "G4", "A4m", "F4"];

#[derive(Debug, StructOpt)]
#[structopt(name = "synmidi", about = "Playing chords and MIDI keyboards on a sine synthesizer")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Sample rate of the generated audio.
    #[structopt(long = "rate", default_value = "44100")]
    sample_rate: i32,

    /// Oscillator shape (sine, square, sawtooth or triangle).
    #[structopt(long, default_value = "sine")]
    shape: WaveShape,

    /// Gain of notes that carry no velocity.
    #[structopt(long, default_value = "0.08")]
    gain: f64,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Print the frequency of every note.
    Table,
    /// Print the frequencies of a chord such as `C4` or `a#3`.
    Chord {
        name: String,
        /// Use the minor instead of the major chord.
        #[structopt(long)]
        minor: bool,
    },
    /// Play a sequence of chords, one per second.
    Progression {
        /// Chords such as `C4` (major) or `A4m` (minor). Defaults to C4 G4 A4m F4.
        chords: Vec<String>,

        /// Seconds each chord is held.
        #[structopt(short, long, default_value = "0.85")]
        duration: f64,

        /// Print the schedule instead of playing it.
        #[structopt(long)]
        dry_run: bool,

        /// Output file (any sox-supported format). Music is played directly if not given.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
    /// List the MIDI input ports of the system.
    Ports,
    /// Play MIDI input until the port disappears.
    Live {
        /// Index or part of the name of the MIDI input port, see `ports`.
        #[structopt(short, long)]
        input: String,

        /// Output file (any sox-supported format). Music is played directly if not given.
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

fn main() -> io::Result<()> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    let params = ScheduleParams {
        default_gain: opt.gain,
        ..ScheduleParams::default()
    };

    match &opt.cmd {
        Command::Table => print_table(),
        Command::Ports => print_ports(),
        Command::Chord { name, minor } => print_chord(name, *minor),
        Command::Progression {
            chords,
            duration,
            dry_run,
            output,
        } => {
            let book = ChordBook::default();
            let sequence = resolve_progression(&book, chords)?;
            if *dry_run {
                print_progression(&sequence, *duration, params);
                Ok(())
            } else {
                let bank = SineBank::with_shape(opt.sample_rate as f64, opt.shape);
                let mut sched = PlaybackScheduler::with_params(bank, params);
                sched.play_progression(&sequence, *duration);
                render_until_idle(sched.into_generator(), opt.sample_rate, output.as_deref())
            }
        }
        Command::Live { input, output } => {
            let bank = SineBank::with_shape(opt.sample_rate as f64, opt.shape);
            let sched = PlaybackScheduler::with_params(bank, params);
            play_live(sched, input, opt.sample_rate, output.as_deref())
        }
    }
}

fn print_table() -> io::Result<()> {
    for (note, frequency) in tuning::standard().iter() {
        println!("{:4} {:10.4}", note.to_string(), frequency.into_inner());
    }
    Ok(())
}

fn print_ports() -> io::Result<()> {
    let ports = transport::list_ports()?;
    if ports.is_empty() {
        warn!("no MIDI input ports found");
    }
    for (index, name) in ports.iter().enumerate() {
        println!("{:3} {}", index, name);
    }
    Ok(())
}

fn print_chord(name: &str, minor: bool) -> io::Result<()> {
    let book = ChordBook::default();
    let chord = if minor {
        book.minor(name)
    } else {
        book.major(name)
    }
    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    for frequency in chord {
        println!("{:.4}", frequency);
    }
    Ok(())
}

fn resolve_progression(book: &ChordBook, chords: &[String]) -> io::Result<Vec<Vec<Hz>>> {
    let symbols: Vec<&str> = if chords.is_empty() {
        DEFAULT_PROGRESSION.to_vec()
    } else {
        chords.iter().map(String::as_str).collect()
    };
    symbols
        .into_iter()
        .map(|symbol| {
            book.parse_symbol(symbol)
                .map(<[Hz]>::to_vec)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
        })
        .collect()
}

fn print_progression(sequence: &[Vec<Hz>], duration: f64, params: ScheduleParams) {
    let mut sched = PlaybackScheduler::with_params(Recorder::new(), params);
    for voice in sched.play_progression(sequence, duration) {
        println!(
            "{:6.2} .. {:6.2}  {:9.2}  {}",
            voice.start, voice.stop, voice.frequency, voice.handle
        );
    }
}

fn sox_target(output: Option<&Path>) -> SoxTarget {
    match output {
        Some(path) => SoxTarget::File(path),
        None => SoxTarget::Play,
    }
}

/// Samples per rendered buffer, 10 ms worth of audio.
fn buffer_size(sample_rate: i32) -> usize {
    (sample_rate as usize / 100).max(1)
}

fn render_until_idle(
    mut bank: SineBank,
    sample_rate: i32,
    output: Option<&Path>,
) -> io::Result<()> {
    let mut sink = SoxSink::new(sample_rate, sox_target(output))?;
    let mut buffer = AudioBuffer::new(buffer_size(sample_rate));
    let mut clipped = false;

    while !bank.is_idle() {
        buffer.fill_zero();
        bank.fill_buffer(buffer.samples_mut());
        if !clipped && buffer.peak() > 1.0 {
            warn!("{:.2}: output is clipping", bank.now());
            clipped = true;
        }
        sink.write(&buffer)?;
    }
    info!("rendered {:.2} s of audio", bank.now());
    sink.finish()
}

/// How often the live loop checks that the MIDI port still exists.
const PORT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

fn play_live(
    sched: PlaybackScheduler<SineBank>,
    input: &str,
    sample_rate: i32,
    output: Option<&Path>,
) -> io::Result<()> {
    let mut sink = SoxSink::new(sample_rate, sox_target(output))?;
    let (sender, events) = mpsc::channel();
    let connection = MidiConnection::open(input, sender)?;
    let mut live = LiveInput::new(sched, tuning::standard());

    let (streamed, silenced) = run_session(
        &mut live,
        &events,
        buffer_size(sample_rate),
        || {
            let present = connection.is_present();
            if !present {
                warn!("MIDI input {} disappeared", connection.port());
            }
            present
        },
        |buffer| sink.write(buffer),
    );
    drop(connection);
    let closing = live.run(events.try_iter());

    let mut total = streamed?;
    total.handled += closing.handled;
    total.dropped += closing.dropped;
    info!(
        "MIDI input closed after {} events ({} dropped), silenced {} voices",
        total.handled + total.dropped,
        total.dropped,
        silenced
    );
    sink.finish()
}

/// Render live input until the port disappears or writing fails, then silence
/// all voices.
///
/// Returns the outcome of rendering and the number of silenced voices.
fn run_session<P, W>(
    live: &mut LiveInput<SineBank>,
    events: &Receiver<TransportEvent>,
    buffer_len: usize,
    mut port_present: P,
    mut write: W,
) -> (io::Result<LiveStats>, usize)
where
    P: FnMut() -> bool,
    W: FnMut(&AudioBuffer) -> io::Result<()>,
{
    let streamed = stream_live(live, events, buffer_len, &mut port_present, &mut write);
    let silenced = live.scheduler_mut().all_notes_off();
    (streamed, silenced)
}

fn stream_live(
    live: &mut LiveInput<SineBank>,
    events: &Receiver<TransportEvent>,
    buffer_len: usize,
    port_present: &mut dyn FnMut() -> bool,
    write: &mut dyn FnMut(&AudioBuffer) -> io::Result<()>,
) -> io::Result<LiveStats> {
    let mut buffer = AudioBuffer::new(buffer_len);
    let mut total = LiveStats::default();
    let started = Instant::now();
    let mut last_check: Option<Instant> = None;

    loop {
        let batch = live.run(events.try_iter());
        total.handled += batch.handled;
        total.dropped += batch.dropped;

        if last_check.map_or(true, |t| t.elapsed() >= PORT_CHECK_INTERVAL) {
            if !port_present() {
                return Ok(total);
            }
            last_check = Some(Instant::now());
        }

        let bank = live.scheduler_mut().generator_mut();
        buffer.fill_zero();
        bank.fill_buffer(buffer.samples_mut());
        write(&buffer)?;

        // stay in step with the wall clock so input is not rendered ahead of time
        let rendered = Duration::from_secs_f64(bank.now());
        if let Some(ahead) = rendered.checked_sub(started.elapsed()) {
            std::thread::sleep(ahead);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> LiveInput<'static, SineBank> {
        LiveInput::new(
            PlaybackScheduler::new(SineBank::new(44100.0)),
            tuning::standard(),
        )
    }

    fn held_notes() -> Receiver<TransportEvent> {
        let (sender, events) = mpsc::channel();
        sender.send(TransportEvent::Message([0x90, 57, 100])).unwrap();
        sender.send(TransportEvent::Message([0x90, 61, 100])).unwrap();
        events
    }

    #[test]
    fn output_errors_still_silence_all_voices() {
        let mut live = session();
        let events = held_notes();

        let (streamed, silenced) = run_session(
            &mut live,
            &events,
            441,
            || true,
            |_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "sox went away")),
        );
        assert_eq!(streamed.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(silenced, 2);
        assert!(live.scheduler().registry().is_empty());
    }

    #[test]
    fn vanished_port_ends_the_session() {
        let mut live = session();
        let events = held_notes();
        let mut written = 0;

        let (streamed, silenced) = run_session(
            &mut live,
            &events,
            441,
            || false,
            |_| {
                written += 1;
                Ok(())
            },
        );
        assert_eq!(
            streamed.unwrap(),
            LiveStats {
                handled: 2,
                dropped: 0
            }
        );
        assert_eq!(written, 0);
        assert_eq!(silenced, 2);
        assert!(live.scheduler().registry().is_empty());
    }
}
