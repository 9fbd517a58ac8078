// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Playing live MIDI input.
//!
//! The MIDI transport is modelled as a stream of [`TransportEvent`]s that is
//! consumed by a single [`LiveInput`], which is the only thing touching the
//! voices started from live input.

use log::{debug, info, warn};
use snafu::Snafu;

use crate::hz::Hz;
use crate::midi::{self, MidiError, StatusKind};
use crate::note::NoteError;
use crate::schedule::PlaybackScheduler;
use crate::tone::ToneGenerator;
use crate::tuning::FrequencyTable;
use crate::voice::VoiceError;

/// Everything a MIDI transport can tell us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Connected { port: String },
    Disconnected { port: String },
    Message([u8; 3]),
}

/// What happened in response to a transport event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiveAction<H> {
    Started { frequency: Hz, handle: H },
    Stopped { frequency: Hz, handle: H },
    /// A message that is not acted upon.
    Ignored { kind: StatusKind },
    /// A device was connected or disconnected.
    Lifecycle,
}

/// Possible errors when handling live input. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum LiveError {
    #[snafu(display("Could not decode MIDI message: {}", source))]
    Decode { source: MidiError },
    #[snafu(display("Key has no frequency: {}", source))]
    Frequency { source: NoteError },
    #[snafu(display("{}", source))]
    Release { source: VoiceError },
}

/// Counts of the events processed by [`LiveInput::run`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveStats {
    pub handled: usize,
    pub dropped: usize,
}

/// Turns MIDI messages into live voices.
pub struct LiveInput<'t, G: ToneGenerator> {
    scheduler: PlaybackScheduler<G>,
    frequencies: &'t FrequencyTable,
    /// Treat a note on with velocity 0 as note off, as most keyboards send it that way.
    pub zero_velocity_note_off: bool,
}

impl<'t, G: ToneGenerator> LiveInput<'t, G> {
    pub fn new(scheduler: PlaybackScheduler<G>, frequencies: &'t FrequencyTable) -> Self {
        LiveInput {
            scheduler,
            frequencies,
            zero_velocity_note_off: true,
        }
    }

    pub fn scheduler(&self) -> &PlaybackScheduler<G> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PlaybackScheduler<G> {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> PlaybackScheduler<G> {
        self.scheduler
    }

    /// Handle a single event from the transport.
    pub fn handle(&mut self, event: TransportEvent) -> Result<LiveAction<G::Handle>, LiveError> {
        match event {
            TransportEvent::Connected { port } => {
                info!("MIDI input connected: {}", port);
                Ok(LiveAction::Lifecycle)
            }
            TransportEvent::Disconnected { port } => {
                info!("MIDI input disconnected: {}", port);
                Ok(LiveAction::Lifecycle)
            }
            TransportEvent::Message(bytes) => self.handle_message(bytes),
        }
    }

    fn handle_message(&mut self, bytes: [u8; 3]) -> Result<LiveAction<G::Handle>, LiveError> {
        let event = midi::decode(bytes).map_err(|source| LiveError::Decode { source })?;
        debug!(
            "{:02x?}: {:?} channel {} note {:?} velocity {}",
            bytes, event.kind, event.channel, event.note, event.velocity
        );

        let kind = match event.kind {
            StatusKind::NoteOn if event.velocity == 0 && self.zero_velocity_note_off => {
                StatusKind::NoteOff
            }
            kind => kind,
        };
        let note = match (kind, event.note) {
            (StatusKind::NoteOn, Some(note)) | (StatusKind::NoteOff, Some(note)) => note,
            _ => return Ok(LiveAction::Ignored { kind }),
        };
        let frequency = self
            .frequencies
            .frequency(note)
            .ok_or_else(|| NoteError::InvalidNoteName {
                name: note.to_string(),
                reason: "octave outside of the frequency table",
            })
            .map_err(|source| LiveError::Frequency { source })?;

        if kind == StatusKind::NoteOn {
            let handle = self
                .scheduler
                .play_live_note(frequency, Some(event.velocity));
            Ok(LiveAction::Started { frequency, handle })
        } else {
            let handle = self
                .scheduler
                .stop_live_note(frequency)
                .map_err(|source| LiveError::Release { source })?;
            Ok(LiveAction::Stopped { frequency, handle })
        }
    }

    /// Consume events until the stream ends.
    ///
    /// Errors are logged and the offending event is dropped; they never end the stream.
    pub fn run<I>(&mut self, events: I) -> LiveStats
    where
        I: IntoIterator<Item = TransportEvent>,
    {
        let mut stats = LiveStats::default();
        for event in events {
            match self.handle(event) {
                Ok(_) => stats.handled += 1,
                Err(err) => {
                    warn!("dropping MIDI event: {}", err);
                    stats.dropped += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::Recorder;
    use crate::tuning;

    fn input() -> LiveInput<'static, Recorder> {
        LiveInput::new(PlaybackScheduler::new(Recorder::new()), tuning::standard())
    }

    fn key_frequency(name: &str) -> Hz {
        tuning::standard().lookup(name).unwrap()
    }

    #[test]
    fn press_and_release() {
        let mut live = input();
        let c5 = key_frequency("c5");

        let handle = match live.handle(TransportEvent::Message([0x90, 60, 100])) {
            Ok(LiveAction::Started { frequency, handle }) => {
                assert_eq!(frequency, c5);
                handle
            }
            other => panic!("unexpected {:?}", other),
        };
        assert!(live.scheduler().registry().is_sounding(c5));

        assert_eq!(
            live.handle(TransportEvent::Message([0x80, 60, 0])),
            Ok(LiveAction::Stopped {
                frequency: c5,
                handle
            })
        );
        assert!(live.scheduler().registry().is_empty());
    }

    #[test]
    fn zero_velocity_releases() {
        let mut live = input();
        live.handle(TransportEvent::Message([0x91, 64, 80])).unwrap();
        assert!(matches!(
            live.handle(TransportEvent::Message([0x91, 64, 0])),
            Ok(LiveAction::Stopped { .. })
        ));

        live.zero_velocity_note_off = false;
        assert!(matches!(
            live.handle(TransportEvent::Message([0x91, 64, 0])),
            Ok(LiveAction::Started { .. })
        ));
    }

    #[test]
    fn errors_are_reported() {
        let mut live = input();
        assert_eq!(
            live.handle(TransportEvent::Message([0x80, 60, 0])),
            Err(LiveError::Release {
                source: VoiceError::UnmatchedNoteOff {
                    frequency: key_frequency("c5")
                }
            })
        );
        assert_eq!(
            live.handle(TransportEvent::Message([0x90, 125, 10])),
            Err(LiveError::Decode {
                source: MidiError::UnsupportedKey { key: 125 }
            })
        );
        // key 110 is d9, which is above the frequency table
        assert!(matches!(
            live.handle(TransportEvent::Message([0x90, 110, 10])),
            Err(LiveError::Frequency { .. })
        ));
    }

    #[test]
    fn other_messages_are_ignored() {
        let mut live = input();
        assert_eq!(
            live.handle(TransportEvent::Message([0xb0, 64, 127])),
            Ok(LiveAction::Ignored {
                kind: StatusKind::ControlChange
            })
        );
        assert_eq!(
            live.handle(TransportEvent::Message([0xf8, 0, 0])),
            Ok(LiveAction::Ignored {
                kind: StatusKind::Unknown
            })
        );
        assert_eq!(
            live.handle(TransportEvent::Connected {
                port: "keys".to_owned()
            }),
            Ok(LiveAction::Lifecycle)
        );
        assert!(live.scheduler().generator().voices().is_empty());
    }

    #[test]
    fn run_survives_errors() {
        let mut live = input();
        let events = vec![
            TransportEvent::Connected {
                port: "keys".to_owned(),
            },
            TransportEvent::Message([0x80, 62, 0]),
            TransportEvent::Message([0x90, 127, 0]),
            TransportEvent::Message([0x90, 62, 90]),
            TransportEvent::Message([0x90, 67, 90]),
            TransportEvent::Message([0x80, 62, 0]),
            TransportEvent::Disconnected {
                port: "keys".to_owned(),
            },
        ];
        let stats = live.run(events);
        assert_eq!(stats, LiveStats { handled: 5, dropped: 2 });
        let sounding: Vec<Hz> = live.scheduler().registry().frequencies().collect();
        assert_eq!(sounding, vec![key_frequency("g5")]);
    }

    #[test]
    fn run_from_channel() {
        let (tx, rx) = std::sync::mpsc::channel();
        for message in &[[0x90u8, 57, 100], [0x90, 61, 100], [0x80, 57, 0]] {
            tx.send(TransportEvent::Message(*message)).unwrap();
        }
        drop(tx);

        let mut live = input();
        assert_eq!(live.run(rx), LiveStats { handled: 3, dropped: 0 });
        assert_eq!(live.scheduler().registry().len(), 1);
    }
}
