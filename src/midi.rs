// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Decoding raw MIDI channel messages.

use std::convert::TryFrom;

use snafu::Snafu;

use crate::note::{Note, PitchClass, SEMITONES};

/// Highest key number the decoder resolves to a note.
pub const MAX_KEY: u8 = 120;

/// What kind of message was received, taken from the high nibble of the status byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusKind {
    NoteOn,
    NoteOff,
    ControlChange,
    PitchWheel,
    /// Any status the synthesizer does not act upon.
    Unknown,
}

impl StatusKind {
    pub fn from_nibble(nibble: u8) -> StatusKind {
        match nibble {
            0x9 => StatusKind::NoteOn,
            0x8 => StatusKind::NoteOff,
            0xb => StatusKind::ControlChange,
            0xe => StatusKind::PitchWheel,
            _ => StatusKind::Unknown,
        }
    }
}

/// A decoded three byte MIDI message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MidiEvent {
    pub kind: StatusKind,
    /// Channel (or port) from the low nibble of the status byte.
    pub channel: u8,
    /// The raw first data byte.
    pub key: u8,
    /// The note of `key`, only present for note on and note off messages.
    pub note: Option<Note>,
    /// The raw second data byte, i.e. the velocity for note messages.
    pub velocity: u8,
}

/// Possible errors when decoding MIDI messages.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum MidiError {
    #[snafu(display("Key {} is outside of the supported range 0 - {}", key, MAX_KEY))]
    UnsupportedKey { key: u8 },
    #[snafu(display("Expected a 3 byte MIDI message, got {} bytes", len))]
    MalformedMessage { len: usize },
}

/// The note played by a key: `key % 12` selects the pitch class, `key / 12` the octave.
///
/// ```
/// use syn_midi::midi::key_note;
/// use syn_midi::note::*;
///
/// assert_eq!(key_note(0), Ok(Note::new(PitchClass::C, 0)));
/// assert_eq!(key_note(69), Ok(Note::new(PitchClass::A, 5)));
/// assert!(key_note(121).is_err());
/// ```
pub fn key_note(key: u8) -> Result<Note, MidiError> {
    if key > MAX_KEY {
        return Err(MidiError::UnsupportedKey { key });
    }
    let key = key as u32;
    Ok(Note::new(
        PitchClass::from_index(key % SEMITONES),
        (key / SEMITONES) as u8,
    ))
}

/// Decode a `[status, data1, data2]` message.
pub fn decode(message: [u8; 3]) -> Result<MidiEvent, MidiError> {
    let [status, data1, data2] = message;
    let kind = StatusKind::from_nibble(status >> 4);
    let note = match kind {
        StatusKind::NoteOn | StatusKind::NoteOff => Some(key_note(data1)?),
        _ => None,
    };
    Ok(MidiEvent {
        kind,
        channel: status & 0x0f,
        key: data1,
        note,
        velocity: data2,
    })
}

/// Same as [`decode`].
pub fn decode_midi_message(message: [u8; 3]) -> Result<MidiEvent, MidiError> {
    decode(message)
}

impl TryFrom<&[u8]> for MidiEvent {
    type Error = MidiError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match *bytes {
            [status, data1, data2] => decode([status, data1, data2]),
            _ => Err(MidiError::MalformedMessage { len: bytes.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    #[test]
    fn note_on() {
        let event = decode([0x90, 60, 100]).unwrap();
        expect![[r#"
            MidiEvent {
                kind: NoteOn,
                channel: 0,
                key: 60,
                note: Some(
                    Note {
                        pitch_class: C,
                        octave: 5,
                    },
                ),
                velocity: 100,
            }
        "#]]
        .assert_debug_eq(&event);
    }

    #[test]
    fn note_off() {
        let event = decode([0x80, 60, 0]).unwrap();
        assert_eq!(event.kind, StatusKind::NoteOff);
        assert_eq!(event.channel, 0);
        assert_eq!(event.note, Some(Note::new(PitchClass::C, 5)));
        assert_eq!(event.velocity, 0);
    }

    #[test]
    fn channel_from_low_nibble() {
        let event = decode([0x9a, 61, 64]).unwrap();
        assert_eq!(event.kind, StatusKind::NoteOn);
        assert_eq!(event.channel, 10);
        assert_eq!(event.note, Some(Note::new(PitchClass::CSharp, 5)));
    }

    #[test]
    fn other_kinds() {
        let cc = decode([0xb3, 7, 127]).unwrap();
        assert_eq!((cc.kind, cc.channel, cc.note), (StatusKind::ControlChange, 3, None));
        let bend = decode([0xe0, 0, 64]).unwrap();
        assert_eq!(bend.kind, StatusKind::PitchWheel);
        for status in &[0xa0u8, 0xc0, 0xd0, 0xf8] {
            assert_eq!(decode([*status, 1, 2]).unwrap().kind, StatusKind::Unknown);
        }
    }

    #[test]
    fn key_range() {
        assert_eq!(decode([0x90, 120, 1]).unwrap().note, Some(Note::new(PitchClass::C, 10)));
        assert_eq!(decode([0x90, 121, 1]), Err(MidiError::UnsupportedKey { key: 121 }));
        assert_eq!(decode([0x80, 127, 1]), Err(MidiError::UnsupportedKey { key: 127 }));
        // the key of other messages is not a note
        assert!(decode([0xb0, 127, 1]).is_ok());
    }

    #[test]
    fn from_slice() {
        let bytes: &[u8] = &[0x90, 64, 90];
        assert_eq!(MidiEvent::try_from(bytes), decode([0x90, 64, 90]));
        let short: &[u8] = &[0xc0, 5];
        assert_eq!(
            MidiEvent::try_from(short),
            Err(MidiError::MalformedMessage { len: 2 })
        );
    }
}
