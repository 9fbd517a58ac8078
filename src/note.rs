// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Definitions of what a note is.

use std::fmt;

use snafu::Snafu;

/// Number of semitones in an octave.
pub const SEMITONES: u32 = 12;

/// One of the twelve note names of an octave, independent of the octave.
///
/// The order of the variants is the order of the chromatic scale starting at C,
/// the discriminant is the position of the pitch class in that scale.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Position in the chromatic scale, 0 for C up to 11 for B.
    pub fn index(self) -> u32 {
        self as u32
    }

    /// The pitch class at the given position, wrapping around every 12 semitones.
    ///
    /// ```
    /// use syn_midi::note::PitchClass;
    ///
    /// assert_eq!(PitchClass::from_index(4), PitchClass::E);
    /// assert_eq!(PitchClass::from_index(13), PitchClass::CSharp);
    /// ```
    pub fn from_index(index: u32) -> PitchClass {
        PitchClass::ALL[(index % SEMITONES) as usize]
    }

    /// The canonical lower-case name, e.g. `"c#"`.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "c",
            PitchClass::CSharp => "c#",
            PitchClass::D => "d",
            PitchClass::DSharp => "d#",
            PitchClass::E => "e",
            PitchClass::F => "f",
            PitchClass::FSharp => "f#",
            PitchClass::G => "g",
            PitchClass::GSharp => "g#",
            PitchClass::A => "a",
            PitchClass::ASharp => "a#",
            PitchClass::B => "b",
        }
    }

    /// The upper-case name used for chord roots, e.g. `"C#"`.
    pub fn chord_name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Look up a pitch class by its canonical lower-case name.
    pub fn from_name(name: &str) -> Option<PitchClass> {
        PitchClass::ALL.iter().copied().find(|pc| pc.name() == name)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pitch class in a specific octave.
///
/// Octave 0 starts at C0, the lowest note of the frequency table.
/// Octaves above the range of the table can be named, but have no frequency.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Note {
    pub pitch_class: PitchClass,
    pub octave: u8,
}

impl Note {
    pub fn new(pitch_class: PitchClass, octave: u8) -> Note {
        Note {
            pitch_class,
            octave,
        }
    }

    /// Convert an absolute semitone index counted from C0 back into a note.
    ///
    /// Returns `None` if the octave does not fit into a `u8`.
    ///
    /// ```
    /// use syn_midi::note::*;
    ///
    /// assert_eq!(Note::from_semitone(0), Some(Note::new(PitchClass::C, 0)));
    /// assert_eq!(Note::from_semitone(55), Some(Note::new(PitchClass::G, 4)));
    /// ```
    pub fn from_semitone(semitone: u32) -> Option<Note> {
        let octave = semitone / SEMITONES;
        if octave > u8::MAX as u32 {
            return None;
        }
        Some(Note::new(PitchClass::from_index(semitone), octave as u8))
    }

    /// Absolute semitone index counted from C0: `octave * 12 + pitch class index`.
    pub fn semitone(self) -> u32 {
        self.octave as u32 * SEMITONES + self.pitch_class.index()
    }

    /// The note `offset` semitones above this one, rolling over into higher octaves.
    ///
    /// Returns `None` if the result cannot be represented as a note.
    pub fn transpose(self, offset: u32) -> Option<Note> {
        self.semitone()
            .checked_add(offset)
            .and_then(Note::from_semitone)
    }

    /// Parse a name string of the format `<pitch class>[#]<octave>`.
    ///
    /// The pitch class is always lower-case and must be one of the twelve canonical
    /// names, i.e. there is no `e#` or `b#`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use syn_midi::note::*;
    ///
    /// assert_eq!(Note::parse("a4"), Ok(Note::new(PitchClass::A, 4)));
    /// assert_eq!(Note::parse("c#4"), Ok(Note::new(PitchClass::CSharp, 4)));
    /// assert_eq!(Note::parse("a10"), Ok(Note::new(PitchClass::A, 10)));
    /// assert!(Note::parse("z9").is_err());
    /// assert!(Note::parse("A4").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Note, NoteError> {
        let invalid = |reason| NoteError::InvalidNoteName {
            name: name.to_owned(),
            reason,
        };

        let digits_start = name
            .find(|ch: char| ch.is_ascii_digit())
            .ok_or_else(|| invalid("missing octave"))?;
        let (pitch_str, octave_str) = name.split_at(digits_start);

        let pitch_class =
            PitchClass::from_name(pitch_str).ok_or_else(|| invalid("unknown pitch class"))?;
        if !octave_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("octave is not a number"));
        }
        let octave = octave_str
            .parse()
            .map_err(|_| invalid("octave out of range"))?;
        Ok(Note::new(pitch_class, octave))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class, self.octave)
    }
}

impl std::str::FromStr for Note {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Note::parse(s)
    }
}

/// Errors when turning note names into notes or frequencies.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum NoteError {
    #[snafu(display("Invalid note name {:?}: {}", name, reason))]
    InvalidNoteName { name: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_in_chromatic_order() {
        for (index, pc) in PitchClass::ALL.iter().enumerate() {
            assert_eq!(pc.index(), index as u32);
            assert_eq!(PitchClass::from_name(pc.name()), Some(*pc));
            assert_eq!(pc.chord_name().to_ascii_lowercase(), pc.name());
        }
    }

    #[test]
    fn semitone_index() {
        assert_eq!(Note::new(PitchClass::C, 0).semitone(), 0);
        assert_eq!(Note::new(PitchClass::A, 4).semitone(), 57);
        assert_eq!(Note::new(PitchClass::B, 8).semitone(), 107);
    }

    #[test]
    fn transpose_rolls_over_octaves() {
        let a4 = Note::new(PitchClass::A, 4);
        assert_eq!(a4.transpose(3), Some(Note::new(PitchClass::C, 5)));
        assert_eq!(a4.transpose(7), Some(Note::new(PitchClass::E, 5)));
        assert_eq!(a4.transpose(24), Some(Note::new(PitchClass::A, 6)));
    }

    #[test]
    fn transpose_out_of_range() {
        let b8 = Note::new(PitchClass::B, 8);
        assert_eq!(b8.transpose(u32::MAX), None);
        assert_eq!(b8.transpose(256 * SEMITONES), None);
        assert!(Note::new(PitchClass::C, 0).transpose(u32::MAX).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        for name in &["", "c", "#4", "h4", "e#4", "cb4", "C4", "c-1", "c4x", "c 4", "c999"] {
            match Note::parse(name) {
                Err(NoteError::InvalidNoteName { name: n, .. }) => assert_eq!(&n, name),
                Ok(note) => panic!("{:?} parsed as {:?}", name, note),
            }
        }
    }

    #[test]
    fn display_is_parseable() {
        for pc in PitchClass::ALL.iter() {
            let note = Note::new(*pc, 3);
            assert_eq!(note.to_string().parse::<Note>(), Ok(note));
        }
    }
}
