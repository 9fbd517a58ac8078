// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Chords built on every note of the frequency table.

use std::collections::BTreeMap;

use crate::hz::Hz;
use crate::note::*;
use crate::tuning::{self, FrequencyTable, MAX_OCTAVE};

/// Semitone offsets of the chord notes relative to the root, in playing order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordPattern {
    offsets: Vec<u32>,
}

impl ChordPattern {
    pub fn new(offsets: Vec<u32>) -> Self {
        ChordPattern { offsets }
    }

    /// Major triad, integer notation `{0, 4, 7}`.
    pub fn major() -> Self {
        Self::new(vec![0, 4, 7])
    }

    /// Minor triad, integer notation `{0, 3, 7}`.
    pub fn minor() -> Self {
        Self::new(vec![0, 3, 7])
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}

/// Derive the chord table of `pattern` against the standard frequency table.
pub fn derive_chord_table(pattern: &ChordPattern) -> ChordTable {
    ChordTable::derive(pattern, tuning::standard())
}

/// Look up the frequencies of a chord like `"C4"` in the given table.
pub fn resolve_chord_frequencies<'t>(
    name: &str,
    table: &'t ChordTable,
) -> Result<&'t [Hz], NoteError> {
    table.resolve(name)
}

/// The frequencies of one chord pattern on every root and octave.
///
/// Chords that reach above the frequency table (e.g. a major chord on F8)
/// are not part of the table.
#[derive(Clone, Debug, PartialEq)]
pub struct ChordTable {
    pattern: ChordPattern,
    chords: BTreeMap<Note, Vec<Hz>>,
}

impl ChordTable {
    pub fn derive(pattern: &ChordPattern, frequencies: &FrequencyTable) -> Self {
        let mut chords = BTreeMap::new();
        for octave in 0..=MAX_OCTAVE {
            for pc in PitchClass::ALL.iter() {
                let root = Note::new(*pc, octave);
                let freqs: Option<Vec<Hz>> = pattern
                    .offsets()
                    .iter()
                    .map(|offset| relative_frequency(frequencies, root, *offset))
                    .collect();
                match freqs {
                    Some(freqs) => {
                        chords.insert(root, freqs);
                    }
                    None => log::trace!("chord on {} exceeds the frequency table", root),
                }
            }
        }
        ChordTable {
            pattern: pattern.clone(),
            chords,
        }
    }

    pub fn pattern(&self) -> &ChordPattern {
        &self.pattern
    }

    /// The chord on `root` in the given octave.
    pub fn get(&self, root: PitchClass, octave: u8) -> Option<&[Hz]> {
        self.chords
            .get(&Note::new(root, octave))
            .map(|freqs| freqs.as_slice())
    }

    /// Parse a chord root like `"C4"`, `"A#3"` or `"c#4"` and return the chord.
    pub fn resolve(&self, name: &str) -> Result<&[Hz], NoteError> {
        let root = Note::parse(&name.to_ascii_lowercase()).map_err(|err| match err {
            NoteError::InvalidNoteName { reason, .. } => NoteError::InvalidNoteName {
                name: name.to_owned(),
                reason,
            },
        })?;
        self.get(root.pitch_class, root.octave)
            .ok_or_else(|| NoteError::InvalidNoteName {
                name: name.to_owned(),
                reason: "chord outside of the frequency table",
            })
    }

    /// All chords as `(chord name, octave, frequencies)`, grouped by root.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8, &[Hz])> + '_ {
        self.chords.iter().map(|(root, freqs)| {
            (root.pitch_class.chord_name(), root.octave, freqs.as_slice())
        })
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

/// Frequency of the note `offset` semitones above `root`.
fn relative_frequency(frequencies: &FrequencyTable, root: Note, offset: u32) -> Option<Hz> {
    frequencies.frequency(root.transpose(offset)?)
}

/// The frequency table together with the major and minor chords built from it.
#[derive(Clone, Debug)]
pub struct ChordBook {
    frequencies: FrequencyTable,
    major: ChordTable,
    minor: ChordTable,
}

impl Default for ChordBook {
    fn default() -> Self {
        Self::new(tuning::standard().clone())
    }
}

impl ChordBook {
    pub fn new(frequencies: FrequencyTable) -> Self {
        let major = ChordTable::derive(&ChordPattern::major(), &frequencies);
        let minor = ChordTable::derive(&ChordPattern::minor(), &frequencies);
        ChordBook {
            frequencies,
            major,
            minor,
        }
    }

    pub fn frequencies(&self) -> &FrequencyTable {
        &self.frequencies
    }

    pub fn major_table(&self) -> &ChordTable {
        &self.major
    }

    pub fn minor_table(&self) -> &ChordTable {
        &self.minor
    }

    /// Frequency of a single note, e.g. `"c#4"`.
    pub fn note(&self, name: &str) -> Result<Hz, NoteError> {
        self.frequencies.lookup(name)
    }

    /// Major chord on a root, e.g. `"C4"`.
    pub fn major(&self, name: &str) -> Result<&[Hz], NoteError> {
        self.major.resolve(name)
    }

    /// Minor chord on a root, e.g. `"A4"`.
    pub fn minor(&self, name: &str) -> Result<&[Hz], NoteError> {
        self.minor.resolve(name)
    }

    /// Resolve a chord symbol where a trailing `m` selects the minor chord,
    /// e.g. `"C4"` (C major) or `"A4m"` (A minor).
    ///
    /// ```
    /// use syn_midi::chord::ChordBook;
    ///
    /// let book = ChordBook::default();
    /// assert_eq!(book.parse_symbol("A4m").unwrap(), book.minor("A4").unwrap());
    /// assert_eq!(book.parse_symbol("G4").unwrap(), book.major("G4").unwrap());
    /// ```
    pub fn parse_symbol(&self, symbol: &str) -> Result<&[Hz], NoteError> {
        match symbol.strip_suffix('m') {
            Some(root) => self.minor(root),
            None => self.major(symbol),
        }
    }
}
