// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Equal-tempered frequencies of all notes the synthesizer knows about.

use lazy_static::lazy_static;

use crate::hz::Hz;
use crate::note::*;
use crate::util::from_semitones;

/// Frequency of C0, the lowest note of the table.
pub const C0: f64 = 16.35159783;

/// Highest octave contained in the table.
pub const MAX_OCTAVE: u8 = 8;

lazy_static! {
    static ref STANDARD: FrequencyTable = FrequencyTable::build();
}

/// The process-wide frequency table, built on first use and never modified afterwards.
pub fn standard() -> &'static FrequencyTable {
    &STANDARD
}

/// Build a fresh frequency table.
pub fn build_frequency_table() -> FrequencyTable {
    FrequencyTable::build()
}

/// Look up the frequency of a note name like `"c#4"` in the standard table.
///
/// ```
/// use syn_midi::tuning::lookup_note_frequency;
///
/// assert_eq!(lookup_note_frequency("c0").unwrap().into_inner(), 16.35159783);
/// assert!(lookup_note_frequency("z9").is_err());
/// ```
pub fn lookup_note_frequency(name: &str) -> Result<Hz, NoteError> {
    standard().lookup(name)
}

/// Maps every note between C0 and B8 to its frequency at a standard tuning
/// of 12 half-tones per octave, anchored at [`C0`].
///
/// There is no way of modifying a table once it has been built.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    /// Frequencies indexed by absolute semitone, starting at C0.
    frequencies: Vec<Hz>,
}

impl FrequencyTable {
    /// Compute the frequencies of pitch classes C to B over octaves 0 to 8.
    pub fn build() -> Self {
        let count = (MAX_OCTAVE as u32 + 1) * SEMITONES;
        let frequencies = (0..count)
            .map(|semitone| {
                let freq = C0 * from_semitones(semitone as f64);
                Hz::new(freq).expect("equal-tempered frequencies are positive")
            })
            .collect();
        FrequencyTable { frequencies }
    }

    /// Return the frequency of a note, or `None` if its octave is not covered.
    pub fn frequency(&self, note: Note) -> Option<Hz> {
        self.frequencies.get(note.semitone() as usize).copied()
    }

    /// Parse a note name like `"c#4"` or `"a3"` and return its frequency.
    pub fn lookup(&self, name: &str) -> Result<Hz, NoteError> {
        let note = Note::parse(name)?;
        self.frequency(note)
            .ok_or_else(|| NoteError::InvalidNoteName {
                name: name.to_owned(),
                reason: "octave outside of the frequency table",
            })
    }

    /// All notes of the table in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Note, Hz)> + '_ {
        self.frequencies.iter().enumerate().map(|(semitone, freq)| {
            let note = Note::from_semitone(semitone as u32).expect("table octaves fit into u8");
            (note, *freq)
        })
    }

    /// Number of notes in the table.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn covers_nine_octaves() {
        let table = FrequencyTable::build();
        assert_eq!(table.len(), 108);
        let (first, _) = table.iter().next().unwrap();
        let (last, _) = table.iter().last().unwrap();
        assert_eq!(first, Note::new(PitchClass::C, 0));
        assert_eq!(last, Note::new(PitchClass::B, 8));
    }

    #[test]
    fn c0_is_exact() {
        let table = FrequencyTable::build();
        assert_eq!(table.lookup("c0").unwrap().into_inner(), 16.35159783);
        let c1 = table.lookup("c1").unwrap().into_inner();
        let c0 = table.lookup("c0").unwrap().into_inner();
        assert!((c1 / c0 - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn octaves_double() {
        let table = FrequencyTable::build();
        for octave in 0..MAX_OCTAVE {
            for pc in PitchClass::ALL.iter() {
                let low = table.frequency(Note::new(*pc, octave)).unwrap();
                let high = table.frequency(Note::new(*pc, octave + 1)).unwrap();
                assert!(
                    high.approx_eq(Hz::new(low.into_inner() * 2.0).unwrap(), TOLERANCE),
                    "{}{}: {} vs {}",
                    pc,
                    octave,
                    low,
                    high
                );
            }
        }
    }

    #[test]
    fn semitones_are_equally_spaced() {
        let table = FrequencyTable::build();
        let step = 2.0f64.powf(1.0 / 12.0);
        let freqs: Vec<f64> = table.iter().map(|(_, f)| f.into_inner()).collect();
        for pair in freqs.windows(2) {
            assert!((pair[1] / pair[0] - step).abs() < TOLERANCE);
        }
    }

    #[test]
    fn concert_pitch() {
        // A4 in this tuning is 440 Hz up to the precision of C0.
        let a4 = standard().lookup("a4").unwrap().into_inner();
        assert!((a4 - 440.0).abs() < 1e-6, "a4 = {}", a4);
    }

    #[test]
    fn lookup_errors() {
        let table = FrequencyTable::build();
        for name in &["z9", "c9", "a10", "c", "C4", "e#2"] {
            assert!(
                matches!(table.lookup(name), Err(NoteError::InvalidNoteName { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn standard_is_shared() {
        assert!(std::ptr::eq(standard(), standard()));
        assert_eq!(*standard(), build_frequency_table());
    }
}
