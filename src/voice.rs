// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Book keeping of the voices started by live input.
//!
//! Every frequency is either silent or sounding with exactly one voice.
//! A note on starts a voice that plays until the matching note off arrives.

use std::collections::BTreeMap;

use log::{trace, warn};
use snafu::Snafu;

use crate::hz::Hz;
use crate::tone::{self, ToneGenerator, VoiceParams};

/// Possible errors when stopping live voices.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum VoiceError {
    #[snafu(display("Note off for {} without a sounding voice", frequency))]
    UnmatchedNoteOff { frequency: Hz },
}

/// Maps the currently sounding frequencies to the voices playing them.
#[derive(Debug)]
pub struct VoiceRegistry<H> {
    voices: BTreeMap<Hz, H>,
    /// Gain used when a note on carries no velocity.
    default_gain: f64,
}

impl<H> Default for VoiceRegistry<H> {
    fn default() -> Self {
        Self::new(tone::DEFAULT_GAIN)
    }
}

impl<H> VoiceRegistry<H> {
    pub fn new(default_gain: f64) -> Self {
        VoiceRegistry {
            voices: BTreeMap::new(),
            default_gain,
        }
    }

    pub fn is_sounding(&self, frequency: Hz) -> bool {
        self.voices.contains_key(&frequency)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Sounding frequencies in ascending order.
    pub fn frequencies(&self) -> impl Iterator<Item = Hz> + '_ {
        self.voices.keys().copied()
    }
}

impl<H: Copy + Eq + std::fmt::Debug> VoiceRegistry<H> {
    /// The voice currently playing `frequency`.
    pub fn handle(&self, frequency: Hz) -> Option<H> {
        self.voices.get(&frequency).copied()
    }

    /// Start a voice on `frequency` right away, playing until [`note_off`](Self::note_off).
    ///
    /// If the frequency is already sounding, the previous voice is stopped
    /// before the new one takes its place, so that no voice is ever lost track of.
    pub fn note_on<G>(&mut self, generator: &mut G, frequency: Hz, velocity: Option<u8>) -> H
    where
        G: ToneGenerator<Handle = H>,
    {
        let now = generator.now();
        if let Some(previous) = self.voices.remove(&frequency) {
            warn!(
                "note on for already sounding {}, stopping {:?}",
                frequency, previous
            );
            generator.stop_voice(previous, now);
        }

        let handle = generator.create_voice(VoiceParams {
            frequency,
            start: now,
            stop: None,
            gain: tone::velocity_gain(velocity, self.default_gain),
            fade_floor: None,
        });
        trace!("{:.3}: start {:?} at {}", now, handle, frequency);
        self.voices.insert(frequency, handle);
        handle
    }

    /// Stop the voice playing `frequency` and forget about it.
    ///
    /// The registry is left untouched if nothing is sounding at that frequency.
    pub fn note_off<G>(&mut self, generator: &mut G, frequency: Hz) -> Result<H, VoiceError>
    where
        G: ToneGenerator<Handle = H>,
    {
        let handle = self
            .voices
            .remove(&frequency)
            .ok_or(VoiceError::UnmatchedNoteOff { frequency })?;
        let now = generator.now();
        trace!("{:.3}: stop {:?} at {}", now, handle, frequency);
        generator.stop_voice(handle, now);
        Ok(handle)
    }

    /// Stop every sounding voice, returning how many there were.
    pub fn all_notes_off<G>(&mut self, generator: &mut G) -> usize
    where
        G: ToneGenerator<Handle = H>,
    {
        let now = generator.now();
        let voices = std::mem::take(&mut self.voices);
        for (frequency, handle) in voices.iter() {
            trace!("{:.3}: stop {:?} at {}", now, handle, frequency);
            generator.stop_voice(*handle, now);
        }
        voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::{Recorder, VoiceId};

    fn hz(value: f64) -> Hz {
        Hz::new(value).unwrap()
    }

    #[test]
    fn note_on_then_off() {
        let mut gen = Recorder::new();
        let mut reg = VoiceRegistry::default();

        let handle = reg.note_on(&mut gen, hz(440.0), Some(100));
        assert!(reg.is_sounding(hz(440.0)));
        assert_eq!(reg.handle(hz(440.0)), Some(handle));

        let voice = gen.voice(handle).unwrap();
        assert_eq!(voice.params.start, 0.0);
        assert_eq!(voice.params.stop, None);
        assert_eq!(voice.params.gain, 1.0);

        gen.advance(0.5);
        assert_eq!(reg.note_off(&mut gen, hz(440.0)), Ok(handle));
        assert!(reg.is_empty());
        assert_eq!(gen.voice(handle).unwrap().stopped_at, Some(0.5));
    }

    #[test]
    fn missing_velocity_uses_default_gain() {
        let mut gen = Recorder::new();
        let mut reg = VoiceRegistry::new(0.2);
        let handle = reg.note_on(&mut gen, hz(261.63), None);
        assert_eq!(gen.voice(handle).unwrap().params.gain, 0.2);
    }

    #[test]
    fn double_note_on_stops_the_first_voice() {
        let mut gen = Recorder::new();
        let mut reg = VoiceRegistry::default();

        let first = reg.note_on(&mut gen, hz(440.0), Some(100));
        gen.advance(0.25);
        let second = reg.note_on(&mut gen, hz(440.0), Some(100));
        assert_ne!(first, second);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.handle(hz(440.0)), Some(second));
        // the replaced voice does not keep sounding in the background
        assert_eq!(gen.voice(first).unwrap().stopped_at, Some(0.25));

        assert_eq!(reg.note_off(&mut gen, hz(440.0)), Ok(second));
        assert!(!reg.is_sounding(hz(440.0)));
        assert_eq!(gen.sounding().count(), 0);
    }

    #[test]
    fn unmatched_note_off() {
        let mut gen = Recorder::new();
        let mut reg: VoiceRegistry<VoiceId> = VoiceRegistry::default();
        reg.note_on(&mut gen, hz(392.0), Some(80));

        assert_eq!(
            reg.note_off(&mut gen, hz(440.0)),
            Err(VoiceError::UnmatchedNoteOff {
                frequency: hz(440.0)
            })
        );
        assert_eq!(reg.frequencies().collect::<Vec<_>>(), vec![hz(392.0)]);
        assert_eq!(gen.voices().len(), 1);
        assert_eq!(gen.voices()[0].stopped_at, None);
    }

    #[test]
    fn all_notes_off() {
        let mut gen = Recorder::new();
        let mut reg = VoiceRegistry::default();
        for freq in &[261.63, 329.63, 392.0] {
            reg.note_on(&mut gen, hz(*freq), Some(64));
        }
        gen.advance(1.0);
        assert_eq!(reg.all_notes_off(&mut gen), 3);
        assert!(reg.is_empty());
        assert!(gen.voices().iter().all(|v| v.stopped_at == Some(1.0)));
        assert_eq!(reg.all_notes_off(&mut gen), 0);
    }
}
