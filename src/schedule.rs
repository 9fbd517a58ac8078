// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Turn chord progressions and live notes into voices of a tone generator.

use log::{debug, info, trace};

use crate::hz::Hz;
use crate::tone::{self, ToneGenerator, VoiceParams};
use crate::voice::{VoiceError, VoiceRegistry};

/// Parameters of the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleParams {
    /// Seconds between the starts of consecutive chords of a progression.
    pub chord_spacing: f64,
    /// Gain of voices played without velocity.
    pub default_gain: f64,
    /// Gain of scheduled voices at their stop time, relative to their peak.
    pub fade_floor: f64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            chord_spacing: 1.0,
            default_gain: tone::DEFAULT_GAIN,
            fade_floor: tone::FADE_FLOOR,
        }
    }
}

/// A voice that was scheduled with a fixed stop time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScheduledVoice<H> {
    pub frequency: Hz,
    /// Start time, relative to the generator clock when the voice was scheduled.
    pub start: f64,
    /// Stop time, relative to the generator clock when the voice was scheduled.
    pub stop: f64,
    pub handle: H,
}

/// Owns the tone generator and keeps track of everything playing on it.
pub struct PlaybackScheduler<G: ToneGenerator> {
    generator: G,
    params: ScheduleParams,
    /// Voices started from live input, stopped by note off.
    live: VoiceRegistry<G::Handle>,
    /// Voices with a fixed stop time, as `(absolute stop time, handle)`.
    scheduled: Vec<(f64, G::Handle)>,
}

impl<G: ToneGenerator> PlaybackScheduler<G> {
    pub fn new(generator: G) -> Self {
        Self::with_params(generator, ScheduleParams::default())
    }

    pub fn with_params(generator: G, params: ScheduleParams) -> Self {
        let live = VoiceRegistry::new(params.default_gain);
        PlaybackScheduler {
            generator,
            params,
            live,
            scheduled: Vec::new(),
        }
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut G {
        &mut self.generator
    }

    pub fn into_generator(self) -> G {
        self.generator
    }

    pub fn registry(&self) -> &VoiceRegistry<G::Handle> {
        &self.live
    }

    /// Play every frequency as its own voice, starting `start` seconds from now.
    ///
    /// With a `stop` offset, the voices fade out exponentially and end `stop`
    /// seconds from now, otherwise they play until stopped explicitly.
    /// The gain is `velocity / 100`, or the default gain without velocity.
    pub fn play_notes(
        &mut self,
        frequencies: &[Hz],
        start: f64,
        stop: Option<f64>,
        velocity: Option<u8>,
    ) -> Vec<(Hz, G::Handle)> {
        self.prune_finished();
        let now = self.generator.now();
        let gain = tone::velocity_gain(velocity, self.params.default_gain);
        let fade_floor = stop.map(|_| self.params.fade_floor);

        frequencies
            .iter()
            .map(|&frequency| {
                let handle = self.generator.create_voice(VoiceParams {
                    frequency,
                    start: now + start,
                    stop: stop.map(|stop| now + stop),
                    gain,
                    fade_floor,
                });
                trace!(
                    "{:.3}: play {} as {:?} ({:+.3} .. {:?})",
                    now,
                    frequency,
                    handle,
                    start,
                    stop
                );
                if let Some(stop) = stop {
                    self.scheduled.push((now + stop, handle));
                }
                (frequency, handle)
            })
            .collect()
    }

    /// Schedule the chords back to back, chord `i` starting `i` chord spacings from now
    /// and stopping `note_duration` seconds after its start.
    ///
    /// Durations longer than the spacing make consecutive chords overlap.
    pub fn play_progression<C: AsRef<[Hz]>>(
        &mut self,
        chords: &[C],
        note_duration: f64,
    ) -> Vec<ScheduledVoice<G::Handle>> {
        info!(
            "playing {} chords, {:.2} s each",
            chords.len(),
            note_duration
        );

        let mut voices = Vec::new();
        for (index, chord) in chords.iter().enumerate() {
            let start = index as f64 * self.params.chord_spacing;
            let stop = start + note_duration;
            for (frequency, handle) in self.play_notes(chord.as_ref(), start, Some(stop), None) {
                voices.push(ScheduledVoice {
                    frequency,
                    start,
                    stop,
                    handle,
                });
            }
        }
        voices
    }

    /// Start a voice for a pressed key, see [`VoiceRegistry::note_on`].
    pub fn play_live_note(&mut self, frequency: Hz, velocity: Option<u8>) -> G::Handle {
        self.live.note_on(&mut self.generator, frequency, velocity)
    }

    /// Stop the voice of a released key, see [`VoiceRegistry::note_off`].
    pub fn stop_live_note(&mut self, frequency: Hz) -> Result<G::Handle, VoiceError> {
        self.live.note_off(&mut self.generator, frequency)
    }

    /// Stop all scheduled voices that have not reached their stop time yet.
    ///
    /// Returns the number of voices that were cut short.
    pub fn cancel_scheduled(&mut self) -> usize {
        let now = self.generator.now();
        let mut cancelled = 0;
        for (stop, handle) in self.scheduled.drain(..) {
            if stop > now {
                self.generator.stop_voice(handle, now);
                cancelled += 1;
            }
        }
        debug!("{:.3}: cancelled {} scheduled voices", now, cancelled);
        cancelled
    }

    /// Silence everything, scheduled and live.
    pub fn all_notes_off(&mut self) -> usize {
        self.cancel_scheduled() + self.live.all_notes_off(&mut self.generator)
    }

    /// Time at which the last scheduled voice stops, if any is pending.
    pub fn scheduled_until(&self) -> Option<f64> {
        self.scheduled
            .iter()
            .map(|(stop, _)| *stop)
            .fold(None, |acc: Option<f64>, stop| Some(acc.map_or(stop, |a| a.max(stop))))
    }

    fn prune_finished(&mut self) {
        let now = self.generator.now();
        self.scheduled.retain(|(stop, _)| *stop > now);
    }
}
