// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The interface between the scheduling logic and whatever actually produces sound.

use std::fmt;

use crate::hz::Hz;

/// Gain of a voice played without velocity information.
pub const DEFAULT_GAIN: f64 = 0.08;

/// Gain of faded voices at their stop time, relative to their peak.
pub const FADE_FLOOR: f64 = 0.001;

/// Gain for a MIDI velocity, where a velocity of 100 corresponds to unity gain.
///
/// ```
/// use syn_midi::tone::*;
///
/// assert_eq!(velocity_gain(Some(50), DEFAULT_GAIN), 0.5);
/// assert_eq!(velocity_gain(None, DEFAULT_GAIN), DEFAULT_GAIN);
/// ```
pub fn velocity_gain(velocity: Option<u8>, default_gain: f64) -> f64 {
    velocity.map_or(default_gain, |v| v as f64 / 100.0)
}

/// Everything a tone generator needs to know for starting a voice.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VoiceParams {
    pub frequency: Hz,
    /// Absolute start time in seconds on the generator clock.
    pub start: f64,
    /// Absolute stop time in seconds, or `None` to play until stopped explicitly.
    pub stop: Option<f64>,
    /// Peak gain of the voice.
    pub gain: f64,
    /// If set, the gain ramps down exponentially from `gain` at the start
    /// to `gain * fade_floor` at the stop time.
    pub fade_floor: Option<f64>,
}

/// Something that turns voice descriptions into sound.
///
/// Starting and stopping voices never blocks, the generator is expected to
/// execute the requests when its clock reaches the requested times.
pub trait ToneGenerator {
    /// Opaque handle identifying a voice created by this generator.
    type Handle: Copy + Eq + fmt::Debug;

    /// Current time of the monotonic generator clock in seconds.
    fn now(&self) -> f64;

    fn create_voice(&mut self, params: VoiceParams) -> Self::Handle;

    /// Stop a voice at the given time. Stopping a voice that has already
    /// finished, or stopping it later than already requested, has no effect.
    fn stop_voice(&mut self, handle: Self::Handle, at: f64);
}

/// Opaque handle indicating a playing voice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) usize);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// A voice as seen by the [`Recorder`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedVoice {
    pub id: VoiceId,
    pub params: VoiceParams,
    /// Time of the earliest explicit stop request, if any.
    pub stopped_at: Option<f64>,
}

impl RecordedVoice {
    /// The time the voice ends, either from its parameters or an explicit stop.
    pub fn end(&self) -> Option<f64> {
        match (self.params.stop, self.stopped_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether the voice produces sound at time `t`.
    pub fn is_sounding_at(&self, t: f64) -> bool {
        t >= self.params.start && self.end().map_or(true, |end| t < end)
    }
}

/// A tone generator that makes no sound but remembers every request.
///
/// Used for dry runs and for testing the scheduling logic.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    now: f64,
    voices: Vec<RecordedVoice>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds.max(0.0);
    }

    /// All voices ever created, in creation order.
    pub fn voices(&self) -> &[RecordedVoice] {
        &self.voices
    }

    pub fn voice(&self, handle: VoiceId) -> Option<&RecordedVoice> {
        self.voices.get(handle.0)
    }

    /// Voices producing sound at the current time.
    pub fn sounding(&self) -> impl Iterator<Item = &RecordedVoice> + '_ {
        let now = self.now;
        self.voices.iter().filter(move |v| v.is_sounding_at(now))
    }
}

impl ToneGenerator for Recorder {
    type Handle = VoiceId;

    fn now(&self) -> f64 {
        self.now
    }

    fn create_voice(&mut self, params: VoiceParams) -> VoiceId {
        let id = VoiceId(self.voices.len());
        self.voices.push(RecordedVoice {
            id,
            params,
            stopped_at: None,
        });
        id
    }

    fn stop_voice(&mut self, handle: VoiceId, at: f64) {
        if let Some(voice) = self.voices.get_mut(handle.0) {
            voice.stopped_at = Some(voice.stopped_at.map_or(at, |t| t.min(at)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: f64, stop: Option<f64>) -> VoiceParams {
        VoiceParams {
            frequency: Hz::new(440.0).unwrap(),
            start,
            stop,
            gain: DEFAULT_GAIN,
            fade_floor: None,
        }
    }

    #[test]
    fn recorder_keeps_earliest_stop() {
        let mut rec = Recorder::new();
        let h = rec.create_voice(params(0.0, None));
        rec.stop_voice(h, 3.0);
        rec.stop_voice(h, 2.0);
        rec.stop_voice(h, 4.0);
        assert_eq!(rec.voice(h).unwrap().stopped_at, Some(2.0));
    }

    #[test]
    fn sounding_follows_the_clock() {
        let mut rec = Recorder::new();
        let a = rec.create_voice(params(0.0, Some(1.0)));
        let b = rec.create_voice(params(0.5, None));
        let ids = |rec: &Recorder| rec.sounding().map(|v| v.id).collect::<Vec<_>>();

        assert_eq!(ids(&rec), vec![a]);
        rec.advance(0.75);
        assert_eq!(ids(&rec), vec![a, b]);
        rec.advance(0.5);
        assert_eq!(ids(&rec), vec![b]);
        rec.stop_voice(b, rec.now());
        assert!(ids(&rec).is_empty());
    }

    #[test]
    fn velocity_scaling() {
        assert_eq!(velocity_gain(Some(100), DEFAULT_GAIN), 1.0);
        assert_eq!(velocity_gain(Some(0), DEFAULT_GAIN), 0.0);
        assert_eq!(velocity_gain(None, 0.25), 0.25);
    }
}
