// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! A tone generator rendering each voice as a single oscillator.

use crate::oscillator::{Phase, WaveShape};
use crate::tone::{ToneGenerator, VoiceId, VoiceParams};
use crate::util::seconds_to_samples;
use crate::wave::Stereo;

pub struct SineBank {
    /// Samples per second rate of the generated audio signal.
    sample_rate: f64,
    /// Shape of all oscillators, sine unless configured otherwise.
    shape: WaveShape,

    /// Number of samples already rendered, the clock of the generator.
    samples_processed: usize,

    /// Monotoneously increasing id used for identifying playing voices.
    next_voice_id: usize,
    voices: Vec<VoiceState>,
}

impl SineBank {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_shape(sample_rate, WaveShape::Sine)
    }

    pub fn with_shape(sample_rate: f64, shape: WaveShape) -> Self {
        SineBank {
            sample_rate,
            shape,
            samples_processed: 0,
            next_voice_id: 0,
            voices: vec![],
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of voices that are playing or waiting for their start.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Whether there is nothing left to play.
    pub fn is_idle(&self) -> bool {
        self.voices.is_empty()
    }

    /// Mix all voices into `output`, advancing the clock by its length.
    pub fn fill_buffer(&mut self, output: &mut [Stereo<f64>]) {
        for out_sample in output.iter_mut() {
            let t = self.samples_processed;
            let mut wave = 0.0;
            for voice in self.voices.iter_mut() {
                wave += voice.sample(t, self.shape, self.sample_rate);
            }
            *out_sample += Stereo::mono(wave);
            self.samples_processed += 1;
        }

        let now = self.samples_processed;
        let voice_count = self.voices.len();
        for voice_index in (0..voice_count).rev() {
            if self.voices[voice_index].finished(now) {
                log::trace!("removing finished {:?}", self.voices[voice_index].id);
                self.voices.swap_remove(voice_index);
            }
        }
    }
}

impl ToneGenerator for SineBank {
    type Handle = VoiceId;

    fn now(&self) -> f64 {
        self.samples_processed as f64 / self.sample_rate
    }

    fn create_voice(&mut self, params: VoiceParams) -> VoiceId {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;

        let start_sample = seconds_to_samples(params.start, self.sample_rate);
        let stop_sample = params
            .stop
            .map(|stop| seconds_to_samples(stop, self.sample_rate).max(start_sample));
        self.voices.push(VoiceState {
            id,
            frequency: params.frequency.into_inner(),
            gain: params.gain,
            start_sample,
            stop_sample,
            fade: params.fade_floor.zip(stop_sample),
            phase: Phase::ZERO,
        });
        id
    }

    fn stop_voice(&mut self, handle: VoiceId, at: f64) {
        let at_sample = seconds_to_samples(at, self.sample_rate);
        if let Some(voice) = self.voices.iter_mut().find(|v| v.id == handle) {
            voice.stop_sample = Some(voice.stop_sample.map_or(at_sample, |s| s.min(at_sample)));
        }
    }
}

/// State needed for a playing voice.
struct VoiceState {
    id: VoiceId,
    frequency: f64,
    gain: f64,
    /// Sample at which the voice starts
    start_sample: usize,
    /// Sample at which the voice ends, if known yet
    stop_sample: Option<usize>,
    /// Fade floor and the sample at which it is reached
    fade: Option<(f64, usize)>,
    phase: Phase,
}

impl VoiceState {
    fn sample(&mut self, t: usize, shape: WaveShape, sample_rate: f64) -> f64 {
        if t < self.start_sample || self.finished(t) {
            return 0.0;
        }
        let value = shape.eval(self.phase) * self.amplitude(t);
        self.phase = self.phase.step_frequency(self.frequency, sample_rate);
        value
    }

    fn amplitude(&self, t: usize) -> f64 {
        match self.fade {
            Some((floor, fade_end)) if fade_end > self.start_sample => {
                let elapsed = (t - self.start_sample) as f64;
                let progress = elapsed / (fade_end - self.start_sample) as f64;
                self.gain * floor.powf(progress.min(1.0))
            }
            _ => self.gain,
        }
    }

    fn finished(&self, t: usize) -> bool {
        self.stop_sample.map_or(false, |stop| t >= stop)
    }
}
