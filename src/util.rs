//! Utility functions that I don't know where to put else

/// Compute a factor measured in semitones (one octave consists of 12 semitones)
///
/// # Example
///
/// ```
/// # use syn_midi::util::*;
///
/// assert_eq!(from_semitones(12.0), 2.0);
/// assert_eq!(from_semitones(-24.0), 0.25);
/// ```
pub fn from_semitones(semitones: f64) -> f64 {
    2.0f64.powf(semitones / 12.0)
}

/// Convert a number of seconds into a sample count, rounding to the nearest sample.
///
/// Negative times are clamped to zero.
///
/// # Example
///
/// ```
/// # use syn_midi::util::*;
///
/// assert_eq!(seconds_to_samples(0.5, 44100.0), 22050);
/// assert_eq!(seconds_to_samples(-1.0, 44100.0), 0);
/// ```
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    (seconds * sample_rate).round().max(0.0) as usize
}
