// modules for describing music
pub mod chord;
pub mod hz;
pub mod note;
pub mod tuning;

// live input
pub mod live;
pub mod midi;
pub mod voice;

// making sounds
pub mod oscillator;
pub mod output;
pub mod render;
pub mod schedule;
pub mod tone;
pub mod wave;

// Utility modules
pub mod util;

pub use chord::{derive_chord_table, resolve_chord_frequencies};
pub use midi::decode_midi_message;
pub use tuning::{build_frequency_table, lookup_note_frequency};
