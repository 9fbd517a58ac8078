//! Getting rendered audio out of the process.

pub mod sox;
