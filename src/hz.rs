// syn.midi -- chord tables and a live MIDI synthesizer
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Frequencies that are positive and not NaN by construction, and hence are `Ord` and `Eq`.

use std::{fmt, num::ParseFloatError, str::FromStr};

/// A frequency in Hertz. Always finite and strictly positive.
#[derive(Debug, Clone, Copy)]
pub struct Hz(f64);

impl Hz {
    pub fn new(value: f64) -> Option<Hz> {
        if value.is_finite() && value > 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn into_inner(self) -> f64 {
        self.0
    }

    /// Whether two frequencies agree up to a relative tolerance.
    pub fn approx_eq(self, other: Hz, relative: f64) -> bool {
        (self.0 - other.0).abs() <= relative * self.0.max(other.0)
    }
}

impl PartialEq for Hz {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Hz {}

impl PartialOrd for Hz {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hz {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Hz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(precision) = f.precision() {
            write!(f, "{:.*} Hz", precision, self.0)
        } else {
            write!(f, "{} Hz", self.0)
        }
    }
}

impl FromStr for Hz {
    type Err = ParseHzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = s.strip_suffix("Hz").unwrap_or(s).trim_end();
        Self::new(number.parse::<f64>()?).ok_or(ParseHzError::NotPositive)
    }
}

///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub enum ParseHzError {
    NotPositive,
    Other(ParseFloatError),
}

impl fmt::Display for ParseHzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseHzError::NotPositive => write!(f, "frequency must be positive and finite"),
            ParseHzError::Other(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for ParseHzError {}

impl From<ParseFloatError> for ParseHzError {
    fn from(err: ParseFloatError) -> Self {
        ParseHzError::Other(err)
    }
}
