//! Error types for the thermal-triage crate.
//!
//! The analysis core itself is total: missing forecast data propagates as missing values and never
//! as an error. These errors are raised at the boundary, when configuration or source bags are
//! loaded.
use std::{error::Error, fmt::Display};

/// Error type for the crate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TriageError {
    /// The configuration file could not be read.
    ConfigRead {
        /// Path of the file.
        path: String,
        /// Underlying reason.
        reason: String,
    },
    /// The configuration file was read but is not valid.
    ConfigParse(String),
    /// A source bag could not be read or decoded.
    SourceBag {
        /// Path or key of the bag.
        origin: String,
        /// Underlying reason.
        reason: String,
    },
    /// A parameter array does not line up with the time axis of its series.
    MalformedSeries {
        /// The offending parameter key.
        param: String,
        /// Length of the time axis.
        expected: usize,
        /// Length of the parameter array.
        found: usize,
    },
    /// A parameter array holds something that is neither a number nor null.
    MalformedValue {
        /// The offending parameter key.
        param: String,
        /// Index of the slot on the time axis.
        slot: usize,
    },
    /// A requested location key is not in the configuration.
    UnknownLocation(String),
}

impl Display for TriageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use crate::TriageError::*;

        match self {
            ConfigRead { path, reason } => write!(f, "unable to read {}: {}", path, reason),
            ConfigParse(reason) => write!(f, "invalid configuration: {}", reason),
            SourceBag { origin, reason } => {
                write!(f, "unable to load source bag {}: {}", origin, reason)
            }
            MalformedSeries {
                param,
                expected,
                found,
            } => write!(
                f,
                "parameter {} has {} values for a time axis of length {}",
                param, found, expected
            ),
            MalformedValue { param, slot } => {
                write!(f, "parameter {} has a non-numeric value in slot {}", param, slot)
            }
            UnknownLocation(key) => write!(f, "unknown location: {}", key),
        }
    }
}

impl Error for TriageError {}

/// Shorthand for results.
pub type Result<T> = std::result::Result<T, TriageError>;
