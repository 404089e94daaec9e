//! Data types flowing through the scrobbling pipeline.
//!
//! Records come out of the CSV reader, get resolved into [`TrackPair`]s, and
//! each row finally lands as a [`RowOutcome`] tallied in a [`ScrobbleSummary`].

use std::fmt;
use thiserror::Error;

use crate::ScrobbleError;

// ================================================================================================
// INPUT RECORDS
// ================================================================================================

/// One non-blank row of CSV input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvRecord {
    /// Fields in column order (no header row).
    Positional(Vec<String>),
    /// `(column name, value)` pairs in header order (header row present).
    Named(Vec<(String, String)>),
}

impl CsvRecord {
    /// Value stored under `name`, for header-mode records.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            CsvRecord::Named(fields) => fields
                .iter()
                .find(|(column, _)| column == name)
                .map(|(_, value)| value.as_str()),
            CsvRecord::Positional(_) => None,
        }
    }

    /// Value at `index`, counted in record order.
    pub fn column(&self, index: usize) -> Option<&str> {
        match self {
            CsvRecord::Positional(fields) => fields.get(index).map(String::as_str),
            CsvRecord::Named(fields) => fields.get(index).map(|(_, value)| value.as_str()),
        }
    }
}

// ================================================================================================
// TRACKS
// ================================================================================================

/// An artist/track combination ready to be scrobbled.
///
/// # Examples
///
/// ```rust
/// use csv_scrobbler::TrackPair;
///
/// let pair = TrackPair::new("Radiohead", "Paranoid Android");
/// assert_eq!(pair.to_string(), "Radiohead - Paranoid Android");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TrackPair {
    /// The artist name
    pub artist: String,
    /// The track name/title
    pub track: String,
}

impl TrackPair {
    pub fn new(artist: impl Into<String>, track: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            track: track.into(),
        }
    }
}

impl fmt::Display for TrackPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.track)
    }
}

/// Why a record could not be turned into a [`TrackPair`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    #[error("missing artist")]
    Artist,
    #[error("missing track")]
    Track,
}

// ================================================================================================
// OUTCOMES
// ================================================================================================

/// What happened to a single input row.
#[derive(Debug)]
pub enum RowOutcome {
    /// Last.fm accepted the scrobble.
    Scrobbled {
        pair: TrackPair,
        timestamp: i64,
    },
    /// Dry run: the row resolved but nothing was sent.
    Skipped {
        pair: TrackPair,
        timestamp: i64,
    },
    /// The row lacked an artist or track; nothing was sent.
    Unresolved {
        /// 1-based row number
        line: usize,
        reason: MissingField,
    },
    /// Last.fm (or the network) rejected the scrobble.
    Failed {
        /// 1-based row number
        line: usize,
        pair: TrackPair,
        error: ScrobbleError,
    },
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RowOutcome::Scrobbled { .. } | RowOutcome::Skipped { .. }
        )
    }
}

/// Running success/error counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrobbleSummary {
    pub successful: usize,
    pub failed: usize,
}

impl ScrobbleSummary {
    /// Count an outcome.
    pub fn record(&mut self, outcome: &RowOutcome) {
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }
}

impl fmt::Display for ScrobbleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} successful, {} failed", self.successful, self.failed)
    }
}
