//! Error types for cut evaluation.

use thiserror::Error;

use crate::cut::CutId;
use crate::signal::SignalDefinition;

/// Which collaborator produced a track index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    Endpoint,
    Vertex,
    Candidate,
}

impl std::fmt::Display for IndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Endpoint => "endpoint signature",
            Self::Vertex => "vertex signature",
            Self::Candidate => "candidate set",
        })
    }
}

/// Selection error.
///
/// Configuration and consistency errors are fatal for the event (or batch)
/// being classified. An undefined observable is not an error; see
/// [`crate::CutOutcome::Undefined`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    /// Cut name not in the registry.
    #[error("unknown cut: {0}")]
    UnknownCut(String),

    /// Same cut listed twice.
    #[error("cut {0} appears more than once in the cut list")]
    DuplicateCut(CutId),

    /// Truth-level cut requested on data.
    #[error("cut {0} reads generator truth and cannot run on data")]
    TruthOnlyOnData(CutId),

    /// The sideband cut of a signal definition is not in the active list.
    #[error("distinguished cut {cut} for {signal} is not in the active cut list")]
    DistinguishedCutInactive { cut: CutId, signal: SignalDefinition },

    /// Exclusive cut evaluated without a track.
    #[error("exclusive cut {0} needs a track index")]
    MissingTrackIndex(CutId),

    /// Accounting tables built from different cut lists.
    #[error("cut table mismatch: {0}")]
    TableMismatch(String),

    /// Track index outside `[0, track_count)` for this event.
    #[error("{origin} index {index} out of range for entry {entry} ({track_count} tracks)")]
    TrackOutOfRange {
        entry: u64,
        index: i64,
        track_count: usize,
        origin: IndexSource,
    },

    /// Event larger than the configured track bound.
    #[error("entry {entry} has {track_count} tracks, bound is {max}")]
    TooManyTracks {
        entry: u64,
        track_count: usize,
        max: usize,
    },

    /// Derived cache read or written under a different event generation.
    #[error("stale event cache: cached generation {cached}, current {current}")]
    StaleCache { cached: u64, current: u64 },
}

impl SelectError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownCut(_)
                | Self::DuplicateCut(_)
                | Self::TruthOnlyOnData(_)
                | Self::DistinguishedCutInactive { .. }
                | Self::MissingTrackIndex(_)
                | Self::TableMismatch(_)
        )
    }

    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::TrackOutOfRange { .. } | Self::TooManyTracks { .. } | Self::StaleCache { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SelectError>;
