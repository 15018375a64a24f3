//! Decay-signature records produced by the external detectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndexSource, Result, SelectError};
use crate::record::{EventRecord, TrackIdx};

/// One detected decay signature (a Michel-like electron).
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DecaySignature {
    /// Visible energy, MeV.
    pub energy: f64,
    /// Distance to the anchor (track endpoint or vertex), mm.
    pub distance: f64,
    /// Time after the parent, ns.
    pub time: f64,
}

/// Track index -> signature found at that track's endpoint.
pub type EndpointSignatureMap = BTreeMap<TrackIdx, DecaySignature>;

/// Best signature anchored at the event vertex.
///
/// `idx == -1` is the "no candidate" sentinel.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VertexSignature {
    pub idx: i64,
    pub signature: DecaySignature,
}

impl VertexSignature {
    pub const NONE_IDX: i64 = -1;

    pub fn new(track: TrackIdx, signature: DecaySignature) -> Self {
        Self {
            idx: track as i64,
            signature,
        }
    }

    pub fn is_none(&self) -> bool {
        self.idx == Self::NONE_IDX
    }

    /// The implicated track, if any. Negative indices other than the
    /// sentinel are rejected by [`Signatures::validate`].
    pub fn track(&self) -> Option<TrackIdx> {
        usize::try_from(self.idx).ok()
    }
}

impl Default for VertexSignature {
    fn default() -> Self {
        Self {
            idx: Self::NONE_IDX,
            signature: DecaySignature::default(),
        }
    }
}

/// Signature state carried through one pipeline pass.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Signatures {
    pub endpoint: EndpointSignatureMap,
    pub vertex: VertexSignature,
    /// Whether the detectors already ran for this event.
    pub detected: bool,
}

impl Signatures {
    pub fn is_empty(&self) -> bool {
        self.endpoint.is_empty() && self.vertex.is_none()
    }

    /// Fold a fresh detection in without dropping what is already known.
    pub fn absorb(&mut self, endpoint: EndpointSignatureMap, vertex: VertexSignature) {
        for (idx, sig) in endpoint {
            self.endpoint.entry(idx).or_insert(sig);
        }
        if self.vertex.is_none() {
            self.vertex = vertex;
        }
        self.detected = true;
    }

    /// Every implicated index must be a track of `event`.
    pub fn validate<R: EventRecord + ?Sized>(&self, event: &R) -> Result<()> {
        let n = event.track_count();
        if let Some(idx) = self.endpoint.keys().copied().find(|&idx| idx >= n) {
            return Err(SelectError::TrackOutOfRange {
                entry: event.entry(),
                index: idx as i64,
                track_count: n,
                origin: IndexSource::Endpoint,
            });
        }
        let v = self.vertex.idx;
        if v < VertexSignature::NONE_IDX || (v >= 0 && v as usize >= n) {
            return Err(SelectError::TrackOutOfRange {
                entry: event.entry(),
                index: v,
                track_count: n,
                origin: IndexSource::Vertex,
            });
        }
        Ok(())
    }
}

/// External decay-signature detectors.
pub trait SignatureDetector<R: EventRecord + ?Sized> {
    fn endpoint_signatures(&self, event: &R) -> EndpointSignatureMap;

    fn vertex_signature(&self, event: &R) -> VertexSignature;
}

/// Detector that never finds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSignatures;

impl<R: EventRecord + ?Sized> SignatureDetector<R> for NoSignatures {
    fn endpoint_signatures(&self, _event: &R) -> EndpointSignatureMap {
        EndpointSignatureMap::new()
    }

    fn vertex_signature(&self, _event: &R) -> VertexSignature {
        VertexSignature::default()
    }
}
