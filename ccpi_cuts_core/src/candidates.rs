//! Pion candidate selection: track quality filter plus signature reconciliation.

use std::collections::BTreeSet;

use crate::cfg::CutCfg;
use crate::cut::hadron_quality;
use crate::error::Result;
use crate::record::{EventRecord, TrackIdx};
use crate::signature::{EndpointSignatureMap, Signatures, VertexSignature};

/// Tracks passing the hadron quality checks (LLR and node count).
/// Tracks with undefined inputs are dropped. Ascending.
pub fn select_quality_candidates<R: EventRecord + ?Sized>(
    event: &R,
    cfg: &CutCfg,
) -> Vec<TrackIdx> {
    (0..event.track_count())
        .filter(|&idx| hadron_quality(event, cfg, idx).passed())
        .collect()
}

/// Tracks implicated by either signature source, ascending and deduplicated.
/// The sentinel vertex record contributes nothing.
pub fn merge_signature_candidates(
    endpoint: &EndpointSignatureMap,
    vertex: &VertexSignature,
) -> Vec<TrackIdx> {
    let mut idxs: BTreeSet<TrackIdx> = endpoint.keys().copied().collect();
    idxs.extend(vertex.track());
    idxs.into_iter().collect()
}

/// Candidate set: quality tracks plus every signature-implicated track,
/// whether or not it passed the quality filter.
///
/// Fails if a signature points past the event's tracks, which means the
/// signatures belong to a different event.
pub fn reconcile_candidates<R: EventRecord + ?Sized>(
    event: &R,
    quality: &[TrackIdx],
    signatures: &Signatures,
) -> Result<Vec<TrackIdx>> {
    signatures.validate(event)?;
    let mut idxs: BTreeSet<TrackIdx> = quality.iter().copied().collect();
    idxs.extend(merge_signature_candidates(&signatures.endpoint, &signatures.vertex));
    Ok(idxs.into_iter().collect())
}
