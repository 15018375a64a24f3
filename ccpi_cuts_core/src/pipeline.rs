//! Cut pipeline: one evaluation pass per event, three classification facets.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::{reconcile_candidates, select_quality_candidates};
use crate::cfg::CutCfg;
use crate::cut::{CutContext, CutId, CutOutcome};
use crate::error::{Result, SelectError};
use crate::record::{EventRecord, TrackIdx};
use crate::signal::SignalDefinition;
use crate::signature::{SignatureDetector, Signatures};
use crate::state::Cursor;

/// Outcome of one pipeline stage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct StageRecord {
    pub cut: CutId,
    pub outcome: CutOutcome,
    /// Candidates surviving after this stage (0 before the set exists).
    pub candidates: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub entry: u64,
    pub signal: SignalDefinition,
    pub passes_all_cuts: bool,
    pub is_sideband: bool,
    pub passes_all_except_distinguished: bool,
    /// Surviving pion candidates after every exclusive cut, ascending.
    /// Empty when the list has no exclusive cuts.
    pub candidates: Vec<TrackIdx>,
    /// Candidate set as it stood when the first exclusive cut ran.
    pub entry_candidates: Vec<TrackIdx>,
    pub signatures: Signatures,
    pub stages: Vec<StageRecord>,
}

/// Reject cut lists that can never be evaluated as asked.
pub fn validate_cut_list(
    cuts: &[CutId],
    is_simulated: bool,
    signal: SignalDefinition,
) -> Result<()> {
    let mut seen = HashSet::with_capacity(cuts.len());
    for &cut in cuts {
        if !seen.insert(cut) {
            return Err(SelectError::DuplicateCut(cut));
        }
        if cut.spec().truth_only && !is_simulated {
            return Err(SelectError::TruthOnlyOnData(cut));
        }
    }
    if let Some(cut) = signal.distinguished_cut() {
        if !seen.contains(&cut) {
            return Err(SelectError::DistinguishedCutInactive { cut, signal });
        }
    }
    Ok(())
}

/// Classify one event from scratch.
pub fn classify<R, D>(ctx: &CutContext<'_, R, D>, cuts: &[CutId]) -> Result<Classification>
where
    R: EventRecord + ?Sized,
    D: SignatureDetector<R> + ?Sized,
{
    classify_with(ctx, cuts, Signatures::default())
}

/// Classify one event starting from signatures already known for it.
pub fn classify_with<R, D>(
    ctx: &CutContext<'_, R, D>,
    cuts: &[CutId],
    prior: Signatures,
) -> Result<Classification>
where
    R: EventRecord + ?Sized,
    D: SignatureDetector<R> + ?Sized,
{
    validate_cut_list(cuts, ctx.is_simulated, ctx.signal)?;

    let ev = ctx.event;
    let track_count = ev.track_count();
    if track_count > ctx.cfg.max_tracks {
        return Err(SelectError::TooManyTracks {
            entry: ev.entry(),
            track_count,
            max: ctx.cfg.max_tracks,
        });
    }
    prior.validate(ev)?;

    let mut signatures = prior;
    let mut candidates: Option<Vec<TrackIdx>> = None;
    let mut entry_candidates = Vec::new();
    let mut stages = Vec::with_capacity(cuts.len());

    for &cut in cuts {
        let outcome = if cut.is_exclusive() {
            let pool = match candidates.take() {
                Some(pool) => pool,
                None => {
                    // Signature-tagged tracks are candidates whatever the cut order.
                    signatures = ctx.detect(&signatures)?;
                    let quality = select_quality_candidates(ev, ctx.cfg);
                    let pool = reconcile_candidates(ev, &quality, &signatures)?;
                    entry_candidates = pool.clone();
                    pool
                }
            };
            let (kept, outcome) = exclusive_stage(ctx, cut, &signatures, pool)?;
            candidates = Some(kept);
            outcome
        } else {
            let eval = ctx.evaluate(cut, &signatures, None)?;
            signatures = eval.signatures;
            eval.outcome
        };
        stages.push(StageRecord {
            cut,
            outcome,
            candidates: candidates.as_ref().map_or(0, Vec::len),
        });
    }

    let distinguished = ctx.signal.distinguished_cut();
    let passes_all_cuts = stages.iter().all(|s| s.outcome.passed());
    let passes_all_except_distinguished = stages
        .iter()
        .filter(|s| Some(s.cut) != distinguished)
        .all(|s| s.outcome.passed());
    let is_sideband = passes_all_except_distinguished
        && is_sideband_failure(&stages, distinguished, ctx.signal, ctx.cfg);

    let out = Classification {
        entry: ev.entry(),
        signal: ctx.signal,
        passes_all_cuts,
        is_sideband,
        passes_all_except_distinguished,
        candidates: candidates.unwrap_or_default(),
        entry_candidates,
        signatures,
        stages,
    };
    debug!(
        entry = out.entry,
        signal = %out.signal,
        passes = out.passes_all_cuts,
        sideband = out.is_sideband,
        all_except = out.passes_all_except_distinguished,
        candidates = out.candidates.len(),
        "classified event"
    );
    Ok(out)
}

/// Classify the cursor's current event, reusing and refreshing its cache.
pub fn classify_cursor<R, D>(
    cursor: &mut Cursor<R>,
    detector: &D,
    is_simulated: bool,
    signal: SignalDefinition,
    cfg: &CutCfg,
    cuts: &[CutId],
) -> Result<Classification>
where
    R: EventRecord,
    D: SignatureDetector<R> + ?Sized,
{
    let generation = cursor.generation();
    let prior = cursor.signatures()?.cloned().unwrap_or_default();
    let ctx = CutContext::new(cursor.record(), detector, is_simulated, signal, cfg);
    let out = classify_with(&ctx, cuts, prior)?;
    cursor.store(generation, out.signatures.clone(), out.candidates.clone())?;
    Ok(out)
}

/// Run one exclusive cut over `pool`, keeping the tracks that pass.
fn exclusive_stage<R, D>(
    ctx: &CutContext<'_, R, D>,
    cut: CutId,
    signatures: &Signatures,
    pool: Vec<TrackIdx>,
) -> Result<(Vec<TrackIdx>, CutOutcome)>
where
    R: EventRecord + ?Sized,
    D: SignatureDetector<R> + ?Sized,
{
    let tried = pool.len();
    let mut undefined = 0usize;
    let mut kept = Vec::with_capacity(tried);
    for idx in pool {
        let eval = ctx.evaluate(cut, signatures, Some(idx))?;
        match eval.outcome {
            CutOutcome::Pass => kept.push(idx),
            CutOutcome::Undefined => undefined += 1,
            CutOutcome::Fail(_) => {}
        }
    }

    let outcome = if !kept.is_empty() {
        CutOutcome::Pass
    } else if tried > 0 && undefined == tried {
        CutOutcome::Undefined
    } else {
        CutOutcome::FAIL
    };
    Ok((kept, outcome))
}

fn is_sideband_failure(
    stages: &[StageRecord],
    distinguished: Option<CutId>,
    signal: SignalDefinition,
    cfg: &CutCfg,
) -> bool {
    let (Some(cut), Some(policy)) = (distinguished, signal.sideband_policy(cfg)) else {
        return false;
    };
    stages
        .iter()
        .find(|s| s.cut == cut)
        .is_some_and(|s| match s.outcome {
            CutOutcome::Fail(r) => match (r.side, r.value) {
                (Some(side), Some(value)) => policy.admits(side, value),
                _ => false,
            },
            _ => false,
        })
}
