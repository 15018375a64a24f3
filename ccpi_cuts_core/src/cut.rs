//! Cut registry and single-cut evaluation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::select_quality_candidates;
use crate::cfg::{CutCfg, Side};
use crate::error::{IndexSource, Result, SelectError};
use crate::record::{branch, finite, finite_at, EventRecord, TrackIdx};
use crate::signal::SignalDefinition;
use crate::signature::{SignatureDetector, Signatures};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CutKind {
    Eventwide,
    /// Evaluated once per candidate track.
    Exclusive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CutSpec {
    pub kind: CutKind,
    /// Reads generator truth; meaningless on data.
    pub truth_only: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CutId {
    NoCuts,
    GoodObjects,
    GoodVertex,
    FiducialVolume,
    MinosActivity,
    Precuts,
    ZVertex,
    XYVertex,
    Vtx,
    MinosMatch,
    MinosCharge,
    MinosMuon,
    Wexp,
    IsoProngs,
    Pmu,
    AtLeastOneMichel,
    AtLeastOnePionCandidateTrack,
    HadronQuality,
    Llr,
    Node,
    PionMichel,
}

impl CutId {
    pub const ALL: [CutId; 21] = [
        Self::NoCuts,
        Self::GoodObjects,
        Self::GoodVertex,
        Self::FiducialVolume,
        Self::MinosActivity,
        Self::Precuts,
        Self::ZVertex,
        Self::XYVertex,
        Self::Vtx,
        Self::MinosMatch,
        Self::MinosCharge,
        Self::MinosMuon,
        Self::Wexp,
        Self::IsoProngs,
        Self::Pmu,
        Self::AtLeastOneMichel,
        Self::AtLeastOnePionCandidateTrack,
        Self::HadronQuality,
        Self::Llr,
        Self::Node,
        Self::PionMichel,
    ];

    pub fn spec(self) -> CutSpec {
        use CutKind::*;
        let (kind, truth_only) = match self {
            Self::GoodObjects
            | Self::GoodVertex
            | Self::FiducialVolume
            | Self::MinosActivity
            | Self::Precuts => (Eventwide, true),
            Self::HadronQuality | Self::Llr | Self::Node | Self::PionMichel => (Exclusive, false),
            _ => (Eventwide, false),
        };
        CutSpec { kind, truth_only }
    }

    pub fn is_exclusive(self) -> bool {
        self.spec().kind == CutKind::Exclusive
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCuts => "no_cuts",
            Self::GoodObjects => "good_objects",
            Self::GoodVertex => "good_vertex",
            Self::FiducialVolume => "fiducial_volume",
            Self::MinosActivity => "minos_activity",
            Self::Precuts => "precuts",
            Self::ZVertex => "z_vertex",
            Self::XYVertex => "xy_vertex",
            Self::Vtx => "vtx",
            Self::MinosMatch => "minos_match",
            Self::MinosCharge => "minos_charge",
            Self::MinosMuon => "minos_muon",
            Self::Wexp => "wexp",
            Self::IsoProngs => "iso_prongs",
            Self::Pmu => "pmu",
            Self::AtLeastOneMichel => "at_least_one_michel",
            Self::AtLeastOnePionCandidateTrack => "at_least_one_pion_candidate_track",
            Self::HadronQuality => "hadron_quality",
            Self::Llr => "llr",
            Self::Node => "node",
            Self::PionMichel => "pion_michel",
        }
    }
}

impl fmt::Display for CutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CutId {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| SelectError::UnknownCut(s.to_string()))
    }
}

/// Standard reco selection.
pub fn default_cuts() -> Vec<CutId> {
    vec![
        CutId::NoCuts,
        CutId::Vtx,
        CutId::MinosMuon,
        CutId::AtLeastOnePionCandidateTrack,
        CutId::AtLeastOneMichel,
        CutId::Llr,
        CutId::Node,
        CutId::Wexp,
        CutId::IsoProngs,
        CutId::Pmu,
    ]
}

/// Standard selection with the generator-level precuts in front. Simulation only.
pub fn truth_cuts() -> Vec<CutId> {
    let mut cuts = default_cuts();
    cuts.insert(1, CutId::Precuts);
    cuts
}

/// Parse a list of cut names, e.g. from a config file.
pub fn parse_cut_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<CutId>> {
    names.iter().map(|n| n.as_ref().trim().parse()).collect()
}

/// Why a cut failed.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    /// Side of a window the value fell on, for window cuts.
    pub side: Option<Side>,
    pub value: Option<f64>,
}

impl Rejection {
    pub fn below(value: f64) -> Self {
        Self {
            side: Some(Side::Low),
            value: Some(value),
        }
    }

    pub fn above(value: f64) -> Self {
        Self {
            side: Some(Side::High),
            value: Some(value),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CutOutcome {
    Pass,
    Fail(Rejection),
    /// An observable the cut needs was not computable. Counts as a failure.
    Undefined,
}

impl CutOutcome {
    pub const FAIL: CutOutcome = CutOutcome::Fail(Rejection {
        side: None,
        value: None,
    });

    #[inline]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    fn from_bool(b: bool) -> Self {
        if b {
            Self::Pass
        } else {
            Self::FAIL
        }
    }

    /// Conjunction; undefined wins over a clean failure.
    fn and(self, other: CutOutcome) -> Self {
        match (self, other) {
            (Self::Pass, o) => o,
            (Self::Undefined, _) | (_, Self::Undefined) => Self::Undefined,
            (f, _) => f,
        }
    }
}

/// `[min, max)` window check.
fn window(value: Option<f64>, min: f64, max: f64) -> CutOutcome {
    match value {
        None => CutOutcome::Undefined,
        Some(v) if v < min => CutOutcome::Fail(Rejection::below(v)),
        Some(v) if v >= max => CutOutcome::Fail(Rejection::above(v)),
        Some(_) => CutOutcome::Pass,
    }
}

fn flag(value: Option<f64>) -> CutOutcome {
    value.map_or(CutOutcome::Undefined, |v| CutOutcome::from_bool(v != 0.0))
}

/// Point inside a regular hexagon of the given apothem, flat sides at +-x.
pub fn in_hexagon(x: f64, y: f64, apothem: f64) -> bool {
    let side = apothem * 2.0 / 3.0_f64.sqrt();
    let slope = (side / 2.0) / apothem;
    let (xp, yp) = (x.abs(), y.abs());
    if xp * xp + yp * yp < apothem * apothem {
        return true;
    }
    xp <= apothem && yp < side - xp * slope
}

/// Result of evaluating one cut.
#[derive(Clone, Debug, PartialEq)]
pub struct CutEvaluation {
    pub outcome: CutOutcome,
    /// Signatures after this cut; a superset of the input.
    pub signatures: Signatures,
}

/// Everything a cut may read besides its own inputs.
pub struct CutContext<'a, R: ?Sized, D: ?Sized> {
    pub event: &'a R,
    pub detector: &'a D,
    pub is_simulated: bool,
    pub signal: SignalDefinition,
    pub cfg: &'a CutCfg,
}

impl<'a, R, D> CutContext<'a, R, D>
where
    R: EventRecord + ?Sized,
    D: SignatureDetector<R> + ?Sized,
{
    pub fn new(
        event: &'a R,
        detector: &'a D,
        is_simulated: bool,
        signal: SignalDefinition,
        cfg: &'a CutCfg,
    ) -> Self {
        Self {
            event,
            detector,
            is_simulated,
            signal,
            cfg,
        }
    }

    /// Evaluate `cut` against the event. `track` is required for exclusive
    /// cuts and ignored by eventwide ones. Pure given the same inputs.
    pub fn evaluate(
        &self,
        cut: CutId,
        signatures: &Signatures,
        track: Option<TrackIdx>,
    ) -> Result<CutEvaluation> {
        let spec = cut.spec();
        if spec.truth_only && !self.is_simulated {
            return Err(SelectError::TruthOnlyOnData(cut));
        }

        let (outcome, signatures) = match spec.kind {
            CutKind::Eventwide => self.eventwide(cut, signatures)?,
            CutKind::Exclusive => {
                let idx = track.ok_or(SelectError::MissingTrackIndex(cut))?;
                let n = self.event.track_count();
                if idx >= n {
                    return Err(SelectError::TrackOutOfRange {
                        entry: self.event.entry(),
                        index: idx as i64,
                        track_count: n,
                        origin: IndexSource::Candidate,
                    });
                }
                (self.track_cut(cut, signatures, idx), signatures.clone())
            }
        };

        if outcome.is_undefined() {
            debug!(
                entry = self.event.entry(),
                cut = %cut,
                track = ?track,
                "cut undefined for event"
            );
        }
        Ok(CutEvaluation { outcome, signatures })
    }

    fn eventwide(&self, cut: CutId, signatures: &Signatures) -> Result<(CutOutcome, Signatures)> {
        let ev = self.event;
        let cfg = self.cfg;
        let outcome = match cut {
            CutId::NoCuts => CutOutcome::Pass,
            CutId::GoodObjects => flag(finite(ev, branch::TRUTH_GOOD_OBJECTS)),
            CutId::GoodVertex => flag(finite(ev, branch::TRUTH_GOOD_VERTEX)),
            CutId::FiducialVolume => flag(finite(ev, branch::TRUTH_FIDUCIAL)),
            CutId::MinosActivity => flag(finite(ev, branch::TRUTH_MINOS_ACTIVITY)),
            CutId::Precuts => [
                branch::TRUTH_GOOD_OBJECTS,
                branch::TRUTH_GOOD_VERTEX,
                branch::TRUTH_FIDUCIAL,
                branch::TRUTH_MINOS_ACTIVITY,
            ]
            .into_iter()
            .fold(CutOutcome::Pass, |acc, b| acc.and(flag(finite(ev, b)))),
            CutId::ZVertex => self.z_vertex(),
            CutId::XYVertex => self.xy_vertex(),
            CutId::Vtx => self.z_vertex().and(self.xy_vertex()),
            CutId::MinosMatch => self.minos_match(),
            CutId::MinosCharge => self.minos_charge(),
            CutId::MinosMuon => self.minos_match().and(self.minos_charge()),
            CutId::Wexp => match self.signal.w_window(cfg) {
                None => CutOutcome::Pass,
                Some((lo, hi)) => window(finite(ev, branch::WEXP), lo, hi),
            },
            CutId::IsoProngs => match finite(ev, branch::N_ISO_PRONGS) {
                None => CutOutcome::Undefined,
                Some(n) if n < f64::from(cfg.iso_prongs_max) => CutOutcome::Pass,
                Some(n) => CutOutcome::Fail(Rejection::above(n)),
            },
            CutId::Pmu => window(finite(ev, branch::PMU), cfg.pmu_min, cfg.pmu_max),
            CutId::AtLeastOnePionCandidateTrack => {
                CutOutcome::from_bool(!select_quality_candidates(ev, cfg).is_empty())
            }
            CutId::AtLeastOneMichel => {
                let next = self.detect(signatures)?;
                return Ok((CutOutcome::from_bool(!next.is_empty()), next));
            }
            CutId::HadronQuality | CutId::Llr | CutId::Node | CutId::PionMichel => {
                unreachable!("exclusive cut {cut} dispatched as eventwide")
            }
        };
        Ok((outcome, signatures.clone()))
    }

    /// `signatures` with the detectors' findings folded in. The detectors
    /// run only if they have not run for this event yet.
    pub(crate) fn detect(&self, signatures: &Signatures) -> Result<Signatures> {
        let mut next = signatures.clone();
        if !next.detected {
            let endpoint = self.detector.endpoint_signatures(self.event);
            let vertex = self.detector.vertex_signature(self.event);
            next.absorb(endpoint, vertex);
            next.validate(self.event)?;
        }
        Ok(next)
    }

    fn track_cut(&self, cut: CutId, signatures: &Signatures, idx: TrackIdx) -> CutOutcome {
        match cut {
            CutId::Llr => llr_check(self.event, self.cfg, idx),
            CutId::Node => node_check(self.event, self.cfg, idx),
            CutId::HadronQuality => hadron_quality(self.event, self.cfg, idx),
            CutId::PionMichel => CutOutcome::from_bool(
                signatures.endpoint.contains_key(&idx) || signatures.vertex.track() == Some(idx),
            ),
            other => unreachable!("eventwide cut {other} dispatched per track"),
        }
    }

    fn z_vertex(&self) -> CutOutcome {
        let z = finite(self.event, branch::VTX_Z);
        match z {
            None => CutOutcome::Undefined,
            Some(z) if z < self.cfg.vtx_z_min => CutOutcome::Fail(Rejection::below(z)),
            Some(z) if z > self.cfg.vtx_z_max => CutOutcome::Fail(Rejection::above(z)),
            Some(_) => CutOutcome::Pass,
        }
    }

    fn xy_vertex(&self) -> CutOutcome {
        match (finite(self.event, branch::VTX_X), finite(self.event, branch::VTX_Y)) {
            (Some(x), Some(y)) => CutOutcome::from_bool(in_hexagon(x, y, self.cfg.vtx_apothem)),
            _ => CutOutcome::Undefined,
        }
    }

    fn minos_match(&self) -> CutOutcome {
        flag(finite(self.event, branch::MINOS_MATCH))
    }

    fn minos_charge(&self) -> CutOutcome {
        match finite(self.event, branch::MINOS_QP) {
            None => CutOutcome::Undefined,
            Some(qp) => CutOutcome::from_bool(qp < 0.0),
        }
    }
}

pub(crate) fn llr_check<R>(event: &R, cfg: &CutCfg, idx: TrackIdx) -> CutOutcome
where
    R: EventRecord + ?Sized,
{
    match finite_at(event, branch::HADRON_LLR, idx) {
        None => CutOutcome::Undefined,
        Some(s) if s > cfg.llr_min => CutOutcome::Pass,
        Some(s) => CutOutcome::Fail(Rejection::below(s)),
    }
}

pub(crate) fn node_check<R>(event: &R, cfg: &CutCfg, idx: TrackIdx) -> CutOutcome
where
    R: EventRecord + ?Sized,
{
    match finite_at(event, branch::HADRON_NODES, idx) {
        None => CutOutcome::Undefined,
        Some(n) if n < f64::from(cfg.nodes_min) => CutOutcome::Fail(Rejection::below(n)),
        Some(n) if n > f64::from(cfg.nodes_max) => CutOutcome::Fail(Rejection::above(n)),
        Some(_) => CutOutcome::Pass,
    }
}

pub(crate) fn hadron_quality<R>(event: &R, cfg: &CutCfg, idx: TrackIdx) -> CutOutcome
where
    R: EventRecord + ?Sized,
{
    llr_check(event, cfg, idx).and(node_check(event, cfg, idx))
}
