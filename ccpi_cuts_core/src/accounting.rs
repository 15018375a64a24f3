//! Cut-flow bookkeeping across a processed dataset.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::cut::CutId;
use crate::error::{Result, SelectError};
use crate::pipeline::Classification;

/// Raw count plus generator-weighted sum. Data only moves the raw count.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Counter {
    pub raw: u64,
    pub weighted: f64,
}

impl Counter {
    #[inline]
    pub fn add(&mut self, weight: f64, is_simulated: bool) {
        self.raw += 1;
        if is_simulated {
            self.weighted += weight;
        }
    }

    fn merge(&mut self, other: &Counter) {
        self.raw += other.raw;
        self.weighted += other.weighted;
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StageCount {
    /// Events that passed every earlier stage.
    pub reached: Counter,
    /// Events that reached and passed this stage.
    pub passed: Counter,
    /// Reached but failed on an undefined observable.
    pub undefined: u64,
    /// Surviving candidate tracks summed over passing events.
    pub candidates: u64,
    /// Events whose only failed stage (if any) is this one.
    pub n_minus_one: Counter,
}

impl StageCount {
    fn merge(&mut self, other: &StageCount) {
        self.reached.merge(&other.reached);
        self.passed.merge(&other.passed);
        self.undefined += other.undefined;
        self.candidates += other.candidates;
        self.n_minus_one.merge(&other.n_minus_one);
    }
}

/// Per-stage counters in pipeline order plus per-facet totals.
///
/// Tables are additive: per-worker tables merged in any order give the same
/// totals as one table fed every event.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "TableParts")]
pub struct CutTable {
    cuts: Vec<CutId>,
    stages: Vec<StageCount>,
    pub events: u64,
    pub signal: Counter,
    pub all_except: Counter,
    pub sideband: Counter,
}

/// Wire form of a `CutTable`, checked before it becomes one.
#[derive(Deserialize)]
struct TableParts {
    cuts: Vec<CutId>,
    stages: Vec<StageCount>,
    events: u64,
    signal: Counter,
    all_except: Counter,
    sideband: Counter,
}

impl TryFrom<TableParts> for CutTable {
    type Error = SelectError;

    fn try_from(p: TableParts) -> Result<Self> {
        let table = Self {
            cuts: p.cuts,
            stages: p.stages,
            events: p.events,
            signal: p.signal,
            all_except: p.all_except,
            sideband: p.sideband,
        };
        table.validate()?;
        Ok(table)
    }
}

impl CutTable {
    pub fn new(cuts: &[CutId]) -> Self {
        Self {
            cuts: cuts.to_vec(),
            stages: vec![StageCount::default(); cuts.len()],
            ..Default::default()
        }
    }

    pub fn cuts(&self) -> &[CutId] {
        &self.cuts
    }

    /// One stage per cut, no cut twice.
    pub fn validate(&self) -> Result<()> {
        if self.stages.len() != self.cuts.len() {
            return Err(SelectError::TableMismatch(format!(
                "{} stages for {} cuts",
                self.stages.len(),
                self.cuts.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.cuts.len());
        if let Some(cut) = self.cuts.iter().find(|&&c| !seen.insert(c)) {
            return Err(SelectError::TableMismatch(format!("cut {cut} appears twice")));
        }
        Ok(())
    }

    pub fn stage(&self, cut: CutId) -> Option<&StageCount> {
        self.position(cut).ok().map(|i| &self.stages[i])
    }

    /// `(cut, counts)` in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (CutId, &StageCount)> + '_ {
        self.cuts.iter().copied().zip(self.stages.iter())
    }

    fn position(&self, cut: CutId) -> Result<usize> {
        self.cuts
            .iter()
            .position(|&c| c == cut)
            .ok_or_else(|| SelectError::TableMismatch(format!("cut {cut} not in table")))
    }

    /// One event reached `cut` and passed it or not.
    pub fn record(
        &mut self,
        cut: CutId,
        passed: bool,
        weight: f64,
        is_simulated: bool,
    ) -> Result<()> {
        let i = self.position(cut)?;
        let stage = &mut self.stages[i];
        stage.reached.add(weight, is_simulated);
        if passed {
            stage.passed.add(weight, is_simulated);
        }
        Ok(())
    }

    /// Account one classified event as a cut flow.
    ///
    /// `reached`/`passed` are cumulative: every stage up to and including
    /// the first failure is recorded as reached, later stages are not. The
    /// N-1 counts read every stage outcome, since the pipeline evaluates
    /// all of them. Callers wanting independent per-cut counts feed each
    /// stage to [`CutTable::record`] instead.
    pub fn tally(
        &mut self,
        classification: &Classification,
        weight: f64,
        is_simulated: bool,
    ) -> Result<()> {
        let stages = &classification.stages;
        let same_cuts = stages.len() == self.cuts.len()
            && stages.iter().zip(&self.cuts).all(|(s, &c)| s.cut == c);
        if !same_cuts {
            return Err(SelectError::TableMismatch(format!(
                "entry {} was classified with a different cut list",
                classification.entry
            )));
        }

        self.events += 1;
        for (i, s) in stages.iter().enumerate() {
            let passed = s.outcome.passed();
            self.record(s.cut, passed, weight, is_simulated)?;
            if s.outcome.is_undefined() {
                self.stages[i].undefined += 1;
            }
            if !passed {
                break;
            }
            self.stages[i].candidates += s.candidates as u64;
        }

        let failed: Vec<usize> = stages
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.outcome.passed())
            .map(|(i, _)| i)
            .collect();
        match failed.as_slice() {
            [] => {
                for stage in &mut self.stages {
                    stage.n_minus_one.add(weight, is_simulated);
                }
            }
            [only] => self.stages[*only].n_minus_one.add(weight, is_simulated),
            _ => {}
        }

        if classification.passes_all_cuts {
            self.signal.add(weight, is_simulated);
        }
        if classification.passes_all_except_distinguished {
            self.all_except.add(weight, is_simulated);
        }
        if classification.is_sideband {
            self.sideband.add(weight, is_simulated);
        }
        Ok(())
    }

    /// Sum `other` into `self`. Both must come from the same cut list.
    pub fn merge(&mut self, other: &CutTable) -> Result<()> {
        if self.cuts != other.cuts {
            return Err(SelectError::TableMismatch(format!(
                "cannot merge tables over {:?} and {:?}",
                self.cuts, other.cuts
            )));
        }
        for (mine, theirs) in self.stages.iter_mut().zip(&other.stages) {
            mine.merge(theirs);
        }
        self.events += other.events;
        self.signal.merge(&other.signal);
        self.all_except.merge(&other.all_except);
        self.sideband.merge(&other.sideband);
        Ok(())
    }

    /// Passed / reached for a stage, raw counts.
    pub fn efficiency(&self, cut: CutId) -> Option<f64> {
        let s = self.stage(cut)?;
        (s.reached.raw > 0).then(|| s.passed.raw as f64 / s.reached.raw as f64)
    }
}
