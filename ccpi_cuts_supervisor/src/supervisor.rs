//! Sharded cut supervisor.
//!
//! Outside-world facing orchestration around `ccpi_cuts_core`:
//! - validates the cut list once per batch
//! - classifies events in parallel; each worker owns its cursor and cut table
//! - merges worker tables into a per-sample table (sum, order-free)
//! - snapshot/restore of the accumulated tables
//!
//! No IO. No async.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;
use tracing::{info, warn};

use ccpi_cuts_core::{
    classify_with, validate_cut_list, Classification, Cursor, CutCfg, CutContext, CutId, CutTable,
    EventRecord, Result, SelectError, SignalDefinition, SignatureDetector,
};

/// Per-event output of an ingest.
#[derive(Clone, Debug)]
pub struct EventDecision {
    pub entry: u64,
    /// Consistency failures land here; the rest of the batch still runs.
    pub outcome: std::result::Result<Classification, SelectError>,
}

impl EventDecision {
    pub fn classification(&self) -> Option<&Classification> {
        self.outcome.as_ref().ok()
    }
}

/// Snapshot of accumulated tables for storage-agnostic persistence.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SupervisorSnapshot {
    /// Per-sample cut table.
    pub tables: Vec<(String, CutTable)>,
}

/// Counters returned by restore/import operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RestoreStats {
    /// Number of sample tables applied from the snapshot/iterator.
    pub applied: usize,
    /// Number of existing sample tables that were overwritten.
    pub overwritten: usize,
}

#[derive(Default, Debug)]
struct Shard {
    tables: HashMap<String, CutTable>,
}

/// Deterministic FNV-1a hash (stable across runs).
fn fnv1a_u64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn shard_index(sample: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    (fnv1a_u64(sample) as usize) % shard_count
}

/// One rayon worker's private state. Nothing here is shared between workers.
struct Worker<'a, R> {
    cursor: Option<Cursor<&'a R>>,
    table: CutTable,
    decisions: Vec<EventDecision>,
}

impl<'a, R: EventRecord> Worker<'a, R> {
    fn new(cuts: &[CutId]) -> Self {
        Self {
            cursor: None,
            table: CutTable::new(cuts),
            decisions: Vec::new(),
        }
    }

    fn step<D>(
        mut self,
        ev: &'a R,
        detector: &D,
        is_simulated: bool,
        signal: SignalDefinition,
        cfg: &CutCfg,
        cuts: &[CutId],
    ) -> Self
    where
        D: SignatureDetector<R> + ?Sized,
    {
        let mut cursor = match self.cursor.take() {
            Some(mut c) => {
                c.advance(ev);
                c
            }
            None => Cursor::new(ev),
        };

        let outcome = classify_event(
            &mut cursor,
            &mut self.table,
            detector,
            is_simulated,
            signal,
            cfg,
            cuts,
        );
        if let Err(e) = &outcome {
            warn!(entry = ev.entry(), error = %e, "event skipped");
        }
        self.decisions.push(EventDecision {
            entry: ev.entry(),
            outcome,
        });
        self.cursor = Some(cursor);
        self
    }
}

/// Classify the cursor's event, cache the result on the cursor and account it.
fn classify_event<'a, R, D>(
    cursor: &mut Cursor<&'a R>,
    table: &mut CutTable,
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
    let ev: &'a R = *cursor.record();
    let ctx = CutContext::new(ev, detector, is_simulated, signal, cfg);
    let out = classify_with(&ctx, cuts, prior)?;
    cursor.store(generation, out.signatures.clone(), out.candidates.clone())?;
    table.tally(&out, ev.weight(), is_simulated)?;
    Ok(out)
}

/// A sharded supervisor. One accumulated table per sample name
/// ("data", "mc", a systematic universe, ...).
#[derive(Debug)]
pub struct CutSupervisor {
    cfg: CutCfg,
    /// Optional per-signal cfg overrides.
    cfg_overrides: HashMap<SignalDefinition, CutCfg>,
    cuts: Vec<CutId>,
    shards: usize,
    state_shards: Vec<Mutex<Shard>>,
}

impl CutSupervisor {
    /// Create a supervisor with `shards` table shards. `shards=1` is the default.
    pub fn new(shards: usize, cfg: CutCfg, cuts: Vec<CutId>) -> Self {
        let shards = shards.max(1);
        let state_shards = (0..shards).map(|_| Mutex::new(Shard::default())).collect();
        Self {
            cfg,
            cfg_overrides: HashMap::new(),
            cuts,
            shards,
            state_shards,
        }
    }

    pub fn cuts(&self) -> &[CutId] {
        &self.cuts
    }

    /// Override cfg for one signal definition.
    pub fn set_cfg_override(&mut self, signal: SignalDefinition, cfg: CutCfg) {
        self.cfg_overrides.insert(signal, cfg);
    }

    pub fn clear_cfg_override(&mut self, signal: SignalDefinition) {
        self.cfg_overrides.remove(&signal);
    }

    pub fn cfg_for(&self, signal: SignalDefinition) -> &CutCfg {
        self.cfg_overrides.get(&signal).unwrap_or(&self.cfg)
    }

    fn shard_for(&self, sample: &str) -> MutexGuard<'_, Shard> {
        self.state_shards[shard_index(sample, self.shards)].lock()
    }

    /// Classify a batch and fold it into `sample`'s table.
    ///
    /// Configuration errors abort the whole batch before any event runs.
    /// Per-event consistency errors are reported in the decision and the
    /// event is left out of the table. Decisions come back sorted by entry.
    pub fn ingest<R, D>(
        &self,
        sample: &str,
        detector: &D,
        events: &[R],
        is_simulated: bool,
        signal: SignalDefinition,
    ) -> Result<Vec<EventDecision>>
    where
        R: EventRecord + Sync,
        D: SignatureDetector<R> + Sync + ?Sized,
    {
        validate_cut_list(&self.cuts, is_simulated, signal)?;
        let cfg = self.cfg_for(signal);
        let cuts = self.cuts.as_slice();

        let (batch, mut decisions) = events
            .par_iter()
            .fold(
                || Worker::new(cuts),
                |w, ev| w.step(ev, detector, is_simulated, signal, cfg, cuts),
            )
            .map(|w| Ok::<_, SelectError>((w.table, w.decisions)))
            .try_reduce(
                || (CutTable::new(cuts), Vec::new()),
                |(mut table, mut decisions), (other, more)| {
                    table.merge(&other)?;
                    decisions.extend(more);
                    Ok((table, decisions))
                },
            )?;
        decisions.sort_by_key(|d| d.entry);

        let failed = decisions.iter().filter(|d| d.outcome.is_err()).count();
        {
            let mut guard = self.shard_for(sample);
            guard
                .tables
                .entry(sample.to_string())
                .or_insert_with(|| CutTable::new(cuts))
                .merge(&batch)?;
        }

        info!(
            sample,
            signal = %signal,
            events = events.len(),
            selected = batch.signal.raw,
            sideband = batch.sideband.raw,
            failed,
            "ingested batch"
        );
        Ok(decisions)
    }

    /// Accumulated table for `sample`, if any events were ingested.
    pub fn table(&self, sample: &str) -> Option<CutTable> {
        self.shard_for(sample).tables.get(sample).cloned()
    }

    /// Drop one sample's table.
    pub fn clear_sample(&self, sample: &str) {
        self.shard_for(sample).tables.remove(sample);
    }

    /// Export all `(sample, CutTable)` pairs, sorted by sample name.
    pub fn snapshot(&self) -> SupervisorSnapshot {
        self.snapshot_filtered(|_, _| true)
    }

    /// Export only the tables the predicate accepts, sorted by sample name.
    pub fn snapshot_filtered<F>(&self, mut predicate: F) -> SupervisorSnapshot
    where
        F: FnMut(&str, &CutTable) -> bool,
    {
        let mut out: Vec<(String, CutTable)> = Vec::new();

        // Lock shards in a stable order.
        for shard in &self.state_shards {
            let guard = shard.lock();
            for (k, v) in guard.tables.iter() {
                if predicate(k.as_str(), v) {
                    out.push((k.clone(), v.clone()));
                }
            }
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        SupervisorSnapshot { tables: out }
    }

    /// Export only the named samples.
    pub fn snapshot_samples(&self, samples: &[&str]) -> SupervisorSnapshot {
        let want: HashSet<&str> = samples.iter().copied().collect();
        self.snapshot_filtered(|name, _| want.contains(name))
    }

    /// Replace every table with the snapshot's.
    ///
    /// A snapshot holding a malformed table, or one tallied over another
    /// cut list, is refused whole and current state is left untouched.
    pub fn restore(&self, snap: SupervisorSnapshot) -> Result<RestoreStats> {
        self.check_tables(&snap.tables)?;
        for shard in &self.state_shards {
            shard.lock().tables.clear();
        }
        Ok(self.import_tables(snap.tables))
    }

    /// Apply a snapshot on top of current state; same-name tables are overwritten.
    pub fn restore_merge(&self, snap: SupervisorSnapshot) -> Result<RestoreStats> {
        self.check_tables(&snap.tables)?;
        Ok(self.import_tables(snap.tables))
    }

    fn check_tables(&self, tables: &[(String, CutTable)]) -> Result<()> {
        for (sample, table) in tables {
            table.validate()?;
            if table.cuts() != self.cuts.as_slice() {
                return Err(SelectError::TableMismatch(format!(
                    "sample {sample} was tallied over {:?}, not {:?}",
                    table.cuts(),
                    self.cuts
                )));
            }
        }
        Ok(())
    }

    fn import_tables<I>(&self, iter: I) -> RestoreStats
    where
        I: IntoIterator<Item = (String, CutTable)>,
    {
        let mut stats = RestoreStats::default();
        for (sample, table) in iter {
            let mut guard = self.shard_for(&sample);
            if guard.tables.insert(sample, table).is_some() {
                stats.overwritten += 1;
            }
            stats.applied += 1;
        }
        stats
    }
}
