//! Adapter layer: outside-world event data as `ccpi_cuts_core::EventRecord`s.
//!
//! - `RawEvent`: flat, builder-style record for nominal data and simulation
//! - `Shifted`: systematic universe over any record, moving named observables
//!
//! No IO. Whatever reads the input tuples fills these in.

use std::borrow::Cow;
use std::collections::HashMap;

use ccpi_cuts_core::{EventRecord, TrackIdx};

/// One event's observables, keyed by branch name.
#[derive(Clone, Debug)]
pub struct RawEvent<'a> {
    pub entry: u64,
    pub track_count: usize,
    /// Eventwide scalars.
    pub scalars: HashMap<Cow<'a, str>, f64>,
    /// Per-track values, indexed by track.
    pub vectors: HashMap<Cow<'a, str>, Vec<f64>>,
    /// Generator weight (1.0 for data).
    pub weight: f64,
}

impl<'a> RawEvent<'a> {
    pub fn new(entry: u64, track_count: usize) -> Self {
        Self {
            entry,
            track_count,
            scalars: HashMap::new(),
            vectors: HashMap::new(),
            weight: 1.0,
        }
    }

    /// Set a scalar value.
    pub fn with_scalar(mut self, key: impl Into<Cow<'a, str>>, value: f64) -> Self {
        self.scalars.insert(key.into(), value);
        self
    }

    /// Set per-track values.
    pub fn with_vector(
        mut self,
        key: impl Into<Cow<'a, str>>,
        values: impl Into<Vec<f64>>,
    ) -> Self {
        self.vectors.insert(key.into(), values.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl EventRecord for RawEvent<'_> {
    fn entry(&self) -> u64 {
        self.entry
    }

    fn track_count(&self) -> usize {
        self.track_count
    }

    fn observable(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    fn vector_element(&self, name: &str, index: TrackIdx) -> Option<f64> {
        self.vectors.get(name).and_then(|v| v.get(index)).copied()
    }

    fn weight(&self) -> f64 {
        if self.weight.is_finite() && self.weight >= 0.0 {
            self.weight
        } else {
            1.0
        }
    }
}

/// One systematic knob on an observable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shift {
    /// `value + nsigma * sigma`
    Absolute(f64),
    /// `value * (1 + nsigma * sigma)`
    Relative(f64),
}

impl Shift {
    #[inline]
    fn apply(self, value: f64, nsigma: f64) -> f64 {
        match self {
            Self::Absolute(sigma) => value + nsigma * sigma,
            Self::Relative(sigma) => value * (1.0 + nsigma * sigma),
        }
    }
}

/// A record seen through a systematically shifted universe.
///
/// Observables without a registered shift read through unchanged, so the
/// same cut pipeline runs over the nominal and every shifted universe.
#[derive(Clone, Debug)]
pub struct Shifted<R> {
    inner: R,
    nsigma: f64,
    shifts: HashMap<String, Shift>,
}

impl<R: EventRecord> Shifted<R> {
    pub fn new(inner: R, nsigma: f64) -> Self {
        Self {
            inner,
            nsigma,
            shifts: HashMap::new(),
        }
    }

    pub fn with_shift(mut self, name: impl Into<String>, shift: Shift) -> Self {
        self.shifts.insert(name.into(), shift);
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn nsigma(&self) -> f64 {
        self.nsigma
    }

    #[inline]
    fn shifted(&self, name: &str, value: Option<f64>) -> Option<f64> {
        match self.shifts.get(name) {
            Some(s) => value.map(|v| s.apply(v, self.nsigma)),
            None => value,
        }
    }
}

impl<R: EventRecord> EventRecord for Shifted<R> {
    fn entry(&self) -> u64 {
        self.inner.entry()
    }

    fn track_count(&self) -> usize {
        self.inner.track_count()
    }

    fn observable(&self, name: &str) -> Option<f64> {
        self.shifted(name, self.inner.observable(name))
    }

    fn vector_element(&self, name: &str, index: TrackIdx) -> Option<f64> {
        self.shifted(name, self.inner.vector_element(name, index))
    }

    fn weight(&self) -> f64 {
        self.inner.weight()
    }

    fn on_advance(&mut self) {
        self.inner.on_advance();
    }
}
