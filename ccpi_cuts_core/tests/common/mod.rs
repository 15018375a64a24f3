#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;

use ccpi_cuts_core::*;

/// Map-backed event record.
#[derive(Clone, Debug, Default)]
pub struct TestEvent {
    pub entry: u64,
    pub tracks: usize,
    pub scalars: HashMap<&'static str, f64>,
    pub vectors: HashMap<&'static str, Vec<f64>>,
    pub weight: f64,
}

impl TestEvent {
    pub fn new(entry: u64, tracks: usize) -> Self {
        Self {
            entry,
            tracks,
            weight: 1.0,
            ..Default::default()
        }
    }

    pub fn with(mut self, name: &'static str, value: f64) -> Self {
        self.scalars.insert(name, value);
        self
    }

    pub fn with_tracks(mut self, name: &'static str, values: &[f64]) -> Self {
        self.vectors.insert(name, values.to_vec());
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl EventRecord for TestEvent {
    fn entry(&self) -> u64 {
        self.entry
    }

    fn track_count(&self) -> usize {
        self.tracks
    }

    fn observable(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    fn vector_element(&self, name: &str, index: TrackIdx) -> Option<f64> {
        self.vectors.get(name).and_then(|v| v.get(index)).copied()
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Two-track event passing the default reco selection; track 0 is a good
/// hadron, track 1 fails LLR. W sits inside the one-pion window.
pub fn signal_event(entry: u64) -> TestEvent {
    TestEvent::new(entry, 2)
        .with(branch::VTX_X, 10.0)
        .with(branch::VTX_Y, -20.0)
        .with(branch::VTX_Z, 7000.0)
        .with(branch::PMU, 3000.0)
        .with(branch::WEXP, 1200.0)
        .with(branch::MINOS_MATCH, 1.0)
        .with(branch::MINOS_QP, -0.1)
        .with(branch::N_ISO_PRONGS, 0.0)
        .with_tracks(branch::HADRON_LLR, &[1.5, -2.0])
        .with_tracks(branch::HADRON_NODES, &[20.0, 20.0])
}

pub fn michel(energy: f64) -> DecaySignature {
    DecaySignature {
        energy,
        distance: 15.0,
        time: 1200.0,
    }
}

/// Detector returning fixed results and counting how often it ran.
#[derive(Debug, Default)]
pub struct Scripted {
    pub endpoint: EndpointSignatureMap,
    pub vertex: VertexSignature,
    pub calls: Cell<u32>,
}

impl Scripted {
    pub fn endpoint_at(tracks: &[TrackIdx]) -> Self {
        Self {
            endpoint: tracks.iter().map(|&t| (t, michel(30.0))).collect(),
            ..Default::default()
        }
    }
}

impl<R: EventRecord + ?Sized> SignatureDetector<R> for Scripted {
    fn endpoint_signatures(&self, _event: &R) -> EndpointSignatureMap {
        self.calls.set(self.calls.get() + 1);
        self.endpoint.clone()
    }

    fn vertex_signature(&self, _event: &R) -> VertexSignature {
        self.vertex
    }
}
