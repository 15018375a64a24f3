//! Read-only access to one reconstructed event.
//!
//! Observables (kinematics, recoil, calibrated energies, truth) are computed
//! elsewhere; cuts only read them by branch name. A missing or non-finite
//! value means the observable is not computable for this event.

/// Index into the event's reconstructed-track list. Valid for one event only.
pub type TrackIdx = usize;

pub trait EventRecord {
    /// Stable identifier of the event (entry number in the input chain).
    fn entry(&self) -> u64;

    fn track_count(&self) -> usize;

    fn observable(&self, name: &str) -> Option<f64>;

    fn vector_element(&self, name: &str, index: TrackIdx) -> Option<f64>;

    /// Generator weight. Data records keep the default.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Called when a cursor moves onto this record. Per-event state the
    /// record derives for itself is reset here.
    ///
    /// Only a cursor that owns the record can call it. Through a shared
    /// reference (`Cursor<&R>`) the hook is a no-op, so such records must
    /// arrive already reset; the cursor still drops its own cache.
    fn on_advance(&mut self) {}
}

// `on_advance` stays the default: a shared borrow cannot reset the record.
impl<T: EventRecord + ?Sized> EventRecord for &T {
    fn entry(&self) -> u64 {
        (**self).entry()
    }

    fn track_count(&self) -> usize {
        (**self).track_count()
    }

    fn observable(&self, name: &str) -> Option<f64> {
        (**self).observable(name)
    }

    fn vector_element(&self, name: &str, index: TrackIdx) -> Option<f64> {
        (**self).vector_element(name, index)
    }

    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

/// Finite scalar observable, or `None`.
#[inline]
pub(crate) fn finite<R: EventRecord + ?Sized>(event: &R, name: &str) -> Option<f64> {
    event.observable(name).filter(|v| v.is_finite())
}

/// Finite per-track observable, or `None`.
#[inline]
pub(crate) fn finite_at<R: EventRecord + ?Sized>(
    event: &R,
    name: &str,
    idx: TrackIdx,
) -> Option<f64> {
    event.vector_element(name, idx).filter(|v| v.is_finite())
}

/// Branch names read by the cuts.
pub mod branch {
    // reco vertex, mm
    pub const VTX_X: &str = "vtx_x";
    pub const VTX_Y: &str = "vtx_y";
    pub const VTX_Z: &str = "vtx_z";

    /// Muon momentum, MeV.
    pub const PMU: &str = "pmu";
    /// Reconstructed hadronic invariant mass, MeV.
    pub const WEXP: &str = "wexp";
    pub const MINOS_MATCH: &str = "minos_match";
    /// Charge over momentum from the MINOS fit.
    pub const MINOS_QP: &str = "minos_qp";
    pub const N_ISO_PRONGS: &str = "n_iso_prongs";

    // per hadron track
    pub const HADRON_LLR: &str = "hadron_llr";
    pub const HADRON_NODES: &str = "hadron_nodes";

    // generator truth (simulation only)
    pub const TRUTH_GOOD_OBJECTS: &str = "truth_good_objects";
    pub const TRUTH_GOOD_VERTEX: &str = "truth_good_vertex";
    pub const TRUTH_FIDUCIAL: &str = "truth_fiducial";
    pub const TRUTH_MINOS_ACTIVITY: &str = "truth_minos_activity";
}
