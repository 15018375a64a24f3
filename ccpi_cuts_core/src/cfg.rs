use serde::{Deserialize, Serialize};

/// Which side of the distinguished cut's window counts as sideband.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Low,
    High,
    Both,
}

/// Sideband region for one signal definition.
///
/// An event is sideband when the distinguished cut failed on `side` and the
/// measured value lies in `[min, max)`. Values that fail on the wrong side,
/// or fall in the gap between the signal window and `min`, are neither
/// signal nor sideband.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SidebandPolicy {
    pub side: Side,
    pub min: f64,
    pub max: f64,
}

impl SidebandPolicy {
    pub fn new(side: Side, min: f64, max: f64) -> Self {
        Self { side, min, max }
    }

    pub fn admits(&self, failed_on: Side, value: f64) -> bool {
        let side_ok = match self.side {
            Side::Both => true,
            s => s == failed_on,
        };
        side_ok && value.is_finite() && value >= self.min && value < self.max
    }
}

/// Cut thresholds. Energies and momenta in MeV, lengths in mm.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CutCfg {
    pub vtx_z_min: f64,
    pub vtx_z_max: f64,
    pub vtx_apothem: f64,

    pub pmu_min: f64,
    pub pmu_max: f64,

    /// Tracks pass the LLR check when the score is strictly above this.
    pub llr_min: f64,
    pub nodes_min: u32,
    pub nodes_max: u32,

    /// Events pass with strictly fewer isolated prongs than this.
    pub iso_prongs_max: u32,

    pub w_min: f64,
    pub one_pi_w_max: f64,
    pub n_pi_w_max: f64,
    pub one_pi_sideband: SidebandPolicy,
    pub n_pi_sideband: SidebandPolicy,

    /// Upper bound on tracks per event; larger events are treated as corrupt.
    pub max_tracks: usize,
}

impl Default for CutCfg {
    fn default() -> Self {
        Self {
            vtx_z_min: 5990.0,
            vtx_z_max: 8340.0,
            vtx_apothem: 850.0,
            pmu_min: 1500.0,
            pmu_max: 20000.0,
            llr_min: 0.0,
            nodes_min: 1,
            nodes_max: 300,
            iso_prongs_max: 2,
            w_min: 0.0,
            one_pi_w_max: 1400.0,
            n_pi_w_max: 1800.0,
            one_pi_sideband: SidebandPolicy::new(Side::High, 1500.0, f64::MAX),
            n_pi_sideband: SidebandPolicy::new(Side::High, 1900.0, f64::MAX),
            max_tracks: 64,
        }
    }
}
