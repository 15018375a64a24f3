use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cfg::{CutCfg, SidebandPolicy};
use crate::cut::CutId;

/// Which final state counts as signal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SignalDefinition {
    /// Exactly one charged pion, W below the one-pion maximum.
    OnePi,
    OnePiNoW,
    /// Any number of charged pions, W below the multi-pion maximum.
    NPi,
    NPiNoW,
}

impl SignalDefinition {
    pub const ALL: [SignalDefinition; 4] = [Self::OnePi, Self::OnePiNoW, Self::NPi, Self::NPiNoW];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnePi => "one_pi",
            Self::OnePiNoW => "one_pi_no_w",
            Self::NPi => "n_pi",
            Self::NPiNoW => "n_pi_no_w",
        }
    }

    /// Cut left out of the all-except facet and used to define the sideband.
    pub fn distinguished_cut(self) -> Option<CutId> {
        match self {
            Self::OnePi | Self::NPi => Some(CutId::Wexp),
            Self::OnePiNoW | Self::NPiNoW => None,
        }
    }

    /// Half-open W acceptance window `[min, max)`; `None` when unbounded.
    pub fn w_window(self, cfg: &CutCfg) -> Option<(f64, f64)> {
        match self {
            Self::OnePi => Some((cfg.w_min, cfg.one_pi_w_max)),
            Self::NPi => Some((cfg.w_min, cfg.n_pi_w_max)),
            Self::OnePiNoW | Self::NPiNoW => None,
        }
    }

    pub fn sideband_policy(self, cfg: &CutCfg) -> Option<SidebandPolicy> {
        match self {
            Self::OnePi => Some(cfg.one_pi_sideband),
            Self::NPi => Some(cfg.n_pi_sideband),
            Self::OnePiNoW | Self::NPiNoW => None,
        }
    }
}

impl fmt::Display for SignalDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalDefinition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown signal definition: {s}"))
    }
}
