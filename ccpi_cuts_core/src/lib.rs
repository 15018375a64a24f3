pub mod record;
pub mod signature;
pub mod state;

pub mod cfg;
pub mod error;
pub mod signal;
pub mod cut;
pub mod candidates;
pub mod pipeline;
pub mod accounting;

pub use record::{branch, EventRecord, TrackIdx};
pub use signature::{
    DecaySignature, EndpointSignatureMap, NoSignatures, SignatureDetector, Signatures,
    VertexSignature,
};
pub use state::Cursor;

pub use cfg::{CutCfg, Side, SidebandPolicy};
pub use error::{IndexSource, Result, SelectError};
pub use signal::SignalDefinition;
pub use cut::{
    default_cuts, in_hexagon, parse_cut_list, truth_cuts, CutContext, CutEvaluation, CutId, CutKind,
    CutOutcome, CutSpec, Rejection,
};
pub use candidates::{merge_signature_candidates, reconcile_candidates, select_quality_candidates};
pub use pipeline::{
    classify, classify_cursor, classify_with, validate_cut_list, Classification, StageRecord,
};
pub use accounting::{Counter, CutTable, StageCount};
