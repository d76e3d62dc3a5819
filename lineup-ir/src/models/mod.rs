//! Data model for the identity resolution engine

pub mod capture;
pub mod group;
pub mod resolution;

pub use capture::Capture;
pub use group::PersonGroup;
pub use resolution::{
    MatchConfidence, ResolutionOutcome, ResolutionState, ShortlistEntry, VerifierComparison,
    VerifierDecision, VerifierOutcome,
};
