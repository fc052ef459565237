//! Leadflow Core - domain types, the Normalizer, and the Match Scorer
//!
//! This crate provides the pure, stateless building blocks of the lead
//! pipeline. Nothing in here touches the database or the network.

pub mod error;
pub mod model;
pub mod normalize;
pub mod scorer;
pub mod thresholds;

pub use error::{Error, Result};
pub use scorer::{score_candidates, MatchSignal, MatchType, ScoringInput};
