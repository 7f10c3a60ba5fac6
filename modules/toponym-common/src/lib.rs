pub mod candidates;
pub mod config;
pub mod error;
pub mod types;

pub use candidates::{CandidateEntry, CandidateMap, Document};
pub use config::{ClassifierSettings, DisambiguationConfig, FeatureSettings, HeuristicSettings};
pub use error::{Result, ToponymError};
pub use types::*;
