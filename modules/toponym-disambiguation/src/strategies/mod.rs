// Disambiguation strategies.
//
// Every strategy implements `LocationDisambiguation` and is a pure function of
// (text, candidate map, its own immutable configuration). Strategies never
// mutate the candidate map; narrowing passes build new views.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toponym_common::{CandidateMap, DisambiguationConfig, LocationAnnotation, Result, ToponymError};

use crate::traits::Classifier;

pub mod baseline;
pub mod combined;
pub mod feature_based;
pub mod heuristic;
pub mod none;

pub use baseline::BaselineDisambiguation;
pub use combined::CombinedDisambiguation;
pub use feature_based::{CandidateScores, FeatureBasedDisambiguation};
pub use heuristic::{select_location, HeuristicDisambiguation};
pub use none::NoDisambiguation;

pub trait LocationDisambiguation: Send + Sync {
    /// Resolve each mention to at most one candidate. Output follows the
    /// candidate map's mention order; mentions without a pick are absent.
    fn disambiguate(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    None,
    Baseline,
    Heuristic,
    FeatureBased,
    Combined,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::None,
        StrategyKind::Baseline,
        StrategyKind::Heuristic,
        StrategyKind::FeatureBased,
        StrategyKind::Combined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::None => "none",
            StrategyKind::Baseline => "baseline",
            StrategyKind::Heuristic => "heuristic",
            StrategyKind::FeatureBased => "feature-based",
            StrategyKind::Combined => "combined",
        }
    }

    /// Whether the strategy needs a trained classifier.
    pub fn requires_classifier(&self) -> bool {
        matches!(self, StrategyKind::FeatureBased | StrategyKind::Combined)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ToponymError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase().replace('_', "-");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == key)
            .ok_or_else(|| {
                ToponymError::Config(format!(
                    "unknown strategy '{s}', expected one of: none, baseline, heuristic, feature-based, combined"
                ))
            })
    }
}

/// The closed set of strategies behind one value.
#[derive(Clone)]
pub enum Disambiguator {
    None(NoDisambiguation),
    Baseline(BaselineDisambiguation),
    Heuristic(HeuristicDisambiguation),
    FeatureBased(FeatureBasedDisambiguation),
    Combined(CombinedDisambiguation),
}

impl Disambiguator {
    /// Build the strategy named by `kind`. Classifier strategies fail with a
    /// config error when no classifier is supplied.
    pub fn from_kind(
        kind: StrategyKind,
        config: &DisambiguationConfig,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Result<Self> {
        let need_classifier = || {
            classifier.clone().ok_or_else(|| {
                ToponymError::Config(format!("strategy '{kind}' requires a trained classifier"))
            })
        };
        Ok(match kind {
            StrategyKind::None => Disambiguator::None(NoDisambiguation),
            StrategyKind::Baseline => Disambiguator::Baseline(BaselineDisambiguation),
            StrategyKind::Heuristic => {
                Disambiguator::Heuristic(HeuristicDisambiguation::new(config.heuristic.clone()))
            }
            StrategyKind::FeatureBased => {
                Disambiguator::FeatureBased(FeatureBasedDisambiguation::new(need_classifier()?, config))
            }
            StrategyKind::Combined => {
                Disambiguator::Combined(CombinedDisambiguation::new(need_classifier()?, config))
            }
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Disambiguator::None(_) => StrategyKind::None,
            Disambiguator::Baseline(_) => StrategyKind::Baseline,
            Disambiguator::Heuristic(_) => StrategyKind::Heuristic,
            Disambiguator::FeatureBased(_) => StrategyKind::FeatureBased,
            Disambiguator::Combined(_) => StrategyKind::Combined,
        }
    }
}

impl LocationDisambiguation for Disambiguator {
    fn disambiguate(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        match self {
            Disambiguator::None(s) => s.disambiguate(text, candidates),
            Disambiguator::Baseline(s) => s.disambiguate(text, candidates),
            Disambiguator::Heuristic(s) => s.disambiguate(text, candidates),
            Disambiguator::FeatureBased(s) => s.disambiguate(text, candidates),
            Disambiguator::Combined(s) => s.disambiguate(text, candidates),
        }
    }
}

impl fmt::Debug for Disambiguator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Disambiguator").field(&self.kind()).finish()
    }
}
