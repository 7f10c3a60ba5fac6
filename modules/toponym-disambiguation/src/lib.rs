pub mod context;
pub mod features;
pub mod gazetteer;
pub mod learner;
pub mod stats;
pub mod strategies;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod text;
pub mod traits;

pub use features::{ClassifiableLocation, ConfigurableFeatureExtractor, FeatureExtractor, FeatureVector};
pub use stats::LocationStats;
pub use strategies::{
    BaselineDisambiguation, CombinedDisambiguation, Disambiguator, FeatureBasedDisambiguation,
    HeuristicDisambiguation, LocationDisambiguation, NoDisambiguation, StrategyKind,
};
