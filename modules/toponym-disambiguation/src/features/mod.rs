pub mod extractor;
pub mod vector;

pub use extractor::{ConfigurableFeatureExtractor, FeatureExtractor, MentionFeatures};
pub use vector::{ClassifiableLocation, FeatureValue, FeatureVector, FeatureVectorBuilder};
