// Collaborator seams of the disambiguation core.
//
// Classifier: scores a feature vector with a trained model (opaque to us).
// ScopeDetector / IndexSearcher: optional document-level feature sources.
// LocationSource / MentionTagger / ContextClassifier: the upstream tagging and
//   gazetteer pipeline, used to build candidate maps for training and the CLI.
//
// Every seam is synchronous and Send + Sync so one configured strategy can be
// shared across worker threads. Test doubles live in `testing.rs`.

use toponym_common::{CandidateMap, CategoryEntries, GeoCoordinate, Location, LocationId, Mention, Result};

use crate::features::FeatureVector;

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub trait Classifier: Send + Sync {
    /// Probability that the candidate described by `features` is the correct referent.
    fn classify(&self, features: &FeatureVector) -> Result<f64>;

    /// Feature columns the model was trained on, if it records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

// ---------------------------------------------------------------------------
// Feature sources
// ---------------------------------------------------------------------------

pub trait ScopeDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Best guess for the geographic focus of the whole text.
    fn detect(&self, text: &str) -> Option<GeoCoordinate>;

    /// Every plausible focus of the text, best first.
    fn detect_all(&self, text: &str) -> Vec<GeoCoordinate> {
        self.detect(text).into_iter().collect()
    }
}

pub trait IndexSearcher: Send + Sync {
    /// Used in feature names: `indexCount(<name>)`.
    fn name(&self) -> &str;

    fn total_result_count(&self, query: &str) -> Result<u64>;
}

// ---------------------------------------------------------------------------
// Upstream pipeline
// ---------------------------------------------------------------------------

pub trait LocationSource: Send + Sync {
    /// Case-insensitive lookup over primary and alternative names.
    fn locations_by_name(&self, name: &str) -> Result<Vec<Location>>;

    fn location_by_id(&self, id: LocationId) -> Result<Option<Location>>;

    /// Ancestors root first. Ids that cannot be resolved are skipped.
    fn ancestors(&self, location: &Location) -> Result<Vec<Location>> {
        let mut ancestors = Vec::with_capacity(location.ancestor_ids.len());
        for id in &location.ancestor_ids {
            if let Some(ancestor) = self.location_by_id(*id)? {
                ancestors.push(ancestor);
            }
        }
        Ok(ancestors)
    }
}

pub trait MentionTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<Mention>;
}

pub trait ContextClassifier: Send + Sync {
    /// Category distribution for `mention` judged from its surroundings in `text`.
    fn classify(&self, text: &str, mention: &Mention) -> CategoryEntries;
}

/// Turns raw text into a candidate map (tagging + gazetteer lookup).
pub trait CandidateRetriever: Send + Sync {
    fn candidates(&self, text: &str) -> Result<CandidateMap>;
}
