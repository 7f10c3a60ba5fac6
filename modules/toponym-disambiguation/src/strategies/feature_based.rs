use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use toponym_common::{
    CandidateMap, DisambiguationConfig, Location, LocationAnnotation, LocationId, Result, ToponymError,
};

use super::LocationDisambiguation;
use crate::features::{ConfigurableFeatureExtractor, FeatureExtractor, FeatureVector};
use crate::traits::Classifier;

/// Classifier probabilities keyed by mention text and candidate id.
#[derive(Debug, Clone, Default)]
pub struct CandidateScores {
    by_value: HashMap<String, HashMap<LocationId, f64>>,
}

impl CandidateScores {
    pub fn get(&self, value: &str, id: LocationId) -> Option<f64> {
        self.by_value.get(value).and_then(|scores| scores.get(&id)).copied()
    }

    /// Number of scored (mention text, candidate) pairs.
    pub fn len(&self) -> usize {
        self.by_value.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, value: &str, id: LocationId, probability: f64) {
        self.by_value
            .entry(value.to_string())
            .or_default()
            .insert(id, probability);
    }
}

/// Extract features for every candidate and score them with `classifier`.
pub fn score_candidates(
    classifier: &dyn Classifier,
    extractor: &dyn FeatureExtractor,
    text: &str,
    candidates: &CandidateMap,
) -> Result<CandidateScores> {
    let mut scores = CandidateScores::default();
    for mention in extractor.extract(text, candidates)? {
        for instance in &mention.instances {
            check_compatible(classifier, &instance.features)?;
            let probability = classifier.classify(&instance.features)?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(ToponymError::Classifier(format!(
                    "probability {probability} for {} is outside [0, 1]",
                    instance.location
                )));
            }
            trace!(mention = %mention.value, location = %instance.location, probability, "Scored candidate");
            scores.insert(&mention.value, instance.location.id, probability);
        }
    }
    Ok(scores)
}

fn check_compatible(classifier: &dyn Classifier, features: &FeatureVector) -> Result<()> {
    let Some(expected) = classifier.feature_names() else {
        return Ok(());
    };
    match expected.iter().find(|name| !features.contains(name)) {
        Some(missing) => Err(ToponymError::IncompatibleModel(format!(
            "model expects feature '{missing}', which the extractor does not produce"
        ))),
        None => Ok(()),
    }
}

/// Picks, per mention, the candidate the classifier is most confident about.
#[derive(Clone)]
pub struct FeatureBasedDisambiguation {
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn FeatureExtractor>,
    probability_threshold: f64,
}

impl FeatureBasedDisambiguation {
    pub fn new(classifier: Arc<dyn Classifier>, config: &DisambiguationConfig) -> Self {
        Self::with_extractor(
            classifier,
            Arc::new(ConfigurableFeatureExtractor::new(config.features.clone())),
            config.classifier.probability_threshold,
        )
    }

    pub fn with_extractor(
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn FeatureExtractor>,
        probability_threshold: f64,
    ) -> Self {
        Self {
            classifier,
            extractor,
            probability_threshold,
        }
    }

    pub fn probability_threshold(&self) -> f64 {
        self.probability_threshold
    }
}

impl LocationDisambiguation for FeatureBasedDisambiguation {
    fn disambiguate(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        let scores = score_candidates(self.classifier.as_ref(), self.extractor.as_ref(), text, candidates)?;

        let mut result = Vec::new();
        for (mention, group) in candidates.iter() {
            let mut best: Option<(&Location, f64)> = None;
            let mut tied = false;
            for location in group {
                let Some(probability) = scores.get(&mention.value, location.id) else {
                    continue;
                };
                match best {
                    Some((_, top)) if probability < top => {}
                    Some((_, top)) if probability == top => tied = true,
                    _ => {
                        best = Some((location, probability));
                        tied = false;
                    }
                }
            }
            match best {
                Some((location, probability)) if !tied && probability >= self.probability_threshold => {
                    debug!(mention = %mention, location = %location, probability, "Selected");
                    result.push(
                        LocationAnnotation::new(mention.clone(), location.clone()).with_confidence(probability),
                    );
                }
                Some((_, probability)) => {
                    debug!(mention = %mention, probability, tied, "No confident candidate, dropped")
                }
                None => debug!(mention = %mention, "No scored candidates, dropped"),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{debug_config, france, mention, paris_fr, paris_tx, FnClassifier, ScoreTable};

    fn paris_map() -> CandidateMap {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        map
    }

    fn strategy(table: ScoreTable) -> FeatureBasedDisambiguation {
        FeatureBasedDisambiguation::new(Arc::new(table), &debug_config())
    }

    #[test]
    fn threshold_is_inclusive() {
        let accepted = strategy(
            ScoreTable::by_location_id()
                .score(paris_fr().id, 0.15)
                .score(paris_tx().id, 0.01),
        )
        .disambiguate("Paris", &paris_map())
        .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].location.id, paris_fr().id);
        assert_eq!(accepted[0].confidence, Some(0.15));

        let rejected = strategy(
            ScoreTable::by_location_id()
                .score(paris_fr().id, 0.149999)
                .score(paris_tx().id, 0.01),
        )
        .disambiguate("Paris", &paris_map())
        .unwrap();
        assert!(rejected.is_empty());
    }

    #[test]
    fn tie_at_the_top_drops_the_mention() {
        let result = strategy(
            ScoreTable::by_location_id()
                .score(paris_fr().id, 0.8)
                .score(paris_tx().id, 0.8),
        )
        .disambiguate("Paris", &paris_map())
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn repeated_mentions_share_scores() {
        let mut map = paris_map();
        map.insert(mention(20, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        map.insert(mention(30, "France"), vec![france()]).unwrap();
        let result = strategy(
            ScoreTable::by_location_id()
                .score(paris_fr().id, 0.9)
                .score(france().id, 0.7),
        )
        .disambiguate("", &map)
        .unwrap();
        let offsets: Vec<usize> = result.iter().map(|a| a.mention.start_offset).collect();
        assert_eq!(offsets, vec![0, 20, 30]);
    }

    #[test]
    fn out_of_range_probability_is_an_error() {
        let classifier = FnClassifier::new(|_| Ok(1.5));
        let strategy = FeatureBasedDisambiguation::new(Arc::new(classifier), &debug_config());
        let err = strategy.disambiguate("Paris", &paris_map()).unwrap_err();
        assert!(matches!(err, ToponymError::Classifier(_)));
    }

    #[test]
    fn missing_model_feature_is_incompatible() {
        let table = ScoreTable::by_location_id().with_feature_names(vec!["population".into(), "wikipediaRank".into()]);
        let err = strategy(table).disambiguate("Paris", &paris_map()).unwrap_err();
        assert!(matches!(err, ToponymError::IncompatibleModel(ref msg) if msg.contains("wikipediaRank")));
    }

    #[test]
    fn mention_without_candidates_is_skipped() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "Atlantis"), Vec::new()).unwrap();
        let result = strategy(ScoreTable::by_location_id()).disambiguate("Atlantis", &map).unwrap();
        assert!(result.is_empty());
    }
}
