use std::sync::Arc;

use tracing::debug;

use toponym_common::{CandidateMap, DisambiguationConfig, LocationAnnotation, Result};

use super::feature_based::{score_candidates, CandidateScores};
use super::{HeuristicDisambiguation, LocationDisambiguation};
use crate::features::{ConfigurableFeatureExtractor, FeatureExtractor};
use crate::traits::Classifier;

/// Classifier as a noise filter in front of the heuristic: candidates scored
/// at zero are removed, the heuristic picks among the rest.
#[derive(Clone)]
pub struct CombinedDisambiguation {
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn FeatureExtractor>,
    heuristic: HeuristicDisambiguation,
}

impl CombinedDisambiguation {
    pub fn new(classifier: Arc<dyn Classifier>, config: &DisambiguationConfig) -> Self {
        Self::with_parts(
            classifier,
            Arc::new(ConfigurableFeatureExtractor::new(config.features.clone())),
            HeuristicDisambiguation::new(config.heuristic.clone()),
        )
    }

    pub fn with_parts(
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn FeatureExtractor>,
        heuristic: HeuristicDisambiguation,
    ) -> Self {
        Self {
            classifier,
            extractor,
            heuristic,
        }
    }

    /// The candidate map the heuristic stage sees, plus the scores it was cut
    /// with. Unscored candidates stay.
    pub fn narrow(&self, text: &str, candidates: &CandidateMap) -> Result<(CandidateMap, CandidateScores)> {
        let scores = score_candidates(self.classifier.as_ref(), self.extractor.as_ref(), text, candidates)?;
        let narrowed = candidates.filter_candidates(|mention, location| {
            scores
                .get(&mention.value, location.id)
                .map_or(true, |probability| probability > 0.0)
        });
        debug!(
            before = candidates.candidate_count(),
            after = narrowed.candidate_count(),
            "Classifier narrowed candidates"
        );
        Ok((narrowed, scores))
    }
}

impl LocationDisambiguation for CombinedDisambiguation {
    fn disambiguate(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        let (narrowed, scores) = self.narrow(text, candidates)?;
        let annotations = self.heuristic.disambiguate(text, &narrowed)?;
        Ok(annotations
            .into_iter()
            .map(|annotation| match scores.get(&annotation.mention.value, annotation.location.id) {
                Some(probability) => annotation.with_confidence(probability),
                None => annotation,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{debug_config, france, mention, paris_fr, paris_tx, ScoreTable};

    fn combined(table: ScoreTable) -> CombinedDisambiguation {
        CombinedDisambiguation::new(Arc::new(table), &debug_config())
    }

    fn document() -> CandidateMap {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "France"), vec![france()]).unwrap();
        map.insert(mention(20, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        map
    }

    #[test]
    fn narrowing_only_removes_candidates() {
        let strategy = combined(
            ScoreTable::by_location_id()
                .score(france().id, 0.9)
                .score(paris_fr().id, 0.0)
                .score(paris_tx().id, 0.4),
        );
        let original = document();
        let (narrowed, _) = strategy.narrow("", &original).unwrap();
        for (mention, group) in narrowed.iter() {
            let before = original.get(mention);
            assert!(group.iter().all(|l| before.contains(l)));
        }
        let paris: Vec<_> = narrowed.get(&mention(20, "Paris")).iter().map(|l| l.id).collect();
        assert_eq!(paris, vec![paris_tx().id]);
    }

    #[test]
    fn heuristic_decides_among_survivors() {
        let strategy = combined(
            ScoreTable::by_location_id()
                .score(france().id, 0.9)
                .score(paris_fr().id, 0.6)
                .score(paris_tx().id, 0.7),
        );
        let result = strategy.disambiguate("France ... Paris", &document()).unwrap();
        let paris = result.iter().find(|a| a.mention.value == "Paris").unwrap();
        assert_eq!(paris.location.id, paris_fr().id);
        assert_eq!(paris.confidence, Some(0.6));
    }

    #[test]
    fn everything_filtered_means_no_output() {
        let strategy = combined(ScoreTable::by_location_id());
        assert!(strategy.disambiguate("", &document()).unwrap().is_empty());
    }
}
