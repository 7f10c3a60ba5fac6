use toponym_common::{CandidateMap, LocationAnnotation, Result};

use super::LocationDisambiguation;

/// Pass-through: every mention gets its first candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisambiguation;

impl LocationDisambiguation for NoDisambiguation {
    fn disambiguate(&self, _text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        Ok(candidates
            .iter()
            .filter_map(|(mention, group)| {
                group
                    .first()
                    .map(|location| LocationAnnotation::new(mention.clone(), location.clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mention, paris_fr, paris_tx};

    #[test]
    fn takes_first_candidate_and_skips_empty_groups() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        map.insert(mention(10, "Nowhere"), Vec::new()).unwrap();
        let result = NoDisambiguation.disambiguate("", &map).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].location.id, paris_tx().id);
    }
}
