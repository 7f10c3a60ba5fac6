use tracing::debug;

use toponym_common::{CandidateMap, LocationAnnotation, LocationType, Result};

use super::LocationDisambiguation;
use crate::stats::{of_type, LocationStats};

/// Population baseline: the first continent or country wins outright,
/// otherwise the most populous candidate (first one on a tie).
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineDisambiguation;

impl LocationDisambiguation for BaselineDisambiguation {
    fn disambiguate(&self, _text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        let mut result = Vec::new();
        for (mention, group) in candidates.iter() {
            let stats = LocationStats::new(group);
            let choice = stats
                .filter(of_type(&[LocationType::Continent, LocationType::Country]))
                .first()
                .or_else(|| stats.biggest());
            match choice {
                Some(location) => {
                    debug!(mention = %mention, location = %location, "Baseline selection");
                    result.push(LocationAnnotation::new(mention.clone(), location.clone()));
                }
                None => debug!(mention = %mention, "No candidates, dropped"),
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{city, country, mention};

    #[test]
    fn country_beats_more_populous_city() {
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Georgia"),
            vec![city(500, "Georgia", 1_000, (33.0, -83.0)), country(501, "Georgia", 0, (42.0, 43.5))],
        )
        .unwrap();
        let result = BaselineDisambiguation.disambiguate("Georgia", &map).unwrap();
        assert_eq!(result[0].location.id, 501);
    }

    #[test]
    fn highest_population_with_first_seen_tie() {
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Springfield"),
            vec![
                city(1, "Springfield", 50_000, (39.8, -89.6)),
                city(2, "Springfield", 160_000, (37.2, -93.3)),
                city(3, "Springfield", 160_000, (42.1, -72.6)),
            ],
        )
        .unwrap();
        let result = BaselineDisambiguation.disambiguate("", &map).unwrap();
        assert_eq!(result[0].location.id, 2);
    }

    #[test]
    fn empty_group_produces_nothing() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "Atlantis"), Vec::new()).unwrap();
        assert!(BaselineDisambiguation.disambiguate("", &map).unwrap().is_empty());
    }
}
