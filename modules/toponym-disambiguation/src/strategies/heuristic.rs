use std::collections::HashSet;

use tracing::{debug, trace};

use toponym_common::{
    midpoint, CandidateMap, GeoCoordinate, HeuristicSettings, Location, LocationAnnotation, LocationId, LocationType,
    Mention, Result,
};

use super::LocationDisambiguation;
use crate::stats::{of_type, with_coordinate, LocationStats};

/// Anchor-based disambiguation.
///
/// 1. Drop mentions that look like person names and have no prominent candidate.
/// 2. Find anchors: prominent places, else unambiguous mentions, else the lasso
///    cluster, else the single most populous candidate.
/// 3. Keep candidates that are anchors, lie near another mention's anchor, or
///    are populous descendants of one.
/// 4. Pick one survivor per mention with [`select_location`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicDisambiguation {
    settings: HeuristicSettings,
}

impl HeuristicDisambiguation {
    pub fn new(settings: HeuristicSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HeuristicSettings {
        &self.settings
    }

    // --- Unlikely mentions ---

    /// A mention without country/continent candidates, whose biggest candidate
    /// stays below the unlikely floor, and which the context classifier is
    /// certain is a person.
    pub fn is_unlikely(&self, mention: &Mention, group: &[Location]) -> bool {
        let stats = LocationStats::new(group);
        let prominent = !stats
            .filter(of_type(&[LocationType::Country, LocationType::Continent]))
            .is_empty();
        let big = stats.highest_population() >= self.settings.lower_unlikely_population_threshold;
        // exact certainty only; tuned against tagger output, revisit with labeled data
        !prominent && !big && mention.person_probability() == 1.0
    }

    /// Candidate map without the unlikely mentions.
    pub fn remove_unlikely(&self, candidates: &CandidateMap) -> CandidateMap {
        let likely = candidates.retain_mentions(|mention, group| {
            let unlikely = self.is_unlikely(mention, group);
            if unlikely {
                debug!(mention = %mention, "Does not seem to be a location, dropped");
            }
            !unlikely
        });
        debug!(removed = candidates.len() - likely.len(), "Spotted unlikely locations");
        likely
    }

    // --- Anchors ---

    /// Anchor locations of the document, first pass that yields anything wins.
    pub fn anchors<'a>(&self, candidates: &'a CandidateMap) -> Vec<&'a Location> {
        let all = LocationStats::new(candidates.all_locations());

        let prominent = self.prominent_anchors(&all);
        if !prominent.is_empty() {
            debug!(count = prominent.len(), "Using prominent anchors");
            return prominent;
        }

        let unambiguous = self.unambiguous_anchors(candidates);
        if !unambiguous.is_empty() {
            debug!(count = unambiguous.len(), "Using unambiguous anchors");
            return unambiguous;
        }

        let lasso = self.lasso_anchors(&all);
        if !lasso.is_empty() {
            debug!(count = lasso.len(), "Using lasso anchors");
            return lasso;
        }

        match all.biggest() {
            Some(biggest) => {
                debug!(location = %biggest, "No anchor found, took biggest location");
                vec![biggest]
            }
            None => {
                debug!("No anchor found");
                Vec::new()
            }
        }
    }

    /// Continents, countries and very populous places.
    fn prominent_anchors<'a>(&self, all: &LocationStats<'a>) -> Vec<&'a Location> {
        all.filter(|l| {
            matches!(l.location_type, LocationType::Continent | LocationType::Country)
                || l.population_or_zero() > self.settings.anchor_population_threshold
        })
        .into_vec()
    }

    /// Mentions whose candidates all sit on one spot (duplicate gazetteer
    /// entries), provided the place is populous or the name has several tokens.
    fn unambiguous_anchors<'a>(&self, candidates: &'a CandidateMap) -> Vec<&'a Location> {
        let mut anchors = Vec::new();
        for (mention, group) in candidates.iter() {
            if group.is_empty() {
                continue;
            }
            // duplicates without coordinates are ignored when a located entry exists
            let group = LocationStats::new(group).where_conditionally(with_coordinate());
            let spread = group.largest_distance();
            if spread >= self.settings.same_distance_threshold {
                trace!(mention = %mention, candidates = group.count(), spread_km = spread, "Ambiguous location");
                continue;
            }
            let Some(location) = group.biggest().or_else(|| group.first()) else {
                continue;
            };
            if location.population_or_zero() > self.settings.lower_population_threshold
                || mention.token_count() >= self.settings.min_token_count
            {
                trace!(mention = %mention, location = %location, "Unambiguous anchor");
                anchors.push(location);
            }
        }
        LocationStats::new(anchors).into_vec()
    }

    /// Repeatedly drop the location farthest from the midpoint of the
    /// remaining ones until everything is within the lasso distance. At least
    /// two differently named survivors become anchors, together with every
    /// candidate that contains one of them. Locations without a coordinate
    /// take no part in the midpoint and are never dropped.
    pub fn lasso_anchors<'a>(&self, all: &LocationStats<'a>) -> Vec<&'a Location> {
        let mut pool: Vec<&'a Location> = all.iter().collect();
        while pool.len() > 1 {
            let Some(center) = midpoint(pool.iter().filter_map(|l| l.coordinate.as_ref())) else {
                break;
            };
            let farthest = pool
                .iter()
                .enumerate()
                .filter_map(|(i, l)| located(l).map(|c| (i, c.distance(&center))))
                .fold(None, |best: Option<(usize, f64)>, cur| match best {
                    Some(best) if best.1 >= cur.1 => Some(best),
                    _ => Some(cur),
                });
            let Some((farthest, max_distance)) = farthest else {
                break;
            };
            if max_distance < self.settings.lasso_distance_threshold {
                break;
            }
            let removed = pool.remove(farthest);
            trace!(
                location = %removed,
                center = %center,
                distance_km = max_distance,
                remaining = pool.len(),
                "Lasso removed location"
            );
        }

        let names: HashSet<String> = pool.iter().map(|l| l.primary_name.to_lowercase()).collect();
        if pool.len() < 2 || names.len() < 2 {
            debug!("Could not identify lasso locations");
            return Vec::new();
        }

        let mut anchors = pool.clone();
        for other in all.iter() {
            if pool.iter().any(|l| l.descendant_of(other)) && !anchors.iter().any(|a| a.id == other.id) {
                trace!(location = %other, "Added container of lasso location");
                anchors.push(other);
            }
        }
        anchors
    }

    // --- Selection ---

    /// Whether `candidate` survives against the document's anchors.
    /// `current_anchors` excludes the candidate's own mention group.
    fn is_caught(&self, candidate: &Location, anchor_ids: &HashSet<LocationId>, current_anchors: &[&Location]) -> bool {
        if anchor_ids.contains(&candidate.id) {
            trace!(location = %candidate, "Is an anchor");
            return true;
        }
        current_anchors.iter().any(|anchor| {
            let distance = candidate.distance(anchor);
            if distance < self.settings.anchor_distance_km {
                trace!(location = %candidate, anchor = %anchor.primary_name, distance_km = distance, "Near anchor");
                return true;
            }
            let container = matches!(
                anchor.location_type,
                LocationType::City | LocationType::Unit | LocationType::Country
            );
            if container
                && candidate.descendant_of(anchor)
                && candidate.population_or_zero() > self.settings.lower_population_threshold
            {
                trace!(location = %candidate, anchor = %anchor.primary_name, "Descendant of anchor");
                return true;
            }
            false
        })
    }
}

impl LocationDisambiguation for HeuristicDisambiguation {
    fn disambiguate(&self, _text: &str, candidates: &CandidateMap) -> Result<Vec<LocationAnnotation>> {
        let likely = self.remove_unlikely(candidates);
        let anchors = self.anchors(&likely);
        let anchor_ids: HashSet<LocationId> = anchors.iter().map(|a| a.id).collect();

        let mut result = Vec::new();
        for (mention, group) in likely.iter() {
            if group.is_empty() {
                debug!(mention = %mention, "Could not be found, dropped");
                continue;
            }
            debug!(mention = %mention, candidates = group.len(), "Disambiguating");

            let own: HashSet<LocationId> = group.iter().map(|l| l.id).collect();
            let current_anchors: Vec<&Location> =
                anchors.iter().copied().filter(|a| !own.contains(&a.id)).collect();
            let preselection: Vec<&Location> = group
                .iter()
                .filter(|candidate| self.is_caught(candidate, &anchor_ids, &current_anchors))
                .collect();

            match select_location(&preselection) {
                Some(location) => {
                    debug!(mention = %mention, location = %location, "Selected");
                    result.push(LocationAnnotation::new(mention.clone(), location.clone()));
                }
                None => debug!(mention = %mention, "No candidate near an anchor, dropped"),
            }
        }
        Ok(result)
    }
}

/// Pick one location out of a preselection: a lone continent wins; otherwise
/// containers give way to their descendants, and the highest population wins,
/// cities counting double. Ties go to the earlier location.
pub fn select_location<'a>(selection: &[&'a Location]) -> Option<&'a Location> {
    let continents: Vec<&Location> = selection
        .iter()
        .copied()
        .filter(|l| l.location_type == LocationType::Continent)
        .collect();
    if continents.len() == 1 {
        return Some(continents[0]);
    }

    let most_specific: Vec<&Location> = selection
        .iter()
        .copied()
        .filter(|l1| !selection.iter().any(|l2| l2.descendant_of(l1)))
        .collect();
    let pool = if most_specific.is_empty() {
        selection.to_vec()
    } else {
        most_specific
    };

    pool.into_iter().fold(None, |best: Option<&'a Location>, l| match best {
        Some(b) if weighted_population(b) >= weighted_population(l) => Some(b),
        _ => Some(l),
    })
}

fn located(location: &Location) -> Option<&GeoCoordinate> {
    location.coordinate.as_ref().filter(|c| !c.is_null())
}

// cities count double against same-named larger regions; tuned value, revisit with labeled data
fn weighted_population(location: &Location) -> u64 {
    let population = location.population_or_zero();
    if location.location_type == LocationType::City {
        population.saturating_mul(2)
    } else {
        population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        city, continent, country, europe, france, mention, paris_fr, paris_tx, person_mention, unit,
    };

    fn heuristic() -> HeuristicDisambiguation {
        HeuristicDisambiguation::new(HeuristicSettings::default())
    }

    fn picked(result: &[LocationAnnotation], value: &str) -> Option<LocationId> {
        result.iter().find(|a| a.mention.value == value).map(|a| a.location.id)
    }

    #[test]
    fn paris_resolves_to_france() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "France"), vec![france()]).unwrap();
        map.insert(mention(20, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        let result = heuristic().disambiguate("France ... Paris", &map).unwrap();
        assert_eq!(picked(&result, "France"), Some(france().id));
        assert_eq!(picked(&result, "Paris"), Some(paris_fr().id));
    }

    #[test]
    fn smaller_paris_is_caught_as_descendant_of_france() {
        let mut small_paris = paris_fr();
        small_paris.population = Some(900_000);
        let mut map = CandidateMap::new();
        map.insert(mention(0, "France"), vec![france()]).unwrap();
        map.insert(mention(20, "Paris"), vec![paris_tx(), small_paris]).unwrap();
        let heuristic = heuristic();
        let anchors: Vec<LocationId> = heuristic.anchors(&map).iter().map(|l| l.id).collect();
        assert_eq!(anchors, vec![france().id]);

        let result = heuristic.disambiguate("France ... Paris", &map).unwrap();
        assert_eq!(picked(&result, "Paris"), Some(paris_fr().id));
    }

    #[test]
    fn continent_wins_within_its_mention() {
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Europe"),
            vec![
                unit(300, "Europe", 2_000_000, (40.0, -3.7)),
                europe(),
                city(301, "Europe", 1_500_000, (45.0, 10.0)),
            ],
        )
        .unwrap();
        let result = heuristic().disambiguate("Europe", &map).unwrap();
        assert_eq!(picked(&result, "Europe"), Some(europe().id));
    }

    #[test]
    fn person_like_mentions_are_removed() {
        let mut map = CandidateMap::new();
        map.insert(person_mention(4, "Jordan", 1.0), vec![city(400, "Jordan", 5_000, (44.6, -93.6))])
            .unwrap();
        map.insert(person_mention(30, "Chad", 0.9), vec![city(401, "Chad", 1_000, (36.0, -80.0))])
            .unwrap();
        let likely = heuristic().remove_unlikely(&map);
        let kept: Vec<&str> = likely.mentions().map(|m| m.value.as_str()).collect();
        assert_eq!(kept, vec!["Chad"]);

        // a country candidate keeps the mention even for a certain person
        let mut map = CandidateMap::new();
        map.insert(
            person_mention(4, "Jordan", 1.0),
            vec![country(402, "Jordan", 10_000_000, (31.0, 36.0))],
        )
        .unwrap();
        assert_eq!(heuristic().remove_unlikely(&map).len(), 1);
    }

    #[test]
    fn unambiguous_cluster_becomes_anchor() {
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Saint Paul"),
            vec![city(10, "Saint Paul", 300_000, (44.95, -93.09)), city(11, "Saint Paul", 0, (44.96, -93.10))],
        )
        .unwrap();
        map.insert(
            mention(20, "Roseville"),
            vec![city(12, "Roseville", 36_000, (45.01, -93.16)), city(13, "Roseville", 140_000, (38.75, -121.29))],
        )
        .unwrap();
        let heuristic = heuristic();
        let anchors: Vec<LocationId> = heuristic.anchors(&map).iter().map(|l| l.id).collect();
        assert_eq!(anchors, vec![10]);

        let result = heuristic.disambiguate("", &map).unwrap();
        assert_eq!(picked(&result, "Saint Paul"), Some(10));
        assert_eq!(picked(&result, "Roseville"), Some(12));
    }

    #[test]
    fn lasso_finds_the_tight_cluster() {
        let all = [
            city(20, "Alpha", 1_000, (45.00, 7.00)),
            city(21, "Beta", 1_000, (45.10, 7.10)),
            city(22, "Gamma", 1_000, (45.05, 7.20)),
            city(23, "Alpha", 1_000, (-33.9, 151.2)),
            city(24, "Beta", 1_000, (40.7, -74.0)),
        ];
        let stats = LocationStats::new(&all);
        let mut ids: Vec<LocationId> = heuristic().lasso_anchors(&stats).iter().map(|l| l.id).collect();
        ids.sort();
        assert_eq!(ids, vec![20, 21, 22]);
    }

    #[test]
    fn lasso_keeps_locations_without_coordinates() {
        let mut gamma = city(95, "Gamma", 100, (0.0, 0.0));
        gamma.coordinate = None;
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Alpha"),
            vec![city(80, "Alpha", 1_000, (45.0, 7.0)), city(81, "Alpha", 1_000, (-33.9, 151.2))],
        )
        .unwrap();
        map.insert(
            mention(10, "Beta"),
            vec![city(90, "Beta", 1_000, (45.1, 7.1)), city(91, "Beta", 1_000, (40.7, -74.0))],
        )
        .unwrap();
        map.insert(mention(20, "Gamma"), vec![gamma]).unwrap();

        let heuristic = heuristic();
        let mut anchors: Vec<LocationId> = heuristic.anchors(&map).iter().map(|l| l.id).collect();
        anchors.sort();
        assert_eq!(anchors, vec![80, 90, 95]);

        let result = heuristic.disambiguate("", &map).unwrap();
        assert_eq!(picked(&result, "Alpha"), Some(80));
        assert_eq!(picked(&result, "Beta"), Some(90));
        assert_eq!(picked(&result, "Gamma"), Some(95));
    }

    #[test]
    fn lasso_terminates_and_rejects_single_survivor() {
        let all = [
            city(30, "North", 1_000, (60.0, 10.0)),
            city(31, "South", 1_000, (-40.0, 170.0)),
        ];
        assert!(heuristic().lasso_anchors(&LocationStats::new(&all)).is_empty());
        assert!(heuristic().lasso_anchors(&LocationStats::new(std::iter::empty())).is_empty());
    }

    #[test]
    fn falls_back_to_biggest_location() {
        let mut map = CandidateMap::new();
        map.insert(
            mention(0, "Springfield"),
            vec![city(40, "Springfield", 1_000, (39.8, -89.6)), city(41, "Springfield", 4_000, (37.2, -93.3))],
        )
        .unwrap();
        let anchors: Vec<LocationId> = heuristic().anchors(&map).iter().map(|l| l.id).collect();
        assert_eq!(anchors, vec![41]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "Atlantis"), Vec::new()).unwrap();
        assert!(heuristic().anchors(&map).is_empty());
        assert!(heuristic().disambiguate("Atlantis", &map).unwrap().is_empty());
    }

    #[test]
    fn select_prefers_descendants_and_cities() {
        let region = unit(50, "Limburg", 1_100_000, (51.2, 5.9));
        let mut town = city(51, "Limburg", 35_000, (50.4, 8.1));
        town.ancestor_ids = vec![50];
        assert_eq!(select_location(&[&region, &town]).map(|l| l.id), Some(51));

        let state = unit(52, "Georgia", 1_000_000, (33.0, -83.0));
        let capital = city(53, "Georgia", 600_000, (41.7, 44.8));
        assert_eq!(select_location(&[&state, &capital]).map(|l| l.id), Some(53));

        let first = city(54, "Twin", 10, (0.0, 0.0));
        let second = city(55, "Twin", 10, (1.0, 1.0));
        assert_eq!(select_location(&[&first, &second]).map(|l| l.id), Some(54));
        assert!(select_location(&[]).is_none());
    }

    #[test]
    fn two_continents_fall_through_to_population() {
        let a = continent(60, "Asia", 4_600_000_000, (34.0, 100.0));
        let b = continent(61, "Africa", 1_400_000_000, (2.0, 20.0));
        assert_eq!(select_location(&[&b, &a]).map(|l| l.id), Some(60));
    }

    #[test]
    fn output_is_deterministic() {
        let mut map = CandidateMap::new();
        map.insert(mention(0, "France"), vec![france()]).unwrap();
        map.insert(mention(20, "Paris"), vec![paris_tx(), paris_fr()]).unwrap();
        let first = heuristic().disambiguate("", &map).unwrap();
        for _ in 0..10 {
            assert_eq!(heuristic().disambiguate("", &map).unwrap(), first);
        }
    }
}
