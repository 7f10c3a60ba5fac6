// Test doubles and fixtures for the disambiguation core.
//
// One mock per collaborator seam:
// - ScoreTable / FnClassifier (Classifier): fixed or computed probabilities
// - StaticScopeDetector (ScopeDetector): constant scope
// - MockIndexSearcher (IndexSearcher): query → count, Err for unknown queries
// - FixedTagger (MentionTagger): whole-word matches of a fixed word list
//
// Plus a small gazetteer of real places with plausible ids and coordinates.

use std::collections::HashMap;

use toponym_common::{
    CategoryEntries, DisambiguationConfig, GeoCoordinate, Location, LocationId, LocationType, Mention, Result,
    PERSON_CATEGORY,
};

use crate::features::FeatureVector;
use crate::traits::{Classifier, IndexSearcher, MentionTagger, ScopeDetector};

// ---------------------------------------------------------------------------
// Fixture locations
// ---------------------------------------------------------------------------

pub const EUROPE_ID: LocationId = 1;
pub const NORTH_AMERICA_ID: LocationId = 2;
pub const FRANCE_ID: LocationId = 10;
pub const ILE_DE_FRANCE_ID: LocationId = 11;
pub const USA_ID: LocationId = 20;
pub const TEXAS_ID: LocationId = 21;
pub const PARIS_FR_ID: LocationId = 100;
pub const LYON_ID: LocationId = 101;
pub const PARIS_TX_ID: LocationId = 200;

fn place(
    id: LocationId,
    name: &str,
    kind: LocationType,
    population: u64,
    (lat, lng): (f64, f64),
    ancestors: &[LocationId],
) -> Location {
    Location::builder()
        .id(id)
        .primary_name(name)
        .location_type(kind)
        .population(population)
        .coordinate(GeoCoordinate::new(lat, lng))
        .ancestor_ids(ancestors.to_vec())
        .build()
}

pub fn europe() -> Location {
    place(EUROPE_ID, "Europe", LocationType::Continent, 741_000_000, (54.526, 15.2551), &[])
}

pub fn north_america() -> Location {
    place(NORTH_AMERICA_ID, "North America", LocationType::Continent, 579_000_000, (54.526, -105.2551), &[])
}

pub fn france() -> Location {
    let mut france = place(FRANCE_ID, "France", LocationType::Country, 67_000_000, (46.2276, 2.2137), &[EUROPE_ID]);
    france.alternative_names = vec!["French Republic".into()];
    france
}

pub fn ile_de_france() -> Location {
    place(
        ILE_DE_FRANCE_ID,
        "Île-de-France",
        LocationType::Unit,
        12_200_000,
        (48.8499, 2.6370),
        &[EUROPE_ID, FRANCE_ID],
    )
}

pub fn usa() -> Location {
    let mut usa = place(USA_ID, "United States", LocationType::Country, 331_000_000, (39.8283, -98.5795), &[NORTH_AMERICA_ID]);
    usa.alternative_names = vec!["USA".into(), "U.S.".into()];
    usa
}

pub fn texas() -> Location {
    place(TEXAS_ID, "Texas", LocationType::Unit, 29_000_000, (31.9686, -99.9018), &[NORTH_AMERICA_ID, USA_ID])
}

pub fn paris_fr() -> Location {
    place(
        PARIS_FR_ID,
        "Paris",
        LocationType::City,
        2_100_000,
        (48.8566, 2.3522),
        &[EUROPE_ID, FRANCE_ID, ILE_DE_FRANCE_ID],
    )
}

pub fn lyon() -> Location {
    place(LYON_ID, "Lyon", LocationType::City, 513_000, (45.7640, 4.8357), &[EUROPE_ID, FRANCE_ID])
}

pub fn paris_tx() -> Location {
    place(
        PARIS_TX_ID,
        "Paris",
        LocationType::City,
        25_000,
        (33.6609, -95.5555),
        &[NORTH_AMERICA_ID, USA_ID, TEXAS_ID],
    )
}

/// Every fixture location, for building an in-memory gazetteer.
pub fn fixture_gazetteer() -> Vec<Location> {
    vec![
        europe(),
        north_america(),
        france(),
        ile_de_france(),
        usa(),
        texas(),
        paris_fr(),
        lyon(),
        paris_tx(),
    ]
}

pub fn continent(id: LocationId, name: &str, population: u64, coord: (f64, f64)) -> Location {
    place(id, name, LocationType::Continent, population, coord, &[])
}

pub fn country(id: LocationId, name: &str, population: u64, coord: (f64, f64)) -> Location {
    place(id, name, LocationType::Country, population, coord, &[])
}

pub fn unit(id: LocationId, name: &str, population: u64, coord: (f64, f64)) -> Location {
    place(id, name, LocationType::Unit, population, coord, &[])
}

pub fn city(id: LocationId, name: &str, population: u64, coord: (f64, f64)) -> Location {
    place(id, name, LocationType::City, population, coord, &[])
}

pub fn mention(start_offset: usize, value: &str) -> Mention {
    Mention::new(start_offset, value)
}

/// A mention the context classifier thinks is a person with `probability`.
pub fn person_mention(start_offset: usize, value: &str, probability: f64) -> Mention {
    Mention::new(start_offset, value).with_categories(CategoryEntries::new().with(PERSON_CATEGORY, probability))
}

/// Defaults with debug features on, so classifiers can key on `locationId`.
pub fn debug_config() -> DisambiguationConfig {
    let mut config = DisambiguationConfig::default();
    config.features.debug_features = true;
    config
}

// ---------------------------------------------------------------------------
// ScoreTable
// ---------------------------------------------------------------------------

/// Looks up a probability by the value of one feature column. Unknown values
/// get the default score (0.0 unless changed).
pub struct ScoreTable {
    feature: String,
    scores: HashMap<String, f64>,
    default_score: f64,
    feature_names: Option<Vec<String>>,
}

impl ScoreTable {
    pub fn keyed_by(feature: &str) -> Self {
        Self {
            feature: feature.to_string(),
            scores: HashMap::new(),
            default_score: 0.0,
            feature_names: None,
        }
    }

    /// Keyed by the `locationId` debug feature.
    pub fn by_location_id() -> Self {
        Self::keyed_by("locationId")
    }

    pub fn score(mut self, key: impl ToString, probability: f64) -> Self {
        self.scores.insert(key.to_string(), probability);
        self
    }

    pub fn default_score(mut self, probability: f64) -> Self {
        self.default_score = probability;
        self
    }

    /// Pretend the model was trained on exactly these columns.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }
}

impl Classifier for ScoreTable {
    fn classify(&self, features: &FeatureVector) -> Result<f64> {
        let key = features.get(&self.feature).map(|value| value.to_string());
        Ok(key
            .and_then(|key| self.scores.get(&key).copied())
            .unwrap_or(self.default_score))
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

// ---------------------------------------------------------------------------
// FnClassifier
// ---------------------------------------------------------------------------

pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&FeatureVector) -> Result<f64> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Classifier for FnClassifier<F>
where
    F: Fn(&FeatureVector) -> Result<f64> + Send + Sync,
{
    fn classify(&self, features: &FeatureVector) -> Result<f64> {
        (self.f)(features)
    }
}

// ---------------------------------------------------------------------------
// StaticScopeDetector
// ---------------------------------------------------------------------------

pub struct StaticScopeDetector {
    name: String,
    scope: Option<GeoCoordinate>,
    alternatives: Vec<GeoCoordinate>,
}

impl StaticScopeDetector {
    pub fn new(name: &str, scope: Option<GeoCoordinate>) -> Self {
        Self {
            name: name.to_string(),
            scope,
            alternatives: Vec::new(),
        }
    }

    /// Further foci returned by `detect_all` after the best one.
    pub fn with_alternatives(mut self, alternatives: Vec<GeoCoordinate>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

impl ScopeDetector for StaticScopeDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, _text: &str) -> Option<GeoCoordinate> {
        self.scope
    }

    fn detect_all(&self, _text: &str) -> Vec<GeoCoordinate> {
        self.scope.into_iter().chain(self.alternatives.iter().copied()).collect()
    }
}

// ---------------------------------------------------------------------------
// MockIndexSearcher
// ---------------------------------------------------------------------------

/// Query → result count. Unregistered queries fail, like an unreachable index.
pub struct MockIndexSearcher {
    name: String,
    counts: HashMap<String, u64>,
}

impl MockIndexSearcher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            counts: HashMap::new(),
        }
    }

    pub fn on_query(mut self, query: &str, count: u64) -> Self {
        self.counts.insert(query.to_string(), count);
        self
    }
}

impl IndexSearcher for MockIndexSearcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_result_count(&self, query: &str) -> Result<u64> {
        self.counts
            .get(query)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("MockIndexSearcher: no count registered for {query}").into())
    }
}

// ---------------------------------------------------------------------------
// FixedTagger
// ---------------------------------------------------------------------------

/// Tags every whole-word, case-sensitive occurrence of the configured words.
pub struct FixedTagger {
    words: Vec<String>,
}

impl FixedTagger {
    pub fn new(words: &[&str]) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl MentionTagger for FixedTagger {
    fn tag(&self, text: &str) -> Vec<Mention> {
        let mut mentions: Vec<Mention> = self
            .words
            .iter()
            .flat_map(|word| {
                text.match_indices(word.as_str())
                    .filter(|(idx, _)| {
                        let left = text[..*idx].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
                        let right = text[idx + word.len()..]
                            .chars()
                            .next()
                            .map_or(true, |c| !c.is_alphanumeric());
                        left && right
                    })
                    .map(|(idx, value)| Mention::new(idx, value))
                    .collect::<Vec<_>>()
            })
            .collect();
        mentions.sort_by_key(|m| m.start_offset);
        mentions
    }
}
