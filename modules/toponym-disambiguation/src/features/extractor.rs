use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;
use typed_builder::TypedBuilder;

use toponym_common::{
    CandidateMap, FeatureSettings, GeoCoordinate, Location, LocationId, LocationType, Mention, Result,
    ToponymError, UNKNOWN_DISTANCE,
};

use super::vector::{ClassifiableLocation, FeatureVector, FeatureVectorBuilder};
use crate::stats::{
    ancestor_of, child_of, descendant_of, equal, in_set, min_population, not, of_type, parent_of, radius,
    sibling_of, LocationStats,
};
use crate::text::{case_signature, contains_word, is_acronym, normalize_name, token_count};
use crate::traits::{IndexSearcher, ScopeDetector};

/// Feature vectors for every candidate of one distinct mention text.
#[derive(Debug, Clone)]
pub struct MentionFeatures {
    pub value: String,
    pub instances: Vec<ClassifiableLocation>,
}

pub trait FeatureExtractor: Send + Sync {
    /// One entry per distinct mention text with at least one candidate, in
    /// candidate map order. Repeated mentions of the same text share the
    /// features of their first occurrence.
    fn extract(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<MentionFeatures>>;
}

/// The standard extractor: surface, population, hierarchy, proximity, scope
/// and index-frequency features, shaped by [`FeatureSettings`].
#[derive(Clone, TypedBuilder)]
pub struct ConfigurableFeatureExtractor {
    #[builder(default)]
    settings: FeatureSettings,
    #[builder(default)]
    scope_detectors: Vec<Arc<dyn ScopeDetector>>,
    #[builder(default)]
    index_searchers: Vec<Arc<dyn IndexSearcher>>,
}

impl ConfigurableFeatureExtractor {
    pub fn new(settings: FeatureSettings) -> Self {
        Self::builder().settings(settings).build()
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    fn index_counts(&self, value: &str) -> Result<Vec<(String, u64)>> {
        let query = format!("\"{value}\"");
        self.index_searchers
            .iter()
            .map(|searcher| {
                searcher
                    .total_result_count(&query)
                    .map(|count| (searcher.name().to_string(), count))
                    .map_err(|e| ToponymError::IndexSearch {
                        searcher: searcher.name().to_string(),
                        message: format!("searching {query}: {e}"),
                    })
            })
            .collect()
    }
}

impl std::fmt::Debug for ConfigurableFeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurableFeatureExtractor")
            .field("settings", &self.settings)
            .field("scope_detectors", &self.scope_detectors.len())
            .field("index_searchers", &self.index_searchers.len())
            .finish()
    }
}

/// Document-wide values shared by all mentions.
struct DocumentContext<'a> {
    all: LocationStats<'a>,
    unique: LocationStats<'a>,
    continents: LocationStats<'a>,
    countries: LocationStats<'a>,
    units: LocationStats<'a>,
    scopes: Vec<GeoCoordinate>,
    /// All foci proposed by each detector, same order as `scopes`.
    scope_sets: Vec<Vec<GeoCoordinate>>,
    /// Distinct mention texts under which each location was retrieved.
    mention_texts: HashMap<LocationId, HashSet<&'a str>>,
    text_hash: Option<String>,
}

/// Values shared by all candidates of one mention.
struct MentionContext<'a> {
    mention: &'a Mention,
    current: LocationStats<'a>,
    others: LocationStats<'a>,
    num_characters: usize,
    num_tokens: usize,
    acronym: bool,
    case_signature: String,
    name_ambiguity: f64,
    geo_diversity: f64,
    unique: bool,
    index_counts: Vec<(String, u64)>,
}

impl FeatureExtractor for ConfigurableFeatureExtractor {
    fn extract(&self, text: &str, candidates: &CandidateMap) -> Result<Vec<MentionFeatures>> {
        let doc = self.document_context(text, candidates);
        let mut seen_values: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();

        for (mention, group) in candidates.iter() {
            if group.is_empty() || !seen_values.insert(mention.value.as_str()) {
                continue;
            }
            let normalized = normalize_name(&mention.value);
            let current = LocationStats::new(group);
            let own_ids = current.ids();
            let others = doc.all.filter(not(in_set(&own_ids)));
            let ctx = MentionContext {
                mention,
                num_characters: mention.value.chars().count(),
                num_tokens: token_count(&mention.value),
                acronym: is_acronym(&mention.value),
                case_signature: case_signature(&normalized),
                name_ambiguity: 1.0 / current.count() as f64,
                geo_diversity: current.largest_distance(),
                unique: current.largest_distance() < self.settings.equal_distance_km,
                index_counts: self.index_counts(&normalized)?,
                current,
                others,
            };

            let instances = group
                .iter()
                .map(|location| {
                    ClassifiableLocation::new(location.clone(), self.location_features(&doc, &ctx, location))
                })
                .collect();
            result.push(MentionFeatures {
                value: mention.value.clone(),
                instances,
            });
        }

        debug!(
            mentions = result.len(),
            instances = result.iter().map(|m| m.instances.len()).sum::<usize>(),
            "Extracted location features"
        );
        Ok(result)
    }
}

impl ConfigurableFeatureExtractor {
    fn document_context<'a>(&self, text: &str, candidates: &'a CandidateMap) -> DocumentContext<'a> {
        let all = LocationStats::new(candidates.all_locations());

        // groups whose members all lie within the equality distance
        let unique = LocationStats::new(
            candidates
                .iter()
                .filter(|(_, group)| LocationStats::new(*group).largest_distance() < self.settings.equal_distance_km)
                .flat_map(|(_, group)| group.iter()),
        );

        let mut mention_texts: HashMap<LocationId, HashSet<&'a str>> = HashMap::new();
        for (mention, group) in candidates.iter() {
            for location in group {
                mention_texts
                    .entry(location.id)
                    .or_default()
                    .insert(mention.value.as_str());
            }
        }

        let scopes = self
            .scope_detectors
            .iter()
            .map(|detector| {
                let scope = detector.detect(text);
                debug!(detector = detector.name(), scope = ?scope, "Detected text scope");
                scope.unwrap_or(GeoCoordinate::NULL)
            })
            .collect();
        let scope_sets = self
            .scope_detectors
            .iter()
            .map(|detector| detector.detect_all(text))
            .collect();

        let text_hash = self
            .settings
            .debug_features
            .then(|| hex::encode(Sha256::digest(text.as_bytes())));

        DocumentContext {
            continents: all.filter(of_type(&[LocationType::Continent])),
            countries: all.filter(of_type(&[LocationType::Country])),
            units: all.filter(of_type(&[LocationType::Unit])),
            all,
            unique,
            scopes,
            scope_sets,
            mention_texts,
            text_hash,
        }
    }

    fn location_features(&self, doc: &DocumentContext<'_>, ctx: &MentionContext<'_>, location: &Location) -> FeatureVector {
        let settings = &self.settings;
        let hierarchy = settings.use_hierarchy_features;
        let population = location.population_or_zero();
        let coordinate = location.coordinate_or_null();
        let mut b = FeatureVector::builder();

        // surface
        b.set("numCharacters", ctx.num_characters);
        b.set("numTokens", ctx.num_tokens);
        b.set("acronym", ctx.acronym);
        b.set("caseSignature", ctx.case_signature.as_str());
        self.marker_features(&ctx.mention.value, &mut b);

        // candidate
        b.set("locationType", location.location_type.as_str());
        b.set("population", population);
        if hierarchy {
            b.set("hierarchyDepth", location.hierarchy_depth());
        }
        b.set("nameAmbiguity", ctx.name_ambiguity);
        if hierarchy {
            b.set("leaf", ctx.current.filter(child_of(location)).is_empty());
        }
        b.set("nameDiversity", 1.0 / location.names().len() as f64);
        b.set("geoDiversity", ctx.geo_diversity);
        b.set("unique", ctx.unique);
        let alt_mention = doc.mention_texts.get(&location.id).is_some_and(|texts| texts.len() > 1);
        b.set("altMention", alt_mention);

        // relations to the other mentions' candidates
        if hierarchy {
            let relations = [
                ("ancestor", ctx.others.filter(ancestor_of(location)).count()),
                ("child", ctx.others.filter(child_of(location)).count()),
                ("descendant", ctx.others.filter(descendant_of(location)).count()),
                ("parent", ctx.others.filter(parent_of(location)).count()),
                ("sibling", ctx.others.filter(sibling_of(location)).count()),
            ];
            for (relation, count) in relations {
                b.set(format!("contains({relation})"), count > 0);
            }
            for (relation, count) in relations {
                b.set(format!("num({relation})"), count);
            }
        }

        // proximity
        for &d in &settings.distance_values {
            let km = f64::from(d);
            let others_in_dist = ctx.others.filter(radius(coordinate, km));
            let all_in_dist = doc.all.filter(radius(coordinate, km));
            b.set(format!("numLocIn({d})"), others_in_dist.count());
            b.set(format!("popIn({d},true)"), all_in_dist.total_population());
            b.set(
                format!("popIn({d},false)"),
                others_in_dist.filter(not(equal(location))).total_population(),
            );
            b.set(format!("uniqueIn({d})"), !doc.unique.filter(radius(coordinate, km)).is_empty());
        }
        for &p in &settings.population_values {
            let dist_all = doc.all.filter(min_population(p)).min_distance(&coordinate);
            let dist_other = ctx
                .others
                .filter(min_population(p))
                .filter(not(equal(location)))
                .min_distance(&coordinate);
            b.set(format!("distLoc({p},true)"), dist_all);
            b.set(format!("distLoc({p},false)"), dist_other);
            for &d in &settings.distance_values {
                let km = f64::from(d);
                b.set(format!("hasLoc({p},{d},true)"), dist_all < km);
                b.set(format!("hasLoc({p},{d},false)"), dist_other < km);
            }
        }

        b.set("primaryName", ctx.mention.value.to_lowercase() == location.primary_name.to_lowercase());
        if hierarchy {
            b.set("inContinent", !doc.continents.filter(ancestor_of(location)).is_empty());
            b.set("inCountry", !doc.countries.filter(ancestor_of(location)).is_empty());
            b.set("inUnit", !doc.units.filter(ancestor_of(location)).is_empty());
        }

        for category in &settings.entity_categories {
            b.set(format!("category({category})"), ctx.mention.categories.probability(category));
        }
        for (n, scope) in doc.scopes.iter().enumerate() {
            b.set(format!("scopeDistance-{n}"), coordinate.distance(scope));
        }
        for (n, set) in doc.scope_sets.iter().enumerate() {
            let distances: Vec<f64> = set.iter().map(|scope| coordinate.distance(scope)).collect();
            let min = distances.iter().copied().fold(UNKNOWN_DISTANCE, f64::min);
            let max = if distances.is_empty() {
                UNKNOWN_DISTANCE
            } else {
                distances.iter().copied().fold(0.0, f64::max)
            };
            for &d in &settings.distance_values {
                b.set(format!("scopeDistance-{n}-{d}"), min < f64::from(d));
            }
            b.set(format!("scopeDistance-{n}-min"), min);
            b.set(format!("scopeDistance-{n}-max"), max);
        }
        for (name, count) in &ctx.index_counts {
            b.set(format!("indexCount({name})"), *count);
            b.set(
                format!("indexPopulationQuotient({name})"),
                population as f64 / (*count as f64 + 1.0),
            );
        }

        if let Some(hash) = &doc.text_hash {
            b.set("textHash", hash.as_str());
            b.set("annotationOffset", ctx.mention.start_offset);
            b.set("annotationValue", ctx.mention.value.as_str());
            b.set("locationId", location.id.to_string());
        }
        b.build()
    }

    fn marker_features(&self, value: &str, b: &mut FeatureVectorBuilder) {
        let markers = &self.settings.location_markers;
        if markers.is_empty() {
            return;
        }
        let mut any = false;
        for marker in markers {
            let found = contains_word(marker, value);
            b.set(format!("marker({})", marker.to_lowercase()), found);
            any |= found;
        }
        b.set("marker(*)", any);
    }
}
