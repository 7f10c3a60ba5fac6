use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use typed_builder::TypedBuilder;

use toponym_common::{CandidateMap, ClassifierSettings, Location, LocationId, Result, ToponymError};

use crate::context::PrefixContextClassifier;
use crate::text::normalize_name;
use crate::traits::{CandidateRetriever, ContextClassifier, LocationSource, MentionTagger};

/// Gazetteer held in memory, indexed by id and by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocationSource {
    by_id: HashMap<LocationId, Location>,
    by_name: HashMap<String, Vec<LocationId>>,
}

impl InMemoryLocationSource {
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Result<Self> {
        let mut source = Self::default();
        for location in locations {
            source.add(location)?;
        }
        Ok(source)
    }

    /// Add a record. Ids must be unique.
    pub fn add(&mut self, location: Location) -> Result<()> {
        location.validate()?;
        if self.by_id.contains_key(&location.id) {
            return Err(ToponymError::Gazetteer(format!("duplicate location id {}", location.id)));
        }
        for name in location.names() {
            self.by_name.entry(name.to_lowercase()).or_default().push(location.id);
        }
        self.by_id.insert(location.id, location);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl LocationSource for InMemoryLocationSource {
    fn locations_by_name(&self, name: &str) -> Result<Vec<Location>> {
        Ok(self
            .by_name
            .get(&name.to_lowercase())
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect())
    }

    fn location_by_id(&self, id: LocationId) -> Result<Option<Location>> {
        Ok(self.by_id.get(&id).cloned())
    }
}

/// Tagger → context classifier → gazetteer lookup, producing the candidate
/// map the strategies consume.
#[derive(Clone, TypedBuilder)]
pub struct GazetteerRetriever {
    tagger: Arc<dyn MentionTagger>,
    source: Arc<dyn LocationSource>,
    #[builder(default, setter(strip_option))]
    context: Option<Arc<dyn ContextClassifier>>,
}

impl GazetteerRetriever {
    /// Retriever that tags mention context with a [`PrefixContextClassifier`]
    /// looking `contextWindowSize` tokens back.
    pub fn with_context_settings(
        tagger: Arc<dyn MentionTagger>,
        source: Arc<dyn LocationSource>,
        settings: &ClassifierSettings,
    ) -> Self {
        Self {
            tagger,
            source,
            context: Some(Arc::new(PrefixContextClassifier::from_settings(settings))),
        }
    }
}

impl CandidateRetriever for GazetteerRetriever {
    fn candidates(&self, text: &str) -> Result<CandidateMap> {
        let mut map = CandidateMap::new();
        for mention in self.tagger.tag(text) {
            let mention = match &self.context {
                Some(context) => {
                    let categories = context.classify(text, &mention);
                    mention.with_categories(categories)
                }
                None => mention,
            };
            let candidates = self.source.locations_by_name(&normalize_name(&mention.value))?;
            debug!(mention = %mention, candidates = candidates.len(), "Gazetteer lookup");
            map.insert(mention, candidates)?;
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_gazetteer, france, paris_fr, paris_tx, FixedTagger, FRANCE_ID, PARIS_TX_ID};
    use toponym_common::{Mention, PERSON_CATEGORY};

    fn source() -> InMemoryLocationSource {
        InMemoryLocationSource::new(fixture_gazetteer()).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive_and_covers_alternative_names() {
        let source = source();
        let ids: Vec<LocationId> = source.locations_by_name("PARIS").unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![paris_fr().id, paris_tx().id]);
        assert_eq!(source.locations_by_name("usa").unwrap().len(), 1);
        assert!(source.locations_by_name("Atlantis").unwrap().is_empty());
    }

    #[test]
    fn ancestors_resolve_root_first() {
        let source = source();
        let names: Vec<String> = source
            .ancestors(&paris_tx())
            .unwrap()
            .into_iter()
            .map(|l| l.primary_name)
            .collect();
        assert_eq!(names, vec!["North America", "United States", "Texas"]);
        assert_eq!(source.location_by_id(PARIS_TX_ID).unwrap().map(|l| l.id), Some(PARIS_TX_ID));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut source = source();
        assert!(matches!(source.add(france()), Err(ToponymError::Gazetteer(_))));
    }

    #[test]
    fn retriever_builds_candidate_map() {
        let retriever = GazetteerRetriever::with_context_settings(
            Arc::new(FixedTagger::new(&["France", "Paris", "Atlantis"])),
            Arc::new(source()),
            &ClassifierSettings::default(),
        );
        let text = "Mr. Paris visited Atlantis and France.";
        let map = retriever.candidates(text).unwrap();

        let order: Vec<&str> = map.mentions().map(|m| m.value.as_str()).collect();
        assert_eq!(order, vec!["Paris", "Atlantis", "France"]);
        assert!(map.get(&Mention::new(18, "Atlantis")).is_empty());
        assert_eq!(map.get(&Mention::new(31, "France"))[0].id, FRANCE_ID);

        let paris = map.mentions().find(|m| m.value == "Paris").unwrap();
        assert_eq!(paris.categories.probability(PERSON_CATEGORY), 1.0);
    }

    #[test]
    fn context_window_comes_from_settings() {
        let text = "President Obama visited Paris";
        let person_probability = |window: usize| {
            let settings = ClassifierSettings {
                context_window_size: window,
                ..ClassifierSettings::default()
            };
            let retriever = GazetteerRetriever::with_context_settings(
                Arc::new(FixedTagger::new(&["Paris"])),
                Arc::new(source()),
                &settings,
            );
            let map = retriever.candidates(text).unwrap();
            let paris = map.mentions().next().unwrap().clone();
            assert_eq!(map.get(&paris).len(), 2);
            paris.categories.probability(PERSON_CATEGORY)
        };
        assert_eq!(person_probability(3), 1.0);
        assert_eq!(person_probability(1), 0.0);
    }
}
