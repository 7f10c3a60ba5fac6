use std::collections::{HashMap, HashSet};

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToponymError};
use crate::types::{Location, LocationId, Mention};

/// One key of the candidate multimap, as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateEntry {
    pub mention: Mention,
    #[serde(default)]
    pub candidates: Vec<Location>,
}

/// Mention → candidate locations, iterated in mention insertion order.
///
/// Looking up a mention that was never inserted yields an empty slice, which
/// is the same "no candidates" signal as an explicitly empty entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CandidateEntry>", into = "Vec<CandidateEntry>")]
pub struct CandidateMap {
    entries: Vec<CandidateEntry>,
    index: HashMap<Mention, usize>,
}

impl CandidateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidates for a mention. Repeated inserts for the same mention
    /// append; a location id already present for that mention is skipped.
    /// An invalid location rejects the whole batch and leaves the map unchanged.
    pub fn insert(
        &mut self,
        mention: Mention,
        candidates: impl IntoIterator<Item = Location>,
    ) -> Result<()> {
        let candidates: Vec<Location> = candidates.into_iter().collect();
        for location in &candidates {
            location.validate()?;
        }
        let slot = match self.index.get(&mention) {
            Some(&slot) => slot,
            None => {
                self.entries.push(CandidateEntry {
                    mention: mention.clone(),
                    candidates: Vec::new(),
                });
                self.index.insert(mention, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[slot];
        let mut seen: HashSet<LocationId> = entry.candidates.iter().map(|l| l.id).collect();
        for location in candidates {
            if seen.insert(location.id) {
                entry.candidates.push(location);
            }
        }
        Ok(())
    }

    pub fn get(&self, mention: &Mention) -> &[Location] {
        self.index
            .get(mention)
            .map(|&slot| self.entries[slot].candidates.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, mention: &Mention) -> bool {
        self.index.contains_key(mention)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Mention, &[Location])> {
        self.entries
            .iter()
            .map(|e| (&e.mention, e.candidates.as_slice()))
    }

    pub fn mentions(&self) -> impl Iterator<Item = &Mention> {
        self.entries.iter().map(|e| &e.mention)
    }

    /// Number of mentions (keys).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (mention, candidate) pairs.
    pub fn candidate_count(&self) -> usize {
        self.entries.iter().map(|e| e.candidates.len()).sum()
    }

    /// Every distinct candidate across all mentions, first-seen order.
    pub fn all_locations(&self) -> Vec<&Location> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .flat_map(|e| e.candidates.iter())
            .filter(|l| seen.insert(l.id))
            .collect()
    }

    /// New map without the mentions rejected by `keep`.
    pub fn retain_mentions(&self, keep: impl Fn(&Mention, &[Location]) -> bool) -> CandidateMap {
        let entries: Vec<CandidateEntry> = self
            .entries
            .iter()
            .filter(|e| keep(&e.mention, &e.candidates))
            .cloned()
            .collect();
        Self::from_valid_entries(entries)
    }

    /// New map with the same mentions, each narrowed to the candidates accepted by `keep`.
    pub fn filter_candidates(&self, keep: impl Fn(&Mention, &Location) -> bool) -> CandidateMap {
        let entries: Vec<CandidateEntry> = self
            .entries
            .iter()
            .map(|e| CandidateEntry {
                mention: e.mention.clone(),
                candidates: e
                    .candidates
                    .iter()
                    .filter(|l| keep(&e.mention, l))
                    .cloned()
                    .collect(),
            })
            .collect();
        Self::from_valid_entries(entries)
    }

    // entries taken from an existing map are already validated and deduplicated
    fn from_valid_entries(entries: Vec<CandidateEntry>) -> CandidateMap {
        let index = entries
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.mention.clone(), slot))
            .collect();
        CandidateMap { entries, index }
    }
}

impl TryFrom<Vec<CandidateEntry>> for CandidateMap {
    type Error = ToponymError;

    fn try_from(entries: Vec<CandidateEntry>) -> Result<Self> {
        let mut map = CandidateMap::new();
        for entry in entries {
            map.insert(entry.mention, entry.candidates)?;
        }
        Ok(map)
    }
}

impl From<CandidateMap> for Vec<CandidateEntry> {
    fn from(map: CandidateMap) -> Self {
        map.entries
    }
}

impl JsonSchema for CandidateMap {
    fn schema_name() -> String {
        "CandidateMap".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <Vec<CandidateEntry>>::json_schema(gen)
    }
}

/// A text together with its tagged mentions and their gazetteer candidates.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub text: String,
    pub candidates: CandidateMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GeoCoordinate, LocationType};

    fn city(id: LocationId, name: &str) -> Location {
        Location::builder()
            .id(id)
            .primary_name(name)
            .location_type(LocationType::City)
            .coordinate(GeoCoordinate::new(10.0, id as f64))
            .build()
    }

    #[test]
    fn keeps_insertion_order_and_dedupes_candidates() {
        let mut map = CandidateMap::new();
        map.insert(Mention::new(20, "Springfield"), vec![city(1, "Springfield"), city(2, "Springfield")])
            .unwrap();
        map.insert(Mention::new(0, "Boston"), vec![city(3, "Boston")]).unwrap();
        map.insert(Mention::new(20, "Springfield"), vec![city(2, "Springfield"), city(4, "Springfield")])
            .unwrap();

        let order: Vec<&str> = map.mentions().map(|m| m.value.as_str()).collect();
        assert_eq!(order, vec!["Springfield", "Boston"]);
        let ids: Vec<LocationId> = map.get(&Mention::new(20, "Springfield")).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(map.candidate_count(), 4);
    }

    #[test]
    fn unknown_mention_has_no_candidates() {
        let map = CandidateMap::new();
        assert!(map.get(&Mention::new(0, "Atlantis")).is_empty());
    }

    #[test]
    fn rejects_self_referencing_location() {
        let mut map = CandidateMap::new();
        let mut broken = city(5, "Loop");
        broken.ancestor_ids = vec![5];
        assert!(map.insert(Mention::new(0, "Loop"), vec![broken]).is_err());
    }

    #[test]
    fn invalid_batch_leaves_map_unchanged() {
        let mut map = CandidateMap::new();
        map.insert(Mention::new(0, "Loop"), vec![city(1, "Loop")]).unwrap();

        let mut broken = city(3, "Loop");
        broken.ancestor_ids = vec![3];
        assert!(map.insert(Mention::new(0, "Loop"), vec![city(2, "Loop"), broken.clone()]).is_err());
        let ids: Vec<LocationId> = map.get(&Mention::new(0, "Loop")).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1]);

        assert!(map.insert(Mention::new(9, "Other"), vec![city(4, "Other"), broken]).is_err());
        assert!(!map.contains(&Mention::new(9, "Other")));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn all_locations_is_distinct() {
        let mut map = CandidateMap::new();
        map.insert(Mention::new(0, "US"), vec![city(1, "United States")]).unwrap();
        map.insert(Mention::new(10, "United States"), vec![city(1, "United States")]).unwrap();
        assert_eq!(map.all_locations().len(), 1);
    }

    #[test]
    fn filtering_returns_new_views() {
        let mut map = CandidateMap::new();
        map.insert(Mention::new(0, "A"), vec![city(1, "A"), city(2, "A")]).unwrap();
        map.insert(Mention::new(5, "B"), vec![city(3, "B")]).unwrap();

        let narrowed = map.filter_candidates(|_, l| l.id != 2);
        assert_eq!(narrowed.get(&Mention::new(0, "A")).len(), 1);
        assert_eq!(map.get(&Mention::new(0, "A")).len(), 2);

        let without_b = map.retain_mentions(|m, _| m.value != "B");
        assert_eq!(without_b.len(), 1);
        assert!(!without_b.contains(&Mention::new(5, "B")));
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let mut map = CandidateMap::new();
        map.insert(Mention::new(7, "Paris"), vec![city(1, "Paris")]).unwrap();
        map.insert(Mention::new(0, "Texas"), Vec::new()).unwrap();
        let doc = Document {
            text: "Texas, Paris".to_string(),
            candidates: map,
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back.candidates, doc.candidates);
        assert!(back.candidates.get(&Mention::new(0, "Texas")).is_empty());
    }
}
