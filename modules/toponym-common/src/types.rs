use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{Result, ToponymError};

// --- Geo Types ---

/// Distance reported whenever one side of a comparison has no coordinate.
/// Large enough that no radius or threshold check ever accepts it.
pub const UNKNOWN_DISTANCE: f64 = f64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoordinate {
    /// Stand-in for "no coordinate" where a value is needed (feature extraction, scopes).
    /// Never equal to anything, including itself; check with [`GeoCoordinate::is_null`].
    pub const NULL: GeoCoordinate = GeoCoordinate {
        lat: f64::NAN,
        lng: f64::NAN,
    };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_null(&self) -> bool {
        self.lat.is_nan() || self.lng.is_nan()
    }

    /// Great-circle distance in kilometers, [`UNKNOWN_DISTANCE`] if either side is NULL.
    pub fn distance(&self, other: &GeoCoordinate) -> f64 {
        if self.is_null() || other.is_null() {
            return UNKNOWN_DISTANCE;
        }
        // canonical argument order: distance(a, b) is bit-identical to distance(b, a)
        let (a, b) = if (self.lat, self.lng) <= (other.lat, other.lng) {
            (self, other)
        } else {
            (other, self)
        };
        haversine_km(a.lat, a.lng, b.lat, b.lng)
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "(null)")
        } else {
            write!(f, "({:.4},{:.4})", self.lat, self.lng)
        }
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Geographic midpoint of the given coordinates (average of the unit vectors,
/// projected back onto the sphere). NULL coordinates are skipped.
///
/// Returns `None` when no usable coordinate is given. A single coordinate is
/// its own midpoint. Only a set whose unit vectors cancel out completely
/// (e.g. two antipodal points) has no direction and collapses to (0, 0).
pub fn midpoint<'a>(coordinates: impl IntoIterator<Item = &'a GeoCoordinate>) -> Option<GeoCoordinate> {
    let usable: Vec<&GeoCoordinate> = coordinates.into_iter().filter(|c| !c.is_null()).collect();
    match usable.len() {
        0 => return None,
        1 => return Some(*usable[0]),
        _ => {}
    }
    let count = usable.len() as f64;
    let (mut x, mut y, mut z) = (0.0_f64, 0.0_f64, 0.0_f64);
    for c in &usable {
        let lat = c.lat.to_radians();
        let lng = c.lng.to_radians();
        x += lat.cos() * lng.cos();
        y += lat.cos() * lng.sin();
        z += lat.sin();
    }
    x /= count;
    y /= count;
    z /= count;
    if x.abs() < 1e-9 && y.abs() < 1e-9 && z.abs() < 1e-9 {
        return Some(GeoCoordinate::new(0.0, 0.0));
    }
    let lng = y.atan2(x);
    let hyp = (x * x + y * y).sqrt();
    let lat = z.atan2(hyp);
    Some(GeoCoordinate::new(lat.to_degrees(), lng.to_degrees()))
}

// --- Location Types ---

pub type LocationId = u64;

/// Gazetteer classification of a place, declared from least to most specific.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Continent,
    Country,
    /// Administrative unit below country level (state, county, district).
    Unit,
    Region,
    City,
    Landmark,
    Poi,
    Street,
    StreetNr,
    Zip,
    Undetermined,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Continent => "continent",
            LocationType::Country => "country",
            LocationType::Unit => "unit",
            LocationType::Region => "region",
            LocationType::City => "city",
            LocationType::Landmark => "landmark",
            LocationType::Poi => "poi",
            LocationType::Street => "street",
            LocationType::StreetNr => "street_nr",
            LocationType::Zip => "zip",
            LocationType::Undetermined => "undetermined",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gazetteer record. Hierarchy is expressed as the ordered list of ancestor
/// ids (root first, direct parent last), so every relation test is an id lookup.
///
/// Equality and hashing use the id only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, TypedBuilder)]
pub struct Location {
    pub id: LocationId,
    #[builder(setter(into))]
    pub primary_name: String,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_names: Vec<String>,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<GeoCoordinate>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestor_ids: Vec<LocationId>,
}

impl Location {
    /// Population with unknown treated as zero.
    pub fn population_or_zero(&self) -> u64 {
        self.population.unwrap_or(0)
    }

    pub fn has_coordinate(&self) -> bool {
        self.coordinate.is_some_and(|c| !c.is_null())
    }

    pub fn coordinate_or_null(&self) -> GeoCoordinate {
        self.coordinate.unwrap_or(GeoCoordinate::NULL)
    }

    /// Distance to another location in km, [`UNKNOWN_DISTANCE`] if either lacks a coordinate.
    pub fn distance(&self, other: &Location) -> f64 {
        self.coordinate_or_null().distance(&other.coordinate_or_null())
    }

    pub fn hierarchy_depth(&self) -> usize {
        self.ancestor_ids.len()
    }

    /// Primary name followed by the alternative names, deduplicated case-insensitively.
    pub fn names(&self) -> Vec<&str> {
        let mut seen: Vec<String> = Vec::new();
        let mut names = Vec::new();
        for name in std::iter::once(&self.primary_name).chain(self.alternative_names.iter()) {
            let key = name.to_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                names.push(name.as_str());
            }
        }
        names
    }

    pub fn has_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names().iter().any(|n| n.to_lowercase() == name)
    }

    /// Whether the two locations share at least one name (case-insensitive).
    pub fn common_name(&self, other: &Location) -> bool {
        self.names().iter().any(|n| other.has_name(n))
    }

    /// `other` appears anywhere on this location's ancestor path.
    pub fn descendant_of(&self, other: &Location) -> bool {
        self.ancestor_ids.contains(&other.id)
    }

    /// `other` is this location's direct parent.
    pub fn child_of(&self, other: &Location) -> bool {
        self.ancestor_ids.last() == Some(&other.id)
    }

    pub fn ancestor_of(&self, other: &Location) -> bool {
        other.descendant_of(self)
    }

    pub fn parent_of(&self, other: &Location) -> bool {
        other.child_of(self)
    }

    /// Same ancestor path, different place.
    pub fn sibling_of(&self, other: &Location) -> bool {
        self.id != other.id && self.ancestor_ids == other.ancestor_ids
    }

    /// Reject records that would form a hierarchy self-cycle.
    pub fn validate(&self) -> Result<()> {
        if self.ancestor_ids.contains(&self.id) {
            return Err(ToponymError::InvalidLocation {
                id: self.id,
                reason: "ancestor_ids contains the location's own id".to_string(),
            });
        }
        Ok(())
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}, pop={}, {}]",
            self.primary_name,
            self.id,
            self.location_type,
            self.population_or_zero(),
            self.coordinate_or_null()
        )
    }
}

// --- Mentions ---

pub const PERSON_CATEGORY: &str = "PER";
pub const LOCATION_CATEGORY: &str = "LOC";

/// Category probability distribution attached to a mention by a context classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CategoryEntries(BTreeMap<String, f64>);

impl CategoryEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: impl Into<String>, probability: f64) -> Self {
        self.set(category, probability);
        self
    }

    pub fn set(&mut self, category: impl Into<String>, probability: f64) {
        self.0.insert(category.into(), probability);
    }

    /// Probability for the category, zero when absent.
    pub fn probability(&self, category: &str) -> f64 {
        self.0.get(category).copied().unwrap_or(0.0)
    }

    pub fn most_likely(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .fold(None, |best: Option<(&str, f64)>, (name, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((name.as_str(), p)),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A span of the input text flagged as a probable location reference.
///
/// Identity is (start offset, surface value); the category distribution rides along.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Mention {
    pub start_offset: usize,
    pub value: String,
    #[serde(default, skip_serializing_if = "CategoryEntries::is_empty")]
    pub categories: CategoryEntries,
}

impl Mention {
    pub fn new(start_offset: usize, value: impl Into<String>) -> Self {
        Self {
            start_offset,
            value: value.into(),
            categories: CategoryEntries::default(),
        }
    }

    pub fn with_categories(mut self, categories: CategoryEntries) -> Self {
        self.categories = categories;
        self
    }

    pub fn end_offset(&self) -> usize {
        self.start_offset + self.value.len()
    }

    pub fn token_count(&self) -> usize {
        self.value.split_whitespace().count()
    }

    pub fn person_probability(&self) -> f64 {
        self.categories.probability(PERSON_CATEGORY)
    }
}

impl PartialEq for Mention {
    fn eq(&self, other: &Self) -> bool {
        self.start_offset == other.start_offset && self.value == other.value
    }
}

impl Eq for Mention {}

impl Hash for Mention {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start_offset.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'@{}", self.value, self.start_offset)
    }
}

// --- Output ---

/// A mention resolved to exactly one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocationAnnotation {
    pub mention: Mention,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl LocationAnnotation {
    pub fn new(mention: Mention, location: Location) -> Self {
        Self {
            mention,
            location,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}
