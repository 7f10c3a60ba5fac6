//! Set algebra over groups of candidate locations.
//!
//! A [`LocationStats`] is an immutable view: every filter returns a new view,
//! the underlying locations are never touched. Hierarchy predicates compare
//! ancestor id lists only.

use std::collections::HashSet;

use toponym_common::{GeoCoordinate, Location, LocationId, LocationType, UNKNOWN_DISTANCE};

#[derive(Debug, Clone, Default)]
pub struct LocationStats<'a> {
    locations: Vec<&'a Location>,
}

impl<'a> LocationStats<'a> {
    /// Distinct locations (by id), first-seen order.
    pub fn new(locations: impl IntoIterator<Item = &'a Location>) -> Self {
        let mut seen: HashSet<LocationId> = HashSet::new();
        Self {
            locations: locations.into_iter().filter(|l| seen.insert(l.id)).collect(),
        }
    }

    pub fn filter(&self, predicate: impl Fn(&Location) -> bool) -> LocationStats<'a> {
        LocationStats {
            locations: self.locations.iter().copied().filter(|l| predicate(l)).collect(),
        }
    }

    /// Like [`filter`](Self::filter), but keeps the current view when nothing would survive.
    pub fn where_conditionally(&self, predicate: impl Fn(&Location) -> bool) -> LocationStats<'a> {
        let filtered = self.filter(predicate);
        if filtered.is_empty() {
            self.clone()
        } else {
            filtered
        }
    }

    pub fn count(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Sum of populations, unknown counted as zero.
    pub fn total_population(&self) -> u64 {
        self.locations
            .iter()
            .map(|l| l.population_or_zero())
            .fold(0u64, u64::saturating_add)
    }

    /// Maximum pairwise distance among members with a coordinate. Zero when
    /// fewer than two members have one.
    pub fn largest_distance(&self) -> f64 {
        let coords: Vec<GeoCoordinate> = self
            .locations
            .iter()
            .filter(|l| l.has_coordinate())
            .map(|l| l.coordinate_or_null())
            .collect();
        let mut largest = 0.0_f64;
        for (i, a) in coords.iter().enumerate() {
            for b in &coords[i + 1..] {
                largest = largest.max(a.distance(b));
            }
        }
        largest
    }

    /// Smallest distance from any member to `point`; [`UNKNOWN_DISTANCE`] when
    /// the point is NULL or no member has a coordinate.
    pub fn min_distance(&self, point: &GeoCoordinate) -> f64 {
        self.locations
            .iter()
            .map(|l| l.coordinate_or_null().distance(point))
            .fold(UNKNOWN_DISTANCE, f64::min)
    }

    /// Most populous member; the first one wins a tie.
    pub fn biggest(&self) -> Option<&'a Location> {
        self.locations.iter().copied().fold(None::<&'a Location>, |best, l| match best {
            Some(b) if b.population_or_zero() >= l.population_or_zero() => Some(b),
            _ => Some(l),
        })
    }

    pub fn first(&self) -> Option<&'a Location> {
        self.locations.first().copied()
    }

    pub fn highest_population(&self) -> u64 {
        self.biggest().map_or(0, |l| l.population_or_zero())
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.locations.iter().any(|l| l.id == location.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Location> + '_ {
        self.locations.iter().copied()
    }

    pub fn ids(&self) -> HashSet<LocationId> {
        self.locations.iter().map(|l| l.id).collect()
    }

    pub fn into_vec(self) -> Vec<&'a Location> {
        self.locations
    }
}

// --- Predicates ---

pub fn of_type(types: &[LocationType]) -> impl Fn(&Location) -> bool + '_ {
    move |l| types.contains(&l.location_type)
}

/// Population of at least `min` (unknown counts as zero).
pub fn min_population(min: u64) -> impl Fn(&Location) -> bool {
    move |l| l.population_or_zero() >= min
}

/// Within `km` of `center`. Never true for a NULL side.
pub fn radius(center: GeoCoordinate, km: f64) -> impl Fn(&Location) -> bool {
    move |l| l.coordinate_or_null().distance(&center) <= km
}

pub fn with_coordinate() -> impl Fn(&Location) -> bool {
    |l| l.has_coordinate()
}

/// Members that are an ancestor of `of`.
pub fn ancestor_of(of: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.ancestor_of(of)
}

/// Members that are a direct child of `of`.
pub fn child_of(of: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.child_of(of)
}

pub fn descendant_of(of: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.descendant_of(of)
}

pub fn parent_of(of: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.parent_of(of)
}

pub fn sibling_of(of: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.sibling_of(of)
}

pub fn equal(to: &Location) -> impl Fn(&Location) -> bool + '_ {
    move |l| l.id == to.id
}

pub fn in_set(ids: &HashSet<LocationId>) -> impl Fn(&Location) -> bool + '_ {
    move |l| ids.contains(&l.id)
}

pub fn not<P: Fn(&Location) -> bool>(predicate: P) -> impl Fn(&Location) -> bool {
    move |l| !predicate(l)
}

pub fn any_of<P: Fn(&Location) -> bool, Q: Fn(&Location) -> bool>(
    a: P,
    b: Q,
) -> impl Fn(&Location) -> bool {
    move |l| a(l) || b(l)
}
