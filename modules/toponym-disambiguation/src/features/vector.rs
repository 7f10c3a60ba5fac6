use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use toponym_common::Location;

/// One scalar column of a feature vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Numeric(f64),
    Nominal(String),
}

impl FeatureValue {
    /// Numeric view: booleans map to 0/1, nominal values have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FeatureValue::Numeric(n) => Some(*n),
            FeatureValue::Nominal(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Nominal(s) => Some(s),
            _ => None,
        }
    }
}

// Numeric values compare by bit pattern, so a NaN column equals itself.
impl PartialEq for FeatureValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FeatureValue::Bool(a), FeatureValue::Bool(b)) => a == b,
            (FeatureValue::Numeric(a), FeatureValue::Numeric(b)) => a.to_bits() == b.to_bits(),
            (FeatureValue::Nominal(a), FeatureValue::Nominal(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FeatureValue {}

impl Hash for FeatureValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FeatureValue::Bool(b) => b.hash(state),
            FeatureValue::Numeric(n) => n.to_bits().hash(state),
            FeatureValue::Nominal(s) => s.hash(state),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Bool(b) => write!(f, "{b}"),
            FeatureValue::Numeric(n) => write!(f, "{n}"),
            FeatureValue::Nominal(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Numeric(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Numeric(value as f64)
    }
}

impl From<u64> for FeatureValue {
    fn from(value: u64) -> Self {
        FeatureValue::Numeric(value as f64)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Nominal(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Nominal(value)
    }
}

/// Named scalar columns in insertion order. Names are stable across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FeatureValue::as_f64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FeatureVectorBuilder {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVectorBuilder {
    /// Set a column; setting an existing name replaces its value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    pub fn build(self) -> FeatureVector {
        FeatureVector {
            entries: self.entries,
        }
    }
}

/// A candidate together with the features computed for it in one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassifiableLocation {
    pub location: Location,
    pub features: FeatureVector,
}

impl ClassifiableLocation {
    pub fn new(location: Location, features: FeatureVector) -> Self {
        Self { location, features }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order_and_overwrites() {
        let mut builder = FeatureVector::builder();
        builder.set("numTokens", 2usize).set("acronym", false).set("caseSignature", "Aa");
        builder.set("numTokens", 3usize);
        let vector = builder.build();

        let names: Vec<&str> = vector.names().collect();
        assert_eq!(names, vec!["numTokens", "acronym", "caseSignature"]);
        assert_eq!(vector.numeric("numTokens"), Some(3.0));
        assert_eq!(vector.numeric("acronym"), Some(0.0));
        assert_eq!(vector.get("caseSignature").and_then(|v| v.as_str()), Some("Aa"));
        assert!(vector.numeric("caseSignature").is_none());
    }

    #[test]
    fn values_serialize_untagged() {
        let mut builder = FeatureVector::builder();
        builder.set("unique", true).set("population", 1500u64);
        let json = serde_json::to_value(builder.build()).unwrap();
        assert_eq!(json["entries"][0][1], serde_json::json!(true));
        assert_eq!(json["entries"][1][1], serde_json::json!(1500.0));
    }
}
