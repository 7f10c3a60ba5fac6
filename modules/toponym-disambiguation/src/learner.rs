//! Training-data generation for the classifier strategies.
//!
//! The learner reruns tagging and gazetteer lookup over gold-annotated
//! documents, extracts features, and labels each candidate against the gold
//! annotations. Fitting the model is delegated to a [`ModelTrainer`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use toponym_common::{Location, LocationAnnotation, Result, ToponymError};

use crate::features::{ClassifiableLocation, FeatureExtractor};
use crate::traits::CandidateRetriever;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDocument {
    pub text: String,
    pub gold: Vec<LocationAnnotation>,
}

#[derive(Debug, Clone)]
pub struct TrainingInstance {
    pub classifiable: ClassifiableLocation,
    pub label: bool,
}

/// Fits a binary model on labeled feature vectors. The model is opaque here.
pub trait ModelTrainer {
    type Model;

    fn train(&self, instances: &[TrainingInstance]) -> Result<Self::Model>;
}

#[derive(Clone, TypedBuilder)]
pub struct DisambiguationLearner {
    retriever: Arc<dyn CandidateRetriever>,
    extractor: Arc<dyn FeatureExtractor>,
    /// A candidate farther than this from the gold location is a negative.
    #[builder(default = 50.0)]
    max_distance_km: f64,
}

impl DisambiguationLearner {
    /// Whether `candidate` matches one of the gold annotations: both located,
    /// closer than the maximum distance, sharing a name, of the same type.
    pub fn is_positive(&self, candidate: &Location, gold: &[LocationAnnotation]) -> bool {
        gold.iter().any(|annotation| {
            let expected = &annotation.location;
            candidate.has_coordinate()
                && expected.has_coordinate()
                && candidate.distance(expected) < self.max_distance_km
                && candidate.common_name(expected)
                && candidate.location_type == expected.location_type
        })
    }

    pub fn build_dataset(
        &self,
        documents: impl IntoIterator<Item = TrainingDocument>,
    ) -> Result<Vec<TrainingInstance>> {
        let mut instances = Vec::new();
        let mut document_count = 0usize;
        for document in documents {
            document_count += 1;
            let candidates = self.retriever.candidates(&document.text)?;
            for mention in self.extractor.extract(&document.text, &candidates)? {
                for classifiable in mention.instances {
                    let label = self.is_positive(&classifiable.location, &document.gold);
                    instances.push(TrainingInstance { classifiable, label });
                }
            }
            debug!(document = document_count, instances = instances.len(), "Processed training document");
        }
        let positives = instances.iter().filter(|i| i.label).count();
        info!(
            documents = document_count,
            instances = instances.len(),
            positives,
            negatives = instances.len() - positives,
            "Built training dataset"
        );
        Ok(instances)
    }

    pub fn learn<T: ModelTrainer>(
        &self,
        documents: impl IntoIterator<Item = TrainingDocument>,
        trainer: &T,
    ) -> Result<T::Model> {
        let instances = self.build_dataset(documents)?;
        if instances.is_empty() {
            return Err(ToponymError::Training("no training instances could be extracted".into()));
        }
        if instances.iter().all(|i| i.label) || instances.iter().all(|i| !i.label) {
            return Err(ToponymError::Training(
                "training data contains only one class".into(),
            ));
        }
        trainer.train(&instances)
    }
}
