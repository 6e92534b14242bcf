use anyhow::Result;
use serde_json::Value;

use crate::gbif::{Section, segment};

/// Lookups of individual occurrence records.
///
/// Some of these endpoints answer in plain text when nothing is found; such
/// bodies come back as `{"Error": "<text>"}` instead of failing.
pub struct SingleOccurrence {
    pub(crate) section: Section,
}

impl SingleOccurrence {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    pub async fn get(&self, gbif_id: u64) -> Result<Value> {
        self.lookup(&format!("/{}", gbif_id)).await
    }

    pub async fn get_verbatim(&self, gbif_id: u64) -> Result<Value> {
        self.lookup(&format!("/{}/verbatim", gbif_id)).await
    }

    /// The record exactly as it was crawled from the publisher.
    pub async fn get_fragment(&self, gbif_id: u64) -> Result<Value> {
        self.lookup(&format!("/{}/fragment", gbif_id)).await
    }

    pub async fn get_by_dataset(&self, dataset_key: &str, occurrence_id: &str) -> Result<Value> {
        self.lookup(&format!("/{}/{}", segment(dataset_key), segment(occurrence_id)))
            .await
    }

    async fn lookup(&self, resource: &str) -> Result<Value> {
        let record = self
            .section
            .client
            .fetch_or_fallback_to_raw(&self.section.base_url, &self.section.endpoint, resource)
            .await?;
        Ok(record)
    }
}
