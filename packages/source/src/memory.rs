//! In-memory [`SodaClient`].
//!
//! Serves fixed records per dataset id and honours `$limit`/`$offset`. The
//! `$where` and `$select` clauses are recorded but not evaluated, so the
//! records supplied should already match the query under test.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::SourceError;
use crate::socrata::{SodaClient, SodaQuery};

/// A [`SodaClient`] backed by fixed records.
#[derive(Default)]
pub struct MemoryClient {
    datasets: BTreeMap<String, Vec<serde_json::Value>>,
    errors: BTreeMap<String, (u16, String)>,
    queries: Mutex<Vec<(String, SodaQuery)>>,
}

impl MemoryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `records` for `dataset_id`.
    #[must_use]
    pub fn with_dataset(mut self, dataset_id: &str, records: Vec<serde_json::Value>) -> Self {
        self.datasets.insert(dataset_id.to_string(), records);
        self
    }

    /// Answers every query for `dataset_id` with a remote error.
    #[must_use]
    pub fn with_error(mut self, dataset_id: &str, status: u16, message: &str) -> Self {
        self.errors
            .insert(dataset_id.to_string(), (status, message.to_string()));
        self
    }

    /// Every query received so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, SodaQuery)> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SodaClient for MemoryClient {
    async fn query(
        &self,
        dataset_id: &str,
        query: &SodaQuery,
    ) -> Result<Vec<serde_json::Value>, SourceError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((dataset_id.to_string(), query.clone()));
        }

        if let Some((status, message)) = self.errors.get(dataset_id) {
            return Err(SourceError::Remote {
                status: *status,
                message: message.clone(),
            });
        }

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(self
            .datasets
            .get(dataset_id)
            .map(|records| records.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
