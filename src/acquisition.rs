// 📡 Acquisition Service - Two-phase catalog fetch
//
// Phase 1: one request for the index window (limit/offset)
// Phase 2: one concurrent request per index entry to resolve the full record
//
// Aggregation decides what a single failed entry does to the batch.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Aggregation, PokedexConfig};
use crate::error::FetchError;
use crate::model::{CatalogEntry, CatalogPage, PageRequest, Record};
use crate::store::{RecordStore, RefreshOutcome, RefreshStart, RefreshTicket};

// ============================================================================
// RECORD SOURCE
// ============================================================================

/// Where index pages and records come from
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_index(&self, page: PageRequest) -> Result<CatalogPage, FetchError>;

    async fn fetch_record(&self, entry: &CatalogEntry) -> Result<Record, FetchError>;
}

/// PokeAPI over HTTP
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    catalog_endpoint: String,
}

impl HttpSource {
    pub fn new(catalog_endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("pokedex/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        HttpSource {
            client: builder.build().unwrap_or_default(),
            catalog_endpoint: catalog_endpoint.into(),
        }
    }

    pub fn from_config(config: &PokedexConfig) -> Self {
        Self::new(
            config.api.catalog_endpoint.clone(),
            config.api.request_timeout(),
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn fetch_index(&self, page: PageRequest) -> Result<CatalogPage, FetchError> {
        let request = self
            .client
            .get(&self.catalog_endpoint)
            .query(&[("limit", page.limit), ("offset", page.offset)]);

        self.get_json(request, &self.catalog_endpoint).await
    }

    async fn fetch_record(&self, entry: &CatalogEntry) -> Result<Record, FetchError> {
        let request = self.client.get(&entry.url);
        self.get_json(request, &entry.url).await
    }
}

// ============================================================================
// BATCH OUTCOME
// ============================================================================

/// An index entry that could not be resolved
#[derive(Debug)]
pub struct EntryFailure {
    pub name: String,
    pub url: String,
    pub error: FetchError,
}

/// Result of one acquisition pass, records in index order
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<Record>,
    pub failures: Vec<EntryFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// Fail-fast view: any failure turns the whole batch into an error
    pub fn into_complete(self) -> Result<BatchOutcome, FetchError> {
        let total = self.requested();
        let failed = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(BatchOutcome {
                records: self.records,
                failures: Vec::new(),
            }),
            Some(first) => Err(FetchError::Batch {
                failed,
                total,
                first: Box::new(first.error),
            }),
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct AcquisitionService {
    source: Arc<dyn RecordSource>,
    page: PageRequest,
    aggregation: Aggregation,
}

impl AcquisitionService {
    pub fn new(source: Arc<dyn RecordSource>, page: PageRequest, aggregation: Aggregation) -> Self {
        AcquisitionService {
            source,
            page,
            aggregation,
        }
    }

    /// HTTP-backed service configured from `config`
    pub fn from_config(config: &PokedexConfig) -> Self {
        Self::new(
            Arc::new(HttpSource::from_config(config)),
            config.api.page(),
            config.acquisition.aggregation,
        )
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Fetch the index, then resolve every entry concurrently
    pub async fn fetch_batch(&self) -> Result<BatchOutcome, FetchError> {
        let index = self.source.fetch_index(self.page).await?;
        let total = index.results.len();
        info!(
            entries = total,
            limit = self.page.limit,
            offset = self.page.offset,
            "catalog index fetched"
        );

        let outcome = self.resolve_entries(index.results).await;
        match self.aggregation {
            Aggregation::BestEffort => Ok(outcome),
            Aggregation::FailFast => outcome.into_complete(),
        }
    }

    /// All records, or the first error
    pub async fn fetch_all(&self) -> Result<Vec<Record>, FetchError> {
        self.fetch_batch().await.map(|outcome| outcome.records)
    }

    /// Run one refresh against `store`, honoring its overlap policy.
    ///
    /// Errors are logged and swallowed; the store keeps its previous records.
    pub async fn refresh(&self, store: &Mutex<RecordStore>) -> RefreshOutcome {
        let start = lock(store).begin_refresh();
        let ticket = match start {
            RefreshStart::Started(ticket) => ticket,
            RefreshStart::Skipped { in_flight } => {
                warn!(in_flight, "refresh already in flight, skipping");
                return RefreshOutcome::Skipped;
            }
        };

        self.run_refresh(store, ticket).await
    }

    /// Fetch for an already started refresh and hand the result to the store
    pub async fn run_refresh(&self, store: &Mutex<RecordStore>, ticket: RefreshTicket) -> RefreshOutcome {
        info!(generation = ticket.generation(), "refresh started");
        let result = self.fetch_batch().await;
        lock(store).finish(ticket, result)
    }

    /// Launch every lookup at once and wait for all of them to settle
    async fn resolve_entries(&self, entries: Vec<CatalogEntry>) -> BatchOutcome {
        let results = join_all(entries.iter().map(|entry| self.resolve(entry))).await;

        let mut outcome = BatchOutcome::default();
        for (entry, result) in entries.into_iter().zip(results) {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(error) => {
                    warn!(name = %entry.name, %error, "catalog entry failed to resolve");
                    outcome.failures.push(EntryFailure {
                        name: entry.name,
                        url: entry.url,
                        error,
                    });
                }
            }
        }
        outcome
    }

    async fn resolve(&self, entry: &CatalogEntry) -> Result<Record, FetchError> {
        let record = self.source.fetch_record(entry).await?;
        debug!(id = record.id, name = %record.name, "record resolved");
        Ok(record)
    }
}

/// Lock the store, recovering from a poisoned mutex
pub fn lock(store: &Mutex<RecordStore>) -> std::sync::MutexGuard<'_, RecordStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::OverlapPolicy;
    use std::collections::HashSet;
    use tokio::sync::Notify;

    /// In-memory source: `count` entries, ids 1..=count, with optional failures
    pub(crate) struct FakeSource {
        pub count: u32,
        pub fail_index: bool,
        pub fail_ids: HashSet<u32>,
        pub gate: Option<Arc<Notify>>,
    }

    impl FakeSource {
        pub fn new(count: u32) -> Self {
            FakeSource {
                count,
                fail_index: false,
                fail_ids: HashSet::new(),
                gate: None,
            }
        }
    }

    fn status(url: &str, status: u16) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status,
        }
    }

    #[async_trait]
    impl RecordSource for FakeSource {
        async fn fetch_index(&self, page: PageRequest) -> Result<CatalogPage, FetchError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_index {
                return Err(status("fake://index", 503));
            }
            let results = (1..=self.count)
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .map(|id| CatalogEntry {
                    name: format!("creature-{id}"),
                    url: format!("fake://record/{id}"),
                })
                .collect();
            Ok(CatalogPage {
                count: Some(self.count as u64),
                results,
            })
        }

        async fn fetch_record(&self, entry: &CatalogEntry) -> Result<Record, FetchError> {
            let id: u32 = entry
                .url
                .rsplit('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if self.fail_ids.contains(&id) {
                return Err(status(&entry.url, 500));
            }
            Ok(Record::sample(id, &entry.name, &["normal"], &[id as i64]))
        }
    }

    fn service(source: FakeSource, aggregation: Aggregation) -> AcquisitionService {
        AcquisitionService::new(Arc::new(source), PageRequest::default(), aggregation)
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_index_order() {
        let service = service(FakeSource::new(151), Aggregation::FailFast);

        let records = service.fetch_all().await.unwrap();

        assert_eq!(records.len(), 151);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=151).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_page_window_is_respected() {
        let service = AcquisitionService::new(
            Arc::new(FakeSource::new(300)),
            PageRequest {
                limit: 10,
                offset: 151,
            },
            Aggregation::FailFast,
        );

        let records = service.fetch_all().await.unwrap();

        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, 152);
    }

    #[tokio::test]
    async fn test_fail_fast_discards_whole_batch() {
        let mut source = FakeSource::new(20);
        source.fail_ids.insert(7);
        let service = service(source, Aggregation::FailFast);

        let err = service.fetch_all().await.unwrap_err();

        match err {
            FetchError::Batch { total, first, .. } => {
                assert_eq!(total, 20);
                assert_eq!(first.url(), Some("fake://record/7"));
            }
            other => panic!("expected batch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_best_effort_keeps_successes() {
        let mut source = FakeSource::new(20);
        source.fail_ids.insert(7);
        source.fail_ids.insert(13);
        let service = service(source, Aggregation::BestEffort);

        let outcome = service.fetch_batch().await.unwrap();

        assert_eq!(outcome.records.len(), 18);
        assert_eq!(outcome.requested(), 20);
        assert!(!outcome.is_complete());
        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["creature-7", "creature-13"]);
        assert!(outcome.records.iter().all(|r| r.id != 7 && r.id != 13));
    }

    #[tokio::test]
    async fn test_index_failure_is_error_in_both_modes() {
        for aggregation in [Aggregation::FailFast, Aggregation::BestEffort] {
            let mut source = FakeSource::new(5);
            source.fail_index = true;
            let err = service(source, aggregation).fetch_batch().await.unwrap_err();
            assert!(matches!(err, FetchError::Status { status: 503, .. }));
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_records() {
        let store = Mutex::new(RecordStore::new(OverlapPolicy::Ignore));

        let ok = service(FakeSource::new(3), Aggregation::FailFast);
        assert!(matches!(
            ok.refresh(&store).await,
            RefreshOutcome::Applied { loaded: 3, .. }
        ));

        let mut failing = FakeSource::new(3);
        failing.fail_index = true;
        let failing = service(failing, Aggregation::FailFast);
        assert!(matches!(failing.refresh(&store).await, RefreshOutcome::Failed { .. }));

        let store = lock(&store);
        assert_eq!(store.records().len(), 3);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_skipped() {
        let gate = Arc::new(Notify::new());
        let mut source = FakeSource::new(4);
        source.gate = Some(gate.clone());
        let service = Arc::new(service(source, Aggregation::FailFast));
        let store = Arc::new(Mutex::new(RecordStore::new(OverlapPolicy::Ignore)));

        let first = {
            let service = service.clone();
            let store = store.clone();
            tokio::spawn(async move { service.refresh(&store).await })
        };

        // Wait for the first refresh to mark the store as loading
        while !lock(&store).is_loading() {
            tokio::task::yield_now().await;
        }

        assert_eq!(service.refresh(&store).await, RefreshOutcome::Skipped);

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(matches!(first, RefreshOutcome::Applied { loaded: 4, .. }));
        assert!(!lock(&store).is_loading());
    }
}
