// 🗃️ Record Store - In-memory record set + loading flag
//
// Every refresh gets a generation number. Only the newest generation may
// replace the records or clear the loading flag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::acquisition::BatchOutcome;
use crate::config::OverlapPolicy;
use crate::error::FetchError;
use crate::model::Record;

/// Handle for one in-flight refresh
#[derive(Debug)]
#[must_use = "a started refresh must be finished"]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub enum RefreshStart {
    Started(RefreshTicket),
    Skipped { in_flight: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Records replaced; `failed` counts best-effort entries left out
    Applied {
        generation: u64,
        loaded: usize,
        failed: usize,
    },

    /// Fetch failed; previous records kept
    Failed { generation: u64, error: String },

    /// A newer refresh started meanwhile; result dropped
    Stale { generation: u64 },

    /// Another refresh was in flight and the policy is `Ignore`
    Skipped,
}

/// What the last completed refresh did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub generation: u64,
    pub finished_at: DateTime<Utc>,
    pub loaded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct RecordStore {
    records: Vec<Record>,
    policy: OverlapPolicy,
    generation: u64,
    in_flight: bool,
    last_refresh: Option<RefreshSummary>,
}

impl RecordStore {
    pub fn new(policy: OverlapPolicy) -> Self {
        RecordStore {
            records: Vec::new(),
            policy,
            generation: 0,
            in_flight: false,
            last_refresh: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn last_refresh(&self) -> Option<&RefreshSummary> {
        self.last_refresh.as_ref()
    }

    pub fn begin_refresh(&mut self) -> RefreshStart {
        if self.in_flight && self.policy == OverlapPolicy::Ignore {
            return RefreshStart::Skipped {
                in_flight: self.generation,
            };
        }

        self.generation += 1;
        self.in_flight = true;
        RefreshStart::Started(RefreshTicket {
            generation: self.generation,
        })
    }

    pub fn finish(
        &mut self,
        ticket: RefreshTicket,
        result: Result<BatchOutcome, FetchError>,
    ) -> RefreshOutcome {
        let generation = ticket.generation;
        if generation != self.generation {
            warn!(generation, current = self.generation, "discarding stale refresh result");
            return RefreshOutcome::Stale { generation };
        }

        self.in_flight = false;
        let finished_at = Utc::now();

        match result {
            Ok(outcome) => {
                let loaded = outcome.records.len();
                let failed = outcome.failures.len();
                self.records = outcome.records;
                info!(generation, loaded, failed, "refresh applied");

                self.last_refresh = Some(RefreshSummary {
                    generation,
                    finished_at,
                    loaded,
                    failed,
                    error: None,
                });
                RefreshOutcome::Applied {
                    generation,
                    loaded,
                    failed,
                }
            }
            Err(err) => {
                error!(generation, error = %err, "refresh failed, keeping previous records");

                let message = err.to_string();
                self.last_refresh = Some(RefreshSummary {
                    generation,
                    finished_at,
                    loaded: 0,
                    failed: match &err {
                        FetchError::Batch { failed, .. } => *failed,
                        _ => 0,
                    },
                    error: Some(message.clone()),
                });
                RefreshOutcome::Failed {
                    generation,
                    error: message,
                }
            }
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(OverlapPolicy::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
