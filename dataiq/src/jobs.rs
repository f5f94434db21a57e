//! In-memory job registry: named, cancellable invocations of engine operations.
//!
//! At most one job runs per target (connection or table). Jobs whose source is unreachable
//! are retried with a linear backoff before they are marked failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::CatalogEngine;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Catalog sync of a connection.
    Sync,
    /// Score + issues for one table.
    Assess,
    /// Score + issues for every table of a connection.
    AssessConnection,
    /// Lineage discovery for a connection.
    Discover,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Sync => "sync",
            JobKind::Assess => "assess",
            JobKind::AssessConnection => "assess_connection",
            JobKind::Discover => "discover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub target_id: Uuid,
    pub status: JobStatus,
    pub attempts: u32,
    pub cancel: CancellationToken,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind, target_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            target_id,
            status: JobStatus::Running,
            attempts: 0,
            cancel: CancellationToken::new(),
            created_at: Utc::now(),
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.id,
            kind: self.kind,
            target_id: self.target_id,
            status: self.status,
            attempts: self.attempts,
            created_at: self.created_at,
            finished_at: self.finished_at,
            result: self.result.clone(),
            error: self.error.clone(),
        }
    }
}

/// Serializable snapshot of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub target_id: Uuid,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct JobStore {
    /// All jobs, running and finished.
    jobs: HashMap<Uuid, Job>,
    /// target_id → running job id.
    active: HashMap<Uuid, Uuid>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job`, or return the id of the job already running for its target.
    pub fn try_register(&mut self, job: Job) -> Result<Uuid, Uuid> {
        if let Some(existing) = self.active.get(&job.target_id)
            && self
                .jobs
                .get(existing)
                .is_some_and(|j| j.status == JobStatus::Running)
        {
            return Err(*existing);
        }

        let id = job.id;
        self.active.insert(job.target_id, id);
        self.jobs.insert(id, job);
        Ok(id)
    }

    pub fn get(&self, job_id: Uuid) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    fn finish(&mut self, job_id: Uuid, status: JobStatus) -> Option<&mut Job> {
        let job = self.jobs.get_mut(&job_id)?;
        if job.status != JobStatus::Running {
            return None;
        }
        job.status = status;
        job.finished_at = Some(Utc::now());
        if self.active.get(&job.target_id) == Some(&job_id) {
            self.active.remove(&job.target_id);
        }
        Some(job)
    }

    pub fn record_attempt(&mut self, job_id: Uuid) {
        if let Some(job) = self.jobs.get_mut(&job_id) {
            job.attempts += 1;
        }
    }

    pub fn complete(&mut self, job_id: Uuid, result: serde_json::Value) {
        if let Some(job) = self.finish(job_id, JobStatus::Completed) {
            job.result = Some(result);
        }
    }

    pub fn fail(&mut self, job_id: Uuid, error: String) {
        if let Some(job) = self.finish(job_id, JobStatus::Failed) {
            job.error = Some(error);
        }
    }

    /// Cancel a running job. Returns false if the job is unknown or already finished.
    pub fn cancel(&mut self, job_id: Uuid) -> bool {
        match self.finish(job_id, JobStatus::Cancelled) {
            Some(job) => {
                job.cancel.cancel();
                job.error = Some("cancelled".to_string());
                true
            }
            None => false,
        }
    }
}

/// Spawns engine operations as registered jobs.
#[derive(Clone)]
pub struct JobDispatcher {
    engine: CatalogEngine,
    store: Arc<Mutex<JobStore>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl JobDispatcher {
    pub fn new(engine: CatalogEngine) -> Self {
        Self {
            engine,
            store: Arc::new(Mutex::new(JobStore::new())),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn engine(&self) -> &CatalogEngine {
        &self.engine
    }

    /// Register and spawn a job. `Err` carries the id of the job already running for the
    /// same target.
    pub async fn submit(&self, kind: JobKind, target_id: Uuid) -> Result<Uuid, Uuid> {
        let job = Job::new(kind, target_id);
        let cancel = job.cancel.clone();
        let job_id = self.store.lock().await.try_register(job)?;

        info!(job_id = %job_id, kind = kind.as_str(), target_id = %target_id, "Job submitted");

        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run(job_id, kind, target_id, cancel).await;
        });
        Ok(job_id)
    }

    pub async fn status(&self, job_id: Uuid) -> Option<JobView> {
        self.store.lock().await.get(job_id).map(Job::view)
    }

    pub async fn cancel(&self, job_id: Uuid) -> bool {
        self.store.lock().await.cancel(job_id)
    }

    async fn run(&self, job_id: Uuid, kind: JobKind, target_id: Uuid, cancel: CancellationToken) {
        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            self.store.lock().await.record_attempt(job_id);

            match self.execute(kind, target_id, cancel.clone()).await {
                Err(EngineError::SourceUnavailable(msg)) if attempt < self.max_attempts => {
                    warn!(job_id = %job_id, attempt, error = %msg, "Source unavailable, retrying");
                    let cancelled = tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay * attempt) => false,
                        _ = cancel.cancelled() => true,
                    };
                    if cancelled {
                        break Err(EngineError::Cancelled);
                    }
                }
                other => break other,
            }
        };

        let mut store = self.store.lock().await;
        match outcome {
            Ok(result) => {
                info!(job_id = %job_id, kind = kind.as_str(), "Job completed");
                store.complete(job_id, result);
            }
            // cancel() already recorded the terminal state
            Err(_) if cancel.is_cancelled() => {}
            Err(e) => {
                warn!(job_id = %job_id, kind = kind.as_str(), error = %e, "Job failed");
                store.fail(job_id, e.to_string());
            }
        }
    }

    async fn execute(
        &self,
        kind: JobKind,
        target_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<serde_json::Value, EngineError> {
        let value = match kind {
            JobKind::Sync => serde_json::to_value(self.engine.sync_catalog(target_id, cancel).await?)?,
            JobKind::Assess => serde_json::to_value(self.engine.assess(target_id, cancel).await?)?,
            JobKind::AssessConnection => {
                serde_json::to_value(self.engine.assess_connection(target_id, cancel).await?)?
            }
            JobKind::Discover => {
                let outcome = self.engine.discover_relationships(target_id, cancel).await?;
                serde_json::json!({
                    "connection_id": outcome.connection_id,
                    "relationships_found": outcome.edges.len(),
                    "inserted": outcome.inserted,
                })
            }
        };
        Ok(value)
    }
}
