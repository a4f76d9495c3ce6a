//! Job orchestration for background scrape runs
//!
//! Provides async-safe job tracking. `submit` validates, records a queued job
//! and returns immediately; the run happens on a spawned task that is the
//! only writer of that job's record.

use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::types::{Job, JobStatus, JobSummary};
use crate::config::ScrapeConfig;
use crate::scrape_engine::{ScrapeError, ScrapeRunner};
use crate::storage::ItemSink;
use crate::utils::constants::{DEFAULT_JOB_RETENTION_SECS, MAX_LIMIT, MIN_LIMIT};
use crate::utils::normalize_hashtags;
use crate::window::WindowClock;

/// Initial capacity for the job table
const JOB_TABLE_INITIAL_CAPACITY: usize = 16;

/// How often the cleanup task sweeps terminal jobs
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

pub struct JobOrchestrator<R, W> {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
    runner: Arc<R>,
    sink: Arc<W>,
    clock: Arc<dyn WindowClock>,
    min_limit: usize,
    max_limit: usize,
    retention: Duration,
}

impl<R, W> Clone for JobOrchestrator<R, W> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
            runner: Arc::clone(&self.runner),
            sink: Arc::clone(&self.sink),
            clock: Arc::clone(&self.clock),
            min_limit: self.min_limit,
            max_limit: self.max_limit,
            retention: self.retention,
        }
    }
}

impl<R: ScrapeRunner, W: ItemSink> JobOrchestrator<R, W> {
    pub fn new(runner: R, sink: W, clock: Arc<dyn WindowClock>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::with_capacity(
                JOB_TABLE_INITIAL_CAPACITY,
            ))),
            runner: Arc::new(runner),
            sink: Arc::new(sink),
            clock,
            min_limit: MIN_LIMIT,
            max_limit: MAX_LIMIT,
            retention: Duration::from_secs(DEFAULT_JOB_RETENTION_SECS),
        }
    }

    /// Limits, retention and rolling window taken from `config`
    pub fn from_config(runner: R, sink: W, config: &ScrapeConfig) -> Self {
        Self::new(runner, sink, Arc::new(config.rolling_window()))
            .with_limit_range(config.min_limit(), config.max_limit())
            .with_retention(config.job_retention())
    }

    #[must_use]
    pub fn with_limit_range(mut self, min: usize, max: usize) -> Self {
        self.min_limit = min;
        self.max_limit = max;
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Validate, record a queued job and schedule its run
    ///
    /// Returns the job id without waiting for the run.
    pub async fn submit<I, S>(&self, hashtags: I, limit: usize) -> Result<String, ScrapeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hashtags = normalize_hashtags(hashtags);
        if hashtags.is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "at least one hashtag is required".to_string(),
            ));
        }
        if !(self.min_limit..=self.max_limit).contains(&limit) {
            return Err(ScrapeError::InvalidRequest(format!(
                "limit {limit} outside {}..={}",
                self.min_limit, self.max_limit
            )));
        }

        let job_id = Uuid::new_v4().simple().to_string();
        {
            let mut jobs = self.jobs.lock().await;
            jobs.insert(
                job_id.clone(),
                Job::queued(job_id.clone(), hashtags.clone(), limit),
            );
        }
        info!("Job {job_id} queued: {hashtags:?} limit {limit}");

        let this = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move { this.execute(id, hashtags, limit).await });

        Ok(job_id)
    }

    /// Snapshot of one job
    pub async fn status(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// Snapshots of every tracked job, oldest first
    pub async fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Poll until the job is terminal; `None` if it is unknown or evicted
    pub async fn wait(&self, job_id: &str, poll_interval: Duration) -> Option<Job> {
        loop {
            let job = self.status(job_id).await?;
            if job.status.is_terminal() {
                return Some(job);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn execute(&self, job_id: String, hashtags: Vec<String>, limit: usize) {
        if !self.transition(&job_id, JobStatus::Running).await {
            return;
        }
        let window = self.clock.current();
        debug!("Job {job_id} window {} .. {}", window.since, window.until);

        // A panic in the run surfaces as a JoinError here instead of a job stuck in `running`
        let runner = Arc::clone(&self.runner);
        let sink = Arc::clone(&self.sink);
        let id = job_id.clone();
        let run = tokio::spawn(async move {
            let outcome = runner.scrape(hashtags, window, limit).await?;
            let raw_location = sink.persist_raw(&id, &outcome.raw_items).await?;
            let output_location = sink.persist(&id, &outcome.items).await?;
            Ok::<_, ScrapeError>(JobSummary {
                raw_count: outcome.raw_count,
                unique_count: outcome.unique_count(),
                output_location,
                raw_location,
                dedup: outcome.dedup,
                targets: outcome.targets,
            })
        });

        let result = match run.await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("scrape task failed: {e}")),
        };
        self.finish(&job_id, result).await;
    }

    async fn transition(&self, job_id: &str, next: JobStatus) -> bool {
        let mut jobs = self.jobs.lock().await;
        jobs.get_mut(job_id).is_some_and(|job| job.advance(next))
    }

    async fn finish(&self, job_id: &str, result: Result<JobSummary, String>) {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return;
        };
        match result {
            Ok(summary) => {
                info!(
                    "Job {job_id} done: {} raw, {} unique",
                    summary.raw_count, summary.unique_count
                );
                job.summary = Some(summary);
                job.advance(JobStatus::Done);
            }
            Err(message) => {
                error!("Job {job_id} failed: {message}");
                job.error = Some(message);
                job.advance(JobStatus::Error);
            }
        }
    }

    /// Evict terminal jobs that finished longer ago than the retention period
    pub async fn cleanup_jobs(&self) -> usize {
        let now = chrono::Utc::now();
        let mut jobs = self.jobs.lock().await;
        let initial_count = jobs.len();

        jobs.retain(|job_id, job| {
            let finished = match (job.status.is_terminal(), job.finished_at) {
                (true, Some(at)) => at,
                _ => return true,
            };
            let age = now
                .signed_duration_since(finished)
                .to_std()
                .unwrap_or(Duration::ZERO);
            let keep = age < self.retention;
            if !keep {
                debug!("Evicting job {job_id}: {:?} (age: {age:?})", job.status);
            }
            keep
        });

        let cleaned = initial_count - jobs.len();
        if cleaned > 0 {
            debug!("Cleaned up {cleaned} job(s)");
        }
        cleaned
    }

    /// Start the background eviction task (call once after wrapping in `Arc`)
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_jobs().await;
            }
        })
    }
}
