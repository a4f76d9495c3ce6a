//! Job records owned by the `JobOrchestrator`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scrape_engine::{DedupStats, TargetSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Transitions only move forward: queued -> running -> {done | error}
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Error)
                | (Self::Running, Self::Done)
                | (Self::Running, Self::Error)
        )
    }
}

/// Counts and location recorded when a job finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub raw_count: usize,
    pub unique_count: usize,
    /// `None` when the run produced nothing to store
    pub output_location: Option<String>,
    /// Pre-merge audit dump, `None` when nothing was collected
    #[serde(default)]
    pub raw_location: Option<String>,
    pub dedup: DedupStats,
    pub targets: Vec<TargetSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub hashtags: Vec<String>,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    #[must_use]
    pub fn queued(id: String, hashtags: Vec<String>, limit: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            hashtags,
            limit,
            summary: None,
            error: None,
        }
    }

    /// Move to `next`, stamping times; refuses backward or repeated transitions
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        let now = Utc::now();
        if next == JobStatus::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = next;
        true
    }

    #[must_use]
    pub fn raw_count(&self) -> Option<usize> {
        self.summary.as_ref().map(|s| s.raw_count)
    }

    #[must_use]
    pub fn unique_count(&self) -> Option<usize> {
        self.summary.as_ref().map(|s| s.unique_count)
    }

    #[must_use]
    pub fn output_location(&self) -> Option<&str> {
        self.summary.as_ref().and_then(|s| s.output_location.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        let mut job = Job::queued("j".into(), vec!["a".into()], 100);
        assert!(!job.advance(JobStatus::Done));
        assert!(job.advance(JobStatus::Running));
        assert!(job.started_at.is_some());
        assert!(!job.advance(JobStatus::Queued));
        assert!(job.advance(JobStatus::Done));
        assert!(job.finished_at.is_some());
        assert!(!job.advance(JobStatus::Error));
        assert_eq!(job.status, JobStatus::Done);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&JobStatus::Running).expect("serialize");
        assert_eq!(json, "\"running\"");
    }
}
