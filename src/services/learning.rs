//! Learning statistics aggregated across finished recovery sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::models::LearningRecord;

/// Per issue type outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueTypeStats {
    pub sessions: usize,
    pub successes: usize,
}

impl IssueTypeStats {
    pub fn success_rate(&self) -> f64 {
        if self.sessions == 0 {
            return 0.0;
        }
        self.successes as f64 / self.sessions as f64
    }
}

/// Rolling statistics over recovery outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_sessions: usize,
    pub successful_sessions: usize,
    pub failed_sessions: usize,
    pub success_rate: f64,
    /// Mean duration of successful sessions.
    pub mean_healing_ms: f64,
    /// Failed sessions by failure reason.
    pub failure_reasons: BTreeMap<String, usize>,
    /// Successful sessions by applied solution type.
    pub effective_solutions: BTreeMap<String, usize>,
    pub by_issue_type: BTreeMap<String, IssueTypeStats>,
    pub last_recorded: Option<DateTime<Utc>>,
}

impl LearningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build statistics from scratch.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a LearningRecord>,
    {
        let mut stats = Self::new();
        for record in records {
            stats.update(record);
        }
        stats
    }

    /// Fold one record into the running totals.
    pub fn update(&mut self, record: &LearningRecord) {
        self.total_sessions += 1;

        let by_type = self
            .by_issue_type
            .entry(record.issue_type.to_string())
            .or_default();
        by_type.sessions += 1;

        if record.success {
            self.successful_sessions += 1;
            by_type.successes += 1;

            let n = self.successful_sessions as f64;
            self.mean_healing_ms =
                (self.mean_healing_ms * (n - 1.0) + record.duration_ms as f64) / n;

            if let Some(solution_type) = record.solution_type {
                *self
                    .effective_solutions
                    .entry(solution_type.to_string())
                    .or_default() += 1;
            }
        } else {
            self.failed_sessions += 1;
            let reason = record
                .failure_reason
                .as_ref()
                .map_or("unknown", |r| r.category());
            *self.failure_reasons.entry(reason.to_string()).or_default() += 1;
        }

        self.success_rate = self.successful_sessions as f64 / self.total_sessions as f64;
        if self.last_recorded.map_or(true, |t| record.recorded_at > t) {
            self.last_recorded = Some(record.recorded_at);
        }
    }

    /// Solution type with the most successful sessions. Ties go to the
    /// alphabetically first type.
    pub fn most_effective_solution(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, &count) in &self.effective_solutions {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((name.as_str(), count));
            }
        }
        best
    }
}
