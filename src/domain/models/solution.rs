//! Analysis results and candidate solutions exchanged with the recovery
//! collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::health::IssueType;

/// Structured output of an analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub primary_type: IssueType,
    pub severity: u8,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    pub root_causes: Vec<String>,
    #[serde(default)]
    pub impact_notes: String,
}

impl AnalysisResult {
    /// Low-confidence result used when the analyzer itself fails.
    pub fn fallback(primary_type: IssueType, severity: u8) -> Self {
        Self {
            primary_type,
            severity,
            confidence: 0.1,
            root_causes: vec!["analysis unavailable".to_string()],
            impact_notes: String::new(),
        }
    }
}

/// Kind of remediation a solution performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolutionType {
    CodePatch,
    DependencyFix,
    ConfigurationFix,
    Restart,
    Rollback,
    ResourceTuning,
    SecurityPatch,
    Retry,
}

impl SolutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodePatch => "code_patch",
            Self::DependencyFix => "dependency_fix",
            Self::ConfigurationFix => "configuration_fix",
            Self::Restart => "restart",
            Self::Rollback => "rollback",
            Self::ResourceTuning => "resource_tuning",
            Self::SecurityPatch => "security_patch",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate fix proposed by a solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub id: Uuid,
    pub solution_type: SolutionType,
    pub description: String,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Relative complexity from 1 (trivial) to 10.
    pub complexity: u8,
    pub estimated_minutes: u32,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub rollback_steps: Vec<String>,
    #[serde(default)]
    pub verification_steps: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

impl Solution {
    pub fn new(
        solution_type: SolutionType,
        description: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            solution_type,
            description: description.into(),
            confidence: confidence.clamp(0.0, 1.0),
            complexity: 1,
            estimated_minutes: 5,
            targets: Vec::new(),
            steps: Vec::new(),
            rollback_steps: Vec::new(),
            verification_steps: Vec::new(),
            risks: Vec::new(),
        }
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity.clamp(1, 10);
        self
    }

    pub fn with_estimate_minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rollback<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rollback_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_verification<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verification_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risks.push(risk.into());
        self
    }
}

/// Pick the highest-confidence solution. Earlier entries win ties.
pub fn best_solution(solutions: &[Solution]) -> Option<&Solution> {
    solutions.iter().reduce(|best, candidate| {
        if candidate.confidence > best.confidence {
            candidate
        } else {
            best
        }
    })
}

/// Outcome reported by an implementer or validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
