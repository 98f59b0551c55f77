//! Keyword-based error classification.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnalysisResult, HealthIssue, IssueType};
use crate::domain::ports::Analyzer;

struct Rule {
    issue_type: IssueType,
    keywords: &'static [&'static str],
    root_cause: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        issue_type: IssueType::Dependency,
        keywords: &[
            "cannot find module",
            "module not found",
            "no matching version",
            "unresolved import",
            "package not found",
            "peer dep",
        ],
        root_cause: "missing or incompatible dependency",
    },
    Rule {
        issue_type: IssueType::Syntax,
        keywords: &[
            "syntaxerror",
            "unexpected token",
            "parse error",
            "expected expression",
            "unterminated",
        ],
        root_cause: "malformed source code",
    },
    Rule {
        issue_type: IssueType::Config,
        keywords: &["config", "environment variable", "missing key", "invalid setting", ".env"],
        root_cause: "missing or invalid configuration",
    },
    Rule {
        issue_type: IssueType::Database,
        keywords: &["database", "sql", "deadlock", "relation does not exist", "migration"],
        root_cause: "database schema or connectivity problem",
    },
    Rule {
        issue_type: IssueType::Api,
        keywords: &[
            "status 5",
            "bad gateway",
            "404",
            "500",
            "endpoint",
            "rate limit",
            "too many requests",
        ],
        root_cause: "failing or throttled API endpoint",
    },
    Rule {
        issue_type: IssueType::Security,
        keywords: &["unauthorized", "forbidden", "credential", "api key", "vulnerab", "cve-"],
        root_cause: "credential or security policy violation",
    },
    Rule {
        issue_type: IssueType::Performance,
        keywords: &["timed out", "timeout", "out of memory", "oom", "slow", "latency"],
        root_cause: "resource exhaustion or slow operation",
    },
    Rule {
        issue_type: IssueType::Integration,
        keywords: &["connection refused", "econnrefused", "dns", "handshake", "unreachable"],
        root_cause: "unreachable downstream service",
    },
    Rule {
        issue_type: IssueType::Runtime,
        keywords: &[
            "panic",
            "exception",
            "null",
            "undefined is not",
            "segmentation fault",
            "stack overflow",
        ],
        root_cause: "unhandled runtime error",
    },
];

/// Classifies issues by matching keywords against their description, error
/// text, and stack trace.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// `(rule index, matched keyword count)` for every rule that matched,
    /// strongest first.
    fn matches(text: &str) -> Vec<(usize, usize)> {
        let lower = text.to_lowercase();
        let mut hits: Vec<(usize, usize)> = RULES
            .iter()
            .enumerate()
            .filter_map(|(idx, rule)| {
                let count = rule.keywords.iter().filter(|k| lower.contains(*k)).count();
                (count > 0).then_some((idx, count))
            })
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hits
    }
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn analyze(&self, issue: &HealthIssue) -> DomainResult<AnalysisResult> {
        let text = [
            Some(issue.description.as_str()),
            issue.error_text.as_deref(),
            issue.stack_trace.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");

        let hits = Self::matches(&text);
        let Some(&(best, strength)) = hits.first() else {
            return Ok(AnalysisResult {
                primary_type: issue.issue_type,
                severity: issue.severity,
                confidence: 0.4,
                root_causes: vec![format!("unclassified {} issue", issue.issue_type)],
                impact_notes: impact(issue),
            });
        };

        // A reported type that agrees with the text is stronger evidence.
        let mut primary = RULES[best].issue_type;
        if hits
            .iter()
            .any(|&(idx, count)| count == strength && RULES[idx].issue_type == issue.issue_type)
        {
            primary = issue.issue_type;
        }
        let agrees = primary == issue.issue_type;
        let confidence = (0.55 + 0.1 * strength as f64 + if agrees { 0.1 } else { 0.0 }).min(0.95);

        Ok(AnalysisResult {
            primary_type: primary,
            severity: issue.severity,
            confidence,
            root_causes: hits.iter().map(|&(idx, _)| RULES[idx].root_cause.to_string()).collect(),
            impact_notes: impact(issue),
        })
    }
}

fn impact(issue: &HealthIssue) -> String {
    let reach = if issue.occurrence_count > 1 {
        format!(", seen {} times", issue.occurrence_count)
    } else {
        String::new()
    };
    format!("severity {} at {}{reach}", issue.severity, issue.location)
}
