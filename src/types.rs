// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Core Types
 * Transport candidates, execution results, and candidate ranking
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Hard cap on the merged, ranked candidate list.
pub const MAX_RANKED_CANDIDATES: usize = 12;

/// Hard cap on candidates produced by a single source stage (static
/// analysis or assisted inference) before merging.
pub const MAX_STAGE_CANDIDATES: usize = 8;

/// Where a transport hypothesis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyType {
    Fetch,
    Axios,
    Xhr,
    Form,
    LlmAssist,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyType::Fetch => "fetch",
            StrategyType::Axios => "axios",
            StrategyType::Xhr => "xhr",
            StrategyType::Form => "form",
            StrategyType::LlmAssist => "llm-assist",
        };
        f.write_str(label)
    }
}

/// How the question payload travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    Json,
    Form,
    Query,
}

impl PayloadMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(PayloadMode::Json),
            "form" => Some(PayloadMode::Form),
            "query" => Some(PayloadMode::Query),
            _ => None,
        }
    }

    /// Default mode for a method when the source gave no usable hint.
    pub fn default_for_method(method: &str) -> Self {
        if method.eq_ignore_ascii_case("GET") {
            PayloadMode::Query
        } else {
            PayloadMode::Json
        }
    }
}

/// A hypothesized (endpoint, method, payload shape, field names) combination
/// for submitting a question to the target.
///
/// Confidence is a heuristic score used only for relative ranking, never a
/// calibrated probability. It is clamped to [0.05, 0.95] at creation; only a
/// real successful execution may promote it to >= 0.98.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportCandidate {
    pub strategy_type: StrategyType,
    pub source: String,
    pub endpoint: String,
    pub method: String,
    pub payload_mode: PayloadMode,
    pub question_key: String,
    pub purpose_key: Option<String>,
    pub source_snippet: String,
    pub confidence: f64,
}

impl TransportCandidate {
    /// Deduplication identity: two candidates proposing the same method,
    /// endpoint, and question field are the same hypothesis.
    pub fn identity(&self) -> String {
        format!("{}::{}::{}", self.method, self.endpoint, self.question_key)
    }
}

/// Clamp a heuristic confidence so no candidate is ever treated as certain
/// or impossible.
pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.05, 0.95)
}

/// Merge any number of candidate lists by identity, keeping the
/// highest-confidence version of each hypothesis, ranked descending and
/// capped at `MAX_RANKED_CANDIDATES`.
///
/// Pure function; also used to promote a proven winner (confidence >= 0.98)
/// ahead of the rest for subsequent questions.
pub fn merge_and_rank_candidates(lists: &[&[TransportCandidate]]) -> Vec<TransportCandidate> {
    let mut by_key: HashMap<String, TransportCandidate> = HashMap::new();

    for list in lists {
        for candidate in list.iter() {
            let key = candidate.identity();
            match by_key.get(&key) {
                Some(existing) if existing.confidence >= candidate.confidence => {}
                _ => {
                    by_key.insert(key, candidate.clone());
                }
            }
        }
    }

    let mut merged: Vec<TransportCandidate> = by_key.into_values().collect();
    merged.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    merged.truncate(MAX_RANKED_CANDIDATES);
    merged
}

/// Shape of a successfully parsed response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseKind {
    Json,
    Text,
    HtmlDocument,
    Empty,
}

/// Terminal classification of one strategy attempt or one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Ok,
    NonAnswerHtml,
    NonAnswerEmpty,
    Http(u16),
    NoStrategy,
    Failed,
}

impl ExecutionStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, ExecutionStatus::Ok)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Ok => f.write_str("ok"),
            ExecutionStatus::NonAnswerHtml => f.write_str("non-answer-html"),
            ExecutionStatus::NonAnswerEmpty => f.write_str("non-answer-empty"),
            ExecutionStatus::Http(code) => write!(f, "http-{code}"),
            ExecutionStatus::NoStrategy => f.write_str("no-strategy"),
            ExecutionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of one execution attempt. Produced fresh per attempt; never
/// mutated.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub answer: String,
    pub status: ExecutionStatus,
    /// Human-readable "METHOD /path" label of the attempt.
    pub method_label: String,
    pub confidence: f64,
    pub response_kind: Option<ResponseKind>,
    pub http_status: Option<u16>,
    /// Raw body preview kept for 422 payload-key repair.
    pub validation_source: Option<String>,
}

/// Summary counters for one analyzed page.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub inline_scripts: usize,
    pub external_scripts: usize,
    pub forms: usize,
    pub handlers: usize,
    pub candidates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(method: &str, endpoint: &str, key: &str, confidence: f64) -> TransportCandidate {
        TransportCandidate {
            strategy_type: StrategyType::Fetch,
            source: "inline-1".to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            payload_mode: PayloadMode::Json,
            question_key: key.to_string(),
            purpose_key: None,
            source_snippet: String::new(),
            confidence,
        }
    }

    #[test]
    fn clamp_keeps_confidence_in_heuristic_range() {
        assert_eq!(clamp_confidence(1.7), 0.95);
        assert_eq!(clamp_confidence(-0.4), 0.05);
        assert_eq!(clamp_confidence(0.5), 0.5);
    }

    #[test]
    fn merge_is_idempotent() {
        let list = vec![
            candidate("POST", "/api/chat", "question", 0.8),
            candidate("GET", "/search", "q", 0.4),
        ];

        let once = merge_and_rank_candidates(&[&list]);
        let twice = merge_and_rank_candidates(&[&once, &once]);

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.identity(), b.identity());
            assert_eq!(a.confidence, b.confidence);
        }
    }

    #[test]
    fn merge_keeps_highest_confidence_per_identity() {
        let weak = vec![candidate("POST", "/api/chat", "question", 0.4)];
        let strong = vec![candidate("POST", "/api/chat", "question", 0.9)];

        let merged = merge_and_rank_candidates(&[&weak, &strong]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
    }

    #[test]
    fn merge_caps_at_twelve() {
        let many: Vec<TransportCandidate> = (0..20)
            .map(|i| candidate("POST", &format!("/api/{i}"), "question", 0.5 + i as f64 * 0.01))
            .collect();

        let merged = merge_and_rank_candidates(&[&many]);
        assert_eq!(merged.len(), MAX_RANKED_CANDIDATES);
        // Ranked descending.
        for pair in merged.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn status_tags_render_as_strings() {
        assert_eq!(ExecutionStatus::Http(422).to_string(), "http-422");
        assert_eq!(ExecutionStatus::NonAnswerHtml.to_string(), "non-answer-html");
        assert_eq!(ExecutionStatus::NoStrategy.to_string(), "no-strategy");
    }
}
