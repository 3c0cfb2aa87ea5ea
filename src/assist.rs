// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Assisted Strategy Inference
 * Asks an OpenAI-compatible model for transport strategies when static
 * evidence is weak, then defensively sanitizes the reply
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::analyzer::{is_likely_static_or_shell_endpoint, Analysis};
use crate::collector::PageArtifacts;
use crate::config::RuntimeConfig;
use crate::errors::AssistError;
use crate::llm::{ChatMessage, OpenAiCompatClient};
use crate::progress::{phase, ProgressObserver};
use crate::types::{PayloadMode, StrategyType, TransportCandidate, MAX_STAGE_CANDIDATES};

const ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];
const MAX_EVIDENCE_FORMS: usize = 10;
const MAX_EVIDENCE_HANDLERS: usize = 10;
const MAX_EVIDENCE_SNIPPETS: usize = 30;

/// Minimum top-candidate confidence below which static evidence alone is
/// not trusted.
const ASSIST_CONFIDENCE_THRESHOLD: f64 = 0.72;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NETWORK_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(fetch\s*\([^)]{0,280}\)|axios\.[a-z]+\s*\([^)]{0,280}\)|\.open\s*\([^)]{0,280}\))")
        .unwrap()
});
static KEY_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

const SYSTEM_DIRECTIVE: &str = concat!(
    "You are a web app reverse engineering assistant. ",
    "Infer likely HTTP request strategies used to send chat/user questions. ",
    "Return strict JSON only. ",
    "Schema: {\"strategies\":[{\"endpoint\":string,\"method\":\"GET\"|\"POST\"|\"PUT\"|\"PATCH\"|\"DELETE\",",
    "\"payloadMode\":\"json\"|\"form\"|\"query\",\"questionKey\":string,\"purposeKey\":string,",
    "\"confidence\":number,\"rationale\":string}]} ",
    "Prefer API-like endpoints over static/html pages."
);

/// Decide whether static evidence is weak enough to ask the model.
///
/// Assist is requested when there are no static candidates, the top
/// candidate is below the confidence threshold, the top endpoint looks like
/// the page's own shell, or every candidate is a plain GET form submission
/// (the weakest possible signal for a chat API).
pub fn should_use_assisted_inference(analysis: &Analysis, target_url: &str) -> bool {
    let candidates = &analysis.candidate_transports;
    let Some(top) = candidates.first() else {
        return true;
    };

    if top.confidence < ASSIST_CONFIDENCE_THRESHOLD {
        return true;
    }

    if is_likely_static_or_shell_endpoint(&top.endpoint, target_url) {
        return true;
    }

    candidates
        .iter()
        .all(|c| c.strategy_type == StrategyType::Form && c.method == "GET")
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnippet {
    pub source: String,
    pub snippet: String,
}

/// Compact network-call snippets pulled independently of the full matcher
/// pass, bounded for prompt size.
fn extract_network_snippets(artifacts: &PageArtifacts) -> Vec<NetworkSnippet> {
    let mut snippets = Vec::new();

    for script in &artifacts.combined_scripts {
        let compact = WHITESPACE_RE.replace_all(&script.code, " ");
        for caps in NETWORK_CALL_RE.captures_iter(&compact) {
            snippets.push(NetworkSnippet {
                source: script.source.clone(),
                snippet: caps[0].to_string(),
            });

            if snippets.len() >= MAX_EVIDENCE_SNIPPETS {
                return snippets;
            }
        }
    }

    snippets
}

fn build_prompt_payload(
    target_url: &str,
    application_purpose: &str,
    artifacts: &PageArtifacts,
    analysis: &Analysis,
) -> String {
    let payload = serde_json::json!({
        "targetUrl": target_url,
        "applicationPurpose": application_purpose,
        "buttonHandlers": artifacts
            .button_handlers
            .iter()
            .take(MAX_EVIDENCE_HANDLERS)
            .collect::<Vec<_>>(),
        "forms": artifacts.forms.iter().take(MAX_EVIDENCE_FORMS).collect::<Vec<_>>(),
        "staticCandidates": analysis
            .candidate_transports
            .iter()
            .take(MAX_STAGE_CANDIDATES)
            .collect::<Vec<_>>(),
        "networkSnippets": extract_network_snippets(artifacts),
    });

    serde_json::to_string_pretty(&payload).unwrap_or_default()
}

/// Keep only `[A-Za-z0-9_]`; fall back when nothing survives.
fn sanitize_key(value: Option<&Value>, fallback: &str) -> String {
    let raw = value.and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
    let cleaned = KEY_CHARS_RE.replace_all(&raw, "").to_string();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Validate and coerce model-proposed strategies into the candidate shape.
/// Every field is individually defended; the model's output is never
/// trusted as-is.
fn normalize_strategies(raw_strategies: Option<&Value>, target_url: &str) -> Vec<TransportCandidate> {
    let Some(items) = raw_strategies.and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut normalized = Vec::new();
    for raw in items {
        let endpoint = raw["endpoint"].as_str().unwrap_or("").trim().to_string();
        if endpoint.is_empty() {
            continue;
        }

        let method = raw["method"].as_str().unwrap_or("POST").to_ascii_uppercase();
        let method = if ALLOWED_METHODS.contains(&method.as_str()) {
            method
        } else {
            "POST".to_string()
        };

        let payload_mode = raw["payloadMode"]
            .as_str()
            .and_then(PayloadMode::parse)
            .unwrap_or_else(|| PayloadMode::default_for_method(&method));

        let mut confidence = raw["confidence"].as_f64().filter(|c| c.is_finite()).unwrap_or(0.7);
        if is_likely_static_or_shell_endpoint(&endpoint, target_url) {
            confidence -= 0.2;
        }

        normalized.push(TransportCandidate {
            strategy_type: StrategyType::LlmAssist,
            source: "openai-compatible-assist".to_string(),
            endpoint,
            method,
            payload_mode,
            question_key: sanitize_key(raw.get("questionKey"), "question"),
            purpose_key: Some(sanitize_key(raw.get("purposeKey"), "purpose")),
            source_snippet: raw["rationale"]
                .as_str()
                .unwrap_or("LLM-assisted transport inference")
                .to_string(),
            confidence: confidence.clamp(0.1, 0.95),
        });
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<TransportCandidate> = normalized
        .into_iter()
        .filter(|candidate| seen.insert(candidate.identity()))
        .collect();
    deduped.truncate(MAX_STAGE_CANDIDATES);
    deduped
}

/// One assisted inference round: bounded evidence payload in, sanitized
/// candidate list out.
pub async fn request_assisted_strategies(
    client: &OpenAiCompatClient,
    config: &RuntimeConfig,
    target_url: &str,
    application_purpose: &str,
    artifacts: &PageArtifacts,
    analysis: &Analysis,
    progress: &dyn ProgressObserver,
) -> Result<Vec<TransportCandidate>, AssistError> {
    if !config.is_complete() {
        return Err(AssistError::MissingConfig);
    }

    let user_payload = build_prompt_payload(target_url, application_purpose, artifacts, analysis);
    phase(
        progress,
        "Running OpenAI-compatible assisted inference for transport strategy...",
    );

    let messages = [
        ChatMessage::system(SYSTEM_DIRECTIVE),
        ChatMessage::user(user_payload),
    ];

    let data = client.request_json(config, &messages).await?;
    let strategies = normalize_strategies(data.get("strategies"), target_url);
    debug!(strategies = strategies.len(), "Assisted inference reply normalized");

    if strategies.is_empty() {
        return Err(AssistError::NoStrategies);
    }

    Ok(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ScriptSource;
    use crate::types::AnalysisSummary;

    fn analysis_with(candidates: Vec<TransportCandidate>) -> Analysis {
        Analysis {
            button_handlers: Vec::new(),
            summary: AnalysisSummary::default(),
            candidate_transports: candidates,
        }
    }

    fn candidate(
        strategy_type: StrategyType,
        method: &str,
        endpoint: &str,
        confidence: f64,
    ) -> TransportCandidate {
        TransportCandidate {
            strategy_type,
            source: "test".to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            payload_mode: PayloadMode::default_for_method(method),
            question_key: "question".to_string(),
            purpose_key: None,
            source_snippet: String::new(),
            confidence,
        }
    }

    #[test]
    fn assist_triggers_on_empty_candidates() {
        assert!(should_use_assisted_inference(
            &analysis_with(Vec::new()),
            "https://a.com/"
        ));
    }

    #[test]
    fn assist_triggers_below_confidence_threshold() {
        let analysis = analysis_with(vec![candidate(
            StrategyType::Fetch,
            "POST",
            "/api/chat",
            0.55,
        )]);
        assert!(should_use_assisted_inference(&analysis, "https://a.com/"));
    }

    #[test]
    fn assist_triggers_on_shell_top_candidate() {
        let analysis = analysis_with(vec![candidate(StrategyType::Fetch, "POST", "/", 0.9)]);
        assert!(should_use_assisted_inference(&analysis, "https://a.com/"));
    }

    #[test]
    fn assist_triggers_when_all_candidates_are_get_forms() {
        let analysis = analysis_with(vec![candidate(StrategyType::Form, "GET", "/search", 0.8)]);
        assert!(should_use_assisted_inference(&analysis, "https://a.com/"));
    }

    #[test]
    fn assist_skipped_for_strong_api_candidate() {
        let analysis = analysis_with(vec![candidate(
            StrategyType::Fetch,
            "POST",
            "/api/chat",
            0.85,
        )]);
        assert!(!should_use_assisted_inference(&analysis, "https://a.com/"));
    }

    #[test]
    fn normalization_defends_every_field() {
        let raw = serde_json::json!([
            {
                "endpoint": "/api/ask",
                "method": "TRACE",
                "payloadMode": "yaml",
                "questionKey": "user question!",
                "purposeKey": "",
                "confidence": 7.5,
            },
            {"endpoint": "", "method": "POST"},
            {"endpoint": "/index.html", "method": "POST", "confidence": 0.6},
        ]);

        let strategies = normalize_strategies(Some(&raw), "https://a.com/");
        assert_eq!(strategies.len(), 2);

        let first = &strategies[0];
        assert_eq!(first.method, "POST");
        assert_eq!(first.payload_mode, PayloadMode::Json);
        assert_eq!(first.question_key, "userquestion");
        assert_eq!(first.purpose_key.as_deref(), Some("purpose"));
        assert_eq!(first.confidence, 0.95);

        // Static/shell endpoint takes the 0.2 penalty.
        let shell = &strategies[1];
        assert!((shell.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn normalization_dedupes_and_caps() {
        let mut items = Vec::new();
        for i in 0..12 {
            items.push(serde_json::json!({"endpoint": format!("/api/{i}"), "method": "POST"}));
        }
        items.push(serde_json::json!({"endpoint": "/api/0", "method": "POST"}));

        let strategies = normalize_strategies(Some(&Value::Array(items)), "https://a.com/");
        assert_eq!(strategies.len(), MAX_STAGE_CANDIDATES);
    }

    #[test]
    fn snippet_extraction_is_bounded_and_compacted() {
        let code = "fetch( '/api/chat',\n  { method: 'POST' } )".repeat(40);
        let artifacts = PageArtifacts {
            target_url: "https://a.com/".to_string(),
            final_page_url: "https://a.com/".to_string(),
            html: String::new(),
            forms: Vec::new(),
            button_handlers: Vec::new(),
            inline_scripts: Vec::new(),
            external_scripts: Vec::new(),
            combined_scripts: vec![ScriptSource {
                source: "inline-1".to_string(),
                code,
            }],
        };

        let snippets = extract_network_snippets(&artifacts);
        assert_eq!(snippets.len(), MAX_EVIDENCE_SNIPPETS);
        assert!(!snippets[0].snippet.contains('\n'));
    }
}
