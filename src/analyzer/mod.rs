// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Static Transport Analyzer
 * Scores network-call patterns and forms as transport candidates
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod matchers;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::collector::{ButtonHandler, FormInput, PageArtifacts};
use crate::types::{
    clamp_confidence, AnalysisSummary, PayloadMode, StrategyType, TransportCandidate,
    MAX_STAGE_CANDIDATES,
};
use matchers::default_matchers;

/// Tokens that mark a payload key as question-like.
pub const QUESTION_KEY_HINTS: &[&str] = &[
    "question",
    "prompt",
    "message",
    "query",
    "input",
    "text",
    "request",
    "userrequest",
    "userrequesttext",
    "userinput",
];

/// Tokens that mark a payload key as carrying the application purpose.
pub const PURPOSE_KEY_HINTS: &[&str] = &["purpose", "domain", "topic", "intent", "context"];

static STATIC_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(?:html?|css|js|png|jpe?g|gif|svg|ico|woff2?|ttf)$").unwrap());
static INDEX_HTML_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^|/)index\.html?$").unwrap());
static QUESTIONISH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        "(?i)question|prompt|message|query|ask|input|chat|llm|bot|token|response|api|completions|inference|generate",
    )
    .unwrap()
});

/// Derived, read-only aggregate of one analyzed page. Recomputed per
/// session, not per question.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub button_handlers: Vec<ButtonHandler>,
    /// Ranked descending by confidence, at most `MAX_STAGE_CANDIDATES`.
    pub candidate_transports: Vec<TransportCandidate>,
    pub summary: AnalysisSummary,
}

/// Broad question/LLM keyword test used for endpoint and snippet scoring.
pub fn has_questionish_token(text: &str) -> bool {
    QUESTIONISH_RE.is_match(text)
}

/// Whether an endpoint looks like a static asset or the page's own shell:
/// asset file extensions, `index.html` paths, `/`, or path-equality with
/// the final page URL. Such endpoints are evidence of a wrong candidate.
pub fn is_likely_static_or_shell_endpoint(endpoint: &str, final_page_url: &str) -> bool {
    let normalized = endpoint.trim().to_lowercase();
    if normalized.is_empty() {
        return true;
    }

    if STATIC_PATH_RE.is_match(&normalized) {
        return true;
    }

    if INDEX_HTML_RE.is_match(&normalized) || normalized == "/" {
        return true;
    }

    let Ok(page) = Url::parse(final_page_url) else {
        return false;
    };
    match page.join(endpoint) {
        Ok(resolved) => resolved.path() == page.path(),
        Err(_) => false,
    }
}

fn is_question_hint(token: &str) -> bool {
    let normalized = token.to_lowercase();
    QUESTION_KEY_HINTS
        .iter()
        .any(|hint| normalized == *hint || normalized.contains(hint))
}

/// Question-field inference order: payload keys matched against hint
/// tokens, then hint-bearing form inputs, then the first named input, then
/// the literal `question`.
pub fn infer_question_key(payload_keys: &[String], form_inputs: &[&FormInput]) -> String {
    for key in payload_keys {
        if is_question_hint(key) {
            return key.clone();
        }
    }

    for input in form_inputs {
        let candidate = if !input.name.is_empty() {
            &input.name
        } else {
            &input.id
        };
        let lowered = candidate.to_lowercase();
        if QUESTION_KEY_HINTS.iter().any(|hint| lowered.contains(hint)) {
            return candidate.clone();
        }
    }

    if let Some(input) = form_inputs
        .iter()
        .find(|input| !input.name.is_empty() || !input.id.is_empty())
    {
        return if !input.name.is_empty() {
            input.name.clone()
        } else {
            input.id.clone()
        };
    }

    "question".to_string()
}

pub fn infer_purpose_key(payload_keys: &[String]) -> Option<String> {
    for key in payload_keys {
        let normalized = key.to_lowercase();
        if PURPOSE_KEY_HINTS
            .iter()
            .any(|hint| normalized == *hint || normalized.contains(hint))
        {
            return Some(key.clone());
        }
    }
    None
}

/// Additive heuristic score from a base of 0.35, capped so no candidate is
/// ever treated as certain.
fn score_candidate(
    endpoint: &str,
    method: &str,
    source_snippet: &str,
    strategy_type: StrategyType,
    final_page_url: &str,
    has_handler_signal: bool,
) -> f64 {
    let mut score = 0.35;

    if !endpoint.is_empty() {
        score += 0.2;
    }
    if method == "POST" {
        score += 0.15;
    }
    if has_questionish_token(endpoint) {
        score += 0.15;
    }
    if has_questionish_token(source_snippet) {
        score += 0.1;
    }
    if strategy_type != StrategyType::Form {
        score += 0.05;
    }
    if has_handler_signal {
        score += 0.1;
    }
    if is_likely_static_or_shell_endpoint(endpoint, final_page_url) {
        score -= 0.3;
    }

    clamp_confidence(score)
}

fn form_candidates(artifacts: &PageArtifacts) -> Vec<TransportCandidate> {
    artifacts
        .forms
        .iter()
        .filter_map(|form| {
            let endpoint = if form.action.is_empty() {
                artifacts.final_page_url.clone()
            } else {
                form.action.clone()
            };
            if endpoint.is_empty() {
                return None;
            }

            let method = if form.method.is_empty() {
                "GET".to_string()
            } else {
                form.method.clone()
            };
            let payload_mode = if method == "GET" {
                PayloadMode::Query
            } else {
                PayloadMode::Form
            };
            let inputs: Vec<&FormInput> = form.inputs.iter().collect();
            let snippet = serde_json::to_string(form).unwrap_or_default();

            let source = if !form.id.is_empty() {
                form.id.clone()
            } else if !form.name.is_empty() {
                form.name.clone()
            } else {
                "html-form".to_string()
            };

            let confidence = score_candidate(
                &endpoint,
                &method,
                &snippet,
                StrategyType::Form,
                &artifacts.final_page_url,
                false,
            );

            Some(TransportCandidate {
                strategy_type: StrategyType::Form,
                source,
                endpoint,
                method,
                payload_mode,
                question_key: infer_question_key(&[], &inputs),
                purpose_key: Some("purpose".to_string()),
                source_snippet: snippet,
                confidence,
            })
        })
        .collect()
}

/// First occurrence wins; candidates are sorted by confidence afterwards.
fn dedupe_by_identity(candidates: Vec<TransportCandidate>) -> Vec<TransportCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.identity()))
        .collect()
}

/// Scan all collected script text and forms for transport candidates.
pub fn analyze_interaction(artifacts: &PageArtifacts) -> Analysis {
    let form_inputs: Vec<&FormInput> = artifacts
        .forms
        .iter()
        .flat_map(|form| form.inputs.iter())
        .collect();
    let handler_names: Vec<&str> = artifacts
        .button_handlers
        .iter()
        .map(|handler| handler.handler_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    let matchers = default_matchers();
    let mut candidates = Vec::new();

    for script in &artifacts.combined_scripts {
        let has_handler_signal = handler_names
            .iter()
            .any(|name| script.code.contains(&format!("{name}(")));

        for matcher in &matchers {
            let strategy_type = matcher.strategy_type();
            for call in matcher.find_calls(&script.code) {
                if call.endpoint.is_empty() {
                    continue;
                }

                let purpose_key = if strategy_type == StrategyType::Fetch {
                    infer_purpose_key(&call.payload_keys)
                } else {
                    Some("purpose".to_string())
                };

                let confidence = score_candidate(
                    &call.endpoint,
                    &call.method,
                    &call.snippet,
                    strategy_type,
                    &artifacts.final_page_url,
                    has_handler_signal,
                );

                candidates.push(TransportCandidate {
                    strategy_type,
                    source: script.source.clone(),
                    question_key: infer_question_key(&call.payload_keys, &form_inputs),
                    purpose_key,
                    payload_mode: PayloadMode::default_for_method(&call.method),
                    endpoint: call.endpoint,
                    method: call.method,
                    source_snippet: call.snippet,
                    confidence,
                });
            }
        }
    }

    candidates.extend(form_candidates(artifacts));

    let mut ranked = dedupe_by_identity(candidates);
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked.truncate(MAX_STAGE_CANDIDATES);

    debug!(
        candidates = ranked.len(),
        scripts = artifacts.combined_scripts.len(),
        forms = artifacts.forms.len(),
        "Static transport analysis complete"
    );

    Analysis {
        button_handlers: artifacts.button_handlers.clone(),
        summary: AnalysisSummary {
            inline_scripts: artifacts.inline_scripts.len(),
            external_scripts: artifacts.external_scripts.len(),
            forms: artifacts.forms.len(),
            handlers: artifacts.button_handlers.len(),
            candidates: ranked.len(),
        },
        candidate_transports: ranked,
    }
}
