// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Adaptive Execution Engine
 * Executes ranked transport candidates against the live target, classifies
 * responses, and repairs payload keys on validation rejections
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::analyzer::{analyze_interaction, Analysis};
use crate::assist::{request_assisted_strategies, should_use_assisted_inference};
use crate::collector::{ArtifactCollector, PageArtifacts};
use crate::config::RuntimeConfig;
use crate::errors::InspectorError;
use crate::llm::OpenAiCompatClient;
use crate::progress::{phase, ProgressObserver};
use crate::questions::Question;
use crate::types::{
    merge_and_rank_candidates, ExecutionResult, ExecutionStatus, PayloadMode, ResponseKind,
    TransportCandidate,
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;
const ANSWER_PREVIEW_CHARS: usize = 420;
const VALIDATION_PREVIEW_CHARS: usize = 1000;
const ERROR_SUMMARY_CHARS: usize = 320;
const MAX_ADAPTIVE_VARIANTS: usize = 10;
const MAX_FIELD_HINTS: usize = 8;
/// Bound on the recursive answer walk; target-supplied structures are not
/// trusted to be shallow.
const MAX_ANSWER_WALK_DEPTH: usize = 32;

/// Common question-field aliases tried when a 422 says the payload shape
/// is wrong.
const ADAPTIVE_QUESTION_KEYS: &[&str] = &[
    "userRequestText",
    "user_request_text",
    "userRequest",
    "request",
    "question",
    "prompt",
    "message",
    "query",
    "text",
    "input",
];

/// Key-preference order for extracting an answer from structured data.
const PREFERRED_ANSWER_KEYS: &[&str] = &[
    "answer", "response", "output", "text", "content", "message", "result",
];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HTML_DOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype html|<html\b|<head\b|<body\b").unwrap());
static HTML_CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)html|xhtml").unwrap());
static SHELL_MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<form\b|<input\b|<button\b|<script\b").unwrap());
static SCRIPT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script\b[\s\S]*?</script>").unwrap());
static STYLE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<style\b[\s\S]*?</style>").unwrap());
static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static INDEX_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)index\.html?$").unwrap());
static BOILERPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)url to examine|application purpose|start inspection").unwrap());
static QUOTED_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([A-Za-z_][A-Za-z0-9_]*)["']"#).unwrap());
static BARE_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]{2,})\b").unwrap());
static FIELD_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)question|request|text|message|prompt|query|input").unwrap());

/// Whitespace-collapsed preview bounded to `max` characters.
fn to_preview(text: &str, max: usize) -> String {
    let compact = WHITESPACE_RE.replace_all(text, " ").trim().to_string();
    if compact.chars().count() <= max {
        return compact;
    }
    let truncated: String = compact.chars().take(max.saturating_sub(3)).collect();
    format!("{truncated}...")
}

/// Depth-first search for the first non-empty string value, visiting
/// preferred keys before anything else.
fn find_first_string_value(value: &Value, depth: usize) -> Option<String> {
    if depth >= MAX_ANSWER_WALK_DEPTH {
        return None;
    }

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_first_string_value(item, depth + 1).filter(|s| !s.is_empty())),
        Value::Object(map) => {
            for key in PREFERRED_ANSWER_KEYS {
                match map.get(*key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
                    Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                        if let Some(found) = find_first_string_value(nested, depth + 1)
                            .filter(|s| !s.is_empty())
                        {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }

            map.values()
                .find_map(|v| find_first_string_value(v, depth + 1).filter(|s| !s.is_empty()))
        }
        _ => None,
    }
}

/// Extract an answer string from a response body by content type.
fn parse_response_body(raw_text: &str, content_type: &str) -> (String, ResponseKind) {
    if raw_text.is_empty() {
        return (String::new(), ResponseKind::Empty);
    }

    if content_type.to_lowercase().contains("json") {
        match serde_json::from_str::<Value>(raw_text) {
            Ok(parsed) => {
                let answer = find_first_string_value(&parsed, 0)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| parsed.to_string());
                return (answer, ResponseKind::Json);
            }
            Err(_) => return (raw_text.to_string(), ResponseKind::Text),
        }
    }

    let looks_like_html_document =
        HTML_CONTENT_TYPE_RE.is_match(content_type) || HTML_DOC_RE.is_match(raw_text);

    let without_scripts = SCRIPT_TAG_RE.replace_all(raw_text, " ");
    let without_styles = STYLE_TAG_RE.replace_all(&without_scripts, " ");
    let without_tags = ANY_TAG_RE.replace_all(&without_styles, " ");
    let answer = WHITESPACE_RE.replace_all(&without_tags, " ").trim().to_string();

    let kind = if looks_like_html_document {
        ResponseKind::HtmlDocument
    } else {
        ResponseKind::Text
    };

    if answer.is_empty() {
        (raw_text.to_string(), kind)
    } else {
        (answer, kind)
    }
}

/// A successful response that is indistinguishable from the target's own
/// front-end HTML is evidence of a wrong candidate, not an answer.
fn is_likely_page_shell_response(
    raw_text: &str,
    content_type: &str,
    request_url: &str,
    page_url: &str,
) -> bool {
    let lowered_type = content_type.to_lowercase();
    let has_document_signals = lowered_type.contains("text/html")
        || lowered_type.contains("xhtml")
        || HTML_DOC_RE.is_match(raw_text);
    if !has_document_signals {
        return false;
    }

    if let (Ok(request), Ok(page)) = (Url::parse(request_url), Url::parse(page_url)) {
        if request.path() == page.path() || INDEX_PATH_RE.is_match(request.path()) {
            return true;
        }
    }

    SHELL_MARKUP_RE.is_match(raw_text)
}

fn looks_like_meaningful_answer(answer: &str) -> bool {
    let trimmed = answer.trim();
    if trimmed.chars().count() < 2 {
        return false;
    }
    !BOILERPLATE_RE.is_match(trimmed)
}

fn unique_strings<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && seen.insert(value.clone()))
        .collect()
}

/// Scan a 422 body for identifier tokens that look like question fields:
/// quoted identifiers first, then bare ones, bounded to `MAX_FIELD_HINTS`.
fn extract_field_hints_from_422(validation_text: &str) -> Vec<String> {
    let mut hints = Vec::new();

    for caps in QUOTED_IDENT_RE.captures_iter(validation_text) {
        if FIELD_HINT_RE.is_match(&caps[1]) {
            hints.push(caps[1].to_string());
        }
    }
    for caps in BARE_IDENT_RE.captures_iter(validation_text) {
        if FIELD_HINT_RE.is_match(&caps[1]) {
            hints.push(caps[1].to_string());
        }
    }

    let mut unique = unique_strings(hints);
    unique.truncate(MAX_FIELD_HINTS);
    unique
}

/// Synthesize payload-key variants for a strategy rejected with HTTP 422.
///
/// The validation rejection is read as "wrong field name", not "wrong
/// endpoint": every variant keeps the endpoint and method and changes only
/// the payload shape, with and without the purpose field.
fn build_422_adaptive_strategies(
    strategy: &TransportCandidate,
    validation_text: &str,
) -> Vec<TransportCandidate> {
    let discovered = extract_field_hints_from_422(validation_text);
    let candidate_keys = unique_strings(
        std::iter::once(strategy.question_key.clone())
            .chain(discovered)
            .chain(ADAPTIVE_QUESTION_KEYS.iter().map(|k| k.to_string())),
    );

    let original_signature = format!(
        "{}::{}",
        strategy.question_key,
        strategy.purpose_key.as_deref().unwrap_or("-")
    );

    let mut alternatives = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for question_key in candidate_keys {
        let without_purpose_signature = format!("{question_key}::-");
        if seen.insert(without_purpose_signature.clone())
            && without_purpose_signature != original_signature
        {
            let mut variant = strategy.clone();
            variant.question_key = question_key.clone();
            variant.purpose_key = None;
            variant.confidence = (strategy.confidence - 0.08).max(0.05);
            alternatives.push(variant);
        }

        if let Some(purpose_key) = &strategy.purpose_key {
            if purpose_key != &question_key {
                let with_purpose_signature = format!("{question_key}::{purpose_key}");
                if seen.insert(with_purpose_signature.clone())
                    && with_purpose_signature != original_signature
                {
                    let mut variant = strategy.clone();
                    variant.question_key = question_key.clone();
                    variant.confidence = (strategy.confidence - 0.12).max(0.05);
                    alternatives.push(variant);
                }
            }
        }

        if alternatives.len() >= MAX_ADAPTIVE_VARIANTS {
            alternatives.truncate(MAX_ADAPTIVE_VARIANTS);
            break;
        }
    }

    alternatives
}

enum RequestBody {
    None,
    Form(Vec<(String, String)>),
    Json(serde_json::Map<String, Value>),
}

struct BuiltRequest {
    url: Url,
    method: reqwest::Method,
    body: RequestBody,
}

fn question_payload(
    question_text: &str,
    application_purpose: &str,
    strategy: &TransportCandidate,
) -> Vec<(String, String)> {
    let question_key = if strategy.question_key.is_empty() {
        "question".to_string()
    } else {
        strategy.question_key.clone()
    };

    let mut payload = vec![(question_key.clone(), question_text.to_string())];

    let purpose = application_purpose.trim();
    if let Some(purpose_key) = &strategy.purpose_key {
        if !purpose.is_empty() && purpose_key != &question_key {
            payload.push((purpose_key.clone(), purpose.to_string()));
        }
    }

    payload
}

fn build_request(
    strategy: &TransportCandidate,
    base_url: &str,
    question_text: &str,
    application_purpose: &str,
) -> Result<BuiltRequest, InspectorError> {
    let base = Url::parse(base_url)
        .map_err(|_| InspectorError::RequestBuildFailed("invalid-endpoint".to_string()))?;
    let mut url = base
        .join(&strategy.endpoint)
        .map_err(|_| InspectorError::RequestBuildFailed("invalid-endpoint".to_string()))?;

    let method_name = if strategy.method.is_empty() {
        "POST".to_string()
    } else {
        strategy.method.to_ascii_uppercase()
    };
    let method = reqwest::Method::from_bytes(method_name.as_bytes())
        .map_err(|_| InspectorError::RequestBuildFailed("invalid-method".to_string()))?;

    let payload = question_payload(question_text, application_purpose, strategy);

    if strategy.payload_mode == PayloadMode::Query || method == reqwest::Method::GET {
        // Set-or-replace: an endpoint that already carries a parameter of
        // the same name gets one pair, not a duplicate.
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        for (key, value) in &payload {
            if let Some(existing) = pairs.iter_mut().find(|(k, _)| k == key) {
                existing.1 = value.clone();
            } else {
                pairs.push((key.clone(), value.clone()));
            }
        }
        url.query_pairs_mut().clear().extend_pairs(&pairs);
        return Ok(BuiltRequest {
            url,
            method,
            body: RequestBody::None,
        });
    }

    if strategy.payload_mode == PayloadMode::Form {
        return Ok(BuiltRequest {
            url,
            method,
            body: RequestBody::Form(payload),
        });
    }

    let mut map = serde_json::Map::new();
    for (key, value) in payload {
        map.insert(key, Value::String(value));
    }
    Ok(BuiltRequest {
        url,
        method,
        body: RequestBody::Json(map),
    })
}

/// Per-session adaptive executor. Owns the ranked candidate list; a proven
/// winner is promoted to the front for subsequent questions. One value per
/// inspection session, never shared.
pub struct InspectionExecutor {
    http: reqwest::Client,
    llm: OpenAiCompatClient,
    config: RuntimeConfig,
    target_url: String,
    application_purpose: String,
    artifacts: PageArtifacts,
    analysis: Analysis,
    candidates: Vec<TransportCandidate>,
    late_assist_tried: bool,
    no_strategy_reason: Option<String>,
}

impl InspectionExecutor {
    /// Collect artifacts, run static analysis, optionally consult the
    /// model, and rank the combined candidate list.
    ///
    /// Fails only when the target page itself cannot be fetched; a target
    /// with no inferable transport still yields an executor that answers
    /// every question with `no-strategy`.
    pub async fn discover(
        target_url: &str,
        application_purpose: &str,
        config: RuntimeConfig,
        progress: &dyn ProgressObserver,
    ) -> Result<Self, InspectorError> {
        phase(progress, "Collecting HTML and JavaScript artifacts...");

        let collector = ArtifactCollector::new().map_err(|e| InspectorError::FetchFailed {
            url: target_url.to_string(),
            reason: e.to_string(),
        })?;
        let artifacts = collector.collect(target_url).await?;

        phase(progress, "Analyzing client-side transport paths...");
        let analysis = analyze_interaction(&artifacts);

        let llm = OpenAiCompatClient::new().map_err(|e| InspectorError::FetchFailed {
            url: target_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut assisted_candidates = Vec::new();
        if should_use_assisted_inference(&analysis, target_url) {
            match request_assisted_strategies(
                &llm,
                &config,
                target_url,
                application_purpose,
                &artifacts,
                &analysis,
                progress,
            )
            .await
            {
                Ok(strategies) => {
                    phase(
                        progress,
                        format!(
                            "Assisted inference added {} candidate strategy(s).",
                            strategies.len()
                        ),
                    );
                    assisted_candidates = strategies;
                }
                Err(e) => {
                    phase(
                        progress,
                        format!(
                            "Assisted inference not available ({}). Continuing with static analysis.",
                            e.tag()
                        ),
                    );
                }
            }
        }

        let candidates = merge_and_rank_candidates(&[
            &assisted_candidates,
            &analysis.candidate_transports,
        ]);

        let mut no_strategy_reason = None;
        if candidates.is_empty() {
            let reason =
                "No candidate request transport could be inferred from HTML/JS or LLM-assisted analysis."
                    .to_string();
            phase(progress, reason.clone());
            no_strategy_reason = Some(reason);
        } else {
            let top = &candidates[0];
            phase(
                progress,
                format!(
                    "Using {} {} as primary strategy ({}% confidence).",
                    top.method,
                    top.endpoint,
                    (top.confidence * 100.0).round() as i64
                ),
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create strategy execution client")
            .map_err(|e| InspectorError::FetchFailed {
                url: target_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            llm,
            late_assist_tried: !assisted_candidates.is_empty(),
            config,
            target_url: target_url.to_string(),
            application_purpose: application_purpose.to_string(),
            artifacts,
            analysis,
            candidates,
            no_strategy_reason,
        })
    }

    /// Current ranked candidate list (promotion-aware), mostly for
    /// reporting.
    pub fn candidates(&self) -> &[TransportCandidate] {
        &self.candidates
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    /// Resolve one question: attempt candidates in rank order with 422
    /// repair, fall back to one late assisted round, and always return a
    /// completed result.
    pub async fn answer_question(
        &mut self,
        question: &Question,
        progress: &dyn ProgressObserver,
    ) -> ExecutionResult {
        if let Some(reason) = &self.no_strategy_reason {
            return ExecutionResult {
                answer: reason.clone(),
                status: ExecutionStatus::NoStrategy,
                method_label: "none".to_string(),
                confidence: 0.05,
                response_kind: None,
                http_status: None,
                validation_source: None,
            };
        }

        let primary_candidates = self.candidates.clone();
        let (primary_win, mut errors) = self
            .execute_with_candidates(&question.text, &primary_candidates, progress)
            .await;

        if let Some((result, winner)) = primary_win {
            self.promote_winner(winner);
            return result;
        }

        if !self.late_assist_tried && self.config.is_complete() {
            self.late_assist_tried = true;
            phase(
                progress,
                "Primary strategies failed; attempting assisted inference fallback...",
            );

            match request_assisted_strategies(
                &self.llm,
                &self.config,
                &self.target_url,
                &self.application_purpose,
                &self.artifacts,
                &self.analysis,
                progress,
            )
            .await
            {
                Ok(strategies) if !strategies.is_empty() => {
                    self.candidates =
                        merge_and_rank_candidates(&[&self.candidates, &strategies]);
                    let retry_candidates = self.candidates.clone();
                    let (assisted_win, assisted_errors) = self
                        .execute_with_candidates(&question.text, &retry_candidates, progress)
                        .await;

                    if let Some((result, winner)) = assisted_win {
                        self.promote_winner(winner);
                        return result;
                    }
                    errors.extend(assisted_errors);
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("assisted-inference:{}", e.tag())),
            }
        }

        ExecutionResult {
            answer: format!(
                "All inferred strategies failed. {}",
                to_preview(&errors.join(" | "), ERROR_SUMMARY_CHARS)
            ),
            status: ExecutionStatus::Failed,
            method_label: "fallback-exhausted".to_string(),
            confidence: 0.1,
            response_kind: None,
            http_status: None,
            validation_source: None,
        }
    }

    /// A real success is the strongest evidence there is: boost the winner
    /// past the heuristic cap and re-rank it to the front.
    fn promote_winner(&mut self, mut winner: TransportCandidate) {
        winner.confidence = winner.confidence.max(0.98);
        self.candidates = merge_and_rank_candidates(&[
            std::slice::from_ref(&winner),
            &self.candidates,
        ]);
    }

    async fn execute_with_candidates(
        &self,
        question_text: &str,
        candidates: &[TransportCandidate],
        progress: &dyn ProgressObserver,
    ) -> (Option<(ExecutionResult, TransportCandidate)>, Vec<String>) {
        let mut errors = Vec::new();

        for strategy in candidates {
            match self.execute_strategy(strategy, question_text).await {
                Ok(result) if result.status.is_ok() && !result.answer.is_empty() => {
                    return (Some((result, strategy.clone())), errors);
                }
                Ok(result) => {
                    errors.push(format!(
                        "{} {}: {}",
                        strategy.method, strategy.endpoint, result.status
                    ));

                    if result.status == ExecutionStatus::Http(422) {
                        let validation_text = result
                            .validation_source
                            .as_deref()
                            .unwrap_or(&result.answer);
                        let variants = build_422_adaptive_strategies(strategy, validation_text);
                        if !variants.is_empty() {
                            phase(
                                progress,
                                format!(
                                    "422 received for {}; retrying payload-key variants...",
                                    strategy.endpoint
                                ),
                            );
                        }

                        for variant in variants {
                            match self.execute_strategy(&variant, question_text).await {
                                Ok(adaptive) if adaptive.status.is_ok() && !adaptive.answer.is_empty() => {
                                    return (Some((adaptive, variant)), errors);
                                }
                                Ok(adaptive) => errors.push(format!(
                                    "{} {} [{}]: {}",
                                    variant.method,
                                    variant.endpoint,
                                    variant.question_key,
                                    adaptive.status
                                )),
                                Err(e) => errors.push(format!(
                                    "{} {} [{}]: {}",
                                    variant.method, variant.endpoint, variant.question_key, e
                                )),
                            }
                        }
                    }
                }
                Err(e) => {
                    errors.push(format!("{} {}: {}", strategy.method, strategy.endpoint, e));
                }
            }
        }

        (None, errors)
    }

    /// Issue one concrete request for a candidate and classify the
    /// response.
    async fn execute_strategy(
        &self,
        strategy: &TransportCandidate,
        question_text: &str,
    ) -> Result<ExecutionResult, InspectorError> {
        let built = build_request(
            strategy,
            &self.artifacts.final_page_url,
            question_text,
            &self.application_purpose,
        )?;

        let request_url = built.url.to_string();
        let method_label = format!("{} {}", strategy.method, built.url.path());

        let mut request = self
            .http
            .request(built.method, built.url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*");
        request = match &built.body {
            RequestBody::None => request,
            RequestBody::Form(pairs) => request.form(pairs),
            RequestBody::Json(map) => request.json(map),
        };

        let response = request
            .send()
            .await
            .map_err(|e| InspectorError::RequestFailed(e.to_string()))?;

        let http_status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let raw_text = response
            .text()
            .await
            .map_err(|e| InspectorError::RequestFailed(e.to_string()))?;

        let (parsed_answer, response_kind) = parse_response_body(&raw_text, &content_type);
        let answer = if parsed_answer.is_empty() {
            "(empty response)".to_string()
        } else {
            parsed_answer
        };

        if http_status.is_success() {
            if is_likely_page_shell_response(
                &raw_text,
                &content_type,
                &request_url,
                &self.artifacts.final_page_url,
            ) {
                debug!("Shell-like response from {}", request_url);
                return Ok(ExecutionResult {
                    answer: to_preview(&answer, ANSWER_PREVIEW_CHARS),
                    status: ExecutionStatus::NonAnswerHtml,
                    method_label,
                    confidence: (strategy.confidence - 0.35).max(0.05),
                    response_kind: None,
                    http_status: None,
                    validation_source: None,
                });
            }

            if !looks_like_meaningful_answer(&answer) {
                return Ok(ExecutionResult {
                    answer: to_preview(&answer, ANSWER_PREVIEW_CHARS),
                    status: ExecutionStatus::NonAnswerEmpty,
                    method_label,
                    confidence: (strategy.confidence - 0.3).max(0.05),
                    response_kind: None,
                    http_status: None,
                    validation_source: None,
                });
            }
        } else {
            warn!(
                "Strategy {} returned HTTP {}",
                method_label,
                http_status.as_u16()
            );
        }

        let status = if http_status.is_success() {
            ExecutionStatus::Ok
        } else {
            ExecutionStatus::Http(http_status.as_u16())
        };
        let penalty = if http_status.is_success() { 0.0 } else { 0.25 };

        Ok(ExecutionResult {
            answer: to_preview(&answer, ANSWER_PREVIEW_CHARS),
            status,
            method_label,
            confidence: (strategy.confidence - penalty).clamp(0.05, 0.99),
            response_kind: Some(response_kind),
            http_status: Some(http_status.as_u16()),
            validation_source: Some(to_preview(&raw_text, VALIDATION_PREVIEW_CHARS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyType;

    fn strategy(question_key: &str, purpose_key: Option<&str>) -> TransportCandidate {
        TransportCandidate {
            strategy_type: StrategyType::Fetch,
            source: "inline-1".to_string(),
            endpoint: "/api/chat".to_string(),
            method: "POST".to_string(),
            payload_mode: PayloadMode::Json,
            question_key: question_key.to_string(),
            purpose_key: purpose_key.map(|k| k.to_string()),
            source_snippet: String::new(),
            confidence: 0.7,
        }
    }

    #[test]
    fn preferred_key_wins_the_answer_walk() {
        let body = serde_json::json!({"response": {"text": "Hello"}});
        assert_eq!(find_first_string_value(&body, 0).as_deref(), Some("Hello"));
    }

    #[test]
    fn answer_walk_falls_back_to_any_string() {
        let body = serde_json::json!({"meta": {"unrelated": 1, "inner": ["", "found it"]}});
        assert_eq!(
            find_first_string_value(&body, 0).as_deref(),
            Some("found it")
        );
    }

    #[test]
    fn answer_walk_is_depth_bounded() {
        let mut value = serde_json::json!("deep");
        for _ in 0..40 {
            value = serde_json::json!({ "wrap": value });
        }
        assert_eq!(find_first_string_value(&value, 0), None);
    }

    #[test]
    fn json_body_round_trips_nested_answer() {
        let (answer, kind) =
            parse_response_body(r#"{"response": {"text": "Hello"}}"#, "application/json");
        assert_eq!(answer, "Hello");
        assert_eq!(kind, ResponseKind::Json);
    }

    #[test]
    fn json_without_strings_serializes_whole_body() {
        let (answer, _) = parse_response_body(r#"{"count": 3}"#, "application/json");
        assert_eq!(answer, r#"{"count":3}"#);
    }

    #[test]
    fn html_body_is_stripped_to_text() {
        let html = "<html><head><style>p{}</style></head><body><script>x()</script><p>The  answer</p></body></html>";
        let (answer, kind) = parse_response_body(html, "text/html");
        assert_eq!(answer, "The answer");
        assert_eq!(kind, ResponseKind::HtmlDocument);
    }

    #[test]
    fn shell_response_detected_by_path_and_markup() {
        let shell_html = "<html><body><form><input name='q'></form></body></html>";
        assert!(is_likely_page_shell_response(
            shell_html,
            "text/html",
            "https://a.com/api/chat",
            "https://a.com/"
        ));
        assert!(is_likely_page_shell_response(
            "<html><body>hi</body></html>",
            "text/html",
            "https://a.com/",
            "https://a.com/"
        ));
        assert!(!is_likely_page_shell_response(
            "{\"answer\": \"hi\"}",
            "application/json",
            "https://a.com/api/chat",
            "https://a.com/"
        ));
    }

    #[test]
    fn boilerplate_answers_are_not_meaningful() {
        assert!(!looks_like_meaningful_answer("  "));
        assert!(!looks_like_meaningful_answer("x"));
        assert!(!looks_like_meaningful_answer("Enter the URL to examine"));
        assert!(looks_like_meaningful_answer("I can answer weather questions."));
    }

    #[test]
    fn field_hints_found_in_validation_body() {
        let body = r#"{"detail": "user_request_text is required"}"#;
        let hints = extract_field_hints_from_422(body);
        assert!(hints.contains(&"user_request_text".to_string()));
    }

    #[test]
    fn adaptive_variants_include_discovered_hint() {
        let variants = build_422_adaptive_strategies(
            &strategy("question", Some("purpose")),
            r#""user_request_text is required""#,
        );

        assert!(variants
            .iter()
            .any(|v| v.question_key == "user_request_text"));
        assert!(variants.len() <= MAX_ADAPTIVE_VARIANTS);
        // Repair never changes the endpoint.
        assert!(variants.iter().all(|v| v.endpoint == "/api/chat"));
        // Original payload shape is not retried verbatim.
        assert!(!variants
            .iter()
            .any(|v| v.question_key == "question" && v.purpose_key.as_deref() == Some("purpose")));
    }

    #[test]
    fn adaptive_variants_vary_purpose_presence() {
        let variants = build_422_adaptive_strategies(&strategy("question", Some("purpose")), "");
        assert!(variants
            .iter()
            .any(|v| v.question_key == "request" && v.purpose_key.is_none()));
        assert!(variants
            .iter()
            .any(|v| v.question_key == "request" && v.purpose_key.as_deref() == Some("purpose")));
    }

    #[test]
    fn preview_is_bounded_and_compacted() {
        let long = "word ".repeat(200);
        let preview = to_preview(&long, 50);
        assert!(preview.chars().count() <= 50);
        assert!(preview.ends_with("..."));
        assert_eq!(to_preview("a  b\n c", 100), "a b c");
    }

    #[test]
    fn query_mode_places_payload_in_url() {
        let mut s = strategy("q", Some("purpose"));
        s.method = "GET".to_string();
        s.payload_mode = PayloadMode::Query;
        s.endpoint = "/search".to_string();

        let built = build_request(&s, "https://a.com/", "hello there", "weather bot").unwrap();
        let url = built.url.to_string();
        assert!(url.contains("q=hello"));
        assert!(url.contains("purpose=weather"));
        assert!(matches!(built.body, RequestBody::None));
    }

    #[test]
    fn query_mode_replaces_existing_parameter() {
        let mut s = strategy("q", None);
        s.method = "GET".to_string();
        s.payload_mode = PayloadMode::Query;
        s.endpoint = "/search?q=old&page=2".to_string();

        let built = build_request(&s, "https://a.com/", "hello", "").unwrap();
        let url = built.url.to_string();
        assert!(url.contains("q=hello"));
        assert!(!url.contains("q=old"));
        assert!(url.contains("page=2"));
        assert_eq!(url.matches("q=").count(), 1);
    }

    #[test]
    fn purpose_key_equal_to_question_key_is_dropped() {
        let s = strategy("question", Some("question"));
        let payload = question_payload("hi", "a purpose", &s);
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn relative_endpoint_resolves_against_final_page_url() {
        let s = strategy("question", None);
        let built = build_request(&s, "https://a.com/app/", "hi", "").unwrap();
        assert_eq!(built.url.as_str(), "https://a.com/api/chat");
    }
}
