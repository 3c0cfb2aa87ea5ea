// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Artifact Collector
 * Fetches the target page and extracts forms, handlers, and script text
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::errors::InspectorError;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

static BLOCK_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());
static LINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(^|\s)//.*$").unwrap());
static HANDLER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap());

/// Input field inside a form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub tag: String,
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub input_type: String,
}

/// Form discovered in the target page markup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub action: String,
    /// Uppercased; defaults to GET when the markup gives none.
    pub method: String,
    pub enctype: String,
    pub id: String,
    pub name: String,
    pub inputs: Vec<FormInput>,
}

/// Button (or input) element carrying an inline click handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonHandler {
    pub tag: String,
    pub id: String,
    pub name: String,
    pub onclick: String,
    /// Best-effort name of the first function invoked by the handler;
    /// empty when none is detected.
    pub handler_name: String,
}

/// One external script reference and its fetch outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalScript {
    pub url: String,
    /// `invalid-url`, `http-<code>`, or a transport error message.
    pub error: Option<String>,
    /// Comment-stripped script text; empty when the fetch failed.
    pub code: String,
}

/// Script body tagged with where it came from (`inline-N` or a URL).
#[derive(Debug, Clone, Serialize)]
pub struct ScriptSource {
    pub source: String,
    pub code: String,
}

/// Immutable snapshot of one target page. Created once per inspection.
#[derive(Debug, Clone)]
pub struct PageArtifacts {
    pub target_url: String,
    /// Resolved URL after redirects; the base for endpoint resolution.
    pub final_page_url: String,
    pub html: String,
    pub forms: Vec<Form>,
    pub button_handlers: Vec<ButtonHandler>,
    pub inline_scripts: Vec<String>,
    pub external_scripts: Vec<ExternalScript>,
    pub combined_scripts: Vec<ScriptSource>,
}

/// Strip block and line comments from script text so commented-out network
/// calls do not produce false transport candidates.
pub fn strip_comments(source: &str) -> String {
    let without_blocks = BLOCK_COMMENT_RE.replace_all(source, "");
    LINE_COMMENT_RE.replace_all(&without_blocks, "$1").into_owned()
}

fn extract_handler_name(onclick: &str) -> String {
    HANDLER_NAME_RE
        .captures(onclick)
        .map(|caps| caps[1].to_string())
        .unwrap_or_default()
}

fn attr(element: &scraper::ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or("").to_string()
}

fn extract_forms(document: &Html) -> Vec<Form> {
    let form_selector = Selector::parse("form").unwrap();
    let input_selector = Selector::parse("input, textarea, select").unwrap();

    document
        .select(&form_selector)
        .map(|form| {
            let inputs = form
                .select(&input_selector)
                .map(|input| FormInput {
                    tag: input.value().name().to_ascii_lowercase(),
                    name: attr(&input, "name"),
                    id: attr(&input, "id"),
                    input_type: attr(&input, "type"),
                })
                .collect();

            let method = attr(&form, "method");
            Form {
                action: attr(&form, "action"),
                method: if method.is_empty() {
                    "GET".to_string()
                } else {
                    method.to_ascii_uppercase()
                },
                enctype: attr(&form, "enctype").to_ascii_lowercase(),
                id: attr(&form, "id"),
                name: attr(&form, "name"),
                inputs,
            }
        })
        .collect()
}

fn extract_button_handlers(document: &Html) -> Vec<ButtonHandler> {
    let button_selector = Selector::parse("button, input").unwrap();

    document
        .select(&button_selector)
        .filter_map(|element| {
            let onclick = attr(&element, "onclick");
            if onclick.is_empty() {
                return None;
            }

            Some(ButtonHandler {
                tag: element.value().name().to_ascii_lowercase(),
                id: attr(&element, "id"),
                name: attr(&element, "name"),
                handler_name: extract_handler_name(&onclick),
                onclick,
            })
        })
        .collect()
}

fn extract_scripts(document: &Html) -> (Vec<String>, Vec<String>) {
    let script_selector = Selector::parse("script").unwrap();
    let mut inline_scripts = Vec::new();
    let mut external_refs = Vec::new();

    for script in document.select(&script_selector) {
        let src = attr(&script, "src");
        if !src.is_empty() {
            external_refs.push(src.trim().to_string());
            continue;
        }

        let body: String = script.text().collect();
        if !body.trim().is_empty() {
            inline_scripts.push(strip_comments(&body));
        }
    }

    (inline_scripts, external_refs)
}

fn resolve_url(base_url: &str, maybe_relative: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(maybe_relative).ok().map(|u| u.to_string())
}

/// Collects `PageArtifacts` from a live target.
///
/// Performs 1 + N network requests per session, where N is the number of
/// distinct external script URLs. Only the initial page fetch is fatal;
/// each external script fetch is independently fault-isolated.
pub struct ArtifactCollector {
    client: reqwest::Client,
}

impl ArtifactCollector {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("Failed to create HTTP client for artifact collection")?;

        Ok(Self { client })
    }

    pub async fn collect(&self, target_url: &str) -> Result<PageArtifacts, InspectorError> {
        let response = self
            .client
            .get(target_url)
            .send()
            .await
            .map_err(|e| InspectorError::FetchFailed {
                url: target_url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let final_page_url = response.url().to_string();

        if !status.is_success() {
            return Err(InspectorError::FetchFailed {
                url: target_url.to_string(),
                reason: format!("http-{}", status.as_u16()),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| InspectorError::FetchFailed {
                url: target_url.to_string(),
                reason: e.to_string(),
            })?;

        // Html is not Send: parse and extract in a sync block dropped
        // before any further await.
        let (forms, button_handlers, inline_scripts, external_refs) = {
            let document = Html::parse_document(&html);
            let forms = extract_forms(&document);
            let handlers = extract_button_handlers(&document);
            let (inline, refs) = extract_scripts(&document);
            (forms, handlers, inline, refs)
        };

        debug!(
            forms = forms.len(),
            handlers = button_handlers.len(),
            inline_scripts = inline_scripts.len(),
            external_refs = external_refs.len(),
            "Collected page artifacts from {}",
            final_page_url
        );

        let fetches = external_refs
            .iter()
            .map(|script_ref| self.fetch_external_script(&final_page_url, script_ref));
        let external_scripts: Vec<ExternalScript> = join_all(fetches).await;

        let combined_scripts = inline_scripts
            .iter()
            .enumerate()
            .map(|(index, code)| ScriptSource {
                source: format!("inline-{}", index + 1),
                code: code.clone(),
            })
            .chain(
                external_scripts
                    .iter()
                    .filter(|script| !script.code.is_empty())
                    .map(|script| ScriptSource {
                        source: script.url.clone(),
                        code: script.code.clone(),
                    }),
            )
            .collect();

        Ok(PageArtifacts {
            target_url: target_url.to_string(),
            final_page_url,
            html,
            forms,
            button_handlers,
            inline_scripts,
            external_scripts,
            combined_scripts,
        })
    }

    /// Fetch one external script. Failures are recorded, never propagated:
    /// a broken script reference must not abort artifact collection.
    async fn fetch_external_script(&self, base_url: &str, script_ref: &str) -> ExternalScript {
        let Some(resolved) = resolve_url(base_url, script_ref) else {
            return ExternalScript {
                url: script_ref.to_string(),
                error: Some("invalid-url".to_string()),
                code: String::new(),
            };
        };

        match self.client.get(&resolved).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => ExternalScript {
                    url: resolved,
                    error: None,
                    code: strip_comments(&text),
                },
                Err(e) => {
                    warn!("Failed to read script body from {}: {}", resolved, e);
                    ExternalScript {
                        url: resolved,
                        error: Some(e.to_string()),
                        code: String::new(),
                    }
                }
            },
            Ok(response) => {
                debug!("Script fetch {} returned {}", resolved, response.status());
                ExternalScript {
                    url: resolved,
                    error: Some(format!("http-{}", response.status().as_u16())),
                    code: String::new(),
                }
            }
            Err(e) => {
                debug!("Script fetch {} failed: {}", resolved, e);
                ExternalScript {
                    url: resolved,
                    error: Some(e.to_string()),
                    code: String::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_block_and_line_comments() {
        let source = "fetch('/a'); /* fetch('/dead') */\n// fetch('/also-dead')\nlet x = 1;";
        let stripped = strip_comments(source);
        assert!(stripped.contains("fetch('/a')"));
        assert!(!stripped.contains("/dead"));
        assert!(!stripped.contains("also-dead"));
    }

    #[test]
    fn extracts_handler_function_name() {
        assert_eq!(extract_handler_name("sendQuestion(event)"), "sendQuestion");
        assert_eq!(extract_handler_name("return submit_form();"), "submit_form");
        assert_eq!(extract_handler_name("void 0"), "");
    }

    #[test]
    fn parses_tolerant_attribute_quoting() {
        let html = r#"<FORM Action=/ask METHOD='post'>
            <INPUT name=question type="text">
            <textarea name='notes'></textarea>
        </FORM>"#;
        let document = Html::parse_document(html);
        let forms = extract_forms(&document);

        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].action, "/ask");
        assert_eq!(forms[0].method, "POST");
        assert_eq!(forms[0].inputs.len(), 2);
        assert_eq!(forms[0].inputs[0].name, "question");
    }

    #[test]
    fn form_method_defaults_to_get() {
        let document = Html::parse_document(r#"<form action="/search"><input name="q"></form>"#);
        let forms = extract_forms(&document);
        assert_eq!(forms[0].method, "GET");
    }

    #[test]
    fn separates_inline_and_external_scripts() {
        let html = r#"
            <script src="/app.js"></script>
            <script>fetch("/api/chat");</script>
            <script>   </script>
        "#;
        let document = Html::parse_document(html);
        let (inline, refs) = extract_scripts(&document);

        assert_eq!(inline.len(), 1);
        assert_eq!(refs, vec!["/app.js".to_string()]);
    }

    #[test]
    fn button_without_onclick_is_skipped() {
        let html = r#"
            <button id="plain">Plain</button>
            <button id="go" onclick="askBot()">Go</button>
        "#;
        let document = Html::parse_document(html);
        let handlers = extract_button_handlers(&document);

        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id, "go");
        assert_eq!(handlers[0].handler_name, "askBot");
    }
}
