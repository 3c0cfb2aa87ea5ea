// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Error Types
 * String-tag error kinds for inspection, LLM client, and assisted inference
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use thiserror::Error;

/// Errors raised by artifact collection and strategy execution.
///
/// Only `FetchFailed` on the initial page request is fatal to a session;
/// every other failure is absorbed locally and converted into a skip, a
/// confidence penalty, or an advisory progress message.
#[derive(Error, Debug)]
pub enum InspectorError {
    /// The target page itself could not be fetched. Without artifacts there
    /// is no basis for any strategy, so this one propagates.
    #[error("fetch-failed: {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// A concrete request could not be constructed from a candidate.
    #[error("request-build-failed:{0}")]
    RequestBuildFailed(String),

    /// A strategy request failed at the transport level (timeout, refused).
    #[error("request-failed: {0}")]
    RequestFailed(String),
}

/// Errors from the OpenAI-compatible chat-completions client.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("missing-llm-config")]
    MissingConfig,

    #[error("invalid-base-url")]
    InvalidBaseUrl,

    #[error("llm-http-{0}")]
    Http(u16),

    #[error("llm-invalid-json-response")]
    InvalidJsonResponse,

    #[error("llm-invalid-json-content")]
    InvalidJsonContent,

    #[error("llm-request-failed: {0}")]
    RequestFailed(String),
}

/// Errors from the assisted strategy inference step.
///
/// None of these abort a session; the executor downgrades them to an
/// advisory message and continues with static candidates only.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("missing-llm-config")]
    MissingConfig,

    /// The LLM call itself failed; the inner tag carries the detail.
    #[error("llm-assist-failed: {0}")]
    Client(#[from] LlmError),

    /// The model replied, but nothing survived sanitization.
    #[error("llm-no-strategies")]
    NoStrategies,
}

impl AssistError {
    /// Short tag for progress messages and error summaries.
    pub fn tag(&self) -> String {
        match self {
            AssistError::MissingConfig => "missing-llm-config".to_string(),
            AssistError::Client(inner) => inner.to_string(),
            AssistError::NoStrategies => "llm-no-strategies".to_string(),
        }
    }
}
