// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Runtime Configuration
 * Environment-backed LLM credentials with redacted reporting
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_API_KEY: &str = "LLM_API_KEY";
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_MODEL: &str = "LLM_MODEL";

/// Credentials for the OpenAI-compatible assist endpoint.
///
/// Passed by value into the engine constructor rather than read from
/// process-wide state, so tests can inject mock credentials. If any field
/// is empty, assisted inference and the late LLM fallback are skipped and
/// the engine runs static-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl RuntimeConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Read credentials from the process environment. Missing variables
    /// yield empty fields, not errors; static-only operation is valid.
    pub fn from_env() -> Self {
        Self {
            api_key: env::var(ENV_API_KEY).unwrap_or_default(),
            base_url: env::var(ENV_BASE_URL).unwrap_or_default(),
            model: env::var(ENV_MODEL).unwrap_or_default(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.base_url.is_empty() && !self.model.is_empty()
    }

    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_empty() {
            missing.push(ENV_API_KEY);
        }
        if self.base_url.is_empty() {
            missing.push(ENV_BASE_URL);
        }
        if self.model.is_empty() {
            missing.push(ENV_MODEL);
        }
        missing
    }

    /// Summary safe for logs: the API key is redacted to its first four
    /// characters.
    pub fn redacted_summary(&self) -> String {
        let redacted_key = if self.api_key.is_empty() {
            "(missing)".to_string()
        } else {
            let prefix: String = self.api_key.chars().take(4).collect();
            format!("{prefix}...")
        };

        let or_missing = |value: &str| {
            if value.is_empty() {
                "(missing)".to_string()
            } else {
                value.to_string()
            }
        };

        format!(
            "Environment configuration:\n- {ENV_API_KEY}: {}\n- {ENV_BASE_URL}: {}\n- {ENV_MODEL}: {}",
            redacted_key,
            or_missing(&self.base_url),
            or_missing(&self.model),
        )
    }
}
