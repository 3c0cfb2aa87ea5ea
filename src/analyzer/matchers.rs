// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Call-Shape Matchers
 * Named extraction rules for network-call patterns in script text
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::StrategyType;

/// One network call site found in script text.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub endpoint: String,
    /// Uppercased; POST unless the call shape states otherwise.
    pub method: String,
    /// Payload object keys extracted from the call, when the shape
    /// exposes them.
    pub payload_keys: Vec<String>,
    /// The matched call text, kept as evidence for scoring and prompts.
    pub snippet: String,
}

/// A recognizer for one HTTP-call idiom. New client idioms are added as
/// additional matchers without touching the scoring logic.
pub trait CallMatcher: Send + Sync {
    fn strategy_type(&self) -> StrategyType;
    fn find_calls(&self, script: &str) -> Vec<CallSite>;
}

/// The default matcher set, in evidence-strength order.
pub fn default_matchers() -> Vec<Box<dyn CallMatcher>> {
    vec![
        Box::new(FetchCallMatcher),
        Box::new(ChainedClientMatcher),
        Box::new(XhrOpenMatcher),
    ]
}

static METHOD_OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)method\s*:\s*['"]([A-Za-z]+)['"]"#).unwrap());
static STRINGIFY_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)JSON\.stringify\s*\(\s*\{([\s\S]*?)\}\s*\)").unwrap());
static OBJECT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*:").unwrap());
static QUESTION_HINT_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    super::QUESTION_KEY_HINTS
        .iter()
        .map(|hint| (*hint, Regex::new(&format!(r"(?i)\b{hint}\b")).unwrap()))
        .collect()
});

fn method_from_options(options_chunk: &str) -> String {
    METHOD_OPTION_RE
        .captures(options_chunk)
        .map(|caps| caps[1].to_ascii_uppercase())
        .unwrap_or_else(|| "POST".to_string())
}

/// Keys of a JSON-literal object passed through `JSON.stringify` inside the
/// call options. When no complete stringify object is visible in the chunk,
/// any question hint token appearing as a bare identifier counts as a key.
fn payload_keys_from_options(options_chunk: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(caps) = STRINGIFY_OBJECT_RE.captures(options_chunk) {
        for key in OBJECT_KEY_RE.captures_iter(&caps[1]) {
            let name = key[1].to_string();
            if !keys.contains(&name) {
                keys.push(name);
            }
        }
    }

    if keys.is_empty() {
        for (hint, hint_re) in QUESTION_HINT_RES.iter() {
            if hint_re.is_match(options_chunk) {
                keys.push((*hint).to_string());
            }
        }
    }

    keys
}

/// Generic fetch-style call: URL plus an optional options object.
pub struct FetchCallMatcher;

static FETCH_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)fetch\s*\(\s*(?:"([^"]+)"|'([^']+)'|`([^`]+)`)\s*(?:,\s*(\{[\s\S]{0,800}?\}))?\s*\)"#,
    )
    .unwrap()
});

fn quoted_group(caps: &regex::Captures<'_>, groups: [usize; 3]) -> String {
    groups
        .iter()
        .find_map(|&i| caps.get(i))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

impl CallMatcher for FetchCallMatcher {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Fetch
    }

    fn find_calls(&self, script: &str) -> Vec<CallSite> {
        FETCH_CALL_RE
            .captures_iter(script)
            .map(|caps| {
                let options_chunk = caps.get(4).map(|m| m.as_str()).unwrap_or("");
                CallSite {
                    endpoint: quoted_group(&caps, [1, 2, 3]),
                    method: method_from_options(options_chunk),
                    payload_keys: payload_keys_from_options(options_chunk),
                    snippet: caps[0].to_string(),
                }
            })
            .collect()
    }
}

/// Method-chained HTTP client call, e.g. `axios.post("url", ...)`.
pub struct ChainedClientMatcher;

static CHAINED_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)axios\.(get|post|put|patch|delete)\s*\(\s*(?:"([^"]+)"|'([^']+)'|`([^`]+)`)"#)
        .unwrap()
});

impl CallMatcher for ChainedClientMatcher {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Axios
    }

    fn find_calls(&self, script: &str) -> Vec<CallSite> {
        CHAINED_CALL_RE
            .captures_iter(script)
            .map(|caps| CallSite {
                endpoint: quoted_group(&caps, [2, 3, 4]),
                method: caps[1].to_ascii_uppercase(),
                payload_keys: Vec::new(),
                snippet: caps[0].to_string(),
            })
            .collect()
    }
}

/// Low-level `open(method, url)` call on a request object.
pub struct XhrOpenMatcher;

static XHR_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\.open\s*\(\s*['"]([A-Za-z]+)['"]\s*,\s*['"]([^'"]+)['"]"#).unwrap()
});

impl CallMatcher for XhrOpenMatcher {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Xhr
    }

    fn find_calls(&self, script: &str) -> Vec<CallSite> {
        XHR_OPEN_RE
            .captures_iter(script)
            .map(|caps| CallSite {
                endpoint: caps[2].trim().to_string(),
                method: caps[1].to_ascii_uppercase(),
                payload_keys: Vec::new(),
                snippet: caps[0].to_string(),
            })
            .collect()
    }
}
