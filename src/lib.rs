// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Library
 * Transport discovery and adaptive execution against chatbot web frontends
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;
pub mod errors;
pub mod types;

// Artifact collection and static transport analysis
pub mod analyzer;
pub mod collector;

// LLM-assisted strategy inference
pub mod assist;
pub mod llm;

// Adaptive execution engine
pub mod executor;

// Inspection orchestration
pub mod progress;
pub mod questions;
pub mod runner;
