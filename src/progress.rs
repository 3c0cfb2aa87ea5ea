// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Progress Events
 * Advisory event stream for inspection phases and per-question lifecycle
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::info;

use crate::questions::Question;
use crate::types::ExecutionResult;

/// Advisory progress notification. No event is required for correctness;
/// consumers must tolerate loss.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    PhaseInfo {
        message: String,
    },
    QuestionStart {
        question: Question,
        index: usize,
        total: usize,
    },
    QuestionComplete {
        question: Question,
        result: ExecutionResult,
        index: usize,
        total: usize,
    },
}

pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Default observer: forwards events to the tracing subscriber.
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseInfo { message } => info!("{message}"),
            ProgressEvent::QuestionStart { question, index, total } => {
                info!("[{}/{}] {}", index + 1, total, question.text);
            }
            ProgressEvent::QuestionComplete { question, result, index, total } => {
                info!(
                    "[{}/{}] {} -> {} ({})",
                    index + 1,
                    total,
                    question.id,
                    result.status,
                    result.method_label
                );
            }
        }
    }
}

/// Observer that discards everything; used by tests.
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Emit a free-text phase message.
pub fn phase(observer: &dyn ProgressObserver, message: impl Into<String>) {
    observer.on_event(&ProgressEvent::PhaseInfo {
        message: message.into(),
    });
}
