// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - BotRecon Inspection Runner
 * Feeds the question catalog through one executor session
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use tracing::info;

use crate::config::RuntimeConfig;
use crate::errors::InspectorError;
use crate::executor::InspectionExecutor;
use crate::progress::{ProgressEvent, ProgressObserver};
use crate::questions::{inspection_questions, Question};
use crate::types::ExecutionResult;

/// One completed report row.
#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub question: Question,
    pub result: ExecutionResult,
}

/// Run a full inspection: discover a transport once, then resolve every
/// question sequentially against the same session.
///
/// Only the initial page fetch can fail the run; a question that cannot be
/// answered still produces a completed row.
pub async fn run_inspection(
    target_url: &str,
    application_purpose: &str,
    config: RuntimeConfig,
    custom_questions: &[Question],
    progress: &dyn ProgressObserver,
) -> Result<Vec<QuestionOutcome>, InspectorError> {
    let questions = inspection_questions(custom_questions, application_purpose);
    let mut executor =
        InspectionExecutor::discover(target_url, application_purpose, config, progress).await?;

    let total = questions.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, question) in questions.into_iter().enumerate() {
        progress.on_event(&ProgressEvent::QuestionStart {
            question: question.clone(),
            index,
            total,
        });

        let result = executor.answer_question(&question, progress).await;

        progress.on_event(&ProgressEvent::QuestionComplete {
            question: question.clone(),
            result: result.clone(),
            index,
            total,
        });

        outcomes.push(QuestionOutcome { question, result });
    }

    info!(
        answered = outcomes
            .iter()
            .filter(|o| o.result.status.is_ok())
            .count(),
        total,
        "Inspection complete"
    );

    Ok(outcomes)
}
