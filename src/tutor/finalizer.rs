use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    config::ReplyConfig,
    tutor::{
        error::{CompletionStage, TutorError},
        ports::{CompletionPort, CompletionRequest},
        prompts,
        types::{Message, RegenerationPath, Role},
        validator::{check_accuracy, check_method_compliance, student_flagged_inaccuracy},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerStage {
    Initial,
    AccuracyChecked,
    ComplianceChecked,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedReply {
    pub text: String,
    pub path: RegenerationPath,
    pub completion_calls: u32,
}

/// Drafts a reply and regenerates it at most once per failed policy gate.
#[derive(Debug, Clone)]
pub struct ReplyFinalizer {
    config: ReplyConfig,
}

struct Walk<'a> {
    port: &'a dyn CompletionPort,
    cancel: &'a CancellationToken,
    base: Vec<Message>,
    draft: String,
    completion_calls: u32,
    accuracy_regenerated: bool,
    compliance_regenerated: bool,
}

impl ReplyFinalizer {
    pub fn new(config: ReplyConfig) -> Self {
        Self { config }
    }

    pub async fn finalize(
        &self,
        port: &dyn CompletionPort,
        prompt: &str,
        transcript: &[Message],
        cancel: &CancellationToken,
    ) -> Result<FinalizedReply, TutorError> {
        let mut base = Vec::with_capacity(transcript.len() + 1);
        base.push(Message::system(prompt));
        base.extend(
            transcript
                .iter()
                .filter(|message| message.role != Role::System)
                .cloned(),
        );

        let mut walk = Walk {
            port,
            cancel,
            base,
            draft: String::new(),
            completion_calls: 0,
            accuracy_regenerated: false,
            compliance_regenerated: false,
        };
        let last_student = transcript
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default();

        let mut stage = FinalizerStage::Initial;
        loop {
            stage = match stage {
                FinalizerStage::Initial => {
                    let draft = self
                        .request(&mut walk, CompletionStage::Draft, Vec::new())
                        .await?;
                    walk.draft = if draft.trim().is_empty() {
                        tracing::warn!(target: "tutor", "empty_draft_replaced");
                        prompts::EMPTY_DRAFT_FALLBACK.to_string()
                    } else {
                        draft
                    };
                    self.accuracy_gate(&mut walk, last_student).await?;
                    FinalizerStage::AccuracyChecked
                }
                FinalizerStage::AccuracyChecked => {
                    self.compliance_gate(&mut walk).await?;
                    FinalizerStage::ComplianceChecked
                }
                FinalizerStage::ComplianceChecked => FinalizerStage::Done,
                FinalizerStage::Done => break,
            };
        }

        Ok(FinalizedReply {
            text: walk.draft,
            path: RegenerationPath::from_flags(
                walk.accuracy_regenerated,
                walk.compliance_regenerated,
            ),
            completion_calls: walk.completion_calls,
        })
    }

    async fn accuracy_gate(&self, walk: &mut Walk<'_>, last_student: &str) -> Result<(), TutorError> {
        let accuracy = check_accuracy(&walk.draft);
        if accuracy.is_valid {
            return Ok(());
        }

        tracing::warn!(
            target: "tutor",
            issues = ?accuracy.issues,
            "mathematical_inaccuracy_detected"
        );
        let correction = if student_flagged_inaccuracy(last_student) {
            prompts::acknowledge_student_correction_instruction(last_student)
        } else {
            let issue = accuracy.issues.first().map(String::as_str).unwrap_or_default();
            prompts::self_correct_instruction(issue)
        };

        let follow_up = vec![
            Message::assistant(walk.draft.clone()),
            Message::user(correction),
        ];
        let corrected = self
            .request(walk, CompletionStage::AccuracyRegeneration, follow_up)
            .await?;
        walk.accuracy_regenerated = true;
        if !corrected.trim().is_empty() {
            walk.draft = corrected;
        }

        let recheck = check_accuracy(&walk.draft);
        if !recheck.is_valid {
            tracing::warn!(
                target: "tutor",
                issues = ?recheck.issues,
                "inaccuracy_persists_after_regeneration"
            );
        }
        Ok(())
    }

    async fn compliance_gate(&self, walk: &mut Walk<'_>) -> Result<(), TutorError> {
        let compliance = check_method_compliance(&walk.draft);
        let Some(violation) = compliance.reason else {
            return Ok(());
        };

        tracing::warn!(
            target: "tutor",
            violation = ?violation,
            reason = violation.reason(),
            "method_violation_detected"
        );
        let follow_up = vec![
            Message::assistant(walk.draft.clone()),
            Message::user(prompts::rephrase_as_questions_instruction()),
        ];
        let rephrased = self
            .request(walk, CompletionStage::ComplianceRegeneration, follow_up)
            .await?;
        walk.compliance_regenerated = true;
        if !rephrased.trim().is_empty() {
            walk.draft = rephrased;
        }

        if let Some(violation) = check_method_compliance(&walk.draft).reason {
            tracing::warn!(
                target: "tutor",
                violation = ?violation,
                "method_violation_persists_after_regeneration"
            );
        }
        Ok(())
    }

    async fn request(
        &self,
        walk: &mut Walk<'_>,
        stage: CompletionStage,
        follow_up: Vec<Message>,
    ) -> Result<String, TutorError> {
        if walk.cancel.is_cancelled() {
            return Err(TutorError::cancelled(stage));
        }

        let mut messages = walk.base.clone();
        messages.extend(follow_up);
        let request = CompletionRequest {
            stage,
            messages,
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };

        walk.completion_calls += 1;
        let span = tracing::info_span!(
            target: "tutor",
            "completion",
            stage = stage.as_str(),
            call = walk.completion_calls,
        );
        let completion = walk.port.complete(request).instrument(span.clone());
        tokio::select! {
            biased;
            _ = walk.cancel.cancelled() => {
                span.in_scope(|| tracing::info!(target: "tutor", "completion_cancelled"));
                Err(TutorError::cancelled(stage))
            }
            result = completion => {
                result.map_err(|err| {
                    span.in_scope(|| {
                        tracing::warn!(
                            target: "tutor",
                            error_kind = err.kind.as_str(),
                            error = %err,
                            "completion_failed"
                        )
                    });
                    TutorError::from_gateway(stage, &err)
                })
            }
        }
    }
}
