use crate::models::Intent;

const ASSESSMENT_TRIGGER: &str = "generate";
const ASSESSMENT_NOUNS: [&str; 3] = ["question", "quiz", "assessment"];
const EVALUATION_TRIGGER: &str = "answer";
const EVALUATION_CUES: [&str; 3] = ["is correct", "check", "evaluate"];

pub trait IntentParser: Send + Sync {
    fn parse(&self, message: &str) -> Intent;
}

/// Keyword matcher for chat messages.
///
/// This is plain case-insensitive substring matching, not language
/// understanding: "generate" plus one of question/quiz/assessment asks for
/// an assessment, "answer" plus one of "is correct"/check/evaluate asks for
/// an evaluation, anything else is chat. The assessment rule is checked
/// first. Trigger words are part of the API contract; keep them stable.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordIntent;

impl KeywordIntent {
    pub fn new() -> Self {
        Self
    }
}

impl IntentParser for KeywordIntent {
    fn parse(&self, message: &str) -> Intent {
        let text = message.to_lowercase();
        let intent = if text.contains(ASSESSMENT_TRIGGER)
            && ASSESSMENT_NOUNS.iter().any(|w| text.contains(w))
        {
            Intent::GenerateAssessment
        } else if text.contains(EVALUATION_TRIGGER)
            && EVALUATION_CUES.iter().any(|w| text.contains(w))
        {
            Intent::EvaluateAnswer
        } else {
            Intent::Chat
        };
        tracing::debug!(?intent, "Classified chat message");
        intent
    }
}
