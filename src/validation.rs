use crate::error::{AgentError, Result};
use crate::models::{AssessmentRequest, ChatRequest, EvaluateRequest, FeedbackRequest, Mode, PromptRequest};

pub const DEFAULT_NUM_QUESTIONS: i64 = 5;
pub const MAX_NUM_QUESTIONS: i64 = 50;

/// Validated `/generate-assessment` fields, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSpec<'a> {
    pub topic: &'a str,
    pub grade: &'a str,
    pub subject: &'a str,
    pub curriculum: &'a str,
    pub num_questions: i64,
}

/// Presence and bounds checks for every inbound request. Runs before any
/// provider is touched.
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_questions: i64,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            max_questions: MAX_NUM_QUESTIONS,
        }
    }

    /// Both fields must be present first; then the mode is parsed, then
    /// the history is checked.
    pub fn prompt_request<'a>(&self, req: &'a PromptRequest) -> Result<(&'a str, Mode)> {
        let (Some(prompt), Some(mode)) = (non_blank(&req.prompt), non_blank(&req.mode)) else {
            return Err(AgentError::validation("Prompt and mode are required."));
        };
        let mode = mode.parse::<Mode>()?;
        self.history(&req.history)?;
        Ok((prompt, mode))
    }

    pub fn chat_request<'a>(&self, req: &'a ChatRequest) -> Result<&'a str> {
        let message =
            non_blank(&req.message).ok_or_else(|| AgentError::validation("Message is required."))?;
        self.history(&req.history)?;
        Ok(message)
    }

    /// Prior turns alternate user and assistant starting with the user, so a
    /// valid history has an even length and ends on an assistant reply.
    pub fn history(&self, history: &[String]) -> Result<()> {
        if history.iter().any(|turn| turn.trim().is_empty()) {
            return Err(AgentError::validation("History entries must not be empty."));
        }
        if history.len() % 2 != 0 {
            return Err(AgentError::validation(
                "History must alternate user and assistant turns and end with an assistant reply.",
            ));
        }
        Ok(())
    }

    pub fn assessment_request<'a>(&self, req: &'a AssessmentRequest) -> Result<AssessmentSpec<'a>> {
        let fields = (
            non_blank(&req.topic),
            non_blank(&req.grade),
            non_blank(&req.subject),
            non_blank(&req.curriculum),
        );
        let (Some(topic), Some(grade), Some(subject), Some(curriculum)) = fields else {
            return Err(AgentError::validation(
                "Topic, grade, subject and curriculum are required.",
            ));
        };

        let num_questions = req.num_questions.unwrap_or(DEFAULT_NUM_QUESTIONS);
        if !(1..=self.max_questions).contains(&num_questions) {
            return Err(AgentError::validation(format!(
                "num_questions must be between 1 and {}.",
                self.max_questions
            )));
        }

        Ok(AssessmentSpec {
            topic,
            grade,
            subject,
            curriculum,
            num_questions,
        })
    }

    pub fn feedback_request<'a>(&self, req: &'a FeedbackRequest) -> Result<(&'a str, &'a str)> {
        match (non_blank(&req.question), non_blank(&req.answer)) {
            (Some(question), Some(answer)) => Ok((question, answer)),
            _ => Err(AgentError::validation("Question and answer are required.")),
        }
    }

    pub fn evaluate_request<'a>(&self, req: &'a EvaluateRequest) -> Result<(&'a str, &'a str)> {
        match (non_blank(&req.answer), non_blank(&req.correct_answer)) {
            (Some(answer), Some(correct)) => Ok((answer, correct)),
            _ => Err(AgentError::validation(
                "Answer and correct_answer are required.",
            )),
        }
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
