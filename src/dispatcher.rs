use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, RoutingConfig};
use crate::error::Result;
use crate::intent::{IntentParser, KeywordIntent};
use crate::models::{
    AgentReply, AgentResponse, AssessmentRequest, AssessmentResponse, ChatKind, ChatRequest,
    ChatResponse, EvaluateRequest, EvaluationResponse, FeedbackRequest, FeedbackResponse, Intent,
    Mode, PromptRequest,
};
use crate::prompts;
use crate::providers::{GenerationParams, ProviderRegistry, ProviderRequest, Turn};
use crate::store::AssessmentStore;
use crate::validation::InputValidator;

const CORRECT_REPLY: &str = "✅ Correct!";
const INCORRECT_REPLY: &str = "❌ Incorrect.";

/// Trim, keep ASCII letters, digits and whitespace, collapse whitespace
/// runs to one space, lowercase.
pub fn clean_prompt(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Turns validated requests into provider calls or local answers. Holds no
/// per-request state; one instance serves every request.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    store: AssessmentStore,
    validator: InputValidator,
    intent: Box<dyn IntentParser>,
    routing: RoutingConfig,
    params: GenerationParams,
}

impl Dispatcher {
    pub fn new(registry: Arc<ProviderRegistry>, config: &Config) -> Self {
        Self {
            registry,
            store: AssessmentStore::with_extra(&config.pre_built),
            validator: InputValidator::new(),
            intent: Box::new(KeywordIntent::new()),
            routing: config.routing,
            params: config.generation,
        }
    }

    pub fn with_intent_parser(mut self, parser: Box<dyn IntentParser>) -> Self {
        self.intent = parser;
        self
    }

    /// `/ai-agent/`: static lookup, provider-generated assessment or a
    /// placeholder, depending on the mode.
    pub async fn handle_prompt(&self, req: &PromptRequest) -> Result<AgentResponse> {
        let (prompt, mode) = self.validator.prompt_request(req)?;
        let cleaned = clean_prompt(prompt);
        tracing::info!(mode = %mode, prompt = %cleaned, "Handling prompt");

        let response = match mode {
            Mode::PreBuilt => AgentReply::Questions(self.store.questions_or_sentinel(&cleaned)),
            Mode::AiGenerated => {
                let topic = if cleaned.split_whitespace().count() < 2 {
                    prompts::GENERAL_KNOWLEDGE_TOPIC
                } else {
                    cleaned.as_str()
                };
                let request = ProviderRequest::new(prompts::assessment_instruction(topic), self.params)
                    .with_history(Turn::alternating(&req.history));
                AgentReply::Text(self.registry.invoke(self.routing.ai_agent, &request).await?)
            }
            Mode::TeacherContributed => {
                AgentReply::Text(prompts::teacher_contributed_placeholder(&cleaned))
            }
        };
        Ok(AgentResponse { response })
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let message = self.validator.chat_request(req)?;

        if prompts::is_acknowledgment(message) {
            tracing::debug!("Acknowledgment message, answering locally");
            return Ok(ChatResponse {
                kind: ChatKind::Chat,
                response: prompts::ACKNOWLEDGMENT_REPLY.to_string(),
            });
        }

        let intent = self.intent.parse(message);
        let history = Turn::alternating(&req.history);
        let request = match intent {
            Intent::GenerateAssessment => {
                ProviderRequest::new(prompts::assessment_instruction(message), self.params)
            }
            Intent::EvaluateAnswer => {
                ProviderRequest::new(prompts::evaluation_prompt(message), self.params)
                    .with_system(prompts::evaluation_system_prompt())
                    .with_history(history)
            }
            Intent::Chat => ProviderRequest::new(message, self.params)
                .with_system(prompts::TUTOR_SYSTEM_PROMPT)
                .with_history(history),
        };

        let response = self.registry.invoke(self.routing.chat, &request).await?;
        Ok(ChatResponse {
            kind: intent.into(),
            response,
        })
    }

    pub async fn generate_assessment(&self, req: &AssessmentRequest) -> Result<AssessmentResponse> {
        let spec = self.validator.assessment_request(req)?;
        tracing::info!(
            subject = spec.subject,
            grade = spec.grade,
            num_questions = spec.num_questions,
            "Generating assessment"
        );
        let prompt = prompts::generate_assessment_prompt(req, spec.num_questions);
        let request = ProviderRequest::new(prompt, self.params);
        let questions = self.registry.invoke(self.routing.assessment, &request).await?;
        Ok(AssessmentResponse { questions })
    }

    pub async fn generate_feedback(&self, req: &FeedbackRequest) -> Result<FeedbackResponse> {
        let (question, answer) = self.validator.feedback_request(req)?;
        let request = ProviderRequest::new(prompts::feedback_prompt(question, answer), self.params);
        let feedback = self.registry.invoke(self.routing.feedback, &request).await?;
        Ok(FeedbackResponse { feedback })
    }

    /// Local comparison, trimmed and case-insensitive. No provider call.
    pub fn evaluate_answer(&self, req: &EvaluateRequest) -> Result<EvaluationResponse> {
        let (answer, correct_answer) = self.validator.evaluate_request(req)?;
        let correct = answer.to_lowercase() == correct_answer.to_lowercase();
        Ok(if correct {
            EvaluationResponse {
                correct,
                response: CORRECT_REPLY.to_string(),
                correct_answer: None,
            }
        } else {
            EvaluationResponse {
                correct,
                response: INCORRECT_REPLY.to_string(),
                correct_answer: Some(correct_answer.to_string()),
            }
        })
    }

    pub fn pre_built_catalog(&self) -> &BTreeMap<String, Vec<String>> {
        self.store.subjects()
    }
}
