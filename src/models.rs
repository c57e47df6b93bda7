use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AgentError;

/// What `/ai-agent/` should do with a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    PreBuilt,
    AiGenerated,
    TeacherContributed,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::PreBuilt => "pre-built",
            Mode::AiGenerated => "ai-generated",
            Mode::TeacherContributed => "teacher-contributed",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pre-built" => Ok(Mode::PreBuilt),
            "ai-generated" => Ok(Mode::AiGenerated),
            "teacher-contributed" => Ok(Mode::TeacherContributed),
            _ => Err(AgentError::validation(
                "Invalid mode. Use 'pre-built', 'ai-generated', or 'teacher-contributed'.",
            )),
        }
    }
}

/// Classified purpose of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    GenerateAssessment,
    EvaluateAnswer,
    Chat,
}

/// `type` field of a chat reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Assessment,
    Chat,
    Evaluation,
}

impl From<Intent> for ChatKind {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::GenerateAssessment => ChatKind::Assessment,
            Intent::EvaluateAnswer => ChatKind::Evaluation,
            Intent::Chat => ChatKind::Chat,
        }
    }
}

/// Accepts `5`, `5.0` or `"5"`; front ends disagree on how to send counts.
fn deserialize_flexible_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        String(String),
    }

    match Option::<FlexibleInt>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlexibleInt::Int(i)) => Ok(Some(i)),
        Some(FlexibleInt::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
        Some(FlexibleInt::Float(f)) => Err(serde::de::Error::custom(format!(
            "expected a whole number, got {f}"
        ))),
        Some(FlexibleInt::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Request bodies keep required fields optional so a missing field becomes a
// 400 with a readable message instead of a bare deserialization error.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptRequest {
    #[serde(default, alias = "text")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub curriculum: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_int")]
    pub num_questions: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
}

/// `/ai-agent/` reply: text for generated or placeholder answers, a list
/// for pre-built questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentReply {
    Text(String),
    Questions(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResponse {
    pub response: AgentReply,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentResponse {
    pub questions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResponse {
    pub correct: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_parse_is_trimmed_and_case_insensitive() {
        assert_eq!(" AI-Generated ".parse::<Mode>().unwrap(), Mode::AiGenerated);
        assert_eq!("pre-built".parse::<Mode>().unwrap(), Mode::PreBuilt);
        assert!(matches!(
            "prebuilt".parse::<Mode>(),
            Err(AgentError::Validation(_))
        ));
    }

    #[test]
    fn test_agent_reply_serializes_untagged() {
        let text = AgentResponse {
            response: AgentReply::Text("hi".to_string()),
        };
        let list = AgentResponse {
            response: AgentReply::Questions(vec!["q1".to_string()]),
        };
        assert_eq!(serde_json::to_value(text).unwrap(), json!({"response": "hi"}));
        assert_eq!(serde_json::to_value(list).unwrap(), json!({"response": ["q1"]}));
    }

    #[test]
    fn test_chat_response_uses_type_key() {
        let reply = ChatResponse {
            kind: ChatKind::Evaluation,
            response: "ok".to_string(),
        };
        assert_eq!(
            serde_json::to_value(reply).unwrap(),
            json!({"type": "evaluation", "response": "ok"})
        );
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let req: PromptRequest = serde_json::from_value(json!({"prompt": "math"})).unwrap();
        assert_eq!(req.prompt.as_deref(), Some("math"));
        assert!(req.mode.is_none());
        assert!(req.history.is_empty());

        let aliased: PromptRequest =
            serde_json::from_value(json!({"text": "math", "mode": "pre-built"})).unwrap();
        assert_eq!(aliased.prompt.as_deref(), Some("math"));

        let chat: ChatRequest = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert!(chat.history.is_empty());
    }

    #[test]
    fn test_num_questions_accepts_flexible_shapes() {
        for raw in [json!(7), json!(7.0), json!("7"), json!(" 7 ")] {
            let req: AssessmentRequest =
                serde_json::from_value(json!({"num_questions": raw})).unwrap();
            assert_eq!(req.num_questions, Some(7));
        }
        let absent: AssessmentRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.num_questions, None);
        let null: AssessmentRequest =
            serde_json::from_value(json!({"num_questions": null})).unwrap();
        assert_eq!(null.num_questions, None);
        assert!(serde_json::from_value::<AssessmentRequest>(json!({"num_questions": "five"})).is_err());
        assert!(serde_json::from_value::<AssessmentRequest>(json!({"num_questions": 2.9})).is_err());
    }

    #[test]
    fn test_evaluation_omits_correct_answer_when_right() {
        let right = EvaluationResponse {
            correct: true,
            response: "✅ Correct!".to_string(),
            correct_answer: None,
        };
        assert_eq!(
            serde_json::to_value(right).unwrap(),
            json!({"correct": true, "response": "✅ Correct!"})
        );
    }
}
