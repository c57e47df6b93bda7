//! Prompt text sent to providers. Plain string interpolation only.

use crate::models::AssessmentRequest;

/// Topic used when an ai-generated prompt is too short to be a topic.
pub const GENERAL_KNOWLEDGE_TOPIC: &str = "general knowledge";

pub const ACKNOWLEDGMENT_REPLY: &str =
    "You're welcome! Let me know if you need help with anything else. 😊";

const ACKNOWLEDGMENTS: [&str; 8] = [
    "ok",
    "okay",
    "thanks",
    "thank you",
    "cool",
    "great",
    "alright",
    "got it",
];

pub const TUTOR_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for the ASSESSA.AI student dashboard. \
Help students understand their subjects and use the platform's features: assessments, progress, \
study plan, feedback and the problem solving agent. Use short, simple language (2-4 sentences) \
and do not invent scores, feedback or test results.";

const EVALUATION_SYSTEM_PROMPT: &str = "You are an experienced school teacher checking a student's answer. \
Say whether the answer is correct, give the correct answer if it is not, and explain briefly.";

/// True when the whole message is a bare acknowledgment like "thanks".
pub fn is_acknowledgment(message: &str) -> bool {
    let text = message.trim().to_lowercase();
    ACKNOWLEDGMENTS.contains(&text.as_str())
}

pub fn assessment_instruction(topic: &str) -> String {
    format!(
        "Generate a detailed assessment with 5 multiple choice questions on the topic: {topic}. \
         Each question must include 4 answer options, clearly highlight the correct answer, \
         and ensure the content is appropriate for school-level students."
    )
}

pub fn teacher_contributed_placeholder(cleaned: &str) -> String {
    format!("👩‍🏫 Teacher-created assessments for '{cleaned}' are coming soon!")
}

/// `num_questions` is expected to be validated already.
pub fn generate_assessment_prompt(req: &AssessmentRequest, num_questions: i64) -> String {
    let field = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();
    format!(
        "Generate {num_questions} multiple choice questions for grade {grade} {subject} \
         following the {curriculum} curriculum on the topic: {topic}. \
         Number each question, give 4 options labelled A to D, \
         and state the correct answer after each question.",
        grade = field(&req.grade),
        subject = field(&req.subject),
        curriculum = field(&req.curriculum),
        topic = field(&req.topic),
    )
}

pub fn feedback_prompt(question: &str, answer: &str) -> String {
    format!(
        "Evaluate the student's answer to the following question.\nQuestion: {question}\nAnswer: {answer}\nGive detailed feedback."
    )
}

pub fn evaluation_system_prompt() -> &'static str {
    EVALUATION_SYSTEM_PROMPT
}

pub fn evaluation_prompt(message: &str) -> String {
    format!("Check the student's answer and explain whether it is correct.\nStudent: {message}")
}
