use std::collections::BTreeMap;

/// Returned for a subject with no pre-built questions.
pub const NO_PRE_BUILT_QUESTIONS: &str = "❗ No pre-built questions available for this subject.";

/// Fixed questions per subject, keyed by lowercased subject name.
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct AssessmentStore {
    subjects: BTreeMap<String, Vec<String>>,
}

impl AssessmentStore {
    pub fn builtin() -> Self {
        let mut subjects = BTreeMap::new();
        subjects.insert(
            "math".to_string(),
            vec![
                "Solve x in 2x + 5 = 15".to_string(),
                "Find the area of a triangle with base 10 and height 5".to_string(),
            ],
        );
        subjects.insert(
            "science".to_string(),
            vec![
                "Describe Newton's First Law".to_string(),
                "Explain the process of photosynthesis".to_string(),
            ],
        );
        Self { subjects }
    }

    /// Built-in table with `extra` merged over it. Extra subject names are
    /// normalized to lowercase; empty lists are ignored.
    pub fn with_extra(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut store = Self::builtin();
        for (subject, questions) in extra {
            let key = subject.trim().to_lowercase();
            if key.is_empty() || questions.is_empty() {
                tracing::warn!("Skipping empty pre-built entry '{}'", subject);
                continue;
            }
            store.subjects.insert(key, questions.clone());
        }
        tracing::info!("Pre-built assessment table has {} subjects", store.subjects.len());
        store
    }

    pub fn get(&self, subject: &str) -> Option<&[String]> {
        self.subjects.get(subject).map(Vec::as_slice)
    }

    /// Questions for `subject`, or the single-entry sentinel list.
    pub fn questions_or_sentinel(&self, subject: &str) -> Vec<String> {
        self.get(subject)
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| vec![NO_PRE_BUILT_QUESTIONS.to_string()])
    }

    pub fn subjects(&self) -> &BTreeMap<String, Vec<String>> {
        &self.subjects
    }
}

impl Default for AssessmentStore {
    fn default() -> Self {
        Self::builtin()
    }
}
