use serde::{Deserialize, Serialize};

/// Quiz for a course, as served by `GET /quiz/{courseId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "courseId", default)]
    pub course_id: String,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// One question. The field carrying the correct option index is not stable
/// across backend versions, so everything beyond the prompt and options is
/// kept verbatim in `extra`; [`crate::scoring`] resolves it from there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body for `POST /quiz/submit/{quizId}`.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmission {
    pub answers: Vec<usize>,
}
