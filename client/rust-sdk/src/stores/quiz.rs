use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Quiz, QuizSubmission};
use crate::scoring::{self, QuizOutcome};
use crate::stores::AuthStore;

/// Quiz loading and submission. Stateless: the quiz in play belongs to the
/// caller, and outcomes are returned rather than held. The score policy
/// itself lives in [`crate::scoring`].
pub struct QuizStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
}

impl QuizStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        QuizStore { api, auth }
    }

    /// Loads the quiz for a course. `Ok(None)` when the course has none: the
    /// backend answers that case with an error envelope, which is not an
    /// error for the caller. Transport failures still surface.
    pub async fn fetch_quiz(&self, course_id: &str) -> Result<Option<Quiz>, ClientError> {
        self.auth.require_verified_user()?;

        match self.api.get(&format!("quiz/{}", course_id)).await {
            Ok(body) => Ok(Some(decode_quiz(&body)?)),
            Err(ClientError::Api { message }) => {
                tracing::debug!("No quiz for course {}: {}", course_id, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Submits a selection. Once local validation passes the caller always
    /// gets an outcome: the server's score when one can be probed out of the
    /// response, the locally computed reference when it cannot, zero as the
    /// last resort. Only validation problems and the verification gate are
    /// errors here.
    pub async fn submit(
        &self,
        quiz: &Quiz,
        selected: &[Option<usize>],
    ) -> Result<QuizOutcome, ClientError> {
        self.auth.require_verified_user()?;
        let answers = scoring::validate_answers(quiz, selected)?;
        let reference = scoring::reference_score(quiz, &answers);

        let submission = QuizSubmission { answers };
        let acked;
        let (score, source) = match self
            .api
            .post(&format!("quiz/submit/{}", quiz.id), &submission)
            .await
        {
            Ok(body) => {
                acked = true;
                scoring::reconcile(scoring::extract_server_score(&body), reference)
            }
            Err(e) => {
                acked = false;
                tracing::warn!("Quiz submission failed, falling back to local score: {}", e);
                scoring::submit_failure_score(reference)
            }
        };

        let outcome = QuizOutcome::from_score(score, source);
        tracing::info!(
            score = outcome.score,
            passed = outcome.passed,
            "Quiz {} scored via {:?}",
            quiz.id,
            outcome.source
        );

        if acked {
            self.settle_after_submit().await;
        }
        Ok(outcome)
    }

    /// Post-submit bookkeeping: the server moved XP during the submit, so
    /// re-fetch the user and ask for a league recheck. Failures here only get
    /// logged; the outcome already stands.
    async fn settle_after_submit(&self) {
        if let Err(e) = self.auth.refresh_user().await {
            tracing::debug!("User refresh after quiz submit failed: {}", e);
            return;
        }
        if let Err(e) = self.auth.update_badge().await {
            tracing::debug!("Badge update after quiz submit failed: {}", e);
        }
    }
}

fn decode_quiz(body: &Value) -> Result<Quiz, ClientError> {
    let candidate = body
        .get("quiz")
        .or_else(|| body.get("data"))
        .unwrap_or(body);

    if candidate.get("_id").is_none() {
        return Err(ClientError::shape("no quiz object in response"));
    }

    serde_json::from_value(candidate.clone())
        .map_err(|e| ClientError::shape(format!("quiz object did not decode: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_quiz_accepts_wrapped_and_bare_objects() {
        let quiz = json!({
            "_id": "q1",
            "courseId": "c1",
            "questions": [
                { "question": "Who built the ark?", "options": ["Noah", "Moses"], "correctAnswer": 0 }
            ]
        });

        let wrapped = json!({ "success": true, "quiz": quiz });
        assert_eq!(decode_quiz(&wrapped).unwrap().id, "q1");

        let bare = decode_quiz(&quiz).unwrap();
        assert_eq!(bare.question_count(), 1);
    }

    #[test]
    fn test_decode_quiz_rejects_ack_only_bodies() {
        let body = json!({ "success": true });
        assert!(decode_quiz(&body).is_err());
    }
}
