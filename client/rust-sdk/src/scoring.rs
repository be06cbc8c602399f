use serde_json::Value;

use crate::error::ClientError;
use crate::models::{Quiz, QuizQuestion};

/// Minimum percentage counted as a pass.
pub const PASS_THRESHOLD: u8 = 80;

/// XP shown for a passed quiz. The backend awards the real amount.
pub const QUIZ_XP_REWARD: u32 = 150;

/// Field names that may carry the correct option index on a question object,
/// in priority order. The first present (non-null) field wins; later
/// candidates are not consulted even if the winner fails to parse.
pub const CORRECT_FIELD_CANDIDATES: &[&str] =
    &["correctAnswer", "correctIndex", "correct", "answer"];

/// One way of reading a score out of a submit response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreProbe {
    /// Top-level numeric field, already a percentage.
    Field(&'static str),
    /// Percentage nested one level down.
    Nested(&'static str, &'static str),
    /// Correct/total pair to compute a percentage from.
    Ratio {
        correct: &'static str,
        total: &'static str,
    },
}

/// Probes tried against a submit response, in priority order. Evaluation
/// stops at the first probe that yields a finite number.
pub const SCORE_PROBES: &[ScoreProbe] = &[
    ScoreProbe::Field("score"),
    ScoreProbe::Field("percentage"),
    ScoreProbe::Nested("result", "score"),
    ScoreProbe::Nested("result", "percentage"),
    ScoreProbe::Ratio {
        correct: "correct",
        total: "total",
    },
    ScoreProbe::Ratio {
        correct: "correctAnswers",
        total: "totalQuestions",
    },
];

impl ScoreProbe {
    fn extract(&self, response: &Value) -> Option<f64> {
        match self {
            ScoreProbe::Field(name) => value_as_number(response.get(*name)?),
            ScoreProbe::Nested(outer, inner) => {
                value_as_number(response.get(*outer)?.get(*inner)?)
            }
            ScoreProbe::Ratio { correct, total } => {
                let correct = value_as_number(response.get(*correct)?)?;
                let total = value_as_number(response.get(*total)?)?;
                if total > 0.0 {
                    Some(correct / total * 100.0)
                } else {
                    None
                }
            }
        }
    }
}

/// Where a displayed score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// The backend's number was used.
    Server,
    /// The locally computed reference was used.
    Client(ClientScoreReason),
    /// Neither side produced a number; the score defaulted to 0.
    Unscored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientScoreReason {
    /// No probe matched the submit response.
    MissingServerScore,
    /// The backend reported 0 while the reference was positive.
    ServerReportedZero,
    /// The submit request never completed.
    SubmitFailed,
}

/// Result the caller renders after a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    pub score: u8,
    pub passed: bool,
    pub xp_awarded: u32,
    pub source: ScoreSource,
}

impl QuizOutcome {
    pub fn from_score(score: u8, source: ScoreSource) -> Self {
        let passed = score >= PASS_THRESHOLD;
        QuizOutcome {
            score,
            passed,
            xp_awarded: if passed { QUIZ_XP_REWARD } else { 0 },
            source,
        }
    }
}

/// Checks a selection against the quiz before anything is sent: one answer
/// per question, every question answered, every index within its options.
pub fn validate_answers(
    quiz: &Quiz,
    selected: &[Option<usize>],
) -> Result<Vec<usize>, ClientError> {
    if selected.len() != quiz.questions.len() {
        return Err(ClientError::validation(format!(
            "Expected {} answers, got {}",
            quiz.questions.len(),
            selected.len()
        )));
    }

    let mut answers = Vec::with_capacity(selected.len());
    for (index, (question, choice)) in quiz.questions.iter().zip(selected).enumerate() {
        let answer = choice.ok_or_else(|| {
            ClientError::validation(format!("Question {} has no answer selected", index + 1))
        })?;
        if answer >= question.options.len() {
            return Err(ClientError::validation(format!(
                "Answer for question {} is out of range",
                index + 1
            )));
        }
        answers.push(answer);
    }
    Ok(answers)
}

/// Resolves the correct option index for a question from whichever candidate
/// field the backend attached. `None` when no candidate is present or the
/// winning field does not parse as an index.
pub fn resolve_correct_index(question: &QuizQuestion) -> Option<usize> {
    let field = CORRECT_FIELD_CANDIDATES
        .iter()
        .find_map(|name| question.extra.get(*name).filter(|value| !value.is_null()));
    value_as_index(field?)
}

/// Locally computed score: `round(100 * correct / questions)`. Questions
/// whose correct index cannot be resolved count as incorrect. `None` when
/// nothing resolves at all (or the quiz has no questions), meaning no
/// reference can be derived.
pub fn reference_score(quiz: &Quiz, answers: &[usize]) -> Option<u8> {
    if quiz.questions.is_empty() {
        return None;
    }

    let mut resolved_any = false;
    let mut correct = 0usize;
    for (question, submitted) in quiz.questions.iter().zip(answers) {
        if let Some(correct_index) = resolve_correct_index(question) {
            resolved_any = true;
            if correct_index == *submitted {
                correct += 1;
            }
        }
    }

    if !resolved_any {
        return None;
    }
    Some(percentage(correct, quiz.questions.len()))
}

/// Runs [`SCORE_PROBES`] against a submit response. Non-finite values and
/// non-numeric strings never match, so a NaN-ish server score reads as absent.
pub fn extract_server_score(response: &Value) -> Option<f64> {
    SCORE_PROBES.iter().find_map(|probe| probe.extract(response))
}

/// Decides the displayed score. A positive server score always wins. A server
/// zero against a positive reference is overridden and logged: historically
/// that combination has meant a server-side computation bug, and a genuine 0%
/// is indistinguishable from it.
pub fn reconcile(server: Option<f64>, reference: Option<u8>) -> (u8, ScoreSource) {
    match server {
        // The backend's number is trusted for which side wins, not for its
        // range; anything outside 0..=100 is clamped before display.
        Some(s) if s > 0.0 => (s.round().clamp(0.0, 100.0) as u8, ScoreSource::Server),
        Some(_) => match reference {
            Some(r) if r > 0 => {
                tracing::warn!(
                    reference = r,
                    "server reported a zero score, overriding with locally computed reference"
                );
                (r, ScoreSource::Client(ClientScoreReason::ServerReportedZero))
            }
            _ => (0, ScoreSource::Server),
        },
        None => match reference {
            Some(r) => (r, ScoreSource::Client(ClientScoreReason::MissingServerScore)),
            None => (0, ScoreSource::Unscored),
        },
    }
}

/// Score shown when the submit request itself failed: the reference if one
/// exists, otherwise the failing default.
pub fn submit_failure_score(reference: Option<u8>) -> (u8, ScoreSource) {
    match reference {
        Some(r) => (r, ScoreSource::Client(ClientScoreReason::SubmitFailed)),
        None => (0, ScoreSource::Unscored),
    }
}

/// `round(100 * part / whole)` with the zero-denominator case pinned to 0.
pub fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

fn value_as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                usize::try_from(u).ok()
            } else {
                n.as_f64().and_then(|f| {
                    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
                        Some(f as usize)
                    } else {
                        None
                    }
                })
            }
        }
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
