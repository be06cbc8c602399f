mod common;

use serde_json::{json, Value};

use common::{sample_user, sign_in, test_app, MockApi};
use cozylms_client::models::Quiz;
use cozylms_client::scoring::{ClientScoreReason, ScoreSource};
use cozylms_client::ClientError;

fn quiz_json(id: &str, question_count: usize) -> Value {
    let questions: Vec<Value> = (0..question_count)
        .map(|i| {
            json!({
                "question": format!("Question {}", i + 1),
                "options": ["A", "B", "C", "D"],
                "correctAnswer": 0
            })
        })
        .collect();
    json!({ "_id": id, "courseId": "c1", "questions": questions })
}

fn quiz(id: &str, question_count: usize) -> Quiz {
    serde_json::from_value(quiz_json(id, question_count)).unwrap()
}

/// `count` correct picks (index 0), the rest wrong (index 1).
fn picks(total: usize, correct: usize) -> Vec<Option<usize>> {
    (0..total)
        .map(|i| if i < correct { Some(0) } else { Some(1) })
        .collect()
}

#[tokio::test]
async fn test_fetch_quiz_returns_none_when_course_has_none() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    // Unstubbed: the mock answers with the backend's "no quiz" envelope.
    let quiz = app.quiz.fetch_quiz("c1").await.unwrap();
    assert!(quiz.is_none());
}

#[tokio::test]
async fn test_fetch_quiz_decodes_wrapped_quiz() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    mock.stub(
        "GET",
        "/quiz/c1",
        json!({ "success": true, "quiz": quiz_json("q1", 4) }),
    );

    let quiz = app.quiz.fetch_quiz("c1").await.unwrap().unwrap();
    assert_eq!(quiz.id, "q1");
    assert_eq!(quiz.question_count(), 4);
}

#[tokio::test]
async fn test_unverified_user_cannot_take_quizzes() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", false)).await;

    let err = app.quiz.fetch_quiz("c1").await.unwrap_err();
    assert!(matches!(err, ClientError::VerificationRequired));
}

#[tokio::test]
async fn test_submit_uses_positive_server_score() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    mock.stub(
        "POST",
        "/quiz/submit/q1",
        json!({ "success": true, "score": 100 }),
    );
    mock.stub(
        "POST",
        "/auth/get-user-data",
        json!({ "success": true, "user": sample_user("u1", true) }),
    );
    mock.stub("POST", "/user/updateBadge", json!({ "success": true }));

    let outcome = app.quiz.submit(&quiz("q1", 4), &picks(4, 4)).await.unwrap();

    assert_eq!(outcome.score, 100);
    assert!(outcome.passed);
    assert_eq!(outcome.xp_awarded, 150);
    assert!(matches!(outcome.source, ScoreSource::Server));

    // An acked submit triggers the user refresh and the league recheck.
    assert_eq!(mock.calls_to("POST", "/auth/get-user-data"), 1);
    assert_eq!(mock.calls_to("POST", "/user/updateBadge"), 1);

    let submit = mock
        .requests()
        .into_iter()
        .find(|r| r.path == "/quiz/submit/q1")
        .unwrap();
    assert_eq!(submit.body["answers"], json!([0, 0, 0, 0]));
}

#[tokio::test]
async fn test_submit_falls_back_to_reference_when_score_missing() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    mock.stub("POST", "/quiz/submit/q1", json!({ "success": true }));
    mock.stub(
        "POST",
        "/auth/get-user-data",
        json!({ "success": true, "user": sample_user("u1", true) }),
    );
    mock.stub("POST", "/user/updateBadge", json!({ "success": true }));

    let outcome = app.quiz.submit(&quiz("q1", 5), &picks(5, 3)).await.unwrap();

    assert_eq!(outcome.score, 60);
    assert!(!outcome.passed);
    assert_eq!(outcome.xp_awarded, 0);
    assert!(matches!(
        outcome.source,
        ScoreSource::Client(ClientScoreReason::MissingServerScore)
    ));
}

#[tokio::test]
async fn test_submit_overrides_server_zero_with_reference() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    mock.stub(
        "POST",
        "/quiz/submit/q1",
        json!({ "success": true, "score": 0 }),
    );
    mock.stub(
        "POST",
        "/auth/get-user-data",
        json!({ "success": true, "user": sample_user("u1", true) }),
    );
    mock.stub("POST", "/user/updateBadge", json!({ "success": true }));

    let outcome = app.quiz.submit(&quiz("q1", 5), &picks(5, 4)).await.unwrap();

    assert_eq!(outcome.score, 80);
    assert!(outcome.passed);
    assert!(matches!(
        outcome.source,
        ScoreSource::Client(ClientScoreReason::ServerReportedZero)
    ));
}

#[tokio::test]
async fn test_submit_failure_still_yields_outcome() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    // Unstubbed submit: the server refuses, the local reference stands.
    let outcome = app.quiz.submit(&quiz("q1", 5), &picks(5, 3)).await.unwrap();

    assert_eq!(outcome.score, 60);
    assert!(matches!(
        outcome.source,
        ScoreSource::Client(ClientScoreReason::SubmitFailed)
    ));

    // Without an ack there is nothing to settle.
    assert_eq!(mock.calls_to("POST", "/auth/get-user-data"), 0);
    assert_eq!(mock.calls_to("POST", "/user/updateBadge"), 0);
}

#[tokio::test]
async fn test_submit_rejects_incomplete_selection() {
    let mock = MockApi::spawn().await;
    let (app, _storage) = test_app(&mock);
    sign_in(&app, &mock, sample_user("u1", true)).await;

    let mut selected = picks(4, 4);
    selected[2] = None;

    let err = app.quiz.submit(&quiz("q1", 4), &selected).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(mock.calls_to("POST", "/quiz/submit/q1"), 0);
}
