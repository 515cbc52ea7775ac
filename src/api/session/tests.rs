use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn student_takes_exam_end_to_end() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let coordinator = test_support::insert_coordinator(pool, "coord").await;
    let student = test_support::insert_student(pool, "Abebe Kebede", "UGR/1234/15").await;
    let exam = test_support::insert_exam(pool, &coordinator.id, "Geography").await;
    let first = test_support::insert_question_with_choices(
        pool,
        &exam.id,
        "Capital of France?",
        &[("Paris", true), ("London", false)],
    )
    .await;
    let second = test_support::insert_question_with_choices(
        pool,
        &exam.id,
        "Capital of Kenya?",
        &[("Lagos", false), ("Nairobi", true)],
    )
    .await;
    let token = test_support::student_token(&ctx, &student).await;
    let typed_code = exam.access_code.as_deref().expect("access code").to_lowercase();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/student/exams", Some(&token), None))
        .await
        .expect("available");
    let available = test_support::read_json(response).await;
    assert_eq!(available[0]["id"], exam.id.as_str());
    assert!(available[0].get("access_code").is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/student/exams/{}/enter", exam.id),
            Some(&token),
            Some(json!({ "access_code": format!("  {typed_code} ") })),
        ))
        .await
        .expect("enter");
    assert_eq!(response.status(), StatusCode::OK);
    let step = test_support::read_json(response).await;
    assert_eq!(step["kind"], "question");
    assert_eq!(step["index"], 0);
    assert_eq!(step["total"], 2);
    assert_eq!(step["question_id"], first.question.id.as_str());
    assert!(step["choices"][0].get("is_answer").is_none());

    for (question, choice) in [(&first, &first.choices[0]), (&second, &second.choices[0])] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/student/exams/{}/answers", exam.id),
                Some(&token),
                Some(json!({
                    "question_id": question.question.id,
                    "choice_id": choice.id,
                    "flagged": false,
                    "next_index": 1
                })),
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::OK);
        let saved = test_support::read_json(response).await;
        assert_eq!(saved["saved"], true);
        assert!(saved.get("is_correct").is_none());
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/student/exams/{}/questions/1", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("revisit");
    let step = test_support::read_json(response).await;
    assert_eq!(step["selected_choice_id"], second.choices[0].id.as_str());
    assert_eq!(step["answered_indices"], json!([0, 1]));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/student/exams/{}/result", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("result");
    assert_eq!(response.status(), StatusCode::OK);
    let result = test_support::read_json(response).await;
    assert_eq!(result["score"], 1.0);
    assert_eq!(result["total_questions"], 2);
    assert_eq!(result["taken_exam"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/student/exams/{}/questions/0", exam.id),
            Some(&token),
            None,
        ))
        .await
        .expect("after finish");
    let step = test_support::read_json(response).await;
    assert_eq!(step["kind"], "result");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/student/exams/{}/answers", exam.id),
            Some(&token),
            Some(json!({
                "question_id": second.question.id,
                "choice_id": second.choices[1].id,
                "next_index": 2
            })),
        ))
        .await
        .expect("late submit");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/student/results", Some(&token), None))
        .await
        .expect("history");
    let history = test_support::read_json(response).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/student/results/latest",
            Some(&token),
            None,
        ))
        .await
        .expect("latest");
    let latest = test_support::read_json(response).await;
    assert_eq!(latest["exam_id"], exam.id.as_str());
    assert_eq!(latest["score"], 1.0);
}

#[tokio::test]
async fn wrong_access_code_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let coordinator = test_support::insert_coordinator(ctx.state.db(), "coord").await;
    let student = test_support::insert_student(ctx.state.db(), "Abebe Kebede", "UGR/1234/15").await;
    let exam = test_support::insert_exam(ctx.state.db(), &coordinator.id, "Geography").await;
    let token = test_support::student_token(&ctx, &student).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/student/exams/{}/enter", exam.id),
            Some(&token),
            Some(json!({ "access_code": "NOPE" })),
        ))
        .await
        .expect("enter");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latest_result_without_activity_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "Abebe Kebede", "UGR/1234/15").await;
    let token = test_support::student_token(&ctx, &student).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/student/results/latest",
            Some(&token),
            None,
        ))
        .await
        .expect("latest");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn coordinators_cannot_use_student_area() {
    let ctx = test_support::setup_test_context().await;
    let coordinator = test_support::insert_coordinator(ctx.state.db(), "coord").await;
    let token = test_support::coordinator_token(&ctx, &coordinator);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/student/exams", Some(&token), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
