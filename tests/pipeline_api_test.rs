mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::json;

use hiring_pipeline::utils::time::Clock;

use common::{correct_option, spawn_app, spawn_with};

#[tokio::test]
async fn junior_applicant_is_capped_below_forty() {
    let app = spawn_app().await;
    let (junior, _) = app.apply(1).await;
    let (senior, _) = app.apply(5).await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/candidates/{junior}"), Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "screening");
    assert!(body["screening"]["overall_score"].as_i64().unwrap() < 40);

    let (_, body) = app
        .send(Method::GET, &format!("/api/candidates/{senior}"), Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(body["screening"]["overall_score"], 82);
    assert_eq!(body["duplicate_of"], serde_json::Value::Null);
}

#[tokio::test]
async fn failed_aptitude_blocks_interview_with_threshold_error() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, key) = app.apply(1).await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/aptitude"),
            Some(maria.as_str()),
            Some(json!({ "start_at": app.at(Duration::hours(1)) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/exam/start"), None, None)
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["code"], "precondition_failed");

    app.clock.advance(Duration::hours(1));
    let (status, body) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/exam/start"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["status"], "in_progress");
    assert_eq!(body["questions"].as_array().unwrap().len(), 20);
    assert!(body["questions"][0].get("correct_index").is_none());

    for question_id in 1..=9u32 {
        let (status, _) = app
            .send(
                Method::PATCH,
                &format!("/api/public/candidates/{key}/exam/answer"),
                None,
                Some(json!({ "question_id": question_id, "option": correct_option(question_id) })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/exam/submit"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 45);
    assert_eq!(body["passed"], false);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/interview"),
            Some(maria.as_str()),
            Some(json!({ "scheduled_at": app.at(Duration::days(2)) })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "threshold_not_met");

    let (_, body) = app
        .send(Method::GET, &format!("/api/candidates/{id}"), Some(maria.as_str()), None)
        .await;
    assert_eq!(body["stage"], "aptitude_completed");
    assert_eq!(body["aptitude_score"], 45);
}

#[tokio::test]
async fn exam_grades_itself_when_time_is_up() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, key) = app.apply(2).await;

    app.send(
        Method::POST,
        &format!("/api/candidates/{id}/aptitude"),
        Some(maria.as_str()),
        Some(json!({ "start_at": app.at(Duration::minutes(5)) })),
    )
    .await;
    app.clock.advance(Duration::minutes(5));
    let (status, _) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/exam/start"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::minutes(20));
    let (status, body) = app.send(Method::GET, &format!("/api/public/candidates/{key}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "aptitude_completed");
    assert_eq!(body["exam"], json!({ "status": "completed", "score": 0 }));

    let (status, body) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/exam/submit"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 0);
    assert_eq!(body["already_submitted"], true);

    let notices = app.gateway.messages();
    assert_eq!(notices.len(), 3);
    assert!(notices[2].subject.contains("aptitude assessment result"));
}

#[tokio::test]
async fn senior_candidate_reaches_joining() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, key) = app.apply(6).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/interview"),
            Some(maria.as_str()),
            Some(json!({ "scheduled_at": app.at(Duration::minutes(45)) })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["interview"]["round"], 1);
    assert_eq!(body["candidate"]["owner_recruiter"], "maria");
    assert_eq!(body["notification"]["delivered"], true);

    let (_, portal) = app
        .send(Method::POST, "/api/public/login", None, Some(json!({ "access_key": key.to_lowercase() })))
        .await;
    assert_eq!(portal["interview_soon"], true);
    assert!(portal["interview"]["meeting_link"].as_str().unwrap().starts_with("https://meet.jit.si/"));
    assert!(portal.get("rejection_reason").is_none());
    assert!(portal.get("screening").is_none());

    let (status, _) = app
        .send(Method::POST, &format!("/api/candidates/{id}/select"), Some(maria.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let joining = (app.clock.now().date_naive() + Duration::days(14)).to_string();
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/joining"),
            Some(maria.as_str()),
            Some(json!({ "joining_date": joining })),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED, "{body}");

    let (status, body) = app
        .send(Method::POST, &format!("/api/public/candidates/{key}/documents"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents_uploaded"], true);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/joining"),
            Some(maria.as_str()),
            Some(json!({ "joining_date": joining })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["stage"], "joining_scheduled");
}

#[tokio::test]
async fn rejection_reason_never_reaches_the_candidate() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, key) = app.apply(4).await;

    for days in [1, 2] {
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/api/candidates/{id}/interview"),
                Some(maria.as_str()),
                Some(json!({ "scheduled_at": app.at(Duration::days(days)) })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/interview"),
            Some(maria.as_str()),
            Some(json!({ "scheduled_at": app.at(Duration::days(3)) })),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED, "{body}");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/reject"),
            Some(maria.as_str()),
            Some(json!({ "reason": "weak system design" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["stage"], "rejected");
    assert_eq!(body["candidate"]["archived"], true);
    assert_eq!(body["candidate"]["rejection_reason"], "weak system design");

    let rejection = app.gateway.messages().pop().unwrap();
    assert!(rejection.body.contains("not be moving forward"));
    assert!(!rejection.body.contains("system design"));
    assert!(!rejection.subject.contains("system design"));

    let (status, body) = app.send(Method::GET, &format!("/api/public/candidates/{key}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_key");
}

#[tokio::test]
async fn unconfigured_mail_still_persists_the_application() {
    let app = spawn_with(false).await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/public/applications",
            None,
            Some(json!({
                "name": "Grace Hopper",
                "email": "grace@example.com",
                "role": "backend engineer",
                "resume_text": "Grace Hopper\nCompiler engineer with 9 years of systems work."
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notification"]["delivered"], false);
    assert!(body["notification"]["detail"].as_str().unwrap().contains("credentials missing"));

    let id = body["candidate_id"].as_str().unwrap();
    let (status, body) = app
        .send(Method::GET, &format!("/api/candidates/{id}"), Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["email_status"], "not_delivered");
    assert!(body["notification"]["email_error"].is_string());
}

#[tokio::test]
async fn identity_mismatch_is_refused() {
    let app = spawn_app().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/public/applications",
            None,
            Some(json!({
                "name": "Alan Turing",
                "email": "alan@example.com",
                "role": "Backend Engineer",
                "resume_text": "Grace Hopper\nCompiler engineer with 9 years of systems work."
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "identity_mismatch");

    let (_, list) = app
        .send(Method::GET, "/api/candidates", Some(app.admin_token.as_str()), None)
        .await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn second_recruiter_is_locked_out_but_super_admin_is_not() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let tom = app.recruiter("tom").await;
    let (id, _) = app.apply(5).await;

    app.send(
        Method::POST,
        &format!("/api/candidates/{id}/interview"),
        Some(maria.as_str()),
        Some(json!({ "scheduled_at": app.at(Duration::days(1)) })),
    )
    .await;

    let (status, body) = app
        .send(Method::POST, &format!("/api/candidates/{id}/select"), Some(tom.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ownership_conflict");

    let (status, body) = app
        .send(Method::POST, &format!("/api/candidates/{id}/select"), Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["stage"], "selected");
    assert_eq!(body["candidate"]["owner_recruiter"], "maria");

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/owner"),
            Some(maria.as_str()),
            Some(json!({ "username": "tom" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/owner"),
            Some(app.admin_token.as_str()),
            Some(json!({ "username": "tom" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["owner_recruiter"], "tom");

    let (_, owned) = app
        .send(Method::GET, "/api/candidates?owner=tom&stage=selected", Some(tom.as_str()), None)
        .await;
    assert_eq!(owned.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn archive_restore_and_purge() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (keep, _) = app.apply(3).await;
    let (gone, _) = app.apply(4).await;

    for id in [&keep, &gone] {
        let (status, _) = app
            .send(Method::POST, &format!("/api/candidates/{id}/archive"), Some(maria.as_str()), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app
        .send(Method::POST, &format!("/api/candidates/{keep}/restore"), Some(maria.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"]["stage"], "screening");
    assert_eq!(body["candidate"]["archived"], false);

    let (status, _) = app
        .send(Method::POST, "/api/candidates/purge", Some(maria.as_str()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/candidates/purge",
            Some(app.admin_token.as_str()),
            Some(json!({ "ids": [keep, gone] })),
        )
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (status, body) = app
        .send(Method::POST, "/api/candidates/purge", Some(app.admin_token.as_str()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purged"], 1);

    let (status, _) = app
        .send(Method::GET, &format!("/api/candidates/{gone}"), Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, remaining) = app
        .send(Method::GET, "/api/candidates", Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(remaining.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn past_schedule_is_a_validation_error() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, _) = app.apply(5).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/candidates/{id}/interview"),
            Some(maria.as_str()),
            Some(json!({ "scheduled_at": app.at(-Duration::minutes(1)) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (_, body) = app
        .send(Method::GET, &format!("/api/candidates/{id}"), Some(maria.as_str()), None)
        .await;
    assert_eq!(body["stage"], "screening");
    assert_eq!(body["owner_recruiter"], serde_json::Value::Null);
}

#[tokio::test]
async fn interview_assessment_feeds_the_leaderboard() {
    let app = spawn_app().await;
    let maria = app.recruiter("maria").await;
    let (id, key) = app.apply(6).await;
    let (other, _) = app.apply(4).await;

    let (status, _) = app
        .send(Method::GET, &format!("/api/public/candidates/{key}/assessment"), None, None)
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    app.send(
        Method::POST,
        &format!("/api/candidates/{id}/interview"),
        Some(maria.as_str()),
        Some(json!({ "scheduled_at": app.at(Duration::days(1)) })),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/public/candidates/{key}/assessment"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["questions"].as_array().unwrap().len(), 5);

    for index in 0..5 {
        let (status, body) = app
            .send(
                Method::POST,
                &format!("/api/public/candidates/{key}/assessment/answer"),
                None,
                Some(json!({ "question_index": index, "response": "I led the migration to Rust." })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["questions"][index]["feedback"], "Structured answer");
        assert!(body["questions"][index].get("score").is_none());
    }
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/public/candidates/{key}/assessment/answer"),
            None,
            Some(json!({ "question_index": 0, "response": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .send(Method::GET, "/api/candidates/leaderboard?limit=5", Some(maria.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["candidate_id"], id.as_str());
    assert_eq!(body[0]["rank"], 1);
    assert_eq!(body[0]["points"], 5 * 35 + 100);
    assert_eq!(body[1]["candidate_id"], other.as_str());
    assert_eq!(body[1]["points"], 0);
}

#[tokio::test]
async fn batch_screening_ranks_without_creating_candidates() {
    let app = spawn_app().await;
    let (status, jobs) = app
        .send(Method::GET, "/api/jobs", Some(app.admin_token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let job_id = jobs[0]["id"].as_str().unwrap().to_string();

    let resume = |name: &str, years: u32| format!("{name}\nEngineer with {years} years building Rust services.");
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/jobs/{job_id}/screen"),
            Some(app.admin_token.as_str()),
            Some(json!({ "resumes": [
                { "label": "grace", "resume_text": resume("Grace Hopper", 1) },
                { "label": "alan", "resume_text": resume("Alan Turing", 8) },
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body[0]["label"], "alan");
    assert_eq!(body[0]["screening"]["overall_score"], 82);
    assert!(body[1]["screening"]["overall_score"].as_i64().unwrap() < 40);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/jobs/{job_id}/screen"),
            Some(app.admin_token.as_str()),
            Some(json!({ "resumes": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, candidates) = app
        .send(Method::GET, "/api/candidates", Some(app.admin_token.as_str()), None)
        .await;
    assert!(candidates.as_array().unwrap().is_empty());
}
