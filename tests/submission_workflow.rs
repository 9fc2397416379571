use std::sync::Arc;

use chrono::{Duration, Utc};
use formflow::forms::{
    AccessPolicy, AnswerEntry, Constraints, Form, FormId, InMemoryFormRepository,
    InMemoryRespondentRepository, InMemoryResponseRepository, Question, QuestionKind,
    RespondentCandidate, SubmissionError, SubmissionRequest, SubmissionService, SubmissionStatus,
};

type Engine = SubmissionService<
    InMemoryFormRepository,
    InMemoryRespondentRepository,
    InMemoryResponseRepository,
>;

fn engine() -> Engine {
    SubmissionService::new(
        Arc::new(InMemoryFormRepository::default()),
        Arc::new(InMemoryRespondentRepository::default()),
        Arc::new(InMemoryResponseRepository::default()),
    )
}

fn feedback_form(id: &str, policy: AccessPolicy) -> Form {
    let questions = vec![
        Question {
            id: 1,
            prompt: "How was the event?".to_string(),
            kind: QuestionKind::FreeText,
            required: true,
            options: Vec::new(),
            constraints: Some(Constraints {
                min_length: Some(3),
                max_length: Some(200),
                ..Constraints::default()
            }),
            position: Some(1),
        },
        Question {
            id: 2,
            prompt: "Would you come again?".to_string(),
            kind: QuestionKind::SingleChoice,
            required: true,
            options: vec!["Yes".to_string(), "No".to_string()],
            constraints: None,
            position: Some(2),
        },
        Question {
            id: 3,
            prompt: "Overall rating".to_string(),
            kind: QuestionKind::NumericScale,
            required: false,
            options: Vec::new(),
            constraints: Some(Constraints {
                min_value: Some(1),
                max_value: Some(10),
                ..Constraints::default()
            }),
            position: Some(3),
        },
    ];
    Form::new(
        FormId(id.to_string()),
        "Event feedback".to_string(),
        String::new(),
        "events@example.com".to_string(),
        questions,
        policy,
    )
    .expect("valid form definition")
}

fn answer(question_id: u32, kind: QuestionKind, values: &[&str]) -> AnswerEntry {
    AnswerEntry {
        question_id,
        kind,
        values: values.iter().map(|value| value.to_string()).collect(),
    }
}

fn submission(form_id: &str, candidate: RespondentCandidate, rating: &str) -> SubmissionRequest {
    SubmissionRequest {
        form_id: form_id.to_string(),
        respondent: Some(candidate),
        completion_seconds: 30,
        send_copy: true,
        answers: vec![
            answer(1, QuestionKind::FreeText, &["Really well organised"]),
            answer(2, QuestionKind::SingleChoice, &["Yes"]),
            answer(3, QuestionKind::NumericScale, &[rating]),
        ],
    }
}

fn visitor(email: &str) -> RespondentCandidate {
    RespondentCandidate {
        email: Some(email.to_string()),
        display_name: Some("Alex".to_string()),
        ip_address: Some("198.51.100.23".to_string()),
        ..RespondentCandidate::default()
    }
}

#[test]
fn open_form_accepts_submissions_and_lists_them() {
    let engine = engine();
    let form = feedback_form("frm-open", AccessPolicy::default());
    let form_id = engine.create_form(form).expect("form stored");

    let first = engine
        .submit(submission("frm-open", visitor("alex@example.com"), "9"), false)
        .expect("valid submission");
    assert_eq!(first.status, SubmissionStatus::Created);
    assert!(first.copy_requested, "copy requested and email known");

    engine
        .submit(submission("frm-open", visitor("sam@example.com"), "7"), false)
        .expect("second visitor submits");

    let records = engine.responses_for_form(&form_id).expect("listing works");
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|record| record.form_id == FormId("frm-open".to_string())));
}

#[test]
fn single_response_form_supports_the_edit_cycle() {
    let engine = engine();
    let policy = AccessPolicy {
        single_response_per_respondent: true,
        allow_edit_after_submit: true,
        ..AccessPolicy::default()
    };
    engine
        .create_form(feedback_form("frm-once", policy))
        .expect("form stored");

    let first = engine
        .submit(submission("frm-once", visitor("alex@example.com"), "6"), false)
        .expect("initial submission");
    let second = engine
        .submit(submission("frm-once", visitor("alex@example.com"), "10"), false)
        .expect("edit replaces the answers");

    assert_eq!(second.status, SubmissionStatus::Updated);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.answers[2].values, vec!["10".to_string()]);

    let records = engine
        .responses_for_form(&FormId("frm-once".to_string()))
        .expect("listing works");
    assert_eq!(records.len(), 1, "the edit never duplicates the record");
}

#[test]
fn private_form_workflow_gates_on_the_allowlist() {
    let engine = engine();
    let policy = AccessPolicy {
        require_login: true,
        is_public: false,
        ..AccessPolicy::default()
    };
    let form_id = engine
        .create_form(feedback_form("frm-private", policy))
        .expect("form stored");

    let rejected = engine
        .submit(
            submission("frm-private", visitor("alex@example.com"), "8"),
            false,
        )
        .expect_err("not yet on the allow-list");
    assert!(matches!(rejected, SubmissionError::NotAuthorized));

    engine
        .grant_access(&form_id, "Alex@Example.COM")
        .expect("grant normalizes and stores");
    let probe = engine
        .verify_access(&form_id, Some("alex@example.com"))
        .expect("probe works");
    assert!(probe.has_access);

    let accepted = engine
        .submit(
            submission("frm-private", visitor("alex@example.com"), "8"),
            false,
        )
        .expect("allow-listed respondent submits");
    assert_eq!(accepted.status, SubmissionStatus::Created);

    engine
        .revoke_access(&form_id, "alex@example.com")
        .expect("revoke works");
    let rejected_again = engine
        .submit(
            submission("frm-private", visitor("alex@example.com"), "8"),
            false,
        )
        .expect_err("access was revoked");
    assert!(matches!(rejected_again, SubmissionError::NotAuthorized));
}

#[test]
fn deadline_closes_the_form_for_everyone() {
    let engine = engine();
    let policy = AccessPolicy {
        deadline: Some(Utc::now() - Duration::minutes(5)),
        ..AccessPolicy::default()
    };
    engine
        .create_form(feedback_form("frm-closed", policy))
        .expect("form stored");

    let rejected = engine
        .submit(
            submission("frm-closed", visitor("alex@example.com"), "8"),
            false,
        )
        .expect_err("deadline passed");
    assert!(matches!(rejected, SubmissionError::SubmissionClosed));
}

#[test]
fn validation_reports_carry_every_failing_question() {
    let engine = engine();
    engine
        .create_form(feedback_form("frm-strict", AccessPolicy::default()))
        .expect("form stored");

    let request = SubmissionRequest {
        form_id: "frm-strict".to_string(),
        respondent: Some(visitor("alex@example.com")),
        completion_seconds: 12,
        send_copy: false,
        answers: vec![
            answer(1, QuestionKind::FreeText, &["ok"]),
            answer(3, QuestionKind::NumericScale, &["eleven"]),
        ],
    };

    let error = engine.submit(request, false).expect_err("three failures");
    match error {
        SubmissionError::ValidationFailed(report) => {
            assert_eq!(report.len(), 3);
            let details = report.details();
            assert!(details.contains_key(&1), "free text below min length");
            assert!(details.contains_key(&2), "required choice missing");
            assert!(details.contains_key(&3), "rating not numeric");
        }
        other => panic!("expected a validation failure, got {other:?}"),
    }
}

#[test]
fn returning_respondent_is_recognised_across_forms() {
    let engine = engine();
    engine
        .create_form(feedback_form("frm-a", AccessPolicy::default()))
        .expect("form stored");
    engine
        .create_form(feedback_form("frm-b", AccessPolicy::default()))
        .expect("form stored");

    let first = engine
        .submit(submission("frm-a", visitor("alex@example.com"), "9"), false)
        .expect("submits to the first form");
    let second = engine
        .submit(submission("frm-b", visitor("alex@example.com"), "9"), false)
        .expect("submits to the second form");

    assert_eq!(first.respondent.id, second.respondent.id);
    assert!(second.respondent.last_seen_at >= first.respondent.last_seen_at);
}
