use std::collections::BTreeSet;
use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::forms::domain::{
    AccessPolicy, AnswerEntry, Constraints, Form, FormId, Question, QuestionKind,
    RespondentCandidate, SubmissionRequest,
};
use crate::forms::memory::{
    InMemoryFormRepository, InMemoryRespondentRepository, InMemoryResponseRepository,
};
use crate::forms::service::SubmissionService;

pub(super) type MemoryService = SubmissionService<
    InMemoryFormRepository,
    InMemoryRespondentRepository,
    InMemoryResponseRepository,
>;

pub(super) fn survey_questions() -> Vec<Question> {
    vec![
        Question {
            id: 1,
            prompt: "What did you think of the workshop?".to_string(),
            kind: QuestionKind::FreeText,
            required: true,
            options: Vec::new(),
            constraints: Some(Constraints {
                min_length: Some(2),
                max_length: Some(120),
                ..Constraints::default()
            }),
            position: Some(1),
        },
        Question {
            id: 2,
            prompt: "Which session did you attend?".to_string(),
            kind: QuestionKind::SingleChoice,
            required: true,
            options: vec![
                "Morning".to_string(),
                "Afternoon".to_string(),
                "Evening".to_string(),
            ],
            constraints: None,
            position: Some(2),
        },
        Question {
            id: 3,
            prompt: "How may we follow up?".to_string(),
            kind: QuestionKind::MultiChoice,
            required: false,
            options: vec!["Email".to_string(), "Phone".to_string(), "Chat".to_string()],
            constraints: None,
            position: Some(3),
        },
        Question {
            id: 4,
            prompt: "Rate the venue".to_string(),
            kind: QuestionKind::NumericScale,
            required: true,
            options: Vec::new(),
            constraints: Some(Constraints {
                min_value: Some(1),
                max_value: Some(5),
                ..Constraints::default()
            }),
            position: Some(4),
        },
    ]
}

pub(super) fn form_with_policy(policy: AccessPolicy) -> Form {
    Form::new(
        FormId("frm-workshop".to_string()),
        "Workshop feedback".to_string(),
        "Post-event feedback round".to_string(),
        "owner@example.com".to_string(),
        survey_questions(),
        policy,
    )
    .expect("valid form definition")
}

pub(super) fn open_form() -> Form {
    form_with_policy(AccessPolicy::default())
}

pub(super) fn single_response_policy(allow_edit: bool) -> AccessPolicy {
    AccessPolicy {
        single_response_per_respondent: true,
        allow_edit_after_submit: allow_edit,
        ..AccessPolicy::default()
    }
}

pub(super) fn private_policy(allowed: &[&str]) -> AccessPolicy {
    AccessPolicy {
        require_login: true,
        is_public: false,
        authorized_respondents: allowed
            .iter()
            .map(|email| email.to_lowercase())
            .collect::<BTreeSet<_>>(),
        ..AccessPolicy::default()
    }
}

pub(super) fn closed_policy() -> AccessPolicy {
    AccessPolicy {
        deadline: Some(Utc::now() - Duration::hours(1)),
        ..AccessPolicy::default()
    }
}

pub(super) fn answer(question_id: u32, kind: QuestionKind, values: &[&str]) -> AnswerEntry {
    AnswerEntry {
        question_id,
        kind,
        values: values.iter().map(|value| value.to_string()).collect(),
    }
}

pub(super) fn answers_ok() -> Vec<AnswerEntry> {
    vec![
        answer(1, QuestionKind::FreeText, &["Great session overall"]),
        answer(2, QuestionKind::SingleChoice, &["Morning"]),
        answer(3, QuestionKind::MultiChoice, &["Email", "Chat"]),
        answer(4, QuestionKind::NumericScale, &["4"]),
    ]
}

pub(super) fn email_candidate(email: &str) -> RespondentCandidate {
    RespondentCandidate {
        email: Some(email.to_string()),
        display_name: Some("Dana".to_string()),
        ip_address: Some("203.0.113.7".to_string()),
        ..RespondentCandidate::default()
    }
}

pub(super) fn external_candidate(external_id: &str) -> RespondentCandidate {
    RespondentCandidate {
        external_id: Some(external_id.to_string()),
        display_name: Some("Dana".to_string()),
        ip_address: Some("203.0.113.7".to_string()),
        ..RespondentCandidate::default()
    }
}

pub(super) fn ip_candidate(ip: &str) -> RespondentCandidate {
    RespondentCandidate {
        ip_address: Some(ip.to_string()),
        ..RespondentCandidate::default()
    }
}

pub(super) fn request(
    form: &Form,
    candidate: Option<RespondentCandidate>,
    answers: Vec<AnswerEntry>,
) -> SubmissionRequest {
    SubmissionRequest {
        form_id: form.id.0.clone(),
        respondent: candidate,
        completion_seconds: 42,
        send_copy: false,
        answers,
    }
}

pub(super) fn build_service(
    form: Form,
) -> (
    MemoryService,
    Arc<InMemoryFormRepository>,
    Arc<InMemoryRespondentRepository>,
    Arc<InMemoryResponseRepository>,
) {
    let forms = Arc::new(InMemoryFormRepository::default());
    forms.seed(form);
    let respondents = Arc::new(InMemoryRespondentRepository::default());
    let responses = Arc::new(InMemoryResponseRepository::default());
    let service = SubmissionService::new(forms.clone(), respondents.clone(), responses.clone());
    (service, forms, respondents, responses)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
