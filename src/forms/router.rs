use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::access::AccessError;
use super::domain::{AccessPolicy, Form, FormId, Question, SubmissionRequest};
use super::repository::{
    FormRepository, RepositoryError, RespondentRepository, ResponseRepository,
};
use super::service::{SubmissionError, SubmissionService};

/// Router builder exposing the submission, listing, and access endpoints.
pub fn forms_router<F, P, R>(service: Arc<SubmissionService<F, P, R>>) -> Router
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    Router::new()
        .route("/api/v1/forms", post(create_form_handler::<F, P, R>))
        .route("/api/v1/forms/:form_id", get(get_form_handler::<F, P, R>))
        .route(
            "/api/v1/responses",
            post(submit_handler::<F, P, R>).get(list_responses_handler::<F, P, R>),
        )
        .route(
            "/api/v1/forms/:form_id/access",
            get(list_access_handler::<F, P, R>)
                .post(grant_access_handler::<F, P, R>)
                .delete(revoke_access_handler::<F, P, R>),
        )
        .route(
            "/api/v1/forms/:form_id/access/check",
            get(verify_access_handler::<F, P, R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFormRequest {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    pub(crate) owner_email: String,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    #[serde(default)]
    pub(crate) policy: AccessPolicy,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailBody {
    pub(crate) email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseListQuery {
    pub(crate) form: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessCheckQuery {
    pub(crate) email: Option<String>,
}

pub(crate) async fn submit_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    axum::Json(request): axum::Json<SubmissionRequest>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    // HTTP callers carry their identity in the respondent bundle; the
    // authenticated flag is for embedding callers that verified a credential
    // out of band.
    match service.submit(request, false) {
        Ok(outcome) => {
            let status = match outcome.status {
                super::service::SubmissionStatus::Created => StatusCode::CREATED,
                super::service::SubmissionStatus::Updated => StatusCode::OK,
            };
            let payload = json!({
                "id": outcome.record.id,
                "status": outcome.status.label(),
                "copyRequested": outcome.copy_requested,
            });
            (status, axum::Json(payload)).into_response()
        }
        Err(error) => submission_error_response(error),
    }
}

fn submission_error_response(error: SubmissionError) -> Response {
    let (status, kind, details) = match &error {
        SubmissionError::FormNotFound => (StatusCode::NOT_FOUND, "FormNotFound", None),
        SubmissionError::LoginRequired => (StatusCode::UNAUTHORIZED, "LoginRequired", None),
        SubmissionError::NotAuthorized => (StatusCode::FORBIDDEN, "NotAuthorized", None),
        SubmissionError::SubmissionClosed => (StatusCode::GONE, "SubmissionClosed", None),
        SubmissionError::ValidationFailed(report) => (
            StatusCode::BAD_REQUEST,
            "ValidationFailed",
            Some(report.details()),
        ),
        SubmissionError::DuplicateSubmission => {
            (StatusCode::CONFLICT, "DuplicateSubmission", None)
        }
        SubmissionError::Repository(RepositoryError::Conflict) => {
            (StatusCode::CONFLICT, "RepositoryConflict", None)
        }
        SubmissionError::Repository(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "RepositoryError", None)
        }
    };

    let payload = json!({
        "errorKind": kind,
        "details": details.map(stringify_keys).unwrap_or_default(),
        "message": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn stringify_keys(details: std::collections::BTreeMap<u32, String>) -> HashMap<String, String> {
    details
        .into_iter()
        .map(|(id, message)| (id.to_string(), message))
        .collect()
}

pub(crate) async fn list_responses_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Query(query): Query<ResponseListQuery>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    let Some(form) = query.form else {
        let payload = json!({ "error": "query param 'form' is required" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match service.responses_for_form(&FormId(form)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

pub(crate) async fn create_form_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    axum::Json(request): axum::Json<CreateFormRequest>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    let form = match Form::new(
        FormId(request.id),
        request.title,
        request.description,
        request.owner_email,
        request.questions,
        request.policy,
    ) {
        Ok(form) => form,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    match service.create_form(form) {
        Ok(id) => {
            let payload = json!({ "id": id, "status": "created" });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => submission_error_response(error),
    }
}

pub(crate) async fn get_form_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Path(form_id): Path<String>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    match service.form(&FormId(form_id)) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

fn access_error_response(error: AccessError) -> Response {
    let (status, kind) = match &error {
        AccessError::FormNotFound => (StatusCode::NOT_FOUND, "FormNotFound"),
        AccessError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "InvalidEmail"),
        AccessError::NotAuthorizedEntry(_) => (StatusCode::NOT_FOUND, "NotAuthorizedEntry"),
        AccessError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RepositoryError"),
    };
    let payload = json!({ "errorKind": kind, "message": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn grant_access_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Path(form_id): Path<String>,
    axum::Json(body): axum::Json<EmailBody>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    match service.grant_access(&FormId(form_id), &body.email) {
        Ok(grant) => (StatusCode::OK, axum::Json(grant)).into_response(),
        Err(error) => access_error_response(error),
    }
}

pub(crate) async fn revoke_access_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Path(form_id): Path<String>,
    axum::Json(body): axum::Json<EmailBody>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    match service.revoke_access(&FormId(form_id), &body.email) {
        Ok(revoked) => (StatusCode::OK, axum::Json(revoked)).into_response(),
        Err(error) => access_error_response(error),
    }
}

pub(crate) async fn list_access_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Path(form_id): Path<String>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    match service.list_authorized(&FormId(form_id)) {
        Ok(list) => (StatusCode::OK, axum::Json(list)).into_response(),
        Err(error) => access_error_response(error),
    }
}

pub(crate) async fn verify_access_handler<F, P, R>(
    State(service): State<Arc<SubmissionService<F, P, R>>>,
    Path(form_id): Path<String>,
    Query(query): Query<AccessCheckQuery>,
) -> Response
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    match service.verify_access(&FormId(form_id), query.email.as_deref()) {
        Ok(check) => (StatusCode::OK, axum::Json(check)).into_response(),
        Err(error) => access_error_response(error),
    }
}
