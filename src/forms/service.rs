use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::access::{
    self, AccessCheck, AccessDenied, AccessError, AccessGrant, AuthorizedList,
};
use super::domain::{
    ClientMeta, Form, FormId, Respondent, RespondentCandidate, ResponseId, ResponseRecord,
    SubmissionRequest,
};
use super::repository::{
    FormRepository, RepositoryError, RespondentRepository, ResponseRepository,
};
use super::resolver::RespondentResolver;
use super::validation::{validate_submission, ValidationReport};

static RESPONSE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_response_id() -> ResponseId {
    let id = RESPONSE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ResponseId(format!("rec-{id:06}"))
}

/// Whether the submission inserted a new record or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Created,
    Updated,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Created => "created",
            SubmissionStatus::Updated => "updated",
        }
    }
}

/// Successful submission result. `copy_requested` tells the caller whether a
/// confirmation email should be dispatched; the engine itself never sends
/// anything.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub record: ResponseRecord,
    pub respondent: Respondent,
    pub status: SubmissionStatus,
    pub copy_requested: bool,
}

/// Error raised by the submission coordinator.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("form not found")]
    FormNotFound,
    #[error("this form requires signing in before responding")]
    LoginRequired,
    #[error("this respondent is not authorized to answer this private form")]
    NotAuthorized,
    #[error("this form no longer accepts responses (deadline passed)")]
    SubmissionClosed,
    #[error("one or more answers failed validation")]
    ValidationFailed(ValidationReport),
    #[error("a response from this respondent is already recorded for this form")]
    DuplicateSubmission,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AccessDenied> for SubmissionError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::LoginRequired => SubmissionError::LoginRequired,
            AccessDenied::NotAuthorized => SubmissionError::NotAuthorized,
            AccessDenied::SubmissionClosed => SubmissionError::SubmissionClosed,
        }
    }
}

impl From<AccessError> for SubmissionError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::FormNotFound => SubmissionError::FormNotFound,
            AccessError::Repository(err) => SubmissionError::Repository(err),
            // Allow-list specific errors never reach the submission path.
            AccessError::InvalidEmail(_) | AccessError::NotAuthorizedEntry(_) => {
                SubmissionError::NotAuthorized
            }
        }
    }
}

/// Coordinator composing the form store, respondent resolver, answer
/// validator, and response store.
///
/// One submission moves through `load form -> access check -> resolve
/// respondent -> validate answers -> single-response branch -> persist`;
/// every rejection is terminal for that call.
pub struct SubmissionService<F, P, R> {
    forms: Arc<F>,
    resolver: RespondentResolver<P>,
    responses: Arc<R>,
}

impl<F, P, R> SubmissionService<F, P, R>
where
    F: FormRepository + 'static,
    P: RespondentRepository + 'static,
    R: ResponseRepository + 'static,
{
    pub fn new(forms: Arc<F>, respondents: Arc<P>, responses: Arc<R>) -> Self {
        Self {
            forms,
            resolver: RespondentResolver::new(respondents),
            responses,
        }
    }

    /// Submit one response. `request_is_authenticated` reflects the upstream
    /// identity verification outcome; the candidate bundle inside the
    /// request is trusted as supplied.
    pub fn submit(
        &self,
        request: SubmissionRequest,
        request_is_authenticated: bool,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let form_id = FormId(request.form_id.clone());
        let form = self
            .forms
            .get(&form_id)?
            .ok_or(SubmissionError::FormNotFound)?;

        let candidate = request.respondent.clone().unwrap_or_default();
        access::check_access(&form.policy, &candidate, request_is_authenticated, Utc::now())?;

        let respondent = self.resolver.resolve(&candidate)?;

        if let Err(report) = validate_submission(&form, &request.answers) {
            debug!(form = %form.id.0, errors = report.len(), "submission rejected by validator");
            return Err(SubmissionError::ValidationFailed(report));
        }

        let single = form.policy.single_response_per_respondent;
        if single {
            if let Some(existing) = self
                .responses
                .find_by_form_and_respondent(&form.id, &respondent.id)?
            {
                return self.overwrite_or_reject(&form, existing, &request, &respondent);
            }
        }

        let record = ResponseRecord {
            id: next_response_id(),
            form_id: form.id.clone(),
            respondent_id: respondent.id.clone(),
            submitted_at: Utc::now(),
            completion_seconds: request.completion_seconds,
            client: client_meta(&candidate),
            answers: request.answers.clone(),
        };

        match self.responses.insert(record, single) {
            Ok(stored) => {
                debug!(form = %form.id.0, response = %stored.id.0, "response recorded");
                Ok(self.outcome(&form, &request, stored, respondent, SubmissionStatus::Created))
            }
            // A concurrent writer for the same (form, respondent) got there
            // first; treat the conflict as having found their record.
            Err(RepositoryError::Conflict) => {
                match self
                    .responses
                    .find_by_form_and_respondent(&form.id, &respondent.id)?
                {
                    Some(existing) => {
                        self.overwrite_or_reject(&form, existing, &request, &respondent)
                    }
                    None => Err(SubmissionError::DuplicateSubmission),
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    fn overwrite_or_reject(
        &self,
        form: &Form,
        mut existing: ResponseRecord,
        request: &SubmissionRequest,
        respondent: &Respondent,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        if !form.policy.allow_edit_after_submit {
            return Err(SubmissionError::DuplicateSubmission);
        }

        let candidate = request.respondent.clone().unwrap_or_default();
        existing.answers = request.answers.clone();
        existing.completion_seconds = request.completion_seconds;
        existing.submitted_at = Utc::now();
        existing.client = client_meta(&candidate);

        match self.responses.update_in_place(existing.clone()) {
            Ok(()) => {
                debug!(form = %form.id.0, response = %existing.id.0, "response overwritten");
                Ok(self.outcome(
                    form,
                    request,
                    existing,
                    respondent.clone(),
                    SubmissionStatus::Updated,
                ))
            }
            // The record disappeared between lookup and update; a second
            // round would race the same way, so reject.
            Err(RepositoryError::Conflict) | Err(RepositoryError::NotFound) => {
                Err(SubmissionError::DuplicateSubmission)
            }
            Err(other) => Err(other.into()),
        }
    }

    fn outcome(
        &self,
        form: &Form,
        request: &SubmissionRequest,
        record: ResponseRecord,
        respondent: Respondent,
        status: SubmissionStatus,
    ) -> SubmissionOutcome {
        let copy_requested =
            request.send_copy && form.policy.notify_by_email && respondent.email.is_some();
        SubmissionOutcome {
            record,
            respondent,
            status,
            copy_requested,
        }
    }

    /// Responses recorded for one form, for export and statistics consumers.
    pub fn responses_for_form(
        &self,
        form_id: &FormId,
    ) -> Result<Vec<ResponseRecord>, SubmissionError> {
        self.forms
            .get(form_id)?
            .ok_or(SubmissionError::FormNotFound)?;
        Ok(self.responses.list_by_form(form_id)?)
    }

    pub fn create_form(&self, form: Form) -> Result<FormId, SubmissionError> {
        let id = form.id.clone();
        self.forms.save(form)?;
        Ok(id)
    }

    pub fn form(&self, form_id: &FormId) -> Result<Form, SubmissionError> {
        self.forms
            .get(form_id)?
            .ok_or(SubmissionError::FormNotFound)
    }

    pub fn grant_access(&self, form_id: &FormId, email: &str) -> Result<AccessGrant, AccessError> {
        access::grant_access(self.forms.as_ref(), form_id, email)
    }

    pub fn revoke_access(&self, form_id: &FormId, email: &str) -> Result<AccessGrant, AccessError> {
        access::revoke_access(self.forms.as_ref(), form_id, email)
    }

    pub fn list_authorized(&self, form_id: &FormId) -> Result<AuthorizedList, AccessError> {
        access::list_authorized(self.forms.as_ref(), form_id)
    }

    pub fn verify_access(
        &self,
        form_id: &FormId,
        email: Option<&str>,
    ) -> Result<AccessCheck, AccessError> {
        access::verify_access(self.forms.as_ref(), form_id, email)
    }
}

fn client_meta(candidate: &RespondentCandidate) -> ClientMeta {
    ClientMeta {
        browser: candidate.browser.clone(),
        device: candidate.device.clone(),
    }
}
