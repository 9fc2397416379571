use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{AccessPolicy, FormId, RespondentCandidate};
use super::repository::{FormRepository, RepositoryError};

/// Fail-fast outcomes of the pre-validation access check. Once access is
/// denied, no answer validation runs, so question content never leaks to
/// unauthorized callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    LoginRequired,
    NotAuthorized,
    SubmissionClosed,
}

/// Evaluate a form's access policy against a submission attempt.
pub fn check_access(
    policy: &AccessPolicy,
    candidate: &RespondentCandidate,
    request_is_authenticated: bool,
    now: DateTime<Utc>,
) -> Result<(), AccessDenied> {
    if policy.require_login {
        if !request_is_authenticated && !candidate.has_identity() {
            return Err(AccessDenied::LoginRequired);
        }

        if !policy.is_public {
            let authorized = candidate
                .email
                .as_deref()
                .map(normalize_email)
                .is_some_and(|email| policy.authorized_respondents.contains(&email));
            if !authorized {
                return Err(AccessDenied::NotAuthorized);
            }
        }
    }

    if let Some(deadline) = policy.deadline {
        if now > deadline {
            return Err(AccessDenied::SubmissionClosed);
        }
    }

    Ok(())
}

/// Errors raised by the allow-list operations.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("form not found")]
    FormNotFound,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("'{0}' is not on the authorized list")]
    NotAuthorizedEntry(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a grant operation; `already_present` distinguishes the
/// idempotent no-op from a fresh append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub email: String,
    pub already_present: bool,
    pub total_authorized: usize,
}

/// Snapshot of a form's allow-list for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedList {
    pub form_id: FormId,
    pub title: String,
    pub is_public: bool,
    pub authorized_respondents: Vec<String>,
}

/// Read-only access probe, answering "could this email submit?" without
/// touching anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub has_access: bool,
    pub require_login: bool,
    pub is_public: bool,
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Syntactic well-formedness only; deliverability is not our concern.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Append a normalized email to the form's allow-list. Idempotent: granting
/// an email twice succeeds without a second append.
pub fn grant_access<F>(forms: &F, form_id: &FormId, email: &str) -> Result<AccessGrant, AccessError>
where
    F: FormRepository,
{
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(AccessError::InvalidEmail(email));
    }

    let mut form = forms.get(form_id)?.ok_or(AccessError::FormNotFound)?;
    let already_present = !form.policy.authorized_respondents.insert(email.clone());
    let total_authorized = form.policy.authorized_respondents.len();
    if !already_present {
        forms.save(form)?;
    }

    Ok(AccessGrant {
        email,
        already_present,
        total_authorized,
    })
}

/// Remove a normalized email from the allow-list. Removing an absent entry
/// is an error so the administrator notices a stale view.
pub fn revoke_access<F>(
    forms: &F,
    form_id: &FormId,
    email: &str,
) -> Result<AccessGrant, AccessError>
where
    F: FormRepository,
{
    let email = normalize_email(email);
    let mut form = forms.get(form_id)?.ok_or(AccessError::FormNotFound)?;
    if !form.policy.authorized_respondents.remove(&email) {
        return Err(AccessError::NotAuthorizedEntry(email));
    }
    let total_authorized = form.policy.authorized_respondents.len();
    forms.save(form)?;

    Ok(AccessGrant {
        email,
        already_present: false,
        total_authorized,
    })
}

pub fn list_authorized<F>(forms: &F, form_id: &FormId) -> Result<AuthorizedList, AccessError>
where
    F: FormRepository,
{
    let form = forms.get(form_id)?.ok_or(AccessError::FormNotFound)?;
    Ok(AuthorizedList {
        form_id: form.id.clone(),
        title: form.title.clone(),
        is_public: form.policy.is_public,
        authorized_respondents: form.policy.authorized_respondents.iter().cloned().collect(),
    })
}

/// Answer whether `email` (possibly absent) could currently submit the form.
pub fn verify_access<F>(
    forms: &F,
    form_id: &FormId,
    email: Option<&str>,
) -> Result<AccessCheck, AccessError>
where
    F: FormRepository,
{
    let form = forms.get(form_id)?.ok_or(AccessError::FormNotFound)?;
    let policy = &form.policy;

    let has_access = if !policy.require_login {
        true
    } else {
        match email.map(normalize_email) {
            None => false,
            Some(_) if policy.is_public => true,
            Some(email) => policy.authorized_respondents.contains(&email),
        }
    };

    Ok(AccessCheck {
        has_access,
        require_login: policy.require_login,
        is_public: policy.is_public,
    })
}
