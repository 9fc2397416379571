use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::access::normalize_email;
use super::domain::{non_blank, Respondent, RespondentCandidate, RespondentId};
use super::repository::{RepositoryError, RespondentRepository};

static RESPONDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_respondent_id() -> RespondentId {
    let id = RESPONDENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RespondentId(format!("rsp-{id:06}"))
}

/// Finds or creates the respondent behind a submission.
///
/// Lookup priority is fixed: external id, then email, then source IP. The IP
/// is a weak, shareable signal, so an IP match only refreshes `last_seen_at`
/// and never absorbs a name or email from the candidate.
pub struct RespondentResolver<R> {
    repository: Arc<R>,
}

impl<R> RespondentResolver<R>
where
    R: RespondentRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Always yields a respondent; only repository transport failures
    /// surface as errors.
    pub fn resolve(&self, candidate: &RespondentCandidate) -> Result<Respondent, RepositoryError> {
        if let Some(found) = self.lookup(candidate)? {
            return Ok(found);
        }

        match self.repository.create(self.fresh_respondent(candidate)) {
            Ok(created) => Ok(created),
            // A concurrent first-time submission for the same identity won
            // the create; re-run the lookup once and adopt the winner.
            Err(RepositoryError::Conflict) => match self.lookup(candidate)? {
                Some(found) => Ok(found),
                None => Err(RepositoryError::Conflict),
            },
            Err(other) => Err(other),
        }
    }

    fn lookup(
        &self,
        candidate: &RespondentCandidate,
    ) -> Result<Option<Respondent>, RepositoryError> {
        if let Some(external_id) = trimmed(candidate.external_id.as_deref()) {
            if let Some(mut found) = self.repository.find_by_external_id(&external_id)? {
                self.merge_and_touch(&mut found, candidate)?;
                return Ok(Some(found));
            }
        }

        if let Some(email) = trimmed(candidate.email.as_deref()).map(|raw| normalize_email(&raw)) {
            if let Some(mut found) = self.repository.find_by_email(&email)? {
                self.merge_and_touch(&mut found, candidate)?;
                return Ok(Some(found));
            }
        }

        if let Some(ip) = trimmed(candidate.ip_address.as_deref()) {
            if let Some(mut found) = self.repository.find_by_ip(&ip)? {
                found.last_seen_at = Utc::now();
                self.repository.update(found.clone())?;
                return Ok(Some(found));
            }
        }

        Ok(None)
    }

    fn merge_and_touch(
        &self,
        respondent: &mut Respondent,
        candidate: &RespondentCandidate,
    ) -> Result<(), RepositoryError> {
        if non_blank(candidate.display_name.as_deref()) {
            respondent.display_name = candidate
                .display_name
                .as_deref()
                .map(|name| name.trim().to_string());
        }
        if non_blank(candidate.email.as_deref()) {
            respondent.email = candidate
                .email
                .as_deref()
                .map(|email| normalize_email(email));
        }
        if non_blank(candidate.ip_address.as_deref()) && respondent.source_ip.is_empty() {
            respondent.source_ip = candidate
                .ip_address
                .as_deref()
                .map(|ip| ip.trim().to_string())
                .unwrap_or_default();
        }
        respondent.last_seen_at = Utc::now();
        self.repository.update(respondent.clone())
    }

    fn fresh_respondent(&self, candidate: &RespondentCandidate) -> Respondent {
        let now = Utc::now();
        Respondent {
            id: next_respondent_id(),
            source_ip: trimmed(candidate.ip_address.as_deref()).unwrap_or_default(),
            external_id: trimmed(candidate.external_id.as_deref()),
            email: trimmed(candidate.email.as_deref()).map(|raw| normalize_email(&raw)),
            display_name: trimmed(candidate.display_name.as_deref()),
            registered_at: now,
            last_seen_at: now,
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
