use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{Form, FormId, Respondent, ResponseRecord, RespondentId, ResponseId};
use super::repository::{
    FormRepository, RepositoryError, RespondentRepository, ResponseRepository,
};

/// In-memory form store backing the server binary and the test suites.
#[derive(Default, Clone)]
pub struct InMemoryFormRepository {
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
}

impl InMemoryFormRepository {
    /// Insert a form directly, bypassing the service layer. Test/seed helper.
    pub fn seed(&self, form: Form) {
        let mut guard = self.forms.lock().expect("form mutex poisoned");
        guard.insert(form.id.clone(), form);
    }
}

impl FormRepository for InMemoryFormRepository {
    fn get(&self, id: &FormId) -> Result<Option<Form>, RepositoryError> {
        let guard = self.forms.lock().expect("form mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, form: Form) -> Result<(), RepositoryError> {
        let mut guard = self.forms.lock().expect("form mutex poisoned");
        guard.insert(form.id.clone(), form);
        Ok(())
    }
}

/// In-memory respondent store. Uniqueness of non-null `external_id` and
/// `email` is enforced on `create`, matching the contract the resolver's
/// conflict-retry path relies on.
#[derive(Default, Clone)]
pub struct InMemoryRespondentRepository {
    respondents: Arc<Mutex<HashMap<RespondentId, Respondent>>>,
}

impl InMemoryRespondentRepository {
    fn find_where<F>(&self, predicate: F) -> Result<Option<Respondent>, RepositoryError>
    where
        F: Fn(&Respondent) -> bool,
    {
        let guard = self.respondents.lock().expect("respondent mutex poisoned");
        Ok(guard.values().find(|candidate| predicate(candidate)).cloned())
    }
}

impl RespondentRepository for InMemoryRespondentRepository {
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Respondent>, RepositoryError> {
        self.find_where(|respondent| respondent.external_id.as_deref() == Some(external_id))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Respondent>, RepositoryError> {
        self.find_where(|respondent| respondent.email.as_deref() == Some(email))
    }

    fn find_by_ip(&self, ip: &str) -> Result<Option<Respondent>, RepositoryError> {
        self.find_where(|respondent| !respondent.source_ip.is_empty() && respondent.source_ip == ip)
    }

    fn create(&self, respondent: Respondent) -> Result<Respondent, RepositoryError> {
        let mut guard = self.respondents.lock().expect("respondent mutex poisoned");
        let claimed = guard.values().any(|existing| {
            (respondent.external_id.is_some()
                && existing.external_id == respondent.external_id)
                || (respondent.email.is_some() && existing.email == respondent.email)
        });
        if claimed || guard.contains_key(&respondent.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(respondent.id.clone(), respondent.clone());
        Ok(respondent)
    }

    fn update(&self, respondent: Respondent) -> Result<(), RepositoryError> {
        let mut guard = self.respondents.lock().expect("respondent mutex poisoned");
        if !guard.contains_key(&respondent.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(respondent.id.clone(), respondent);
        Ok(())
    }
}

/// In-memory response store with the (form, respondent) uniqueness primitive
/// required by single-response forms.
#[derive(Default, Clone)]
pub struct InMemoryResponseRepository {
    records: Arc<Mutex<HashMap<ResponseId, ResponseRecord>>>,
}

impl ResponseRepository for InMemoryResponseRepository {
    fn find_by_form_and_respondent(
        &self,
        form: &FormId,
        respondent: &RespondentId,
    ) -> Result<Option<ResponseRecord>, RepositoryError> {
        let guard = self.records.lock().expect("response mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.form_id == form && &record.respondent_id == respondent)
            .cloned())
    }

    fn insert(
        &self,
        record: ResponseRecord,
        unique_per_respondent: bool,
    ) -> Result<ResponseRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("response mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        if unique_per_respondent
            && guard.values().any(|existing| {
                existing.form_id == record.form_id
                    && existing.respondent_id == record.respondent_id
            })
        {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update_in_place(&self, record: ResponseRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("response mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn list_by_form(&self, form: &FormId) -> Result<Vec<ResponseRecord>, RepositoryError> {
        let guard = self.records.lock().expect("response mutex poisoned");
        let mut records: Vec<ResponseRecord> = guard
            .values()
            .filter(|record| &record.form_id == form)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(records)
    }
}
