use super::domain::{Form, FormId, Respondent, ResponseRecord, RespondentId};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read surface for form definitions. The submission path never mutates a
/// form except through the allow-list operations, which go through `save`.
pub trait FormRepository: Send + Sync {
    fn get(&self, id: &FormId) -> Result<Option<Form>, RepositoryError>;
    fn save(&self, form: Form) -> Result<(), RepositoryError>;
}

/// Storage abstraction for respondent records. `create` must reject a
/// respondent whose non-null `external_id` or `email` is already claimed, so
/// a concurrent first-time submission loses with `Conflict` instead of
/// producing a second record for the same identity.
pub trait RespondentRepository: Send + Sync {
    fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<Respondent>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<Respondent>, RepositoryError>;
    fn find_by_ip(&self, ip: &str) -> Result<Option<Respondent>, RepositoryError>;
    fn create(&self, respondent: Respondent) -> Result<Respondent, RepositoryError>;
    fn update(&self, respondent: Respondent) -> Result<(), RepositoryError>;
}

/// Storage abstraction for response records. When `unique_per_respondent` is
/// set, `insert` must atomically reject a second record for the same
/// (form, respondent) pair with `Conflict`; the coordinator converts that
/// conflict into the duplicate/edit outcome.
pub trait ResponseRepository: Send + Sync {
    fn find_by_form_and_respondent(
        &self,
        form: &FormId,
        respondent: &RespondentId,
    ) -> Result<Option<ResponseRecord>, RepositoryError>;
    fn insert(
        &self,
        record: ResponseRecord,
        unique_per_respondent: bool,
    ) -> Result<ResponseRecord, RepositoryError>;
    fn update_in_place(&self, record: ResponseRecord) -> Result<(), RepositoryError>;
    fn list_by_form(&self, form: &FormId) -> Result<Vec<ResponseRecord>, RepositoryError>;
}
