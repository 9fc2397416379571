//! Form response submission engine: question schemas, access policies,
//! respondent resolution, answer validation, and response persistence.

pub mod access;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use access::{AccessCheck, AccessDenied, AccessError, AccessGrant, AuthorizedList};
pub use domain::{
    AccessPolicy, AnswerEntry, ClientMeta, Constraints, Form, FormDefinitionError, FormId,
    Question, QuestionKind, Respondent, RespondentCandidate, RespondentId, ResponseId,
    ResponseRecord, SubmissionRequest,
};
pub use memory::{InMemoryFormRepository, InMemoryRespondentRepository, InMemoryResponseRepository};
pub use repository::{FormRepository, RepositoryError, RespondentRepository, ResponseRepository};
pub use resolver::RespondentResolver;
pub use router::forms_router;
pub use service::{SubmissionError, SubmissionOutcome, SubmissionService, SubmissionStatus};
pub use validation::{validate_submission, AnswerError, ValidationReport};
