use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for form definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

/// Identifier wrapper for respondent records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RespondentId(pub String);

/// Identifier wrapper for stored responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub String);

/// Closed set of question types the validator knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    SingleChoice,
    MultiChoice,
    NumericScale,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionKind::FreeText => "free_text",
            QuestionKind::SingleChoice => "single_choice",
            QuestionKind::MultiChoice => "multi_choice",
            QuestionKind::NumericScale => "numeric_scale",
        }
    }
}

/// Optional per-question validation bounds. Length bounds apply to free text,
/// value bounds to numeric scales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub min_value: Option<i64>,
    #[serde(default)]
    pub max_value: Option<i64>,
}

/// One typed question inside a form. Ids are stable integers unique within
/// the owning form; answers reference questions by this id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub position: Option<u32>,
}

/// Per-form rules controlling who may submit and how often.
///
/// When `require_login` is false, `is_public` and the allow-list are never
/// consulted; every caller has access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    #[serde(default)]
    pub require_login: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub authorized_respondents: BTreeSet<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub single_response_per_respondent: bool,
    #[serde(default)]
    pub allow_edit_after_submit: bool,
    #[serde(default = "default_true")]
    pub notify_by_email: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            require_login: false,
            is_public: true,
            authorized_respondents: BTreeSet::new(),
            deadline: None,
            single_response_per_respondent: false,
            allow_edit_after_submit: false,
            notify_by_email: true,
        }
    }
}

/// Error raised when a form definition is internally inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum FormDefinitionError {
    #[error("duplicate question id {0} in form definition")]
    DuplicateQuestionId(u32),
}

/// A form owns its questions and access policy by value; responses reference
/// it by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: FormId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
    pub policy: AccessPolicy,
}

impl Form {
    pub fn new(
        id: FormId,
        title: String,
        description: String,
        owner_email: String,
        questions: Vec<Question>,
        policy: AccessPolicy,
    ) -> Result<Self, FormDefinitionError> {
        let mut seen = BTreeSet::new();
        for question in &questions {
            if !seen.insert(question.id) {
                return Err(FormDefinitionError::DuplicateQuestionId(question.id));
            }
        }

        Ok(Self {
            id,
            title,
            description,
            owner_email,
            created_at: Utc::now(),
            questions,
            policy,
        })
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }
}

/// Durable record of who is answering forms. Three lookup keys with fixed
/// priority: `external_id` over `email` over `source_ip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Respondent {
    pub id: RespondentId,
    /// Weakest identity signal; empty when the caller could not determine one.
    pub source_ip: String,
    pub external_id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Unverified-or-verified identity bundle accompanying a submission. The
/// engine trusts these fields as supplied; credential verification happens
/// upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentCandidate {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

impl RespondentCandidate {
    /// True when a signal stronger than the source IP was supplied.
    pub fn has_identity(&self) -> bool {
        non_blank(self.external_id.as_deref()) || non_blank(self.email.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

/// Caller-supplied client metadata; user-agent parsing happens upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// One submitted answer. `question_id` values are unique within a record and
/// reference a question of the submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: u32,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub values: Vec<String>,
}

/// Stored response. Overwritten in place (same id) only on the
/// single-response edit path; otherwise immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: ResponseId,
    pub form_id: FormId,
    pub respondent_id: RespondentId,
    pub submitted_at: DateTime<Utc>,
    pub completion_seconds: u32,
    #[serde(default)]
    pub client: ClientMeta,
    pub answers: Vec<AnswerEntry>,
}

/// Wire shape of a submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub form_id: String,
    #[serde(default)]
    pub respondent: Option<RespondentCandidate>,
    #[serde(default)]
    pub completion_seconds: u32,
    #[serde(default)]
    pub send_copy: bool,
    pub answers: Vec<AnswerEntry>,
}
