//! Records exchanged with the registry providers and the session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answer::AnswerValue;
use crate::cnpj::Cnpj;

/// A registered business address, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// An economic activity (CNAE) entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub code: String,
    pub description: String,
}

/// A shareholder or administrator listed in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shareholder {
    pub name: String,
    pub role: String,
}

/// A company as resolved from the national registry.
///
/// `source` names the provider that produced the record and `synthetic`
/// marks placeholder data from the offline fallback, so callers can always
/// tell fabricated records from real ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub cnpj: Cnpj,
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub primary_activities: Vec<Activity>,
    #[serde(default)]
    pub secondary_activities: Vec<Activity>,
    #[serde(default)]
    pub shareholders: Vec<Shareholder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_capital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_nature: Option<String>,
    pub source: String,
    #[serde(default)]
    pub synthetic: bool,
}

impl CompanyRecord {
    /// Trade name when the registry has one, legal name otherwise.
    pub fn display_name(&self) -> &str {
        self.trade_name.as_deref().unwrap_or(&self.legal_name)
    }
}

/// One questionnaire session as persisted in the store.
///
/// The company fields are a denormalized snapshot taken at creation time;
/// they are never re-synced against the registry afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_trade_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_status: Option<String>,
    pub current_section: u32,
    pub completion_percentage: u8,
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Builds the creation payload for a fresh session seeded from a
    /// resolved company. Timestamps are left unset for the store to stamp.
    pub fn seeded(id: impl Into<String>, company: &CompanyRecord) -> Self {
        let location = company
            .address
            .as_ref()
            .map(|a| format!("{}/{}", a.city, a.state));
        SessionRecord {
            id: id.into(),
            cnpj: Some(company.cnpj.formatted()),
            company_name: company.legal_name.clone(),
            company_trade_name: Some(company.display_name().to_owned()),
            company_size: company.size_class.clone(),
            company_activity: company
                .primary_activities
                .first()
                .map(|a| a.description.clone()),
            company_location: location,
            company_status: company.registration_status.clone(),
            current_section: 1,
            completion_percentage: 0,
            is_completed: false,
            created_at: None,
            updated_at: None,
        }
    }
}

/// One saved answer row, keyed by `(session_id, question_id)` in the store.
///
/// `section_id` is denormalized from the catalog so answers can be queried
/// per section without a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub session_id: String,
    pub question_id: u32,
    pub section_id: u32,
    pub value: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
