use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub tax_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Provider {
    pub fn from_draft(code: impl Into<String>, draft: ProviderDraft) -> Self {
        Self {
            id: ObjectId::new(),
            code: code.into(),
            name: draft.name,
            tax_id: draft.tax_id,
            email: draft.email,
            created_at: Utc::now(),
        }
    }
}

impl Identifiable for Provider {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl NamedEntity for Provider {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Coded for Provider {
    fn code(&self) -> &str {
        &self.code
    }
}

impl Document for Provider {
    const COLLECTION: &'static str = "providers";
    const MODEL: &'static str = "Provider";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDraft {
    pub name: String,
    pub tax_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProviderDraft {
    pub fn new(name: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
            email: None,
        }
    }
}
