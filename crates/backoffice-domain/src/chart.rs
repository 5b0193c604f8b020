//! Chart of accounts: AccountGroup → TotalAccount → FixedAccount → DetailedAccount.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountGroup {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl AccountGroup {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            code: code.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TotalAccount {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub account_group: ObjectId,
    pub created_at: DateTime<Utc>,
}

impl TotalAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_group: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            code: code.into(),
            name: name.into(),
            account_group,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FixedAccount {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub total_account: ObjectId,
    #[serde(default)]
    pub detailed_accounts: Vec<ObjectId>,
    /// Denormalized length of `detailed_accounts`.
    #[serde(default)]
    pub detailed_count: usize,
    pub created_at: DateTime<Utc>,
}

impl FixedAccount {
    /// Stored name of `detailed_accounts`.
    pub const DETAILED_ACCOUNTS_FIELD: &'static str = "detailedAccounts";
    /// Stored name of `detailed_count`.
    pub const DETAILED_COUNT_FIELD: &'static str = "detailedCount";

    pub fn new(code: impl Into<String>, name: impl Into<String>, total_account: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            code: code.into(),
            name: name.into(),
            total_account,
            detailed_accounts: Vec::new(),
            detailed_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn owns(&self, detailed: ObjectId) -> bool {
        self.detailed_accounts.contains(&detailed)
    }

    /// Adds `detailed` to the owned list; returns false when already present.
    pub fn attach(&mut self, detailed: ObjectId) -> bool {
        if self.owns(detailed) {
            return false;
        }
        self.detailed_accounts.push(detailed);
        self.detailed_count = self.detailed_accounts.len();
        true
    }

}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAccount {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl DetailedAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            code: code.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

macro_rules! chart_document {
    ($ty:ty, $collection:literal, $model:literal) => {
        impl Identifiable for $ty {
            fn id(&self) -> ObjectId {
                self.id
            }
        }

        impl NamedEntity for $ty {
            fn name(&self) -> &str {
                &self.name
            }
        }

        impl Coded for $ty {
            fn code(&self) -> &str {
                &self.code
            }
        }

        impl Document for $ty {
            const COLLECTION: &'static str = $collection;
            const MODEL: &'static str = $model;
        }
    };
}

chart_document!(AccountGroup, "accountgroups", "AccountGroup");
chart_document!(TotalAccount, "totalaccounts", "TotalAccount");
chart_document!(FixedAccount, "fixedaccounts", "FixedAccount");
chart_document!(DetailedAccount, "detailedaccounts", "DetailedAccount");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_keeps_denormalized_count_in_sync() {
        let mut fixed = FixedAccount::new("030101", "Cash", ObjectId::new());
        let first = ObjectId::new();
        assert!(fixed.attach(first));
        assert!(!fixed.attach(first));
        assert!(fixed.attach(ObjectId::new()));
        assert_eq!(fixed.detailed_count, 2);
        assert!(fixed.owns(first));
    }

    #[test]
    fn chart_documents_use_camel_case_fields() {
        let fixed = FixedAccount::new("030101", "Cash", ObjectId::new());
        let value = serde_json::to_value(&fixed).unwrap();
        assert!(value.get("_id").is_some());
        assert!(value.get("totalAccount").is_some());
        assert!(value.get("detailedAccounts").is_some());
    }
}
