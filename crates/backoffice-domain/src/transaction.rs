//! Payment details and the transactions that reference them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

/// Discriminator selecting which payment-detail schema a request carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayType {
    Check,
}

impl PayType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "check" | "cheque" => Some(PayType::Check),
            _ => None,
        }
    }
}

impl fmt::Display for PayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayType::Check => f.write_str("check"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub check_number: String,
    pub bank: String,
    pub beneficiary: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for Check {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl Document for Check {
    const COLLECTION: &'static str = "checks";
    const MODEL: &'static str = "Check";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckDraft {
    pub check_number: String,
    pub bank: String,
    pub beneficiary: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
}

impl CheckDraft {
    pub fn into_check(self) -> Check {
        Check {
            id: ObjectId::new(),
            check_number: self.check_number,
            bank: self.bank,
            beneficiary: self.beneficiary,
            amount: self.amount,
            issue_date: self.issue_date,
            created_at: Utc::now(),
        }
    }
}

/// Payment detail payload, one variant per [`PayType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PayDetailDraft {
    Check(CheckDraft),
}

impl PayDetailDraft {
    pub fn pay_type(&self) -> PayType {
        match self {
            PayDetailDraft::Check(_) => PayType::Check,
        }
    }
}

/// Stored payment detail returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PayDetail {
    Check(Check),
}

impl PayDetail {
    pub fn id(&self) -> ObjectId {
        match self {
            PayDetail::Check(check) => check.id,
        }
    }

    pub fn pay_type(&self) -> PayType {
        match self {
            PayDetail::Check(_) => PayType::Check,
        }
    }

    pub fn reference(&self) -> PayDetailRef {
        PayDetailRef {
            kind: self.pay_type(),
            id: self.id(),
        }
    }
}

/// Tagged reference from a transaction to its payment detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayDetailRef {
    pub kind: PayType,
    #[serde(rename = "ref")]
    pub id: ObjectId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub source_account: ObjectId,
    pub destination_account: ObjectId,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub pay_detail: PayDetailRef,
    /// Matching journal entry, set once the daily book is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_book: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_draft(draft: TransactionDraft, pay_detail: PayDetailRef) -> Self {
        Self {
            id: ObjectId::new(),
            source_account: draft.source_account,
            destination_account: draft.destination_account,
            amount: draft.amount,
            date: draft.date,
            description: draft.description,
            pay_detail,
            daily_book: None,
            created_at: Utc::now(),
        }
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl Document for Transaction {
    const COLLECTION: &'static str = "transactions";
    const MODEL: &'static str = "Transaction";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub source_account: ObjectId,
    pub destination_account: ObjectId,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_detail_ref_serializes_kind_and_ref() {
        let reference = PayDetailRef {
            kind: PayType::Check,
            id: ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap(),
        };
        let value = serde_json::to_value(reference).unwrap();
        assert_eq!(value["kind"], "check");
        assert_eq!(value["ref"], "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn pay_detail_draft_is_tagged_by_kind() {
        let json = r#"{"kind":"check","checkNumber":"0001","bank":"Central","beneficiary":"ACME","amount":50.0,"issueDate":"2024-05-01"}"#;
        let draft: PayDetailDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.pay_type(), PayType::Check);
        assert_eq!(PayType::parse("Cheque"), Some(PayType::Check));
    }
}
