//! Daily book (journal) entries and their debit/credit lines.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

const BALANCE_TOLERANCE: f64 = 0.005;

/// One debit or credit line posted against up to two detailed accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryLine {
    pub detailed1: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed2: Option<ObjectId>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl EntryLine {
    pub fn new(detailed1: ObjectId, amount: f64) -> Self {
        Self {
            detailed1,
            detailed2: None,
            amount,
            memo: None,
        }
    }

    pub fn with_secondary(mut self, detailed2: ObjectId) -> Self {
        self.detailed2 = Some(detailed2);
        self
    }

    /// True when either referenced account is in `accounts`.
    pub fn touches(&self, accounts: &HashSet<ObjectId>) -> bool {
        accounts.contains(&self.detailed1)
            || self
                .detailed2
                .map(|id| accounts.contains(&id))
                .unwrap_or(false)
    }

    pub fn accounts(&self) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::once(self.detailed1).chain(self.detailed2)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyBook {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub document_number: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub debit_entries: Vec<EntryLine>,
    #[serde(default)]
    pub credit_entries: Vec<EntryLine>,
    pub created_at: DateTime<Utc>,
}

impl DailyBook {
    pub fn from_draft(document_number: impl Into<String>, draft: DailyBookDraft) -> Self {
        Self {
            id: ObjectId::new(),
            document_number: document_number.into(),
            date: draft.date,
            description: draft.description,
            debit_entries: draft.debit_entries,
            credit_entries: draft.credit_entries,
            created_at: Utc::now(),
        }
    }

    pub fn total_debit(&self) -> f64 {
        self.debit_entries.iter().map(|line| line.amount).sum()
    }

    pub fn total_credit(&self) -> f64 {
        self.credit_entries.iter().map(|line| line.amount).sum()
    }

    pub fn is_balanced(&self) -> bool {
        (self.total_debit() - self.total_credit()).abs() < BALANCE_TOLERANCE
    }

    /// Every detailed account referenced by any line, deduplicated.
    pub fn referenced_accounts(&self) -> HashSet<ObjectId> {
        self.debit_entries
            .iter()
            .chain(self.credit_entries.iter())
            .flat_map(EntryLine::accounts)
            .collect()
    }
}

impl Identifiable for DailyBook {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl Coded for DailyBook {
    const CODE_FIELD: &'static str = "documentNumber";

    fn code(&self) -> &str {
        &self.document_number
    }
}

impl Document for DailyBook {
    const COLLECTION: &'static str = "dailybooks";
    const MODEL: &'static str = "DailyBook";
}

/// Caller-supplied journal entry; the document number is allocated when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyBookDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub debit_entries: Vec<EntryLine>,
    #[serde(default)]
    pub credit_entries: Vec<EntryLine>,
}

impl DailyBookDraft {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            document_number: None,
            date,
            description: description.into(),
            debit_entries: Vec::new(),
            credit_entries: Vec::new(),
        }
    }

    pub fn debit(mut self, line: EntryLine) -> Self {
        self.debit_entries.push(line);
        self
    }

    pub fn credit(mut self, line: EntryLine) -> Self {
        self.credit_entries.push(line);
        self
    }

    pub fn lines(&self) -> impl Iterator<Item = &EntryLine> {
        self.debit_entries.iter().chain(self.credit_entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_touches_secondary_account() {
        let primary = ObjectId::new();
        let secondary = ObjectId::new();
        let line = EntryLine::new(primary, 10.0).with_secondary(secondary);
        let set: HashSet<_> = [secondary].into_iter().collect();
        assert!(line.touches(&set));
        assert!(!line.touches(&HashSet::new()));
    }

    #[test]
    fn balance_compares_debit_and_credit_totals() {
        let account = ObjectId::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let draft = DailyBookDraft::new(date, "Opening")
            .debit(EntryLine::new(account, 1000.0))
            .credit(EntryLine::new(account, 400.0))
            .credit(EntryLine::new(account, 600.0));
        let book = DailyBook::from_draft("AS0001", draft);
        assert!(book.is_balanced());
        assert_eq!(book.referenced_accounts().len(), 1);
    }
}
