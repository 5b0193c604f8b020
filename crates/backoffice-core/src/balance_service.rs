//! Debit/credit aggregation for a detailed account and every ancestor level.

use std::{collections::HashSet, sync::Arc};

use backoffice_domain::{
    AccountGroup, Coded, DailyBook, DetailedAccount, Document, EntryLine, FixedAccount,
    HierarchyLevel, NamedEntity, ObjectId, TotalAccount,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    daily_book_service::entries_touching,
    store::{DocumentStore, Filter, FindOptions, StoreExt},
    CoreError, CoreResult,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelBalance {
    pub id: ObjectId,
    pub code: String,
    pub name: String,
    pub total_debit: f64,
    pub total_credit: f64,
    pub net: f64,
}

impl LevelBalance {
    fn of<D: Document + Coded + NamedEntity>(account: &D, (total_debit, total_credit): (f64, f64)) -> Self {
        Self {
            id: account.id(),
            code: account.code().to_string(),
            name: account.name().to_string(),
            total_debit,
            total_credit,
            net: total_debit - total_credit,
        }
    }
}

/// Balances of one detailed account and its fixed, total and group ancestors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyBalance {
    pub detailed_account: LevelBalance,
    pub fixed_account: LevelBalance,
    pub total_account: LevelBalance,
    pub account_group: LevelBalance,
}

#[derive(Clone)]
pub struct BalanceService {
    store: Arc<dyn DocumentStore>,
}

impl BalanceService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolves the ancestors of `detailed_id` and sums every journal line that
    /// touches each level's set of detailed accounts.
    ///
    /// Journal entries are fetched once for the widest (group) set; the narrower
    /// sums are evaluated over that same snapshot.
    pub fn hierarchy_balance(&self, detailed_id: &str) -> CoreResult<HierarchyBalance> {
        let id = ObjectId::parse_str(detailed_id)?;
        let detailed: DetailedAccount = self.load(id, HierarchyLevel::DetailedAccount)?;
        let fixed = self
            .store
            .find_one::<FixedAccount>(&Filter::eq("detailedAccounts", id))?
            .ok_or_else(|| {
                CoreError::not_found(HierarchyLevel::FixedAccount, format!("owner of {id}"))
            })?;
        let total: TotalAccount = self.load(fixed.total_account, HierarchyLevel::TotalAccount)?;
        let group: AccountGroup = self.load(total.account_group, HierarchyLevel::AccountGroup)?;

        let group_totals = self
            .store
            .find_docs::<TotalAccount>(&Filter::eq("accountGroup", group.id), &FindOptions::default())?;
        let group_fixed = self.store.find_docs::<FixedAccount>(
            &Filter::is_in("totalAccount", group_totals.iter().map(|t| t.id)),
            &FindOptions::default(),
        )?;

        let detailed_set: HashSet<ObjectId> = [id].into_iter().collect();
        let fixed_set: HashSet<ObjectId> = fixed.detailed_accounts.iter().copied().collect();
        let total_set: HashSet<ObjectId> = group_fixed
            .iter()
            .filter(|candidate| candidate.total_account == total.id)
            .flat_map(|candidate| candidate.detailed_accounts.iter().copied())
            .collect();
        let mut group_set: HashSet<ObjectId> = group_fixed
            .iter()
            .flat_map(|candidate| candidate.detailed_accounts.iter().copied())
            .collect();
        group_set.extend(total_set.iter().chain(fixed_set.iter()).copied());
        group_set.insert(id);

        let books = self
            .store
            .find_docs::<DailyBook>(&entries_touching(&group_set), &FindOptions::default())?;
        debug!(
            detailed = %detailed.code,
            books = books.len(),
            accounts = group_set.len(),
            "aggregating hierarchy balance"
        );

        Ok(HierarchyBalance {
            detailed_account: LevelBalance::of(&detailed, sum_lines(&books, &detailed_set)),
            fixed_account: LevelBalance::of(&fixed, sum_lines(&books, &fixed_set)),
            total_account: LevelBalance::of(&total, sum_lines(&books, &total_set)),
            account_group: LevelBalance::of(&group, sum_lines(&books, &group_set)),
        })
    }

    fn load<D: Document>(&self, id: ObjectId, level: HierarchyLevel) -> CoreResult<D> {
        self.store
            .get_doc::<D>(id)?
            .ok_or_else(|| CoreError::not_found(level, id))
    }
}

/// Debit and credit totals over lines touching `accounts`, each line counted once.
pub fn sum_lines(books: &[DailyBook], accounts: &HashSet<ObjectId>) -> (f64, f64) {
    let side = |lines: &[EntryLine]| -> f64 {
        lines
            .iter()
            .filter(|line| line.touches(accounts))
            .map(|line| line.amount)
            .sum()
    };
    books.iter().fold((0.0, 0.0), |(debit, credit), book| {
        (
            debit + side(&book.debit_entries),
            credit + side(&book.credit_entries),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_domain::{DailyBookDraft, ObjectId};
    use chrono::NaiveDate;

    struct Chart {
        store: Arc<dyn DocumentStore>,
        cash: DetailedAccount,
        bank: DetailedAccount,
        sibling_total_account: DetailedAccount,
        other_group_account: DetailedAccount,
    }

    fn chart() -> Chart {
        let store: Arc<dyn DocumentStore> = Arc::new(crate::MemoryStore::new());
        let group = AccountGroup::new("01", "Assets");
        let other_group = AccountGroup::new("02", "Liabilities");
        let total = TotalAccount::new("0101", "Current", group.id);
        let sibling_total = TotalAccount::new("0102", "Non-current", group.id);
        let other_total = TotalAccount::new("0201", "Payables", other_group.id);

        let cash = DetailedAccount::new("00000001", "Cash");
        let bank = DetailedAccount::new("00000002", "Bank");
        let sibling_total_account = DetailedAccount::new("00000003", "Land");
        let other_group_account = DetailedAccount::new("00000004", "Supplier");

        let mut fixed = FixedAccount::new("010101", "Cash and banks", total.id);
        fixed.attach(cash.id);
        let mut fixed_two = FixedAccount::new("010102", "Banks", total.id);
        fixed_two.attach(bank.id);
        let mut sibling_fixed = FixedAccount::new("010201", "Property", sibling_total.id);
        sibling_fixed.attach(sibling_total_account.id);
        let mut other_fixed = FixedAccount::new("020101", "Suppliers", other_total.id);
        other_fixed.attach(other_group_account.id);

        for group in [&group, &other_group] {
            store.insert_doc(group).unwrap();
        }
        for total in [&total, &sibling_total, &other_total] {
            store.insert_doc(total).unwrap();
        }
        for fixed in [&fixed, &fixed_two, &sibling_fixed, &other_fixed] {
            store.insert_doc(fixed).unwrap();
        }
        for account in [&cash, &bank, &sibling_total_account, &other_group_account] {
            store.insert_doc(account).unwrap();
        }
        Chart {
            store,
            cash,
            bank,
            sibling_total_account,
            other_group_account,
        }
    }

    fn book(store: &Arc<dyn DocumentStore>, draft: DailyBookDraft) {
        let number = format!("AS{:04}", store.count_docs::<DailyBook>(&Filter::All).unwrap() + 1);
        store.insert_doc(&DailyBook::from_draft(number, draft)).unwrap();
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn detailed_net_rolls_up_to_every_level() {
        let chart = chart();
        book(
            &chart.store,
            DailyBookDraft::new(date(), "deposit").debit(EntryLine::new(chart.cash.id, 1000.0)),
        );
        book(
            &chart.store,
            DailyBookDraft::new(date(), "withdrawal").credit(EntryLine::new(chart.cash.id, 400.0)),
        );

        let balance = BalanceService::new(chart.store.clone())
            .hierarchy_balance(&chart.cash.id.to_hex())
            .unwrap();
        assert_eq!(balance.detailed_account.total_debit, 1000.0);
        assert_eq!(balance.detailed_account.total_credit, 400.0);
        assert_eq!(balance.detailed_account.net, 600.0);
        for level in [&balance.fixed_account, &balance.total_account, &balance.account_group] {
            assert_eq!(level.net, 600.0);
        }
        assert_eq!(balance.account_group.code, "01");
    }

    #[test]
    fn each_level_only_sums_its_own_accounts() {
        let chart = chart();
        book(
            &chart.store,
            DailyBookDraft::new(date(), "mixed")
                .debit(EntryLine::new(chart.cash.id, 10.0))
                .debit(EntryLine::new(chart.bank.id, 20.0))
                .debit(EntryLine::new(chart.sibling_total_account.id, 40.0))
                .credit(EntryLine::new(chart.other_group_account.id, 70.0)),
        );

        let balance = BalanceService::new(chart.store.clone())
            .hierarchy_balance(&chart.cash.id.to_hex())
            .unwrap();
        assert_eq!(balance.detailed_account.total_debit, 10.0);
        assert_eq!(balance.fixed_account.total_debit, 10.0);
        assert_eq!(balance.total_account.total_debit, 30.0);
        assert_eq!(balance.account_group.total_debit, 70.0);
        assert_eq!(balance.account_group.total_credit, 0.0);
    }

    #[test]
    fn a_line_naming_two_members_counts_once() {
        let chart = chart();
        book(
            &chart.store,
            DailyBookDraft::new(date(), "transfer")
                .debit(EntryLine::new(chart.cash.id, 50.0).with_secondary(chart.bank.id)),
        );
        let balance = BalanceService::new(chart.store.clone())
            .hierarchy_balance(&chart.bank.id.to_hex())
            .unwrap();
        assert_eq!(balance.detailed_account.total_debit, 50.0);
        assert_eq!(balance.total_account.total_debit, 50.0);
    }

    #[test]
    fn missing_links_fail_the_whole_request() {
        let chart = chart();
        let service = BalanceService::new(chart.store.clone());
        assert!(matches!(
            service.hierarchy_balance("not-an-id"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            service.hierarchy_balance(&ObjectId::new().to_hex()),
            Err(CoreError::NotFound { ref entity, .. }) if entity == "detailed account"
        ));

        let orphan = DetailedAccount::new("00000099", "Orphan");
        chart.store.insert_doc(&orphan).unwrap();
        assert!(matches!(
            service.hierarchy_balance(&orphan.id.to_hex()),
            Err(CoreError::NotFound { ref entity, .. }) if entity == "fixed account"
        ));
    }
}
