//! Chart-of-accounts maintenance: creation with generated codes, renames,
//! guarded deletes, paginated listings and the full tree view.

use std::sync::Arc;

use backoffice_domain::{
    AccountGroup, DailyBook, DetailedAccount, Document, FixedAccount, HierarchyLevel, ObjectId,
    TotalAccount, Transaction,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    code_service::HierarchyCodeGenerator,
    daily_book_service::entries_touching,
    pagination::{Page, Pagination},
    store::{ArrayUpdate, DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedNode {
    #[serde(flatten)]
    pub account: FixedAccount,
    pub detailed: Vec<DetailedAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalNode {
    #[serde(flatten)]
    pub account: TotalAccount,
    pub fixed: Vec<FixedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNode {
    #[serde(flatten)]
    pub group: AccountGroup,
    pub totals: Vec<TotalNode>,
}

#[derive(Clone)]
pub struct ChartService {
    store: Arc<dyn DocumentStore>,
    codes: HierarchyCodeGenerator,
}

impl ChartService {
    pub fn new(store: Arc<dyn DocumentStore>, codes: HierarchyCodeGenerator) -> Self {
        Self { store, codes }
    }

    pub fn create_group(&self, name: &str) -> CoreResult<AccountGroup> {
        let name = clean_name(name)?;
        let group = AccountGroup::new(self.codes.group_code()?, name);
        self.store.insert_doc(&group)?;
        info!(id = %group.id, code = %group.code, "account group created");
        Ok(group)
    }

    pub fn create_total(&self, group_id: ObjectId, name: &str) -> CoreResult<TotalAccount> {
        let name = clean_name(name)?;
        let total = TotalAccount::new(self.codes.total_code(group_id)?, name, group_id);
        self.store.insert_doc(&total)?;
        info!(id = %total.id, code = %total.code, "total account created");
        Ok(total)
    }

    pub fn create_fixed(&self, total_id: ObjectId, name: &str) -> CoreResult<FixedAccount> {
        let name = clean_name(name)?;
        let fixed = FixedAccount::new(self.codes.fixed_code(total_id)?, name, total_id);
        self.store.insert_doc(&fixed)?;
        info!(id = %fixed.id, code = %fixed.code, "fixed account created");
        Ok(fixed)
    }

    /// Creates a detailed account and attaches it to `fixed_id`.
    ///
    /// The attach is a single store-side array update, so concurrent creations
    /// under one fixed account all land in its list. The account insert is
    /// undone when the owner cannot be updated.
    pub fn create_detailed(&self, fixed_id: ObjectId, name: &str) -> CoreResult<DetailedAccount> {
        let name = clean_name(name)?;
        let fixed = self.get_fixed(fixed_id)?;
        let detailed = DetailedAccount::new(self.codes.detailed_code()?, name);
        self.store.insert_doc(&detailed)?;

        let attached = match self
            .store
            .update_doc_array::<FixedAccount>(fixed_id, &attach_detailed(detailed.id))
        {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(CoreError::not_found(HierarchyLevel::FixedAccount, fixed_id)),
            Err(err) => Err(err),
        };
        if let Err(err) = attached {
            if let Err(undo) = self.store.delete_doc::<DetailedAccount>(detailed.id) {
                error!(id = %detailed.id, error = %undo, "failed to remove unattached detailed account");
            }
            return Err(err);
        }
        info!(id = %detailed.id, code = %detailed.code, fixed = %fixed.code, "detailed account created");
        Ok(detailed)
    }

    pub fn get_group(&self, id: ObjectId) -> CoreResult<AccountGroup> {
        self.load(id, HierarchyLevel::AccountGroup)
    }

    pub fn get_total(&self, id: ObjectId) -> CoreResult<TotalAccount> {
        self.load(id, HierarchyLevel::TotalAccount)
    }

    pub fn get_fixed(&self, id: ObjectId) -> CoreResult<FixedAccount> {
        self.load(id, HierarchyLevel::FixedAccount)
    }

    pub fn get_detailed(&self, id: ObjectId) -> CoreResult<DetailedAccount> {
        self.load(id, HierarchyLevel::DetailedAccount)
    }

    pub fn rename_group(&self, id: ObjectId, name: &str) -> CoreResult<AccountGroup> {
        self.rename(id, HierarchyLevel::AccountGroup, name, |group: &mut AccountGroup, name| {
            group.name = name
        })
    }

    pub fn rename_total(&self, id: ObjectId, name: &str) -> CoreResult<TotalAccount> {
        self.rename(id, HierarchyLevel::TotalAccount, name, |total: &mut TotalAccount, name| {
            total.name = name
        })
    }

    pub fn rename_fixed(&self, id: ObjectId, name: &str) -> CoreResult<FixedAccount> {
        self.rename(id, HierarchyLevel::FixedAccount, name, |fixed: &mut FixedAccount, name| {
            fixed.name = name
        })
    }

    pub fn rename_detailed(&self, id: ObjectId, name: &str) -> CoreResult<DetailedAccount> {
        self.rename(
            id,
            HierarchyLevel::DetailedAccount,
            name,
            |detailed: &mut DetailedAccount, name| detailed.name = name,
        )
    }

    pub fn delete_group(&self, id: ObjectId) -> CoreResult<()> {
        let group = self.get_group(id)?;
        let children = self
            .store
            .count_docs::<TotalAccount>(&Filter::eq("accountGroup", id))?;
        refuse_with_children(HierarchyLevel::AccountGroup, &group.code, children, "total")?;
        self.remove::<AccountGroup>(id, HierarchyLevel::AccountGroup)
    }

    pub fn delete_total(&self, id: ObjectId) -> CoreResult<()> {
        let total = self.get_total(id)?;
        let children = self
            .store
            .count_docs::<FixedAccount>(&Filter::eq("totalAccount", id))?;
        refuse_with_children(HierarchyLevel::TotalAccount, &total.code, children, "fixed")?;
        self.remove::<TotalAccount>(id, HierarchyLevel::TotalAccount)
    }

    pub fn delete_fixed(&self, id: ObjectId) -> CoreResult<()> {
        let fixed = self.get_fixed(id)?;
        let children = fixed.detailed_accounts.len();
        if children != fixed.detailed_count {
            warn!(
                code = %fixed.code,
                listed = children,
                counted = fixed.detailed_count,
                "fixed account detailed count disagrees with its list"
            );
        }
        refuse_with_children(HierarchyLevel::FixedAccount, &fixed.code, children, "detailed")?;
        self.remove::<FixedAccount>(id, HierarchyLevel::FixedAccount)
    }

    /// Deletes a detailed account no journal line or transaction references,
    /// detaching it from its owning fixed account.
    pub fn delete_detailed(&self, id: ObjectId) -> CoreResult<()> {
        let detailed = self.get_detailed(id)?;
        let lines = self.store.count_docs::<DailyBook>(&entries_touching([&id]))?;
        if lines > 0 {
            return Err(CoreError::Integrity(format!(
                "detailed account `{}` is referenced by {lines} daily book entr{}",
                detailed.code,
                if lines == 1 { "y" } else { "ies" }
            )));
        }
        let transactions = self.store.count_docs::<Transaction>(&Filter::Or(vec![
            Filter::eq("sourceAccount", id),
            Filter::eq("destinationAccount", id),
        ]))?;
        if transactions > 0 {
            return Err(CoreError::Integrity(format!(
                "detailed account `{}` is referenced by {transactions} transaction(s)",
                detailed.code
            )));
        }
        if let Some(owner) = self.owner_of(id)? {
            self.store
                .update_doc_array::<FixedAccount>(owner.id, &detach_detailed(id))?;
        }
        self.remove::<DetailedAccount>(id, HierarchyLevel::DetailedAccount)
    }

    /// Fixed account whose `detailedAccounts` list contains `detailed_id`.
    pub fn owner_of(&self, detailed_id: ObjectId) -> CoreResult<Option<FixedAccount>> {
        self.store
            .find_one::<FixedAccount>(&Filter::eq("detailedAccounts", detailed_id))
    }

    pub fn list_groups(&self, pagination: Pagination, name: Option<&str>) -> CoreResult<Page<AccountGroup>> {
        self.list(Filter::All, pagination, name)
    }

    pub fn list_totals(&self, pagination: Pagination, name: Option<&str>) -> CoreResult<Page<TotalAccount>> {
        self.list(Filter::All, pagination, name)
    }

    pub fn list_fixed(&self, pagination: Pagination, name: Option<&str>) -> CoreResult<Page<FixedAccount>> {
        self.list(Filter::All, pagination, name)
    }

    pub fn list_detailed(
        &self,
        pagination: Pagination,
        name: Option<&str>,
    ) -> CoreResult<Page<DetailedAccount>> {
        self.list(Filter::All, pagination, name)
    }

    pub fn list_totals_of(&self, group_id: ObjectId, pagination: Pagination) -> CoreResult<Page<TotalAccount>> {
        self.get_group(group_id)?;
        self.list(Filter::eq("accountGroup", group_id), pagination, None)
    }

    pub fn list_fixed_of(&self, total_id: ObjectId, pagination: Pagination) -> CoreResult<Page<FixedAccount>> {
        self.get_total(total_id)?;
        self.list(Filter::eq("totalAccount", total_id), pagination, None)
    }

    /// The whole chart nested by level and ordered by code.
    pub fn chart_tree(&self) -> CoreResult<Vec<GroupNode>> {
        let by_code = FindOptions::sorted("code", SortOrder::Ascending);
        let groups = self.store.find_docs::<AccountGroup>(&Filter::All, &by_code)?;
        let totals = self.store.find_docs::<TotalAccount>(&Filter::All, &by_code)?;
        let fixed = self.store.find_docs::<FixedAccount>(&Filter::All, &by_code)?;
        let detailed = self.store.find_docs::<DetailedAccount>(&Filter::All, &by_code)?;

        let fixed_nodes: Vec<FixedNode> = fixed
            .into_iter()
            .map(|account| FixedNode {
                detailed: detailed
                    .iter()
                    .filter(|candidate| account.owns(candidate.id))
                    .cloned()
                    .collect(),
                account,
            })
            .collect();

        let mut total_nodes: Vec<TotalNode> = totals
            .into_iter()
            .map(|account| TotalNode {
                account,
                fixed: Vec::new(),
            })
            .collect();
        for node in fixed_nodes {
            if let Some(parent) = total_nodes
                .iter_mut()
                .find(|total| total.account.id == node.account.total_account)
            {
                parent.fixed.push(node);
            }
        }

        let mut group_nodes: Vec<GroupNode> = groups
            .into_iter()
            .map(|group| GroupNode {
                group,
                totals: Vec::new(),
            })
            .collect();
        for node in total_nodes {
            if let Some(parent) = group_nodes
                .iter_mut()
                .find(|group| group.group.id == node.account.account_group)
            {
                parent.totals.push(node);
            }
        }
        Ok(group_nodes)
    }

    fn list<D: Document>(
        &self,
        scope: Filter,
        pagination: Pagination,
        name: Option<&str>,
    ) -> CoreResult<Page<D>> {
        let filter = match name.map(str::trim).filter(|needle| !needle.is_empty()) {
            Some(needle) => scope.and(Filter::contains_text("name", needle)),
            None => scope,
        };
        self.store
            .find_page(&filter, FindOptions::sorted("code", SortOrder::Ascending), pagination)
    }

    fn load<D: Document>(&self, id: ObjectId, level: HierarchyLevel) -> CoreResult<D> {
        self.store
            .get_doc::<D>(id)?
            .ok_or_else(|| CoreError::not_found(level, id))
    }

    fn rename<D, F>(&self, id: ObjectId, level: HierarchyLevel, name: &str, apply: F) -> CoreResult<D>
    where
        D: Document,
        F: FnOnce(&mut D, String),
    {
        let name = clean_name(name)?;
        let mut document: D = self.load(id, level)?;
        apply(&mut document, name);
        if !self.store.replace_doc(&document)? {
            return Err(CoreError::not_found(level, id));
        }
        info!(%id, %level, "renamed");
        Ok(document)
    }

    fn remove<D: Document>(&self, id: ObjectId, level: HierarchyLevel) -> CoreResult<()> {
        if !self.store.delete_doc::<D>(id)? {
            return Err(CoreError::not_found(level, id));
        }
        info!(%id, %level, "deleted");
        Ok(())
    }
}

fn clean_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn attach_detailed(detailed: ObjectId) -> ArrayUpdate {
    ArrayUpdate::add_to_set(FixedAccount::DETAILED_ACCOUNTS_FIELD, detailed)
        .tracking_length(FixedAccount::DETAILED_COUNT_FIELD)
}

fn detach_detailed(detailed: ObjectId) -> ArrayUpdate {
    ArrayUpdate::pull(FixedAccount::DETAILED_ACCOUNTS_FIELD, detailed)
        .tracking_length(FixedAccount::DETAILED_COUNT_FIELD)
}

fn refuse_with_children(level: HierarchyLevel, code: &str, children: usize, child: &str) -> CoreResult<()> {
    if children == 0 {
        return Ok(());
    }
    Err(CoreError::Integrity(format!(
        "{level} `{code}` still has {children} {child} account(s)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        code_service::CodeStrategy, counter_service::CodeAllocator, test_support::FlakyStore,
        MemoryStore,
    };

    fn service_on(store: Arc<dyn DocumentStore>) -> ChartService {
        let allocator = CodeAllocator::new(store.clone());
        let codes = HierarchyCodeGenerator::new(store.clone(), allocator, CodeStrategy::Atomic);
        ChartService::new(store, codes)
    }

    fn service() -> ChartService {
        service_on(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn created_accounts_carry_hierarchical_codes() {
        let chart = service();
        chart.create_group("Assets").unwrap();
        let group = chart.create_group("Liabilities").unwrap();
        let total = chart.create_total(group.id, "Current").unwrap();
        let fixed = chart.create_fixed(total.id, "Suppliers").unwrap();
        let detailed = chart.create_detailed(fixed.id, "ACME").unwrap();

        assert_eq!(group.code, "02");
        assert_eq!(total.code, "0201");
        assert_eq!(fixed.code, "020101");
        assert_eq!(detailed.code, "00000001");

        let owner = chart.get_fixed(fixed.id).unwrap();
        assert_eq!(owner.detailed_accounts, vec![detailed.id]);
        assert_eq!(owner.detailed_count, 1);
        assert_eq!(chart.owner_of(detailed.id).unwrap().map(|f| f.id), Some(fixed.id));
    }

    #[test]
    fn blank_names_are_rejected() {
        let chart = service();
        assert!(matches!(chart.create_group("   "), Err(CoreError::Validation(_))));
    }

    #[test]
    fn rename_keeps_code() {
        let chart = service();
        let group = chart.create_group("Assets").unwrap();
        let renamed = chart.rename_group(group.id, " Activos ").unwrap();
        assert_eq!(renamed.name, "Activos");
        assert_eq!(renamed.code, group.code);
        assert_eq!(chart.get_group(group.id).unwrap().name, "Activos");
    }

    #[test]
    fn parents_with_children_cannot_be_deleted() {
        let chart = service();
        let group = chart.create_group("Assets").unwrap();
        let total = chart.create_total(group.id, "Current").unwrap();
        let fixed = chart.create_fixed(total.id, "Cash").unwrap();
        let detailed = chart.create_detailed(fixed.id, "Till").unwrap();

        assert!(matches!(chart.delete_group(group.id), Err(CoreError::Integrity(_))));
        assert!(matches!(chart.delete_total(total.id), Err(CoreError::Integrity(_))));
        assert!(matches!(chart.delete_fixed(fixed.id), Err(CoreError::Integrity(_))));

        chart.delete_detailed(detailed.id).unwrap();
        assert_eq!(chart.get_fixed(fixed.id).unwrap().detailed_count, 0);
        chart.delete_fixed(fixed.id).unwrap();
        chart.delete_total(total.id).unwrap();
        chart.delete_group(group.id).unwrap();
        assert!(matches!(chart.get_group(group.id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn failed_attach_removes_the_new_detailed_account() {
        let store = Arc::new(FlakyStore::new());
        let chart = service_on(store.clone());
        let group = chart.create_group("Assets").unwrap();
        let total = chart.create_total(group.id, "Current").unwrap();
        let fixed = chart.create_fixed(total.id, "Cash").unwrap();

        store.fail_update_array_on(FixedAccount::COLLECTION);
        assert!(chart.create_detailed(fixed.id, "Till").is_err());
        assert_eq!(
            store.count_docs::<DetailedAccount>(&Filter::All).unwrap(),
            0
        );
    }

    #[test]
    fn fixed_delete_trusts_the_detailed_list_over_a_stale_count() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let chart = service_on(store.clone());
        let group = chart.create_group("Assets").unwrap();
        let total = chart.create_total(group.id, "Current").unwrap();
        let mut fixed = chart.create_fixed(total.id, "Cash").unwrap();
        fixed.detailed_count = 3;
        store.replace_doc(&fixed).unwrap();

        chart.delete_fixed(fixed.id).unwrap();
        assert!(matches!(chart.get_fixed(fixed.id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn listings_filter_by_name_and_parent() {
        let chart = service();
        let assets = chart.create_group("Assets").unwrap();
        let equity = chart.create_group("Equity").unwrap();
        chart.create_total(assets.id, "Current assets").unwrap();
        chart.create_total(assets.id, "Fixed assets").unwrap();
        chart.create_total(equity.id, "Capital").unwrap();

        let page = chart.list_groups(Pagination::default(), Some("ASS")).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, assets.id);

        let totals = chart.list_totals_of(assets.id, Pagination::default()).unwrap();
        let codes: Vec<_> = totals.items.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, ["0101", "0102"]);
        assert_eq!(chart.list_totals(Pagination::default(), None).unwrap().pagination.total, 3);
    }

    #[test]
    fn chart_tree_nests_every_level() {
        let chart = service();
        let group = chart.create_group("Assets").unwrap();
        let total = chart.create_total(group.id, "Current").unwrap();
        let fixed = chart.create_fixed(total.id, "Cash").unwrap();
        chart.create_detailed(fixed.id, "Till").unwrap();
        chart.create_group("Empty").unwrap();

        let tree = chart.chart_tree().unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].totals[0].fixed[0].detailed[0].name, "Till");
        assert!(tree[1].totals.is_empty());
    }
}
