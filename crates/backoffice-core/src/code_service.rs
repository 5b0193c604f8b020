//! Chart-of-accounts code generation.
//!
//! Group, total and fixed codes extend their parent's code with a two-digit sequence
//! (`03` → `0301` → `030101`). Detailed accounts draw from one global eight-digit
//! sequence regardless of which fixed account owns them.
//!
//! Two assignment paths exist. The `next_*_code` operations read the current maximum
//! and add one; concurrent creations at the same level can race and observe the same
//! maximum. The `assign_*_code` operations go through [`CodeAllocator::next_scoped`]
//! with keys `<Model>:<parentId>`; a counter value whose code already exists (for
//! example one written while the read-max strategy was active) is skipped.

use std::sync::Arc;

use backoffice_domain::{
    AccountGroup, Coded, Counter, DetailedAccount, Document, FixedAccount, HierarchyLevel,
    ObjectId, TotalAccount,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    counter_service::CodeAllocator,
    store::{DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

const ROOT_SCOPE: &str = "root";
const GLOBAL_SCOPE: &str = "global";

/// Selects how hierarchy codes are assigned on creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeStrategy {
    /// Scoped atomic counters seeded from existing data.
    #[default]
    Atomic,
    /// Highest existing sibling code plus one.
    ReadMax,
}

#[derive(Clone)]
pub struct HierarchyCodeGenerator {
    store: Arc<dyn DocumentStore>,
    allocator: CodeAllocator,
    strategy: CodeStrategy,
}

impl HierarchyCodeGenerator {
    pub fn new(store: Arc<dyn DocumentStore>, allocator: CodeAllocator, strategy: CodeStrategy) -> Self {
        Self {
            store,
            allocator,
            strategy,
        }
    }

    pub fn strategy(&self) -> CodeStrategy {
        self.strategy
    }

    pub fn group_code(&self) -> CoreResult<String> {
        match self.strategy {
            CodeStrategy::Atomic => self.assign_group_code(),
            CodeStrategy::ReadMax => self.next_group_code(),
        }
    }

    pub fn total_code(&self, group_id: ObjectId) -> CoreResult<String> {
        match self.strategy {
            CodeStrategy::Atomic => self.assign_total_code(group_id),
            CodeStrategy::ReadMax => self.next_total_code(group_id),
        }
    }

    pub fn fixed_code(&self, total_id: ObjectId) -> CoreResult<String> {
        match self.strategy {
            CodeStrategy::Atomic => self.assign_fixed_code(total_id),
            CodeStrategy::ReadMax => self.next_fixed_code(total_id),
        }
    }

    pub fn detailed_code(&self) -> CoreResult<String> {
        match self.strategy {
            CodeStrategy::Atomic => self.assign_detailed_code(),
            CodeStrategy::ReadMax => self.next_detailed_code(),
        }
    }

    pub fn next_group_code(&self) -> CoreResult<String> {
        let current = self.current_group_sequence()?;
        sequence_code("", current + 1, HierarchyLevel::AccountGroup)
    }

    pub fn next_total_code(&self, group_id: ObjectId) -> CoreResult<String> {
        let group = self.load::<AccountGroup>(group_id, HierarchyLevel::AccountGroup)?;
        let current = self.current_total_sequence(&group)?;
        sequence_code(&group.code, current + 1, HierarchyLevel::TotalAccount)
    }

    pub fn next_fixed_code(&self, total_id: ObjectId) -> CoreResult<String> {
        let total = self.load::<TotalAccount>(total_id, HierarchyLevel::TotalAccount)?;
        let current = self.current_fixed_sequence(&total)?;
        sequence_code(&total.code, current + 1, HierarchyLevel::FixedAccount)
    }

    /// Global sequence; the owning fixed account plays no part.
    pub fn next_detailed_code(&self) -> CoreResult<String> {
        let current = self.current_detailed_sequence()?;
        sequence_code("", current + 1, HierarchyLevel::DetailedAccount)
    }

    pub fn assign_group_code(&self) -> CoreResult<String> {
        let key = Counter::scoped_key(AccountGroup::MODEL, ROOT_SCOPE);
        self.allocator.next_scoped::<AccountGroup, _, _>(
            &key,
            || self.current_group_sequence(),
            |sequence| sequence_code("", sequence, HierarchyLevel::AccountGroup),
        )
    }

    pub fn assign_total_code(&self, group_id: ObjectId) -> CoreResult<String> {
        let group = self.load::<AccountGroup>(group_id, HierarchyLevel::AccountGroup)?;
        let key = Counter::scoped_key(TotalAccount::MODEL, &group.id.to_hex());
        self.allocator.next_scoped::<TotalAccount, _, _>(
            &key,
            || self.current_total_sequence(&group),
            |sequence| sequence_code(&group.code, sequence, HierarchyLevel::TotalAccount),
        )
    }

    pub fn assign_fixed_code(&self, total_id: ObjectId) -> CoreResult<String> {
        let total = self.load::<TotalAccount>(total_id, HierarchyLevel::TotalAccount)?;
        let key = Counter::scoped_key(FixedAccount::MODEL, &total.id.to_hex());
        self.allocator.next_scoped::<FixedAccount, _, _>(
            &key,
            || self.current_fixed_sequence(&total),
            |sequence| sequence_code(&total.code, sequence, HierarchyLevel::FixedAccount),
        )
    }

    pub fn assign_detailed_code(&self) -> CoreResult<String> {
        let key = Counter::scoped_key(DetailedAccount::MODEL, GLOBAL_SCOPE);
        self.allocator.next_scoped::<DetailedAccount, _, _>(
            &key,
            || self.current_detailed_sequence(),
            |sequence| sequence_code("", sequence, HierarchyLevel::DetailedAccount),
        )
    }

    fn current_group_sequence(&self) -> CoreResult<u64> {
        self.highest_sequence::<AccountGroup>(Filter::All, HierarchyLevel::AccountGroup, 0)
    }

    fn current_total_sequence(&self, group: &AccountGroup) -> CoreResult<u64> {
        self.highest_sequence::<TotalAccount>(
            Filter::eq("accountGroup", group.id),
            HierarchyLevel::TotalAccount,
            HierarchyLevel::AccountGroup.code_width(),
        )
    }

    fn current_fixed_sequence(&self, total: &TotalAccount) -> CoreResult<u64> {
        self.highest_sequence::<FixedAccount>(
            Filter::eq("totalAccount", total.id),
            HierarchyLevel::FixedAccount,
            HierarchyLevel::TotalAccount.code_width(),
        )
    }

    fn current_detailed_sequence(&self) -> CoreResult<u64> {
        self.highest_sequence::<DetailedAccount>(Filter::All, HierarchyLevel::DetailedAccount, 0)
    }

    /// Sequence encoded in the highest well-formed code among `scope`, or 0.
    fn highest_sequence<D: Document + Coded>(
        &self,
        scope: Filter,
        level: HierarchyLevel,
        suffix_offset: usize,
    ) -> CoreResult<u64> {
        let filter = scope.and(Filter::Regex {
            path: D::CODE_FIELD.to_string(),
            pattern: format!("^[0-9]{{{}}}$", level.code_width()),
            case_insensitive: false,
        });
        let options = FindOptions::sorted(D::CODE_FIELD, SortOrder::Descending).with_limit(1);
        let highest = self.store.find_docs::<D>(&filter, &options)?.into_iter().next();
        let Some(document) = highest else {
            return Ok(0);
        };
        let suffix = document.code().get(suffix_offset..).unwrap_or_default();
        let sequence = suffix.parse::<u64>().map_err(|_| {
            CoreError::Integrity(format!("{level} code `{}` is malformed", document.code()))
        })?;
        debug!(%level, code = document.code(), sequence, "highest existing code");
        Ok(sequence)
    }

    fn load<D: Document>(&self, id: ObjectId, level: HierarchyLevel) -> CoreResult<D> {
        self.store
            .get_doc::<D>(id)?
            .ok_or_else(|| CoreError::not_found(level, id))
    }
}

/// Appends `sequence` to `parent_code` at the level's width, rejecting overflow.
fn sequence_code(parent_code: &str, sequence: u64, level: HierarchyLevel) -> CoreResult<String> {
    let width = level.sequence_width();
    let ceiling = 10u64.pow(width as u32) - 1;
    if sequence == 0 || sequence > ceiling {
        return Err(CoreError::Conflict(format!(
            "{level} codes under `{parent_code}` are exhausted (max {ceiling})"
        )));
    }
    Ok(format!("{parent_code}{sequence:0width$}"))
}
