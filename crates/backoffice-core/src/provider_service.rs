use std::sync::Arc;

use backoffice_domain::{ObjectId, Provider, ProviderDraft};
use tracing::info;

use crate::{
    counter_service::CodeAllocator,
    pagination::{Page, Pagination},
    store::{DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

pub const DEFAULT_PROVIDER_PREFIX: &str = "PRV";

#[derive(Clone)]
pub struct ProviderService {
    store: Arc<dyn DocumentStore>,
    allocator: CodeAllocator,
    prefix: String,
}

impl ProviderService {
    pub fn new(store: Arc<dyn DocumentStore>, allocator: CodeAllocator, prefix: impl Into<String>) -> Self {
        Self {
            store,
            allocator,
            prefix: prefix.into(),
        }
    }

    pub fn create(&self, draft: ProviderDraft) -> CoreResult<Provider> {
        let draft = normalize(draft)?;
        if self
            .store
            .count_docs::<Provider>(&Filter::eq("taxId", &draft.tax_id))?
            > 0
        {
            return Err(CoreError::Conflict(format!(
                "a provider with tax id `{}` already exists",
                draft.tax_id
            )));
        }
        let code = self.allocator.next_code::<Provider>(&self.prefix)?;
        let provider = Provider::from_draft(code, draft);
        self.store.insert_doc(&provider)?;
        info!(id = %provider.id, code = %provider.code, "provider created");
        Ok(provider)
    }

    pub fn get(&self, id: ObjectId) -> CoreResult<Provider> {
        self.store
            .get_doc::<Provider>(id)?
            .ok_or_else(|| CoreError::not_found("provider", id))
    }

    /// Lists providers by code, optionally matching `search` against name or tax id.
    pub fn list(&self, pagination: Pagination, search: Option<&str>) -> CoreResult<Page<Provider>> {
        let filter = match search.map(str::trim).filter(|needle| !needle.is_empty()) {
            Some(needle) => Filter::Or(vec![
                Filter::contains_text("name", needle),
                Filter::contains_text("taxId", needle),
            ]),
            None => Filter::All,
        };
        self.store
            .find_page(&filter, FindOptions::sorted("code", SortOrder::Ascending), pagination)
    }

    /// Replaces descriptive fields; the code is kept.
    pub fn update(&self, id: ObjectId, draft: ProviderDraft) -> CoreResult<Provider> {
        let draft = normalize(draft)?;
        let mut provider = self.get(id)?;
        let clash = self
            .store
            .find_one::<Provider>(&Filter::eq("taxId", &draft.tax_id))?
            .filter(|other| other.id != id);
        if let Some(other) = clash {
            return Err(CoreError::Conflict(format!(
                "tax id `{}` already belongs to {}",
                draft.tax_id, other.code
            )));
        }
        provider.name = draft.name;
        provider.tax_id = draft.tax_id;
        provider.email = draft.email;
        if !self.store.replace_doc(&provider)? {
            return Err(CoreError::not_found("provider", id));
        }
        info!(%id, "provider updated");
        Ok(provider)
    }

    pub fn delete(&self, id: ObjectId) -> CoreResult<()> {
        if !self.store.delete_doc::<Provider>(id)? {
            return Err(CoreError::not_found("provider", id));
        }
        info!(%id, "provider deleted");
        Ok(())
    }
}

fn normalize(draft: ProviderDraft) -> CoreResult<ProviderDraft> {
    let name = draft.name.trim().to_string();
    let tax_id = draft.tax_id.trim().to_string();
    if name.is_empty() || tax_id.is_empty() {
        return Err(CoreError::Validation(
            "provider name and tax id are required".into(),
        ));
    }
    let email = draft
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(CoreError::Validation(format!("`{email}` is not an email address")));
        }
    }
    Ok(ProviderDraft { name, tax_id, email })
}
