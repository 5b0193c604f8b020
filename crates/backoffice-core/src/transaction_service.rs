//! Multi-document transaction processing.
//!
//! A transaction writes a payment detail, the transaction itself and its journal
//! entry, then links the transaction to the entry. The store offers no
//! multi-document atomicity, so the writes run as a [`Saga`]: every completed step
//! registers an undo, and a failing step unwinds the registered undos newest first.

use std::sync::Arc;

use backoffice_domain::{
    Check, DailyBook, DailyBookDraft, DetailedAccount, HierarchyLevel, ObjectId, PayDetail,
    PayDetailDraft, PayType, Transaction, TransactionDraft,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    daily_book_service::DailyBookService,
    pagination::{Page, Pagination},
    store::{DocumentStore, Filter, FindOptions, SortOrder, StoreExt},
    CoreError, CoreResult,
};

type Compensation = Box<dyn FnOnce(&dyn DocumentStore) -> CoreResult<()>>;

/// Ordered list of completed writes and how to undo them.
pub struct Saga<'a> {
    name: &'static str,
    store: &'a dyn DocumentStore,
    compensations: Vec<(&'static str, Compensation)>,
}

impl<'a> Saga<'a> {
    pub fn new(name: &'static str, store: &'a dyn DocumentStore) -> Self {
        Self {
            name,
            store,
            compensations: Vec::new(),
        }
    }

    /// Runs one step; on failure unwinds every registered compensation and
    /// returns the step's error unchanged.
    pub fn run<T>(&mut self, step: &'static str, action: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        action().map_err(|err| {
            warn!(saga = self.name, step, error = %err, "saga step failed, compensating");
            self.unwind();
            err
        })
    }

    pub fn compensate(
        &mut self,
        label: &'static str,
        undo: impl FnOnce(&dyn DocumentStore) -> CoreResult<()> + 'static,
    ) {
        self.compensations.push((label, Box::new(undo)));
    }

    /// Drops the compensations; the completed writes stand.
    pub fn commit(mut self) {
        self.compensations.clear();
    }

    fn unwind(&mut self) {
        while let Some((label, undo)) = self.compensations.pop() {
            if let Err(err) = undo(self.store) {
                error!(saga = self.name, compensation = label, error = %err, "compensation failed");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTransaction {
    pub pay_detail: PayDetail,
    pub transaction: Transaction,
    pub daily_book: DailyBook,
}

/// A stored transaction with its payment detail resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub transaction: Transaction,
    pub pay_detail: PayDetail,
}

#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn DocumentStore>,
    daily_books: DailyBookService,
}

impl TransactionService {
    pub fn new(store: Arc<dyn DocumentStore>, daily_books: DailyBookService) -> Self {
        Self { store, daily_books }
    }

    /// Creates the payment detail, transaction and journal entry and links them.
    ///
    /// Any failure leaves none of the three documents behind.
    pub fn process_transaction(
        &self,
        pay_type: PayType,
        pay_detail: PayDetailDraft,
        transaction: TransactionDraft,
        daily_book: DailyBookDraft,
    ) -> CoreResult<ProcessedTransaction> {
        if pay_detail.pay_type() != pay_type {
            return Err(CoreError::Validation(format!(
                "payment detail is a {} but pay type is {pay_type}",
                pay_detail.pay_type()
            )));
        }
        self.validate(&transaction)?;

        let store = self.store.as_ref();
        let mut saga = Saga::new("process_transaction", store);

        let pay_detail = saga.run("pay detail", || self.create_pay_detail(pay_detail))?;
        let pay_ref = pay_detail.reference();
        saga.compensate("delete pay detail", move |store| {
            delete_pay_detail(store, pay_ref.kind, pay_ref.id)
        });

        let mut transaction = Transaction::from_draft(transaction, pay_ref);
        saga.run("transaction", || store.insert_doc(&transaction))?;
        let transaction_id = transaction.id;
        saga.compensate("delete transaction", move |store| {
            store.delete_doc::<Transaction>(transaction_id).map(drop)
        });

        let daily_book = saga.run("daily book", || self.daily_books.create(daily_book))?;
        let book_id = daily_book.id;
        saga.compensate("delete daily book", move |store| {
            store.delete_doc::<DailyBook>(book_id).map(drop)
        });

        transaction.daily_book = Some(daily_book.id);
        saga.run("link daily book", || match store.replace_doc(&transaction)? {
            true => Ok(()),
            false => Err(CoreError::not_found("transaction", transaction_id)),
        })?;
        saga.commit();

        info!(
            transaction = %transaction.id,
            pay_detail = %pay_detail.id(),
            daily_book = %daily_book.document_number,
            "transaction processed"
        );
        Ok(ProcessedTransaction {
            pay_detail,
            transaction,
            daily_book,
        })
    }

    pub fn get_transaction(&self, id: ObjectId) -> CoreResult<TransactionDetails> {
        let transaction = self
            .store
            .get_doc::<Transaction>(id)?
            .ok_or_else(|| CoreError::not_found("transaction", id))?;
        let reference = transaction.pay_detail;
        let pay_detail = match reference.kind {
            PayType::Check => self
                .store
                .get_doc::<Check>(reference.id)?
                .map(PayDetail::Check),
        }
        .ok_or_else(|| {
            CoreError::Integrity(format!(
                "transaction {id} references missing {} {}",
                reference.kind, reference.id
            ))
        })?;
        Ok(TransactionDetails {
            transaction,
            pay_detail,
        })
    }

    /// Newest first.
    pub fn list_transactions(&self, pagination: Pagination) -> CoreResult<Page<Transaction>> {
        let mut options = FindOptions::sorted("date", SortOrder::Descending);
        options
            .sort
            .push(("createdAt".into(), SortOrder::Descending));
        self.store.find_page(&Filter::All, options, pagination)
    }

    fn validate(&self, draft: &TransactionDraft) -> CoreResult<()> {
        if !draft.amount.is_finite() || draft.amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "transaction amount must be positive, got {}",
                draft.amount
            )));
        }
        for account in [draft.source_account, draft.destination_account] {
            if self.store.get_doc::<DetailedAccount>(account)?.is_none() {
                return Err(CoreError::not_found(HierarchyLevel::DetailedAccount, account));
            }
        }
        Ok(())
    }

    fn create_pay_detail(&self, draft: PayDetailDraft) -> CoreResult<PayDetail> {
        match draft {
            PayDetailDraft::Check(check) => {
                if check.check_number.trim().is_empty() {
                    return Err(CoreError::Validation("check number must not be empty".into()));
                }
                if !check.amount.is_finite() || check.amount <= 0.0 {
                    return Err(CoreError::Validation(format!(
                        "check amount must be positive, got {}",
                        check.amount
                    )));
                }
                let check = check.into_check();
                self.store.insert_doc(&check)?;
                Ok(PayDetail::Check(check))
            }
        }
    }
}

fn delete_pay_detail(store: &dyn DocumentStore, kind: PayType, id: ObjectId) -> CoreResult<()> {
    match kind {
        PayType::Check => store.delete_doc::<Check>(id).map(drop),
    }
}
