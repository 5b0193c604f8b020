use std::sync::Arc;

use backoffice::BackOffice;
use backoffice_config::Config;
use backoffice_core::store::DocumentStore;
use backoffice_domain::{DailyBookDraft, DetailedAccount, EntryLine};
use backoffice_storage_json::JsonDocumentStore;
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::tempdir;

/// Two groups of accounts with `entries` journal lines spread across them.
fn seed(office: &BackOffice, entries: usize) -> Vec<DetailedAccount> {
    let chart = office.chart();
    let mut accounts = Vec::new();
    for group_name in ["Assets", "Liabilities"] {
        let group = chart.create_group(group_name).expect("group");
        for t in 0..3 {
            let total = chart
                .create_total(group.id, &format!("{group_name} {t}"))
                .expect("total");
            for f in 0..3 {
                let fixed = chart
                    .create_fixed(total.id, &format!("{group_name} {t}.{f}"))
                    .expect("fixed");
                for d in 0..4 {
                    accounts.push(
                        chart
                            .create_detailed(fixed.id, &format!("{group_name} {t}.{f}.{d}"))
                            .expect("detailed"),
                    );
                }
            }
        }
    }

    let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date");
    for idx in 0..entries {
        let debit = &accounts[idx % accounts.len()];
        let credit = &accounts[(idx * 7 + 3) % accounts.len()];
        let amount = 10.0 + (idx % 90) as f64;
        let draft = DailyBookDraft::new(start + Duration::days((idx % 365) as i64), "bench")
            .debit(EntryLine::new(debit.id, amount))
            .credit(EntryLine::new(credit.id, amount));
        office.daily_books().create(draft).expect("entry");
    }
    accounts
}

fn bench_hierarchy_balance(c: &mut Criterion) {
    let office = BackOffice::in_memory(Config::default()).expect("office");
    let accounts = seed(&office, 2_000);
    let target = accounts[5].id.to_hex();

    c.bench_function("hierarchy_balance_2k_entries", |b| {
        b.iter(|| {
            let balance = office
                .balances()
                .hierarchy_balance(black_box(&target))
                .expect("balance");
            black_box(balance);
        })
    });
}

fn bench_json_store(c: &mut Criterion) {
    let dir = tempdir().expect("tempdir");
    {
        let store: Arc<dyn DocumentStore> =
            Arc::new(JsonDocumentStore::open(dir.path()).expect("store"));
        let office = BackOffice::with_store(store, Config::default()).expect("office");
        seed(&office, 1_000);
    }

    c.bench_function("json_store_open_1k_entries", |b| {
        b.iter(|| {
            let store = JsonDocumentStore::open(black_box(dir.path())).expect("open");
            black_box(store);
        })
    });

    c.bench_function("json_store_allocate_entry_number", |b| {
        b.iter_batched(
            || {
                let store: Arc<dyn DocumentStore> =
                    Arc::new(JsonDocumentStore::open(dir.path()).expect("store"));
                BackOffice::with_store(store, Config::default()).expect("office")
            },
            |office| {
                let accounts = office
                    .chart()
                    .list_detailed(Default::default(), None)
                    .expect("accounts");
                let account = &accounts.items[0];
                let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
                let draft = DailyBookDraft::new(date, "bench")
                    .debit(EntryLine::new(account.id, 1.0))
                    .credit(EntryLine::new(account.id, 1.0));
                black_box(office.daily_books().create(draft).expect("entry"));
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_hierarchy_balance, bench_json_store);
criterion_main!(benches);
