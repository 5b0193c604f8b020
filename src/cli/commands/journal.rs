use backoffice_core::Pagination;
use backoffice_domain::{
    CheckDraft, DailyBook, DailyBookDraft, DetailedAccount, EntryLine, ObjectId, PayDetail,
    PayDetailDraft, PayType, TransactionDraft,
};
use chrono::{Local, NaiveDate};

use super::{parse_amount, print_page_footer, Args};
use crate::app::parse_id;
use crate::cli::output::{self, amount};
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::{CommandError, CommandResult, ShellContext};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "journal",
            "Record a journal entry between two detailed accounts",
            "journal <debit-account> <credit-account> <amount> [description] [--date <YYYY-MM-DD>] [--number <doc>]",
            cmd_journal,
        ),
        CommandEntry::new(
            "entries",
            "List journal entries",
            "entries [--from <date> --to <date>] [--page <n>] [--limit <n>]",
            cmd_entries,
        ),
        CommandEntry::new("entry", "Show one journal entry", "entry <number>", cmd_entry),
        CommandEntry::new(
            "unjournal",
            "Delete a journal entry not linked to a transaction",
            "unjournal <number>",
            cmd_unjournal,
        ),
        CommandEntry::new(
            "balance",
            "Show debit/credit totals for a detailed account and its ancestors",
            "balance <detailed-account>",
            cmd_balance,
        ),
        CommandEntry::new(
            "pay",
            "Record a payment with its journal entry",
            "pay <source> <destination> <amount> [description] --check <number> [--bank <name>] [--beneficiary <name>] [--date <date>] [--type check]",
            cmd_pay,
        ),
        CommandEntry::new(
            "transactions",
            "List payments, newest first",
            "transactions [--page <n>] [--limit <n>]",
            cmd_transactions,
        ),
        CommandEntry::new(
            "transaction",
            "Show a payment and its payment detail",
            "transaction <id>",
            cmd_transaction,
        ),
    ]
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn account_code(context: &ShellContext, id: ObjectId) -> String {
    context
        .office
        .chart()
        .get_detailed(id)
        .map(|account| account.code)
        .unwrap_or_else(|_| id.to_hex())
}

fn warn_outside_fiscal_years(context: &ShellContext, date: NaiveDate) -> CommandResult {
    let years = context.office.fiscal_years();
    if years.list(Pagination::default())?.pagination.total == 0 {
        return Ok(());
    }
    if years.open_year_for(date)?.is_none() {
        output::warning(format!("No open fiscal year covers {date}."));
    }
    Ok(())
}

fn cmd_journal(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "journal <debit-account> <credit-account> <amount> [description]";
    let args = Args::parse(raw, &["date", "number"])?;
    let debit: DetailedAccount = context.office.resolve(args.required(0, USAGE)?)?;
    let credit: DetailedAccount = context.office.resolve(args.required(1, USAGE)?)?;
    let value = parse_amount(args.required(2, USAGE)?)?;
    let date = args.date_option("date")?.unwrap_or_else(today);

    let mut draft = DailyBookDraft::new(date, args.rest(3).unwrap_or_default())
        .debit(EntryLine::new(debit.id, value))
        .credit(EntryLine::new(credit.id, value));
    draft.document_number = args.option("number").map(str::to_string);

    warn_outside_fiscal_years(context, date)?;
    let book = context.office.daily_books().create(draft)?;
    output::success(format!(
        "Recorded entry {} on {}: {} debit {} / credit {}.",
        book.document_number,
        book.date,
        amount(value),
        debit.code,
        credit.code
    ));
    Ok(())
}

fn cmd_entries(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["from", "to", "page", "limit"])?;
    let range = match (args.date_option("from")?, args.date_option("to")?) {
        (Some(from), Some(to)) => Some((from, to)),
        (None, None) => None,
        _ => {
            return Err(CommandError::InvalidArguments(
                "use --from and --to together".into(),
            ))
        }
    };
    let page = context
        .office
        .daily_books()
        .list(args.pagination(context)?, range)?;

    if page.items.is_empty() {
        output::info("No journal entries.");
    } else {
        let rows: Vec<Vec<String>> = page
            .items
            .iter()
            .map(|book| {
                vec![
                    book.document_number.clone(),
                    book.date.to_string(),
                    book.description.clone(),
                    amount(book.total_debit()),
                    amount(book.total_credit()),
                ]
            })
            .collect();
        output::print_table(&["Number", "Date", "Description", "Debit", "Credit"], &rows);
    }
    print_page_footer(&page);
    Ok(())
}

fn cmd_entry(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let book: DailyBook = context.office.resolve(args.required(0, "entry <number>")?)?;

    output::section(format!("Entry {} ({})", book.document_number, book.date));
    if !book.description.is_empty() {
        output::info(format!("  {}", book.description));
    }
    let mut rows = Vec::new();
    for (side, lines) in [("debit", &book.debit_entries), ("credit", &book.credit_entries)] {
        for line in lines {
            rows.push(vec![
                side.to_string(),
                account_code(context, line.detailed1),
                line.detailed2
                    .map(|id| account_code(context, id))
                    .unwrap_or_default(),
                amount(line.amount),
                line.memo.clone().unwrap_or_default(),
            ]);
        }
    }
    output::print_table(&["Side", "Account", "Secondary", "Amount", "Memo"], &rows);
    if !book.is_balanced() {
        output::warning("This entry is not balanced.");
    }
    Ok(())
}

fn cmd_unjournal(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let book: DailyBook = context.office.resolve(args.required(0, "unjournal <number>")?)?;
    context.office.daily_books().delete(book.id)?;
    output::success(format!("Deleted entry {}.", book.document_number));
    Ok(())
}

fn cmd_balance(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let detailed: DetailedAccount = context
        .office
        .resolve(args.required(0, "balance <detailed-account>")?)?;
    let balance = context
        .office
        .balances()
        .hierarchy_balance(&detailed.id.to_hex())?;

    output::section(format!("Balance for {} {}", detailed.code, detailed.name));
    let rows: Vec<Vec<String>> = [
        ("Detailed", &balance.detailed_account),
        ("Fixed", &balance.fixed_account),
        ("Total", &balance.total_account),
        ("Group", &balance.account_group),
    ]
    .into_iter()
    .map(|(level, row)| {
        vec![
            level.to_string(),
            row.code.clone(),
            row.name.clone(),
            amount(row.total_debit),
            amount(row.total_credit),
            amount(row.net),
        ]
    })
    .collect();
    output::print_table(&["Level", "Code", "Name", "Debit", "Credit", "Net"], &rows);
    Ok(())
}

fn cmd_pay(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    const USAGE: &str = "pay <source> <destination> <amount> [description] --check <number>";
    let args = Args::parse(raw, &["check", "bank", "beneficiary", "date", "type"])?;
    let source: DetailedAccount = context.office.resolve(args.required(0, USAGE)?)?;
    let destination: DetailedAccount = context.office.resolve(args.required(1, USAGE)?)?;
    let value = parse_amount(args.required(2, USAGE)?)?;
    let description = args.rest(3).unwrap_or_default();
    let date = args.date_option("date")?.unwrap_or_else(today);

    let kind = args.option("type").unwrap_or("check");
    let pay_type = PayType::parse(kind)
        .ok_or_else(|| CommandError::InvalidArguments(format!("unknown payment type `{kind}`")))?;
    let check_number = args
        .option("check")
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {USAGE}")))?;
    let pay_detail = PayDetailDraft::Check(CheckDraft {
        check_number: check_number.to_string(),
        bank: args.option("bank").unwrap_or_default().to_string(),
        beneficiary: args
            .option("beneficiary")
            .map(str::to_string)
            .unwrap_or_else(|| destination.name.clone()),
        amount: value,
        issue_date: date,
    });
    let transaction = TransactionDraft {
        source_account: source.id,
        destination_account: destination.id,
        amount: value,
        date,
        description: description.clone(),
    };
    let entry = DailyBookDraft::new(date, description)
        .debit(EntryLine::new(destination.id, value))
        .credit(EntryLine::new(source.id, value));

    warn_outside_fiscal_years(context, date)?;
    let processed = context
        .office
        .transactions()
        .process_transaction(pay_type, pay_detail, transaction, entry)?;
    output::success(format!(
        "Recorded transaction {} as entry {} ({} {}).",
        processed.transaction.id,
        processed.daily_book.document_number,
        processed.pay_detail.pay_type(),
        check_number
    ));
    Ok(())
}

fn cmd_transactions(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &["page", "limit"])?;
    let page = context
        .office
        .transactions()
        .list_transactions(args.pagination(context)?)?;

    if page.items.is_empty() {
        output::info("No transactions.");
    } else {
        let rows: Vec<Vec<String>> = page
            .items
            .iter()
            .map(|transaction| {
                let entry = transaction
                    .daily_book
                    .and_then(|id| context.office.daily_books().get(id).ok())
                    .map(|book| book.document_number)
                    .unwrap_or_else(|| "-".into());
                vec![
                    transaction.id.to_hex(),
                    transaction.date.to_string(),
                    account_code(context, transaction.source_account),
                    account_code(context, transaction.destination_account),
                    amount(transaction.amount),
                    entry,
                ]
            })
            .collect();
        output::print_table(
            &["Id", "Date", "Source", "Destination", "Amount", "Entry"],
            &rows,
        );
    }
    print_page_footer(&page);
    Ok(())
}

fn cmd_transaction(context: &mut ShellContext, raw: &[&str]) -> CommandResult {
    let args = Args::parse(raw, &[])?;
    let id = parse_id(args.required(0, "transaction <id>")?)?;
    let details = context.office.transactions().get_transaction(id)?;
    let transaction = &details.transaction;

    output::section(format!("Transaction {}", transaction.id));
    output::info(format!("  Date        : {}", transaction.date));
    output::info(format!("  Amount      : {}", amount(transaction.amount)));
    output::info(format!(
        "  From / to   : {} -> {}",
        account_code(context, transaction.source_account),
        account_code(context, transaction.destination_account)
    ));
    if !transaction.description.is_empty() {
        output::info(format!("  Description : {}", transaction.description));
    }
    match &details.pay_detail {
        PayDetail::Check(check) => {
            output::info(format!(
                "  Check       : {} {} to {} on {}",
                check.check_number, check.bank, check.beneficiary, check.issue_date
            ));
        }
    }
    Ok(())
}
