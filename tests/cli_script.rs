use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::tempdir;

const CHART: &str = "group Assets
total 01 \"Current assets\"
fixed 0101 Cash
detailed 010101 \"Petty cash\"
detailed 010101 Bank
";

fn cli(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("backoffice_cli").expect("binary");
    cmd.env("BACKOFFICE_CLI_SCRIPT", "1")
        .env("BACKOFFICE_HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_builds_chart_and_reports_balance() {
    let home = tempdir().expect("tempdir");
    let input = format!(
        "{CHART}journal 00000001 00000002 1000 \"Opening float\" --date 2024-01-05
journal 00000002 00000001 400 --date 2024-01-06
balance 00000001
exit
"
    );

    cli(home.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Created account group 01 Assets."))
        .stdout(contains("Created total account 0101 Current assets."))
        .stdout(contains("Created detailed account 00000002 Bank under 010101."))
        .stdout(contains("Recorded entry AS0001 on 2024-01-05"))
        .stdout(contains("Recorded entry AS0002 on 2024-01-06"))
        .stdout(contains("Balance for 00000001 Petty cash"))
        .stdout(contains("600.00"))
        .stdout(contains("1400.00"));

    assert!(home.path().join("data").join("dailybooks.json").exists());
}

#[test]
fn data_survives_between_runs() {
    let home = tempdir().expect("tempdir");

    cli(home.path())
        .write_stdin("group Assets\n")
        .assert()
        .success();

    cli(home.path())
        .write_stdin("chart\ngroup Liabilities\n")
        .assert()
        .success()
        .stdout(contains("01 Assets"))
        .stdout(contains("Created account group 02 Liabilities."));
}

#[test]
fn unknown_commands_get_a_suggestion() {
    let home = tempdir().expect("tempdir");

    cli(home.path())
        .write_stdin("grup Assets\nhelp\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `grup`"))
        .stdout(contains("Suggestion: `group`?"))
        .stdout(contains("Available commands"));
}

#[test]
fn failed_commands_do_not_stop_the_script() {
    let home = tempdir().expect("tempdir");
    let input = "group Assets
total 01 Current
delete group 01
balance 99999999
delete total 0101
delete group 01
";

    cli(home.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Integrity violation"))
        .stdout(contains("DetailedAccount not found: 99999999"))
        .stdout(contains("Deleted total account 0101."))
        .stdout(contains("Deleted account group 01."));
}

#[test]
fn payments_post_a_linked_journal_entry() {
    let home = tempdir().expect("tempdir");
    let input = format!(
        "{CHART}pay 00000001 00000002 75.5 Rent --check 1001 --bank BNK --date 2024-02-01
transactions
balance 00000002
entry AS0001
unjournal AS0001
"
    );

    cli(home.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("as entry AS0001 (check 1001)"))
        .stdout(contains("75.50"))
        .stdout(contains("Entry AS0001 (2024-02-01)"))
        .stdout(contains("Integrity violation"))
        .stdout(contains("Deleted entry").not());
}

#[test]
fn config_changes_are_persisted_and_applied() {
    let home = tempdir().expect("tempdir");
    let input = format!(
        "{CHART}config set daily_book_prefix JV
journal 00000001 00000002 10 --date 2024-03-01
config
"
    );

    cli(home.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Set `daily_book_prefix` to `JV`."))
        .stdout(contains("Recorded entry JV0001"))
        .stdout(contains("Entry prefix     : JV"));

    let saved = std::fs::read_to_string(home.path().join("config.json")).expect("config file");
    assert!(saved.contains("\"daily_book_prefix\": \"JV\""));
}

#[test]
fn providers_and_fiscal_years_round_out_the_shell() {
    let home = tempdir().expect("tempdir");
    let input = "provider \"Acme Supplies\" 20-1234 --email billing@acme.test
provider Duplicate 20-1234
providers acme
year FY2024 2024-01-01 2024-12-31
year-close FY2024
years
";

    cli(home.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Registered provider PRV0001 Acme Supplies (20-1234)."))
        .stdout(contains("Conflict: a provider with tax id `20-1234` already exists"))
        .stdout(contains("billing@acme.test"))
        .stdout(contains("Closed fiscal year FY2024."))
        .stdout(contains("closed"));
}
