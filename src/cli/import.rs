use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use tracing::warn;

use crate::cli::open_db;
use crate::db;
use crate::duplicates::flag_duplicates;
use crate::error::{Result, TallyError};
use crate::fmt::money;
use crate::importer::parse_statement;
use crate::models::CandidateTransaction;
use crate::reconciler::reconcile;

/// Apply the user's 1-based include/exclude picks. Excludes win over includes.
fn apply_selection(
    candidates: &mut [CandidateTransaction],
    include: &[usize],
    exclude: &[usize],
) -> Result<()> {
    let len = candidates.len();
    for &n in include.iter().chain(exclude) {
        if n == 0 || n > len {
            return Err(TallyError::Other(format!(
                "No candidate #{n} (statement has {len})"
            )));
        }
    }
    for &n in include {
        candidates[n - 1].selected = true;
    }
    for &n in exclude {
        candidates[n - 1].selected = false;
    }
    Ok(())
}

pub fn run(file: &str, save: bool, include: &[usize], exclude: &[usize]) -> Result<()> {
    let path = PathBuf::from(file);
    let text = std::fs::read_to_string(&path)?;
    let (settings, conn) = open_db()?;

    let statement = parse_statement(&text, &settings.statement_rules, &settings.keyword_table)?;
    if statement.candidates.is_empty() {
        println!("No valid expense transactions were found in the file.");
        return Ok(());
    }
    let existing = db::list_expenses(&conn)?;
    let mut candidates = flag_duplicates(statement.candidates, &existing);
    apply_selection(&mut candidates, include, exclude)?;

    let account = &statement.account;
    println!(
        "{} {} {}",
        account.bank.bold(),
        account.name,
        if account.number.is_empty() {
            String::new()
        } else {
            format!("x{}", account.number)
        }
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "", "Date", "Vendor", "Category", "Payment", "Amount", "Note"]);
    for (i, c) in candidates.iter().enumerate() {
        let mark = if c.selected { "x" } else { " " };
        let note = if c.is_duplicate { "duplicate" } else { "" };
        let mut amount = Cell::new(money(c.amount));
        if c.is_duplicate {
            amount = amount.fg(Color::Yellow);
        }
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(mark),
            Cell::new(&c.date),
            Cell::new(&c.vendor),
            Cell::new(&c.category),
            Cell::new(c.payment_type),
            amount,
            Cell::new(note),
        ]);
    }
    println!("{table}");

    let selected: Vec<&CandidateTransaction> = candidates.iter().filter(|c| c.selected).collect();
    let duplicates = candidates.iter().filter(|c| c.is_duplicate).count();
    let selected_total: f64 = selected.iter().map(|c| c.amount).sum();
    println!(
        "{} candidates, {} selected ({}), {} duplicates",
        candidates.len(),
        selected.len(),
        money(selected_total),
        duplicates
    );

    if !save {
        println!("Run again with --save to record the selected expenses.");
        return Ok(());
    }
    if selected.is_empty() {
        println!("Nothing selected; no expenses saved.");
        return Ok(());
    }

    let vendors = db::list_vendors(&conn)?;
    let result = reconcile(&candidates, &vendors, &settings.keyword_table);
    db::insert_vendors(&conn, &result.new_vendors)?;
    if let Err(e) = db::insert_expenses(&conn, &result.expenses) {
        if !result.new_vendors.is_empty() {
            warn!(
                "{} new vendors were saved but the expenses were not",
                result.new_vendors.len()
            );
        }
        return Err(e);
    }

    for v in &result.new_vendors {
        println!("New vendor: {} ({})", v.name, v.category);
    }
    println!(
        "{}",
        format!("Saved {} expenses.", result.expenses.len()).green()
    );
    Ok(())
}
