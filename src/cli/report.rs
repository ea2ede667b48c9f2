use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, today, FilterArgs};
use crate::db;
use crate::error::{Result, TallyError};
use crate::filter::{filter_records, trailing_months, DateFilter, ReportTypeFilter};
use crate::fmt::{money, percent};
use crate::models::{LedgerRecord, Vendor};
use crate::reports::{self, aggregate, GroupKey};

fn heading(title: &str, business: &str, range: &str) -> String {
    if business.is_empty() {
        format!("{title}: {range}")
    } else {
        format!("{business} {title}: {range}")
    }
}

pub fn totals(filter: &FilterArgs) -> Result<()> {
    let (settings, conn) = open_db()?;
    let date_filter = filter.date_filter()?;
    let report_type = filter.report_type_or(ReportTypeFilter::ReportableOnly)?;
    let now = today();

    let revenues = filter_records(&db::list_revenues(&conn)?, &date_filter, report_type, now);
    let expenses = filter_records(&db::list_expenses(&conn)?, &date_filter, report_type, now);
    let t = reports::totals(&revenues, &expenses);

    let mut table = Table::new();
    table.set_header(vec!["", "Amount", "Records"]);
    table.add_row(vec![
        Cell::new("Revenue".green()),
        Cell::new(money(t.revenue)),
        Cell::new(revenues.len()),
    ]);
    table.add_row(vec![
        Cell::new("Expenses".red()),
        Cell::new(money(t.expenses)),
        Cell::new(expenses.len()),
    ]);
    let net_label = if t.net >= 0.0 {
        "Net".green().bold()
    } else {
        "Net".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), Cell::new(money(t.net)), Cell::new("")]);

    println!(
        "{}\n{table}",
        heading("Totals", &settings.business_name, &date_filter.describe(now))
    );
    Ok(())
}

fn print_groups<T: LedgerRecord>(records: &[T], key: GroupKey, vendors: &[Vendor], detail: bool) {
    let agg = aggregate(records, key, vendors);
    let grand_total = agg.total();

    let mut table = Table::new();
    if key == GroupKey::Amount || detail {
        table.set_header(vec!["Group", "Date", "Vendor", "Category", "Amount"]);
        for group in agg.iter() {
            for item in &group.items {
                table.add_row(vec![
                    Cell::new(if key == GroupKey::Amount { "" } else { group.key.as_str() }),
                    Cell::new(item.date()),
                    Cell::new(item.vendor_label(vendors)),
                    Cell::new(item.category()),
                    Cell::new(money(item.amount())),
                ]);
            }
            if key != GroupKey::Amount {
                table.add_row(vec![
                    Cell::new(format!("{} total", group.key).bold()),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(money(group.total).bold()),
                ]);
            }
        }
    } else {
        table.set_header(vec!["Group", "Amount", "%", "Count"]);
        for group in agg.iter() {
            table.add_row(vec![
                Cell::new(&group.key),
                Cell::new(money(group.total)),
                Cell::new(format!("{:.1}%", percent(group.total, grand_total))),
                Cell::new(group.count()),
            ]);
        }
    }
    println!("{table}");
    println!("{} {}", "Total:".bold(), money(grand_total));
}

pub fn groups(by: &str, kind: &str, detail: bool, filter: &FilterArgs) -> Result<()> {
    let key = GroupKey::parse(by)?;
    let (settings, conn) = open_db()?;
    let date_filter = filter.date_filter()?;
    let report_type = filter.report_type_or(ReportTypeFilter::ReportableOnly)?;
    let now = today();
    let vendors = db::list_vendors(&conn)?;
    let range = date_filter.describe(now);

    match kind.trim().to_lowercase().as_str() {
        "expenses" | "expense" => {
            let records = filter_records(&db::list_expenses(&conn)?, &date_filter, report_type, now);
            println!("{}", heading("Expenses", &settings.business_name, &range));
            print_groups(&records, key, &vendors, detail);
        }
        "revenue" | "revenues" => {
            let records = filter_records(&db::list_revenues(&conn)?, &date_filter, report_type, now);
            println!("{}", heading("Revenue", &settings.business_name, &range));
            print_groups(&records, key, &vendors, detail);
        }
        other => {
            return Err(TallyError::Other(format!(
                "Unknown report kind: {other} (expected expenses or revenue)"
            )));
        }
    }
    Ok(())
}

pub fn months() -> Result<()> {
    let now = today();
    let mut table = Table::new();
    table.set_header(vec!["Month", "--period", "Range"]);
    for m in trailing_months(now, 13) {
        let range = DateFilter::TrailingMonth {
            year: m.year,
            month: m.month,
        }
        .describe(now);
        table.add_row(vec![Cell::new(m.label), Cell::new(m.value), Cell::new(range)]);
    }
    println!("{table}");
    Ok(())
}
