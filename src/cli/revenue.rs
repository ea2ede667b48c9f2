use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, resolve_id, short_id, today, FilterArgs};
use crate::db;
use crate::entry::split_revenue;
use crate::error::{Result, TallyError};
use crate::filter::{filter_records, ReportTypeFilter};
use crate::fmt::money;
use crate::importer::normalize_date;
use crate::reports::sum_amounts;

pub fn add(source: &str, date: Option<String>, check: f64, cash: f64) -> Result<()> {
    let (settings, conn) = open_db()?;
    let source = settings.resolve_source(source)?;
    let date = match date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => today().format("%Y-%m-%d").to_string(),
        Some(d) => normalize_date(d).ok_or_else(|| TallyError::Other(format!("Invalid date: {d}")))?,
    };

    let records = split_revenue(&source, &date, check, cash)?;
    db::insert_revenues(&conn, &records)?;
    for r in &records {
        let channel = if r.check_amount > 0.0 { "check" } else { "cash" };
        println!("Recorded {} {channel} revenue for {source} on {date}", money(r.total()));
    }
    Ok(())
}

pub fn list(filter: &FilterArgs) -> Result<()> {
    let (_, conn) = open_db()?;
    let date_filter = filter.date_filter()?;
    let report_type = filter.report_type_or(ReportTypeFilter::All)?;
    let revenues = filter_records(&db::list_revenues(&conn)?, &date_filter, report_type, today());

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Source", "Check", "Cash", "Reportable"]);
    for r in &revenues {
        table.add_row(vec![
            Cell::new(short_id(&r.id)),
            Cell::new(&r.date),
            Cell::new(&r.source),
            Cell::new(money(r.check_amount)),
            Cell::new(money(r.cash_amount)),
            Cell::new(if r.is_reportable() { "yes" } else { "no" }),
        ]);
    }
    println!("Revenue: {}\n{table}", date_filter.describe(today()));
    println!("{} {}", "Total:".bold(), money(sum_amounts(&revenues)));
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    let revenues = db::list_revenues(&conn)?;
    let full = resolve_id(revenues.iter().map(|r| r.id.as_str()), id)?;
    db::delete_revenue(&conn, &full)?;
    println!("Deleted revenue {}", short_id(&full));
    Ok(())
}
