use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Deserialize;
use tracing::warn;

use crate::cli::{open_db, resolve_id, short_id, today, FilterArgs};
use crate::db;
use crate::entry::{expense_from_row, pay_periods, validate_expense_rows, wage_entries, ExpenseRow, PayPeriod};
use crate::error::{Result, TallyError};
use crate::filter::{filter_records, ReportTypeFilter};
use crate::fmt::money;
use crate::importer::{normalize_date, parse_amount};
use crate::models::{PaymentType, DEFAULT_CATEGORY};
use crate::reconciler::resolve_vendor_display;
use crate::reports::sum_amounts;

pub struct NewExpense {
    pub vendor: String,
    pub amount: f64,
    pub date: Option<String>,
    pub category: Option<String>,
    pub payment_type: String,
    pub description: String,
    pub non_reportable: bool,
}

fn entry_date(raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(today().format("%Y-%m-%d").to_string()),
        Some(d) => normalize_date(d).ok_or_else(|| TallyError::Other(format!("Invalid date: {d}"))),
    }
}

pub fn add(input: NewExpense) -> Result<()> {
    let (settings, conn) = open_db()?;
    let vendors = db::list_vendors(&conn)?;
    let known = db::find_vendor(&conn, &input.vendor)?;

    let vendor_name = known
        .as_ref()
        .map(|v| v.name.clone())
        .unwrap_or_else(|| input.vendor.trim().to_string());
    let category = input.category.unwrap_or_else(|| match &known {
        Some(v) if !v.category.is_empty() => v.category.clone(),
        _ => settings.keyword_table.categorize(&vendor_name, DEFAULT_CATEGORY),
    });

    let row = ExpenseRow {
        date: entry_date(input.date.as_deref())?,
        vendor_name,
        category,
        amount: input.amount,
        payment_type: PaymentType::parse(&input.payment_type),
        reportable: !input.non_reportable,
        description: input.description,
    };
    let expense = expense_from_row(1, &row, &vendors)?;
    if expense.vendor_id.is_none() {
        println!("{}", format!("Vendor '{}' is not on file; keeping the name on the expense.", row.vendor_name).yellow());
    }
    db::insert_expenses(&conn, std::slice::from_ref(&expense))?;
    println!(
        "Added {} {} to {} on {}",
        expense.category,
        money(expense.amount),
        row.vendor_name,
        expense.date
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct BatchLine {
    #[serde(default)]
    date: String,
    #[serde(default)]
    vendor: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    payment_type: String,
    #[serde(default)]
    reportable: String,
    #[serde(default)]
    description: String,
}

impl BatchLine {
    fn into_row(self, fallback_date: &str) -> ExpenseRow {
        let date = if self.date.trim().is_empty() {
            fallback_date.to_string()
        } else {
            normalize_date(&self.date).unwrap_or_default()
        };
        let reportable = !matches!(
            self.reportable.trim().to_lowercase().as_str(),
            "false" | "no" | "n" | "0"
        );
        ExpenseRow {
            date,
            vendor_name: self.vendor,
            category: self.category,
            amount: parse_amount(&self.amount).unwrap_or(0.0),
            payment_type: PaymentType::parse(&self.payment_type),
            reportable,
            description: self.description,
        }
    }
}

fn read_batch(text: &str, fallback_date: &str) -> Result<Vec<ExpenseRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for line in rdr.deserialize::<BatchLine>() {
        rows.push(line?.into_row(fallback_date));
    }
    Ok(rows)
}

pub fn batch(file: &str) -> Result<()> {
    let text = std::fs::read_to_string(file)?;
    let (_, conn) = open_db()?;
    let vendors = db::list_vendors(&conn)?;

    let rows = read_batch(&text, &today().format("%Y-%m-%d").to_string())?;
    let result = validate_expense_rows(&rows, &vendors);

    for err in &result.errors {
        eprintln!("{}", err.to_string().yellow());
    }
    if result.expenses.is_empty() {
        if result.errors.is_empty() {
            println!("No expense rows to save.");
            return Ok(());
        }
        return Err(TallyError::Other(format!(
            "{} invalid rows; nothing saved",
            result.errors.len()
        )));
    }

    db::insert_expenses(&conn, &result.expenses)?;
    println!(
        "Saved {} expenses totalling {}",
        result.expenses.len(),
        money(sum_amounts(&result.expenses))
    );
    if !result.errors.is_empty() {
        println!("{} rows need attention and were not saved.", result.errors.len());
    }
    Ok(())
}

pub fn wages(period: Option<String>, payroll: f64, tax: f64, cash: f64) -> Result<()> {
    let (settings, conn) = open_db()?;
    let period = match period.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => {
            let end = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| TallyError::Other(format!("Invalid pay period end: {raw}")))?;
            PayPeriod::ending(end)
        }
        None => pay_periods(today(), 1)
            .into_iter()
            .next()
            .ok_or_else(|| TallyError::Other("No pay period available".to_string()))?,
    };

    let vendor = db::find_vendor(&conn, &settings.payroll_vendor)?;
    if vendor.is_none() {
        warn!(vendor = %settings.payroll_vendor, "payroll vendor not on file; wages saved unlinked");
    }
    let entries = wage_entries(
        &period.value,
        payroll,
        tax,
        cash,
        vendor.as_ref().map(|v| v.id.as_str()),
        &period.label,
    )?;
    db::insert_expenses(&conn, &entries)?;
    println!(
        "Recorded {} wage entries for {} ({})",
        entries.len(),
        period.label,
        money(sum_amounts(&entries))
    );
    Ok(())
}

pub fn periods() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Pay Period", "End Date"]);
    for p in pay_periods(today(), 13) {
        table.add_row(vec![Cell::new(p.label), Cell::new(p.value)]);
    }
    println!("Pay Periods\n{table}");
    Ok(())
}

pub fn list(filter: &FilterArgs) -> Result<()> {
    let (_, conn) = open_db()?;
    let vendors = db::list_vendors(&conn)?;
    let date_filter = filter.date_filter()?;
    let report_type = filter.report_type_or(ReportTypeFilter::All)?;
    let expenses = filter_records(&db::list_expenses(&conn)?, &date_filter, report_type, today());

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Vendor", "Category", "Amount", "Payment", "Reportable", "Description"]);
    for e in &expenses {
        let display = resolve_vendor_display(e, &vendors);
        table.add_row(vec![
            Cell::new(short_id(&e.id)),
            Cell::new(&e.date),
            Cell::new(display.vendor),
            Cell::new(&e.category),
            Cell::new(money(e.amount)),
            Cell::new(e.payment_type),
            Cell::new(if e.is_reportable() { "yes" } else { "no" }),
            Cell::new(display.description),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(money(sum_amounts(&expenses)).bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
    ]);
    println!("Expenses: {}\n{table}", date_filter.describe(today()));
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    let expenses = db::list_expenses(&conn)?;
    let full = resolve_id(expenses.iter().map(|e| e.id.as_str()), id)?;
    db::delete_expense(&conn, &full)?;
    println!("Deleted expense {}", short_id(&full));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_batch_maps_columns() {
        let csv = "date,vendor,category,amount,payment_type,reportable,description\n\
                   3/1/25,Wing Sing,COGS,\"$1,020.00\",check,,weekly\n\
                   ,Farmer Joe,COGS,12,cash,no,\n";
        let rows = read_batch(csv, "2025-03-15").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2025-03-01");
        assert_eq!(rows[0].amount, 1020.0);
        assert_eq!(rows[0].payment_type, Some(PaymentType::Check));
        assert!(rows[0].reportable);
        assert_eq!(rows[1].date, "2025-03-15");
        assert!(!rows[1].reportable);
    }

    #[test]
    fn test_read_batch_missing_columns_become_blank() {
        let csv = "vendor,amount\nAcme,5\n";
        let rows = read_batch(csv, "2025-03-15").unwrap();
        assert_eq!(rows[0].category, "");
        assert_eq!(rows[0].payment_type, None);
    }

    #[test]
    fn test_entry_date() {
        assert_eq!(entry_date(Some("1/2/2025")).unwrap(), "2025-01-02");
        assert!(entry_date(Some("someday")).is_err());
        assert_eq!(entry_date(None).unwrap().len(), 10);
    }
}
