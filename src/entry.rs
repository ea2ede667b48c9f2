use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{Result, TallyError};
use crate::models::{new_id, same_name, Expense, PaymentType, Revenue, Vendor};
use crate::reconciler::encode_unresolved_vendor;

pub const WAGES_CATEGORY: &str = "Wages";

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

/// Split one revenue entry into a reportable check record and a
/// non-reportable cash record, skipping whichever channel is zero.
pub fn split_revenue(source: &str, date: &str, check: f64, cash: f64) -> Result<Vec<Revenue>> {
    let mut missing = Vec::new();
    if source.trim().is_empty() {
        missing.push("source".to_string());
    }
    if date.trim().is_empty() {
        missing.push("date".to_string());
    }
    if check <= 0.0 && cash <= 0.0 {
        missing.push("amount".to_string());
    }
    if !missing.is_empty() {
        return Err(TallyError::Validation { row: 1, fields: missing });
    }

    let record = |check_amount: f64, cash_amount: f64, reportable: bool| Revenue {
        id: new_id(),
        date: date.trim().to_string(),
        source: source.trim().to_string(),
        check_amount,
        cash_amount,
        reportable: Some(reportable),
    };

    let mut out = Vec::new();
    if check > 0.0 {
        out.push(record(check, 0.0, true));
    }
    if cash > 0.0 {
        out.push(record(0.0, cash, false));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Expenses
// ---------------------------------------------------------------------------

/// One manually entered expense line, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseRow {
    pub date: String,
    pub vendor_name: String,
    pub category: String,
    pub amount: f64,
    pub payment_type: Option<PaymentType>,
    pub reportable: bool,
    pub description: String,
}

#[derive(Debug, Default)]
pub struct RowValidation {
    pub expenses: Vec<Expense>,
    /// One `TallyError::Validation` per rejected row.
    pub errors: Vec<TallyError>,
}

/// Build an expense from a single row, linking the vendor by name when it
/// is known. `row_number` is 1-based and only used for error reporting.
pub fn expense_from_row(row_number: usize, row: &ExpenseRow, vendors: &[Vendor]) -> Result<Expense> {
    let mut missing = Vec::new();
    if row.date.trim().is_empty() {
        missing.push("date".to_string());
    }
    if row.vendor_name.trim().is_empty() {
        missing.push("vendor".to_string());
    }
    if row.category.trim().is_empty() {
        missing.push("category".to_string());
    }
    if row.payment_type.is_none() {
        missing.push("payment type".to_string());
    }
    if !row.amount.is_finite() || row.amount <= 0.0 {
        missing.push("amount".to_string());
    }
    let Some(payment_type) = row.payment_type.filter(|_| missing.is_empty()) else {
        return Err(TallyError::Validation {
            row: row_number,
            fields: missing,
        });
    };

    let name = row.vendor_name.trim();
    let vendor_id = vendors
        .iter()
        .find(|v| same_name(&v.name, name))
        .map(|v| v.id.clone());
    let description = match vendor_id {
        Some(_) => row.description.clone(),
        None => encode_unresolved_vendor(name, row.description.trim()),
    };

    Ok(Expense {
        id: new_id(),
        date: row.date.trim().to_string(),
        vendor_id,
        category: row.category.trim().to_string(),
        amount: row.amount,
        payment_type,
        reportable: Some(row.reportable),
        description,
    })
}

/// Validate a multi-row entry. Rows without a positive amount are blank and
/// ignored. Invalid rows are reported by their 1-based position; valid rows
/// still come back as expenses.
pub fn validate_expense_rows(rows: &[ExpenseRow], vendors: &[Vendor]) -> RowValidation {
    let mut result = RowValidation::default();
    for (i, row) in rows.iter().enumerate() {
        if row.amount.is_nan() || row.amount <= 0.0 {
            continue;
        }
        match expense_from_row(i + 1, row, vendors) {
            Ok(expense) => result.expenses.push(expense),
            Err(e) => result.errors.push(e),
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Wages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPeriod {
    /// "MM/DD/YY-MM/DD/YY"
    pub label: String,
    /// ISO end date, used as the expense date.
    pub value: String,
}

impl PayPeriod {
    /// The two-week period that ends on `end`.
    pub fn ending(end: NaiveDate) -> Self {
        let start = end - Duration::days(13);
        Self {
            label: format!("{}-{}", start.format("%m/%d/%y"), end.format("%m/%d/%y")),
            value: end.format("%Y-%m-%d").to_string(),
        }
    }
}

/// The `count` most recent biweekly pay periods, newest first. The newest
/// ends on the most recent Sunday (today, if today is a Sunday).
pub fn pay_periods(today: NaiveDate, count: usize) -> Vec<PayPeriod> {
    let last_sunday = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
    (0..count)
        .map(|i| PayPeriod::ending(last_sunday - Duration::days(14 * i as i64)))
        .collect()
}

/// Up to three Wages expenses for one pay period: direct payroll and payroll
/// tax by bank transfer, and cash payroll kept off the reportable books.
pub fn wage_entries(
    period_end: &str,
    payroll: f64,
    tax: f64,
    cash: f64,
    payroll_vendor_id: Option<&str>,
    label: &str,
) -> Result<Vec<Expense>> {
    let mut missing = Vec::new();
    if period_end.trim().is_empty() {
        missing.push("pay period".to_string());
    }
    if payroll <= 0.0 && tax <= 0.0 && cash <= 0.0 {
        missing.push("amount".to_string());
    }
    if !missing.is_empty() {
        return Err(TallyError::Validation { row: 1, fields: missing });
    }

    let lines = [
        (payroll, PaymentType::BankTransfer, true, "Pay Period"),
        (tax, PaymentType::BankTransfer, true, "Payroll Tax"),
        (cash, PaymentType::Cash, false, "Cash Payroll"),
    ];
    Ok(lines
        .into_iter()
        .filter(|(amount, ..)| *amount > 0.0)
        .map(|(amount, payment_type, reportable, prefix)| Expense {
            id: new_id(),
            date: period_end.trim().to_string(),
            vendor_id: payroll_vendor_id.map(str::to_string),
            category: WAGES_CATEGORY.to_string(),
            amount,
            payment_type,
            reportable: Some(reportable),
            description: format!("{prefix}: {label}"),
        })
        .collect())
}
