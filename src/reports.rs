use std::collections::HashMap;

use crate::error::{Result, TallyError};
use crate::models::{Expense, LedgerRecord, Revenue, Vendor, UNCATEGORIZED};

const UNDATED: &str = "Undated";
const ALL_ITEMS: &str = "All";

fn to_cents(v: f64) -> i64 {
    if v.is_finite() {
        (v * 100.0).round() as i64
    } else {
        0
    }
}

fn from_cents(c: i64) -> f64 {
    c as f64 / 100.0
}

/// Sum record amounts in whole cents so totals don't drift.
pub fn sum_amounts<'a, T, I>(records: I) -> f64
where
    T: LedgerRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    from_cents(records.into_iter().map(|r| to_cents(r.amount())).sum())
}

// ---------------------------------------------------------------------------
// Dashboard totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub revenue: f64,
    pub expenses: f64,
    pub net: f64,
}

pub fn totals(revenues: &[Revenue], expenses: &[Expense]) -> Totals {
    let revenue = sum_amounts(revenues);
    let expense_total = sum_amounts(expenses);
    Totals {
        revenue,
        expenses: expense_total,
        net: from_cents(to_cents(revenue) - to_cents(expense_total)),
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Category,
    Month,
    Vendor,
    Amount,
}

impl GroupKey {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "month" | "date" => Ok(Self::Month),
            "vendor" => Ok(Self::Vendor),
            "amount" => Ok(Self::Amount),
            other => Err(TallyError::Other(format!("Unknown grouping: {other}"))),
        }
    }
}

#[derive(Debug)]
pub struct Group<'a, T> {
    pub key: String,
    pub items: Vec<&'a T>,
    pub total: f64,
}

impl<T> Group<'_, T> {
    pub fn count(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug)]
pub struct Aggregation<'a, T> {
    pub groups: HashMap<String, Group<'a, T>>,
    pub order: Vec<String>,
}

impl<'a, T> Aggregation<'a, T> {
    /// Groups in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Group<'a, T>> {
        self.order.iter().filter_map(|k| self.groups.get(k))
    }

    pub fn total(&self) -> f64 {
        from_cents(self.groups.values().map(|g| to_cents(g.total)).sum())
    }
}

fn group_label<T: LedgerRecord>(record: &T, key: GroupKey, vendors: &[Vendor]) -> String {
    match key {
        GroupKey::Category => {
            let category = record.category().trim();
            if category.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                category.to_string()
            }
        }
        GroupKey::Month => record
            .date()
            .get(..7)
            .map(str::to_string)
            .unwrap_or_else(|| UNDATED.to_string()),
        GroupKey::Vendor => record.vendor_label(vendors),
        GroupKey::Amount => ALL_ITEMS.to_string(),
    }
}

/// Bucket records by `key` and order the buckets for display.
///
/// Category and vendor groups are ordered by descending total (ties keep
/// first-seen order), month groups newest first, and amount is a single
/// flat group sorted by descending amount.
pub fn aggregate<'a, T: LedgerRecord>(
    records: &'a [T],
    key: GroupKey,
    vendors: &[Vendor],
) -> Aggregation<'a, T> {
    let mut buckets: HashMap<String, (Vec<&'a T>, i64)> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for record in records {
        let label = group_label(record, key, vendors);
        let bucket = buckets.entry(label.clone()).or_insert_with(|| {
            first_seen.push(label);
            (Vec::new(), 0)
        });
        bucket.0.push(record);
        bucket.1 += to_cents(record.amount());
    }

    let mut order = first_seen;
    match key {
        GroupKey::Category | GroupKey::Vendor => {
            order.sort_by_key(|k| std::cmp::Reverse(buckets[k].1));
        }
        GroupKey::Month => {
            order.sort_by(|a, b| match (a == UNDATED, b == UNDATED) {
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                _ => b.cmp(a),
            });
        }
        GroupKey::Amount => {
            if let Some((items, _)) = buckets.get_mut(ALL_ITEMS) {
                items.sort_by_key(|r| std::cmp::Reverse(to_cents(r.amount())));
            }
        }
    }

    let groups = buckets
        .into_iter()
        .map(|(k, (items, cents))| {
            (
                k.clone(),
                Group {
                    key: k,
                    items,
                    total: from_cents(cents),
                },
            )
        })
        .collect();

    Aggregation { groups, order }
}
