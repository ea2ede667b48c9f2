use std::collections::HashMap;

use tracing::warn;

use crate::categorizer::KeywordTable;
use crate::models::{
    new_id, CandidateTransaction, Expense, Vendor, DEFAULT_CATEGORY, VENDOR_SEPARATOR,
};

pub const NO_VENDOR: &str = "N/A";
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

pub struct Reconciliation {
    pub new_vendors: Vec<Vendor>,
    pub expenses: Vec<Expense>,
}

/// Vendor and description as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorDisplay {
    pub vendor: String,
    pub description: String,
}

/// Encode a vendor name that could not be linked into the description.
pub fn encode_unresolved_vendor(vendor_name: &str, description: &str) -> String {
    if description.is_empty() {
        vendor_name.to_string()
    } else {
        format!("{vendor_name}{VENDOR_SEPARATOR}{description}")
    }
}

/// Resolve the display vendor for an expense: the linked vendor record when
/// it exists, else the name carried in the description prefix.
pub fn resolve_vendor_display(expense: &Expense, vendors: &[Vendor]) -> VendorDisplay {
    let linked = expense
        .vendor_id
        .as_ref()
        .and_then(|id| vendors.iter().find(|v| &v.id == id));
    if let Some(v) = linked {
        return VendorDisplay {
            vendor: v.name.clone(),
            description: expense.description.clone(),
        };
    }
    match expense.description.split_once(VENDOR_SEPARATOR) {
        Some((name, rest)) => VendorDisplay {
            vendor: name.to_string(),
            description: rest.split(VENDOR_SEPARATOR).next().unwrap_or("").to_string(),
        },
        None => VendorDisplay {
            vendor: if expense.vendor_id.is_some() { UNKNOWN_VENDOR } else { NO_VENDOR }.to_string(),
            description: expense.description.clone(),
        },
    }
}

/// Index vendors by lower-cased name. The first spelling of a name wins.
fn name_index(vendors: &[Vendor]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for v in vendors {
        index
            .entry(v.name.trim().to_lowercase())
            .or_insert_with(|| v.id.clone());
    }
    index
}

/// Turn the selected candidates into expense records.
///
/// Runs in two phases. First, one vendor is created for every distinct
/// unknown name (case-insensitive). Then each candidate is linked against
/// the known vendors plus the new ones. Callers must persist `new_vendors`
/// before `expenses` so no expense references a vendor the store has not seen.
pub fn reconcile(
    candidates: &[CandidateTransaction],
    known_vendors: &[Vendor],
    table: &KeywordTable,
) -> Reconciliation {
    let selected: Vec<&CandidateTransaction> = candidates.iter().filter(|c| c.selected).collect();

    let mut index = name_index(known_vendors);
    let mut new_vendors = Vec::new();
    for c in &selected {
        let name = c.vendor.trim();
        if name.is_empty() {
            continue;
        }
        let key = name.to_lowercase();
        if !index.contains_key(&key) {
            let vendor = Vendor::new(name, &table.categorize(name, DEFAULT_CATEGORY));
            index.insert(key, vendor.id.clone());
            new_vendors.push(vendor);
        }
    }

    let expenses = selected
        .iter()
        .map(|c| {
            let vendor_id = index.get(&c.vendor.trim().to_lowercase()).cloned();
            let description = match &vendor_id {
                Some(_) => c.description.clone(),
                None if c.vendor.trim().is_empty() => c.description.clone(),
                None => {
                    warn!("Vendor '{}' could not be linked; keeping name in description", c.vendor);
                    encode_unresolved_vendor(&c.vendor, &c.description)
                }
            };
            Expense {
                id: new_id(),
                date: c.date.clone(),
                vendor_id,
                category: if c.category.is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    c.category.clone()
                },
                amount: c.amount,
                payment_type: c.payment_type,
                reportable: Some(c.reportable),
                description,
            }
        })
        .collect();

    Reconciliation {
        new_vendors,
        expenses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentType;

    fn candidate(vendor: &str, selected: bool) -> CandidateTransaction {
        CandidateTransaction {
            date: "2025-02-01".to_string(),
            vendor: vendor.to_string(),
            amount: 10.0,
            category: "Supplies".to_string(),
            payment_type: PaymentType::Cc,
            description: "Bilt x7559".to_string(),
            reportable: true,
            selected,
            is_duplicate: false,
        }
    }

    fn vendor(id: &str, name: &str) -> Vendor {
        Vendor {
            id: id.to_string(),
            ..Vendor::new(name, "COGS")
        }
    }

    #[test]
    fn test_unknown_vendor_created_once_and_linked() {
        let candidates = vec![
            candidate("Daiso Arcadia", true),
            candidate("DAISO ARCADIA", true),
        ];
        let result = reconcile(&candidates, &[], &KeywordTable::default());
        assert_eq!(result.new_vendors.len(), 1);
        let created = &result.new_vendors[0];
        assert_eq!(created.name, "Daiso Arcadia");
        assert_eq!(created.category, "Supplies");
        assert!(created.email.is_empty());
        for e in &result.expenses {
            assert_eq!(e.vendor_id.as_deref(), Some(created.id.as_str()));
            assert_eq!(e.description, "Bilt x7559");
        }
    }

    #[test]
    fn test_known_vendor_matched_case_insensitively() {
        let known = vec![vendor("v1", "Wing Sing")];
        let result = reconcile(&[candidate("WING SING", true)], &known, &KeywordTable::default());
        assert!(result.new_vendors.is_empty());
        assert_eq!(result.expenses[0].vendor_id.as_deref(), Some("v1"));
    }

    #[test]
    fn test_deselected_candidates_are_skipped() {
        let result = reconcile(
            &[candidate("Panera", false), candidate("Geico", true)],
            &[],
            &KeywordTable::default(),
        );
        assert_eq!(result.new_vendors.len(), 1);
        assert_eq!(result.new_vendors[0].name, "Geico");
        assert_eq!(result.expenses.len(), 1);
    }

    #[test]
    fn test_blank_vendor_keeps_description() {
        let result = reconcile(&[candidate("  ", true)], &[], &KeywordTable::default());
        assert!(result.new_vendors.is_empty());
        assert_eq!(result.expenses[0].vendor_id, None);
        assert_eq!(result.expenses[0].description, "Bilt x7559");
    }

    #[test]
    fn test_expense_defaults() {
        let mut c = candidate("Acme", true);
        c.category = String::new();
        c.reportable = false;
        let result = reconcile(&[c], &[], &KeywordTable::default());
        let e = &result.expenses[0];
        assert_eq!(e.category, "General Expense");
        assert_eq!(e.reportable, Some(false));
        assert_eq!(e.payment_type, PaymentType::Cc);
    }

    #[test]
    fn test_encode_unresolved_vendor() {
        assert_eq!(encode_unresolved_vendor("Joe", "Lunch"), "Joe---Lunch");
        assert_eq!(encode_unresolved_vendor("Joe", ""), "Joe");
    }

    #[test]
    fn test_resolve_vendor_display() {
        let vendors = vec![vendor("v1", "SCE")];
        let mut e = Expense {
            id: "e".to_string(),
            date: "2025-01-01".to_string(),
            vendor_id: Some("v1".to_string()),
            category: "Utilities".to_string(),
            amount: 1.0,
            payment_type: PaymentType::Check,
            reportable: None,
            description: "Jan bill".to_string(),
        };
        assert_eq!(resolve_vendor_display(&e, &vendors).vendor, "SCE");

        e.vendor_id = Some("gone".to_string());
        assert_eq!(resolve_vendor_display(&e, &vendors).vendor, UNKNOWN_VENDOR);

        e.description = "Corner Store---Ice".to_string();
        let d = resolve_vendor_display(&e, &vendors);
        assert_eq!(d.vendor, "Corner Store");
        assert_eq!(d.description, "Ice");

        e.vendor_id = None;
        e.description = "Corner Store---Ice".to_string();
        let d = resolve_vendor_display(&e, &vendors);
        assert_eq!(d.vendor, "Corner Store");
        assert_eq!(d.description, "Ice");

        e.description = "Just a note".to_string();
        let d = resolve_vendor_display(&e, &vendors);
        assert_eq!(d.vendor, NO_VENDOR);
        assert_eq!(d.description, "Just a note");
    }
}
