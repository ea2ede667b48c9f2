use serde::{Deserialize, Deserializer, Serialize};

/// Separator between a human-entered vendor name and the rest of an expense
/// description when the vendor could not be linked to a record.
pub const VENDOR_SEPARATOR: &str = "---";

pub const DEFAULT_CATEGORY: &str = "General Expense";
pub const UNCATEGORIZED: &str = "Uncategorized";

pub const CATEGORIES: &[&str] = &[
    "Wages",
    "COGS",
    "Rent",
    "Utilities",
    "General Expense",
    "Insurance",
    "Maintenance & Repair",
    "Fees & Licenses",
    "Professional Services",
    "Supplies",
    "Auto & Travel",
];

/// Case-insensitive vendor name comparison, shared by every lookup path.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentType {
    Check,
    Cash,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[default]
    #[serde(rename = "CC")]
    Cc,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "Check",
            Self::Cash => "Cash",
            Self::BankTransfer => "Bank Transfer",
            Self::Cc => "CC",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "check" => Some(Self::Check),
            "cash" => Some(Self::Cash),
            "bank transfer" | "banktransfer" | "transfer" => Some(Self::BankTransfer),
            "cc" | "credit card" => Some(Self::Cc),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub account_number: String,
}

impl Vendor {
    /// A vendor with a freshly generated id and empty contact fields.
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            category: category.to_string(),
            contact_person: String::new(),
            email: String::new(),
            phone_number: String::new(),
            account_number: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub payment_type: PaymentType,
    /// Unset means reportable.
    #[serde(default)]
    pub reportable: Option<bool>,
    #[serde(default)]
    pub description: String,
}

impl Expense {
    pub fn is_reportable(&self) -> bool {
        self.reportable != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revenue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub check_amount: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cash_amount: f64,
    #[serde(default)]
    pub reportable: Option<bool>,
}

impl Revenue {
    pub fn total(&self) -> f64 {
        self.check_amount + self.cash_amount
    }

    pub fn is_reportable(&self) -> bool {
        self.reportable != Some(false)
    }
}

/// Common view over revenue and expense records for filtering and aggregation.
pub trait LedgerRecord {
    fn date(&self) -> &str;
    /// `None` means the flag was never set, which counts as reportable.
    fn reportable(&self) -> Option<bool>;
    fn amount(&self) -> f64;
    fn category(&self) -> &str;
    fn vendor_label(&self, vendors: &[Vendor]) -> String;
}

impl LedgerRecord for Expense {
    fn date(&self) -> &str {
        &self.date
    }

    fn reportable(&self) -> Option<bool> {
        self.reportable
    }

    fn amount(&self) -> f64 {
        finite_or_zero(self.amount)
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn vendor_label(&self, vendors: &[Vendor]) -> String {
        crate::reconciler::resolve_vendor_display(self, vendors).vendor
    }
}

impl LedgerRecord for Revenue {
    fn date(&self) -> &str {
        &self.date
    }

    fn reportable(&self) -> Option<bool> {
        self.reportable
    }

    fn amount(&self) -> f64 {
        finite_or_zero(self.check_amount) + finite_or_zero(self.cash_amount)
    }

    /// Revenue has no category; the source location stands in for it.
    fn category(&self) -> &str {
        &self.source
    }

    fn vendor_label(&self, _vendors: &[Vendor]) -> String {
        self.source.clone()
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// A parsed-but-not-yet-persisted expense proposal from a statement upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTransaction {
    pub date: String,
    pub vendor: String,
    pub amount: f64,
    pub category: String,
    pub payment_type: PaymentType,
    pub description: String,
    pub reportable: bool,
    pub selected: bool,
    pub is_duplicate: bool,
}

/// Display metadata about the statement's source account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountInfo {
    pub bank: String,
    pub name: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub account: AccountInfo,
    pub candidates: Vec<CandidateTransaction>,
}

/// Accepts numbers, numeric strings, or null; anything else is 0.
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_type_parse() {
        assert_eq!(PaymentType::parse("Bank Transfer"), Some(PaymentType::BankTransfer));
        assert_eq!(PaymentType::parse("bank-transfer"), Some(PaymentType::BankTransfer));
        assert_eq!(PaymentType::parse("cc"), Some(PaymentType::Cc));
        assert_eq!(PaymentType::parse("Check"), Some(PaymentType::Check));
        assert_eq!(PaymentType::parse("venmo"), None);
    }

    #[test]
    fn test_payment_type_serializes_display_names() {
        let json = serde_json::to_string(&PaymentType::BankTransfer).unwrap();
        assert_eq!(json, "\"Bank Transfer\"");
        let json = serde_json::to_string(&PaymentType::Cc).unwrap();
        assert_eq!(json, "\"CC\"");
    }

    #[test]
    fn test_expense_lenient_amounts_and_defaults() {
        let json = r#"{"date": "2025-01-02", "amount": "12.50", "description": "x"}"#;
        let e: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(e.amount, 12.5);
        assert_eq!(e.payment_type, PaymentType::Cc);
        assert!(e.is_reportable());

        let json = r#"{"date": "2025-01-02", "amount": "abc", "reportable": false}"#;
        let e: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(e.amount, 0.0);
        assert!(!e.is_reportable());
    }

    #[test]
    fn test_revenue_total() {
        let json = r#"{"date": "2025-01-02", "source": "A", "checkAmount": 10, "cashAmount": null}"#;
        let r: Revenue = serde_json::from_str(json).unwrap();
        assert_eq!(r.total(), 10.0);
    }
}
