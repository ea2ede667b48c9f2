use std::sync::OnceLock;

use csv::StringRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categorizer::KeywordTable;
use crate::error::{Result, TallyError};
use crate::models::{
    AccountInfo, CandidateTransaction, ParsedStatement, PaymentType, DEFAULT_CATEGORY,
};

// ---------------------------------------------------------------------------
// Statement rules (business-specific heuristics, loaded from settings)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementRules {
    /// Card rows whose vendor contains one of these are payments, not expenses.
    pub card_payment_keywords: Vec<String>,
    /// Ledger rows whose description contains one of these start deselected.
    pub deselect_keywords: Vec<String>,
    /// Ledger checks within `check_amount_tolerance` of one of these start deselected.
    pub deselect_check_amounts: Vec<f64>,
    pub check_amount_tolerance: f64,
    /// Ledger description substring → category, checked before anything else.
    pub vendor_overrides: Vec<(String, String)>,
    /// Category for ledger checks that no override claims.
    pub check_category: String,
    /// Last four digits printed on the rewards card; the export omits them.
    pub rewards_card_number: String,
}

impl Default for StatementRules {
    fn default() -> Self {
        let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            card_payment_keywords: strings(&["cc pymt", "online ach payment", "bps*bilt rewards"]),
            deselect_keywords: strings(&[
                "credit card payment",
                "payroll service akbb",
                "trnsfr",
                "wells fargo credit card",
            ]),
            deselect_check_amounts: vec![1116.58, 1132.54],
            check_amount_tolerance: 0.25,
            vendor_overrides: [
                ("tesla mot", "Auto & Travel"),
                ("s j distributor", "COGS"),
                ("tom quan", "Rent"),
                ("california department of motor", "Auto & Travel"),
                ("sysco", "COGS"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            check_category: "COGS".to_string(),
            rewards_card_number: "7559".to_string(),
        }
    }
}

impl StatementRules {
    fn is_card_payment(&self, vendor: &str) -> bool {
        contains_any(vendor, &self.card_payment_keywords)
    }

    fn should_deselect(&self, description: &str, amount: f64, is_check: bool) -> bool {
        if contains_any(description, &self.deselect_keywords) {
            return true;
        }
        is_check
            && self
                .deselect_check_amounts
                .iter()
                .any(|a| (amount - a).abs() <= self.check_amount_tolerance)
    }

    fn override_category(&self, description: &str) -> Option<&str> {
        let lower = description.to_lowercase();
        self.vendor_overrides
            .iter()
            .find(|(needle, _)| lower.contains(&needle.to_lowercase()))
            .map(|(_, category)| category.as_str())
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| -v);
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn mdy_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("valid date pattern")
    })
}

/// M/D/YY or M/D/YYYY to ISO. Two-digit years are 20YY.
pub fn parse_date_mdy(raw: &str) -> Option<String> {
    let caps = mdy_pattern().captures(raw.trim())?;
    let m: u32 = caps[1].parse().ok()?;
    let d: u32 = caps[2].parse().ok()?;
    let year_str = &caps[3];
    let y: i32 = if year_str.len() == 2 {
        2000 + year_str.parse::<i32>().ok()?
    } else {
        year_str.parse().ok()?
    };
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Accept an ISO date as-is, or convert M/D/Y.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    parse_date_mdy(raw)
}

fn last_four(raw: &str) -> String {
    let chars: Vec<char> = raw.trim().chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

fn issuer_fallback(raw: Option<&str>) -> &str {
    match raw.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => DEFAULT_CATEGORY,
    }
}

fn read_records(text: &str) -> Vec<StringRecord> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.trim().as_bytes());
    rdr.records().filter_map(|r| r.ok()).collect()
}

fn first_line(text: &str) -> &str {
    text.trim_start().lines().next().unwrap_or("")
}

/// Column positions resolved from a header row.
struct Columns {
    date: usize,
    description: usize,
    debit: usize,
    check: Option<usize>,
    category: Option<usize>,
    account: Option<usize>,
}

fn find_column(header: &StringRecord, names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|f| names.iter().any(|n| f.trim().eq_ignore_ascii_case(n)))
}

// ---------------------------------------------------------------------------
// Statement formats: ordered signature table instead of ad hoc sniffing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementFormat {
    RewardsCard,
    SignedAmountCard,
    BankLedger,
    BankLedgerWithPreamble,
    DebitCreditCard,
}

impl StatementFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::RewardsCard => "rewards_card",
            Self::SignedAmountCard => "signed_amount_card",
            Self::BankLedger => "bank_ledger",
            Self::BankLedgerWithPreamble => "bank_ledger_preamble",
            Self::DebitCreditCard => "debit_credit_card",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RewardsCard => "Bilt Mastercard",
            Self::SignedAmountCard => "Card export (signed amounts)",
            Self::BankLedger => "NuVision bank ledger",
            Self::BankLedgerWithPreamble => "NuVision bank ledger (with account header)",
            Self::DebitCreditCard => "Capital One card",
        }
    }

    pub fn parse(
        &self,
        text: &str,
        rules: &StatementRules,
        table: &KeywordTable,
    ) -> Result<ParsedStatement> {
        let statement = match self {
            Self::RewardsCard => parse_rewards_card(text, rules, table),
            Self::SignedAmountCard => parse_signed_amount_card(text, rules, table),
            Self::BankLedger => parse_bank_ledger(text, rules, table),
            Self::BankLedgerWithPreamble => parse_bank_ledger_with_preamble(text, rules, table),
            Self::DebitCreditCard => parse_debit_credit_card(text, table),
        }?;
        debug!(
            "Parsed {} candidates as {}",
            statement.candidates.len(),
            self.key()
        );
        Ok(statement)
    }
}

struct Signature {
    matches: fn(&str) -> bool,
    format: StatementFormat,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        matches: |t| {
            t.contains(r#""Transaction Date","Amount","Reward Multiplier""#)
                || t.contains("BPS*BILT REWARDS")
        },
        format: StatementFormat::RewardsCard,
    },
    Signature {
        matches: |t| t.contains("Account Number,Post Date,Check,Description,Debit,Credit"),
        format: StatementFormat::BankLedger,
    },
    Signature {
        matches: |t| {
            t.contains("Transaction Date,Posted Date,Card No.")
                || t.contains(
                    r#""Transaction Date","Posted Date","Card No.","Description","Category","Debit","Credit""#,
                )
        },
        format: StatementFormat::DebitCreditCard,
    },
    Signature {
        matches: |t| t.contains("Account,Date,Description,Category,Type,Amount"),
        format: StatementFormat::SignedAmountCard,
    },
    Signature {
        matches: |t| first_line(t).starts_with("Account Number:,First Name:,Last Name:"),
        format: StatementFormat::BankLedgerWithPreamble,
    },
    Signature {
        matches: |t| {
            first_line(t)
                .split(',')
                .next()
                .is_some_and(|f| f.trim_matches('"').contains("Account"))
        },
        format: StatementFormat::BankLedger,
    },
];

pub fn detect_format(text: &str) -> Option<StatementFormat> {
    SIGNATURES
        .iter()
        .find(|s| (s.matches)(text))
        .map(|s| s.format)
}

/// Detect the statement layout and parse it. Unrecognized text is a format error.
pub fn parse_statement(
    text: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Result<ParsedStatement> {
    let format = detect_format(text).ok_or_else(TallyError::unsupported_format)?;
    debug!("Detected statement format {} ({})", format.key(), format.name());
    format.parse(text, rules, table)
}

// ---------------------------------------------------------------------------
// Rewards card: quoted CSV, signed amounts, negative = debit
// ---------------------------------------------------------------------------

fn parse_rewards_card(
    text: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Result<ParsedStatement> {
    let number = rules.rewards_card_number.clone();
    let tag = format!("Bilt x{number}");
    let mut candidates = Vec::new();

    for (i, record) in read_records(text).iter().enumerate() {
        if i == 0
            && record
                .iter()
                .any(|f| f.to_lowercase().contains("transaction date"))
        {
            continue;
        }
        if record.len() < 5 {
            continue;
        }
        let Some(amount) = parse_amount(&record[1]) else {
            continue;
        };
        let vendor = record[4].to_string();
        if amount >= 0.0 || rules.is_card_payment(&vendor) {
            continue;
        }
        let Some(date) = parse_date_mdy(&record[0]) else {
            continue;
        };
        candidates.push(CandidateTransaction {
            date,
            category: table.categorize(&vendor, DEFAULT_CATEGORY),
            vendor,
            amount: amount.abs(),
            payment_type: PaymentType::Cc,
            description: tag.clone(),
            reportable: true,
            selected: true,
            is_duplicate: false,
        });
    }

    Ok(ParsedStatement {
        account: AccountInfo {
            bank: "Bilt".to_string(),
            name: "Mastercard".to_string(),
            number,
        },
        candidates,
    })
}

// ---------------------------------------------------------------------------
// Signed-amount card export: Account,Date,Description,Category,Type,Amount
// ---------------------------------------------------------------------------

fn parse_signed_amount_card(
    text: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Result<ParsedStatement> {
    let records = read_records(text);
    let header_idx = records
        .iter()
        .position(|r| find_column(r, &["Amount"]).is_some() && find_column(r, &["Type"]).is_some())
        .ok_or_else(|| TallyError::Format("Invalid card CSV format: missing header".into()))?;
    let header = &records[header_idx];
    let col = |names: &[&str]| {
        find_column(header, names).ok_or_else(|| {
            TallyError::Format(format!("Invalid card CSV format: missing {} column", names[0]))
        })
    };
    let (idx_account, idx_date, idx_desc, idx_type, idx_amount) = (
        col(&["Account"])?,
        col(&["Date"])?,
        col(&["Description"])?,
        col(&["Type"])?,
        col(&["Amount"])?,
    );
    let idx_category = find_column(header, &["Category"]);
    let min_cols = [idx_account, idx_date, idx_desc, idx_type, idx_amount]
        .into_iter()
        .max()
        .unwrap_or(0)
        + 1;

    let rows = &records[header_idx + 1..];
    let number = rows
        .first()
        .and_then(|r| r.get(idx_account))
        .map(last_four)
        .unwrap_or_default();
    let tag = format!("Card x{number}");
    let mut candidates = Vec::new();

    for record in rows {
        if record.len() < min_cols {
            continue;
        }
        let Some(amount) = parse_amount(&record[idx_amount]) else {
            continue;
        };
        let vendor = record[idx_desc].to_string();
        if amount >= 0.0
            || record[idx_type].to_lowercase().contains("payment")
            || rules.is_card_payment(&vendor)
        {
            continue;
        }
        let Some(date) = normalize_date(&record[idx_date]) else {
            continue;
        };
        let fallback = issuer_fallback(idx_category.and_then(|i| record.get(i)));
        candidates.push(CandidateTransaction {
            date,
            category: table.categorize(&vendor, fallback),
            vendor,
            amount: amount.abs(),
            payment_type: PaymentType::Cc,
            description: tag.clone(),
            reportable: true,
            selected: true,
            is_duplicate: false,
        });
    }

    Ok(ParsedStatement {
        account: AccountInfo {
            bank: "Card".to_string(),
            name: "Credit Card".to_string(),
            number,
        },
        candidates,
    })
}

// ---------------------------------------------------------------------------
// Bank ledger: Account Number,Post Date,Check,Description,Debit,Credit
// ---------------------------------------------------------------------------

fn ledger_columns(header: &StringRecord) -> Result<Columns> {
    let missing = |name: &str| TallyError::Format(format!("Invalid bank ledger CSV format: missing {name} column"));
    Ok(Columns {
        date: find_column(header, &["Post Date", "Posted Date", "Date"]).ok_or_else(|| missing("Post Date"))?,
        description: find_column(header, &["Description"]).ok_or_else(|| missing("Description"))?,
        debit: find_column(header, &["Debit"]).ok_or_else(|| missing("Debit"))?,
        check: find_column(header, &["Check", "Check Number", "Check #"]),
        category: find_column(header, &["Category"]),
        account: find_column(header, &["Account Number", "Account"]),
    })
}

fn ledger_candidates(
    rows: &[StringRecord],
    cols: &Columns,
    number: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Vec<CandidateTransaction> {
    let tag = format!("NuVision x{number}");
    let min_cols = [cols.date, cols.description, cols.debit]
        .into_iter()
        .max()
        .unwrap_or(0)
        + 1;
    let mut candidates = Vec::new();

    for record in rows {
        if record.len() < min_cols {
            continue;
        }
        let Some(debit) = parse_amount(&record[cols.debit]) else {
            continue;
        };
        if debit <= 0.0 {
            continue;
        }
        let Some(date) = parse_date_mdy(&record[cols.date]) else {
            continue;
        };
        let description = record[cols.description].replace("&amp;", "&");
        let is_check = cols
            .check
            .and_then(|i| record.get(i))
            .is_some_and(|c| !c.trim().is_empty());

        let category = match rules.override_category(&description) {
            Some(category) => category.to_string(),
            None if is_check => rules.check_category.clone(),
            None => {
                let fallback = issuer_fallback(cols.category.and_then(|i| record.get(i)));
                table.categorize(&description, fallback)
            }
        };

        candidates.push(CandidateTransaction {
            date,
            selected: !rules.should_deselect(&description, debit, is_check),
            vendor: description,
            amount: debit,
            category,
            payment_type: if is_check {
                PaymentType::Check
            } else {
                PaymentType::BankTransfer
            },
            description: tag.clone(),
            reportable: true,
            is_duplicate: false,
        });
    }
    candidates
}

fn parse_bank_ledger(
    text: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Result<ParsedStatement> {
    let records = read_records(text);
    let header = records
        .first()
        .filter(|r| find_column(r, &["Account Number"]).is_some())
        .ok_or_else(|| TallyError::Format("Invalid bank ledger CSV format".into()))?;
    let cols = ledger_columns(header)?;
    let rows = &records[1..];
    let number = cols
        .account
        .and_then(|i| rows.first().and_then(|r| r.get(i)))
        .map(last_four)
        .unwrap_or_default();

    Ok(ParsedStatement {
        candidates: ledger_candidates(rows, &cols, &number, rules, table),
        account: AccountInfo {
            bank: "NuVision".to_string(),
            name: "Checking".to_string(),
            number,
        },
    })
}

/// Ledger export whose first two lines are `Account Number:,First Name:,Last Name:`
/// and their values, followed by the transaction table.
fn parse_bank_ledger_with_preamble(
    text: &str,
    rules: &StatementRules,
    table: &KeywordTable,
) -> Result<ParsedStatement> {
    let records = read_records(text);
    let values = records
        .get(1)
        .ok_or_else(|| TallyError::Format("Invalid bank ledger CSV format: missing account details".into()))?;
    let number = values.get(0).map(last_four).unwrap_or_default();
    let holder = [values.get(1), values.get(2)]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let header_idx = records
        .iter()
        .skip(2)
        .position(|r| find_column(r, &["Description"]).is_some() && find_column(r, &["Debit"]).is_some())
        .map(|i| i + 2)
        .ok_or_else(|| TallyError::Format("Invalid bank ledger CSV format: missing transaction header".into()))?;
    let cols = ledger_columns(&records[header_idx])?;

    Ok(ParsedStatement {
        candidates: ledger_candidates(&records[header_idx + 1..], &cols, &number, rules, table),
        account: AccountInfo {
            bank: "NuVision".to_string(),
            name: holder,
            number,
        },
    })
}

// ---------------------------------------------------------------------------
// Debit/credit card: Transaction Date,Posted Date,Card No.,Description,Category,Debit,Credit
// ---------------------------------------------------------------------------

fn parse_debit_credit_card(text: &str, table: &KeywordTable) -> Result<ParsedStatement> {
    let records = read_records(text);
    let rows = records.get(1..).unwrap_or_default();
    let number = rows
        .first()
        .and_then(|r| r.get(2))
        .unwrap_or_default()
        .to_string();
    let tag = format!("Capital One x{number}");
    let mut candidates = Vec::new();

    for record in rows {
        if record.len() < 6
            || record[5].is_empty()
            || record[4].eq_ignore_ascii_case("payment/credit")
        {
            continue;
        }
        let Some(debit) = parse_amount(&record[5]) else {
            continue;
        };
        if debit <= 0.0 {
            continue;
        }
        let Some(date) = normalize_date(&record[0]) else {
            continue;
        };
        let vendor = record[3].to_string();
        candidates.push(CandidateTransaction {
            date,
            category: table.categorize(&vendor, issuer_fallback(Some(&record[4]))),
            vendor,
            amount: debit,
            payment_type: PaymentType::Cc,
            description: tag.clone(),
            reportable: true,
            selected: true,
            is_duplicate: false,
        });
    }

    Ok(ParsedStatement {
        account: AccountInfo {
            bank: "Capital One".to_string(),
            name: "Visa".to_string(),
            number,
        },
        candidates,
    })
}
