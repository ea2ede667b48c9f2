pub mod backup;
pub mod expenses;
pub mod import;
pub mod init;
pub mod report;
pub mod revenue;
pub mod status;
pub mod vendors;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::filter::{DateFilter, ReportTypeFilter};
use crate::settings::{load_settings, Settings};

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Load settings and open the database, failing if `tally init` never ran.
pub(crate) fn open_db() -> Result<(Settings, Connection)> {
    let settings = load_settings();
    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(TallyError::Settings(format!(
            "No database found at {}\nRun `tally init` to set up.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    Ok((settings, conn))
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolve a full id from a unique prefix of one of `ids`.
pub(crate) fn resolve_id<'a, I>(ids: I, prefix: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(TallyError::Other("An id is required".to_string()));
    }
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [one] => Ok(one.to_string()),
        [] => Err(TallyError::Other(format!("No record with id {prefix}"))),
        _ => Err(TallyError::Other(format!(
            "Id {prefix} is ambiguous ({} matches)",
            matches.len()
        ))),
    }
}

#[derive(Parser)]
#[command(name = "tally", about = "Expense and revenue bookkeeping for a small food business.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Date-range and report-type selection shared by listings and reports.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// all, this-month, last-month, last-quarter, last-6-months, or YYYY-MM
    #[arg(long)]
    pub period: Option<String>,
    /// Custom range start (YYYY-MM-DD); overrides --period
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// Custom range end (YYYY-MM-DD, inclusive); overrides --period
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// all, reportable, or non-reportable
    #[arg(long = "report-type")]
    pub report_type: Option<String>,
}

impl FilterArgs {
    pub fn date_filter(&self) -> Result<DateFilter> {
        if self.from_date.is_some() || self.to_date.is_some() {
            return Ok(DateFilter::Custom {
                start: self.from_date.clone().unwrap_or_default(),
                end: self.to_date.clone().unwrap_or_default(),
            });
        }
        DateFilter::parse(self.period.as_deref().unwrap_or("all"))
    }

    pub fn report_type_or(&self, default: ReportTypeFilter) -> Result<ReportTypeFilter> {
        match &self.report_type {
            Some(raw) => ReportTypeFilter::parse(raw),
            None => Ok(default),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Business name shown in reports
        #[arg(long = "business-name")]
        business_name: Option<String>,
    },
    /// Manage vendors.
    Vendors {
        #[command(subcommand)]
        command: VendorsCommands,
    },
    /// Record and list expenses.
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommands,
    },
    /// Record and list revenue.
    Revenue {
        #[command(subcommand)]
        command: RevenueCommands,
    },
    /// Parse a bank or card statement CSV into candidate expenses.
    Import {
        /// Path to the statement CSV
        file: String,
        /// Reconcile vendors and save the selected candidates
        #[arg(long)]
        save: bool,
        /// Candidate numbers to select (overrides duplicate and heuristic deselection)
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        include: Vec<usize>,
        /// Candidate numbers to deselect
        #[arg(long, num_args = 1.., value_delimiter = ',')]
        exclude: Vec<usize>,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export all records to a JSON backup.
    Export {
        /// Output path (default: <data_dir>/backups/tally-YYYYMMDD-HHMMSS.json)
        #[arg(long)]
        output: Option<String>,
    },
    /// Replace all records with the contents of a JSON backup.
    Restore {
        /// Path to a backup written by `tally export`
        file: String,
    },
    /// Delete all vendors, expenses and revenue.
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum VendorsCommands {
    /// Add a vendor.
    Add {
        name: String,
        /// Default category for this vendor's expenses
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        account: Option<String>,
    },
    /// List vendors.
    List,
    /// Delete a vendor by name or id. Linked expenses keep the name.
    Delete { vendor: String },
}

#[derive(Subcommand)]
pub enum ExpensesCommands {
    /// Add one expense.
    Add {
        /// Vendor name or id; unknown names are kept on the expense
        #[arg(long)]
        vendor: String,
        #[arg(long)]
        amount: f64,
        /// Expense date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Category (default: the vendor's category or a keyword match)
        #[arg(long)]
        category: Option<String>,
        /// Check, Cash, Bank Transfer or CC
        #[arg(long = "payment", default_value = "CC")]
        payment_type: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Keep this expense out of reportable totals
        #[arg(long = "non-reportable")]
        non_reportable: bool,
    },
    /// Add many expenses from a CSV (date,vendor,category,amount,payment_type,reportable,description).
    Batch { file: String },
    /// Record payroll for one pay period.
    Wages {
        /// Pay period end date (default: the most recent period)
        #[arg(long)]
        period: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        payroll: f64,
        #[arg(long, default_value_t = 0.0)]
        tax: f64,
        #[arg(long, default_value_t = 0.0)]
        cash: f64,
    },
    /// List recent biweekly pay periods.
    Periods,
    /// List expenses.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Delete an expense by id (a unique prefix is enough).
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum RevenueCommands {
    /// Record revenue; check and cash become separate records.
    Add {
        /// One of the configured revenue sources
        #[arg(long)]
        source: String,
        /// Revenue date (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        check: f64,
        #[arg(long, default_value_t = 0.0)]
        cash: f64,
    },
    /// List revenue.
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Delete a revenue record by id (a unique prefix is enough).
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Revenue, expenses and net for a period.
    Totals {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Grouped breakdown of expenses or revenue.
    Groups {
        /// category, month, vendor, or amount
        #[arg(long, default_value = "category")]
        by: String,
        /// expenses or revenue
        #[arg(long, default_value = "expenses")]
        kind: String,
        /// List the records inside each group
        #[arg(long)]
        detail: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List trailing months available as --period values.
    Months,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_id_by_prefix() {
        let ids = ["abc-1", "abd-2", "xyz-3"];
        assert_eq!(resolve_id(ids, "x").unwrap(), "xyz-3");
        assert_eq!(resolve_id(ids, "abd-2").unwrap(), "abd-2");
        assert!(resolve_id(ids, "ab").is_err());
        assert!(resolve_id(ids, "q").is_err());
        assert!(resolve_id(ids, " ").is_err());
    }

    #[test]
    fn test_custom_range_overrides_period() {
        let args = FilterArgs {
            period: Some("this-month".to_string()),
            from_date: Some("2025-01-01".to_string()),
            ..FilterArgs::default()
        };
        assert_eq!(
            args.date_filter().unwrap(),
            DateFilter::Custom {
                start: "2025-01-01".to_string(),
                end: String::new()
            }
        );
        assert_eq!(
            FilterArgs::default().report_type_or(ReportTypeFilter::ReportableOnly).unwrap(),
            ReportTypeFilter::ReportableOnly
        );
    }

    #[test]
    fn test_cli_parses_import_selection() {
        let cli = Cli::try_parse_from(["tally", "import", "s.csv", "--include", "1,3", "--save"]).unwrap();
        match cli.command {
            Commands::Import { include, save, .. } => {
                assert_eq!(include, vec![1, 3]);
                assert!(save);
            }
            _ => panic!("expected import"),
        }
    }
}
