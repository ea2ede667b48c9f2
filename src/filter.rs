use chrono::{Datelike, Months, NaiveDate};

use crate::error::{Result, TallyError};
use crate::models::LedgerRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    All,
    ThisMonth,
    LastMonth,
    LastQuarter,
    Last6Months,
    Custom { start: String, end: String },
    TrailingMonth { year: i32, month: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTypeFilter {
    #[default]
    All,
    ReportableOnly,
    NonReportableOnly,
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_window(year: i32, month: u32) -> Option<DateWindow> {
    let start = month_start(year, month)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(DateWindow { start, end })
}

/// Parse a stored record date from its components. "YYYY-MM" means the 2nd
/// of that month so it never lands on a month boundary.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split('-').collect();
    let (y, m, d) = match parts.as_slice() {
        [y, m] if raw.len() == 7 => (*y, *m, "2"),
        [y, m, d] => (*y, *m, *d),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

impl DateFilter {
    /// Parse a preset name or a "YYYY-MM" trailing month.
    pub fn parse(raw: &str) -> Result<Self> {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "all" => Ok(Self::All),
            "this-month" => Ok(Self::ThisMonth),
            "last-month" => Ok(Self::LastMonth),
            "last-quarter" => Ok(Self::LastQuarter),
            "last-6-months" => Ok(Self::Last6Months),
            _ => {
                let (y, m) = lower
                    .split_once('-')
                    .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                    .filter(|(_, m)| (1..=12).contains(m))
                    .ok_or_else(|| TallyError::Other(format!("Unknown period: {raw}")))?;
                Ok(Self::TrailingMonth { year: y, month: m })
            }
        }
    }

    /// Resolve to a window relative to `today`. `None` means no date filtering.
    pub fn window(&self, today: NaiveDate) -> Option<DateWindow> {
        let (y, m) = (today.year(), today.month());
        match self {
            Self::All => None,
            Self::ThisMonth => month_window(y, m),
            Self::LastMonth => {
                let prev = month_start(y, m)?.checked_sub_months(Months::new(1))?;
                month_window(prev.year(), prev.month())
            }
            Self::LastQuarter => {
                let quarter_start = month_start(y, (m - 1) / 3 * 3 + 1)?;
                let start = quarter_start.checked_sub_months(Months::new(3))?;
                Some(DateWindow {
                    start,
                    end: quarter_start.pred_opt()?,
                })
            }
            Self::Last6Months => Some(DateWindow {
                start: month_start(y, m)?.checked_sub_months(Months::new(5))?,
                end: month_window(y, m)?.end,
            }),
            Self::Custom { start, end } => Some(DateWindow {
                start: parse_record_date(start)?,
                end: parse_record_date(end)?,
            }),
            Self::TrailingMonth { year, month } => month_window(*year, *month),
        }
    }

    /// Human-readable label for the resolved range.
    pub fn describe(&self, today: NaiveDate) -> String {
        match self.window(today) {
            None => "All Time".to_string(),
            Some(w) => format!(
                "{} - {}",
                w.start.format("%b %-d, %Y"),
                w.end.format("%b %-d, %Y")
            ),
        }
    }
}

impl ReportTypeFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "reportable" | "reportable-only" => Ok(Self::ReportableOnly),
            "non-reportable" | "non-reportable-only" => Ok(Self::NonReportableOnly),
            other => Err(TallyError::Other(format!("Unknown report type: {other}"))),
        }
    }

    pub fn matches(&self, reportable: Option<bool>) -> bool {
        match self {
            Self::All => true,
            Self::ReportableOnly => reportable != Some(false),
            Self::NonReportableOnly => reportable == Some(false),
        }
    }
}

/// Select the records inside the date window that pass the reportable filter.
pub fn filter_records<T: LedgerRecord + Clone>(
    records: &[T],
    date_filter: &DateFilter,
    report_type: ReportTypeFilter,
    today: NaiveDate,
) -> Vec<T> {
    let window = date_filter.window(today);
    records
        .iter()
        .filter(|r| match window {
            None => true,
            Some(w) => parse_record_date(r.date()).is_some_and(|d| w.contains(d)),
        })
        .filter(|r| report_type.matches(r.reportable()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrailingMonthOption {
    pub year: i32,
    pub month: u32,
    pub value: String,
    pub label: String,
}

/// Quick-pick months, current month first.
pub fn trailing_months(today: NaiveDate, count: u32) -> Vec<TrailingMonthOption> {
    let Some(first) = month_start(today.year(), today.month()) else {
        return Vec::new();
    };
    (0..count)
        .filter_map(|i| first.checked_sub_months(Months::new(i)))
        .map(|d| TrailingMonthOption {
            year: d.year(),
            month: d.month(),
            value: d.format("%Y-%m").to_string(),
            label: d.format("%B %Y").to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Expense, PaymentType};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(date: &str, reportable: Option<bool>) -> Expense {
        Expense {
            id: date.to_string(),
            date: date.to_string(),
            vendor_id: None,
            category: "COGS".to_string(),
            amount: 1.0,
            payment_type: PaymentType::Cash,
            reportable,
            description: String::new(),
        }
    }

    fn dates(records: &[Expense]) -> Vec<&str> {
        records.iter().map(|r| r.date.as_str()).collect()
    }

    #[test]
    fn test_parse_record_date() {
        assert_eq!(parse_record_date("2025-01-31"), Some(ymd(2025, 1, 31)));
        assert_eq!(parse_record_date("2025-02"), Some(ymd(2025, 2, 2)));
        assert_eq!(parse_record_date("2025-1-5"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_record_date("2025-02-30"), None);
        assert_eq!(parse_record_date(""), None);
        assert_eq!(parse_record_date("01/02/2025"), None);
    }

    #[test]
    fn test_custom_range_is_inclusive_by_local_date() {
        let filter = DateFilter::Custom {
            start: "2025-01-01".to_string(),
            end: "2025-01-31".to_string(),
        };
        let records = vec![
            expense("2024-12-31", None),
            expense("2025-01-01", None),
            expense("2025-01-31", None),
            expense("2025-02-01", None),
        ];
        let out = filter_records(&records, &filter, ReportTypeFilter::All, ymd(2025, 6, 1));
        assert_eq!(dates(&out), vec!["2025-01-01", "2025-01-31"]);
    }

    #[test]
    fn test_custom_range_missing_bound_is_unfiltered() {
        let filter = DateFilter::Custom {
            start: String::new(),
            end: "2025-01-31".to_string(),
        };
        let records = vec![expense("2030-01-01", None)];
        let out = filter_records(&records, &filter, ReportTypeFilter::All, ymd(2025, 6, 1));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_this_and_last_month() {
        let today = ymd(2025, 3, 15);
        assert_eq!(
            DateFilter::ThisMonth.window(today),
            Some(DateWindow { start: ymd(2025, 3, 1), end: ymd(2025, 3, 31) })
        );
        assert_eq!(
            DateFilter::LastMonth.window(today),
            Some(DateWindow { start: ymd(2025, 2, 1), end: ymd(2025, 2, 28) })
        );
        assert_eq!(
            DateFilter::LastMonth.window(ymd(2025, 1, 10)),
            Some(DateWindow { start: ymd(2024, 12, 1), end: ymd(2024, 12, 31) })
        );
    }

    #[test]
    fn test_last_quarter_is_previous_calendar_quarter() {
        let q1 = DateWindow { start: ymd(2025, 1, 1), end: ymd(2025, 3, 31) };
        assert_eq!(DateFilter::LastQuarter.window(ymd(2025, 4, 1)), Some(q1));
        assert_eq!(DateFilter::LastQuarter.window(ymd(2025, 6, 30)), Some(q1));
        assert_eq!(
            DateFilter::LastQuarter.window(ymd(2025, 2, 14)),
            Some(DateWindow { start: ymd(2024, 10, 1), end: ymd(2024, 12, 31) })
        );
    }

    #[test]
    fn test_last_six_months_spans_six_calendar_months() {
        assert_eq!(
            DateFilter::Last6Months.window(ymd(2025, 3, 15)),
            Some(DateWindow { start: ymd(2024, 10, 1), end: ymd(2025, 3, 31) })
        );
    }

    #[test]
    fn test_trailing_month_and_month_only_dates() {
        let filter = DateFilter::TrailingMonth { year: 2025, month: 2 };
        let records = vec![
            expense("2025-02", None),
            expense("2025-02-28", None),
            expense("2025-03-01", None),
            expense("", None),
        ];
        let out = filter_records(&records, &filter, ReportTypeFilter::All, ymd(2025, 6, 1));
        assert_eq!(dates(&out), vec!["2025-02", "2025-02-28"]);
    }

    #[test]
    fn test_report_type_filter() {
        let records = vec![
            expense("2025-01-01", Some(true)),
            expense("2025-01-02", None),
            expense("2025-01-03", Some(false)),
        ];
        let today = ymd(2025, 1, 5);
        let reportable =
            filter_records(&records, &DateFilter::All, ReportTypeFilter::ReportableOnly, today);
        assert_eq!(dates(&reportable), vec!["2025-01-01", "2025-01-02"]);
        let non =
            filter_records(&records, &DateFilter::All, ReportTypeFilter::NonReportableOnly, today);
        assert_eq!(dates(&non), vec!["2025-01-03"]);
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!(DateFilter::parse("last-quarter").unwrap(), DateFilter::LastQuarter);
        assert_eq!(
            DateFilter::parse("2025-08").unwrap(),
            DateFilter::TrailingMonth { year: 2025, month: 8 }
        );
        assert!(DateFilter::parse("2025-13").is_err());
        assert!(DateFilter::parse("someday").is_err());
        assert_eq!(
            ReportTypeFilter::parse("non-reportable").unwrap(),
            ReportTypeFilter::NonReportableOnly
        );
    }

    #[test]
    fn test_trailing_months_list() {
        let months = trailing_months(ymd(2025, 1, 20), 13);
        assert_eq!(months.len(), 13);
        assert_eq!(months[0].value, "2025-01");
        assert_eq!(months[0].label, "January 2025");
        assert_eq!(months[1].value, "2024-12");
        assert_eq!(months[12].value, "2024-01");
    }

    #[test]
    fn test_describe_range() {
        let today = ymd(2025, 3, 15);
        assert_eq!(DateFilter::All.describe(today), "All Time");
        assert_eq!(DateFilter::ThisMonth.describe(today), "Mar 1, 2025 - Mar 31, 2025");
    }
}
