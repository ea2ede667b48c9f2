use crate::cli::today;
use crate::db::{counts, get_connection, list_expenses, list_revenues};
use crate::error::Result;
use crate::filter::{filter_records, DateFilter, ReportTypeFilter};
use crate::fmt::{format_bytes, money};
use crate::reports::totals;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = settings.db_path();

    println!(
        "Business:   {}",
        if settings.business_name.is_empty() { "(not set)" } else { &settings.business_name }
    );
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Sources:    {}", settings.revenue_sources.join(", "));

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let c = counts(&conn)?;
        println!();
        println!("Vendors:    {}", c.vendors);
        println!("Expenses:   {}", c.expenses);
        println!("Revenue:    {}", c.revenues);

        let this_month = DateFilter::ThisMonth;
        let now = today();
        let revenues = filter_records(&list_revenues(&conn)?, &this_month, ReportTypeFilter::ReportableOnly, now);
        let expenses = filter_records(&list_expenses(&conn)?, &this_month, ReportTypeFilter::ReportableOnly, now);
        let t = totals(&revenues, &expenses);
        println!();
        println!("This month (reportable)");
        println!("  Revenue:  {}", money(t.revenue));
        println!("  Expenses: {}", money(t.expenses));
        println!("  Net:      {}", money(t.net));
    } else {
        println!();
        println!("Database not found. Run `tally init` to set up.");
    }

    Ok(())
}
