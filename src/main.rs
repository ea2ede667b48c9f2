mod backup;
mod categorizer;
mod cli;
mod db;
mod duplicates;
mod entry;
mod error;
mod filter;
mod fmt;
mod importer;
mod models;
mod reconciler;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ExpensesCommands, ReportCommands, RevenueCommands, VendorsCommands};

fn init_logging() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            business_name,
        } => cli::init::run(data_dir, business_name),
        Commands::Vendors { command } => match command {
            VendorsCommands::Add {
                name,
                category,
                contact,
                email,
                phone,
                account,
            } => cli::vendors::add(cli::vendors::NewVendor {
                name,
                category,
                contact,
                email,
                phone,
                account,
            }),
            VendorsCommands::List => cli::vendors::list(),
            VendorsCommands::Delete { vendor } => cli::vendors::delete(&vendor),
        },
        Commands::Expenses { command } => match command {
            ExpensesCommands::Add {
                vendor,
                amount,
                date,
                category,
                payment_type,
                description,
                non_reportable,
            } => cli::expenses::add(cli::expenses::NewExpense {
                vendor,
                amount,
                date,
                category,
                payment_type,
                description,
                non_reportable,
            }),
            ExpensesCommands::Batch { file } => cli::expenses::batch(&file),
            ExpensesCommands::Wages {
                period,
                payroll,
                tax,
                cash,
            } => cli::expenses::wages(period, payroll, tax, cash),
            ExpensesCommands::Periods => cli::expenses::periods(),
            ExpensesCommands::List { filter } => cli::expenses::list(&filter),
            ExpensesCommands::Delete { id } => cli::expenses::delete(&id),
        },
        Commands::Revenue { command } => match command {
            RevenueCommands::Add {
                source,
                date,
                check,
                cash,
            } => cli::revenue::add(&source, date, check, cash),
            RevenueCommands::List { filter } => cli::revenue::list(&filter),
            RevenueCommands::Delete { id } => cli::revenue::delete(&id),
        },
        Commands::Import {
            file,
            save,
            include,
            exclude,
        } => cli::import::run(&file, save, &include, &exclude),
        Commands::Report { command } => match command {
            ReportCommands::Totals { filter } => cli::report::totals(&filter),
            ReportCommands::Groups {
                by,
                kind,
                detail,
                filter,
            } => cli::report::groups(&by, &kind, detail, &filter),
            ReportCommands::Months => cli::report::months(),
        },
        Commands::Export { output } => cli::backup::export(output),
        Commands::Restore { file } => cli::backup::restore_file(&file),
        Commands::Purge { yes } => cli::backup::purge(yes),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
