use std::path::PathBuf;

use colored::Colorize;

use crate::backup::{export_json, parse_snapshot, restore};
use crate::cli::open_db;
use crate::db;
use crate::error::{Result, TallyError};
use crate::fmt::format_bytes;

pub fn export(output: Option<String>) -> Result<()> {
    let (settings, conn) = open_db()?;

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let backups_dir = PathBuf::from(&settings.data_dir).join("backups");
            std::fs::create_dir_all(&backups_dir)?;
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            backups_dir.join(format!("tally-{stamp}.json"))
        }
    };

    std::fs::write(&dest_path, export_json(&conn)?)?;

    let size = std::fs::metadata(&dest_path)?.len();
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}

pub fn restore_file(file: &str) -> Result<()> {
    let text = std::fs::read_to_string(file)?;
    let snapshot = parse_snapshot(&text)?;
    let (_, conn) = open_db()?;

    let summary = restore(&conn, snapshot)?;
    println!(
        "Restored {} vendors, {} expenses, {} revenue records.",
        summary.vendors, summary.expenses, summary.revenues
    );
    if summary.unlinked > 0 {
        println!(
            "{}",
            format!(
                "{} expenses referenced vendors missing from the backup and were unlinked.",
                summary.unlinked
            )
            .yellow()
        );
    }
    Ok(())
}

pub fn purge(yes: bool) -> Result<()> {
    if !yes {
        return Err(TallyError::Other(
            "Purge deletes every record. Re-run with --yes to confirm.".to_string(),
        ));
    }
    let (_, conn) = open_db()?;
    let before = db::counts(&conn)?;
    db::purge(&conn)?;
    println!(
        "Deleted {} vendors, {} expenses, {} revenue records.",
        before.vendors, before.expenses, before.revenues
    );
    Ok(())
}
