use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, business_name: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = business_name {
        settings.business_name = name;
    }

    let dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;
    save_settings(&settings)?;

    let conn = get_connection(&settings.db_path())?;
    let seeded = init_db(&conn)?;

    println!("Data directory: {}", dir.display());
    println!("Database:       {}", settings.db_path().display());
    if seeded > 0 {
        println!("Added {seeded} starter vendors.");
    }
    println!("{}", "Ready.".green());
    Ok(())
}
