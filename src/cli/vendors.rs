use comfy_table::{Cell, Table};

use crate::cli::{open_db, resolve_id, short_id};
use crate::db;
use crate::error::{Result, TallyError};
use crate::models::{Vendor, CATEGORIES, DEFAULT_CATEGORY};

pub struct NewVendor {
    pub name: String,
    pub category: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub account: Option<String>,
}

pub fn add(input: NewVendor) -> Result<()> {
    let (settings, conn) = open_db()?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(TallyError::Validation {
            row: 1,
            fields: vec!["name".to_string()],
        });
    }
    if let Some(existing) = db::find_vendor(&conn, name)? {
        return Err(TallyError::Other(format!(
            "Vendor already exists: {}",
            existing.name
        )));
    }

    let category = input
        .category
        .unwrap_or_else(|| settings.keyword_table.categorize(name, DEFAULT_CATEGORY));
    if !CATEGORIES.contains(&category.as_str()) {
        println!("Note: '{category}' is not one of the standard categories.");
    }
    let vendor = Vendor {
        contact_person: input.contact.unwrap_or_default(),
        email: input.email.unwrap_or_default(),
        phone_number: input.phone.unwrap_or_default(),
        account_number: input.account.unwrap_or_default(),
        ..Vendor::new(name, &category)
    };
    db::insert_vendors(&conn, std::slice::from_ref(&vendor))?;
    println!("Added vendor: {} ({})", vendor.name, vendor.category);
    Ok(())
}

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let vendors = db::list_vendors(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Name", "Category", "Contact", "Phone", "Email", "Account", "ID"]);
    for v in &vendors {
        table.add_row(vec![
            Cell::new(&v.name),
            Cell::new(&v.category),
            Cell::new(&v.contact_person),
            Cell::new(&v.phone_number),
            Cell::new(&v.email),
            Cell::new(&v.account_number),
            Cell::new(short_id(&v.id)),
        ]);
    }
    println!("Vendors ({})\n{table}", vendors.len());
    Ok(())
}

pub fn delete(name_or_id: &str) -> Result<()> {
    let (_, conn) = open_db()?;
    let vendors = db::list_vendors(&conn)?;
    let vendor = match db::find_vendor(&conn, name_or_id)? {
        Some(v) => v,
        None => {
            let id = resolve_id(vendors.iter().map(|v| v.id.as_str()), name_or_id)
                .map_err(|_| TallyError::UnknownVendor(name_or_id.to_string()))?;
            vendors
                .into_iter()
                .find(|v| v.id == id)
                .ok_or_else(|| TallyError::UnknownVendor(name_or_id.to_string()))?
        }
    };
    db::delete_vendor(&conn, &vendor.id)?;
    println!("Deleted vendor: {}", vendor.name);
    Ok(())
}
