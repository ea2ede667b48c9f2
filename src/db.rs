use std::path::Path;

use rusqlite::{params, Connection, Row};
use tracing::{debug, info};

use crate::error::{Result, TallyError};
use crate::models::{same_name, Expense, PaymentType, Revenue, Vendor};
use crate::reconciler::encode_unresolved_vendor;

pub const DB_FILE: &str = "tally.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vendors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT '',
    contact_person TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    phone_number TEXT NOT NULL DEFAULT '',
    account_number TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    vendor_id TEXT,
    category TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL,
    payment_type TEXT NOT NULL,
    reportable INTEGER,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (vendor_id) REFERENCES vendors(id)
);

CREATE TABLE IF NOT EXISTS revenues (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    source TEXT NOT NULL,
    check_amount REAL NOT NULL DEFAULT 0,
    cash_amount REAL NOT NULL DEFAULT 0,
    reportable INTEGER,
    created_at TEXT DEFAULT (datetime('now'))
);
";

// (name, category, contact_person, phone_number, account_number)
const DEFAULT_VENDORS: &[(&str, &str, &str, &str, &str)] = &[
    ("Beta Security", "Professional Services", "", "", ""),
    ("D&L Meats", "COGS", "David Lo", "626-945-8998", ""),
    ("Employers", "Insurance", "", "", "EIG 2649761 06"),
    ("Hing Lee Farms", "COGS", "", "", ""),
    ("Geico", "Insurance", "", "", ""),
    ("Tom Quan", "Rent", "", "", ""),
    ("SCE", "Utilities", "", "", ""),
    ("SJ Distributors", "COGS", "", "", ""),
    ("So Cal Gas", "Utilities", "", "", ""),
    ("Sure Payroll", "Professional Services", "", "", ""),
    ("Tesla", "Utilities", "", "", ""),
    ("Tesla Insurance", "Insurance", "", "", ""),
    ("Wing Sing", "COGS", "", "", ""),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Create tables and seed the vendor list on an empty store.
/// Returns the number of vendors seeded.
pub fn init_db(conn: &Connection) -> Result<usize> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM vendors", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }
    let vendors: Vec<Vendor> = DEFAULT_VENDORS
        .iter()
        .map(|(name, category, contact, phone, account)| Vendor {
            contact_person: contact.to_string(),
            phone_number: phone.to_string(),
            account_number: account.to_string(),
            ..Vendor::new(name, category)
        })
        .collect();
    insert_vendors(conn, &vendors)?;
    Ok(vendors.len())
}

fn persistence(e: rusqlite::Error) -> TallyError {
    TallyError::Persistence(e.to_string())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn vendor_from_row(row: &Row) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        contact_person: row.get(3)?,
        email: row.get(4)?,
        phone_number: row.get(5)?,
        account_number: row.get(6)?,
    })
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    let payment: String = row.get(5)?;
    Ok(Expense {
        id: row.get(0)?,
        date: row.get(1)?,
        vendor_id: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        payment_type: PaymentType::parse(&payment).unwrap_or_default(),
        reportable: row.get(6)?,
        description: row.get(7)?,
    })
}

fn revenue_from_row(row: &Row) -> rusqlite::Result<Revenue> {
    Ok(Revenue {
        id: row.get(0)?,
        date: row.get(1)?,
        source: row.get(2)?,
        check_amount: row.get(3)?,
        cash_amount: row.get(4)?,
        reportable: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn list_vendors(conn: &Connection) -> Result<Vec<Vendor>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, contact_person, email, phone_number, account_number
         FROM vendors ORDER BY name COLLATE NOCASE",
    )?;
    let rows = stmt
        .query_map([], vendor_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_expenses(conn: &Connection) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, vendor_id, category, amount, payment_type, reportable, description
         FROM expenses ORDER BY date DESC, created_at DESC",
    )?;
    let rows = stmt
        .query_map([], expense_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_revenues(conn: &Connection) -> Result<Vec<Revenue>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, source, check_amount, cash_amount, reportable
         FROM revenues ORDER BY date DESC, created_at DESC",
    )?;
    let rows = stmt
        .query_map([], revenue_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Look a vendor up by exact id, or by name ignoring case.
pub fn find_vendor(conn: &Connection, name_or_id: &str) -> Result<Option<Vendor>> {
    let needle = name_or_id.trim();
    let vendors = list_vendors(conn)?;
    Ok(vendors
        .iter()
        .find(|v| v.id == needle)
        .or_else(|| vendors.iter().find(|v| same_name(&v.name, needle)))
        .cloned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub vendors: i64,
    pub expenses: i64,
    pub revenues: i64,
}

pub fn counts(conn: &Connection) -> Result<Counts> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };
    Ok(Counts {
        vendors: count("vendors")?,
        expenses: count("expenses")?,
        revenues: count("revenues")?,
    })
}

// ---------------------------------------------------------------------------
// Batch writes
// ---------------------------------------------------------------------------

fn write_vendors(conn: &Connection, vendors: &[Vendor]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO vendors (id, name, category, contact_person, email, phone_number, account_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for v in vendors {
        stmt.execute(params![
            v.id,
            v.name,
            v.category,
            v.contact_person,
            v.email,
            v.phone_number,
            v.account_number
        ])?;
    }
    Ok(())
}

fn write_expenses(conn: &Connection, expenses: &[Expense]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO expenses (id, date, vendor_id, category, amount, payment_type, reportable, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    for e in expenses {
        stmt.execute(params![
            e.id,
            e.date,
            e.vendor_id,
            e.category,
            e.amount,
            e.payment_type.as_str(),
            e.reportable,
            e.description
        ])?;
    }
    Ok(())
}

fn write_revenues(conn: &Connection, revenues: &[Revenue]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO revenues (id, date, source, check_amount, cash_amount, reportable)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for r in revenues {
        stmt.execute(params![
            r.id,
            r.date,
            r.source,
            r.check_amount,
            r.cash_amount,
            r.reportable
        ])?;
    }
    Ok(())
}

/// Run `f` inside one transaction. Any failure rolls the whole batch back.
fn in_transaction<F>(conn: &Connection, f: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let tx = conn.unchecked_transaction().map_err(persistence)?;
    f(&tx).map_err(persistence)?;
    tx.commit().map_err(persistence)
}

pub fn insert_vendors(conn: &Connection, vendors: &[Vendor]) -> Result<()> {
    if vendors.is_empty() {
        return Ok(());
    }
    in_transaction(conn, |tx| write_vendors(tx, vendors))?;
    info!(count = vendors.len(), "saved vendors");
    Ok(())
}

pub fn insert_expenses(conn: &Connection, expenses: &[Expense]) -> Result<()> {
    if expenses.is_empty() {
        return Ok(());
    }
    in_transaction(conn, |tx| write_expenses(tx, expenses))?;
    info!(count = expenses.len(), "saved expenses");
    Ok(())
}

pub fn insert_revenues(conn: &Connection, revenues: &[Revenue]) -> Result<()> {
    if revenues.is_empty() {
        return Ok(());
    }
    in_transaction(conn, |tx| write_revenues(tx, revenues))?;
    info!(count = revenues.len(), "saved revenues");
    Ok(())
}

/// Replace every collection in one transaction.
pub fn replace_all(
    conn: &Connection,
    vendors: &[Vendor],
    expenses: &[Expense],
    revenues: &[Revenue],
) -> Result<()> {
    in_transaction(conn, |tx| {
        clear_tables(tx)?;
        write_vendors(tx, vendors)?;
        write_expenses(tx, expenses)?;
        write_revenues(tx, revenues)
    })?;
    info!(
        vendors = vendors.len(),
        expenses = expenses.len(),
        revenues = revenues.len(),
        "replaced all records"
    );
    Ok(())
}

fn clear_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("DELETE FROM expenses; DELETE FROM revenues; DELETE FROM vendors;")
}

pub fn purge(conn: &Connection) -> Result<()> {
    in_transaction(conn, clear_tables)?;
    info!("purged all records");
    Ok(())
}

// ---------------------------------------------------------------------------
// Deletes
// ---------------------------------------------------------------------------

/// Delete a vendor. Expenses linked to it keep the vendor's name in their
/// description and lose the link. Returns false when no such vendor exists.
pub fn delete_vendor(conn: &Connection, id: &str) -> Result<bool> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM vendors WHERE id = ?1", [id], |r| r.get(0))
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
        .map_err(persistence)?;
    let Some(name) = name else {
        return Ok(false);
    };

    in_transaction(conn, |tx| {
        let linked: Vec<(String, String)> = tx
            .prepare("SELECT id, description FROM expenses WHERE vendor_id = ?1")?
            .query_map([id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (expense_id, description) in &linked {
            tx.execute(
                "UPDATE expenses SET vendor_id = NULL, description = ?1 WHERE id = ?2",
                params![encode_unresolved_vendor(&name, description), expense_id],
            )?;
        }
        debug!(unlinked = linked.len(), vendor = %name, "unlinked expenses");
        tx.execute("DELETE FROM vendors WHERE id = ?1", [id])?;
        Ok(())
    })?;
    info!(vendor = %name, "deleted vendor");
    Ok(true)
}

pub fn delete_expense(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM expenses WHERE id = ?1", [id])
        .map_err(persistence)?;
    Ok(n > 0)
}

pub fn delete_revenue(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM revenues WHERE id = ?1", [id])
        .map_err(persistence)?;
    Ok(n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::new_id;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn expense(vendor_id: Option<&str>, amount: f64) -> Expense {
        Expense {
            id: new_id(),
            date: "2025-01-15".to_string(),
            vendor_id: vendor_id.map(str::to_string),
            category: "COGS".to_string(),
            amount,
            payment_type: PaymentType::BankTransfer,
            reportable: None,
            description: "weekly order".to_string(),
        }
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["vendors", "expenses", "revenues"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_seeds_vendors_once() {
        let (_dir, conn) = test_db();
        assert_eq!(counts(&conn).unwrap().vendors, DEFAULT_VENDORS.len() as i64);
        assert_eq!(init_db(&conn).unwrap(), 0);
        assert_eq!(counts(&conn).unwrap().vendors, DEFAULT_VENDORS.len() as i64);

        let dl = find_vendor(&conn, "d&l meats").unwrap().unwrap();
        assert_eq!(dl.contact_person, "David Lo");
        assert_eq!(dl.phone_number, "626-945-8998");
    }

    #[test]
    fn test_list_vendors_sorted_by_name() {
        let (_dir, conn) = test_db();
        let names: Vec<String> = list_vendors(&conn).unwrap().into_iter().map(|v| v.name).collect();
        let mut sorted = names.clone();
        sorted.sort_by_key(|n| n.to_lowercase());
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_expense_roundtrip_keeps_nullable_fields() {
        let (_dir, conn) = test_db();
        let mut e = expense(None, 12.34);
        e.reportable = Some(false);
        e.payment_type = PaymentType::Cash;
        insert_expenses(&conn, &[e.clone()]).unwrap();
        let stored = list_expenses(&conn).unwrap();
        assert_eq!(stored, vec![e]);
    }

    #[test]
    fn test_batch_with_bad_reference_saves_nothing() {
        let (_dir, conn) = test_db();
        let good = expense(None, 1.0);
        let bad = expense(Some("missing-vendor"), 2.0);
        let err = insert_expenses(&conn, &[good, bad]).unwrap_err();
        assert!(matches!(err, TallyError::Persistence(_)));
        assert!(list_expenses(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_delete_vendor_unlinks_expenses() {
        let (_dir, conn) = test_db();
        let vendor = find_vendor(&conn, "Wing Sing").unwrap().unwrap();
        insert_expenses(&conn, &[expense(Some(&vendor.id), 50.0)]).unwrap();

        assert!(delete_vendor(&conn, &vendor.id).unwrap());
        assert!(!delete_vendor(&conn, &vendor.id).unwrap());

        let stored = &list_expenses(&conn).unwrap()[0];
        assert_eq!(stored.vendor_id, None);
        assert_eq!(stored.description, "Wing Sing---weekly order");
    }

    #[test]
    fn test_revenue_insert_and_delete() {
        let (_dir, conn) = test_db();
        let r = Revenue {
            id: new_id(),
            date: "2025-01-05".to_string(),
            source: "DFC-Rosemead".to_string(),
            check_amount: 500.0,
            cash_amount: 0.0,
            reportable: Some(true),
        };
        insert_revenues(&conn, &[r.clone()]).unwrap();
        assert_eq!(list_revenues(&conn).unwrap(), vec![r.clone()]);
        assert!(delete_revenue(&conn, &r.id).unwrap());
        assert!(list_revenues(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_single_row_delete_failure_is_persistence_error() {
        let (_dir, conn) = test_db();
        conn.execute_batch("DROP TABLE expenses; DROP TABLE revenues;").unwrap();
        assert!(matches!(
            delete_expense(&conn, "x").unwrap_err(),
            TallyError::Persistence(_)
        ));
        assert!(matches!(
            delete_revenue(&conn, "x").unwrap_err(),
            TallyError::Persistence(_)
        ));
    }

    #[test]
    fn test_purge_clears_everything() {
        let (_dir, conn) = test_db();
        insert_expenses(&conn, &[expense(None, 3.0)]).unwrap();
        purge(&conn).unwrap();
        assert_eq!(
            counts(&conn).unwrap(),
            Counts {
                vendors: 0,
                expenses: 0,
                revenues: 0
            }
        );
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let (_dir, conn) = test_db();
        let v = Vendor::new("Only Vendor", "Rent");
        let e = expense(Some(&v.id), 9.0);
        replace_all(&conn, &[v.clone()], &[e], &[]).unwrap();
        let vendors = list_vendors(&conn).unwrap();
        assert_eq!(vendors, vec![v]);
        assert_eq!(counts(&conn).unwrap().expenses, 1);
    }

    #[test]
    fn test_find_vendor_by_id_or_name() {
        let (_dir, conn) = test_db();
        let sce = find_vendor(&conn, "sce").unwrap().unwrap();
        assert_eq!(find_vendor(&conn, &sce.id).unwrap().unwrap().name, "SCE");
        assert!(find_vendor(&conn, "Nobody").unwrap().is_none());
    }

    #[test]
    fn test_find_vendor_matches_non_ascii_case() {
        let (_dir, conn) = test_db();
        insert_vendors(&conn, &[Vendor::new("Café Lumière", "COGS")]).unwrap();
        let found = find_vendor(&conn, "CAFÉ LUMIÈRE").unwrap().unwrap();
        assert_eq!(found.name, "Café Lumière");
    }
}
