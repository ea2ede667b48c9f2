use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db;
use crate::error::Result;
use crate::models::{new_id, Expense, Revenue, Vendor};

/// Everything a user has stored, in the JSON backup layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub revenues: Vec<Revenue>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub exported_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub vendors: usize,
    pub expenses: usize,
    pub revenues: usize,
    /// Expenses whose vendor id pointed at no vendor in the backup.
    pub unlinked: usize,
}

pub fn snapshot(conn: &Connection) -> Result<Snapshot> {
    Ok(Snapshot {
        revenues: db::list_revenues(conn)?,
        expenses: db::list_expenses(conn)?,
        vendors: db::list_vendors(conn)?,
        exported_at: chrono::Local::now().to_rfc3339(),
    })
}

pub fn export_json(conn: &Connection) -> Result<String> {
    Ok(serde_json::to_string_pretty(&snapshot(conn)?)?)
}

pub fn parse_snapshot(text: &str) -> Result<Snapshot> {
    Ok(serde_json::from_str(text)?)
}

/// Give every record a fresh id and point expenses at their vendors' new ids.
/// A vendor id with no matching vendor in the snapshot becomes `None`.
fn reassign_ids(snapshot: Snapshot) -> (Snapshot, usize) {
    let mut id_map: HashMap<String, String> = HashMap::new();
    let vendors: Vec<Vendor> = snapshot
        .vendors
        .into_iter()
        .map(|v| {
            let id = new_id();
            if !v.id.is_empty() {
                id_map.insert(v.id.clone(), id.clone());
            }
            Vendor { id, ..v }
        })
        .collect();

    let mut unlinked = 0;
    let expenses: Vec<Expense> = snapshot
        .expenses
        .into_iter()
        .map(|e| {
            let vendor_id = match e.vendor_id.as_deref().filter(|id| !id.is_empty()) {
                None => None,
                Some(old) => {
                    let mapped = id_map.get(old).cloned();
                    if mapped.is_none() {
                        warn!(expense = %e.id, vendor = old, "backup references missing vendor");
                        unlinked += 1;
                    }
                    mapped
                }
            };
            Expense {
                id: new_id(),
                vendor_id,
                ..e
            }
        })
        .collect();

    let revenues = snapshot
        .revenues
        .into_iter()
        .map(|r| Revenue { id: new_id(), ..r })
        .collect();

    (
        Snapshot {
            revenues,
            expenses,
            vendors,
            exported_at: snapshot.exported_at,
        },
        unlinked,
    )
}

/// Replace all stored records with the snapshot's, in one transaction.
pub fn restore(conn: &Connection, snapshot: Snapshot) -> Result<RestoreSummary> {
    let (fresh, unlinked) = reassign_ids(snapshot);
    db::replace_all(conn, &fresh.vendors, &fresh.expenses, &fresh.revenues)?;
    Ok(RestoreSummary {
        vendors: fresh.vendors.len(),
        expenses: fresh.expenses.len(),
        revenues: fresh.revenues.len(),
        unlinked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    const BACKUP: &str = r#"{
        "exportedAt": "2025-01-31T10:00:00Z",
        "vendors": [
            {"id": "old-v1", "name": "Wing Sing", "category": "COGS"},
            {"id": "old-v2", "name": "SCE", "category": "Utilities", "phoneNumber": "800-655-4555"}
        ],
        "expenses": [
            {"id": "e1", "date": "2025-01-10", "vendorId": "old-v1", "category": "COGS",
             "amount": "120.50", "paymentType": "Check", "reportable": true, "description": ""},
            {"id": "e2", "date": "2025-01-11", "vendorId": "deleted", "category": "COGS",
             "amount": 10, "paymentType": "CC"},
            {"id": "e3", "date": "2025-01-12", "vendorId": null, "category": "Supplies",
             "amount": 3.5, "paymentType": "Cash", "description": "Corner Store---ice"}
        ],
        "revenues": [
            {"id": "r1", "date": "2025-01-05", "source": "DFC-Rosemead", "checkAmount": 500, "cashAmount": 0, "reportable": true}
        ]
    }"#;

    #[test]
    fn test_restore_replaces_and_remaps_vendors() {
        let (_dir, conn) = test_db();
        let summary = restore(&conn, parse_snapshot(BACKUP).unwrap()).unwrap();
        assert_eq!(
            summary,
            RestoreSummary {
                vendors: 2,
                expenses: 3,
                revenues: 1,
                unlinked: 1
            }
        );

        let vendors = db::list_vendors(&conn).unwrap();
        assert_eq!(vendors.len(), 2);
        let wing_sing = vendors.iter().find(|v| v.name == "Wing Sing").unwrap();
        assert_ne!(wing_sing.id, "old-v1");

        let expenses = db::list_expenses(&conn).unwrap();
        let e1 = expenses.iter().find(|e| e.date == "2025-01-10").unwrap();
        assert_eq!(e1.vendor_id.as_deref(), Some(wing_sing.id.as_str()));
        assert_eq!(e1.amount, 120.5);
        let e2 = expenses.iter().find(|e| e.date == "2025-01-11").unwrap();
        assert_eq!(e2.vendor_id, None);
        assert!(expenses.iter().all(|e| !["e1", "e2", "e3"].contains(&e.id.as_str())));
    }

    #[test]
    fn test_export_then_restore_preserves_links() {
        let (_dir, conn) = test_db();
        restore(&conn, parse_snapshot(BACKUP).unwrap()).unwrap();
        let json = export_json(&conn).unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"vendorId\""));

        let (_dir2, other) = test_db();
        let summary = restore(&other, parse_snapshot(&json).unwrap()).unwrap();
        assert_eq!(summary.unlinked, 0);
        let vendors = db::list_vendors(&other).unwrap();
        let linked = db::list_expenses(&other)
            .unwrap()
            .into_iter()
            .filter_map(|e| e.vendor_id)
            .collect::<Vec<_>>();
        assert_eq!(linked.len(), 1);
        assert!(vendors.iter().any(|v| v.id == linked[0] && v.name == "Wing Sing"));
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let snap = parse_snapshot(r#"{"vendors": []}"#).unwrap();
        assert!(snap.expenses.is_empty());
        assert!(snap.revenues.is_empty());
    }

    #[test]
    fn test_malformed_backup_is_an_error() {
        assert!(parse_snapshot("not json").is_err());
    }
}
