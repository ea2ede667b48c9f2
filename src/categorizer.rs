use serde::{Deserialize, Serialize};

/// Vendors containing this substring are fuel purchases regardless of table order.
const FUEL_OVERRIDE: (&str, &str) = ("costco gas", "Auto & Travel");

/// Ordered category → keyword table. Earlier entries win when keywords from
/// several categories match the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTable {
    pub entries: Vec<(String, Vec<String>)>,
}

impl Default for KeywordTable {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("COGS", &["supermarket", "smart and final", "99 ranch", "grocery", "restaurant depot"]),
            ("Supplies", &["costco", "amazon", "daiso", "staples", "home depot", "dollar tree"]),
            ("Utilities", &["verizon", "t-mobile", "edison", "sce", "so cal gas", "socalgas", "spectrum"]),
            ("Insurance", &["geico", "state farm", "allstate"]),
            ("Maintenance & Repair", &["auto zone", "o'reilly"]),
            (
                "Professional Services",
                &["google gsuite", "cognito-team", "chatgpt", "big star", "aaa ca membership"],
            ),
            ("Auto & Travel", &["costco gas", "gas"]),
            (
                "General Expense",
                &["uep*shancheng lameizi", "wingstop", "panera", "bouncie", "chinatown express inc", "ono"],
            ),
        ];
        Self {
            entries: table
                .iter()
                .map(|(cat, kws)| {
                    (cat.to_string(), kws.iter().map(|k| k.to_string()).collect())
                })
                .collect(),
        }
    }
}

impl KeywordTable {
    pub fn categorize(&self, text: &str, fallback: &str) -> String {
        let lower = text.to_lowercase();
        if lower.contains(FUEL_OVERRIDE.0) {
            return FUEL_OVERRIDE.1.to_string();
        }
        self.entries
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorize(text: &str, fallback: &str) -> String {
        KeywordTable::default().categorize(text, fallback)
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        assert_eq!(categorize("VERIZON WIRELESS", "General Expense"), "Utilities");
        assert_eq!(categorize("Smart and Final #412", "General Expense"), "COGS");
    }

    #[test]
    fn test_fuel_override_beats_table_order() {
        // "costco" alone would hit Supplies first.
        assert_eq!(categorize("COSTCO GAS #123", "General Expense"), "Auto & Travel");
        assert_eq!(categorize("COSTCO WHSE #123", "General Expense"), "Supplies");
    }

    #[test]
    fn test_first_declared_category_wins() {
        // "so cal gas" (Utilities) is declared before "gas" (Auto & Travel).
        assert_eq!(categorize("SO CAL GAS BILL", "General Expense"), "Utilities");
        assert_eq!(categorize("SHELL GAS STATION", "General Expense"), "Auto & Travel");
    }

    #[test]
    fn test_fallback_when_unmatched() {
        assert_eq!(categorize("ACME WIDGETS", "Dining"), "Dining");
        assert_eq!(categorize("", "General Expense"), "General Expense");
    }

    #[test]
    fn test_custom_table() {
        let table = KeywordTable {
            entries: vec![("Rent".to_string(), vec!["LANDLORD".to_string()])],
        };
        assert_eq!(table.categorize("Pay landlord llc", "x"), "Rent");
        assert_eq!(table.categorize("verizon", "x"), "x");
    }
}
