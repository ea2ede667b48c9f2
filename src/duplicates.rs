use crate::models::{CandidateTransaction, Expense};

const AMOUNT_EPSILON: f64 = 0.01;

fn matches_existing(candidate: &CandidateTransaction, existing: &[Expense]) -> bool {
    existing
        .iter()
        .any(|e| e.date == candidate.date && (e.amount - candidate.amount).abs() < AMOUNT_EPSILON)
}

/// Mark candidates whose (date, amount) already exists as a stored expense.
/// Duplicates are always deselected; other rows keep the parser's selection.
pub fn flag_duplicates(
    candidates: Vec<CandidateTransaction>,
    existing: &[Expense],
) -> Vec<CandidateTransaction> {
    candidates
        .into_iter()
        .map(|mut c| {
            c.is_duplicate = matches_existing(&c, existing);
            c.selected = c.selected && !c.is_duplicate;
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentType;

    fn candidate(date: &str, amount: f64, selected: bool) -> CandidateTransaction {
        CandidateTransaction {
            date: date.to_string(),
            vendor: "ACME".to_string(),
            amount,
            category: "Supplies".to_string(),
            payment_type: PaymentType::Cc,
            description: "Card x0000".to_string(),
            reportable: true,
            selected,
            is_duplicate: false,
        }
    }

    fn expense(date: &str, amount: f64) -> Expense {
        Expense {
            id: "e1".to_string(),
            date: date.to_string(),
            vendor_id: None,
            category: "COGS".to_string(),
            amount,
            payment_type: PaymentType::Check,
            reportable: None,
            description: String::new(),
        }
    }

    #[test]
    fn test_same_date_close_amount_is_duplicate() {
        let out = flag_duplicates(
            vec![candidate("2025-01-10", 42.50, true)],
            &[expense("2025-01-10", 42.505)],
        );
        assert!(out[0].is_duplicate);
        assert!(!out[0].selected);
    }

    #[test]
    fn test_amount_outside_epsilon_is_not_duplicate() {
        let out = flag_duplicates(
            vec![candidate("2025-01-10", 42.50, true)],
            &[expense("2025-01-10", 42.52)],
        );
        assert!(!out[0].is_duplicate);
        assert!(out[0].selected);
    }

    #[test]
    fn test_different_date_is_not_duplicate() {
        let out = flag_duplicates(
            vec![candidate("2025-01-11", 42.50, true)],
            &[expense("2025-01-10", 42.50)],
        );
        assert!(!out[0].is_duplicate);
    }

    #[test]
    fn test_parser_deselection_survives() {
        let out = flag_duplicates(vec![candidate("2025-01-11", 9.0, false)], &[]);
        assert!(!out[0].is_duplicate);
        assert!(!out[0].selected);
    }

    #[test]
    fn test_vendor_is_ignored_in_signature() {
        // Distinct vendors on the same day with the same amount still collide.
        let mut c = candidate("2025-01-10", 20.0, true);
        c.vendor = "SOMEONE ELSE".to_string();
        let out = flag_duplicates(vec![c], &[expense("2025-01-10", 20.0)]);
        assert!(out[0].is_duplicate);
    }
}
