//! Derived numeric features and the binary default flag.
//!
//! Each derivation is independent: it runs only when its source columns are
//! present, and a value that cannot be parsed leaves the derived cell missing
//! for that row instead of aborting the pass. The training pipeline later
//! checks that every canonical field derived cleanly and aborts with a data
//! error if not.

use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, Record, RecordSet};

/// Derived column names.
pub const PAYMENT_TO_INCOME: &str = "payment_to_income";
pub const LOAN_TO_INCOME: &str = "loan_to_income";
pub const TERM_NUM: &str = "term_num";
pub const INT_RATE_NUM: &str = "int_rate_num";
pub const RISK_FLAG: &str = "risk_flag";

/// Loan statuses that count as a default event, lowercased.
const DEFAULT_STATUSES: [&str; 2] = ["default", "charged off"];

/// Extract the first run of digits from a term string: "36 months" -> 36.0.
pub fn parse_term(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().ok()
}

/// Strip a percent sign and parse the remainder: "13.5%" -> 13.5.
pub fn parse_rate(text: &str) -> Option<f64> {
    text.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

/// 1 for a defaulted or charged-off status (any casing), 0 otherwise.
pub fn status_to_flag(text: &str) -> f64 {
    let lowered = text.trim().to_lowercase();
    if DEFAULT_STATUSES.contains(&lowered.as_str()) {
        1.0
    } else {
        0.0
    }
}

fn num_of(row: &Record, field: &str) -> Option<f64> {
    row.get(field).and_then(FieldValue::as_num)
}

/// Compute the derived numeric columns over the whole set. Source columns
/// that are absent from the set skip their derivation entirely.
pub fn derive_features(set: &mut RecordSet) {
    let has_installment = set.has_column("installment");
    let has_annual_inc = set.has_column("annual_inc");
    let has_loan_amnt = set.has_column("loan_amnt");
    let has_term = set.has_column("term");
    let has_int_rate = set.has_column("int_rate");

    if has_installment && has_annual_inc {
        set.add_column(PAYMENT_TO_INCOME);
    }
    if has_loan_amnt && has_annual_inc {
        set.add_column(LOAN_TO_INCOME);
    }
    if has_term {
        set.add_column(TERM_NUM);
    }
    if has_int_rate {
        set.add_column(INT_RATE_NUM);
    }

    for row in &mut set.rows {
        if has_installment && has_annual_inc {
            let derived = match (num_of(row, "installment"), num_of(row, "annual_inc")) {
                (Some(installment), Some(annual_inc)) => {
                    FieldValue::Num(installment / (annual_inc / 12.0 + 1.0))
                }
                _ => FieldValue::Missing,
            };
            row.insert(PAYMENT_TO_INCOME.to_string(), derived);
        }

        if has_loan_amnt && has_annual_inc {
            let derived = match (num_of(row, "loan_amnt"), num_of(row, "annual_inc")) {
                (Some(loan_amnt), Some(annual_inc)) => {
                    FieldValue::Num(loan_amnt / (annual_inc + 1.0))
                }
                _ => FieldValue::Missing,
            };
            row.insert(LOAN_TO_INCOME.to_string(), derived);
        }

        if has_term {
            let derived = row
                .get("term")
                .map(FieldValue::coerce_text)
                .and_then(|t| parse_term(&t))
                .map(FieldValue::Num)
                .unwrap_or(FieldValue::Missing);
            row.insert(TERM_NUM.to_string(), derived);
        }

        if has_int_rate {
            let derived = row
                .get("int_rate")
                .map(FieldValue::coerce_text)
                .and_then(|t| parse_rate(&t))
                .map(FieldValue::Num)
                .unwrap_or(FieldValue::Missing);
            row.insert(INT_RATE_NUM.to_string(), derived);
        }
    }
}

/// Derive the supervised target from the raw status column. Mandatory on the
/// training path: a dataset with no status column cannot be labeled.
pub fn derive_risk_flag(set: &mut RecordSet) -> RiskResult<()> {
    if !set.has_column("loan_status") {
        return Err(RiskError::data(
            "loan_status",
            "dataset must contain a derivable status field",
        ));
    }

    set.add_column(RISK_FLAG);
    for row in &mut set.rows {
        let flag = row
            .get("loan_status")
            .map(FieldValue::coerce_text)
            .map(|s| status_to_flag(&s))
            .unwrap_or(0.0);
        row.insert(RISK_FLAG.to_string(), FieldValue::Num(flag));
    }
    Ok(())
}
