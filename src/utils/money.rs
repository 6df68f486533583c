use rust_decimal::Decimal;

use crate::{error::AppError, models::wallet::MAX_AMOUNT};

/// Checks a client-supplied rupee amount: positive, at most paise precision
/// and no larger than a ledger column can store.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "Amount cannot exceed {}",
            format_inr(MAX_AMOUNT)
        )));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::Validation(
            "Amount can have at most two decimal places".into(),
        ));
    }
    Ok(amount.round_dp(2))
}

pub fn format_inr(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}
