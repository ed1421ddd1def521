//! Fixed-point conversion between display amounts and ledger integers,
//! and the input validation that runs before any cache or network access.

/// Multiplier used by the markets' fungible assets (8 decimals).
pub const AMOUNT_MULTIPLIER: f64 = 100_000_000.0;

/// Largest amount a user may enter in a single operation.
pub const MAX_AMOUNT: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Amount is not a finite number: {0}")]
    NotFinite(f64),
    #[error("Amount must be positive: {0}")]
    NotPositive(f64),
    #[error("Amount too large: {amount} > {max}")]
    TooLarge { amount: f64, max: f64 },
    #[error("Missing pool data for calculation")]
    MissingPoolContext,
}

/// Human amount to the ledger's integer representation (floored).
pub fn to_contract_amount(amount: f64) -> u64 {
    to_contract_amount_with(amount, AMOUNT_MULTIPLIER)
}

pub fn to_contract_amount_with(amount: f64, multiplier: f64) -> u64 {
    // `as` saturates: negatives and NaN become 0, overflow becomes u64::MAX
    (amount * multiplier).floor() as u64
}

/// Ledger integer (as reported by the node) back to display units.
pub fn from_contract_amount(amount: f64) -> f64 {
    from_contract_amount_with(amount, AMOUNT_MULTIPLIER)
}

pub fn from_contract_amount_with(amount: f64, multiplier: f64) -> f64 {
    amount / multiplier
}

/// Finite, strictly positive and not above `max`.
pub fn validate_amount(amount: f64, max: f64) -> Result<(), ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NotFinite(amount));
    }
    if amount <= 0.0 {
        return Err(ValidationError::NotPositive(amount));
    }
    if amount > max {
        return Err(ValidationError::TooLarge { amount, max });
    }
    Ok(())
}

pub fn validate_calculation_inputs(
    amount: f64,
    pool_stats_id: &str,
    pool_id: &str,
    max: f64,
) -> Result<(), ValidationError> {
    validate_amount(amount, max)?;
    if pool_stats_id.is_empty() || pool_id.is_empty() {
        return Err(ValidationError::MissingPoolContext);
    }
    Ok(())
}

/// `0x1234abcd...5678ef`-style abbreviation used in success notifications.
pub fn shorten_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 14 {
        return hash.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_tolerance() {
        for x in [1.0, 0.000_000_01, 1_000_000.0, 10.0, 123.456_789_01] {
            let back = from_contract_amount(to_contract_amount(x) as f64);
            assert!(
                (back - x).abs() <= 1e-8 + x * 1e-12,
                "round trip of {} gave {}",
                x,
                back
            );
        }
    }

    #[test]
    fn test_to_contract_amount_floors() {
        assert_eq!(to_contract_amount(10.0), 1_000_000_000);
        assert_eq!(to_contract_amount(0.000_000_019), 1);
        assert_eq!(to_contract_amount(-1.0), 0);
        assert_eq!(to_contract_amount(f64::NAN), 0);
    }

    #[test]
    fn test_validation_rejects_bad_amounts() {
        assert_eq!(
            validate_amount(f64::INFINITY, MAX_AMOUNT),
            Err(ValidationError::NotFinite(f64::INFINITY))
        );
        assert!(matches!(
            validate_amount(f64::NAN, MAX_AMOUNT),
            Err(ValidationError::NotFinite(_))
        ));
        assert_eq!(
            validate_amount(0.0, MAX_AMOUNT),
            Err(ValidationError::NotPositive(0.0))
        );
        assert_eq!(
            validate_amount(-3.0, MAX_AMOUNT),
            Err(ValidationError::NotPositive(-3.0))
        );
        assert!(matches!(
            validate_amount(MAX_AMOUNT + 1.0, MAX_AMOUNT),
            Err(ValidationError::TooLarge { .. })
        ));
        assert!(validate_amount(MAX_AMOUNT, MAX_AMOUNT).is_ok());
    }

    #[test]
    fn test_calculation_inputs_need_pool_context() {
        assert_eq!(
            validate_calculation_inputs(1.0, "", "0xpool", MAX_AMOUNT),
            Err(ValidationError::MissingPoolContext)
        );
        assert_eq!(
            validate_calculation_inputs(1.0, "0xstate", "", MAX_AMOUNT),
            Err(ValidationError::MissingPoolContext)
        );
        assert!(validate_calculation_inputs(1.0, "0xstate", "0xpool", MAX_AMOUNT).is_ok());
    }

    #[test]
    fn test_shorten_hash() {
        assert_eq!(
            shorten_hash("0x1234567890abcdef1234567890abcdef"),
            "0x123456...abcdef"
        );
        assert_eq!(shorten_hash("0xabc"), "0xabc");
    }
}
