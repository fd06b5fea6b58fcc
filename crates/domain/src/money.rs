//! Money values as stored in `NUMERIC(10,2)` columns.
//!
//! Prices and payment amounts are checked against the column before any rule
//! sees them, so the in-memory and PostgreSQL stores hold the same values.
//! Sums use checked arithmetic and fail with [`DomainError::AmountOverflow`].

use rust_decimal::Decimal;

use crate::DomainError;

/// Fractional digits kept for money.
pub const SCALE: u32 = 2;

/// Largest value a `NUMERIC(10,2)` column holds: 99 999 999.99.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, SCALE)
}

/// `value` has at most two fractional digits, ignoring trailing zeros.
pub fn has_cent_precision(value: Decimal) -> bool {
    value.round_dp(SCALE) == value
}

/// Rejects values above [`max_amount`] in absolute terms.
pub fn ensure_storable(value: Decimal) -> Result<Decimal, DomainError> {
    if value.abs() > max_amount() {
        return Err(DomainError::AmountOverflow);
    }
    Ok(value)
}

/// Sum of `values`, or [`DomainError::AmountOverflow`] if it does not fit a `Decimal`.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Result<Decimal, DomainError> {
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or(DomainError::AmountOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cent_precision() {
        assert!(has_cent_precision(Decimal::new(1050, 2)));
        assert!(has_cent_precision(Decimal::new(10500, 3)));
        assert!(has_cent_precision(Decimal::from(7)));
        assert!(!has_cent_precision(Decimal::new(9995, 3)));
        assert!(!has_cent_precision(Decimal::new(1, 3)));
    }

    #[test]
    fn test_storable_bound() {
        assert!(ensure_storable(max_amount()).is_ok());
        assert_eq!(
            ensure_storable(max_amount() + Decimal::new(1, 2)),
            Err(DomainError::AmountOverflow)
        );
        assert_eq!(ensure_storable(Decimal::MAX), Err(DomainError::AmountOverflow));
    }

    #[test]
    fn test_checked_sum() {
        assert_eq!(checked_sum([]), Ok(Decimal::ZERO));
        assert_eq!(
            checked_sum([Decimal::new(1000, 2), Decimal::new(250, 2)]),
            Ok(Decimal::new(1250, 2))
        );
        assert_eq!(
            checked_sum([Decimal::MAX, Decimal::MAX]),
            Err(DomainError::AmountOverflow)
        );
    }
}
