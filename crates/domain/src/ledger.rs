//! Billing ledger rules.
//!
//! Settlement is never stored as an independent fact: it is always derived
//! from the order's current total and the live sum of its payments.
//! `Order::is_paid` is a projection of [`is_settled`] that callers refresh
//! whenever either side changes. The one exception is a freshly created
//! order, which starts unpaid even when its total is zero.

use model::{Order, OrderStatus, Payment};
use rust_decimal::Decimal;

use crate::{DomainError, money};

/// Result of evaluating the ledger after a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Cumulative amount paid, including the new payment.
    pub paid: Decimal,
    pub total: Decimal,
    pub settled: bool,
    /// The order was not marked paid before this payment and is now.
    pub newly_settled: bool,
}

/// An order is settled once its payments cover the total.
pub fn is_settled(total: Decimal, paid: Decimal) -> bool {
    paid >= total
}

/// Outstanding amount; zero once settled or overpaid.
pub fn balance_due(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}

pub fn total_paid(payments: &[Payment]) -> Result<Decimal, DomainError> {
    money::checked_sum(payments.iter().map(|p| p.amount))
}

/// Checks the preconditions for recording `amount` against `order`.
///
/// The amount must be positive, in whole cents and storable. Delivered
/// orders still accept payments so invoicing can be reconciled; canceled
/// orders do not.
pub fn validate_payment(order: &Order, amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO || !money::has_cent_precision(amount) {
        return Err(DomainError::InvalidAmount(amount));
    }
    money::ensure_storable(amount)?;
    if order.status == OrderStatus::Canceled {
        return Err(DomainError::OrderTerminal {
            id: order.id,
            status: order.status,
        });
    }
    Ok(())
}

/// Evaluates the ledger as if `amount` were appended to payments summing to `paid_before`.
///
/// Overpayment is accepted; only the settlement flag is gated.
pub fn apply_payment(
    order: &Order,
    paid_before: Decimal,
    amount: Decimal,
) -> Result<Settlement, DomainError> {
    validate_payment(order, amount)?;

    let paid = paid_before
        .checked_add(amount)
        .ok_or(DomainError::AmountOverflow)?;
    let settled = is_settled(order.total_amount, paid);
    Ok(Settlement {
        paid,
        total: order.total_amount,
        settled,
        newly_settled: settled && !order.is_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn order(total: Decimal, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            table_id: None,
            waiter_id: None,
            status,
            notes: String::new(),
            total_amount: total,
            payment_method: None,
            is_paid: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_exact_payment_settles() {
        let o = order(dec(2500), OrderStatus::Pending);
        let s = apply_payment(&o, Decimal::ZERO, dec(2500)).unwrap();
        assert!(s.settled);
        assert!(s.newly_settled);
        assert_eq!(s.paid, dec(2500));
    }

    #[test]
    fn test_partial_payments_settle_on_threshold() {
        let mut o = order(dec(2500), OrderStatus::Ready);
        let first = apply_payment(&o, Decimal::ZERO, dec(1000)).unwrap();
        assert!(!first.settled);
        assert!(!first.newly_settled);

        let second = apply_payment(&o, first.paid, dec(1500)).unwrap();
        assert!(second.settled);
        assert!(second.newly_settled);

        o.is_paid = true;
        let extra = apply_payment(&o, second.paid, dec(100)).unwrap();
        assert!(extra.settled);
        assert!(!extra.newly_settled);
    }

    #[test]
    fn test_overpayment_is_accepted() {
        let o = order(dec(2500), OrderStatus::Delivered);
        let s = apply_payment(&o, Decimal::ZERO, dec(4000)).unwrap();
        assert!(s.settled);
        assert_eq!(balance_due(s.total, s.paid), Decimal::ZERO);
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let o = order(dec(2500), OrderStatus::Pending);
        assert_eq!(
            apply_payment(&o, Decimal::ZERO, Decimal::ZERO),
            Err(DomainError::InvalidAmount(Decimal::ZERO))
        );
        assert!(apply_payment(&o, Decimal::ZERO, dec(-100)).is_err());
    }

    #[test]
    fn test_rejects_sub_cent_amounts() {
        let o = order(dec(1000), OrderStatus::Pending);
        // 9.995 would be stored as 10.00 and settle behind the ledger's back
        assert_eq!(
            apply_payment(&o, Decimal::ZERO, Decimal::new(9995, 3)),
            Err(DomainError::InvalidAmount(Decimal::new(9995, 3)))
        );
        assert_eq!(
            apply_payment(&o, Decimal::ZERO, Decimal::new(1, 3)),
            Err(DomainError::InvalidAmount(Decimal::new(1, 3)))
        );
        assert!(apply_payment(&o, Decimal::ZERO, Decimal::new(10000, 3)).is_ok());
    }

    #[test]
    fn test_rejects_amounts_beyond_money_column() {
        let o = order(dec(1000), OrderStatus::Pending);
        assert_eq!(
            apply_payment(&o, Decimal::ZERO, Decimal::MAX),
            Err(DomainError::AmountOverflow)
        );
        assert!(apply_payment(&o, Decimal::ZERO, money::max_amount()).is_ok());
        assert_eq!(
            apply_payment(&o, Decimal::MAX, money::max_amount()),
            Err(DomainError::AmountOverflow)
        );
    }

    #[test]
    fn test_rejects_canceled_orders() {
        let o = order(dec(2500), OrderStatus::Canceled);
        assert_eq!(
            apply_payment(&o, Decimal::ZERO, dec(2500)),
            Err(DomainError::OrderTerminal {
                id: o.id,
                status: OrderStatus::Canceled
            })
        );
    }

    #[test]
    fn test_settlement_follows_current_total() {
        let paid = dec(2500);
        assert!(is_settled(dec(2500), paid));
        // items added after payment raise the total above what was paid
        assert!(!is_settled(dec(3000), paid));
        assert_eq!(balance_due(dec(3000), paid), dec(500));
    }

    #[test]
    fn test_zero_total_is_covered_without_payments() {
        assert!(is_settled(Decimal::ZERO, Decimal::ZERO));
        assert!(!is_settled(dec(1), Decimal::ZERO));
        assert_eq!(total_paid(&[]), Ok(Decimal::ZERO));
    }
}
