//! Status machine shared by orders and their line items.
//!
//! ```text
//! pending -> preparing -> ready -> delivered
//!    \           \          \
//!     +-----------+----------+--> canceled
//! ```
//!
//! An item's status is tracked separately from its order's; neither is
//! derived from the other.

use model::{Order, OrderStatus};

use crate::DomainError;

/// Whether `from -> to` is an edge of the status graph.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Preparing)
            | (Preparing, Ready)
            | (Ready, Delivered)
            | (Pending | Preparing | Ready, Canceled)
    )
}

/// Statuses reachable in one step from `from`.
pub fn next_statuses(from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|to| can_transition(from, *to))
        .collect()
}

/// Validates a requested status change and returns the new status.
///
/// # Errors
/// [`DomainError::InvalidTransition`] carrying both ends when the edge does
/// not exist, including same-state requests and anything out of a terminal
/// status.
pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, DomainError> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(DomainError::InvalidTransition { from, to })
    }
}

/// Fails with [`DomainError::OrderTerminal`] once the order is delivered or canceled.
pub fn ensure_open(order: &Order) -> Result<(), DomainError> {
    if order.status.is_terminal() {
        return Err(DomainError::OrderTerminal {
            id: order.id,
            status: order.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_forward_steps_are_allowed() {
        assert_eq!(transition(Pending, Preparing), Ok(Preparing));
        assert_eq!(transition(Preparing, Ready), Ok(Ready));
        assert_eq!(transition(Ready, Delivered), Ok(Delivered));
    }

    #[test]
    fn test_cancel_is_allowed_until_delivery() {
        for from in [Pending, Preparing, Ready] {
            assert_eq!(transition(from, Canceled), Ok(Canceled));
        }
        assert_eq!(
            transition(Delivered, Canceled),
            Err(DomainError::InvalidTransition {
                from: Delivered,
                to: Canceled
            })
        );
    }

    #[test]
    fn test_skipping_and_going_back_fail() {
        assert_eq!(
            transition(Pending, Delivered),
            Err(DomainError::InvalidTransition {
                from: Pending,
                to: Delivered
            })
        );
        assert!(transition(Pending, Ready).is_err());
        assert!(transition(Ready, Preparing).is_err());
        assert!(transition(Preparing, Pending).is_err());
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for to in OrderStatus::ALL {
            assert!(transition(Delivered, to).is_err());
            assert!(transition(Canceled, to).is_err());
        }
        assert!(next_statuses(Delivered).is_empty());
        assert!(next_statuses(Canceled).is_empty());
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        for status in OrderStatus::ALL {
            assert!(!can_transition(status, status));
        }
    }

    #[test]
    fn test_next_statuses_matches_table() {
        assert_eq!(next_statuses(Pending), vec![Preparing, Canceled]);
        assert_eq!(next_statuses(Preparing), vec![Ready, Canceled]);
        assert_eq!(next_statuses(Ready), vec![Delivered, Canceled]);
    }
}
