//! # Table State Machine
//!
//! The only place that decides how a table's status and current sale move.
//!
//! ## Transitions
//! ```text
//! ┌──────────────────┬───────────────────┬──────────────────┬─────────────────┐
//! │ From             │ Event             │ To               │ current_sale_id │
//! ├──────────────────┼───────────────────┼──────────────────┼─────────────────┤
//! │ free             │ open-with-sale(s) │ occupied         │ s               │
//! │ free             │ open-without-sale │ occupied         │ none            │
//! │ occupied         │ request-bill      │ awaiting_payment │ unchanged       │
//! │ awaiting_payment │ close-bill        │ cleaning         │ none            │
//! │ cleaning         │ mark-clean        │ free             │ none            │
//! │ occupied         │ cancel-sale       │ free             │ none            │
//! └──────────────────┴───────────────────┴──────────────────┴─────────────────┘
//! ```
//!
//! Every other (status, event) pair is an `InvalidTransition`. Transitions
//! are computed, never applied in place: the caller persists the returned
//! [`TableState`] and only then replaces its copy of the table.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Table, TableStatus};

/// Something that happens to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "sale_id", rename_all = "kebab-case")]
pub enum TableEvent {
    /// Seat guests with an order already saved.
    OpenWithSale(String),
    /// Seat guests before anything is ordered.
    OpenWithoutSale,
    RequestBill,
    CloseBill,
    MarkClean,
    CancelSale,
}

impl TableEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TableEvent::OpenWithSale(_) => "open-with-sale",
            TableEvent::OpenWithoutSale => "open-without-sale",
            TableEvent::RequestBill => "request-bill",
            TableEvent::CloseBill => "close-bill",
            TableEvent::MarkClean => "mark-clean",
            TableEvent::CancelSale => "cancel-sale",
        }
    }

    /// Events that seat guests, and so are refused on inactive tables.
    pub fn opens_table(&self) -> bool {
        matches!(self, TableEvent::OpenWithSale(_) | TableEvent::OpenWithoutSale)
    }
}

/// The mutable part of a table: status plus the sale it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableState {
    pub status: TableStatus,
    pub current_sale_id: Option<String>,
}

impl TableState {
    pub fn of(table: &Table) -> Self {
        TableState {
            status: table.status,
            current_sale_id: table.current_sale_id.clone(),
        }
    }
}

/// Computes the state a table moves to under `event`.
///
/// ## Errors
/// - `InvalidTransition` for any pair outside the transition table, active
///   or not
/// - `TableInactive` when a legal open event targets a deactivated table
/// - `InconsistentTable` when the result would break the status / sale
///   invariant (requesting the bill of a table opened without a sale)
///
/// ## Example
/// ```rust
/// use mesa_core::table::{transition, TableEvent};
/// use mesa_core::TableStatus;
/// # use chrono::Utc;
/// # let table = mesa_core::Table {
/// #     id: "t1".into(), number: 1, name: "Mesa 1".into(), capacity: 4,
/// #     status: TableStatus::Free, location: None, is_active: true,
/// #     current_sale_id: None, created_at: Utc::now(), updated_at: Utc::now(),
/// # };
///
/// let next = transition(&table, &TableEvent::OpenWithSale("s1".into())).unwrap();
/// assert_eq!(next.status, TableStatus::Occupied);
/// assert_eq!(next.current_sale_id.as_deref(), Some("s1"));
/// ```
pub fn transition(table: &Table, event: &TableEvent) -> CoreResult<TableState> {
    let next = match (table.status, event) {
        (TableStatus::Free, TableEvent::OpenWithSale(sale_id)) => TableState {
            status: TableStatus::Occupied,
            current_sale_id: Some(sale_id.clone()),
        },
        (TableStatus::Free, TableEvent::OpenWithoutSale) => TableState {
            status: TableStatus::Occupied,
            current_sale_id: None,
        },
        (TableStatus::Occupied, TableEvent::RequestBill) => TableState {
            status: TableStatus::AwaitingPayment,
            current_sale_id: table.current_sale_id.clone(),
        },
        (TableStatus::AwaitingPayment, TableEvent::CloseBill) => TableState {
            status: TableStatus::Cleaning,
            current_sale_id: None,
        },
        (TableStatus::Cleaning, TableEvent::MarkClean) => TableState {
            status: TableStatus::Free,
            current_sale_id: None,
        },
        (TableStatus::Occupied, TableEvent::CancelSale) => TableState {
            status: TableStatus::Free,
            current_sale_id: None,
        },
        (from, event) => return Err(CoreError::invalid_transition(&table.id, from, event)),
    };

    // Only reached for a legal open, i.e. from free.
    if event.opens_table() && !table.is_active {
        return Err(CoreError::TableInactive {
            table_id: table.id.clone(),
        });
    }

    // A table seated without a sale has nothing to bill.
    Table {
        status: next.status,
        current_sale_id: next.current_sale_id.clone(),
        ..table.clone()
    }
    .check_invariant()?;

    Ok(next)
}

/// Applies `event` to an in-memory table, leaving it untouched on error.
pub fn apply(table: &mut Table, event: &TableEvent) -> CoreResult<()> {
    let next = transition(table, event)?;
    table.status = next.status;
    table.current_sale_id = next.current_sale_id;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ALL_STATUSES: [TableStatus; 4] = [
        TableStatus::Free,
        TableStatus::Occupied,
        TableStatus::AwaitingPayment,
        TableStatus::Cleaning,
    ];

    fn all_events() -> Vec<TableEvent> {
        vec![
            TableEvent::OpenWithSale("s-new".to_string()),
            TableEvent::OpenWithoutSale,
            TableEvent::RequestBill,
            TableEvent::CloseBill,
            TableEvent::MarkClean,
            TableEvent::CancelSale,
        ]
    }

    fn table_in(status: TableStatus) -> Table {
        let current_sale_id = match status {
            TableStatus::Occupied | TableStatus::AwaitingPayment => Some("s-old".to_string()),
            _ => None,
        };
        Table {
            id: "t1".to_string(),
            number: 1,
            name: "Mesa 1".to_string(),
            capacity: 4,
            status,
            location: None,
            is_active: true,
            current_sale_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn expected(status: TableStatus, event: &TableEvent) -> Option<TableState> {
        let state = |status, sale: Option<&str>| TableState {
            status,
            current_sale_id: sale.map(str::to_string),
        };
        match (status, event) {
            (TableStatus::Free, TableEvent::OpenWithSale(_)) => {
                Some(state(TableStatus::Occupied, Some("s-new")))
            }
            (TableStatus::Free, TableEvent::OpenWithoutSale) => Some(state(TableStatus::Occupied, None)),
            (TableStatus::Occupied, TableEvent::RequestBill) => {
                Some(state(TableStatus::AwaitingPayment, Some("s-old")))
            }
            (TableStatus::AwaitingPayment, TableEvent::CloseBill) => {
                Some(state(TableStatus::Cleaning, None))
            }
            (TableStatus::Cleaning, TableEvent::MarkClean) => Some(state(TableStatus::Free, None)),
            (TableStatus::Occupied, TableEvent::CancelSale) => Some(state(TableStatus::Free, None)),
            _ => None,
        }
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        for status in ALL_STATUSES {
            for event in all_events() {
                let mut table = table_in(status);
                let before = table.clone();
                let result = apply(&mut table, &event);

                match expected(status, &event) {
                    Some(state) => {
                        assert!(result.is_ok(), "{} on {} should succeed", event.name(), status);
                        assert_eq!(TableState::of(&table), state);
                        assert!(table.check_invariant().is_ok());
                    }
                    None => {
                        assert!(
                            matches!(result, Err(CoreError::InvalidTransition { .. })),
                            "{} on {} should be rejected",
                            event.name(),
                            status
                        );
                        assert_eq!(table, before);
                    }
                }
            }
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let mut table = table_in(TableStatus::Free);
        apply(&mut table, &TableEvent::OpenWithSale("s1".to_string())).unwrap();
        apply(&mut table, &TableEvent::RequestBill).unwrap();
        assert_eq!(table.current_sale_id.as_deref(), Some("s1"));
        apply(&mut table, &TableEvent::CloseBill).unwrap();
        assert_eq!(table.current_sale_id, None);
        apply(&mut table, &TableEvent::MarkClean).unwrap();
        assert_eq!(table.status, TableStatus::Free);
    }

    #[test]
    fn test_invalid_transition_reports_context() {
        let table = table_in(TableStatus::Cleaning);
        let err = transition(&table, &TableEvent::RequestBill).unwrap_err();
        match err {
            CoreError::InvalidTransition { table_id, from, event } => {
                assert_eq!(table_id, "t1");
                assert_eq!(from, TableStatus::Cleaning);
                assert_eq!(event, "request-bill");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inactive_table_cannot_open() {
        let mut table = table_in(TableStatus::Free);
        table.is_active = false;

        let err = transition(&table, &TableEvent::OpenWithoutSale).unwrap_err();
        assert!(matches!(err, CoreError::TableInactive { .. }));
        let err = transition(&table, &TableEvent::OpenWithSale("s".to_string())).unwrap_err();
        assert!(matches!(err, CoreError::TableInactive { .. }));
    }

    #[test]
    fn test_inactive_busy_table_reports_invalid_transition() {
        for status in [TableStatus::Occupied, TableStatus::AwaitingPayment, TableStatus::Cleaning] {
            let mut table = table_in(status);
            table.is_active = false;

            let err = transition(&table, &TableEvent::OpenWithoutSale).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition { from, .. } if from == status));
            let err = transition(&table, &TableEvent::OpenWithSale("s".to_string())).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_inactive_table_can_still_wind_down() {
        let mut table = table_in(TableStatus::Cleaning);
        table.is_active = false;
        assert!(transition(&table, &TableEvent::MarkClean).is_ok());
    }

    #[test]
    fn test_cannot_bill_table_without_sale() {
        let mut table = table_in(TableStatus::Free);
        apply(&mut table, &TableEvent::OpenWithoutSale).unwrap();
        assert_eq!(table.status, TableStatus::Occupied);
        assert_eq!(table.current_sale_id, None);

        let err = transition(&table, &TableEvent::RequestBill).unwrap_err();
        assert!(matches!(err, CoreError::InconsistentTable { .. }));

        // It can still be released.
        apply(&mut table, &TableEvent::CancelSale).unwrap();
        assert_eq!(table.status, TableStatus::Free);
    }

    #[test]
    fn test_event_serde_shape() {
        let json = serde_json::to_string(&TableEvent::OpenWithSale("s1".to_string())).unwrap();
        assert_eq!(json, r#"{"event":"open-with-sale","sale_id":"s1"}"#);
        let back: TableEvent = serde_json::from_str(r#"{"event":"mark-clean"}"#).unwrap();
        assert_eq!(back, TableEvent::MarkClean);
    }
}
