//! # Notifier
//!
//! Fire-and-forget user notices ("Pedido criado para Mesa 3"). A notifier
//! has no way to report failure, so it can never fail the operation that
//! triggered it.

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Failure,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => info!(target: "mesa::notice", "{message}"),
            NoticeKind::Failure => warn!(target: "mesa::notice", "{message}"),
        }
    }
}

/// Discards notices.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _kind: NoticeKind, _message: &str) {}
}

/// Success notice shown after an order is saved.
pub fn order_created_message(table_number: i64) -> String {
    format!("Pedido criado para Mesa {table_number}")
}
