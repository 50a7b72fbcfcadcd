//! Single-slot tracking of the one in-flight tool operation

use crate::error::{GrabError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Metadata,
    Download,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => f.write_str("metadata fetch"),
            Self::Download => f.write_str("download"),
        }
    }
}

struct Current {
    id: u64,
    kind: OperationKind,
    token: CancellationToken,
}

#[derive(Default)]
struct SlotState {
    current: Option<Current>,
    next_id: u64,
}

/// Holds at most one outstanding operation.
///
/// Starting a second one while the first is running is rejected with
/// [`GrabError::Busy`]; this covers a fetch and a download racing too.
#[derive(Clone, Default)]
pub struct OperationSlot {
    state: Arc<Mutex<SlotState>>,
}

impl OperationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for a new operation
    pub fn begin(&self, kind: OperationKind) -> Result<OperationGuard> {
        let mut state = self.state.lock();
        if let Some(current) = &state.current {
            return Err(GrabError::Busy(current.kind.to_string()));
        }
        state.next_id += 1;
        let id = state.next_id;
        let token = CancellationToken::new();
        state.current = Some(Current {
            id,
            kind,
            token: token.clone(),
        });
        tracing::debug!(id, %kind, "operation started");
        Ok(OperationGuard {
            slot: self.clone(),
            id,
            kind,
            token,
        })
    }

    /// Request cancellation of whatever is running; false when idle
    pub fn cancel(&self) -> bool {
        let state = self.state.lock();
        match &state.current {
            Some(current) => {
                tracing::info!(kind = %current.kind, "cancellation requested");
                current.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn current_kind(&self) -> Option<OperationKind> {
        self.state.lock().current.as_ref().map(|c| c.kind)
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().current.is_some()
    }
}

/// Ownership of the slot; dropping it frees the slot
pub struct OperationGuard {
    slot: OperationSlot,
    id: u64,
    kind: OperationKind,
    token: CancellationToken,
}

impl OperationGuard {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        // Only clear our own entry
        if state.current.as_ref().is_some_and(|c| c.id == self.id) {
            state.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_busy() {
        let slot = OperationSlot::new();
        let guard = slot.begin(OperationKind::Metadata).unwrap();
        let err = slot.begin(OperationKind::Download).err().unwrap();
        assert!(matches!(err, GrabError::Busy(ref k) if k == "metadata fetch"));
        assert_eq!(slot.current_kind(), Some(OperationKind::Metadata));
        drop(guard);
        assert!(!slot.is_busy());
        assert!(slot.begin(OperationKind::Download).is_ok());
    }

    #[test]
    fn test_cancel_reaches_current_token() {
        let slot = OperationSlot::new();
        assert!(!slot.cancel());
        let guard = slot.begin(OperationKind::Download).unwrap();
        let token = guard.token();
        assert!(!token.is_cancelled());
        assert!(slot.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_each_operation_gets_fresh_token() {
        let slot = OperationSlot::new();
        let first = slot.begin(OperationKind::Download).unwrap();
        slot.cancel();
        let old = first.token();
        drop(first);
        let second = slot.begin(OperationKind::Download).unwrap();
        assert!(old.is_cancelled());
        assert!(!second.token().is_cancelled());
    }
}
