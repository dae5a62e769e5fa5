//! Collaborator interfaces consumed by the engine.
//!
//! The engine treats spendable balances, item ownership, and notification
//! delivery as external systems reached through these traits. In-memory
//! implementations are provided for the dev server and tests; production
//! deployments plug real backends in behind the same seams.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use curio_types::{AuctionEvent, ItemId, UserId};

use crate::error::{EngineError, EngineResult};

/// Source of truth for a user's spendable points balance.
///
/// The engine only reads `available` and performs the final `debit` at
/// capture time; locked amounts are tracked by the ledger, not here.
pub trait BalanceAccount: Send + Sync {
    /// Spendable balance, exclusive of escrow locks.
    fn available(&self, user: UserId) -> u64;

    /// Debit the balance. Fails if the balance cannot cover `amount`.
    fn debit(&self, user: UserId, amount: u64) -> EngineResult<()>;
}

/// Ownership registry for collectible items.
pub trait ItemRegistry: Send + Sync {
    /// Transfer ownership of `item` from the seller to the winner.
    fn transfer_ownership(&self, item: ItemId, from: UserId, to: UserId);
}

/// Sink for the engine's logical events (outbid, won, closed).
///
/// Invoked only after the engine's own state transition has committed and
/// its locks are released; implementations must not block on delivery.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, event: AuctionEvent);
}

/// In-memory points balances for the dev server and tests.
#[derive(Default)]
pub struct InMemoryBalances {
    balances: RwLock<HashMap<UserId, u64>>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit points to a user, returning the new balance. Saturates at
    /// `u64::MAX` instead of overflowing.
    pub fn credit(&self, user: UserId, amount: u64) -> u64 {
        let mut balances = self.balances.write();
        let balance = balances.entry(user).or_insert(0);
        *balance = balance.saturating_add(amount);
        *balance
    }
}

impl BalanceAccount for InMemoryBalances {
    fn available(&self, user: UserId) -> u64 {
        self.balances.read().get(&user).copied().unwrap_or(0)
    }

    fn debit(&self, user: UserId, amount: u64) -> EngineResult<()> {
        let mut balances = self.balances.write();
        let balance = balances.entry(user).or_insert(0);
        if *balance < amount {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }
}

/// In-memory item ownership registry.
#[derive(Default)]
pub struct InMemoryItems {
    owners: RwLock<HashMap<ItemId, UserId>>,
}

impl InMemoryItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, item: ItemId, owner: UserId) {
        self.owners.write().insert(item, owner);
    }

    pub fn owner(&self, item: ItemId) -> Option<UserId> {
        self.owners.read().get(&item).copied()
    }
}

impl ItemRegistry for InMemoryItems {
    fn transfer_ownership(&self, item: ItemId, _from: UserId, to: UserId) {
        self.owners.write().insert(item, to);
    }
}

/// Emitter that logs events through `tracing`.
#[derive(Default)]
pub struct LogEmitter;

impl NotificationEmitter for LogEmitter {
    fn emit(&self, event: AuctionEvent) {
        info!(?event, "auction event");
    }
}

/// Emitter that records events for inspection in tests.
#[derive(Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<AuctionEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted so far, in emission order.
    pub fn events(&self) -> Vec<AuctionEvent> {
        self.events.lock().clone()
    }
}

impl NotificationEmitter for RecordingEmitter {
    fn emit(&self, event: AuctionEvent) {
        self.events.lock().push(event);
    }
}

/// Convenience bundle of in-memory collaborators.
pub struct InMemoryWorld {
    pub balances: Arc<InMemoryBalances>,
    pub items: Arc<InMemoryItems>,
    pub emitter: Arc<RecordingEmitter>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(InMemoryBalances::new()),
            items: Arc::new(InMemoryItems::new()),
            emitter: Arc::new(RecordingEmitter::new()),
        }
    }
}

impl Default for InMemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let balances = InMemoryBalances::new();
        assert_eq!(balances.available(1), 0);

        balances.credit(1, 100);
        assert_eq!(balances.available(1), 100);

        balances.debit(1, 60).unwrap();
        assert_eq!(balances.available(1), 40);

        let err = balances.debit(1, 50).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                required: 50,
                available: 40
            }
        );
    }

    #[test]
    fn test_credit_saturates_instead_of_overflowing() {
        let balances = InMemoryBalances::new();
        balances.credit(1, u64::MAX);
        assert_eq!(balances.credit(1, u64::MAX), u64::MAX);
        assert_eq!(balances.available(1), u64::MAX);
    }

    #[test]
    fn test_item_transfer() {
        let items = InMemoryItems::new();
        items.set_owner(7, 1);
        items.transfer_ownership(7, 1, 2);
        assert_eq!(items.owner(7), Some(2));
    }
}
