//! Escrow ledger: reservation of points balances against open auctions.
//!
//! The ledger is a pure resource-reservation primitive. A bidder's spendable
//! balance lives in the external [`BalanceAccount`]; the ledger tracks how
//! much of it is currently spoken for by standing bids, and guarantees the
//! sum of a bidder's active locks never exceeds their available balance.
//!
//! All operations on one bidder's locks are serialized through a per-bidder
//! gate, closing the check-then-act window between the balance check and the
//! commit. Each operation holds at most one gate, so no gate ordering issues
//! arise even when the caller already holds an auction-level gate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use curio_types::{AuctionId, EscrowLock, LockId, LockStatus, UserId};

use crate::error::{EngineError, EngineResult};
use crate::external::BalanceAccount;

/// Per-user escrow lock ledger.
pub struct EscrowLedger {
    balances: Arc<dyn BalanceAccount>,
    inner: RwLock<LedgerInner>,
    gates: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

#[derive(Default)]
struct LedgerInner {
    next_lock_id: LockId,
    locks: HashMap<LockId, EscrowLock>,
    /// Index of the single active lock per (auction, bidder).
    active: HashMap<(AuctionId, UserId), LockId>,
}

impl EscrowLedger {
    pub fn new(balances: Arc<dyn BalanceAccount>) -> Self {
        Self {
            balances,
            inner: RwLock::new(LedgerInner {
                next_lock_id: 1,
                ..Default::default()
            }),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Serialization gate for one bidder's ledger operations.
    fn gate(&self, bidder: UserId) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock();
        gates.entry(bidder).or_default().clone()
    }

    /// Reserve `amount` of `bidder`'s balance against `auction`.
    ///
    /// If an active lock already exists for this (auction, bidder) it is
    /// resized in one step; the old and new amounts are never counted
    /// together, and no concurrent reservation can observe a transient gap.
    pub fn reserve(&self, auction: AuctionId, bidder: UserId, amount: u64) -> EngineResult<LockId> {
        if amount == 0 {
            return Err(EngineError::InvalidAmount(0));
        }

        let gate = self.gate(bidder);
        let _held = gate.lock();

        // Everything the bidder has locked elsewhere, excluding the lock
        // being resized.
        let outstanding = {
            let inner = self.inner.read();
            inner
                .locks
                .values()
                .filter(|l| {
                    l.bidder == bidder && l.status == LockStatus::Active && l.auction != auction
                })
                .map(|l| l.amount)
                .sum::<u64>()
        };

        let available = self.balances.available(bidder);
        if amount.checked_add(outstanding).map_or(true, |t| t > available) {
            return Err(EngineError::InsufficientBalance {
                required: amount,
                available: available.saturating_sub(outstanding),
            });
        }

        let mut inner = self.inner.write();
        if let Some(&lock_id) = inner.active.get(&(auction, bidder)) {
            // Resize in place: a single write, never two holds at once.
            let lock = inner
                .locks
                .get_mut(&lock_id)
                .ok_or(EngineError::LockNotFound(lock_id))?;
            lock.amount = amount;
            return Ok(lock_id);
        }

        let lock_id = inner.next_lock_id;
        inner.next_lock_id += 1;
        inner.locks.insert(
            lock_id,
            EscrowLock {
                id: lock_id,
                auction,
                bidder,
                amount,
                status: LockStatus::Active,
            },
        );
        inner.active.insert((auction, bidder), lock_id);
        Ok(lock_id)
    }

    /// Release a lock. Idempotent: releasing an already released or captured
    /// lock is a no-op.
    pub fn release(&self, lock_id: LockId) -> EngineResult<()> {
        let bidder = {
            let inner = self.inner.read();
            inner
                .locks
                .get(&lock_id)
                .map(|l| l.bidder)
                .ok_or(EngineError::LockNotFound(lock_id))?
        };

        let gate = self.gate(bidder);
        let _held = gate.lock();

        let mut inner = self.inner.write();
        let key = match inner.locks.get_mut(&lock_id) {
            Some(lock) if lock.status == LockStatus::Active => {
                lock.status = LockStatus::Released;
                Some((lock.auction, lock.bidder))
            }
            _ => None,
        };
        if let Some(key) = key {
            inner.active.remove(&key);
        }
        Ok(())
    }

    /// Capture a lock: debit the real balance and finalize the reservation.
    ///
    /// Happens exactly once per lock; a second attempt fails with
    /// `AlreadyFinalized`. The debit runs before the status flip so a failed
    /// debit leaves the lock untouched.
    pub fn capture(&self, lock_id: LockId) -> EngineResult<u64> {
        let bidder = {
            let inner = self.inner.read();
            inner
                .locks
                .get(&lock_id)
                .map(|l| l.bidder)
                .ok_or(EngineError::LockNotFound(lock_id))?
        };

        let gate = self.gate(bidder);
        let _held = gate.lock();

        let amount = {
            let inner = self.inner.read();
            let lock = inner
                .locks
                .get(&lock_id)
                .ok_or(EngineError::LockNotFound(lock_id))?;
            if lock.status != LockStatus::Active {
                return Err(EngineError::AlreadyFinalized(lock_id));
            }
            lock.amount
        };

        self.balances.debit(bidder, amount)?;

        let mut inner = self.inner.write();
        let key = match inner.locks.get_mut(&lock_id) {
            Some(lock) => {
                lock.status = LockStatus::Captured;
                Some((lock.auction, lock.bidder))
            }
            None => None,
        };
        if let Some(key) = key {
            inner.active.remove(&key);
        }
        Ok(amount)
    }

    /// The active lock for one (auction, bidder) pair, if any.
    pub fn active_lock(&self, auction: AuctionId, bidder: UserId) -> Option<LockId> {
        self.inner.read().active.get(&(auction, bidder)).copied()
    }

    /// All active locks held against one auction.
    pub fn active_locks_for_auction(&self, auction: AuctionId) -> Vec<(LockId, UserId)> {
        let inner = self.inner.read();
        let mut locks: Vec<(LockId, UserId)> = inner
            .active
            .iter()
            .filter(|((a, _), _)| *a == auction)
            .map(|((_, bidder), lock_id)| (*lock_id, *bidder))
            .collect();
        // Deterministic release order during close and cancel.
        locks.sort_by_key(|(_, bidder)| *bidder);
        locks
    }

    /// Total amount a bidder has locked across all auctions.
    pub fn locked_total(&self, bidder: UserId) -> u64 {
        self.inner
            .read()
            .locks
            .values()
            .filter(|l| l.bidder == bidder && l.status == LockStatus::Active)
            .map(|l| l.amount)
            .sum()
    }

    /// Fetch a lock record.
    pub fn get(&self, lock_id: LockId) -> Option<EscrowLock> {
        self.inner.read().locks.get(&lock_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::InMemoryBalances;

    fn ledger_with(user: UserId, balance: u64) -> (EscrowLedger, Arc<InMemoryBalances>) {
        let balances = Arc::new(InMemoryBalances::new());
        balances.credit(user, balance);
        (EscrowLedger::new(balances.clone()), balances)
    }

    #[test]
    fn test_reserve_and_release_round_trip() {
        let (ledger, balances) = ledger_with(1, 100);

        let lock = ledger.reserve(10, 1, 60).unwrap();
        assert_eq!(ledger.locked_total(1), 60);
        // Available balance is untouched until capture.
        assert_eq!(balances.available(1), 100);

        ledger.release(lock).unwrap();
        assert_eq!(ledger.locked_total(1), 0);
        assert_eq!(balances.available(1), 100);
    }

    #[test]
    fn test_reserve_rejects_overdraft() {
        let (ledger, _) = ledger_with(1, 100);

        ledger.reserve(10, 1, 70).unwrap();
        let err = ledger.reserve(11, 1, 40).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientBalance {
                required: 40,
                available: 30
            }
        );
        assert_eq!(ledger.locked_total(1), 70);
    }

    #[test]
    fn test_resize_counts_once() {
        let (ledger, _) = ledger_with(1, 100);

        let lock = ledger.reserve(10, 1, 60).unwrap();
        // Raising the hold on the same auction must not count 60 + 90.
        let resized = ledger.reserve(10, 1, 90).unwrap();
        assert_eq!(lock, resized);
        assert_eq!(ledger.locked_total(1), 90);

        // But 90 on another auction would overdraw.
        assert!(ledger.reserve(11, 1, 20).is_err());
    }

    #[test]
    fn test_capture_debits_exactly_once() {
        let (ledger, balances) = ledger_with(1, 100);

        let lock = ledger.reserve(10, 1, 60).unwrap();
        assert_eq!(ledger.capture(lock).unwrap(), 60);
        assert_eq!(balances.available(1), 40);

        assert_eq!(
            ledger.capture(lock).unwrap_err(),
            EngineError::AlreadyFinalized(lock)
        );
        assert_eq!(balances.available(1), 40);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (ledger, _) = ledger_with(1, 100);

        let lock = ledger.reserve(10, 1, 60).unwrap();
        ledger.release(lock).unwrap();
        ledger.release(lock).unwrap();
        assert_eq!(ledger.get(lock).unwrap().status, LockStatus::Released);

        // Releasing a captured lock is also a no-op.
        let lock2 = ledger.reserve(10, 1, 30).unwrap();
        ledger.capture(lock2).unwrap();
        ledger.release(lock2).unwrap();
        assert_eq!(ledger.get(lock2).unwrap().status, LockStatus::Captured);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let (ledger, _) = ledger_with(1, 100);
        assert_eq!(
            ledger.reserve(10, 1, 0).unwrap_err(),
            EngineError::InvalidAmount(0)
        );
    }

    #[test]
    fn test_concurrent_reserves_never_overdraw() {
        let balances = Arc::new(InMemoryBalances::new());
        balances.credit(1, 100);
        let ledger = Arc::new(EscrowLedger::new(balances.clone()));

        // Many threads race to reserve 30 against distinct auctions; at most
        // three can win without exceeding the balance of 100.
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.reserve(100 + i, 1, 30).is_ok())
            })
            .collect();

        let won = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(won, 3);
        assert_eq!(ledger.locked_total(1), 90);
    }
}
