//! Auction store with conditional status transitions.
//!
//! The store is the storage layer the exactly-once close guarantee rests
//! on: status changes go through compare-and-set operations that succeed
//! for exactly one caller, so redundant sweeps and overlapping runners are
//! safe. This implementation is in-memory; a database-backed store would
//! express the same operations as conditional `UPDATE ... WHERE status`.

use std::collections::HashMap;

use parking_lot::RwLock;

use curio_types::{Auction, AuctionId, AuctionStatus, Timestamp, UserId};

use crate::error::{EngineError, EngineResult};

/// In-memory auction records.
#[derive(Default)]
pub struct AuctionStore {
    inner: RwLock<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    next_id: AuctionId,
    auctions: HashMap<AuctionId, Auction>,
}

impl AuctionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                next_id: 1,
                auctions: HashMap::new(),
            }),
        }
    }

    /// Insert a new auction, allocating its id.
    pub fn insert(&self, mut auction: Auction) -> AuctionId {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        auction.id = id;
        inner.auctions.insert(id, auction);
        id
    }

    /// Fetch an auction by id.
    pub fn get(&self, id: AuctionId) -> EngineResult<Auction> {
        self.inner
            .read()
            .auctions
            .get(&id)
            .cloned()
            .ok_or(EngineError::AuctionNotFound(id))
    }

    /// All auctions, ordered by id.
    pub fn list(&self) -> Vec<Auction> {
        let inner = self.inner.read();
        let mut auctions: Vec<Auction> = inner.auctions.values().cloned().collect();
        auctions.sort_by_key(|a| a.id);
        auctions
    }

    /// Update the visible highest bid. Caller holds the auction gate.
    pub fn update_bid(&self, id: AuctionId, amount: u64, holder: Option<UserId>) {
        let mut inner = self.inner.write();
        if let Some(auction) = inner.auctions.get_mut(&id) {
            auction.current_bid = amount;
            auction.current_bidder = holder;
        }
    }

    /// Record the winner on a closed auction.
    pub fn set_winner(&self, id: AuctionId, winner: UserId) {
        let mut inner = self.inner.write();
        if let Some(auction) = inner.auctions.get_mut(&id) {
            auction.winner = Some(winner);
        }
    }

    /// Compare-and-set `Scheduled → Active`. Returns false if another caller
    /// already activated (or the auction is past activation).
    pub fn try_activate(&self, id: AuctionId) -> bool {
        let mut inner = self.inner.write();
        match inner.auctions.get_mut(&id) {
            Some(auction) if auction.status == AuctionStatus::Scheduled => {
                auction.status = AuctionStatus::Active;
                true
            }
            _ => false,
        }
    }

    /// Compare-and-set `Active → Closed`.
    ///
    /// Returns the post-transition snapshot for the single caller that wins
    /// the transition; `None` means another runner already closed it and
    /// this caller must perform no side effects.
    pub fn try_close(&self, id: AuctionId) -> Option<Auction> {
        let mut inner = self.inner.write();
        match inner.auctions.get_mut(&id) {
            Some(auction) if auction.status == AuctionStatus::Active => {
                auction.status = AuctionStatus::Closed;
                Some(auction.clone())
            }
            _ => None,
        }
    }

    /// Compare-and-set `{Scheduled, Active} → Cancelled`.
    pub fn try_cancel(&self, id: AuctionId) -> EngineResult<Auction> {
        let mut inner = self.inner.write();
        let auction = inner
            .auctions
            .get_mut(&id)
            .ok_or(EngineError::AuctionNotFound(id))?;
        if auction.status.is_terminal() {
            return Err(EngineError::AlreadyTerminal(id));
        }
        auction.status = AuctionStatus::Cancelled;
        Ok(auction.clone())
    }

    /// Active auctions whose end time has passed.
    pub fn due_for_close(&self, now: Timestamp) -> Vec<AuctionId> {
        let inner = self.inner.read();
        let mut due: Vec<AuctionId> = inner
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active && a.end_at <= now)
            .map(|a| a.id)
            .collect();
        due.sort_unstable();
        due
    }

    /// Scheduled auctions whose start time has passed.
    pub fn due_for_activation(&self, now: Timestamp) -> Vec<AuctionId> {
        let inner = self.inner.read();
        let mut due: Vec<AuctionId> = inner
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Scheduled && a.start_at <= now)
            .map(|a| a.id)
            .collect();
        due.sort_unstable();
        due
    }
}
