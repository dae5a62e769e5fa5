//! Core type definitions for the curio auction marketplace.
//!
//! This crate provides the shared data structures used across the auction
//! engine, RPC server, and CLI: auction records, auto-bid ceilings, escrow
//! locks, and the logical events the engine emits.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

// =========================
// IDENTIFIERS
// =========================

/// Auction identifier, allocated by the auction store.
pub type AuctionId = u64;

/// User identifier (bidders and sellers).
pub type UserId = u64;

/// Collectible item identifier.
pub type ItemId = u64;

/// Escrow lock identifier, allocated by the ledger.
pub type LockId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

// =========================
// AUCTIONS
// =========================

/// Lifecycle status of an auction.
///
/// Transitions are monotonic: `Scheduled → Active → {Closed, Cancelled}`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AuctionStatus {
    /// Created but not yet open for bidding.
    Scheduled,
    /// Open for bidding.
    Active,
    /// Ended at `end_at`; ownership and currency settled.
    Closed,
    /// Withdrawn before settlement; all escrow released.
    Cancelled,
}

impl AuctionStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Closed | AuctionStatus::Cancelled)
    }
}

/// One listing under timed, proxy-bid sale.
///
/// While `Active`, `current_bid` is non-decreasing and only the engine
/// mutates the record. Once terminal the record is immutable.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    /// Item under sale, exclusively owned by the auction for its duration.
    pub item: ItemId,
    pub seller: UserId,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub status: AuctionStatus,
    /// Price the bidding starts from.
    pub starting_price: u64,
    /// Current visible highest bid; equals `starting_price` until outbid.
    pub current_bid: u64,
    /// Holder of the current visible highest bid.
    pub current_bidder: Option<UserId>,
    /// Winner, set exactly once when the auction closes with a sale.
    pub winner: Option<UserId>,
    /// Display hint only; irrelevant to engine logic.
    pub featured: bool,
}

impl Auction {
    /// Whether the auction accepts bids right now.
    pub fn is_active(&self) -> bool {
        self.status == AuctionStatus::Active
    }
}

// =========================
// AUTO-BID CEILINGS
// =========================

/// A bidder's private maximum willing amount for one auction (proxy bid).
///
/// Unique per `(auction, bidder)`. Ties between equal ceilings resolve in
/// favor of the earlier registration; `sequence` disambiguates ceilings
/// registered within the same second.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AutoBidCeiling {
    pub auction: AuctionId,
    pub bidder: UserId,
    pub max_amount: u64,
    pub active: bool,
    /// First registration time; preserved across raises.
    pub registered_at: Timestamp,
    /// Monotonic registration order, assigned by the registry.
    pub sequence: u64,
}

// =========================
// ESCROW
// =========================

/// Status of an escrow lock.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum LockStatus {
    /// Counted against the bidder's spendable balance.
    Active,
    /// No longer held; the reservation was refunded or superseded.
    Released,
    /// Finalized into a real balance debit at auction close.
    Captured,
}

/// A reservation of a bidder's points balance against one auction.
///
/// At most one `Active` lock exists per `(auction, bidder)`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EscrowLock {
    pub id: LockId,
    pub auction: AuctionId,
    pub bidder: UserId,
    pub amount: u64,
    pub status: LockStatus,
}

// =========================
// OUTCOMES & EVENTS
// =========================

/// How a closed auction ended.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum SaleOutcome {
    /// The highest bidder's lock was captured and the item transferred.
    Sold { winner: UserId, price: u64 },
    /// No bids were standing; the auction closed without a sale.
    Unsold,
}

/// Summary of one close transition, returned by the sweep for logging.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ClosedAuction {
    pub auction: AuctionId,
    pub outcome: SaleOutcome,
}

/// Logical events emitted by the engine after a state change commits.
///
/// Delivery transport (sockets, webhooks) is out of scope; the emitter
/// trait in the engine crate is the boundary.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionEvent {
    /// A new visible highest bid was established.
    NewHighBid {
        auction: AuctionId,
        bidder: UserId,
        amount: u64,
    },
    /// The previous highest bidder lost the lead.
    Outbid {
        auction: AuctionId,
        bidder: UserId,
        amount: u64,
    },
    /// The auction reached its end time and settled.
    AuctionClosed {
        auction: AuctionId,
        outcome: SaleOutcome,
    },
    /// The auction was withdrawn; all escrow was released.
    AuctionCancelled { auction: AuctionId, reason: String },
}

// =========================
// CONFIGURATION
// =========================

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum increment the visible bid rises above the second-highest
    /// ceiling during proxy resolution.
    pub bid_step: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { bid_step: 5 }
    }
}
