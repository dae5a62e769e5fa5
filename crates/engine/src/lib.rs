//! Auction lifecycle and proxy-bid resolution engine with points escrow.
//!
//! This crate implements the marketplace's bidding core:
//!
//! - Escrow ledger reserving points against standing bids
//! - Auto-bid ceiling registry (proxy bids)
//! - Proxy-bid resolution with increment and tie-break rules
//! - Auction state machine with exactly-once timed close
//! - Closing scheduler sweep loop
//!
//! # Architecture
//!
//! - `ledger`: per-bidder escrow reservations (reserve, release, capture)
//! - `registry`: auto-bid ceilings per (auction, bidder)
//! - `resolver`: pure proxy-bid resolution
//! - `store`: auction records with compare-and-set status transitions
//! - `engine`: the state machine tying the above together
//! - `scheduler`: the timed sweep driving activation and close
//! - `external`: collaborator traits (balances, items, notifications)
//! - `error`: error types
//!
//! # Example
//!
//! ```ignore
//! use curio_engine::{AuctionEngine, CreateAuction};
//!
//! let engine = AuctionEngine::new(config, balances, items, notifier);
//! let id = engine.create_auction(CreateAuction { ... }, now)?;
//! let quote = engine.submit_ceiling(id, bidder, 100, now)?;
//! let closed = engine.close_due(now);
//! ```

pub mod engine;
pub mod error;
pub mod external;
pub mod ledger;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod store;

pub use engine::{AuctionEngine, BalanceSummary, BidQuote, CreateAuction};
pub use error::{EngineError, EngineResult};
pub use external::{
    BalanceAccount, InMemoryBalances, InMemoryItems, InMemoryWorld, ItemRegistry, LogEmitter,
    NotificationEmitter, RecordingEmitter,
};
pub use ledger::EscrowLedger;
pub use registry::CeilingRegistry;
pub use resolver::{resolve, Resolution};
pub use scheduler::{unix_now, Sweeper, SweeperConfig};
pub use store::AuctionStore;
