//! RPC-compatible types for the auction server.
//!
//! These types are JSON-serializable versions of the core marketplace types.

use curio_types::{Auction, AuctionStatus, AutoBidCeiling, ClosedAuction, SaleOutcome};
use serde::{Deserialize, Serialize};

/// Parameters for listing an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionParams {
    pub item: u64,
    pub seller: u64,
    pub starting_price: u64,
    pub start_at: u64,
    pub end_at: u64,
    #[serde(default)]
    pub featured: bool,
}

/// Parameters for submitting an auto-bid ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCeilingParams {
    pub auction_id: u64,
    pub bidder: u64,
    pub max_amount: u64,
}

/// The visible bidding state returned after a ceiling submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidQuoteRpc {
    pub highest_bid: u64,
    pub highest_bidder: Option<u64>,
}

/// Auction record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub id: u64,
    pub item: u64,
    pub seller: u64,
    pub start_at: u64,
    pub end_at: u64,
    pub status: String,
    pub starting_price: u64,
    pub current_bid: u64,
    pub current_bidder: Option<u64>,
    pub winner: Option<u64>,
    pub featured: bool,
}

impl From<&Auction> for AuctionRpc {
    fn from(a: &Auction) -> Self {
        Self {
            id: a.id,
            item: a.item,
            seller: a.seller,
            start_at: a.start_at,
            end_at: a.end_at,
            status: match a.status {
                AuctionStatus::Scheduled => "scheduled",
                AuctionStatus::Active => "active",
                AuctionStatus::Closed => "closed",
                AuctionStatus::Cancelled => "cancelled",
            }
            .to_string(),
            starting_price: a.starting_price,
            current_bid: a.current_bid,
            current_bidder: a.current_bidder,
            winner: a.winner,
            featured: a.featured,
        }
    }
}

/// Ceiling record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeilingRpc {
    pub auction: u64,
    pub bidder: u64,
    pub max_amount: u64,
    pub active: bool,
    pub registered_at: u64,
}

impl From<&AutoBidCeiling> for CeilingRpc {
    fn from(c: &AutoBidCeiling) -> Self {
        Self {
            auction: c.auction,
            bidder: c.bidder,
            max_amount: c.max_amount,
            active: c.active,
            registered_at: c.registered_at,
        }
    }
}

/// Close summary for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedAuctionRpc {
    pub auction: u64,
    /// "sold" or "unsold"
    pub outcome: String,
    pub winner: Option<u64>,
    pub price: Option<u64>,
}

impl From<&ClosedAuction> for ClosedAuctionRpc {
    fn from(c: &ClosedAuction) -> Self {
        match c.outcome {
            SaleOutcome::Sold { winner, price } => Self {
                auction: c.auction,
                outcome: "sold".to_string(),
                winner: Some(winner),
                price: Some(price),
            },
            SaleOutcome::Unsold => Self {
                auction: c.auction,
                outcome: "unsold".to_string(),
                winner: None,
                price: None,
            },
        }
    }
}

/// Balance summary for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRpc {
    pub available: u64,
    pub locked: u64,
}
