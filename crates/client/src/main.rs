//! CLI for the curio auction marketplace.
//!
//! This binary provides commands for:
//! - Listing items for auction
//! - Submitting and withdrawing auto-bid ceilings
//! - Querying auction status and balances
//! - Admin actions (crediting points, manual sweeps)

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Parser)]
#[command(name = "curio-cli")]
#[command(about = "CLI for the curio auction marketplace")]
struct Cli {
    /// Auction server RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9955")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List an item for auction
    Create {
        /// Item ID to list
        #[arg(long)]
        item: u64,

        /// Seller user ID
        #[arg(long)]
        seller: u64,

        /// Starting price
        #[arg(long, default_value = "0")]
        starting_price: u64,

        /// Start time (unix timestamp)
        #[arg(long)]
        start_at: u64,

        /// End time (unix timestamp)
        #[arg(long)]
        end_at: u64,

        /// Mark the listing as featured
        #[arg(long)]
        featured: bool,
    },

    /// Submit or raise an auto-bid ceiling
    Bid {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,

        /// Bidder user ID
        #[arg(long)]
        bidder: u64,

        /// Maximum willing amount (proxy bid)
        #[arg(long)]
        max: u64,
    },

    /// Withdraw an auto-bid ceiling
    Withdraw {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,

        /// Bidder user ID
        #[arg(long)]
        bidder: u64,
    },

    /// Cancel an auction
    Cancel {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,

        /// Reason recorded on the cancellation event
        #[arg(long, default_value = "cancelled by operator")]
        reason: String,
    },

    /// Show one auction
    Status {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,
    },

    /// List all auctions
    List,

    /// Show a user's balance (available and locked)
    Balance {
        /// User ID
        #[arg(long)]
        user: u64,
    },

    /// Credit points to a user (dev backend)
    Credit {
        /// User ID
        #[arg(long)]
        user: u64,

        /// Amount of points
        #[arg(long)]
        amount: u64,
    },

    /// Trigger a closing sweep immediately
    Sweep,
}

#[derive(Debug, Serialize, Deserialize)]
struct BidQuoteRpc {
    highest_bid: u64,
    highest_bidder: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuctionRpc {
    id: u64,
    item: u64,
    seller: u64,
    start_at: u64,
    end_at: u64,
    status: String,
    starting_price: u64,
    current_bid: u64,
    current_bidder: Option<u64>,
    winner: Option<u64>,
    featured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClosedAuctionRpc {
    auction: u64,
    outcome: String,
    winner: Option<u64>,
    price: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BalanceRpc {
    available: u64,
    locked: u64,
}

fn print_auction(a: &AuctionRpc) {
    let bidder = a
        .current_bidder
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "#{} item {} [{}] bid {} (bidder {}) ends {}",
        a.id, a.item, a.status, a.current_bid, bidder, a.end_at
    );
    if let Some(winner) = a.winner {
        println!("  won by {}", winner);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client: HttpClient = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::Create {
            item,
            seller,
            starting_price,
            start_at,
            end_at,
            featured,
        } => {
            let params = json!({
                "item": item,
                "seller": seller,
                "starting_price": starting_price,
                "start_at": start_at,
                "end_at": end_at,
                "featured": featured,
            });
            let auction_id: u64 = client.request("auction_create", rpc_params![params]).await?;
            println!("Created auction {}", auction_id);
        }

        Commands::Bid {
            auction_id,
            bidder,
            max,
        } => {
            let params = json!({
                "auction_id": auction_id,
                "bidder": bidder,
                "max_amount": max,
            });
            let quote: BidQuoteRpc = client
                .request("auction_submitCeiling", rpc_params![params])
                .await?;
            match quote.highest_bidder {
                Some(holder) => println!(
                    "Highest bid is now {} held by {}",
                    quote.highest_bid, holder
                ),
                None => println!("Highest bid unchanged at {}", quote.highest_bid),
            }
        }

        Commands::Withdraw { auction_id, bidder } => {
            let withdrawn: bool = client
                .request("auction_withdrawCeiling", rpc_params![auction_id, bidder])
                .await?;
            if withdrawn {
                println!("Ceiling withdrawn");
            } else {
                println!("No active ceiling to withdraw");
            }
        }

        Commands::Cancel { auction_id, reason } => {
            let _: bool = client
                .request("auction_cancel", rpc_params![auction_id, reason])
                .await?;
            println!("Auction {} cancelled", auction_id);
        }

        Commands::Status { auction_id } => {
            let auction: Option<AuctionRpc> = client
                .request("query_getAuction", rpc_params![auction_id])
                .await?;
            match auction {
                Some(a) => print_auction(&a),
                None => println!("Auction {} not found", auction_id),
            }
        }

        Commands::List => {
            let auctions: Vec<AuctionRpc> = client.request("query_listAuctions", rpc_params![]).await?;
            if auctions.is_empty() {
                println!("No auctions");
            }
            for auction in &auctions {
                print_auction(auction);
            }
        }

        Commands::Balance { user } => {
            let balance: BalanceRpc = client.request("query_getBalance", rpc_params![user]).await?;
            println!(
                "User {}: {} available, {} locked",
                user, balance.available, balance.locked
            );
        }

        Commands::Credit { user, amount } => {
            let new_balance: u64 = client
                .request("admin_credit", rpc_params![user, amount])
                .await?;
            println!("User {} now has {} points", user, new_balance);
        }

        Commands::Sweep => {
            let closed: Vec<ClosedAuctionRpc> = client.request("admin_sweep", rpc_params![]).await?;
            if closed.is_empty() {
                println!("Nothing due");
            }
            for summary in &closed {
                match (summary.winner, summary.price) {
                    (Some(winner), Some(price)) => println!(
                        "Auction {} sold to {} for {}",
                        summary.auction, winner, price
                    ),
                    _ => println!("Auction {} closed unsold", summary.auction),
                }
            }
        }
    }

    Ok(())
}
