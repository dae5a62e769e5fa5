//! JSON-RPC server for the curio auction marketplace.
//!
//! Exposes the auction engine's interface (list, bid, withdraw, cancel)
//! plus queries and a small admin surface for crediting points and
//! triggering sweeps by hand. Balances, item ownership, and notifications
//! use the in-memory collaborator implementations; production deployments
//! plug real backends in behind the same traits.

use anyhow::Result;
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use curio_engine::{
    unix_now, AuctionEngine, CreateAuction, EngineError, InMemoryBalances, InMemoryItems,
    LogEmitter, Sweeper, SweeperConfig,
};
use curio_types::EngineConfig;

mod types;
use types::*;

#[derive(Parser)]
#[command(name = "curio-server")]
#[command(about = "Auction marketplace JSON-RPC server")]
struct Cli {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:9955")]
    addr: SocketAddr,

    /// Minimum bid increment for proxy resolution
    #[arg(long, default_value = "5")]
    step: u64,

    /// Seconds between closing sweeps
    #[arg(long, default_value = "5")]
    poll_interval: u64,
}

/// RPC API definition for the auction server.
#[rpc(server)]
pub trait CurioApi {
    // ============ Admin Methods ============

    /// Credit points to a user (dev backend), returning the new balance.
    #[method(name = "admin_credit")]
    async fn admin_credit(&self, user: u64, amount: u64) -> Result<u64, ErrorObjectOwned>;

    /// Run a sweep immediately, returning the auctions it closed.
    #[method(name = "admin_sweep")]
    async fn admin_sweep(&self) -> Result<Vec<ClosedAuctionRpc>, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// List an item for auction.
    #[method(name = "auction_create")]
    async fn auction_create(&self, params: CreateAuctionParams) -> Result<u64, ErrorObjectOwned>;

    /// Register or raise an auto-bid ceiling.
    #[method(name = "auction_submitCeiling")]
    async fn auction_submit_ceiling(
        &self,
        params: SubmitCeilingParams,
    ) -> Result<BidQuoteRpc, ErrorObjectOwned>;

    /// Withdraw an auto-bid ceiling.
    #[method(name = "auction_withdrawCeiling")]
    async fn auction_withdraw_ceiling(
        &self,
        auction_id: u64,
        bidder: u64,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Cancel an auction, releasing all escrow.
    #[method(name = "auction_cancel")]
    async fn auction_cancel(
        &self,
        auction_id: u64,
        reason: String,
    ) -> Result<bool, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get auction by ID.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(
        &self,
        auction_id: u64,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned>;

    /// List all auctions.
    #[method(name = "query_listAuctions")]
    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned>;

    /// Get a bidder's ceiling for an auction.
    #[method(name = "query_getCeiling")]
    async fn query_get_ceiling(
        &self,
        auction_id: u64,
        bidder: u64,
    ) -> Result<Option<CeilingRpc>, ErrorObjectOwned>;

    /// Get a user's balance summary (available and escrow-locked).
    #[method(name = "query_getBalance")]
    async fn query_get_balance(&self, user: u64) -> Result<BalanceRpc, ErrorObjectOwned>;
}

/// Implementation of the auction RPC server.
struct CurioServer {
    engine: Arc<AuctionEngine>,
    balances: Arc<InMemoryBalances>,
}

impl CurioServer {
    fn new(engine: Arc<AuctionEngine>, balances: Arc<InMemoryBalances>) -> Self {
        Self { engine, balances }
    }

    fn rpc_error(err: EngineError) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, err.to_string(), None::<()>)
    }
}

#[async_trait]
impl CurioApiServer for CurioServer {
    async fn admin_credit(&self, user: u64, amount: u64) -> Result<u64, ErrorObjectOwned> {
        Ok(self.balances.credit(user, amount))
    }

    async fn admin_sweep(&self) -> Result<Vec<ClosedAuctionRpc>, ErrorObjectOwned> {
        let now = unix_now();
        self.engine.activate_due(now);
        let closed = self.engine.close_due(now);
        Ok(closed.iter().map(ClosedAuctionRpc::from).collect())
    }

    async fn auction_create(&self, params: CreateAuctionParams) -> Result<u64, ErrorObjectOwned> {
        self.engine
            .create_auction(
                CreateAuction {
                    item: params.item,
                    seller: params.seller,
                    starting_price: params.starting_price,
                    start_at: params.start_at,
                    end_at: params.end_at,
                    featured: params.featured,
                },
                unix_now(),
            )
            .map_err(Self::rpc_error)
    }

    async fn auction_submit_ceiling(
        &self,
        params: SubmitCeilingParams,
    ) -> Result<BidQuoteRpc, ErrorObjectOwned> {
        let quote = self
            .engine
            .submit_ceiling(params.auction_id, params.bidder, params.max_amount, unix_now())
            .map_err(Self::rpc_error)?;
        Ok(BidQuoteRpc {
            highest_bid: quote.highest_bid,
            highest_bidder: quote.highest_bidder,
        })
    }

    async fn auction_withdraw_ceiling(
        &self,
        auction_id: u64,
        bidder: u64,
    ) -> Result<bool, ErrorObjectOwned> {
        self.engine
            .withdraw_ceiling(auction_id, bidder)
            .map_err(Self::rpc_error)
    }

    async fn auction_cancel(
        &self,
        auction_id: u64,
        reason: String,
    ) -> Result<bool, ErrorObjectOwned> {
        self.engine
            .cancel_auction(auction_id, &reason)
            .map(|_| true)
            .map_err(Self::rpc_error)
    }

    async fn query_get_auction(
        &self,
        auction_id: u64,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned> {
        Ok(self
            .engine
            .get_auction(auction_id)
            .ok()
            .map(|a| AuctionRpc::from(&a)))
    }

    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned> {
        Ok(self
            .engine
            .list_auctions()
            .iter()
            .map(AuctionRpc::from)
            .collect())
    }

    async fn query_get_ceiling(
        &self,
        auction_id: u64,
        bidder: u64,
    ) -> Result<Option<CeilingRpc>, ErrorObjectOwned> {
        Ok(self
            .engine
            .get_ceiling(auction_id, bidder)
            .map(|c| CeilingRpc::from(&c)))
    }

    async fn query_get_balance(&self, user: u64) -> Result<BalanceRpc, ErrorObjectOwned> {
        let summary = self.engine.balance_summary(user);
        Ok(BalanceRpc {
            available: summary.available,
            locked: summary.locked,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("curio_server=info".parse().unwrap())
                .add_directive("curio_engine=info".parse().unwrap())
                .add_directive("jsonrpsee=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let balances = Arc::new(InMemoryBalances::new());
    let items = Arc::new(InMemoryItems::new());
    let engine = Arc::new(AuctionEngine::new(
        EngineConfig { bid_step: cli.step },
        balances.clone(),
        items,
        Arc::new(LogEmitter),
    ));

    let sweeper = Sweeper::new(
        engine.clone(),
        SweeperConfig {
            poll_interval_secs: cli.poll_interval,
        },
    );
    let sweep_handle = sweeper.spawn();

    info!("Starting auction server on {}", cli.addr);

    let server = Server::builder().build(cli.addr).await?;
    let handle = server.start(CurioServer::new(engine, balances).into_rpc());

    info!("Auction server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    sweep_handle.abort();
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
