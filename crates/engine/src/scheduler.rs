//! Closing scheduler: the sweep loop that drives due auctions through
//! their timed transitions.
//!
//! The sweep itself is idempotent. Each close is a conditional transition
//! that exactly one runner wins, so running several sweepers, restarting
//! mid-sweep, or triggering a sweep manually is always safe.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use curio_types::Timestamp;

use crate::engine::AuctionEngine;

/// Configuration for the sweep loop.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Seconds between sweeps.
    pub poll_interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

/// Current wall-clock time as a unix timestamp.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Periodic sweeper over the engine's scheduled transitions.
pub struct Sweeper {
    engine: Arc<AuctionEngine>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(engine: Arc<AuctionEngine>, config: SweeperConfig) -> Self {
        Self { engine, config }
    }

    /// Run one sweep at the given time: promote scheduled auctions whose
    /// start has passed and close active auctions whose end has passed.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let activated = self.engine.activate_due(now);
        if !activated.is_empty() {
            debug!(count = activated.len(), "auctions activated");
        }

        let closed = self.engine.close_due(now);
        for summary in &closed {
            info!(auction = summary.auction, outcome = ?summary.outcome, "sweep closed auction");
        }
        closed.len()
    }

    /// Run the sweep loop until the task is aborted.
    pub async fn run(self) {
        let period = Duration::from_secs(self.config.poll_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        info!(interval_secs = period.as_secs(), "closing scheduler started");

        loop {
            interval.tick().await;
            self.sweep(unix_now());
        }
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CreateAuction;
    use crate::external::InMemoryWorld;
    use curio_types::EngineConfig;

    #[test]
    fn test_sweep_activates_and_closes() {
        let world = InMemoryWorld::new();
        world.balances.credit(2, 100);
        let engine = Arc::new(AuctionEngine::new(
            EngineConfig::default(),
            world.balances.clone(),
            world.items.clone(),
            world.emitter.clone(),
        ));

        let id = engine
            .create_auction(
                CreateAuction {
                    item: 7,
                    seller: 1,
                    starting_price: 10,
                    start_at: 50,
                    end_at: 100,
                    featured: false,
                },
                0,
            )
            .unwrap();

        let sweeper = Sweeper::new(engine.clone(), SweeperConfig::default());

        // Nothing due yet.
        assert_eq!(sweeper.sweep(0), 0);

        // Start passed: activated, not closed.
        sweeper.sweep(60);
        engine.submit_ceiling(id, 2, 50, 61).unwrap();

        // End passed: closed once; the next sweep finds nothing.
        assert_eq!(sweeper.sweep(100), 1);
        assert_eq!(sweeper.sweep(101), 0);
        assert_eq!(engine.get_auction(id).unwrap().winner, Some(2));
    }
}
