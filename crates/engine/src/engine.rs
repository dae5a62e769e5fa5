//! Auction state machine.
//!
//! Owns the lifecycle of every auction (`Scheduled → Active → {Closed,
//! Cancelled}`), delegating bid handling to the resolver and reservation
//! changes to the escrow ledger.
//!
//! The unit of serialization is one auction: every state change for a given
//! auction runs under that auction's gate, so different auctions proceed
//! fully in parallel. The ledger adds its own per-bidder gate underneath;
//! the auction gate is always acquired first and at most one bidder gate is
//! held at a time, so the two lock dimensions cannot deadlock. Events are
//! queued under the gate and emitted through a per-auction outbox after it
//! is released, so observers always see them in commit order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use curio_types::{
    Auction, AuctionEvent, AuctionId, AuctionStatus, AutoBidCeiling, ClosedAuction, EngineConfig,
    ItemId, SaleOutcome, Timestamp, UserId,
};

use crate::error::{EngineError, EngineResult};
use crate::external::{BalanceAccount, ItemRegistry, NotificationEmitter};
use crate::ledger::EscrowLedger;
use crate::registry::CeilingRegistry;
use crate::resolver::{resolve, Resolution};
use crate::store::AuctionStore;

/// Parameters for listing an item.
#[derive(Clone, Debug)]
pub struct CreateAuction {
    pub item: ItemId,
    pub seller: UserId,
    pub starting_price: u64,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub featured: bool,
}

/// The visible state of the bidding after a ceiling submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidQuote {
    pub highest_bid: u64,
    pub highest_bidder: Option<UserId>,
}

/// Balance summary for one user: spendable and escrow-locked points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSummary {
    pub available: u64,
    pub locked: u64,
}

/// The auction lifecycle and proxy-bid resolution engine.
pub struct AuctionEngine {
    config: EngineConfig,
    store: AuctionStore,
    registry: CeilingRegistry,
    ledger: EscrowLedger,
    balances: Arc<dyn BalanceAccount>,
    items: Arc<dyn ItemRegistry>,
    notifier: Arc<dyn NotificationEmitter>,
    gates: Mutex<HashMap<AuctionId, Arc<Mutex<()>>>>,
    outboxes: Mutex<HashMap<AuctionId, Arc<Mutex<VecDeque<AuctionEvent>>>>>,
}

impl AuctionEngine {
    pub fn new(
        config: EngineConfig,
        balances: Arc<dyn BalanceAccount>,
        items: Arc<dyn ItemRegistry>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            config,
            store: AuctionStore::new(),
            registry: CeilingRegistry::new(),
            ledger: EscrowLedger::new(balances.clone()),
            balances,
            items,
            notifier,
            gates: Mutex::new(HashMap::new()),
            outboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Serialization gate for one auction's state changes.
    fn gate(&self, auction: AuctionId) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock();
        gates.entry(auction).or_default().clone()
    }

    fn outbox(&self, auction: AuctionId) -> Arc<Mutex<VecDeque<AuctionEvent>>> {
        let mut outboxes = self.outboxes.lock();
        outboxes.entry(auction).or_default().clone()
    }

    /// Queue events for emission. Must run under the auction's gate so
    /// queue order matches commit order.
    fn enqueue(&self, auction: AuctionId, events: Vec<AuctionEvent>) {
        if events.is_empty() {
            return;
        }
        self.outbox(auction).lock().extend(events);
    }

    /// Drain and emit an auction's queued events. Runs after the gate is
    /// released; the outbox lock serializes emission, so a caller that
    /// committed first but was preempted before draining has its events
    /// emitted (in order) by whoever drains next.
    fn flush(&self, auction: AuctionId) {
        let outbox = self.outbox(auction);
        let mut queue = outbox.lock();
        while let Some(event) = queue.pop_front() {
            self.notifier.emit(event);
        }
    }

    // =========================
    // LIFECYCLE
    // =========================

    /// List an item for auction. Listings whose start time has already
    /// passed open for bidding immediately.
    pub fn create_auction(&self, params: CreateAuction, now: Timestamp) -> EngineResult<AuctionId> {
        if params.end_at <= params.start_at {
            return Err(EngineError::InvalidTiming);
        }

        let status = if params.start_at <= now {
            AuctionStatus::Active
        } else {
            AuctionStatus::Scheduled
        };

        let id = self.store.insert(Auction {
            id: 0,
            item: params.item,
            seller: params.seller,
            start_at: params.start_at,
            end_at: params.end_at,
            status,
            starting_price: params.starting_price,
            current_bid: params.starting_price,
            current_bidder: None,
            winner: None,
            featured: params.featured,
        });

        info!(auction = id, item = params.item, ?status, "auction listed");
        Ok(id)
    }

    /// Register or raise a bidder's auto-bid ceiling and re-resolve the
    /// visible highest bid.
    ///
    /// The whole operation is one logical transaction: validation happens
    /// before any mutation, and an escrow failure aborts without persisting
    /// the ceiling.
    pub fn submit_ceiling(
        &self,
        auction_id: AuctionId,
        bidder: UserId,
        max_amount: u64,
        now: Timestamp,
    ) -> EngineResult<BidQuote> {
        let gate = self.gate(auction_id);

        let quote = {
            let _held = gate.lock();
            let mut events = Vec::new();

            let mut auction = self.store.get(auction_id)?;

            // A scheduled listing whose start time has passed opens on
            // first touch; the sweep would promote it anyway.
            if auction.status == AuctionStatus::Scheduled
                && auction.start_at <= now
                && self.store.try_activate(auction_id)
            {
                auction.status = AuctionStatus::Active;
            }

            if !auction.is_active() || now >= auction.end_at {
                return Err(EngineError::AuctionNotActive(auction_id));
            }
            if max_amount == 0 || max_amount < auction.starting_price {
                return Err(EngineError::InvalidAmount(max_amount));
            }

            // Build the candidate ceiling without committing it yet.
            let candidate = match self.registry.get(auction_id, bidder) {
                Some(existing) => {
                    if existing.active && max_amount < existing.max_amount {
                        // Ceilings only move upward while standing.
                        return Err(EngineError::InvalidAmount(max_amount));
                    }
                    AutoBidCeiling {
                        max_amount,
                        active: true,
                        ..existing
                    }
                }
                None => AutoBidCeiling {
                    auction: auction_id,
                    bidder,
                    max_amount,
                    active: true,
                    registered_at: now,
                    sequence: self.registry.peek_sequence(),
                },
            };

            let mut ceilings: Vec<AutoBidCeiling> = self
                .registry
                .active_for_auction(auction_id)
                .into_iter()
                .filter(|c| c.bidder != bidder)
                .collect();
            ceilings.push(candidate);

            // A standing holder whose ceiling was withdrawn still has a
            // committed bid. It competes as a ceiling at exactly the
            // visible amount, with earliest priority, so a newcomer must
            // strictly beat it and ties never displace it.
            if let Some(prev) = auction.current_bidder {
                if prev != bidder && !ceilings.iter().any(|c| c.bidder == prev) {
                    ceilings.push(AutoBidCeiling {
                        auction: auction_id,
                        bidder: prev,
                        max_amount: auction.current_bid,
                        active: true,
                        registered_at: 0,
                        sequence: 0,
                    });
                }
            }

            let Resolution { amount, holder } =
                resolve(auction.starting_price, self.config.bid_step, &ceilings);

            let quote = if self.applies(&auction, amount, holder) {
                // Reserve before anything is persisted so an overdraft
                // aborts the operation as a whole.
                if let Some(leader) = holder {
                    if amount > 0 {
                        self.ledger.reserve(auction_id, leader, amount)?;
                    }
                }

                let previous = auction.current_bidder;
                if let Some(prev) = previous {
                    if Some(prev) != holder {
                        if let Some(lock) = self.ledger.active_lock(auction_id, prev) {
                            self.ledger.release(lock)?;
                        }
                        events.push(AuctionEvent::Outbid {
                            auction: auction_id,
                            bidder: prev,
                            amount,
                        });
                    }
                }

                self.registry.set(auction_id, bidder, max_amount, now);
                self.store.update_bid(auction_id, amount, holder);

                if let Some(leader) = holder {
                    events.push(AuctionEvent::NewHighBid {
                        auction: auction_id,
                        bidder: leader,
                        amount,
                    });
                }

                BidQuote {
                    highest_bid: amount,
                    highest_bidder: holder,
                }
            } else {
                // Nothing visible changes: record the ceiling, skip the
                // escrow churn and the notifications.
                debug!(auction = auction_id, bidder, "ceiling recorded without lead change");
                self.registry.set(auction_id, bidder, max_amount, now);
                BidQuote {
                    highest_bid: auction.current_bid,
                    highest_bidder: auction.current_bidder,
                }
            };

            self.enqueue(auction_id, events);
            quote
        };

        self.flush(auction_id);
        Ok(quote)
    }

    /// Whether a resolution result changes the auction's visible state.
    ///
    /// The visible bid is monotonic and a standing holder is never displaced
    /// without a strictly higher bid, so a resolution that computes a lower
    /// price (possible when the standing holder's ceiling was withdrawn) is
    /// suppressed.
    fn applies(&self, auction: &Auction, amount: u64, holder: Option<UserId>) -> bool {
        match (auction.current_bidder, holder) {
            (current, new) if current == new => amount > auction.current_bid,
            (None, Some(_)) => amount >= auction.current_bid,
            (Some(_), _) => amount > auction.current_bid,
            (None, None) => false,
        }
    }

    /// Withdraw a bidder's ceiling.
    ///
    /// Takes effect on the next competing resolution; a withdrawal while
    /// holding the highest bid does not retroactively surrender the lead or
    /// the escrow backing it.
    pub fn withdraw_ceiling(&self, auction_id: AuctionId, bidder: UserId) -> EngineResult<bool> {
        let gate = self.gate(auction_id);
        let _held = gate.lock();

        // Existence check only; withdrawal is allowed at any stage.
        self.store.get(auction_id)?;
        Ok(self.registry.deactivate(auction_id, bidder))
    }

    /// Cancel an auction, releasing every participant's escrow with no
    /// captures. Fails with `AlreadyTerminal` once closed or cancelled.
    pub fn cancel_auction(&self, auction_id: AuctionId, reason: &str) -> EngineResult<()> {
        let gate = self.gate(auction_id);

        {
            let _held = gate.lock();

            self.store.try_cancel(auction_id)?;
            for (lock, _) in self.ledger.active_locks_for_auction(auction_id) {
                self.ledger.release(lock)?;
            }
            self.registry.freeze_auction(auction_id);

            self.enqueue(
                auction_id,
                vec![AuctionEvent::AuctionCancelled {
                    auction: auction_id,
                    reason: reason.to_string(),
                }],
            );
        }

        info!(auction = auction_id, reason, "auction cancelled");
        self.flush(auction_id);
        Ok(())
    }

    // =========================
    // SCHEDULED TRANSITIONS
    // =========================

    /// Promote scheduled auctions whose start time has passed.
    pub fn activate_due(&self, now: Timestamp) -> Vec<AuctionId> {
        let mut activated = Vec::new();
        for id in self.store.due_for_activation(now) {
            if self.store.try_activate(id) {
                debug!(auction = id, "auction activated");
                activated.push(id);
            }
        }
        activated
    }

    /// Close every active auction whose end time has passed.
    ///
    /// Safe to trigger redundantly: each close is a conditional transition
    /// that exactly one runner wins, so overlapping sweeps or restarts never
    /// double-settle.
    pub fn close_due(&self, now: Timestamp) -> Vec<ClosedAuction> {
        let mut closed = Vec::new();
        for id in self.store.due_for_close(now) {
            match self.close_auction(id) {
                Ok(Some(summary)) => closed.push(summary),
                // Another runner won the compare-and-set; not an error.
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(auction = id, %err, "close failed");
                }
            }
        }
        closed
    }

    /// Drive one auction through the close transition.
    ///
    /// Only the caller that wins the `Active → Closed` compare-and-set
    /// performs the capture, release, and transfer side effects; everyone
    /// else observes `None`.
    fn close_auction(&self, auction_id: AuctionId) -> EngineResult<Option<ClosedAuction>> {
        let gate = self.gate(auction_id);

        let summary = {
            let _held = gate.lock();

            let Some(auction) = self.store.try_close(auction_id) else {
                return Ok(None);
            };

            let outcome = match auction.current_bidder {
                Some(winner) => {
                    // A zero starting price with a sole bidder leaves no
                    // lock to capture; the item still changes hands.
                    if let Some(lock) = self.ledger.active_lock(auction_id, winner) {
                        self.ledger.capture(lock)?;
                    }
                    self.items
                        .transfer_ownership(auction.item, auction.seller, winner);
                    self.store.set_winner(auction_id, winner);
                    SaleOutcome::Sold {
                        winner,
                        price: auction.current_bid,
                    }
                }
                None => SaleOutcome::Unsold,
            };

            // Refund everyone who was standing but did not win.
            for (lock, _) in self.ledger.active_locks_for_auction(auction_id) {
                self.ledger.release(lock)?;
            }
            self.registry.freeze_auction(auction_id);

            self.enqueue(
                auction_id,
                vec![AuctionEvent::AuctionClosed {
                    auction: auction_id,
                    outcome: outcome.clone(),
                }],
            );

            ClosedAuction {
                auction: auction_id,
                outcome,
            }
        };

        info!(auction = auction_id, outcome = ?summary.outcome, "auction closed");
        self.flush(auction_id);
        Ok(Some(summary))
    }

    // =========================
    // QUERIES
    // =========================

    pub fn get_auction(&self, auction_id: AuctionId) -> EngineResult<Auction> {
        self.store.get(auction_id)
    }

    pub fn list_auctions(&self) -> Vec<Auction> {
        self.store.list()
    }

    pub fn get_ceiling(&self, auction_id: AuctionId, bidder: UserId) -> Option<AutoBidCeiling> {
        self.registry.get(auction_id, bidder)
    }

    pub fn balance_summary(&self, user: UserId) -> BalanceSummary {
        BalanceSummary {
            available: self.balances.available(user),
            locked: self.ledger.locked_total(user),
        }
    }

    /// Total a bidder currently has locked across all auctions.
    pub fn locked_total(&self, bidder: UserId) -> u64 {
        self.ledger.locked_total(bidder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::InMemoryWorld;

    struct Harness {
        engine: AuctionEngine,
        world: InMemoryWorld,
    }

    fn harness() -> Harness {
        let world = InMemoryWorld::new();
        let engine = AuctionEngine::new(
            EngineConfig::default(),
            world.balances.clone(),
            world.items.clone(),
            world.emitter.clone(),
        );
        Harness { engine, world }
    }

    fn listing(start_at: Timestamp, end_at: Timestamp) -> CreateAuction {
        CreateAuction {
            item: 7,
            seller: 1,
            starting_price: 10,
            start_at,
            end_at,
            featured: false,
        }
    }

    fn events_of(world: &InMemoryWorld) -> Vec<AuctionEvent> {
        world.emitter.events()
    }

    #[test]
    fn test_create_opens_immediately_when_started() {
        let h = harness();
        let id = h.engine.create_auction(listing(0, 100), 50).unwrap();
        assert_eq!(h.engine.get_auction(id).unwrap().status, AuctionStatus::Active);

        let scheduled = h.engine.create_auction(listing(80, 100), 50).unwrap();
        assert_eq!(
            h.engine.get_auction(scheduled).unwrap().status,
            AuctionStatus::Scheduled
        );
    }

    #[test]
    fn test_create_rejects_inverted_times() {
        let h = harness();
        assert_eq!(
            h.engine.create_auction(listing(100, 100), 0).unwrap_err(),
            EngineError::InvalidTiming
        );
    }

    #[test]
    fn test_first_ceiling_leads_at_starting_price() {
        let h = harness();
        h.world.balances.credit(2, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        let quote = h.engine.submit_ceiling(id, 2, 50, 10).unwrap();
        assert_eq!(quote.highest_bid, 10);
        assert_eq!(quote.highest_bidder, Some(2));
        // Only the visible amount is locked, never the ceiling.
        assert_eq!(h.engine.locked_total(2), 10);
        assert_eq!(
            events_of(&h.world),
            vec![AuctionEvent::NewHighBid {
                auction: id,
                bidder: 2,
                amount: 10
            }]
        );
    }

    #[test]
    fn test_second_ceiling_pushes_price() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        let quote = h.engine.submit_ceiling(id, 3, 80, 11).unwrap();

        // {A:100, B:80}, step 5 -> A holds at 85.
        assert_eq!(quote.highest_bid, 85);
        assert_eq!(quote.highest_bidder, Some(2));
        assert_eq!(h.engine.locked_total(2), 85);
        // The loser's balance is never touched.
        assert_eq!(h.engine.locked_total(3), 0);
    }

    #[test]
    fn test_lead_change_swaps_escrow_and_emits_outbid() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 80, 10).unwrap();
        let quote = h.engine.submit_ceiling(id, 3, 120, 11).unwrap();

        assert_eq!(quote.highest_bid, 85);
        assert_eq!(quote.highest_bidder, Some(3));
        assert_eq!(h.engine.locked_total(2), 0);
        assert_eq!(h.engine.locked_total(3), 85);

        let events = events_of(&h.world);
        assert_eq!(
            events.last().unwrap(),
            &AuctionEvent::NewHighBid {
                auction: id,
                bidder: 3,
                amount: 85
            }
        );
        assert!(events.contains(&AuctionEvent::Outbid {
            auction: id,
            bidder: 2,
            amount: 85
        }));
    }

    #[test]
    fn test_unchanged_resolution_is_a_noop() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        h.engine.submit_ceiling(id, 3, 80, 11).unwrap();
        let before = events_of(&h.world).len();

        // Re-submitting the same ceiling changes nothing visible.
        let quote = h.engine.submit_ceiling(id, 3, 80, 12).unwrap();
        assert_eq!(quote.highest_bid, 85);
        assert_eq!(quote.highest_bidder, Some(2));
        assert_eq!(events_of(&h.world).len(), before);
    }

    #[test]
    fn test_validation_errors() {
        let h = harness();
        h.world.balances.credit(2, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        assert_eq!(
            h.engine.submit_ceiling(id, 2, 0, 10).unwrap_err(),
            EngineError::InvalidAmount(0)
        );
        // Below the starting price.
        assert_eq!(
            h.engine.submit_ceiling(id, 2, 9, 10).unwrap_err(),
            EngineError::InvalidAmount(9)
        );
        // Standing ceilings only move upward.
        h.engine.submit_ceiling(id, 2, 50, 10).unwrap();
        assert_eq!(
            h.engine.submit_ceiling(id, 2, 40, 11).unwrap_err(),
            EngineError::InvalidAmount(40)
        );

        assert_eq!(
            h.engine.submit_ceiling(99, 2, 50, 10).unwrap_err(),
            EngineError::AuctionNotFound(99)
        );
        // Bids at or after the end time are too late.
        assert_eq!(
            h.engine.submit_ceiling(id, 2, 60, 100).unwrap_err(),
            EngineError::AuctionNotActive(id)
        );
    }

    #[test]
    fn test_scheduled_listing_activates_on_first_touch() {
        let h = harness();
        h.world.balances.credit(2, 200);
        let id = h.engine.create_auction(listing(50, 100), 0).unwrap();

        // Too early: still scheduled.
        assert_eq!(
            h.engine.submit_ceiling(id, 2, 50, 20).unwrap_err(),
            EngineError::AuctionNotActive(id)
        );

        // Past the start time the bid itself opens the auction.
        let quote = h.engine.submit_ceiling(id, 2, 50, 60).unwrap();
        assert_eq!(quote.highest_bidder, Some(2));
        assert_eq!(h.engine.get_auction(id).unwrap().status, AuctionStatus::Active);
    }

    #[test]
    fn test_insufficient_balance_aborts_whole_submission() {
        let h = harness();
        h.world.balances.credit(2, 5);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        let err = h.engine.submit_ceiling(id, 2, 50, 10).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBalance { .. }));
        // All-or-nothing: the ceiling was not persisted either.
        assert!(h.engine.get_ceiling(id, 2).is_none());
        assert_eq!(events_of(&h.world), vec![]);
    }

    #[test]
    fn test_withdrawal_keeps_the_lead() {
        let h = harness();
        h.world.balances.credit(2, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        assert!(h.engine.withdraw_ceiling(id, 2).unwrap());
        assert!(!h.engine.withdraw_ceiling(id, 2).unwrap());

        let auction = h.engine.get_auction(id).unwrap();
        assert_eq!(auction.current_bidder, Some(2));
        assert_eq!(h.engine.locked_total(2), 10);
    }

    #[test]
    fn test_lower_resolution_never_displaces_standing_bid() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        h.world.balances.credit(4, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        h.engine.submit_ceiling(id, 3, 80, 11).unwrap(); // bid now 85, holder 2
        h.engine.withdraw_ceiling(id, 2).unwrap();
        h.engine.withdraw_ceiling(id, 3).unwrap();

        // A fresh ceiling below the standing bid is recorded but cannot
        // roll the price back or displace the holder.
        let quote = h.engine.submit_ceiling(id, 4, 40, 12).unwrap();
        assert_eq!(quote.highest_bid, 85);
        assert_eq!(quote.highest_bidder, Some(2));

        // A ceiling that beats the standing bid takes the lead.
        let quote = h.engine.submit_ceiling(id, 4, 120, 13).unwrap();
        assert_eq!(quote.highest_bidder, Some(4));
        assert!(quote.highest_bid > 85);
    }

    #[test]
    fn test_close_settles_exactly_once() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        h.world.items.set_owner(7, 1);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        h.engine.submit_ceiling(id, 3, 80, 11).unwrap();

        let closed = h.engine.close_due(100);
        assert_eq!(
            closed,
            vec![ClosedAuction {
                auction: id,
                outcome: SaleOutcome::Sold { winner: 2, price: 85 }
            }]
        );

        // Winner debited once, loser untouched, item transferred.
        assert_eq!(h.world.balances.available(2), 115);
        assert_eq!(h.world.balances.available(3), 200);
        assert_eq!(h.engine.locked_total(2), 0);
        assert_eq!(h.engine.locked_total(3), 0);
        assert_eq!(h.world.items.owner(7), Some(2));
        assert_eq!(h.engine.get_auction(id).unwrap().winner, Some(2));

        // The sweep finds nothing left to do.
        assert!(h.engine.close_due(200).is_empty());
        assert_eq!(h.world.balances.available(2), 115);
    }

    #[test]
    fn test_close_without_bids_is_unsold() {
        let h = harness();
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        let closed = h.engine.close_due(100);
        assert_eq!(closed[0].outcome, SaleOutcome::Unsold);
        assert!(h.engine.get_auction(id).unwrap().winner.is_none());
    }

    #[test]
    fn test_cancel_releases_everything_and_captures_nothing() {
        let h = harness();
        h.world.balances.credit(2, 200);
        h.world.balances.credit(3, 200);
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        h.engine.submit_ceiling(id, 2, 100, 10).unwrap();
        h.engine.submit_ceiling(id, 3, 80, 11).unwrap();
        h.engine.cancel_auction(id, "seller withdrew listing").unwrap();

        assert_eq!(h.engine.locked_total(2), 0);
        assert_eq!(h.world.balances.available(2), 200);
        assert_eq!(
            h.engine.get_auction(id).unwrap().status,
            AuctionStatus::Cancelled
        );

        // Terminal: no second cancel, no close, no bids.
        assert_eq!(
            h.engine.cancel_auction(id, "again").unwrap_err(),
            EngineError::AlreadyTerminal(id)
        );
        assert!(h.engine.close_due(200).is_empty());
        assert_eq!(
            h.engine.submit_ceiling(id, 2, 100, 12).unwrap_err(),
            EngineError::AuctionNotActive(id)
        );
    }

    #[test]
    fn test_activate_due_promotes_scheduled() {
        let h = harness();
        let id = h.engine.create_auction(listing(50, 100), 0).unwrap();

        assert!(h.engine.activate_due(40).is_empty());
        assert_eq!(h.engine.activate_due(50), vec![id]);
        assert_eq!(h.engine.get_auction(id).unwrap().status, AuctionStatus::Active);
        assert!(h.engine.activate_due(60).is_empty());
    }

    #[test]
    fn test_events_emitted_in_commit_order() {
        let world = InMemoryWorld::new();
        for u in 2..10u64 {
            world.balances.credit(u, 1000);
        }
        let engine = Arc::new(AuctionEngine::new(
            EngineConfig::default(),
            world.balances.clone(),
            world.items.clone(),
            world.emitter.clone(),
        ));
        let id = engine.create_auction(listing(0, 100), 0).unwrap();

        let handles: Vec<_> = (2..10u64)
            .map(|bidder| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let _ = engine.submit_ceiling(id, bidder, bidder * 50, bidder);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // The visible bid is monotonic per auction, so a correctly ordered
        // event stream never announces a high bid below one already seen.
        let mut last = 0;
        for event in world.emitter.events() {
            if let AuctionEvent::NewHighBid { amount, .. } = event {
                assert!(amount >= last);
                last = amount;
            }
        }
        assert!(last > 0);
    }

    #[test]
    fn test_highest_bid_is_monotonic() {
        let h = harness();
        for u in 2..8 {
            h.world.balances.credit(u, 1000);
        }
        let id = h.engine.create_auction(listing(0, 100), 0).unwrap();

        let ceilings = [(2, 40), (3, 200), (4, 30), (5, 180), (6, 500), (7, 220)];
        let mut last = 0;
        for (i, (bidder, max)) in ceilings.iter().enumerate() {
            let quote = match h.engine.submit_ceiling(id, *bidder, *max, 10 + i as u64) {
                Ok(q) => q,
                Err(_) => continue,
            };
            assert!(quote.highest_bid >= last);
            last = quote.highest_bid;
        }
    }
}
