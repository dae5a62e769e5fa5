//! End-to-end tests for the curio auction engine.
//!
//! These tests exercise the full auction lifecycle:
//! 1. Crediting points and listing an item
//! 2. Proxy-bid submission and resolution
//! 3. Escrow reservation and release
//! 4. Timed close with capture and ownership transfer
//!
//! Concurrency tests drive the engine from plain threads, the way
//! overlapping requests and sweep runners hit it in production.

#![cfg(test)]

use std::sync::Arc;

use curio_engine::{AuctionEngine, BalanceAccount, CreateAuction, EngineError, InMemoryWorld};
use curio_types::{AuctionEvent, AuctionStatus, EngineConfig, SaleOutcome};

fn engine_with(world: &InMemoryWorld, step: u64) -> Arc<AuctionEngine> {
    Arc::new(AuctionEngine::new(
        EngineConfig { bid_step: step },
        world.balances.clone(),
        world.items.clone(),
        world.emitter.clone(),
    ))
}

fn listing(item: u64, seller: u64, starting_price: u64, end_at: u64) -> CreateAuction {
    CreateAuction {
        item,
        seller,
        starting_price,
        start_at: 0,
        end_at,
        featured: false,
    }
}

/// The complete happy path: list, bid, outbid, close, settle.
#[test]
fn test_full_auction_lifecycle() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);

    // ========================================
    // Phase 1: Setup - seller owns the item, bidders hold points
    // ========================================

    let seller = 1u64;
    let alice = 2u64;
    let bob = 3u64;

    world.items.set_owner(7, seller);
    world.balances.credit(alice, 500);
    world.balances.credit(bob, 500);

    // ========================================
    // Phase 2: List the item
    // ========================================

    let auction = engine.create_auction(listing(7, seller, 10, 1000), 0).unwrap();
    assert_eq!(engine.get_auction(auction).unwrap().status, AuctionStatus::Active);

    // ========================================
    // Phase 3: Proxy bidding
    // ========================================

    // Alice opens with a ceiling of 100: she leads at the starting price.
    let quote = engine.submit_ceiling(auction, alice, 100, 10).unwrap();
    assert_eq!(quote.highest_bid, 10);
    assert_eq!(quote.highest_bidder, Some(alice));
    assert_eq!(engine.locked_total(alice), 10);

    // Bob counters at 80: Alice's proxy pushes to 85 automatically.
    let quote = engine.submit_ceiling(auction, bob, 80, 20).unwrap();
    assert_eq!(quote.highest_bid, 85);
    assert_eq!(quote.highest_bidder, Some(alice));
    assert_eq!(engine.locked_total(alice), 85);
    assert_eq!(engine.locked_total(bob), 0);

    // Bob raises to 300 and takes the lead one step above Alice's ceiling.
    let quote = engine.submit_ceiling(auction, bob, 300, 30).unwrap();
    assert_eq!(quote.highest_bid, 105);
    assert_eq!(quote.highest_bidder, Some(bob));
    assert_eq!(engine.locked_total(alice), 0);
    assert_eq!(engine.locked_total(bob), 105);

    // ========================================
    // Phase 4: Timed close
    // ========================================

    let closed = engine.close_due(1000);
    assert_eq!(closed.len(), 1);
    assert_eq!(
        closed[0].outcome,
        SaleOutcome::Sold {
            winner: bob,
            price: 105
        }
    );

    // Bob paid the visible bid, not his ceiling; Alice was fully refunded.
    assert_eq!(world.balances.available(bob), 395);
    assert_eq!(world.balances.available(alice), 500);
    assert_eq!(engine.locked_total(bob), 0);
    assert_eq!(world.items.owner(7), Some(bob));

    let record = engine.get_auction(auction).unwrap();
    assert_eq!(record.status, AuctionStatus::Closed);
    assert_eq!(record.winner, Some(bob));

    // Events arrived in commit order, closing last.
    let events = world.emitter.events();
    assert_eq!(
        events.last().unwrap(),
        &AuctionEvent::AuctionClosed {
            auction,
            outcome: SaleOutcome::Sold {
                winner: bob,
                price: 105
            }
        }
    );
    assert!(events.contains(&AuctionEvent::Outbid {
        auction,
        bidder: alice,
        amount: 105
    }));
}

/// Equal ceilings resolve in favor of the earlier registration.
#[test]
fn test_tie_break_rewards_commitment_time() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    world.balances.credit(2, 500);
    world.balances.credit(3, 500);

    let auction = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();

    engine.submit_ceiling(auction, 2, 100, 10).unwrap();
    let quote = engine.submit_ceiling(auction, 3, 100, 20).unwrap();

    // No increment headroom is left at a tie; the earlier bidder holds at
    // exactly the shared ceiling.
    assert_eq!(quote.highest_bid, 100);
    assert_eq!(quote.highest_bidder, Some(2));

    let closed = engine.close_due(1000);
    assert_eq!(
        closed[0].outcome,
        SaleOutcome::Sold {
            winner: 2,
            price: 100
        }
    );
}

/// A bidder's escrow follows them across auctions and never exceeds their
/// balance.
#[test]
fn test_escrow_spans_auctions() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    world.balances.credit(2, 100);
    world.balances.credit(3, 1000);
    world.balances.credit(4, 1000);

    let first = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();
    let second = engine.create_auction(listing(8, 1, 10, 1000), 0).unwrap();

    // Bidder 2 leads the first auction at 65 (pushed by a competitor).
    engine.submit_ceiling(first, 2, 100, 10).unwrap();
    engine.submit_ceiling(first, 3, 60, 20).unwrap();
    assert_eq!(engine.locked_total(2), 65);

    // The remaining 35 points cannot back a 70-point lead elsewhere.
    engine.submit_ceiling(second, 4, 90, 30).unwrap();
    let err = engine.submit_ceiling(second, 2, 200, 40).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    assert_eq!(engine.locked_total(2), 65);

    // Once outbid in the first auction, the points free up.
    engine.submit_ceiling(first, 3, 300, 50).unwrap();
    assert_eq!(engine.locked_total(2), 0);
    let quote = engine.submit_ceiling(second, 2, 200, 60).unwrap();
    assert_eq!(quote.highest_bidder, Some(2));
}

/// Cancelling an active auction refunds every participant with no captures.
#[test]
fn test_cancellation_refunds_everyone() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    world.balances.credit(2, 500);
    world.balances.credit(3, 500);
    world.items.set_owner(7, 1);

    let auction = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();
    engine.submit_ceiling(auction, 2, 100, 10).unwrap();
    engine.submit_ceiling(auction, 3, 80, 20).unwrap();

    engine.cancel_auction(auction, "listing removed").unwrap();

    assert_eq!(engine.locked_total(2), 0);
    assert_eq!(engine.locked_total(3), 0);
    assert_eq!(world.balances.available(2), 500);
    assert_eq!(world.balances.available(3), 500);
    // The item never changed hands.
    assert_eq!(world.items.owner(7), Some(1));

    let events = world.emitter.events();
    assert_eq!(
        events.last().unwrap(),
        &AuctionEvent::AuctionCancelled {
            auction,
            reason: "listing removed".to_string()
        }
    );
}

/// Concurrent ceiling submissions resolve to the same final state
/// regardless of arrival order, and escrow never overdraws.
#[test]
fn test_concurrent_submissions_converge() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    for user in 2..10u64 {
        world.balances.credit(user, 1000);
    }

    let auction = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();

    let ceilings = [
        (2u64, 40u64),
        (3, 200),
        (4, 310),
        (5, 180),
        (6, 90),
        (7, 250),
        (8, 120),
        (9, 60),
    ];

    let handles: Vec<_> = ceilings
        .iter()
        .map(|&(bidder, max)| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                // Errors are fine here: a submission can lose to a
                // concurrent higher ceiling and arrive below the standing
                // bid's strike point, which is still a recorded ceiling.
                let _ = engine.submit_ceiling(auction, bidder, max, bidder);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Top ceiling 310 (bidder 4), second 250: the visible bid settles at
    // 255 no matter the interleaving.
    let record = engine.get_auction(auction).unwrap();
    assert_eq!(record.current_bidder, Some(4));
    assert_eq!(record.current_bid, 255);

    // Exactly one bidder has points locked, and only the visible amount.
    for user in 2..10u64 {
        let locked = engine.locked_total(user);
        if user == 4 {
            assert_eq!(locked, 255);
        } else {
            assert_eq!(locked, 0);
        }
        assert!(locked <= world.balances.available(user));
    }
}

/// Closing the same auction from many runners captures exactly once.
#[test]
fn test_concurrent_close_settles_once() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    world.balances.credit(2, 500);
    world.balances.credit(3, 500);
    world.items.set_owner(7, 1);

    let auction = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();
    engine.submit_ceiling(auction, 2, 100, 10).unwrap();
    engine.submit_ceiling(auction, 3, 80, 20).unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || engine.close_due(1000).len())
        })
        .collect();

    let closed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(closed, 1);

    // Exactly one debit: the winner paid 85 once, no double-spend.
    assert_eq!(world.balances.available(2), 415);
    assert_eq!(world.balances.available(3), 500);
    assert_eq!(world.items.owner(7), Some(2));

    let close_events = world
        .emitter
        .events()
        .into_iter()
        .filter(|e| matches!(e, AuctionEvent::AuctionClosed { .. }))
        .count();
    assert_eq!(close_events, 1);
}

/// Independent auctions settle independently and in parallel.
#[test]
fn test_parallel_auctions_do_not_interfere() {
    let world = InMemoryWorld::new();
    let engine = engine_with(&world, 5);
    for user in 2..6u64 {
        world.balances.credit(user, 1000);
    }
    world.items.set_owner(7, 1);
    world.items.set_owner(8, 1);

    let first = engine.create_auction(listing(7, 1, 10, 1000), 0).unwrap();
    let second = engine.create_auction(listing(8, 1, 10, 2000), 0).unwrap();

    let handles: Vec<_> = vec![
        (first, 2u64, 100u64),
        (first, 3, 80),
        (second, 4, 150),
        (second, 5, 120),
    ]
    .into_iter()
    .map(|(auction, bidder, max)| {
        let engine = engine.clone();
        std::thread::spawn(move || {
            let _ = engine.submit_ceiling(auction, bidder, max, bidder);
        })
    })
    .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Only the first auction is due; the second keeps running.
    let closed = engine.close_due(1000);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].auction, first);
    assert_eq!(
        closed[0].outcome,
        SaleOutcome::Sold {
            winner: 2,
            price: 85
        }
    );
    assert_eq!(world.items.owner(7), Some(2));
    assert_eq!(world.items.owner(8), Some(1));
    assert_eq!(
        engine.get_auction(second).unwrap().status,
        AuctionStatus::Active
    );

    let closed = engine.close_due(2000);
    assert_eq!(closed[0].auction, second);
    assert_eq!(
        closed[0].outcome,
        SaleOutcome::Sold {
            winner: 4,
            price: 125
        }
    );
}
