//! Auto-bid registry: each bidder's declared ceiling per auction.
//!
//! The registry stores data only; it moves no money and emits no events.
//! Validation (positive amount, auction active) and the resolution that
//! follows a ceiling change belong to the state machine.

use std::collections::HashMap;

use parking_lot::RwLock;

use curio_types::{AuctionId, AutoBidCeiling, Timestamp, UserId};

/// Registry of auto-bid ceilings, unique per (auction, bidder).
#[derive(Default)]
pub struct CeilingRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    ceilings: HashMap<(AuctionId, UserId), AutoBidCeiling>,
    next_sequence: u64,
}

impl CeilingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a ceiling. A raise keeps the original registration time and
    /// sequence, so commitment order decides ties.
    pub fn set(&self, auction: AuctionId, bidder: UserId, max_amount: u64, now: Timestamp) {
        let mut inner = self.inner.write();
        match inner.ceilings.get_mut(&(auction, bidder)) {
            Some(ceiling) => {
                ceiling.max_amount = max_amount;
                ceiling.active = true;
            }
            None => {
                let sequence = inner.next_sequence;
                inner.next_sequence += 1;
                inner.ceilings.insert(
                    (auction, bidder),
                    AutoBidCeiling {
                        auction,
                        bidder,
                        max_amount,
                        active: true,
                        registered_at: now,
                        sequence,
                    },
                );
            }
        }
    }

    /// Mark a ceiling inactive. Returns whether an active ceiling existed.
    ///
    /// Deactivation does not retroactively undo a bid already won by proxy
    /// resolution; the standing highest bid is untouched.
    pub fn deactivate(&self, auction: AuctionId, bidder: UserId) -> bool {
        let mut inner = self.inner.write();
        match inner.ceilings.get_mut(&(auction, bidder)) {
            Some(ceiling) if ceiling.active => {
                ceiling.active = false;
                true
            }
            _ => false,
        }
    }

    /// Fetch one bidder's ceiling for an auction.
    pub fn get(&self, auction: AuctionId, bidder: UserId) -> Option<AutoBidCeiling> {
        self.inner.read().ceilings.get(&(auction, bidder)).cloned()
    }

    /// All active ceilings standing for an auction.
    pub fn active_for_auction(&self, auction: AuctionId) -> Vec<AutoBidCeiling> {
        self.inner
            .read()
            .ceilings
            .values()
            .filter(|c| c.auction == auction && c.active)
            .cloned()
            .collect()
    }

    /// Deactivate every ceiling for an auction (close or cancel).
    pub fn freeze_auction(&self, auction: AuctionId) {
        let mut inner = self.inner.write();
        for ceiling in inner.ceilings.values_mut() {
            if ceiling.auction == auction {
                ceiling.active = false;
            }
        }
    }

    /// Sequence number the next new registration would receive.
    ///
    /// Used by the state machine to build a candidate ceiling before the
    /// upsert is committed.
    pub fn peek_sequence(&self) -> u64 {
        self.inner.read().next_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_keeps_registration_order() {
        let registry = CeilingRegistry::new();
        registry.set(1, 10, 100, 1000);
        registry.set(1, 11, 80, 1001);
        // Raising bidder 10's ceiling must not reset its priority.
        registry.set(1, 10, 150, 1002);

        let a = registry.get(1, 10).unwrap();
        let b = registry.get(1, 11).unwrap();
        assert_eq!(a.max_amount, 150);
        assert_eq!(a.registered_at, 1000);
        assert!(a.sequence < b.sequence);
    }

    #[test]
    fn test_deactivate_and_freeze() {
        let registry = CeilingRegistry::new();
        registry.set(1, 10, 100, 1000);
        registry.set(1, 11, 80, 1001);
        registry.set(2, 10, 50, 1002);

        assert!(registry.deactivate(1, 10));
        assert!(!registry.deactivate(1, 10));
        assert_eq!(registry.active_for_auction(1).len(), 1);

        registry.freeze_auction(1);
        assert!(registry.active_for_auction(1).is_empty());
        // Other auctions untouched.
        assert_eq!(registry.active_for_auction(2).len(), 1);
    }

    #[test]
    fn test_reactivation_via_set() {
        let registry = CeilingRegistry::new();
        registry.set(1, 10, 100, 1000);
        registry.deactivate(1, 10);
        registry.set(1, 10, 120, 2000);

        let ceiling = registry.get(1, 10).unwrap();
        assert!(ceiling.active);
        assert_eq!(ceiling.registered_at, 1000);
    }
}
