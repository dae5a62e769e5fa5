//! Proxy-bid resolver.
//!
//! Given the active ceilings standing for one auction, computes the visible
//! highest bid and its holder. The visible price rises only as far as needed
//! to beat the second-highest ceiling plus a fixed increment; hidden ceiling
//! headroom is never exposed or locked.
//!
//! This is a pure function: the state machine decides whether the result
//! differs from the auction's current values and applies escrow and event
//! side effects.

use std::cmp::Reverse;

use curio_types::{AutoBidCeiling, UserId};

/// Outcome of one proxy resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The new visible highest bid.
    pub amount: u64,
    /// The bidder holding it, if any ceiling is standing.
    pub holder: Option<UserId>,
}

/// Resolve the visible highest bid from the set of active ceilings.
///
/// Ranking is by descending ceiling, ties broken by earliest registration
/// (time, then registry sequence). Rules:
///
/// - no ceilings: the bid stays at the starting price with no holder;
/// - one ceiling: its bidder holds at the starting price, with nothing to
///   outbid;
/// - two or more: the top bidder holds at
///   `min(top.max, second.max + step)`. Equal top ceilings leave no
///   increment headroom, so the earlier registrant holds at exactly its max.
pub fn resolve(starting_price: u64, step: u64, ceilings: &[AutoBidCeiling]) -> Resolution {
    let mut ranked: Vec<&AutoBidCeiling> = ceilings.iter().filter(|c| c.active).collect();
    ranked.sort_by_key(|c| (Reverse(c.max_amount), c.registered_at, c.sequence));

    match ranked.as_slice() {
        [] => Resolution {
            amount: starting_price,
            holder: None,
        },
        [only] => Resolution {
            amount: starting_price,
            holder: Some(only.bidder),
        },
        [top, second, ..] => {
            let pushed = second.max_amount.saturating_add(step);
            let amount = top.max_amount.min(pushed).max(starting_price);
            Resolution {
                amount,
                holder: Some(top.bidder),
            }
        }
    }
}
