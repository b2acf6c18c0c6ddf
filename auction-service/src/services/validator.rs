// Copyright 2024-2025 Golem Cloud
//
// Licensed under the Golem Source License v1.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://license.golem.cloud/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::model::{AuctionProperty, AuctionStatus, Bid, Money, UserId};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposedBid {
    pub bidder_id: UserId,
    pub bidder_name: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    AuctionNotActive { status: AuctionStatus },
    BidTooLow { current_bid: Money },
    BidTooHigh { max_bid: Money },
    AlreadyHighestBidder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accept {
        updated: Box<AuctionProperty>,
        bid: Bid,
    },
    Reject(RejectReason),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BidRules {
    pub allow_self_outbid: bool,
}

/// Checks a proposed bid against the auction snapshot it was read from.
///
/// Rules are evaluated in order and the first failing one decides the rejection:
/// the auction must be active at `now`, the amount must exceed the current bid
/// without going over `Money::MAX`, and (unless `rules.allow_self_outbid`) the bidder must not already be the
/// highest bidder. On acceptance the returned snapshot has the bid appended and
/// its economic fields updated; revision and everything else are left untouched.
pub fn validate(
    current: &AuctionProperty,
    proposed: &ProposedBid,
    now: DateTime<Utc>,
    rules: BidRules,
) -> ValidationOutcome {
    let status = current.derived_status(now);
    let in_window = now >= current.auction_start_time && now < current.auction_end_time;
    if status != AuctionStatus::Active || !in_window {
        return ValidationOutcome::Reject(RejectReason::AuctionNotActive { status });
    }

    if proposed.amount <= current.current_bid {
        return ValidationOutcome::Reject(RejectReason::BidTooLow {
            current_bid: current.current_bid,
        });
    }

    if proposed.amount > Money::MAX {
        return ValidationOutcome::Reject(RejectReason::BidTooHigh {
            max_bid: Money::MAX,
        });
    }

    if !rules.allow_self_outbid
        && current.highest_bidder_id.as_ref() == Some(&proposed.bidder_id)
    {
        return ValidationOutcome::Reject(RejectReason::AlreadyHighestBidder);
    }

    let bid = Bid {
        auction_id: current.id,
        sequence: current.bid_history.len() as u64,
        bidder_id: proposed.bidder_id.clone(),
        bidder_name: proposed.bidder_name.clone(),
        amount: proposed.amount,
        placed_at: now,
    };

    let mut updated = current.clone();
    updated.current_bid = proposed.amount;
    updated.highest_bidder_id = Some(proposed.bidder_id.clone());
    updated.highest_bidder_name = Some(proposed.bidder_name.clone());
    updated.bid_history.push(bid.clone());

    ValidationOutcome::Accept {
        updated: Box::new(updated),
        bid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuctionId, NewListing};
    use assert2::{check, let_assert};
    use chrono::{TimeDelta, TimeZone};
    use test_r::test;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn auction() -> AuctionProperty {
        AuctionProperty::from_listing(
            AuctionId::new(),
            NewListing {
                title: "Townhouse".to_string(),
                address: "12 Elm St".to_string(),
                seller_id: UserId::from("seller"),
                starting_price: Money::from_major_units(100_000),
                auction_start_time: start(),
                auction_end_time: start() + TimeDelta::hours(1),
            },
        )
    }

    fn proposal(bidder: &str, amount: u64) -> ProposedBid {
        ProposedBid {
            bidder_id: UserId::from(bidder),
            bidder_name: bidder.to_uppercase(),
            amount: Money::from_major_units(amount),
        }
    }

    #[test]
    fn accepts_higher_bid_and_updates_economic_fields() {
        let current = auction();
        let now = start() + TimeDelta::minutes(5);

        let outcome = validate(&current, &proposal("alice", 150_000), now, BidRules::default());

        let_assert!(ValidationOutcome::Accept { updated, bid } = outcome);
        check!(bid.sequence == 0);
        check!(bid.placed_at == now);
        check!(updated.current_bid == Money::from_major_units(150_000));
        check!(updated.highest_bidder_id == Some(UserId::from("alice")));
        check!(updated.highest_bidder_name.as_deref() == Some("ALICE"));
        check!(updated.bid_history == vec![bid]);
        check!(updated.revision == current.revision);
    }

    #[test]
    fn rejects_bid_equal_to_current() {
        let outcome = validate(
            &auction(),
            &proposal("alice", 100_000),
            start() + TimeDelta::minutes(5),
            BidRules::default(),
        );

        check!(
            outcome
                == ValidationOutcome::Reject(RejectReason::BidTooLow {
                    current_bid: Money::from_major_units(100_000)
                })
        );
    }

    #[test]
    fn rejects_amount_above_maximum() {
        let now = start() + TimeDelta::minutes(5);
        let oversized = ProposedBid {
            amount: Money::from_minor_units(u64::MAX),
            ..proposal("alice", 0)
        };

        let outcome = validate(&auction(), &oversized, now, BidRules::default());
        check!(
            outcome
                == ValidationOutcome::Reject(RejectReason::BidTooHigh {
                    max_bid: Money::MAX
                })
        );

        let at_limit = ProposedBid {
            amount: Money::MAX,
            ..proposal("alice", 0)
        };
        let_assert!(
            ValidationOutcome::Accept { updated, .. } =
                validate(&auction(), &at_limit, now, BidRules::default())
        );
        check!(updated.current_bid == Money::MAX);
    }

    #[test]
    fn rejects_before_start_and_at_close() {
        let current = auction();

        let early = validate(
            &current,
            &proposal("alice", 150_000),
            start() - TimeDelta::seconds(1),
            BidRules::default(),
        );
        check!(
            early
                == ValidationOutcome::Reject(RejectReason::AuctionNotActive {
                    status: AuctionStatus::Upcoming
                })
        );

        let at_close = validate(
            &current,
            &proposal("alice", 150_000),
            current.auction_end_time,
            BidRules::default(),
        );
        check!(
            at_close
                == ValidationOutcome::Reject(RejectReason::AuctionNotActive {
                    status: AuctionStatus::Ended
                })
        );
    }

    #[test]
    fn rejects_cancelled_auction_inside_its_window() {
        let mut current = auction();
        current.status = AuctionStatus::Cancelled;

        let outcome = validate(
            &current,
            &proposal("alice", 150_000),
            start() + TimeDelta::minutes(5),
            BidRules::default(),
        );
        check!(
            outcome
                == ValidationOutcome::Reject(RejectReason::AuctionNotActive {
                    status: AuctionStatus::Cancelled
                })
        );
    }

    #[test]
    fn inactive_takes_precedence_over_low_amount() {
        let mut current = auction();
        current.status = AuctionStatus::Ended;

        let outcome = validate(
            &current,
            &proposal("alice", 1),
            start() + TimeDelta::minutes(5),
            BidRules::default(),
        );
        let_assert!(
            ValidationOutcome::Reject(RejectReason::AuctionNotActive { .. }) = outcome
        );
    }

    #[test]
    fn self_outbid_is_configurable() {
        let now = start() + TimeDelta::minutes(5);
        let_assert!(
            ValidationOutcome::Accept { updated, .. } =
                validate(&auction(), &proposal("alice", 150_000), now, BidRules::default())
        );

        let enforced = validate(&updated, &proposal("alice", 160_000), now, BidRules::default());
        check!(enforced == ValidationOutcome::Reject(RejectReason::AlreadyHighestBidder));

        let relaxed = validate(
            &updated,
            &proposal("alice", 160_000),
            now,
            BidRules {
                allow_self_outbid: true,
            },
        );
        let_assert!(ValidationOutcome::Accept { bid, .. } = relaxed);
        check!(bid.sequence == 1);
    }
}
