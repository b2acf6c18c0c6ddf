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

use crate::repo::Deps;
use crate::{TestServices, t0, two_hour_listing};
use assert2::{check, let_assert};
use auction_service::model::{
    AuctionId, AuctionProperty, AuctionStatus, Bid, Money, PaymentStatus, UserId,
};
use auction_service::repo::AuctionRepoError;
use auction_service::services::ErrorCategory;
use auction_service::services::auction::AuctionError;
use auction_service::services::bid::BidError;
use chrono::TimeDelta;
use std::time::Duration;

// Common test cases -------------------------------------------------------------------------------

pub fn sample_auction() -> AuctionProperty {
    AuctionProperty::from_listing(
        AuctionId::new(),
        two_hour_listing(Money::from_major_units(250_000)),
    )
}

fn bid(auction: &AuctionProperty, bidder: &str, major_units: u64, minutes: i64) -> Bid {
    Bid {
        auction_id: auction.id,
        sequence: auction.bid_history.len() as u64,
        bidder_id: UserId::from(bidder),
        bidder_name: bidder.to_uppercase(),
        amount: Money::from_major_units(major_units),
        placed_at: t0() + TimeDelta::minutes(minutes),
    }
}

fn with_bid(auction: &AuctionProperty, bidder: &str, major_units: u64, minutes: i64) -> AuctionProperty {
    let bid = bid(auction, bidder, major_units, minutes);
    let mut updated = auction.clone();
    updated.current_bid = bid.amount;
    updated.highest_bidder_id = Some(bid.bidder_id.clone());
    updated.highest_bidder_name = Some(bid.bidder_name.clone());
    updated.bid_history.push(bid);
    updated
}

pub async fn test_create_and_get(deps: &Deps) {
    let auction = sample_auction();

    let created = deps.repo.create(auction.clone()).await.unwrap();
    check!(created == auction);
    check!(created.revision == 0);

    let_assert!(Some(fetched) = deps.repo.get(auction.id).await.unwrap());
    check!(fetched == created);

    let duplicate = deps.repo.create(auction.clone()).await;
    let_assert!(Err(AuctionRepoError::AlreadyExists(id)) = duplicate);
    check!(id == auction.id);

    check!(deps.repo.get(AuctionId::new()).await.unwrap().is_none());
}

pub async fn test_update_is_conditional_on_revision(deps: &Deps) {
    let created = deps.repo.create(sample_auction()).await.unwrap();

    let mut changed = created.clone();
    changed.status = AuctionStatus::Active;
    let updated = deps.repo.update(changed.clone()).await.unwrap();
    check!(updated.revision == 1);
    check!(updated.status == AuctionStatus::Active);

    // A writer still holding revision 0 lost the race
    let stale = deps.repo.update(changed).await;
    let_assert!(Err(AuctionRepoError::ConcurrentModification) = stale);

    let_assert!(Some(fetched) = deps.repo.get(created.id).await.unwrap());
    check!(fetched == updated);

    let missing = deps.repo.update(sample_auction()).await;
    let_assert!(Err(AuctionRepoError::NotFound(_)) = missing);
}

pub async fn test_bids_and_watchers_are_stored(deps: &Deps) {
    let created = deps.repo.create(sample_auction()).await.unwrap();

    let mut first = with_bid(&created, "alice", 260_000, 5);
    first.watchlist_users.insert(UserId::from("carol"));
    first.watchlist_users.insert(UserId::from("dave"));
    let first = deps.repo.update(first).await.unwrap();

    let mut second = with_bid(&first, "bob", 275_000, 9);
    second.watchlist_users.remove(&UserId::from("dave"));
    let second = deps.repo.update(second).await.unwrap();

    let_assert!(Some(fetched) = deps.repo.get(created.id).await.unwrap());
    check!(fetched == second);
    check!(fetched.bid_history.len() == 2);
    check!(fetched.bid_history[0].sequence == 0);
    check!(fetched.bid_history[1].amount == Money::from_major_units(275_000));
    check!(fetched.highest_bidder_id == Some(UserId::from("bob")));
    check!(fetched.watchlist_users.len() == 1);
    check!(fetched.watchlist_users.contains(&UserId::from("carol")));
}

pub async fn test_list_won_by(deps: &Deps) {
    let winner = UserId(format!("winner-{}", AuctionId::new()));

    let pending = deps.repo.create(sample_auction()).await.unwrap();
    let mut pending_won = pending.clone();
    pending_won.status = AuctionStatus::Ended;
    pending_won.winner_id = Some(winner.clone());
    pending_won.payment_status = PaymentStatus::Pending;
    let pending_won = deps.repo.update(pending_won).await.unwrap();

    let other = deps.repo.create(sample_auction()).await.unwrap();
    let mut other_won = other.clone();
    other_won.status = AuctionStatus::Ended;
    other_won.winner_id = Some(UserId::from("somebody-else"));
    other_won.payment_status = PaymentStatus::Pending;
    deps.repo.update(other_won).await.unwrap();

    let won = deps.repo.list_won_by(&winner).await.unwrap();
    check!(won == vec![pending_won]);

    let nobody = deps
        .repo
        .list_won_by(&UserId::from("never-bid"))
        .await
        .unwrap();
    check!(nobody.is_empty());
}

pub async fn test_changes_are_published(deps: &Deps) {
    let mut changes = deps.repo.changes();

    let created = deps.repo.create(sample_auction()).await.unwrap();
    let mut changed = created.clone();
    changed.title = "Harbour view penthouse".to_string();
    let updated = deps.repo.update(changed).await.unwrap();

    let mut received = Vec::new();
    while received.len() < 2 {
        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap()
            .unwrap();
        if change.id == created.id {
            received.push(change);
        }
    }

    check!(received == vec![created, updated]);
}

pub async fn test_concurrent_updates_of_same_revision(deps: &Deps) {
    let created = deps.repo.create(sample_auction()).await.unwrap();

    let first = with_bid(&created, "alice", 300_000, 10);
    let second = with_bid(&created, "bob", 310_000, 10);

    let (first, second) = tokio::join!(deps.repo.update(first), deps.repo.update(second));
    let succeeded = [first.is_ok(), second.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    check!(succeeded == 1);

    let_assert!(Some(fetched) = deps.repo.get(created.id).await.unwrap());
    check!(fetched.revision == 1);
    check!(fetched.bid_history.len() == 1);
}

pub async fn test_amounts_beyond_store_range_are_rejected(deps: &Deps) {
    let test = TestServices::with_repo(deps.repo.clone(), t0() + TimeDelta::minutes(10));
    let services = &test.services;

    let oversized_listing = services
        .auction_service
        .create_listing(two_hour_listing(Money::from_minor_units(u64::MAX)))
        .await;
    let_assert!(Err(AuctionError::InvalidListing(_)) = oversized_listing);

    let auction = services
        .auction_service
        .create_listing(two_hour_listing(Money::from_major_units(250_000)))
        .await
        .unwrap();

    let oversized_bid = services
        .bid_service
        .submit_bid(
            auction.id,
            UserId::from("alice"),
            "Alice".to_string(),
            Money::from_minor_units(u64::MAX),
        )
        .await;
    let_assert!(Err(err) = oversized_bid);
    check!(err.category() == ErrorCategory::Validation);
    let_assert!(BidError::BidTooHigh { max_bid } = err);
    check!(max_bid == Money::MAX);

    let_assert!(Some(untouched) = deps.repo.get(auction.id).await.unwrap());
    check!(untouched.bid_history.is_empty());
    check!(untouched.revision == auction.revision);

    let bid = services
        .bid_service
        .submit_bid(auction.id, UserId::from("alice"), "Alice".to_string(), Money::MAX)
        .await
        .unwrap();
    check!(bid.amount == Money::MAX);

    let_assert!(Some(stored) = deps.repo.get(auction.id).await.unwrap());
    check!(stored.current_bid == Money::MAX);
    check!(stored.bid_history.len() == 1);
}
