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

use auction_common::newtype_uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::time::Duration;

newtype_uuid!(AuctionId);

/// Identity of a bidder, seller or watcher as supplied by the identity provider.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An amount of money in minor currency units (cents).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// Largest amount the stores can represent; bids and listings above it are rejected.
    pub const MAX: Money = Money(i64::MAX as u64);

    pub const fn from_minor_units(minor_units: u64) -> Self {
        Self(minor_units)
    }

    pub const fn from_major_units(major_units: u64) -> Self {
        Self(major_units.saturating_mul(100))
    }

    pub const fn minor_units(self) -> u64 {
        self.0
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let major = (self.0 / 100).to_string();
        let cents = self.0 % 100;

        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (idx, digit) in major.chars().enumerate() {
            if idx > 0 && (major.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        if cents == 0 {
            write!(f, "${grouped}")
        } else {
            write!(f, "${grouped}.{cents:02}")
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
    Sold,
    Cancelled,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    None,
    Pending,
    Paid,
}

/// An accepted bid. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub auction_id: AuctionId,
    /// Position in the auction's bid history; breaks ties between equal submission instants.
    pub sequence: u64,
    pub bidder_id: UserId,
    pub bidder_name: String,
    pub amount: Money,
    pub placed_at: DateTime<Utc>,
}

/// Seller provided data for a new auction listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub address: String,
    pub seller_id: UserId,
    pub starting_price: Money,
    pub auction_start_time: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionProperty {
    pub id: AuctionId,
    pub title: String,
    pub address: String,
    pub seller_id: UserId,
    pub starting_price: Money,
    pub auction_start_time: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
    pub current_bid: Money,
    pub highest_bidder_id: Option<UserId>,
    pub highest_bidder_name: Option<String>,
    pub status: AuctionStatus,
    pub winner_id: Option<UserId>,
    pub payment_status: PaymentStatus,
    pub bid_history: Vec<Bid>,
    pub watchlist_users: BTreeSet<UserId>,
    pub ending_soon_notified: bool,
    /// Incremented by the store on every successful write.
    pub revision: u64,
}

impl AuctionProperty {
    pub fn from_listing(id: AuctionId, listing: NewListing) -> Self {
        Self {
            id,
            title: listing.title,
            address: listing.address,
            seller_id: listing.seller_id,
            starting_price: listing.starting_price,
            auction_start_time: listing.auction_start_time,
            auction_end_time: listing.auction_end_time,
            current_bid: listing.starting_price,
            highest_bidder_id: None,
            highest_bidder_name: None,
            status: AuctionStatus::Upcoming,
            winner_id: None,
            payment_status: PaymentStatus::None,
            bid_history: Vec::new(),
            watchlist_users: BTreeSet::new(),
            ending_soon_notified: false,
            revision: 0,
        }
    }

    /// The lifecycle status implied by the auction's timestamps at `now`.
    ///
    /// The stored `status` is only trusted for states which cannot be derived from time:
    /// `ended`, `sold` and `cancelled` are kept as they are, while `upcoming` and `active`
    /// are recomputed from `auction_start_time` and `auction_end_time`.
    pub fn derived_status(&self, now: DateTime<Utc>) -> AuctionStatus {
        match self.status {
            AuctionStatus::Ended | AuctionStatus::Sold | AuctionStatus::Cancelled => self.status,
            AuctionStatus::Upcoming | AuctionStatus::Active => {
                if now >= self.auction_end_time {
                    AuctionStatus::Ended
                } else if now >= self.auction_start_time {
                    AuctionStatus::Active
                } else {
                    AuctionStatus::Upcoming
                }
            }
        }
    }

    pub fn last_bid(&self) -> Option<&Bid> {
        self.bid_history.last()
    }

    pub fn time_until_start(&self, now: DateTime<Utc>) -> Duration {
        (self.auction_start_time - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn time_until_end(&self, now: DateTime<Utc>) -> Duration {
        (self.auction_end_time - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Every user who placed at least one accepted bid.
    pub fn bidders(&self) -> BTreeSet<UserId> {
        self.bid_history
            .iter()
            .map(|bid| bid.bidder_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use chrono::{TimeDelta, TimeZone};
    use test_r::test;

    fn listing(start: DateTime<Utc>, end: DateTime<Utc>) -> AuctionProperty {
        AuctionProperty::from_listing(
            AuctionId::new(),
            NewListing {
                title: "Lakeside cottage".to_string(),
                address: "1 Shore Rd".to_string(),
                seller_id: UserId::from("seller"),
                starting_price: Money::from_major_units(100_000),
                auction_start_time: start,
                auction_end_time: end,
            },
        )
    }

    #[test]
    fn money_is_displayed_with_thousand_separators() {
        check!(Money::from_major_units(0).to_string() == "$0");
        check!(Money::from_major_units(950).to_string() == "$950");
        check!(Money::from_major_units(100_000).to_string() == "$100,000");
        check!(Money::from_major_units(1_250_000).to_string() == "$1,250,000");
        check!(Money::from_minor_units(150_050).to_string() == "$1,500.50");
    }

    #[test]
    fn status_is_derived_from_timestamps() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let end = start + TimeDelta::hours(2);
        let auction = listing(start, end);

        check!(auction.derived_status(start - TimeDelta::seconds(1)) == AuctionStatus::Upcoming);
        check!(auction.derived_status(start) == AuctionStatus::Active);
        check!(auction.derived_status(end - TimeDelta::seconds(1)) == AuctionStatus::Active);
        check!(auction.derived_status(end) == AuctionStatus::Ended);
    }

    #[test]
    fn terminal_stored_status_is_kept() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let mut auction = listing(start, start + TimeDelta::hours(2));
        auction.status = AuctionStatus::Cancelled;

        check!(auction.derived_status(start + TimeDelta::minutes(5)) == AuctionStatus::Cancelled);
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap();
        let end = start + TimeDelta::hours(2);
        let auction = listing(start, end);

        check!(auction.time_until_end(start) == Duration::from_secs(2 * 60 * 60));
        check!(auction.time_until_end(end + TimeDelta::hours(1)) == Duration::ZERO);
        check!(auction.time_until_start(end) == Duration::ZERO);
    }

    #[test]
    fn status_names_are_snake_case() {
        check!(AuctionStatus::Upcoming.to_string() == "upcoming");
        check!("cancelled".parse::<AuctionStatus>().unwrap() == AuctionStatus::Cancelled);
        check!(PaymentStatus::Pending.to_string() == "pending");
    }
}
