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

//! Wire representation of the auction API. Amounts are always in cents.

use crate::model::{AuctionProperty, Bid, Money, NewListing, UserId};
use crate::services::timer::TimerSnapshot;
use crate::voice::VoiceBidResponse;
use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct CreateAuctionRequest {
    pub title: String,
    pub address: String,
    pub seller_id: String,
    pub starting_price_cents: u64,
    pub auction_start_time: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
}

impl From<CreateAuctionRequest> for NewListing {
    fn from(value: CreateAuctionRequest) -> Self {
        Self {
            title: value.title,
            address: value.address,
            seller_id: UserId(value.seller_id),
            starting_price: Money::from_minor_units(value.starting_price_cents),
            auction_start_time: value.auction_start_time,
            auction_end_time: value.auction_end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub bidder_id: String,
    pub bidder_name: String,
    pub amount_cents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct VoiceBidRequest {
    pub bidder_id: String,
    pub bidder_name: String,
    /// Transcribed utterance, for example "bid 150 thousand"
    pub utterance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct VoiceBidResult {
    pub accepted: bool,
    pub message: String,
}

impl From<VoiceBidResponse> for VoiceBidResult {
    fn from(value: VoiceBidResponse) -> Self {
        Self {
            accepted: value.accepted,
            message: value.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub payer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    pub sequence: u64,
    pub bidder_id: String,
    pub bidder_name: String,
    pub amount_cents: u64,
    pub placed_at: DateTime<Utc>,
}

impl From<Bid> for BidView {
    fn from(value: Bid) -> Self {
        Self {
            sequence: value.sequence,
            bidder_id: value.bidder_id.0,
            bidder_name: value.bidder_name,
            amount_cents: value.amount.minor_units(),
            placed_at: value.placed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    pub id: Uuid,
    pub title: String,
    pub address: String,
    pub seller_id: String,
    pub starting_price_cents: u64,
    pub auction_start_time: DateTime<Utc>,
    pub auction_end_time: DateTime<Utc>,
    pub current_bid_cents: u64,
    pub highest_bidder_id: Option<String>,
    pub highest_bidder_name: Option<String>,
    /// Status as last written by the reconciler
    pub stored_status: String,
    /// Status derived from the auction timestamps at response time
    pub status: String,
    pub winner_id: Option<String>,
    pub payment_status: String,
    pub bid_history: Vec<BidView>,
    pub watchlist_users: Vec<String>,
    pub revision: u64,
}

impl AuctionView {
    pub fn new(auction: AuctionProperty, now: DateTime<Utc>) -> Self {
        let status = auction.derived_status(now).to_string();
        Self {
            id: auction.id.0,
            title: auction.title,
            address: auction.address,
            seller_id: auction.seller_id.0,
            starting_price_cents: auction.starting_price.minor_units(),
            auction_start_time: auction.auction_start_time,
            auction_end_time: auction.auction_end_time,
            current_bid_cents: auction.current_bid.minor_units(),
            highest_bidder_id: auction.highest_bidder_id.map(|id| id.0),
            highest_bidder_name: auction.highest_bidder_name,
            stored_status: auction.status.to_string(),
            status,
            winner_id: auction.winner_id.map(|id| id.0),
            payment_status: auction.payment_status.to_string(),
            bid_history: auction.bid_history.into_iter().map(BidView::from).collect(),
            watchlist_users: auction
                .watchlist_users
                .into_iter()
                .map(|user| user.0)
                .collect(),
            revision: auction.revision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct AuctionList {
    pub values: Vec<AuctionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct CountdownView {
    pub auction_id: Uuid,
    pub status: String,
    pub remaining_seconds: u64,
    /// Human readable countdown, for example "ends in 2m"
    pub display: String,
    pub computed_at: DateTime<Utc>,
}

impl From<TimerSnapshot> for CountdownView {
    fn from(value: TimerSnapshot) -> Self {
        Self {
            auction_id: value.auction_id.0,
            status: value.status.to_string(),
            remaining_seconds: value.remaining.as_secs(),
            display: value.display.to_string(),
            computed_at: value.computed_at,
        }
    }
}
