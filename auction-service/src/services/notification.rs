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

use crate::model::{AuctionId, Money, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    Outbid {
        auction_id: AuctionId,
        recipient: UserId,
        new_amount: Money,
    },
    NewBid {
        auction_id: AuctionId,
        recipients: BTreeSet<UserId>,
        bidder_name: String,
        amount: Money,
    },
    EndingSoon {
        auction_id: AuctionId,
        recipients: BTreeSet<UserId>,
    },
    Started {
        auction_id: AuctionId,
    },
    Won {
        auction_id: AuctionId,
        winner_id: UserId,
        amount: Money,
    },
    EndedWithoutBids {
        auction_id: AuctionId,
    },
    Sold {
        auction_id: AuctionId,
        winner_id: UserId,
        amount: Money,
    },
    Cancelled {
        auction_id: AuctionId,
    },
}

impl AuctionEvent {
    pub fn auction_id(&self) -> AuctionId {
        match self {
            AuctionEvent::Outbid { auction_id, .. }
            | AuctionEvent::NewBid { auction_id, .. }
            | AuctionEvent::EndingSoon { auction_id, .. }
            | AuctionEvent::Started { auction_id }
            | AuctionEvent::Won { auction_id, .. }
            | AuctionEvent::EndedWithoutBids { auction_id }
            | AuctionEvent::Sold { auction_id, .. }
            | AuctionEvent::Cancelled { auction_id } => *auction_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuctionEvent::Outbid { .. } => "outbid",
            AuctionEvent::NewBid { .. } => "new_bid",
            AuctionEvent::EndingSoon { .. } => "ending_soon",
            AuctionEvent::Started { .. } => "started",
            AuctionEvent::Won { .. } => "won",
            AuctionEvent::EndedWithoutBids { .. } => "ended_without_bids",
            AuctionEvent::Sold { .. } => "sold",
            AuctionEvent::Cancelled { .. } => "cancelled",
        }
    }
}

/// Delivery of auction events to interested users. Delivery is fire and forget,
/// a failing channel never fails the operation that produced the event.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: AuctionEvent);
}

pub struct BroadcastNotificationDispatcher {
    sender: broadcast::Sender<AuctionEvent>,
}

impl BroadcastNotificationDispatcher {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastNotificationDispatcher {
    async fn dispatch(&self, event: AuctionEvent) {
        info!(
            auction_id = %event.auction_id(),
            event = event.kind(),
            "Dispatching auction notification"
        );
        if self.sender.send(event).is_err() {
            debug!("No notification subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use test_r::test;

    #[test]
    async fn subscribers_receive_dispatched_events() {
        let dispatcher = BroadcastNotificationDispatcher::new(8);
        let mut receiver = dispatcher.subscribe();
        let auction_id = AuctionId::new();

        dispatcher
            .dispatch(AuctionEvent::Started { auction_id })
            .await;

        let_assert!(Ok(event) = receiver.recv().await);
        check!(event == AuctionEvent::Started { auction_id });
    }

    #[test]
    async fn dispatch_without_subscribers_does_not_fail() {
        let dispatcher = BroadcastNotificationDispatcher::new(8);
        dispatcher
            .dispatch(AuctionEvent::Cancelled {
                auction_id: AuctionId::new(),
            })
            .await;
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = AuctionEvent::EndedWithoutBids {
            auction_id: AuctionId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        check!(json["type"] == "ended_without_bids");
    }
}
