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

use crate::config::{AuctionServiceConfig, FeedConfig, StoreConfig, TimerConfig};
use crate::repo::AuctionRepo;
use crate::repo::memory::InMemoryAuctionRepo;
use crate::repo::sqlite::SqliteAuctionRepo;
use crate::services::auction::AuctionService;
use crate::services::bid::BidService;
use crate::services::feed::{AuctionFeed, PollingAuctionFeed, PushAuctionFeed};
use crate::services::notification::{BroadcastNotificationDispatcher, NotificationDispatcher};
use crate::services::payment_gate::PaymentGate;
use crate::services::reconciler::AuctionStatusReconciler;
use crate::services::timer::AuctionTimerService;
use crate::voice::VoiceBidHandler;
use auction_common::clock::{Clock, SystemClock};
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub auction_repo: Arc<dyn AuctionRepo>,
    pub clock: Arc<dyn Clock>,
    pub notifications: Arc<BroadcastNotificationDispatcher>,
    pub auction_service: Arc<AuctionService>,
    pub bid_service: Arc<BidService>,
    pub reconciler: Arc<AuctionStatusReconciler>,
    pub payment_gate: Arc<PaymentGate>,
    pub voice_bid_handler: Arc<VoiceBidHandler>,
    pub feed: Arc<dyn AuctionFeed>,
    pub timer_config: TimerConfig,
}

impl Services {
    pub async fn new(config: &AuctionServiceConfig) -> Result<Self, anyhow::Error> {
        let channel_capacity = config.notifications.channel_capacity;

        let auction_repo: Arc<dyn AuctionRepo> = match &config.store {
            StoreConfig::InMemory => Arc::new(InMemoryAuctionRepo::logged(channel_capacity)),
            StoreConfig::Sqlite(sqlite) => {
                Arc::new(SqliteAuctionRepo::logged(sqlite, channel_capacity).await?)
            }
        };

        Ok(Self::make_with_repo(config, auction_repo, Arc::new(SystemClock)))
    }

    /// Builds every service on top of an already constructed store and clock.
    pub fn make_with_repo(
        config: &AuctionServiceConfig,
        auction_repo: Arc<dyn AuctionRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let max_attempts = config.bidding.max_attempts;

        let notifications = Arc::new(BroadcastNotificationDispatcher::new(
            config.notifications.channel_capacity,
        ));
        let dispatcher: Arc<dyn NotificationDispatcher> = notifications.clone();

        let auction_service = Arc::new(AuctionService::new(
            auction_repo.clone(),
            clock.clone(),
            max_attempts,
        ));

        let bid_service = Arc::new(BidService::new(
            auction_repo.clone(),
            dispatcher.clone(),
            clock.clone(),
            config.bidding.clone(),
        ));

        let reconciler = Arc::new(AuctionStatusReconciler::new(
            auction_repo.clone(),
            dispatcher,
            clock.clone(),
            config.reconciler.clone(),
            max_attempts,
        ));

        let payment_gate = Arc::new(PaymentGate::new(auction_repo.clone()));

        let voice_bid_handler = Arc::new(VoiceBidHandler::new(bid_service.clone()));

        let feed: Arc<dyn AuctionFeed> = match &config.feed {
            FeedConfig::Push => Arc::new(PushAuctionFeed::new(
                auction_repo.clone(),
                config.notifications.channel_capacity,
            )),
            FeedConfig::Polling(polling) => Arc::new(PollingAuctionFeed::new(
                auction_repo.clone(),
                polling.interval,
                config.notifications.channel_capacity,
            )),
        };

        Self {
            auction_repo,
            clock,
            notifications,
            auction_service,
            bid_service,
            reconciler,
            payment_gate,
            voice_bid_handler,
            feed,
            timer_config: config.timer.clone(),
        }
    }

    /// Creates a countdown service for one client context, kept up to date by
    /// its own change feed subscription.
    pub fn timer(&self) -> AuctionTimerService {
        let timer = AuctionTimerService::new(self.clock.clone(), &self.timer_config);
        timer.follow(self.feed.subscribe());
        timer
    }
}
