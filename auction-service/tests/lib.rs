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

use auction_common::clock::ManualClock;
use auction_common::tracing::{TracingConfig, init_tracing_with_default_debug_env_filter};
use auction_service::bootstrap::Services;
use auction_service::config::AuctionServiceConfig;
use auction_service::model::{Money, NewListing, UserId};
use auction_service::repo::AuctionRepo;
use auction_service::repo::memory::InMemoryAuctionRepo;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::sync::Arc;
use test_r::test_dep;

mod repo;

test_r::enable!();

#[derive(Debug)]
pub struct Tracing;

impl Tracing {
    pub fn init() -> Self {
        init_tracing_with_default_debug_env_filter(&TracingConfig::test("auction-tests"));
        Self
    }
}

#[test_dep]
pub fn tracing() -> Tracing {
    Tracing::init()
}

/// Fixed reference instant; every scenario is expressed relative to it.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn listing(start: DateTime<Utc>, end: DateTime<Utc>, starting_price: Money) -> NewListing {
    NewListing {
        title: "Harbour view apartment".to_string(),
        address: "12 Quay Street".to_string(),
        seller_id: UserId::from("seller-1"),
        starting_price,
        auction_start_time: start,
        auction_end_time: end,
    }
}

/// A listing running from `t0` for two hours.
pub fn two_hour_listing(starting_price: Money) -> NewListing {
    listing(t0(), t0() + TimeDelta::hours(2), starting_price)
}

pub struct TestServices {
    pub services: Services,
    pub clock: Arc<ManualClock>,
}

impl TestServices {
    pub fn in_memory(now: DateTime<Utc>) -> Self {
        Self::with_repo(Arc::new(InMemoryAuctionRepo::logged(256)), now)
    }

    pub fn with_repo(repo: Arc<dyn AuctionRepo>, now: DateTime<Utc>) -> Self {
        Self::with_config(repo, now, &AuctionServiceConfig::default())
    }

    pub fn with_config(
        repo: Arc<dyn AuctionRepo>,
        now: DateTime<Utc>,
        config: &AuctionServiceConfig,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let services = Services::make_with_repo(config, repo, clock.clone());
        Self { services, clock }
    }
}
