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

use auction_common::SafeDisplay;
use auction_common::config::{ConfigExample, ConfigLoader, DbSqliteConfig, HasConfigExamples};
use auction_common::tracing::TracingConfig;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionServiceConfig {
    pub tracing: TracingConfig,
    pub http_port: u16,
    pub store: StoreConfig,
    pub bidding: BiddingConfig,
    pub timer: TimerConfig,
    pub reconciler: ReconcilerConfig,
    pub feed: FeedConfig,
    pub notifications: NotificationsConfig,
}

impl SafeDisplay for AuctionServiceConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "tracing:");
        let _ = writeln!(&mut result, "{}", self.tracing.to_safe_string_indented());
        let _ = writeln!(&mut result, "HTTP port: {}", self.http_port);
        let _ = writeln!(&mut result, "store:");
        let _ = writeln!(&mut result, "{}", self.store.to_safe_string_indented());
        let _ = writeln!(&mut result, "bidding:");
        let _ = writeln!(&mut result, "{}", self.bidding.to_safe_string_indented());
        let _ = writeln!(&mut result, "timer:");
        let _ = writeln!(&mut result, "{}", self.timer.to_safe_string_indented());
        let _ = writeln!(&mut result, "reconciler:");
        let _ = writeln!(
            &mut result,
            "{}",
            self.reconciler.to_safe_string_indented()
        );
        let _ = writeln!(&mut result, "feed:");
        let _ = writeln!(&mut result, "{}", self.feed.to_safe_string_indented());
        let _ = writeln!(&mut result, "notifications:");
        let _ = writeln!(
            &mut result,
            "{}",
            self.notifications.to_safe_string_indented()
        );
        result
    }
}

impl Default for AuctionServiceConfig {
    fn default() -> Self {
        Self {
            tracing: TracingConfig::local_dev("auction-service"),
            http_port: 8090,
            store: StoreConfig::InMemory,
            bidding: BiddingConfig::default(),
            timer: TimerConfig::default(),
            reconciler: ReconcilerConfig::default(),
            feed: FeedConfig::Push,
            notifications: NotificationsConfig::default(),
        }
    }
}

impl HasConfigExamples<AuctionServiceConfig> for AuctionServiceConfig {
    fn examples() -> Vec<ConfigExample<AuctionServiceConfig>> {
        vec![
            (
                "with sqlite store",
                Self {
                    store: StoreConfig::Sqlite(DbSqliteConfig::default()),
                    ..Self::default()
                },
            ),
            (
                "with polling change feed",
                Self {
                    feed: FeedConfig::Polling(FeedPollingConfig::default()),
                    ..Self::default()
                },
            ),
        ]
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum StoreConfig {
    InMemory,
    Sqlite(DbSqliteConfig),
}

impl SafeDisplay for StoreConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        match self {
            StoreConfig::InMemory => {
                let _ = writeln!(&mut result, "in-memory");
            }
            StoreConfig::Sqlite(sqlite) => {
                let _ = writeln!(&mut result, "sqlite:");
                let _ = writeln!(&mut result, "{}", sqlite.to_safe_string_indented());
            }
        }
        result
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BiddingConfig {
    /// Total number of read-validate-write attempts before a conflict is reported.
    pub max_attempts: u32,
    pub allow_self_outbid: bool,
}

impl SafeDisplay for BiddingConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "max attempts: {}", self.max_attempts);
        let _ = writeln!(&mut result, "allow self outbid: {}", self.allow_self_outbid);
        result
    }
}

impl Default for BiddingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            allow_self_outbid: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
}

impl SafeDisplay for TimerConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "tick: {:?}", self.tick);
        result
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub ending_soon_threshold: Duration,
}

impl SafeDisplay for ReconcilerConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "interval: {:?}", self.interval);
        let _ = writeln!(
            &mut result,
            "ending soon threshold: {:?}",
            self.ending_soon_threshold
        );
        result
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            ending_soon_threshold: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum FeedConfig {
    Push,
    Polling(FeedPollingConfig),
}

impl SafeDisplay for FeedConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        match self {
            FeedConfig::Push => {
                let _ = writeln!(&mut result, "push");
            }
            FeedConfig::Polling(polling) => {
                let _ = writeln!(&mut result, "polling:");
                let _ = writeln!(&mut result, "{}", polling.to_safe_string_indented());
            }
        }
        result
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedPollingConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl SafeDisplay for FeedPollingConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "interval: {:?}", self.interval);
        result
    }
}

impl Default for FeedPollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Buffer size of the store change and notification broadcast channels.
    pub channel_capacity: usize,
}

impl SafeDisplay for NotificationsConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "channel capacity: {}", self.channel_capacity);
        result
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

pub fn make_config_loader() -> ConfigLoader<AuctionServiceConfig> {
    ConfigLoader::new_with_examples(Path::new("config/auction-service.toml"))
}
