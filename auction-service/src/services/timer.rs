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

use super::feed::AuctionSubscription;
use crate::config::TimerConfig;
use crate::model::{AuctionId, AuctionProperty, AuctionStatus};
use auction_common::clock::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerDisplay {
    StartingIn(Duration),
    EndsIn(Duration),
    Ended,
    Sold,
    Cancelled,
}

fn bucket(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let secs = duration.as_secs();
    if secs >= DAY {
        format!("{}d", secs / DAY)
    } else if secs >= HOUR {
        format!("{}h", secs / HOUR)
    } else if secs >= MINUTE {
        format!("{}m", secs / MINUTE)
    } else {
        format!("{secs}s")
    }
}

impl Display for TimerDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerDisplay::StartingIn(remaining) => write!(f, "starting in {}", bucket(*remaining)),
            TimerDisplay::EndsIn(remaining) => write!(f, "ends in {}", bucket(*remaining)),
            TimerDisplay::Ended => write!(f, "ended"),
            TimerDisplay::Sold => write!(f, "sold"),
            TimerDisplay::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub auction_id: AuctionId,
    pub status: AuctionStatus,
    /// Time until the next lifecycle boundary; zero once the auction is over.
    pub remaining: Duration,
    pub display: TimerDisplay,
    pub computed_at: DateTime<Utc>,
}

pub fn compute_snapshot(auction: &AuctionProperty, now: DateTime<Utc>) -> TimerSnapshot {
    let status = auction.derived_status(now);
    let (remaining, display) = match status {
        AuctionStatus::Upcoming => {
            let remaining = auction.time_until_start(now);
            (remaining, TimerDisplay::StartingIn(remaining))
        }
        AuctionStatus::Active => {
            let remaining = auction.time_until_end(now);
            (remaining, TimerDisplay::EndsIn(remaining))
        }
        AuctionStatus::Ended => (Duration::ZERO, TimerDisplay::Ended),
        AuctionStatus::Sold => (Duration::ZERO, TimerDisplay::Sold),
        AuctionStatus::Cancelled => (Duration::ZERO, TimerDisplay::Cancelled),
    };

    TimerSnapshot {
        auction_id: auction.id,
        status,
        remaining,
        display,
        computed_at: now,
    }
}

pub type TimerSnapshots = BTreeMap<AuctionId, TimerSnapshot>;

#[derive(Default)]
struct TimerState {
    observed: HashMap<AuctionId, AuctionProperty>,
    ticker: Option<JoinHandle<()>>,
    follower: Option<JoinHandle<()>>,
}

struct TimerInner {
    clock: Arc<dyn Clock>,
    tick: Duration,
    state: Mutex<TimerState>,
    snapshots: watch::Sender<TimerSnapshots>,
}

impl TimerInner {
    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self) {
        let now = self.clock.now();
        let snapshots: TimerSnapshots = {
            let state = self.lock_state();
            state
                .observed
                .values()
                .map(|auction| (auction.id, compute_snapshot(auction, now)))
                .collect()
        };
        self.snapshots.send_replace(snapshots);
    }

    fn spawn_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let inner: Weak<TimerInner> = Arc::downgrade(self);
        let tick = self.tick;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                match inner.upgrade() {
                    Some(inner) => inner.publish(),
                    None => break,
                }
            }
        })
    }

    fn refresh(&self, auction: AuctionProperty) -> bool {
        let replaced = {
            let mut state = self.lock_state();
            match state.observed.get_mut(&auction.id) {
                Some(current) if auction.revision >= current.revision => {
                    *current = auction;
                    true
                }
                _ => false,
            }
        };
        if replaced {
            self.publish();
        }
        replaced
    }
}

/// Live countdowns for the set of auctions a single client context is looking at.
///
/// The ticking task only exists while at least one auction is observed. The
/// service never writes to the store; observed records are replaced through
/// `refresh` or by following a change feed subscription.
pub struct AuctionTimerService {
    inner: Arc<TimerInner>,
}

impl AuctionTimerService {
    pub fn new(clock: Arc<dyn Clock>, config: &TimerConfig) -> Self {
        let (snapshots, _) = watch::channel(TimerSnapshots::new());
        Self {
            inner: Arc::new(TimerInner {
                clock,
                tick: config.tick.max(Duration::from_millis(1)),
                state: Mutex::new(TimerState::default()),
                snapshots,
            }),
        }
    }

    pub fn observe(&self, auction: AuctionProperty) {
        {
            let mut state = self.lock_state();
            debug!(auction_id = %auction.id, "Observing auction countdown");
            state.observed.insert(auction.id, auction);
            let running = state
                .ticker
                .as_ref()
                .is_some_and(|ticker| !ticker.is_finished());
            if !running {
                state.ticker = Some(self.inner.spawn_ticker());
            }
        }
        self.inner.publish();
    }

    /// Replaces an observed record with a newer revision. Records of auctions
    /// which are not observed are ignored.
    pub fn refresh(&self, auction: AuctionProperty) -> bool {
        self.inner.refresh(auction)
    }

    pub fn unobserve(&self, auction_id: AuctionId) {
        {
            let mut state = self.lock_state();
            state.observed.remove(&auction_id);
            if state.observed.is_empty()
                && let Some(ticker) = state.ticker.take()
            {
                debug!("No auctions observed, stopping countdown ticker");
                ticker.abort();
            }
        }
        self.inner.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshots> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self, auction_id: AuctionId) -> Option<TimerSnapshot> {
        self.inner.snapshots.borrow().get(&auction_id).cloned()
    }

    /// Recomputes every observed countdown immediately.
    pub fn tick(&self) {
        self.inner.publish();
    }

    pub fn is_ticking(&self) -> bool {
        self.lock_state()
            .ticker
            .as_ref()
            .is_some_and(|ticker| !ticker.is_finished())
    }

    /// Keeps observed records up to date from a change feed subscription,
    /// replacing any previously followed subscription.
    pub fn follow(&self, mut subscription: AuctionSubscription) {
        let inner = Arc::downgrade(&self.inner);
        let follower = tokio::spawn(async move {
            while let Some(auction) = subscription.recv().await {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.refresh(auction);
            }
        });

        if let Some(previous) = self.lock_state().follower.replace(follower) {
            previous.abort();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.inner.lock_state()
    }
}

impl Drop for AuctionTimerService {
    fn drop(&mut self) {
        let mut state = self.lock_state();
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        if let Some(follower) = state.follower.take() {
            follower.abort();
        }
    }
}
