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

use crate::model::{AuctionId, AuctionProperty};
use crate::repo::AuctionRepo;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

/// A stream of auction records as they change in the store. Dropping the
/// subscription stops the task feeding it.
pub struct AuctionSubscription {
    receiver: mpsc::Receiver<AuctionProperty>,
    task: JoinHandle<()>,
}

impl AuctionSubscription {
    pub async fn recv(&mut self) -> Option<AuctionProperty> {
        self.receiver.recv().await
    }
}

impl Drop for AuctionSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub trait AuctionFeed: Send + Sync {
    fn subscribe(&self) -> AuctionSubscription;
}

/// Forwards records whose revision is newer than the last one seen for the same
/// auction. Returns false once the subscriber is gone.
async fn forward(
    sender: &mpsc::Sender<AuctionProperty>,
    seen: &mut HashMap<AuctionId, u64>,
    auction: AuctionProperty,
) -> bool {
    let is_newer = seen
        .get(&auction.id)
        .is_none_or(|revision| auction.revision > *revision);
    if is_newer {
        seen.insert(auction.id, auction.revision);
        sender.send(auction).await.is_ok()
    } else {
        true
    }
}

async fn forward_all(
    sender: &mpsc::Sender<AuctionProperty>,
    seen: &mut HashMap<AuctionId, u64>,
    auctions: Vec<AuctionProperty>,
) -> bool {
    for auction in auctions {
        if !forward(sender, seen, auction).await {
            return false;
        }
    }
    true
}

/// Feed driven by the store's own change notifications. If the subscriber falls
/// behind the notification buffer it resynchronizes with a full listing.
pub struct PushAuctionFeed {
    auction_repo: Arc<dyn AuctionRepo>,
    buffer: usize,
}

impl PushAuctionFeed {
    pub fn new(auction_repo: Arc<dyn AuctionRepo>, buffer: usize) -> Self {
        Self {
            auction_repo,
            buffer: buffer.max(1),
        }
    }
}

impl AuctionFeed for PushAuctionFeed {
    fn subscribe(&self) -> AuctionSubscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        // Subscribing before spawning so no change after this call is missed
        let mut changes = BroadcastStream::new(self.auction_repo.changes());
        let auction_repo = self.auction_repo.clone();

        let task = tokio::spawn(async move {
            let mut seen = HashMap::new();
            while let Some(change) = changes.next().await {
                let delivered = match change {
                    Ok(auction) => forward(&sender, &mut seen, auction).await,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auction change feed lagged, resynchronizing");
                        match auction_repo.list().await {
                            Ok(auctions) => forward_all(&sender, &mut seen, auctions).await,
                            Err(err) => {
                                warn!("Failed to resynchronize auction change feed: {err}");
                                true
                            }
                        }
                    }
                };
                if !delivered {
                    break;
                }
            }
            debug!("Auction change feed subscription finished");
        });

        AuctionSubscription { receiver, task }
    }
}

/// Feed for stores without change notifications: lists every auction on a fixed
/// interval and forwards the records whose revision moved. The first poll
/// delivers every stored auction.
pub struct PollingAuctionFeed {
    auction_repo: Arc<dyn AuctionRepo>,
    interval: Duration,
    buffer: usize,
}

impl PollingAuctionFeed {
    pub fn new(auction_repo: Arc<dyn AuctionRepo>, interval: Duration, buffer: usize) -> Self {
        Self {
            auction_repo,
            interval,
            buffer: buffer.max(1),
        }
    }
}

impl AuctionFeed for PollingAuctionFeed {
    fn subscribe(&self) -> AuctionSubscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let auction_repo = self.auction_repo.clone();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut seen = HashMap::new();
            loop {
                match auction_repo.list().await {
                    Ok(auctions) => {
                        if !forward_all(&sender, &mut seen, auctions).await {
                            break;
                        }
                    }
                    Err(err) => warn!("Failed to poll auctions: {err}"),
                }
                tokio::time::sleep(interval).await;
            }
            debug!("Auction polling feed subscription finished");
        });

        AuctionSubscription { receiver, task }
    }
}
