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

use super::{AuctionRepo, AuctionRepoError, LoggedAuctionRepo};
use crate::model::{AuctionId, AuctionProperty, PaymentStatus, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};

/// Auction store kept in process memory. Each auction sits behind its own lock,
/// the map lock is only held while looking up or inserting entries.
pub struct InMemoryAuctionRepo {
    auctions: RwLock<HashMap<AuctionId, Arc<Mutex<AuctionProperty>>>>,
    changes: broadcast::Sender<AuctionProperty>,
}

impl InMemoryAuctionRepo {
    pub fn new(channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            auctions: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn logged(channel_capacity: usize) -> LoggedAuctionRepo<Self> {
        LoggedAuctionRepo::new(Self::new(channel_capacity))
    }

    fn publish(&self, auction: &AuctionProperty) {
        // No subscribers is fine
        let _ = self.changes.send(auction.clone());
    }

    async fn entry(&self, auction_id: AuctionId) -> Option<Arc<Mutex<AuctionProperty>>> {
        self.auctions.read().await.get(&auction_id).cloned()
    }

    async fn snapshot_all(&self) -> Vec<AuctionProperty> {
        let entries: Vec<_> = self.auctions.read().await.values().cloned().collect();
        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            result.push(entry.lock().await.clone());
        }
        result
    }
}

#[async_trait]
impl AuctionRepo for InMemoryAuctionRepo {
    async fn create(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let stored = AuctionProperty {
            revision: 0,
            ..auction
        };

        match self.auctions.write().await.entry(stored.id) {
            Entry::Occupied(_) => return Err(AuctionRepoError::AlreadyExists(stored.id)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(stored.clone())));
            }
        }

        self.publish(&stored);
        Ok(stored)
    }

    async fn get(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<AuctionProperty>, AuctionRepoError> {
        match self.entry(auction_id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        let mut result = self.snapshot_all().await;
        result.sort_by(|a, b| {
            a.auction_start_time
                .cmp(&b.auction_start_time)
                .then(a.id.cmp(&b.id))
        });
        Ok(result)
    }

    async fn list_won_by(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        let mut result: Vec<_> = self
            .snapshot_all()
            .await
            .into_iter()
            .filter(|auction| {
                auction.winner_id.as_ref() == Some(user_id)
                    && auction.payment_status != PaymentStatus::None
            })
            .collect();
        result.sort_by(|a, b| a.auction_end_time.cmp(&b.auction_end_time));
        Ok(result)
    }

    async fn update(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let entry = self
            .entry(auction.id)
            .await
            .ok_or(AuctionRepoError::NotFound(auction.id))?;
        let mut current = entry.lock().await;

        if current.revision != auction.revision {
            return Err(AuctionRepoError::ConcurrentModification);
        }

        *current = AuctionProperty {
            revision: auction.revision + 1,
            ..auction
        };
        // Published under the entry lock so subscribers see revisions in order
        self.publish(&current);
        Ok(current.clone())
    }

    fn changes(&self) -> broadcast::Receiver<AuctionProperty> {
        self.changes.subscribe()
    }
}
