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

pub mod memory;
pub mod sqlite;

use crate::model::{AuctionId, AuctionProperty, UserId};
use async_trait::async_trait;
use auction_common::{SafeDisplay, error_forwarding};
use tokio::sync::broadcast;
use tracing::{Instrument, Span, debug, info_span};

#[derive(Debug, thiserror::Error)]
pub enum AuctionRepoError {
    #[error("Auction already exists: {0}")]
    AlreadyExists(AuctionId),
    #[error("Auction not found: {0}")]
    NotFound(AuctionId),
    #[error("Concurrent modification")]
    ConcurrentModification,
    #[error("Auction store unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed auction record: {0}")]
    Malformed(String),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

error_forwarding!(AuctionRepoError);

impl From<sqlx::Error> for AuctionRepoError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AuctionRepoError::Unavailable(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                AuctionRepoError::Malformed(error.to_string())
            }
            other => AuctionRepoError::InternalError(other.into()),
        }
    }
}

impl SafeDisplay for AuctionRepoError {
    fn to_safe_string(&self) -> String {
        match self {
            AuctionRepoError::AlreadyExists(_)
            | AuctionRepoError::NotFound(_)
            | AuctionRepoError::ConcurrentModification => self.to_string(),
            AuctionRepoError::Unavailable(_) => "Auction store unavailable".to_string(),
            AuctionRepoError::Malformed(_) => "Malformed auction record".to_string(),
            AuctionRepoError::InternalError(_) => "Internal repository error".to_string(),
        }
    }
}

/// Storage of auction records with compare-and-swap updates.
///
/// Every successful `create` or `update` publishes the stored record on the
/// stream returned by `changes`.
#[async_trait]
pub trait AuctionRepo: Send + Sync {
    async fn create(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError>;

    async fn get(&self, auction_id: AuctionId)
    -> Result<Option<AuctionProperty>, AuctionRepoError>;

    async fn list(&self) -> Result<Vec<AuctionProperty>, AuctionRepoError>;

    async fn list_won_by(&self, user_id: &UserId)
    -> Result<Vec<AuctionProperty>, AuctionRepoError>;

    /// Stores `auction` if the stored revision still equals `auction.revision`,
    /// returning the stored record with its revision incremented. Fails with
    /// `ConcurrentModification` if another writer got there first.
    async fn update(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError>;

    fn changes(&self) -> broadcast::Receiver<AuctionProperty>;
}

pub struct LoggedAuctionRepo<Repo: AuctionRepo> {
    repo: Repo,
}

static SPAN_NAME: &str = "auction repository";

impl<Repo: AuctionRepo> LoggedAuctionRepo<Repo> {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    fn span_auction_id(auction_id: AuctionId) -> Span {
        info_span!(SPAN_NAME, auction_id=%auction_id)
    }

    fn span_user_id(user_id: &UserId) -> Span {
        info_span!(SPAN_NAME, user_id=%user_id)
    }

    fn span_revision(auction_id: AuctionId, revision: u64) -> Span {
        info_span!(SPAN_NAME, auction_id=%auction_id, revision)
    }
}

#[async_trait]
impl<Repo: AuctionRepo> AuctionRepo for LoggedAuctionRepo<Repo> {
    async fn create(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let span = Self::span_auction_id(auction.id);
        self.repo.create(auction).instrument(span).await
    }

    async fn get(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<AuctionProperty>, AuctionRepoError> {
        self.repo
            .get(auction_id)
            .instrument(Self::span_auction_id(auction_id))
            .await
    }

    async fn list(&self) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        self.repo.list().instrument(info_span!(SPAN_NAME)).await
    }

    async fn list_won_by(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        self.repo
            .list_won_by(user_id)
            .instrument(Self::span_user_id(user_id))
            .await
    }

    async fn update(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let span = Self::span_revision(auction.id, auction.revision);
        self.repo.update(auction).instrument(span).await
    }

    fn changes(&self) -> broadcast::Receiver<AuctionProperty> {
        self.repo.changes()
    }
}

#[derive(Debug)]
pub enum Modification<T> {
    Modified { auction: AuctionProperty, value: T },
    Unchanged(AuctionProperty),
}

#[derive(Debug, thiserror::Error)]
pub enum ModifyError<E> {
    #[error("Auction not found: {0}")]
    NotFound(AuctionId),
    #[error("Modification rejected")]
    Rejected(E),
    #[error("Gave up after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },
    #[error(transparent)]
    Repo(AuctionRepoError),
}

/// Read-modify-write of a single auction with optimistic concurrency.
///
/// `modify` sees the latest stored record on every attempt and either rejects it,
/// leaves it unchanged (`Ok(None)`) or returns the updated record plus a value to
/// hand back to the caller. A `ConcurrentModification` from the store restarts
/// the cycle immediately, up to `max_attempts` times in total.
pub async fn modify_with_retries<T, E, F>(
    repo: &dyn AuctionRepo,
    auction_id: AuctionId,
    max_attempts: u32,
    mut modify: F,
) -> Result<Modification<T>, ModifyError<E>>
where
    T: Send,
    E: Send,
    F: FnMut(&AuctionProperty) -> Result<Option<(AuctionProperty, T)>, E> + Send,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let current = repo
            .get(auction_id)
            .await
            .map_err(ModifyError::Repo)?
            .ok_or(ModifyError::NotFound(auction_id))?;

        let (updated, value) = match modify(&current).map_err(ModifyError::Rejected)? {
            Some(change) => change,
            None => return Ok(Modification::Unchanged(current)),
        };

        match repo.update(updated).await {
            Ok(auction) => return Ok(Modification::Modified { auction, value }),
            Err(AuctionRepoError::ConcurrentModification) => {
                debug!(
                    auction_id = %auction_id,
                    attempt, max_attempts, "Concurrent modification, retrying"
                );
            }
            Err(AuctionRepoError::NotFound(id)) => return Err(ModifyError::NotFound(id)),
            Err(err) => return Err(ModifyError::Repo(err)),
        }
    }

    Err(ModifyError::Conflict {
        attempts: max_attempts,
    })
}
