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

use super::ErrorCategory;
use crate::model::{AuctionId, AuctionProperty, Money, NewListing, UserId};
use crate::repo::{AuctionRepo, AuctionRepoError, Modification, ModifyError, modify_with_retries};
use auction_common::clock::Clock;
use auction_common::{SafeDisplay, error_forwarding};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(AuctionId),
    #[error("Invalid listing: {0}")]
    InvalidListing(String),
    #[error("Auction could not be updated after {attempts} conflicting attempts")]
    ConcurrentModification { attempts: u32 },
    #[error("Auction store unavailable")]
    StoreUnavailable(#[source] AuctionRepoError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl AuctionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuctionError::AuctionNotFound(_) => ErrorCategory::NotFound,
            AuctionError::InvalidListing(_) => ErrorCategory::Validation,
            AuctionError::ConcurrentModification { .. } => ErrorCategory::Concurrency,
            AuctionError::StoreUnavailable(_) | AuctionError::InternalError(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }
}

impl From<AuctionRepoError> for AuctionError {
    fn from(error: AuctionRepoError) -> Self {
        match error {
            AuctionRepoError::NotFound(auction_id) => AuctionError::AuctionNotFound(auction_id),
            AuctionRepoError::ConcurrentModification => {
                AuctionError::ConcurrentModification { attempts: 1 }
            }
            AuctionRepoError::Unavailable(_) | AuctionRepoError::Malformed(_) => {
                AuctionError::StoreUnavailable(error)
            }
            other => AuctionError::InternalError(anyhow::Error::from(other).context("AuctionError")),
        }
    }
}

impl From<ModifyError<Infallible>> for AuctionError {
    fn from(error: ModifyError<Infallible>) -> Self {
        match error {
            ModifyError::NotFound(auction_id) => AuctionError::AuctionNotFound(auction_id),
            ModifyError::Rejected(never) => match never {},
            ModifyError::Conflict { attempts } => AuctionError::ConcurrentModification { attempts },
            ModifyError::Repo(err) => err.into(),
        }
    }
}

error_forwarding!(AuctionError);

impl SafeDisplay for AuctionError {
    fn to_safe_string(&self) -> String {
        match self {
            AuctionError::AuctionNotFound(_)
            | AuctionError::InvalidListing(_)
            | AuctionError::ConcurrentModification { .. } => self.to_string(),
            AuctionError::StoreUnavailable(_) => "Auction store unavailable".to_string(),
            AuctionError::InternalError(_) => "Internal error".to_string(),
        }
    }
}

/// Listing and watchlist operations. Never touches economic, lifecycle or payment fields.
pub struct AuctionService {
    auction_repo: Arc<dyn AuctionRepo>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl AuctionService {
    pub fn new(auction_repo: Arc<dyn AuctionRepo>, clock: Arc<dyn Clock>, max_attempts: u32) -> Self {
        Self {
            auction_repo,
            clock,
            max_attempts,
        }
    }

    pub async fn create_listing(&self, listing: NewListing) -> Result<AuctionProperty, AuctionError> {
        if listing.title.trim().is_empty() {
            return Err(AuctionError::InvalidListing("title must not be empty".to_string()));
        }
        if listing.auction_end_time <= listing.auction_start_time {
            return Err(AuctionError::InvalidListing(
                "auction end time must be after its start time".to_string(),
            ));
        }
        if listing.starting_price == Money::ZERO {
            return Err(AuctionError::InvalidListing(
                "starting price must be positive".to_string(),
            ));
        }
        if listing.starting_price > Money::MAX {
            return Err(AuctionError::InvalidListing(format!(
                "starting price must not exceed {}",
                Money::MAX
            )));
        }
        if listing.auction_end_time <= self.clock.now() {
            return Err(AuctionError::InvalidListing(
                "auction end time must be in the future".to_string(),
            ));
        }

        let auction = self
            .auction_repo
            .create(AuctionProperty::from_listing(AuctionId::new(), listing))
            .await?;

        info!(
            auction_id = %auction.id,
            seller_id = %auction.seller_id,
            starting_price = %auction.starting_price,
            "Auction listed"
        );
        Ok(auction)
    }

    pub async fn get(&self, auction_id: AuctionId) -> Result<AuctionProperty, AuctionError> {
        self.auction_repo
            .get(auction_id)
            .await?
            .ok_or(AuctionError::AuctionNotFound(auction_id))
    }

    pub async fn list(&self) -> Result<Vec<AuctionProperty>, AuctionError> {
        Ok(self.auction_repo.list().await?)
    }

    pub async fn watch(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<AuctionProperty, AuctionError> {
        let result = modify_with_retries::<_, Infallible, _>(
            self.auction_repo.as_ref(),
            auction_id,
            self.max_attempts,
            |current| {
                if current.watchlist_users.contains(&user_id) {
                    Ok(None)
                } else {
                    let mut updated = current.clone();
                    updated.watchlist_users.insert(user_id.clone());
                    Ok(Some((updated, ())))
                }
            },
        )
        .await?;

        info!(auction_id = %auction_id, user_id = %user_id, "Auction watched");
        Ok(Self::resulting(result))
    }

    pub async fn unwatch(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<AuctionProperty, AuctionError> {
        let result = modify_with_retries::<_, Infallible, _>(
            self.auction_repo.as_ref(),
            auction_id,
            self.max_attempts,
            |current| {
                if current.watchlist_users.contains(&user_id) {
                    let mut updated = current.clone();
                    updated.watchlist_users.remove(&user_id);
                    Ok(Some((updated, ())))
                } else {
                    Ok(None)
                }
            },
        )
        .await?;

        info!(auction_id = %auction_id, user_id = %user_id, "Auction unwatched");
        Ok(Self::resulting(result))
    }

    fn resulting(modification: Modification<()>) -> AuctionProperty {
        match modification {
            Modification::Modified { auction, .. } => auction,
            Modification::Unchanged(auction) => auction,
        }
    }
}
