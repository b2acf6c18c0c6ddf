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
use super::notification::{AuctionEvent, NotificationDispatcher};
use super::validator::{BidRules, ProposedBid, RejectReason, ValidationOutcome, validate};
use crate::config::BiddingConfig;
use crate::model::{AuctionId, AuctionProperty, AuctionStatus, Bid, Money, UserId};
use crate::repo::{AuctionRepo, AuctionRepoError, Modification, ModifyError, modify_with_retries};
use anyhow::anyhow;
use auction_common::clock::Clock;
use auction_common::{SafeDisplay, error_forwarding};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BidError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(AuctionId),
    #[error("Auction is not active (status: {status})")]
    AuctionNotActive { status: AuctionStatus },
    #[error("Bid must exceed the current bid of {current_bid}")]
    BidTooLow { current_bid: Money },
    #[error("Bid must not exceed the maximum bid of {max_bid}")]
    BidTooHigh { max_bid: Money },
    #[error("Bidder is already the highest bidder")]
    AlreadyHighestBidder,
    #[error("Bid could not be committed after {attempts} conflicting attempts")]
    ConcurrentBidConflict { attempts: u32 },
    #[error("Auction store unavailable")]
    StoreUnavailable(#[source] AuctionRepoError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl BidError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BidError::AuctionNotActive { .. }
            | BidError::BidTooLow { .. }
            | BidError::BidTooHigh { .. }
            | BidError::AlreadyHighestBidder => ErrorCategory::Validation,
            BidError::ConcurrentBidConflict { .. } => ErrorCategory::Concurrency,
            BidError::AuctionNotFound(_) => ErrorCategory::NotFound,
            BidError::StoreUnavailable(_) | BidError::InternalError(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }
}

impl From<RejectReason> for BidError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::AuctionNotActive { status } => BidError::AuctionNotActive { status },
            RejectReason::BidTooLow { current_bid } => BidError::BidTooLow { current_bid },
            RejectReason::BidTooHigh { max_bid } => BidError::BidTooHigh { max_bid },
            RejectReason::AlreadyHighestBidder => BidError::AlreadyHighestBidder,
        }
    }
}

impl From<ModifyError<RejectReason>> for BidError {
    fn from(error: ModifyError<RejectReason>) -> Self {
        match error {
            ModifyError::NotFound(auction_id) => BidError::AuctionNotFound(auction_id),
            ModifyError::Rejected(reason) => reason.into(),
            ModifyError::Conflict { attempts } => BidError::ConcurrentBidConflict { attempts },
            ModifyError::Repo(err) => err.into(),
        }
    }
}

impl From<AuctionRepoError> for BidError {
    fn from(error: AuctionRepoError) -> Self {
        match error {
            AuctionRepoError::NotFound(auction_id) => BidError::AuctionNotFound(auction_id),
            AuctionRepoError::ConcurrentModification => {
                BidError::ConcurrentBidConflict { attempts: 1 }
            }
            AuctionRepoError::Unavailable(_) | AuctionRepoError::Malformed(_) => {
                BidError::StoreUnavailable(error)
            }
            other => BidError::InternalError(anyhow::Error::from(other).context("BidError")),
        }
    }
}

error_forwarding!(BidError);

impl SafeDisplay for BidError {
    fn to_safe_string(&self) -> String {
        match self {
            BidError::AuctionNotFound(_)
            | BidError::AuctionNotActive { .. }
            | BidError::BidTooLow { .. }
            | BidError::BidTooHigh { .. }
            | BidError::AlreadyHighestBidder
            | BidError::ConcurrentBidConflict { .. } => self.to_string(),
            BidError::StoreUnavailable(_) => "Auction store unavailable".to_string(),
            BidError::InternalError(_) => "Internal error".to_string(),
        }
    }
}

/// The single write path for economic auction fields, shared by every bid source.
pub struct BidService {
    auction_repo: Arc<dyn AuctionRepo>,
    notifications: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: BiddingConfig,
}

impl BidService {
    pub fn new(
        auction_repo: Arc<dyn AuctionRepo>,
        notifications: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: BiddingConfig,
    ) -> Self {
        Self {
            auction_repo,
            notifications,
            clock,
            config,
        }
    }

    pub async fn submit_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: UserId,
        bidder_name: String,
        amount: Money,
    ) -> Result<Bid, BidError> {
        let proposed = ProposedBid {
            bidder_id,
            bidder_name,
            amount,
        };
        let rules = BidRules {
            allow_self_outbid: self.config.allow_self_outbid,
        };
        let clock = &self.clock;

        let result = modify_with_retries(
            self.auction_repo.as_ref(),
            auction_id,
            self.config.max_attempts,
            |current| match validate(current, &proposed, clock.now(), rules) {
                ValidationOutcome::Accept { updated, bid } => {
                    let previous_highest = current.highest_bidder_id.clone();
                    Ok(Some((*updated, (bid, previous_highest))))
                }
                ValidationOutcome::Reject(reason) => Err(reason),
            },
        )
        .await;

        match result {
            Ok(Modification::Modified {
                auction,
                value: (bid, previous_highest),
            }) => {
                info!(
                    auction_id = %auction_id,
                    bidder_id = %bid.bidder_id,
                    amount = %bid.amount,
                    sequence = bid.sequence,
                    "Bid accepted"
                );
                self.notify_accepted(&auction, &bid, previous_highest).await;
                Ok(bid)
            }
            Ok(Modification::Unchanged(_)) => Err(BidError::InternalError(anyhow!(
                "Accepted bid produced no auction change"
            ))),
            Err(err) => {
                let err = BidError::from(err);
                match err.category() {
                    ErrorCategory::Validation | ErrorCategory::NotFound => info!(
                        auction_id = %auction_id,
                        bidder_id = %proposed.bidder_id,
                        amount = %proposed.amount,
                        "Bid rejected: {err}"
                    ),
                    ErrorCategory::Concurrency | ErrorCategory::Infrastructure => warn!(
                        auction_id = %auction_id,
                        bidder_id = %proposed.bidder_id,
                        amount = %proposed.amount,
                        "Bid failed: {err:#}"
                    ),
                }
                Err(err)
            }
        }
    }

    async fn notify_accepted(
        &self,
        auction: &AuctionProperty,
        bid: &Bid,
        previous_highest: Option<UserId>,
    ) {
        if let Some(previous) = previous_highest
            && previous != bid.bidder_id
        {
            self.notifications
                .dispatch(AuctionEvent::Outbid {
                    auction_id: auction.id,
                    recipient: previous,
                    new_amount: bid.amount,
                })
                .await;
        }

        let watchers: BTreeSet<UserId> = auction
            .watchlist_users
            .iter()
            .filter(|user_id| **user_id != bid.bidder_id)
            .cloned()
            .collect();
        if !watchers.is_empty() {
            self.notifications
                .dispatch(AuctionEvent::NewBid {
                    auction_id: auction.id,
                    recipients: watchers,
                    bidder_name: bid.bidder_name.clone(),
                    amount: bid.amount,
                })
                .await;
        }
    }
}
