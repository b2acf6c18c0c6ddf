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
use crate::config::ReconcilerConfig;
use crate::model::{AuctionId, AuctionProperty, AuctionStatus, PaymentStatus, UserId};
use crate::repo::{AuctionRepo, AuctionRepoError, Modification, ModifyError, modify_with_retries};
use auction_common::clock::Clock;
use auction_common::{SafeDisplay, error_forwarding};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(AuctionId),
    #[error("Auction has not ended (status: {status})")]
    AuctionNotEnded { status: AuctionStatus },
    #[error("Auction has no pending payment (payment status: {payment_status})")]
    PaymentNotPending { payment_status: PaymentStatus },
    #[error("Payer is not the winner of the auction")]
    NotWinner,
    #[error("Auction cannot be cancelled (status: {status})")]
    NotCancellable { status: AuctionStatus },
    #[error("Auction could not be updated after {attempts} conflicting attempts")]
    ConcurrentModification { attempts: u32 },
    #[error("Auction store unavailable")]
    StoreUnavailable(#[source] AuctionRepoError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl ReconcilerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconcilerError::AuctionNotFound(_) => ErrorCategory::NotFound,
            ReconcilerError::AuctionNotEnded { .. }
            | ReconcilerError::PaymentNotPending { .. }
            | ReconcilerError::NotWinner
            | ReconcilerError::NotCancellable { .. } => ErrorCategory::Validation,
            ReconcilerError::ConcurrentModification { .. } => ErrorCategory::Concurrency,
            ReconcilerError::StoreUnavailable(_) | ReconcilerError::InternalError(_) => {
                ErrorCategory::Infrastructure
            }
        }
    }
}

impl From<AuctionRepoError> for ReconcilerError {
    fn from(error: AuctionRepoError) -> Self {
        match error {
            AuctionRepoError::NotFound(auction_id) => ReconcilerError::AuctionNotFound(auction_id),
            AuctionRepoError::ConcurrentModification => {
                ReconcilerError::ConcurrentModification { attempts: 1 }
            }
            AuctionRepoError::Unavailable(_) | AuctionRepoError::Malformed(_) => {
                ReconcilerError::StoreUnavailable(error)
            }
            other => {
                ReconcilerError::InternalError(anyhow::Error::from(other).context("ReconcilerError"))
            }
        }
    }
}

impl From<ModifyError<ReconcilerError>> for ReconcilerError {
    fn from(error: ModifyError<ReconcilerError>) -> Self {
        match error {
            ModifyError::NotFound(auction_id) => ReconcilerError::AuctionNotFound(auction_id),
            ModifyError::Rejected(err) => err,
            ModifyError::Conflict { attempts } => {
                ReconcilerError::ConcurrentModification { attempts }
            }
            ModifyError::Repo(err) => err.into(),
        }
    }
}

error_forwarding!(ReconcilerError);

impl SafeDisplay for ReconcilerError {
    fn to_safe_string(&self) -> String {
        match self {
            ReconcilerError::StoreUnavailable(_) => "Auction store unavailable".to_string(),
            ReconcilerError::InternalError(_) => "Internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub updated: AuctionProperty,
    pub events: Vec<AuctionEvent>,
}

/// Computes the lifecycle transition `auction` is due for at `now`, if any.
///
/// Returns `None` when the record is already consistent with its timestamps, so
/// applying a plan and planning again always yields `None`.
pub fn plan_transition(
    auction: &AuctionProperty,
    now: DateTime<Utc>,
    ending_soon_threshold: Duration,
) -> Option<TransitionPlan> {
    if !matches!(
        auction.status,
        AuctionStatus::Upcoming | AuctionStatus::Active
    ) {
        return None;
    }

    let mut updated = auction.clone();
    let mut events = Vec::new();

    match auction.derived_status(now) {
        AuctionStatus::Active => {
            if auction.status == AuctionStatus::Upcoming {
                updated.status = AuctionStatus::Active;
                events.push(AuctionEvent::Started {
                    auction_id: auction.id,
                });
            }

            if !auction.ending_soon_notified && auction.time_until_end(now) <= ending_soon_threshold
            {
                updated.ending_soon_notified = true;
                let recipients: BTreeSet<UserId> = auction
                    .watchlist_users
                    .iter()
                    .cloned()
                    .chain(auction.bidders())
                    .collect();
                if !recipients.is_empty() {
                    events.push(AuctionEvent::EndingSoon {
                        auction_id: auction.id,
                        recipients,
                    });
                }
            }
        }
        AuctionStatus::Ended => {
            updated.status = AuctionStatus::Ended;
            match (&auction.highest_bidder_id, auction.last_bid()) {
                (Some(winner_id), Some(_)) => {
                    updated.winner_id = Some(winner_id.clone());
                    updated.payment_status = PaymentStatus::Pending;
                    events.push(AuctionEvent::Won {
                        auction_id: auction.id,
                        winner_id: winner_id.clone(),
                        amount: auction.current_bid,
                    });
                }
                _ => {
                    updated.winner_id = None;
                    updated.payment_status = PaymentStatus::None;
                    events.push(AuctionEvent::EndedWithoutBids {
                        auction_id: auction.id,
                    });
                }
            }
        }
        AuctionStatus::Upcoming | AuctionStatus::Sold | AuctionStatus::Cancelled => {}
    }

    if updated == *auction {
        None
    } else {
        Some(TransitionPlan { updated, events })
    }
}

/// Result of a reconciler operation: the stored record afterwards and the events
/// emitted by it. `events` is empty when nothing changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
    pub auction: AuctionProperty,
    pub events: Vec<AuctionEvent>,
}

pub struct AuctionStatusReconciler {
    auction_repo: Arc<dyn AuctionRepo>,
    notifications: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    max_attempts: u32,
}

impl AuctionStatusReconciler {
    pub fn new(
        auction_repo: Arc<dyn AuctionRepo>,
        notifications: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
        max_attempts: u32,
    ) -> Self {
        Self {
            auction_repo,
            notifications,
            clock,
            config,
            max_attempts,
        }
    }

    pub async fn reconcile(&self, auction_id: AuctionId) -> Result<Reconciled, ReconcilerError> {
        let clock = &self.clock;
        let threshold = self.config.ending_soon_threshold;

        self.modify(auction_id, |current| {
            Ok(plan_transition(current, clock.now(), threshold)
                .map(|plan| (plan.updated, plan.events)))
        })
        .await
    }

    /// Reconciles every auction which is not yet settled. Failures of single
    /// auctions are logged and do not stop the others.
    pub async fn reconcile_all(&self) -> Result<Vec<Reconciled>, ReconcilerError> {
        let candidates: Vec<AuctionId> = self
            .auction_repo
            .list()
            .await?
            .into_iter()
            .filter(|auction| {
                matches!(
                    auction.status,
                    AuctionStatus::Upcoming | AuctionStatus::Active
                )
            })
            .map(|auction| auction.id)
            .collect();

        debug!(candidates = candidates.len(), "Reconciling auctions");

        let results = join_all(candidates.into_iter().map(|auction_id| async move {
            (auction_id, self.reconcile(auction_id).await)
        }))
        .await;

        let mut reconciled = Vec::new();
        for (auction_id, result) in results {
            match result {
                Ok(outcome) => reconciled.push(outcome),
                Err(err) => warn!(
                    auction_id = %auction_id,
                    "Failed to reconcile auction: {err:#}"
                ),
            }
        }
        Ok(reconciled)
    }

    /// Checkout callback marking the auction as paid and sold.
    pub async fn confirm_payment(
        &self,
        auction_id: AuctionId,
        payer_id: UserId,
    ) -> Result<Reconciled, ReconcilerError> {
        let clock = &self.clock;
        let threshold = self.config.ending_soon_threshold;

        self.modify(auction_id, |current| {
            if current.status == AuctionStatus::Sold {
                return if current.winner_id.as_ref() == Some(&payer_id) {
                    Ok(None)
                } else {
                    Err(ReconcilerError::NotWinner)
                };
            }

            let (mut updated, mut events) = match plan_transition(current, clock.now(), threshold)
            {
                Some(plan) => (plan.updated, plan.events),
                None => (current.clone(), Vec::new()),
            };

            if updated.status != AuctionStatus::Ended {
                return Err(ReconcilerError::AuctionNotEnded {
                    status: updated.status,
                });
            }
            if updated.payment_status != PaymentStatus::Pending {
                return Err(ReconcilerError::PaymentNotPending {
                    payment_status: updated.payment_status,
                });
            }
            if updated.winner_id.as_ref() != Some(&payer_id) {
                return Err(ReconcilerError::NotWinner);
            }

            updated.payment_status = PaymentStatus::Paid;
            updated.status = AuctionStatus::Sold;
            events.push(AuctionEvent::Sold {
                auction_id: current.id,
                winner_id: payer_id.clone(),
                amount: updated.current_bid,
            });
            Ok(Some((updated, events)))
        })
        .await
    }

    pub async fn cancel(&self, auction_id: AuctionId) -> Result<Reconciled, ReconcilerError> {
        let clock = &self.clock;
        let threshold = self.config.ending_soon_threshold;

        self.modify(auction_id, |current| {
            if current.status == AuctionStatus::Cancelled {
                return Ok(None);
            }

            let (mut updated, mut events) = match plan_transition(current, clock.now(), threshold)
            {
                Some(plan) => (plan.updated, plan.events),
                None => (current.clone(), Vec::new()),
            };

            match updated.status {
                AuctionStatus::Upcoming | AuctionStatus::Active => {
                    updated.status = AuctionStatus::Cancelled;
                    // Transitions due at the same instant are superseded by the cancellation
                    events.retain(|event| matches!(event, AuctionEvent::Started { .. }));
                    events.push(AuctionEvent::Cancelled {
                        auction_id: current.id,
                    });
                    Ok(Some((updated, events)))
                }
                status => Err(ReconcilerError::NotCancellable { status }),
            }
        })
        .await
    }

    /// Periodically reconciles all auctions until the surrounding task is aborted.
    pub async fn run(&self) -> Result<(), anyhow::Error> {
        info!(
            interval = ?self.config.interval,
            "Starting auction status reconciler"
        );
        loop {
            tokio::time::sleep(self.config.interval).await;
            match self.reconcile_all().await {
                Ok(reconciled) => {
                    let transitioned = reconciled
                        .iter()
                        .filter(|outcome| !outcome.events.is_empty())
                        .count();
                    debug!(transitioned, "Reconciliation pass finished");
                }
                Err(err) => warn!("Reconciliation pass failed: {err:#}"),
            }
        }
    }

    async fn modify<F>(&self, auction_id: AuctionId, f: F) -> Result<Reconciled, ReconcilerError>
    where
        F: FnMut(&AuctionProperty) -> Result<Option<(AuctionProperty, Vec<AuctionEvent>)>, ReconcilerError>
            + Send,
    {
        let result =
            modify_with_retries(self.auction_repo.as_ref(), auction_id, self.max_attempts, f)
                .await?;

        match result {
            Modification::Modified { auction, value } => {
                info!(
                    auction_id = %auction_id,
                    status = %auction.status,
                    payment_status = %auction.payment_status,
                    revision = auction.revision,
                    "Auction lifecycle updated"
                );
                for event in &value {
                    self.notifications.dispatch(event.clone()).await;
                }
                Ok(Reconciled {
                    auction,
                    events: value,
                })
            }
            Modification::Unchanged(auction) => Ok(Reconciled {
                auction,
                events: Vec::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuctionId, Bid, Money, NewListing};
    use assert2::{check, let_assert};
    use chrono::{TimeDelta, TimeZone};
    use test_r::test;

    const THRESHOLD: Duration = Duration::from_secs(5 * 60);

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
    }

    fn auction() -> AuctionProperty {
        AuctionProperty::from_listing(
            AuctionId::new(),
            NewListing {
                title: "Farmhouse".to_string(),
                address: "Old Rd 4".to_string(),
                seller_id: UserId::from("seller"),
                starting_price: Money::from_major_units(100_000),
                auction_start_time: start(),
                auction_end_time: start() + TimeDelta::hours(1),
            },
        )
    }

    fn with_bid(mut auction: AuctionProperty, bidder: &str, amount: u64) -> AuctionProperty {
        let bid = Bid {
            auction_id: auction.id,
            sequence: auction.bid_history.len() as u64,
            bidder_id: UserId::from(bidder),
            bidder_name: bidder.to_string(),
            amount: Money::from_major_units(amount),
            placed_at: start() + TimeDelta::minutes(1),
        };
        auction.current_bid = bid.amount;
        auction.highest_bidder_id = Some(bid.bidder_id.clone());
        auction.highest_bidder_name = Some(bid.bidder_name.clone());
        auction.bid_history.push(bid);
        auction
    }

    #[test]
    fn upcoming_auction_before_start_needs_no_transition() {
        check!(plan_transition(&auction(), start() - TimeDelta::seconds(1), THRESHOLD) == None);
    }

    #[test]
    fn upcoming_auction_becomes_active_at_start() {
        let_assert!(Some(plan) = plan_transition(&auction(), start(), THRESHOLD));
        check!(plan.updated.status == AuctionStatus::Active);
        let_assert!([AuctionEvent::Started { .. }] = plan.events.as_slice());
    }

    #[test]
    fn ended_auction_with_bid_marks_winner_pending_payment() {
        let current = with_bid(auction(), "alice", 150_000);
        let end = current.auction_end_time;

        let_assert!(Some(plan) = plan_transition(&current, end, THRESHOLD));
        check!(plan.updated.status == AuctionStatus::Ended);
        check!(plan.updated.winner_id == Some(UserId::from("alice")));
        check!(plan.updated.payment_status == PaymentStatus::Pending);
        let_assert!([AuctionEvent::Won { amount, .. }] = plan.events.as_slice());
        check!(*amount == Money::from_major_units(150_000));
    }

    #[test]
    fn ended_auction_without_bids_has_no_winner() {
        let current = auction();
        let_assert!(
            Some(plan) = plan_transition(&current, current.auction_end_time, THRESHOLD)
        );
        check!(plan.updated.status == AuctionStatus::Ended);
        check!(plan.updated.winner_id == None);
        check!(plan.updated.payment_status == PaymentStatus::None);
        let_assert!([AuctionEvent::EndedWithoutBids { .. }] = plan.events.as_slice());
    }

    #[test]
    fn ending_soon_is_emitted_once() {
        let mut current = auction();
        current.status = AuctionStatus::Active;
        current.watchlist_users.insert(UserId::from("bob"));
        let now = current.auction_end_time - TimeDelta::minutes(2);

        let_assert!(Some(plan) = plan_transition(&current, now, THRESHOLD));
        check!(plan.updated.ending_soon_notified);
        let_assert!([AuctionEvent::EndingSoon { recipients, .. }] = plan.events.as_slice());
        check!(recipients.contains(&UserId::from("bob")));

        check!(plan_transition(&plan.updated, now + TimeDelta::seconds(30), THRESHOLD) == None);
    }

    #[test]
    fn planning_is_idempotent() {
        let current = with_bid(auction(), "alice", 150_000);
        let now = current.auction_end_time + TimeDelta::minutes(10);

        let_assert!(Some(plan) = plan_transition(&current, now, THRESHOLD));
        check!(plan_transition(&plan.updated, now, THRESHOLD) == None);
    }

    #[test]
    fn settled_auctions_are_never_transitioned() {
        let mut current = with_bid(auction(), "alice", 150_000);
        current.status = AuctionStatus::Sold;
        current.payment_status = PaymentStatus::Paid;
        let later = current.auction_end_time + TimeDelta::days(3);

        check!(plan_transition(&current, later, THRESHOLD) == None);
    }
}
