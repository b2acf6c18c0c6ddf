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

use crate::model::{AuctionProperty, AuctionStatus, PaymentStatus, UserId};
use crate::repo::{AuctionRepo, AuctionRepoError};
use std::sync::Arc;

/// Read-only view of the auctions a user has won but not paid for yet.
pub struct PaymentGate {
    auction_repo: Arc<dyn AuctionRepo>,
}

impl PaymentGate {
    pub fn new(auction_repo: Arc<dyn AuctionRepo>) -> Self {
        Self { auction_repo }
    }

    pub async fn pending_payments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        Ok(self
            .auction_repo
            .list_won_by(user_id)
            .await?
            .into_iter()
            .filter(|auction| awaits_payment_from(auction, user_id))
            .collect())
    }
}

pub fn awaits_payment_from(auction: &AuctionProperty, user_id: &UserId) -> bool {
    auction.winner_id.as_ref() == Some(user_id)
        && auction.payment_status == PaymentStatus::Pending
        && auction.status == AuctionStatus::Ended
}
