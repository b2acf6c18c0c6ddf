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

use super::model::{AuctionList, AuctionView};
use super::{ApiResult, ApiTags};
use crate::model::UserId;
use crate::services::payment_gate::PaymentGate;
use auction_common::clock::Clock;
use poem_openapi::OpenApi;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use std::sync::Arc;
use tracing::{Instrument, info_span};

pub struct UsersApi {
    payment_gate: Arc<PaymentGate>,
    clock: Arc<dyn Clock>,
}

#[OpenApi(prefix_path = "/v1/users", tag = ApiTags::User)]
impl UsersApi {
    pub fn new(payment_gate: Arc<PaymentGate>, clock: Arc<dyn Clock>) -> Self {
        Self {
            payment_gate,
            clock,
        }
    }

    /// Auctions won by the user and not paid yet
    #[oai(
        path = "/:user_id/pending-payments",
        method = "get",
        operation_id = "get_pending_payments"
    )]
    pub async fn get_pending_payments(
        &self,
        user_id: Path<String>,
    ) -> ApiResult<Json<AuctionList>> {
        let span = info_span!("get_pending_payments", user_id = user_id.0);
        self.get_pending_payments_internal(UserId(user_id.0))
            .instrument(span)
            .await
    }

    async fn get_pending_payments_internal(&self, user_id: UserId) -> ApiResult<Json<AuctionList>> {
        let now = self.clock.now();
        let auctions = self.payment_gate.pending_payments(&user_id).await?;
        Ok(Json(AuctionList {
            values: auctions
                .into_iter()
                .map(|auction| AuctionView::new(auction, now))
                .collect(),
        }))
    }
}
