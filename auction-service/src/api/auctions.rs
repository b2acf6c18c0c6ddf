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

use super::model::{
    AuctionList, AuctionView, BidRequest, BidView, CountdownView, CreateAuctionRequest,
    PaymentConfirmation, VoiceBidRequest, VoiceBidResult,
};
use super::{ApiResult, ApiTags};
use crate::model::{AuctionId, Money, UserId};
use crate::services::auction::AuctionService;
use crate::services::bid::BidService;
use crate::services::reconciler::AuctionStatusReconciler;
use crate::services::timer::compute_snapshot;
use crate::voice::VoiceBidHandler;
use auction_common::clock::Clock;
use poem_openapi::OpenApi;
use poem_openapi::param::Path;
use poem_openapi::payload::Json;
use std::sync::Arc;
use tracing::{Instrument, info_span};
use uuid::Uuid;

pub struct AuctionsApi {
    auction_service: Arc<AuctionService>,
    bid_service: Arc<BidService>,
    reconciler: Arc<AuctionStatusReconciler>,
    voice_bid_handler: Arc<VoiceBidHandler>,
    clock: Arc<dyn Clock>,
}

#[OpenApi(prefix_path = "/v1/auctions", tag = ApiTags::Auction)]
impl AuctionsApi {
    pub fn new(
        auction_service: Arc<AuctionService>,
        bid_service: Arc<BidService>,
        reconciler: Arc<AuctionStatusReconciler>,
        voice_bid_handler: Arc<VoiceBidHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            auction_service,
            bid_service,
            reconciler,
            voice_bid_handler,
            clock,
        }
    }

    /// List a property for auction
    ///
    /// The new auction starts in the upcoming state with the starting price as current bid.
    #[oai(path = "/", method = "post", operation_id = "create_auction")]
    pub async fn create_auction(
        &self,
        request: Json<CreateAuctionRequest>,
    ) -> ApiResult<Json<AuctionView>> {
        let span = info_span!("create_auction", seller_id = request.0.seller_id);
        self.create_auction_internal(request.0)
            .instrument(span)
            .await
    }

    async fn create_auction_internal(
        &self,
        request: CreateAuctionRequest,
    ) -> ApiResult<Json<AuctionView>> {
        let auction = self.auction_service.create_listing(request.into()).await?;
        Ok(Json(AuctionView::new(auction, self.clock.now())))
    }

    /// List all auctions
    #[oai(path = "/", method = "get", operation_id = "list_auctions")]
    pub async fn list_auctions(&self) -> ApiResult<Json<AuctionList>> {
        let span = info_span!("list_auctions");
        self.list_auctions_internal().instrument(span).await
    }

    async fn list_auctions_internal(&self) -> ApiResult<Json<AuctionList>> {
        let now = self.clock.now();
        let auctions = self.auction_service.list().await?;
        Ok(Json(AuctionList {
            values: auctions
                .into_iter()
                .map(|auction| AuctionView::new(auction, now))
                .collect(),
        }))
    }

    /// Get an auction by id
    #[oai(path = "/:auction_id", method = "get", operation_id = "get_auction")]
    pub async fn get_auction(&self, auction_id: Path<Uuid>) -> ApiResult<Json<AuctionView>> {
        let span = info_span!("get_auction", auction_id = %auction_id.0);
        self.get_auction_internal(AuctionId(auction_id.0))
            .instrument(span)
            .await
    }

    async fn get_auction_internal(&self, auction_id: AuctionId) -> ApiResult<Json<AuctionView>> {
        let auction = self.auction_service.get(auction_id).await?;
        Ok(Json(AuctionView::new(auction, self.clock.now())))
    }

    /// Get the countdown of an auction
    ///
    /// Remaining time until the next lifecycle boundary, derived from the auction timestamps.
    #[oai(
        path = "/:auction_id/countdown",
        method = "get",
        operation_id = "get_auction_countdown"
    )]
    pub async fn get_auction_countdown(
        &self,
        auction_id: Path<Uuid>,
    ) -> ApiResult<Json<CountdownView>> {
        let span = info_span!("get_auction_countdown", auction_id = %auction_id.0);
        self.get_auction_countdown_internal(AuctionId(auction_id.0))
            .instrument(span)
            .await
    }

    async fn get_auction_countdown_internal(
        &self,
        auction_id: AuctionId,
    ) -> ApiResult<Json<CountdownView>> {
        let auction = self.auction_service.get(auction_id).await?;
        Ok(Json(compute_snapshot(&auction, self.clock.now()).into()))
    }

    /// Submit a bid
    #[oai(path = "/:auction_id/bids", method = "post", operation_id = "submit_bid")]
    pub async fn submit_bid(
        &self,
        auction_id: Path<Uuid>,
        request: Json<BidRequest>,
    ) -> ApiResult<Json<BidView>> {
        let span = info_span!(
            "submit_bid",
            auction_id = %auction_id.0,
            bidder_id = request.0.bidder_id
        );
        self.submit_bid_internal(AuctionId(auction_id.0), request.0)
            .instrument(span)
            .await
    }

    async fn submit_bid_internal(
        &self,
        auction_id: AuctionId,
        request: BidRequest,
    ) -> ApiResult<Json<BidView>> {
        let bid = self
            .bid_service
            .submit_bid(
                auction_id,
                UserId(request.bidder_id),
                request.bidder_name,
                Money::from_minor_units(request.amount_cents),
            )
            .await?;
        Ok(Json(bid.into()))
    }

    /// Submit a bid spoken to a voice assistant
    ///
    /// Rejections are reported in the response message instead of an error status.
    #[oai(
        path = "/:auction_id/voice-bids",
        method = "post",
        operation_id = "submit_voice_bid"
    )]
    pub async fn submit_voice_bid(
        &self,
        auction_id: Path<Uuid>,
        request: Json<VoiceBidRequest>,
    ) -> ApiResult<Json<VoiceBidResult>> {
        let span = info_span!(
            "submit_voice_bid",
            auction_id = %auction_id.0,
            bidder_id = request.0.bidder_id
        );
        self.submit_voice_bid_internal(AuctionId(auction_id.0), request.0)
            .instrument(span)
            .await
    }

    async fn submit_voice_bid_internal(
        &self,
        auction_id: AuctionId,
        request: VoiceBidRequest,
    ) -> ApiResult<Json<VoiceBidResult>> {
        let response = self
            .voice_bid_handler
            .handle(
                auction_id,
                UserId(request.bidder_id),
                request.bidder_name,
                &request.utterance,
            )
            .await;
        Ok(Json(response.into()))
    }

    /// Add a user to the watchlist of an auction
    #[oai(
        path = "/:auction_id/watchers/:user_id",
        method = "post",
        operation_id = "watch_auction"
    )]
    pub async fn watch_auction(
        &self,
        auction_id: Path<Uuid>,
        user_id: Path<String>,
    ) -> ApiResult<Json<AuctionView>> {
        let span = info_span!("watch_auction", auction_id = %auction_id.0, user_id = user_id.0);
        self.watch_auction_internal(AuctionId(auction_id.0), UserId(user_id.0))
            .instrument(span)
            .await
    }

    async fn watch_auction_internal(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> ApiResult<Json<AuctionView>> {
        let auction = self.auction_service.watch(auction_id, user_id).await?;
        Ok(Json(AuctionView::new(auction, self.clock.now())))
    }

    /// Remove a user from the watchlist of an auction
    #[oai(
        path = "/:auction_id/watchers/:user_id",
        method = "delete",
        operation_id = "unwatch_auction"
    )]
    pub async fn unwatch_auction(
        &self,
        auction_id: Path<Uuid>,
        user_id: Path<String>,
    ) -> ApiResult<Json<AuctionView>> {
        let span = info_span!("unwatch_auction", auction_id = %auction_id.0, user_id = user_id.0);
        self.unwatch_auction_internal(AuctionId(auction_id.0), UserId(user_id.0))
            .instrument(span)
            .await
    }

    async fn unwatch_auction_internal(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> ApiResult<Json<AuctionView>> {
        let auction = self.auction_service.unwatch(auction_id, user_id).await?;
        Ok(Json(AuctionView::new(auction, self.clock.now())))
    }

    /// Cancel an upcoming or active auction
    #[oai(
        path = "/:auction_id/cancel",
        method = "post",
        operation_id = "cancel_auction"
    )]
    pub async fn cancel_auction(&self, auction_id: Path<Uuid>) -> ApiResult<Json<AuctionView>> {
        let span = info_span!("cancel_auction", auction_id = %auction_id.0);
        self.cancel_auction_internal(AuctionId(auction_id.0))
            .instrument(span)
            .await
    }

    async fn cancel_auction_internal(&self, auction_id: AuctionId) -> ApiResult<Json<AuctionView>> {
        let reconciled = self.reconciler.cancel(auction_id).await?;
        Ok(Json(AuctionView::new(reconciled.auction, self.clock.now())))
    }

    /// Confirm the payment of a won auction
    ///
    /// Called by the checkout flow once the winner paid. Confirming an already sold
    /// auction again by its winner has no effect.
    #[oai(
        path = "/:auction_id/payment",
        method = "post",
        operation_id = "confirm_payment"
    )]
    pub async fn confirm_payment(
        &self,
        auction_id: Path<Uuid>,
        request: Json<PaymentConfirmation>,
    ) -> ApiResult<Json<AuctionView>> {
        let span = info_span!(
            "confirm_payment",
            auction_id = %auction_id.0,
            payer_id = request.0.payer_id
        );
        self.confirm_payment_internal(AuctionId(auction_id.0), UserId(request.0.payer_id))
            .instrument(span)
            .await
    }

    async fn confirm_payment_internal(
        &self,
        auction_id: AuctionId,
        payer_id: UserId,
    ) -> ApiResult<Json<AuctionView>> {
        let reconciled = self.reconciler.confirm_payment(auction_id, payer_id).await?;
        Ok(Json(AuctionView::new(reconciled.auction, self.clock.now())))
    }
}
