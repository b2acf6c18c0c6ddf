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

pub mod auctions;
pub mod error;
pub mod model;
pub mod users;

use self::auctions::AuctionsApi;
use self::error::ApiError;
use self::users::UsersApi;
use crate::bootstrap::Services;
use poem_openapi::payload::Json;
use poem_openapi::{Object, OpenApi, OpenApiService, Tags};
use serde::{Deserialize, Serialize};

#[derive(Tags)]
pub enum ApiTags {
    /// Listing, bidding, watching and settling property auctions.
    Auction,
    HealthCheck,
    /// Per-user views such as auctions awaiting payment.
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct Empty {}

pub struct HealthcheckApi;

#[OpenApi(prefix_path = "/", tag = ApiTags::HealthCheck)]
impl HealthcheckApi {
    #[oai(path = "/healthcheck", method = "get", operation_id = "healthcheck")]
    async fn healthcheck(&self) -> Json<Empty> {
        Json(Empty {})
    }
}

pub type Apis = (HealthcheckApi, AuctionsApi, UsersApi);

pub type ApiResult<T> = Result<T, ApiError>;

pub fn make_open_api_service(services: &Services) -> OpenApiService<Apis, ()> {
    OpenApiService::new(
        (
            HealthcheckApi,
            AuctionsApi::new(
                services.auction_service.clone(),
                services.bid_service.clone(),
                services.reconciler.clone(),
                services.voice_bid_handler.clone(),
                services.clock.clone(),
            ),
            UsersApi::new(services.payment_gate.clone(), services.clock.clone()),
        ),
        "Auction API",
        "1.0",
    )
}
