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

use crate::repo::AuctionRepoError;
use crate::services::auction::AuctionError;
use crate::services::bid::BidError;
use crate::services::reconciler::ReconcilerError;
use auction_common::SafeDisplay;
use poem_openapi::payload::Json;
use poem_openapi::{ApiResponse, Object};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
pub struct ErrorsBody {
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Object)]
#[oai(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct BidTooLowBody {
    pub error: String,
    pub current_bid_cents: u64,
}

#[derive(ApiResponse, Debug, Clone)]
pub enum ApiError {
    /// Invalid request, returning with a list of issues detected in the request
    #[oai(status = 400)]
    BadRequest(Json<ErrorsBody>),
    /// Entity not found
    #[oai(status = 404)]
    NotFound(Json<ErrorBody>),
    /// The auction kept changing while the request was processed
    #[oai(status = 409)]
    Conflict(Json<ErrorBody>),
    /// The bid does not exceed the current bid
    #[oai(status = 422)]
    BidTooLow(Json<BidTooLowBody>),
    /// Internal server error
    #[oai(status = 500)]
    InternalError(Json<ErrorBody>),
    /// The auction store cannot be reached, the request may be retried
    #[oai(status = 503)]
    ServiceUnavailable(Json<ErrorBody>),
}

impl ApiError {
    fn bad_request(error: &impl SafeDisplay) -> Self {
        Self::BadRequest(Json(ErrorsBody {
            errors: vec![error.to_safe_string()],
        }))
    }

    fn not_found(error: &impl SafeDisplay) -> Self {
        Self::NotFound(Json(ErrorBody {
            error: error.to_safe_string(),
        }))
    }

    fn conflict(error: &impl SafeDisplay) -> Self {
        Self::Conflict(Json(ErrorBody {
            error: error.to_safe_string(),
        }))
    }

    fn unavailable(error: &(impl SafeDisplay + std::fmt::Display)) -> Self {
        error!("Auction store unavailable: {error:#}");
        Self::ServiceUnavailable(Json(ErrorBody {
            error: error.to_safe_string(),
        }))
    }

    fn internal(error: &(impl SafeDisplay + std::fmt::Debug)) -> Self {
        error!("Internal error: {error:?}");
        Self::InternalError(Json(ErrorBody {
            error: error.to_safe_string(),
        }))
    }
}

impl From<BidError> for ApiError {
    fn from(value: BidError) -> Self {
        match value {
            BidError::AuctionNotFound(_) => Self::not_found(&value),
            BidError::BidTooLow { current_bid } => Self::BidTooLow(Json(BidTooLowBody {
                error: value.to_safe_string(),
                current_bid_cents: current_bid.minor_units(),
            })),
            BidError::AuctionNotActive { .. }
            | BidError::BidTooHigh { .. }
            | BidError::AlreadyHighestBidder => {
                Self::bad_request(&value)
            }
            BidError::ConcurrentBidConflict { .. } => Self::conflict(&value),
            BidError::StoreUnavailable(_) => Self::unavailable(&value),
            BidError::InternalError(_) => Self::internal(&value),
        }
    }
}

impl From<AuctionError> for ApiError {
    fn from(value: AuctionError) -> Self {
        match value {
            AuctionError::AuctionNotFound(_) => Self::not_found(&value),
            AuctionError::InvalidListing(_) => Self::bad_request(&value),
            AuctionError::ConcurrentModification { .. } => Self::conflict(&value),
            AuctionError::StoreUnavailable(_) => Self::unavailable(&value),
            AuctionError::InternalError(_) => Self::internal(&value),
        }
    }
}

impl From<ReconcilerError> for ApiError {
    fn from(value: ReconcilerError) -> Self {
        match value {
            ReconcilerError::AuctionNotFound(_) => Self::not_found(&value),
            ReconcilerError::AuctionNotEnded { .. }
            | ReconcilerError::PaymentNotPending { .. }
            | ReconcilerError::NotWinner
            | ReconcilerError::NotCancellable { .. } => Self::bad_request(&value),
            ReconcilerError::ConcurrentModification { .. } => Self::conflict(&value),
            ReconcilerError::StoreUnavailable(_) => Self::unavailable(&value),
            ReconcilerError::InternalError(_) => Self::internal(&value),
        }
    }
}

impl From<AuctionRepoError> for ApiError {
    fn from(value: AuctionRepoError) -> Self {
        match value {
            AuctionRepoError::NotFound(_) => Self::not_found(&value),
            AuctionRepoError::AlreadyExists(_) | AuctionRepoError::ConcurrentModification => {
                Self::conflict(&value)
            }
            AuctionRepoError::Unavailable(_) | AuctionRepoError::Malformed(_) => {
                Self::unavailable(&value)
            }
            AuctionRepoError::InternalError(_) => Self::internal(&value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuctionId, AuctionStatus, Money};
    use assert2::{check, let_assert};
    use test_r::test;

    #[test]
    fn bid_too_low_carries_the_current_bid() {
        let error = ApiError::from(BidError::BidTooLow {
            current_bid: Money::from_major_units(100_000),
        });
        let_assert!(ApiError::BidTooLow(Json(body)) = error);
        check!(body.current_bid_cents == 10_000_000);
        check!(body.error == "Bid must exceed the current bid of $100,000");
    }

    #[test]
    fn error_categories_map_to_status_families() {
        let_assert!(
            ApiError::BadRequest(_) = ApiError::from(BidError::AuctionNotActive {
                status: AuctionStatus::Ended
            })
        );
        let_assert!(
            ApiError::BadRequest(Json(body)) = ApiError::from(BidError::BidTooHigh {
                max_bid: Money::MAX
            })
        );
        check!(
            body.errors
                == vec!["Bid must not exceed the maximum bid of $92,233,720,368,547,758.07".to_string()]
        );
        let_assert!(
            ApiError::NotFound(_) = ApiError::from(BidError::AuctionNotFound(AuctionId::new()))
        );
        let_assert!(
            ApiError::Conflict(_) =
                ApiError::from(BidError::ConcurrentBidConflict { attempts: 3 })
        );
        let_assert!(
            ApiError::ServiceUnavailable(_) = ApiError::from(BidError::StoreUnavailable(
                AuctionRepoError::Unavailable("connection refused".to_string())
            ))
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let error = ApiError::from(ReconcilerError::InternalError(anyhow::anyhow!(
            "secret connection string"
        )));
        let_assert!(ApiError::InternalError(Json(body)) = error);
        check!(body.error == "Internal error");
    }
}
