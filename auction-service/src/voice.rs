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

use crate::model::{AuctionId, AuctionStatus, Money, UserId};
use crate::services::bid::{BidError, BidService};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;

static AMOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \$?\s*
        (?P<whole>\d{1,3}(?:,\d{3})+|\d+)
        (?:\.(?P<fraction>\d+))?
        \s*
        (?P<suffix>thousand|grand|k|million|mil|m)?
        \b",
    )
    .expect("Invalid amount regex")
});

const MAX_FRACTION_DIGITS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountParseError {
    #[error("No amount found in: {0}")]
    NoAmount(String),
    #[error("Amount has too many decimal places")]
    TooPrecise,
    #[error("Amount is too large")]
    TooLarge,
    #[error("Amount must be positive")]
    Zero,
}

/// Extracts a money amount from free text such as "$150,000", "150k",
/// "bid 1.5 million" or "200 thousand dollars". Fractions of a cent are dropped;
/// amounts above `Money::MAX` are `TooLarge`.
pub fn parse_spoken_amount(text: &str) -> Result<Money, AmountParseError> {
    let captures = AMOUNT_PATTERN
        .captures(text)
        .ok_or_else(|| AmountParseError::NoAmount(text.to_string()))?;

    let whole: u128 = captures["whole"]
        .replace(',', "")
        .parse()
        .map_err(|_| AmountParseError::TooLarge)?;

    let fraction = captures.name("fraction").map_or("", |m| m.as_str());
    if fraction.len() > MAX_FRACTION_DIGITS {
        return Err(AmountParseError::TooPrecise);
    }
    let scale = 10u128.pow(fraction.len() as u32);
    let fraction_value: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| AmountParseError::TooPrecise)?
    };

    let multiplier: u128 = match captures
        .name("suffix")
        .map(|m| m.as_str().to_lowercase())
        .as_deref()
    {
        Some("k") | Some("thousand") | Some("grand") => 1_000,
        Some("m") | Some("mil") | Some("million") => 1_000_000,
        _ => 1,
    };

    let cents = whole
        .checked_mul(scale)
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .and_then(|value| value.checked_mul(multiplier))
        .and_then(|value| value.checked_mul(100))
        .map(|value| value / scale)
        .ok_or(AmountParseError::TooLarge)?;

    let cents = u64::try_from(cents).map_err(|_| AmountParseError::TooLarge)?;
    if cents > Money::MAX.minor_units() {
        Err(AmountParseError::TooLarge)
    } else if cents == 0 {
        Err(AmountParseError::Zero)
    } else {
        Ok(Money::from_minor_units(cents))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceBidResponse {
    pub accepted: bool,
    pub message: String,
}

impl VoiceBidResponse {
    fn accepted(message: String) -> Self {
        Self {
            accepted: true,
            message,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
        }
    }
}

/// Entry point for bids spoken to a voice assistant. Goes through the same
/// `BidService` as every other caller and answers in plain sentences.
pub struct VoiceBidHandler {
    bid_service: Arc<BidService>,
}

impl VoiceBidHandler {
    pub fn new(bid_service: Arc<BidService>) -> Self {
        Self { bid_service }
    }

    pub async fn handle(
        &self,
        auction_id: AuctionId,
        bidder_id: UserId,
        bidder_name: String,
        utterance: &str,
    ) -> VoiceBidResponse {
        let amount = match parse_spoken_amount(utterance) {
            Ok(amount) => amount,
            Err(err) => {
                info!(auction_id = %auction_id, "Could not parse spoken bid: {err}");
                return VoiceBidResponse::rejected(Self::explain_amount(&err));
            }
        };

        match self
            .bid_service
            .submit_bid(auction_id, bidder_id, bidder_name, amount)
            .await
        {
            Ok(bid) => VoiceBidResponse::accepted(format!(
                "Your bid of {} has been placed. You are now the highest bidder.",
                bid.amount
            )),
            Err(err) => VoiceBidResponse::rejected(Self::explain(&err)),
        }
    }

    fn explain_amount(error: &AmountParseError) -> String {
        match error {
            AmountParseError::NoAmount(_) => {
                "Sorry, I didn't catch the amount. Try saying something like \"bid 150 thousand\"."
                    .to_string()
            }
            AmountParseError::Zero => "Your bid has to be more than zero.".to_string(),
            AmountParseError::TooPrecise => {
                "That amount has too many decimal places. Bids go down to the cent.".to_string()
            }
            AmountParseError::TooLarge => {
                format!("That's more than the maximum bid of {}.", Money::MAX)
            }
        }
    }

    fn explain(error: &BidError) -> String {
        match error {
            BidError::BidTooLow { current_bid } => {
                format!("Your bid must exceed the current bid of {current_bid}.")
            }
            BidError::AuctionNotActive { status } => match status {
                AuctionStatus::Upcoming => "This auction hasn't started yet.".to_string(),
                AuctionStatus::Cancelled => "This auction has been cancelled.".to_string(),
                AuctionStatus::Active | AuctionStatus::Ended | AuctionStatus::Sold => {
                    "This auction has already ended.".to_string()
                }
            },
            BidError::BidTooHigh { max_bid } => {
                format!("That's more than the maximum bid of {max_bid}.")
            }
            BidError::AlreadyHighestBidder => "You are already the highest bidder.".to_string(),
            BidError::ConcurrentBidConflict { .. } => {
                "Another bid came in at the same moment. Please try again.".to_string()
            }
            BidError::AuctionNotFound(_) => "I couldn't find that auction.".to_string(),
            BidError::StoreUnavailable(_) | BidError::InternalError(_) => {
                "Bidding is temporarily unavailable. Please try again shortly.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use test_r::test;

    #[test]
    fn parses_plain_and_formatted_amounts() {
        check!(parse_spoken_amount("150000") == Ok(Money::from_major_units(150_000)));
        check!(parse_spoken_amount("$150,000") == Ok(Money::from_major_units(150_000)));
        check!(parse_spoken_amount("bid $1,250,000 please") == Ok(Money::from_major_units(1_250_000)));
        check!(parse_spoken_amount("$99.50") == Ok(Money::from_minor_units(9_950)));
    }

    #[test]
    fn parses_suffixes() {
        check!(parse_spoken_amount("150k") == Ok(Money::from_major_units(150_000)));
        check!(parse_spoken_amount("200 thousand dollars") == Ok(Money::from_major_units(200_000)));
        check!(parse_spoken_amount("1.5 million") == Ok(Money::from_major_units(1_500_000)));
        check!(parse_spoken_amount("2M") == Ok(Money::from_major_units(2_000_000)));
    }

    #[test]
    fn suffix_must_be_a_whole_word() {
        check!(parse_spoken_amount("150 meters") == Ok(Money::from_major_units(150)));
    }

    #[test]
    fn rejects_text_without_amount() {
        let_assert!(Err(AmountParseError::NoAmount(_)) = parse_spoken_amount("bid a lot"));
        check!(parse_spoken_amount("0") == Err(AmountParseError::Zero));
        check!(parse_spoken_amount("99999999999999999999 million") == Err(AmountParseError::TooLarge));
    }

    #[test]
    fn amounts_beyond_the_maximum_bid_are_too_large() {
        // Fits in u64 cents but not in the stores
        check!(
            parse_spoken_amount("$100,000,000,000,000,000") == Err(AmountParseError::TooLarge)
        );
        check!(parse_spoken_amount("92233720368547758.07") == Ok(Money::MAX));
        check!(parse_spoken_amount("1.1234567") == Err(AmountParseError::TooPrecise));
    }

    #[test]
    fn each_amount_problem_has_its_own_answer() {
        check!(
            VoiceBidHandler::explain_amount(&AmountParseError::TooLarge)
                == "That's more than the maximum bid of $92,233,720,368,547,758.07."
        );
        check!(
            VoiceBidHandler::explain_amount(&AmountParseError::TooPrecise)
                == "That amount has too many decimal places. Bids go down to the cent."
        );
        check!(
            VoiceBidHandler::explain_amount(&AmountParseError::Zero)
                == "Your bid has to be more than zero."
        );
        check!(
            VoiceBidHandler::explain_amount(&AmountParseError::NoAmount("hi".to_string()))
                .starts_with("Sorry, I didn't catch the amount.")
        );
    }
}
