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

use crate::Tracing;
use crate::repo::Deps;
use auction_service::repo::memory::InMemoryAuctionRepo;
use std::sync::Arc;
use test_r::{inherit_test_dep, test, test_dep};

inherit_test_dep!(Tracing);

#[test_dep]
fn deps(_tracing: &Tracing) -> Deps {
    Deps {
        repo: Arc::new(InMemoryAuctionRepo::logged(64)),
    }
}

#[test]
async fn test_create_and_get(deps: &Deps) {
    crate::repo::common::test_create_and_get(deps).await;
}

#[test]
async fn test_update_is_conditional_on_revision(deps: &Deps) {
    crate::repo::common::test_update_is_conditional_on_revision(deps).await;
}

#[test]
async fn test_bids_and_watchers_are_stored(deps: &Deps) {
    crate::repo::common::test_bids_and_watchers_are_stored(deps).await;
}

#[test]
async fn test_list_won_by(deps: &Deps) {
    crate::repo::common::test_list_won_by(deps).await;
}

#[test]
async fn test_changes_are_published(deps: &Deps) {
    crate::repo::common::test_changes_are_published(deps).await;
}

#[test]
async fn test_concurrent_updates_of_same_revision(deps: &Deps) {
    crate::repo::common::test_concurrent_updates_of_same_revision(deps).await;
}

#[test]
async fn test_amounts_beyond_store_range_are_rejected(deps: &Deps) {
    crate::repo::common::test_amounts_beyond_store_range_are_rejected(deps).await;
}
