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
use assert2::let_assert;
use auction_common::config::DbSqliteConfig;
use auction_service::repo::sqlite::SqliteAuctionRepo;
use auction_service::repo::{AuctionRepo, AuctionRepoError};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use test_r::{inherit_test_dep, test, test_dep};
use tracing::info;

inherit_test_dep!(Tracing);

// Deps setup --------------------------------------------------------------------------------------

pub struct SqliteDb {
    _dir: TempDir,
    pub config: DbSqliteConfig,
    pub repo: Arc<SqliteAuctionRepo>,
}

impl SqliteDb {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("auctions.sqlite");
        let db_config = DbSqliteConfig {
            database: db_path.to_string_lossy().to_string(),
            max_connections: 3,
            foreign_keys: true,
        };

        let repo = SqliteAuctionRepo::configured(&db_config, 64).await.unwrap();

        info!("Created sqlite auction store, database path: {}", db_config.database);

        Self {
            _dir: dir,
            config: db_config,
            repo: Arc::new(repo),
        }
    }
}

#[test_dep]
async fn sqlite_db(_tracing: &Tracing) -> SqliteDb {
    SqliteDb::new().await
}

#[test_dep]
fn deps(db: &SqliteDb) -> Deps {
    Deps {
        repo: db.repo.clone(),
    }
}

// Test cases --------------------------------------------------------------------------------------

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

#[test]
async fn test_malformed_status_is_reported(db: &SqliteDb) {
    let auction = db
        .repo
        .create(crate::repo::common::sample_auction())
        .await
        .unwrap();

    let pool = SqlitePool::connect_with(db.config.connect_options())
        .await
        .unwrap();
    sqlx::query("UPDATE auctions SET status = 'frozen' WHERE auction_id = ?")
        .bind(auction.id.0)
        .execute(&pool)
        .await
        .unwrap();

    let result = db.repo.get(auction.id).await;
    let_assert!(Err(AuctionRepoError::Malformed(message)) = result);
    assert!(message.contains("frozen"));

    // Keep the shared database readable for the other test cases
    sqlx::query("DELETE FROM auctions WHERE auction_id = ?")
        .bind(auction.id.0)
        .execute(&pool)
        .await
        .unwrap();
}
