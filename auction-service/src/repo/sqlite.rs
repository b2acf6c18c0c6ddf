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

use super::{AuctionRepo, AuctionRepoError, LoggedAuctionRepo};
use crate::model::{
    AuctionId, AuctionProperty, AuctionStatus, Bid, Money, PaymentStatus, UserId,
};
use async_trait::async_trait;
use auction_common::config::DbSqliteConfig;
use chrono::{DateTime, Utc};
use indoc::indoc;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct AuctionRecord {
    auction_id: Uuid,
    title: String,
    address: String,
    seller_id: String,
    starting_price: i64,
    auction_start_time: DateTime<Utc>,
    auction_end_time: DateTime<Utc>,
    current_bid: i64,
    highest_bidder_id: Option<String>,
    highest_bidder_name: Option<String>,
    status: String,
    winner_id: Option<String>,
    payment_status: String,
    ending_soon_notified: bool,
    revision: i64,
}

#[derive(Debug, Clone, FromRow)]
struct BidRecord {
    auction_id: Uuid,
    sequence: i64,
    bidder_id: String,
    bidder_name: String,
    amount: i64,
    placed_at: DateTime<Utc>,
}

impl BidRecord {
    fn into_model(self) -> Result<Bid, AuctionRepoError> {
        Ok(Bid {
            auction_id: AuctionId(self.auction_id),
            sequence: from_db_int(self.sequence, "bids.sequence")?,
            bidder_id: UserId(self.bidder_id),
            bidder_name: self.bidder_name,
            amount: Money::from_minor_units(from_db_int(self.amount, "bids.amount")?),
            placed_at: self.placed_at,
        })
    }
}

impl AuctionRecord {
    fn into_model(
        self,
        bids: Vec<BidRecord>,
        watchers: Vec<String>,
    ) -> Result<AuctionProperty, AuctionRepoError> {
        let status = AuctionStatus::from_str(&self.status).map_err(|_| {
            AuctionRepoError::Malformed(format!("unknown auction status: {}", self.status))
        })?;
        let payment_status = PaymentStatus::from_str(&self.payment_status).map_err(|_| {
            AuctionRepoError::Malformed(format!(
                "unknown payment status: {}",
                self.payment_status
            ))
        })?;

        Ok(AuctionProperty {
            id: AuctionId(self.auction_id),
            title: self.title,
            address: self.address,
            seller_id: UserId(self.seller_id),
            starting_price: Money::from_minor_units(from_db_int(
                self.starting_price,
                "auctions.starting_price",
            )?),
            auction_start_time: self.auction_start_time,
            auction_end_time: self.auction_end_time,
            current_bid: Money::from_minor_units(from_db_int(
                self.current_bid,
                "auctions.current_bid",
            )?),
            highest_bidder_id: self.highest_bidder_id.map(UserId),
            highest_bidder_name: self.highest_bidder_name,
            status,
            winner_id: self.winner_id.map(UserId),
            payment_status,
            bid_history: bids
                .into_iter()
                .map(BidRecord::into_model)
                .collect::<Result<Vec<_>, _>>()?,
            watchlist_users: watchers.into_iter().map(UserId).collect::<BTreeSet<_>>(),
            ending_soon_notified: self.ending_soon_notified,
            revision: from_db_int(self.revision, "auctions.revision")?,
        })
    }
}

fn from_db_int(value: i64, column: &str) -> Result<u64, AuctionRepoError> {
    u64::try_from(value)
        .map_err(|_| AuctionRepoError::Malformed(format!("negative value in {column}: {value}")))
}

fn to_db_int(value: u64, column: &str) -> Result<i64, AuctionRepoError> {
    i64::try_from(value)
        .map_err(|_| AuctionRepoError::Malformed(format!("value out of range for {column}: {value}")))
}

/// Auction store backed by SQLite. Reads go through a pooled read connection set,
/// writes through a single connection so that transactions never contend.
pub struct SqliteAuctionRepo {
    read_pool: SqlitePool,
    write_pool: SqlitePool,
    changes: broadcast::Sender<AuctionProperty>,
}

impl SqliteAuctionRepo {
    pub async fn configured(
        config: &DbSqliteConfig,
        channel_capacity: usize,
    ) -> Result<Self, anyhow::Error> {
        info!(database = %config.database, "Opening SQLite auction store");

        let connect_options = config
            .connect_options()
            .journal_mode(SqliteJournalMode::Wal);

        let write_pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect_with(connect_options.clone())
            .await?;

        sqlx::migrate!("./db/migration/sqlite")
            .run(&write_pool)
            .await?;

        let read_pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(connect_options)
            .await?;

        Ok(Self::new(read_pool, write_pool, channel_capacity))
    }

    pub fn new(read_pool: SqlitePool, write_pool: SqlitePool, channel_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            read_pool,
            write_pool,
            changes,
        }
    }

    pub async fn logged(
        config: &DbSqliteConfig,
        channel_capacity: usize,
    ) -> Result<LoggedAuctionRepo<Self>, anyhow::Error> {
        Ok(LoggedAuctionRepo::new(
            Self::configured(config, channel_capacity).await?,
        ))
    }

    async fn assemble(
        conn: &mut SqliteConnection,
        record: AuctionRecord,
    ) -> Result<AuctionProperty, AuctionRepoError> {
        let bids: Vec<BidRecord> = sqlx::query_as(indoc! {r#"
            SELECT auction_id, sequence, bidder_id, bidder_name, amount, placed_at
            FROM bids
            WHERE auction_id = ?
            ORDER BY sequence
        "#})
        .bind(record.auction_id)
        .fetch_all(&mut *conn)
        .await?;

        let watchers: Vec<String> = sqlx::query_scalar(indoc! {r#"
            SELECT user_id
            FROM watchers
            WHERE auction_id = ?
            ORDER BY user_id
        "#})
        .bind(record.auction_id)
        .fetch_all(&mut *conn)
        .await?;

        record.into_model(bids, watchers)
    }

    async fn assemble_all(
        conn: &mut SqliteConnection,
        records: Vec<AuctionRecord>,
    ) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        let mut result = Vec::with_capacity(records.len());
        for record in records {
            result.push(Self::assemble(conn, record).await?);
        }
        Ok(result)
    }

    async fn insert_bids(
        conn: &mut SqliteConnection,
        bids: &[Bid],
    ) -> Result<(), AuctionRepoError> {
        for bid in bids {
            sqlx::query(indoc! {r#"
                INSERT INTO bids (auction_id, sequence, bidder_id, bidder_name, amount, placed_at)
                VALUES (?, ?, ?, ?, ?, ?)
            "#})
            .bind(bid.auction_id.0)
            .bind(to_db_int(bid.sequence, "bids.sequence")?)
            .bind(&bid.bidder_id.0)
            .bind(&bid.bidder_name)
            .bind(to_db_int(bid.amount.minor_units(), "bids.amount")?)
            .bind(bid.placed_at)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn replace_watchers(
        conn: &mut SqliteConnection,
        auction: &AuctionProperty,
    ) -> Result<(), AuctionRepoError> {
        sqlx::query("DELETE FROM watchers WHERE auction_id = ?")
            .bind(auction.id.0)
            .execute(&mut *conn)
            .await?;

        for user_id in &auction.watchlist_users {
            sqlx::query("INSERT INTO watchers (auction_id, user_id) VALUES (?, ?)")
                .bind(auction.id.0)
                .bind(&user_id.0)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    fn publish(&self, auction: &AuctionProperty) {
        let _ = self.changes.send(auction.clone());
    }
}

#[async_trait]
impl AuctionRepo for SqliteAuctionRepo {
    async fn create(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let stored = AuctionProperty {
            revision: 0,
            ..auction
        };

        let mut tx = self.write_pool.begin().await?;

        let inserted = sqlx::query(indoc! {r#"
            INSERT INTO auctions
            (auction_id, title, address, seller_id, starting_price, auction_start_time,
             auction_end_time, current_bid, highest_bidder_id, highest_bidder_name, status,
             winner_id, payment_status, ending_soon_notified, revision)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        "#})
        .bind(stored.id.0)
        .bind(&stored.title)
        .bind(&stored.address)
        .bind(&stored.seller_id.0)
        .bind(to_db_int(stored.starting_price.minor_units(), "auctions.starting_price")?)
        .bind(stored.auction_start_time)
        .bind(stored.auction_end_time)
        .bind(to_db_int(stored.current_bid.minor_units(), "auctions.current_bid")?)
        .bind(stored.highest_bidder_id.as_ref().map(|id| id.0.as_str()))
        .bind(stored.highest_bidder_name.as_deref())
        .bind(stored.status.to_string())
        .bind(stored.winner_id.as_ref().map(|id| id.0.as_str()))
        .bind(stored.payment_status.to_string())
        .bind(stored.ending_soon_notified)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|db_err| db_err.kind() == ErrorKind::UniqueViolation) =>
            {
                return Err(AuctionRepoError::AlreadyExists(stored.id));
            }
            Err(err) => return Err(err.into()),
        }

        Self::insert_bids(&mut *tx, &stored.bid_history).await?;
        Self::replace_watchers(&mut *tx, &stored).await?;

        tx.commit().await?;

        self.publish(&stored);
        Ok(stored)
    }

    async fn get(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<AuctionProperty>, AuctionRepoError> {
        let mut tx = self.read_pool.begin().await?;

        let record: Option<AuctionRecord> = sqlx::query_as(indoc! {r#"
            SELECT *
            FROM auctions
            WHERE auction_id = ?
        "#})
        .bind(auction_id.0)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match record {
            Some(record) => Some(Self::assemble(&mut *tx, record).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn list(&self) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        let mut tx = self.read_pool.begin().await?;

        let records: Vec<AuctionRecord> = sqlx::query_as(indoc! {r#"
            SELECT *
            FROM auctions
            ORDER BY auction_start_time, auction_id
        "#})
        .fetch_all(&mut *tx)
        .await?;

        let result = Self::assemble_all(&mut *tx, records).await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn list_won_by(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AuctionProperty>, AuctionRepoError> {
        let mut tx = self.read_pool.begin().await?;

        let records: Vec<AuctionRecord> = sqlx::query_as(indoc! {r#"
            SELECT *
            FROM auctions
            WHERE winner_id = ? AND payment_status <> 'none'
            ORDER BY auction_end_time
        "#})
        .bind(&user_id.0)
        .fetch_all(&mut *tx)
        .await?;

        let result = Self::assemble_all(&mut *tx, records).await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn update(&self, auction: AuctionProperty) -> Result<AuctionProperty, AuctionRepoError> {
        let mut tx = self.write_pool.begin().await?;

        let updated = sqlx::query(indoc! {r#"
            UPDATE auctions
            SET title = ?, address = ?, seller_id = ?, starting_price = ?,
                auction_start_time = ?, auction_end_time = ?, current_bid = ?,
                highest_bidder_id = ?, highest_bidder_name = ?, status = ?, winner_id = ?,
                payment_status = ?, ending_soon_notified = ?, revision = revision + 1
            WHERE auction_id = ? AND revision = ?
        "#})
        .bind(&auction.title)
        .bind(&auction.address)
        .bind(&auction.seller_id.0)
        .bind(to_db_int(auction.starting_price.minor_units(), "auctions.starting_price")?)
        .bind(auction.auction_start_time)
        .bind(auction.auction_end_time)
        .bind(to_db_int(auction.current_bid.minor_units(), "auctions.current_bid")?)
        .bind(auction.highest_bidder_id.as_ref().map(|id| id.0.as_str()))
        .bind(auction.highest_bidder_name.as_deref())
        .bind(auction.status.to_string())
        .bind(auction.winner_id.as_ref().map(|id| id.0.as_str()))
        .bind(auction.payment_status.to_string())
        .bind(auction.ending_soon_notified)
        .bind(auction.id.0)
        .bind(to_db_int(auction.revision, "auctions.revision")?)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM auctions WHERE auction_id = ?")
                    .bind(auction.id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match exists {
                Some(_) => Err(AuctionRepoError::ConcurrentModification),
                None => Err(AuctionRepoError::NotFound(auction.id)),
            };
        }

        // Bid history is append-only, only the entries past the stored tail are new
        let last_sequence: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM bids WHERE auction_id = ?")
                .bind(auction.id.0)
                .fetch_one(&mut *tx)
                .await?;
        let next_sequence = match last_sequence {
            Some(last) => from_db_int(last, "bids.sequence")? + 1,
            None => 0,
        };
        let new_bids: Vec<Bid> = auction
            .bid_history
            .iter()
            .filter(|bid| bid.sequence >= next_sequence)
            .cloned()
            .collect();
        Self::insert_bids(&mut *tx, &new_bids).await?;
        Self::replace_watchers(&mut *tx, &auction).await?;

        tx.commit().await?;

        let stored = AuctionProperty {
            revision: auction.revision + 1,
            ..auction
        };
        self.publish(&stored);
        Ok(stored)
    }

    fn changes(&self) -> broadcast::Receiver<AuctionProperty> {
        self.changes.subscribe()
    }
}
