// Postgres-backed store adapter

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::model::{ApprovalState, Contact, FinalMatchStatus, NewMatch, PropertyMatchStatus};
use crate::store::MatchStore;

pub struct PgStore {
    pool: PgPool,
    io_timeout: Duration,
}

impl PgStore {
    pub async fn connect(url: &str, io_timeout: Duration) -> StoreResult<Self> {
        let connect = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(io_timeout)
            .connect(url);
        let pool = tokio::time::timeout(io_timeout, connect)
            .await
            .map_err(|_| StoreError::Timeout(io_timeout))??;
        info!("connected to database");
        Ok(Self { pool, io_timeout })
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.io_timeout))?
            .map_err(StoreError::from)
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn commit_matches(
        &self,
        rows: &[NewMatch],
        matched_property_ids: &[i64],
    ) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let pool = self.pool.clone();
        self.bounded(async move {
            let mut tx = pool.begin().await?;

            for row in rows {
                sqlx::query(
                    r#"
                    INSERT INTO match_history (
                        matched_at, user_a_id, user_b_id,
                        prop_a_id, prop_b_id, surv_a_id, surv_b_id,
                        compatibility_score, a_approval, b_approval, final_match_status
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(row.matched_at)
                .bind(row.user_a)
                .bind(row.user_b)
                .bind(row.prop_a)
                .bind(row.prop_b)
                .bind(row.surv_a)
                .bind(row.surv_b)
                .bind(row.compatibility_score)
                .bind(ApprovalState::Pending as i16)
                .bind(ApprovalState::Pending as i16)
                .bind(FinalMatchStatus::Pending as i16)
                .execute(tx.as_mut())
                .await?;
            }

            sqlx::query("UPDATE match_properties SET match_status = $1 WHERE property_id = ANY($2)")
                .bind(PropertyMatchStatus::Matched as i16)
                .bind(matched_property_ids)
                .execute(tx.as_mut())
                .await?;

            tx.commit().await
        })
        .await
    }

    async fn expire_properties(&self, property_ids: &[i64]) -> StoreResult<u64> {
        if property_ids.is_empty() {
            return Ok(0);
        }

        let pool = self.pool.clone();
        self.bounded(async move {
            let result = sqlx::query(
                "UPDATE match_properties SET match_status = $1 WHERE property_id = ANY($2)",
            )
            .bind(PropertyMatchStatus::Expired as i16)
            .bind(property_ids)
            .execute(&pool)
            .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    async fn fetch_contacts(&self, user_ids: &[Uuid]) -> StoreResult<Vec<Contact>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let pool = self.pool.clone();
        self.bounded(async move {
            let rows = sqlx::query(
                "SELECT user_id, email, nickname, name FROM account_customuser WHERE user_id = ANY($1)",
            )
            .bind(user_ids)
            .fetch_all(&pool)
            .await?;

            rows.iter()
                .map(|row| {
                    Ok(Contact {
                        user_id: row.try_get("user_id")?,
                        email: row.try_get("email")?,
                        nickname: row.try_get("nickname")?,
                        name: row.try_get("name")?,
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()
        })
        .await
    }
}
