use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Diagnostic, DiagnosticInput, DiagnosticResult};

/// Where computed diagnostics are kept. Every read is scoped to the owner.
#[async_trait]
pub trait DiagnosticStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, result: &DiagnosticResult) -> anyhow::Result<Diagnostic>;

    /// Stores every result or none of them, oldest first.
    async fn insert_batch(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>>;

    /// Atomically swaps the user's whole history for `results`.
    async fn replace_for_user(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>>;

    /// Newest first; rows sharing a timestamp keep insertion order.
    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> anyhow::Result<Vec<Diagnostic>>;

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Diagnostic>>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, created_at, monthly_income, monthly_impulsive_spending, \
     hours_wasted_per_day, hours_studying_per_day, discipline_score, five_year_wasted_hours, \
     five_year_money_wasted, projected_income_if_unchanged, projected_income_if_disciplined";

fn diagnostic_from_row(row: &PgRow) -> anyhow::Result<Diagnostic> {
    let score: i16 = row.get("discipline_score");
    let discipline_score =
        u8::try_from(score).with_context(|| format!("stored score {score} out of range"))?;

    Ok(Diagnostic {
        id: row.get("id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        result: DiagnosticResult {
            input: DiagnosticInput {
                monthly_income: row.get("monthly_income"),
                monthly_impulsive_spending: row.get("monthly_impulsive_spending"),
                hours_wasted_per_day: row.get("hours_wasted_per_day"),
                hours_studying_per_day: row.get("hours_studying_per_day"),
            },
            discipline_score,
            five_year_wasted_hours: row.get("five_year_wasted_hours"),
            five_year_money_wasted: row.get("five_year_money_wasted"),
            projected_income_if_unchanged: row.get("projected_income_if_unchanged"),
            projected_income_if_disciplined: row.get("projected_income_if_disciplined"),
        },
    })
}

/// `seq` breaks ties between rows written in the same transaction.
const LIST_ORDER: &str = "ORDER BY created_at DESC, seq DESC";

async fn insert_row(
    conn: &mut PgConnection,
    user_id: Uuid,
    result: &DiagnosticResult,
) -> anyhow::Result<Diagnostic> {
    let id = Uuid::new_v4();
    let row = sqlx::query(
        r#"
        INSERT INTO discipline_diagnostic.diagnostics
        (id, user_id, monthly_income, monthly_impulsive_spending, hours_wasted_per_day,
         hours_studying_per_day, discipline_score, five_year_wasted_hours,
         five_year_money_wasted, projected_income_if_unchanged, projected_income_if_disciplined)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(result.input.monthly_income)
    .bind(result.input.monthly_impulsive_spending)
    .bind(result.input.hours_wasted_per_day)
    .bind(result.input.hours_studying_per_day)
    .bind(i16::from(result.discipline_score))
    .bind(result.five_year_wasted_hours)
    .bind(result.five_year_money_wasted)
    .bind(result.projected_income_if_unchanged)
    .bind(result.projected_income_if_disciplined)
    .fetch_one(&mut *conn)
    .await
    .context("failed to save diagnostic")?;

    Ok(Diagnostic {
        id,
        user_id,
        created_at: row.get("created_at"),
        result: *result,
    })
}

#[async_trait]
impl DiagnosticStore for PgStore {
    async fn insert(&self, user_id: Uuid, result: &DiagnosticResult) -> anyhow::Result<Diagnostic> {
        let mut conn = self.pool.acquire().await?;
        insert_row(&mut conn, user_id, result).await
    }

    async fn insert_batch(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            stored.push(insert_row(&mut tx, user_id, result).await?);
        }
        tx.commit().await.context("failed to commit diagnostics")?;
        Ok(stored)
    }

    async fn replace_for_user(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM discipline_diagnostic.diagnostics WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("failed to clear diagnostics")?;

        let mut stored = Vec::with_capacity(results.len());
        for result in results {
            stored.push(insert_row(&mut tx, user_id, result).await?);
        }
        tx.commit().await.context("failed to commit diagnostics")?;
        Ok(stored)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> anyhow::Result<Vec<Diagnostic>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM discipline_diagnostic.diagnostics \
             WHERE user_id = $1 {LIST_ORDER} LIMIT $2"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch diagnostics")?;

        rows.iter().map(diagnostic_from_row).collect()
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Diagnostic>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM discipline_diagnostic.diagnostics \
             WHERE id = $1 AND user_id = $2"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch diagnostic")?;

        row.as_ref().map(diagnostic_from_row).transpose()
    }
}

/// In-process store used by tests and `serve --ephemeral`.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Diagnostic>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_records(user_id: Uuid, results: &[DiagnosticResult]) -> Vec<Diagnostic> {
    let created_at = Utc::now();
    results
        .iter()
        .map(|result| Diagnostic {
            id: Uuid::new_v4(),
            user_id,
            created_at,
            result: *result,
        })
        .collect()
}

#[async_trait]
impl DiagnosticStore for MemoryStore {
    async fn insert(&self, user_id: Uuid, result: &DiagnosticResult) -> anyhow::Result<Diagnostic> {
        let diagnostic = Diagnostic {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            result: *result,
        };
        self.records.write().await.push(diagnostic.clone());
        Ok(diagnostic)
    }

    async fn insert_batch(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let stored = build_records(user_id, results);
        self.records.write().await.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn replace_for_user(
        &self,
        user_id: Uuid,
        results: &[DiagnosticResult],
    ) -> anyhow::Result<Vec<Diagnostic>> {
        let stored = build_records(user_id, results);
        let mut records = self.records.write().await;
        records.retain(|d| d.user_id != user_id);
        records.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> anyhow::Result<Vec<Diagnostic>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Diagnostic>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|d| d.id == id && d.user_id == user_id)
            .cloned())
    }
}
