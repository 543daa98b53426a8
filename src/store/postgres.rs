use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres};
use uuid::Uuid;

use super::{RecordFilter, RecordStore, SortOrder};
use crate::{
    error::{AppError, AppResult},
    models::{
        ExpensePatch, ExpenseRecord, IncomePatch, IncomeRecord, MealProviderPatch,
        MealProviderRecord, MealStatus, NewExpense, NewIncome, NewMealProvider,
    },
};

#[derive(Clone)]
pub struct PgStore {
    p: Pool<Postgres>,
}

impl PgStore {
    pub fn new(p: Pool<Postgres>) -> Self {
        Self { p }
    }
}

fn select_sql(table: &str, with_category: bool, order: SortOrder) -> String {
    let category = if with_category {
        " AND ($3::text IS NULL OR category = $3)"
    } else {
        ""
    };
    let dir = order.as_sql();
    format!(
        r#"
        SELECT *
        FROM {table}
        WHERE
            ($1::date IS NULL OR date >= $1) AND
            ($2::date IS NULL OR date <= $2){category}
        ORDER BY date {dir}, created_at {dir}
        "#
    )
}

async fn fetch_by_id<R>(p: &Pool<Postgres>, table: &'static str, id: Uuid) -> AppResult<R>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {table} WHERE id = $1");
    let record = sqlx::query_as::<_, R>(&sql)
        .bind(id)
        .fetch_optional(p)
        .await?;
    record.ok_or_else(|| AppError::not_found(table, id))
}

#[async_trait]
impl RecordStore<IncomeRecord> for PgStore {
    async fn create(&self, fields: NewIncome) -> AppResult<IncomeRecord> {
        let record = sqlx::query_as::<_, IncomeRecord>(
            r#"
            INSERT INTO income (date, source, amount, category, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(fields.date)
        .bind(fields.source)
        .bind(fields.amount)
        .bind(fields.category)
        .bind(fields.note)
        .fetch_one(&self.p)
        .await?;
        Ok(record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<IncomeRecord>> {
        let sql = select_sql("income", true, order);
        log::debug!("income query {:?}", filter);
        let records = sqlx::query_as::<_, IncomeRecord>(&sql)
            .bind(filter.range.map(|r| r.start))
            .bind(filter.range.map(|r| r.end))
            .bind(filter.category.as_deref())
            .fetch_all(&self.p)
            .await?;
        Ok(records)
    }

    async fn find_one(&self, id: Uuid) -> AppResult<IncomeRecord> {
        fetch_by_id(&self.p, "income", id).await
    }

    async fn update(&self, id: Uuid, patch: IncomePatch) -> AppResult<IncomeRecord> {
        let record = sqlx::query_as::<_, IncomeRecord>(
            r#"
            UPDATE income SET
                date = COALESCE($2, date),
                source = COALESCE($3, source),
                amount = COALESCE($4, amount),
                category = COALESCE($5, category),
                note = CASE WHEN $6 THEN $7 ELSE note END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.date)
        .bind(patch.source)
        .bind(patch.amount)
        .bind(patch.category)
        .bind(patch.note.is_some())
        .bind(patch.note.flatten())
        .fetch_optional(&self.p)
        .await?;
        record.ok_or_else(|| AppError::not_found("income", id))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM income WHERE id = $1")
            .bind(id)
            .execute(&self.p)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found("income", id));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore<ExpenseRecord> for PgStore {
    async fn create(&self, fields: NewExpense) -> AppResult<ExpenseRecord> {
        let record = sqlx::query_as::<_, ExpenseRecord>(
            r#"
            INSERT INTO expense (date, purpose, amount, category, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(fields.date)
        .bind(fields.purpose)
        .bind(fields.amount)
        .bind(fields.category)
        .bind(fields.note)
        .fetch_one(&self.p)
        .await?;
        Ok(record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<ExpenseRecord>> {
        let sql = select_sql("expense", true, order);
        log::debug!("expense query {:?}", filter);
        let records = sqlx::query_as::<_, ExpenseRecord>(&sql)
            .bind(filter.range.map(|r| r.start))
            .bind(filter.range.map(|r| r.end))
            .bind(filter.category.as_deref())
            .fetch_all(&self.p)
            .await?;
        Ok(records)
    }

    async fn find_one(&self, id: Uuid) -> AppResult<ExpenseRecord> {
        fetch_by_id(&self.p, "expense", id).await
    }

    async fn update(&self, id: Uuid, patch: ExpensePatch) -> AppResult<ExpenseRecord> {
        let record = sqlx::query_as::<_, ExpenseRecord>(
            r#"
            UPDATE expense SET
                date = COALESCE($2, date),
                purpose = COALESCE($3, purpose),
                amount = COALESCE($4, amount),
                category = COALESCE($5, category),
                note = CASE WHEN $6 THEN $7 ELSE note END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.date)
        .bind(patch.purpose)
        .bind(patch.amount)
        .bind(patch.category)
        .bind(patch.note.is_some())
        .bind(patch.note.flatten())
        .fetch_optional(&self.p)
        .await?;
        record.ok_or_else(|| AppError::not_found("expense", id))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM expense WHERE id = $1")
            .bind(id)
            .execute(&self.p)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found("expense", id));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore<MealProviderRecord> for PgStore {
    async fn create(&self, fields: NewMealProvider) -> AppResult<MealProviderRecord> {
        let record = sqlx::query_as::<_, MealProviderRecord>(
            r#"
            INSERT INTO meal_provider (provider_name, address, phone, date, status, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(fields.provider_name)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.date)
        .bind(MealStatus::Pending.as_str())
        .bind(fields.note)
        .fetch_one(&self.p)
        .await?;
        Ok(record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<MealProviderRecord>> {
        let sql = select_sql("meal_provider", false, order);
        log::debug!("meal_provider query {:?}", filter.range);
        let records = sqlx::query_as::<_, MealProviderRecord>(&sql)
            .bind(filter.range.map(|r| r.start))
            .bind(filter.range.map(|r| r.end))
            .fetch_all(&self.p)
            .await?;
        Ok(records)
    }

    async fn find_one(&self, id: Uuid) -> AppResult<MealProviderRecord> {
        fetch_by_id(&self.p, "meal_provider", id).await
    }

    async fn update(&self, id: Uuid, patch: MealProviderPatch) -> AppResult<MealProviderRecord> {
        let record = sqlx::query_as::<_, MealProviderRecord>(
            r#"
            UPDATE meal_provider SET
                provider_name = COALESCE($2, provider_name),
                address = CASE WHEN $3 THEN $4 ELSE address END,
                phone = CASE WHEN $5 THEN $6 ELSE phone END,
                date = COALESCE($7, date),
                note = CASE WHEN $8 THEN $9 ELSE note END,
                status = COALESCE($10, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.provider_name)
        .bind(patch.address.is_some())
        .bind(patch.address.flatten())
        .bind(patch.phone.is_some())
        .bind(patch.phone.flatten())
        .bind(patch.date)
        .bind(patch.note.is_some())
        .bind(patch.note.flatten())
        .bind(patch.status.map(|s| s.as_str()))
        .fetch_optional(&self.p)
        .await?;
        record.ok_or_else(|| AppError::not_found("meal_provider", id))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM meal_provider WHERE id = $1")
            .bind(id)
            .execute(&self.p)
            .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found("meal_provider", id));
        }
        Ok(())
    }
}
