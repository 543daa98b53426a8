//! In-process record store, used by the tests and when no database is
//! configured. Contents are lost on restart.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    RwLock,
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{RecordFilter, RecordStore, SortOrder, StoredRecord};
use crate::{
    error::{AppError, AppResult},
    models::{
        Categorized, ExpensePatch, ExpenseRecord, IncomePatch, IncomeRecord, MealProviderPatch,
        MealProviderRecord, MealStatus, NewExpense, NewIncome, NewMealProvider,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    income: RwLock<Vec<IncomeRecord>>,
    expense: RwLock<Vec<ExpenseRecord>>,
    meal_providers: RwLock<Vec<MealProviderRecord>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

fn poisoned() -> AppError {
    AppError::StoreUnavailable("record lock poisoned".to_string())
}

fn insert<R: StoredRecord>(rows: &RwLock<Vec<R>>, record: R) -> AppResult<R> {
    rows.write().map_err(|_| poisoned())?.push(record.clone());
    Ok(record)
}

fn select<R, F>(rows: &RwLock<Vec<R>>, keep: F, order: SortOrder) -> AppResult<Vec<R>>
where
    R: StoredRecord,
    F: Fn(&R) -> bool,
{
    let mut found: Vec<R> = rows
        .read()
        .map_err(|_| poisoned())?
        .iter()
        .filter(|r| keep(r))
        .cloned()
        .collect();

    // rows are kept in insertion order, so a stable sort leaves ties by
    // creation time
    found.sort_by_key(|r| r.date());
    if order == SortOrder::Descending {
        found.reverse();
    }
    Ok(found)
}

fn fetch<R: StoredRecord>(rows: &RwLock<Vec<R>>, id: Uuid) -> AppResult<R> {
    rows.read()
        .map_err(|_| poisoned())?
        .iter()
        .find(|r| r.id() == id)
        .cloned()
        .ok_or_else(|| AppError::not_found(R::COLLECTION, id))
}

fn modify<R, F>(rows: &RwLock<Vec<R>>, id: Uuid, change: F) -> AppResult<R>
where
    R: StoredRecord,
    F: FnOnce(&mut R),
{
    let mut rows = rows.write().map_err(|_| poisoned())?;
    let record = rows
        .iter_mut()
        .find(|r| r.id() == id)
        .ok_or_else(|| AppError::not_found(R::COLLECTION, id))?;
    change(record);
    Ok(record.clone())
}

fn remove<R: StoredRecord>(rows: &RwLock<Vec<R>>, id: Uuid) -> AppResult<()> {
    let mut rows = rows.write().map_err(|_| poisoned())?;
    let before = rows.len();
    rows.retain(|r| r.id() != id);
    if rows.len() == before {
        return Err(AppError::not_found(R::COLLECTION, id));
    }
    Ok(())
}

fn matches_categorized<R: Categorized>(record: &R, filter: &RecordFilter) -> bool {
    let in_range = filter.range.map_or(true, |r| r.contains(record.date()));
    let in_category = filter
        .category
        .as_deref()
        .map_or(true, |c| record.category() == c);
    in_range && in_category
}

#[async_trait]
impl RecordStore<IncomeRecord> for MemoryStore {
    async fn create(&self, fields: NewIncome) -> AppResult<IncomeRecord> {
        self.check_available()?;
        let now = Utc::now();
        let record = IncomeRecord {
            id: Uuid::new_v4(),
            date: fields.date,
            source: fields.source,
            amount: fields.amount,
            category: fields.category,
            note: fields.note,
            created_at: now,
            updated_at: now,
        };
        insert(&self.income, record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<IncomeRecord>> {
        self.check_available()?;
        select(&self.income, |r| matches_categorized(r, filter), order)
    }

    async fn find_one(&self, id: Uuid) -> AppResult<IncomeRecord> {
        self.check_available()?;
        fetch(&self.income, id)
    }

    async fn update(&self, id: Uuid, patch: IncomePatch) -> AppResult<IncomeRecord> {
        self.check_available()?;
        modify(&self.income, id, |r| {
            patch.apply(r);
            r.updated_at = Utc::now();
        })
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.check_available()?;
        remove(&self.income, id)
    }
}

#[async_trait]
impl RecordStore<ExpenseRecord> for MemoryStore {
    async fn create(&self, fields: NewExpense) -> AppResult<ExpenseRecord> {
        self.check_available()?;
        let now = Utc::now();
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            date: fields.date,
            purpose: fields.purpose,
            amount: fields.amount,
            category: fields.category,
            note: fields.note,
            created_at: now,
            updated_at: now,
        };
        insert(&self.expense, record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<ExpenseRecord>> {
        self.check_available()?;
        select(&self.expense, |r| matches_categorized(r, filter), order)
    }

    async fn find_one(&self, id: Uuid) -> AppResult<ExpenseRecord> {
        self.check_available()?;
        fetch(&self.expense, id)
    }

    async fn update(&self, id: Uuid, patch: ExpensePatch) -> AppResult<ExpenseRecord> {
        self.check_available()?;
        modify(&self.expense, id, |r| {
            patch.apply(r);
            r.updated_at = Utc::now();
        })
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.check_available()?;
        remove(&self.expense, id)
    }
}

#[async_trait]
impl RecordStore<MealProviderRecord> for MemoryStore {
    async fn create(&self, fields: NewMealProvider) -> AppResult<MealProviderRecord> {
        self.check_available()?;
        let now = Utc::now();
        let record = MealProviderRecord {
            id: Uuid::new_v4(),
            provider_name: fields.provider_name,
            address: fields.address,
            phone: fields.phone,
            date: fields.date,
            status: MealStatus::Pending,
            note: fields.note,
            created_at: now,
            updated_at: now,
        };
        insert(&self.meal_providers, record)
    }

    async fn find_many(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<MealProviderRecord>> {
        self.check_available()?;
        let range = filter.range;
        select(
            &self.meal_providers,
            |r| range.map_or(true, |range| range.contains(r.date)),
            order,
        )
    }

    async fn find_one(&self, id: Uuid) -> AppResult<MealProviderRecord> {
        self.check_available()?;
        fetch(&self.meal_providers, id)
    }

    async fn update(&self, id: Uuid, patch: MealProviderPatch) -> AppResult<MealProviderRecord> {
        self.check_available()?;
        modify(&self.meal_providers, id, |r| {
            patch.apply(r);
            r.updated_at = Utc::now();
        })
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.check_available()?;
        remove(&self.meal_providers, id)
    }
}
