//! Record store abstraction.
//!
//! One [`RecordStore`] per collection. Report code only ever sees the
//! [`Stores`] handle, so it runs the same against PostgreSQL and the
//! in-memory backend used by tests.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    calendar::DateRange,
    error::AppResult,
    models::{
        Dated, ExpensePatch, ExpenseRecord, IncomePatch, IncomeRecord, MealProviderPatch,
        MealProviderRecord, NewExpense, NewIncome, NewMealProvider,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Ties a record type to its insert and patch shapes.
pub trait StoredRecord: Dated + Clone + Send + Sync + 'static {
    type New: Send + 'static;
    type Patch: Send + 'static;

    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
}

impl StoredRecord for IncomeRecord {
    type New = NewIncome;
    type Patch = IncomePatch;
    const COLLECTION: &'static str = "income";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoredRecord for ExpenseRecord {
    type New = NewExpense;
    type Patch = ExpensePatch;
    const COLLECTION: &'static str = "expense";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl StoredRecord for MealProviderRecord {
    type New = NewMealProvider;
    type Patch = MealProviderPatch;
    const COLLECTION: &'static str = "meal_provider";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub range: Option<DateRange>,
    /// Ignored by the meal-provider collection, which has no category.
    pub category: Option<String>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_range(range: DateRange) -> Self {
        Self {
            range: Some(range),
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Persistence for one record collection. Orders are by date, ties by
/// creation time in the same direction.
#[async_trait]
pub trait RecordStore<R: StoredRecord>: Send + Sync {
    async fn create(&self, fields: R::New) -> AppResult<R>;

    async fn find_many(&self, filter: &RecordFilter, order: SortOrder) -> AppResult<Vec<R>>;

    /// Fails with `NotFound` when `id` is unknown.
    async fn find_one(&self, id: Uuid) -> AppResult<R>;

    /// Fails with `NotFound` when `id` is unknown.
    async fn update(&self, id: Uuid, patch: R::Patch) -> AppResult<R>;

    /// Fails with `NotFound` when `id` is unknown.
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Handle to the three collections, passed explicitly to everything that
/// reads or writes records.
#[derive(Clone)]
pub struct Stores {
    pub income: Arc<dyn RecordStore<IncomeRecord>>,
    pub expense: Arc<dyn RecordStore<ExpenseRecord>>,
    pub meal_providers: Arc<dyn RecordStore<MealProviderRecord>>,
}

impl Stores {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RecordStore<IncomeRecord>
            + RecordStore<ExpenseRecord>
            + RecordStore<MealProviderRecord>
            + 'static,
    {
        Self {
            income: backend.clone(),
            expense: backend.clone(),
            meal_providers: backend,
        }
    }
}
