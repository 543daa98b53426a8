//! Validated mutations and listings over the three collections.
//!
//! Input is checked here, before the store is touched, so a rejected form
//! never reaches the database.

use uuid::Uuid;

use crate::{
    calendar::DateRange,
    error::AppResult,
    models::{
        ExpensePatch, ExpenseRecord, IncomePatch, IncomeRecord, MealProviderPatch,
        MealProviderRecord, MealStatus, NewExpense, NewIncome, NewMealProvider,
    },
    store::{RecordFilter, SortOrder, Stores},
};

#[derive(Clone)]
pub struct RecordService {
    stores: Stores,
}

impl RecordService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn add_income(&self, fields: NewIncome) -> AppResult<IncomeRecord> {
        fields.validate()?;
        let record = self.stores.income.create(fields).await?;
        log::info!("income {} added ({} {})", record.id, record.category, record.amount);
        Ok(record)
    }

    pub async fn list_income(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<IncomeRecord>> {
        self.stores.income.find_many(filter, order).await
    }

    pub async fn get_income(&self, id: Uuid) -> AppResult<IncomeRecord> {
        self.stores.income.find_one(id).await
    }

    pub async fn edit_income(&self, id: Uuid, patch: IncomePatch) -> AppResult<IncomeRecord> {
        patch.validate()?;
        let record = self.stores.income.update(id, patch).await?;
        log::info!("income {id} updated");
        Ok(record)
    }

    pub async fn delete_income(&self, id: Uuid) -> AppResult<()> {
        self.stores.income.delete(id).await?;
        log::info!("income {id} deleted");
        Ok(())
    }

    pub async fn add_expense(&self, fields: NewExpense) -> AppResult<ExpenseRecord> {
        fields.validate()?;
        let record = self.stores.expense.create(fields).await?;
        log::info!("expense {} added ({} {})", record.id, record.category, record.amount);
        Ok(record)
    }

    pub async fn list_expense(
        &self,
        filter: &RecordFilter,
        order: SortOrder,
    ) -> AppResult<Vec<ExpenseRecord>> {
        self.stores.expense.find_many(filter, order).await
    }

    pub async fn get_expense(&self, id: Uuid) -> AppResult<ExpenseRecord> {
        self.stores.expense.find_one(id).await
    }

    pub async fn edit_expense(&self, id: Uuid, patch: ExpensePatch) -> AppResult<ExpenseRecord> {
        patch.validate()?;
        let record = self.stores.expense.update(id, patch).await?;
        log::info!("expense {id} updated");
        Ok(record)
    }

    pub async fn delete_expense(&self, id: Uuid) -> AppResult<()> {
        self.stores.expense.delete(id).await?;
        log::info!("expense {id} deleted");
        Ok(())
    }

    /// New providers always start as pending.
    pub async fn add_meal_provider(
        &self,
        fields: NewMealProvider,
    ) -> AppResult<MealProviderRecord> {
        fields.validate()?;
        let record = self.stores.meal_providers.create(fields).await?;
        log::info!(
            "meal provider {} scheduled on {}",
            record.provider_name,
            record.date
        );
        Ok(record)
    }

    pub async fn list_meal_providers(
        &self,
        range: Option<DateRange>,
        order: SortOrder,
    ) -> AppResult<Vec<MealProviderRecord>> {
        let filter = RecordFilter {
            range,
            category: None,
        };
        self.stores.meal_providers.find_many(&filter, order).await
    }

    pub async fn get_meal_provider(&self, id: Uuid) -> AppResult<MealProviderRecord> {
        self.stores.meal_providers.find_one(id).await
    }

    /// Replaces name, address, phone, date and note. Status is left alone.
    pub async fn edit_meal_provider(
        &self,
        id: Uuid,
        details: NewMealProvider,
    ) -> AppResult<MealProviderRecord> {
        details.validate()?;
        let patch = MealProviderPatch {
            provider_name: Some(details.provider_name),
            address: Some(details.address),
            phone: Some(details.phone),
            date: Some(details.date),
            note: Some(details.note),
            status: None,
        };
        let record = self.stores.meal_providers.update(id, patch).await?;
        log::info!("meal provider {id} updated");
        Ok(record)
    }

    pub async fn set_meal_provider_status(
        &self,
        id: Uuid,
        status: MealStatus,
    ) -> AppResult<MealProviderRecord> {
        let patch = MealProviderPatch {
            status: Some(status),
            ..Default::default()
        };
        let record = self.stores.meal_providers.update(id, patch).await?;
        log::info!("meal provider {id} is now {status}");
        Ok(record)
    }

    pub async fn delete_meal_provider(&self, id: Uuid) -> AppResult<()> {
        self.stores.meal_providers.delete(id).await?;
        log::info!("meal provider {id} deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    use super::*;
    use crate::{error::AppError, store::MemoryStore};

    fn service() -> (Arc<MemoryStore>, RecordService) {
        let backend = Arc::new(MemoryStore::new());
        let service = RecordService::new(Stores::from_backend(backend.clone()));
        (backend, service)
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn provider(name: &str, d: u32) -> NewMealProvider {
        NewMealProvider {
            provider_name: name.into(),
            address: Some("Luar Rawamakmur".into()),
            phone: Some("081234567890".into()),
            date: date(2, d),
            note: None,
        }
    }

    #[tokio::test]
    async fn rejected_income_is_not_stored() {
        let (_, service) = service();
        let err = service
            .add_income(NewIncome {
                date: date(2, 19),
                source: "Jamaah Tarwih".into(),
                amount: BigDecimal::from(-150_000),
                category: "tarwih".into(),
                note: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let all = service
            .list_income(&RecordFilter::all(), SortOrder::Descending)
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn validation_runs_before_store_access() {
        let (backend, service) = service();
        backend.set_unavailable(true);
        let err = service
            .add_expense(NewExpense {
                date: date(2, 10),
                purpose: "".into(),
                amount: BigDecimal::from(450_000),
                category: "operasional".into(),
                note: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn editing_provider_keeps_status() {
        let (_, service) = service();
        let created = service.add_meal_provider(provider("Bu Aminah", 20)).await.unwrap();
        service
            .set_meal_provider_status(created.id, MealStatus::Confirmed)
            .await
            .unwrap();

        let edited = service
            .edit_meal_provider(created.id, provider("Ibu Aminah", 21))
            .await
            .unwrap();
        assert_eq!(edited.status, MealStatus::Confirmed);
        assert_eq!(edited.provider_name, "Ibu Aminah");
        assert_eq!(edited.date, date(2, 21));
    }

    #[tokio::test]
    async fn invalid_phone_is_rejected() {
        let (_, service) = service();
        let mut fields = provider("Pak Budi", 22);
        fields.phone = Some("12345".into());
        let err = service.add_meal_provider(fields).await.unwrap_err();
        assert!(err.to_string().contains("phone"));
    }

    #[tokio::test]
    async fn get_returns_stored_record() {
        let (_, service) = service();
        let created = service.add_meal_provider(provider("Bu Siti", 23)).await.unwrap();
        let fetched = service.get_meal_provider(created.id).await.unwrap();
        assert_eq!(fetched, created);
        let err = service.get_income(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { collection: "income", .. }));
    }

    #[tokio::test]
    async fn deleting_twice_reports_not_found() {
        let (_, service) = service();
        let created = service.add_meal_provider(provider("Pak Budi", 22)).await.unwrap();
        service.delete_meal_provider(created.id).await.unwrap();
        let err = service.delete_meal_provider(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn schedule_lists_in_date_order() {
        let (_, service) = service();
        service.add_meal_provider(provider("C", 25)).await.unwrap();
        service.add_meal_provider(provider("A", 19)).await.unwrap();
        service.add_meal_provider(provider("B", 22)).await.unwrap();
        let names: Vec<String> = service
            .list_meal_providers(None, SortOrder::Ascending)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.provider_name)
            .collect();
        assert_eq!(names, ["A", "B", "C"]);
    }
}
