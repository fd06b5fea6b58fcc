//! Dining room tables and their availability.

use async_trait::async_trait;
use chrono::Utc;
use domain::{DomainError, Entity, tables};
use model::{NewTable, OrderStatus, Table};
use repository::Store;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{RestaurantServiceImpl, ServiceError, required};

#[async_trait]
pub trait TableService: Send + Sync {
    /// Table numbers are unique; a duplicate is rejected by the store.
    async fn create_table(&self, input: NewTable) -> Result<Table, ServiceError>;
    async fn get_table(&self, id: Uuid) -> Result<Table, ServiceError>;
    async fn list_tables(&self, only_active: bool) -> Result<Vec<Table>, ServiceError>;
    async fn update_table(&self, id: Uuid, input: NewTable) -> Result<Table, ServiceError>;
    async fn delete_table(&self, id: Uuid) -> Result<(), ServiceError>;
    /// Active tables not held by a pending or preparing order, by number.
    async fn available_tables(&self) -> Result<Vec<Table>, ServiceError>;
}

#[async_trait]
impl<S: Store> TableService for RestaurantServiceImpl<S> {
    #[instrument(skip(self))]
    async fn create_table(&self, input: NewTable) -> Result<Table, ServiceError> {
        let now = Utc::now();
        let table = Table {
            id: Uuid::new_v4(),
            number: input.number,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        uow.insert_table(&table).await?;
        uow.commit().await?;

        info!(table_id = %table.id, number = table.number, "Table created");
        Ok(table)
    }

    async fn get_table(&self, id: Uuid) -> Result<Table, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_table(id).await?, Entity::Table, id)
    }

    async fn list_tables(&self, only_active: bool) -> Result<Vec<Table>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_tables(only_active).await?)
    }

    #[instrument(skip(self))]
    async fn update_table(&self, id: Uuid, input: NewTable) -> Result<Table, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut table = required(uow.get_table(id).await?, Entity::Table, id)?;
        table.number = input.number;
        table.is_active = input.is_active;
        table.updated_at = Utc::now();
        uow.update_table(&table).await?;
        uow.commit().await?;
        Ok(table)
    }

    #[instrument(skip(self))]
    async fn delete_table(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        if !uow.delete_table(id).await? {
            return Err(DomainError::not_found(Entity::Table, id).into());
        }
        uow.commit().await?;
        Ok(())
    }

    async fn available_tables(&self) -> Result<Vec<Table>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let all_tables = uow.list_tables(true).await?;
        let open_orders = uow.list_orders_with_status(&OrderStatus::OPEN).await?;
        let available = tables::available_tables(&all_tables, &open_orders);

        debug!(
            total = all_tables.len(),
            available = available.len(),
            "Resolved table availability"
        );
        Ok(available)
    }
}
