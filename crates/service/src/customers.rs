//! Customers and their loyalty balance.

use async_trait::async_trait;
use chrono::Utc;
use domain::{DomainError, Entity, loyalty};
use model::{Customer, CustomerInput};
use repository::Store;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{RestaurantServiceImpl, ServiceError, require_text, required};

#[async_trait]
pub trait CustomerService: Send + Sync {
    /// New customers start with zero loyalty points.
    async fn create_customer(&self, input: CustomerInput) -> Result<Customer, ServiceError>;
    async fn get_customer(&self, id: Uuid) -> Result<Customer, ServiceError>;
    async fn customer_by_document(&self, document_number: &str)
    -> Result<Customer, ServiceError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError>;
    /// Updates contact data. The loyalty balance is left untouched.
    async fn update_customer(
        &self,
        id: Uuid,
        input: CustomerInput,
    ) -> Result<Customer, ServiceError>;
    async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError>;

    /// Adds `delta` (possibly negative) to the customer's loyalty balance.
    ///
    /// The read-modify-write runs under a lock on the customer row. A delta
    /// that would make the balance negative fails with
    /// [`DomainError::InsufficientPoints`] and writes nothing.
    async fn adjust_loyalty_points(&self, id: Uuid, delta: i32)
    -> Result<Customer, ServiceError>;
}

fn validate_customer(input: &CustomerInput) -> Result<(), ServiceError> {
    require_text("document_number", &input.document_number)?;
    require_text("name", &input.name)?;
    require_text("email", &input.email)?;
    Ok(())
}

#[async_trait]
impl<S: Store> CustomerService for RestaurantServiceImpl<S> {
    #[instrument(skip(self, input))]
    async fn create_customer(&self, input: CustomerInput) -> Result<Customer, ServiceError> {
        validate_customer(&input)?;
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            document_number: input.document_number,
            name: input.name,
            email: input.email,
            phone: input.phone,
            address: input.address,
            loyalty_points: 0,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        uow.insert_customer(&customer).await?;
        uow.commit().await?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    async fn get_customer(&self, id: Uuid) -> Result<Customer, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_customer(id).await?, Entity::Customer, id)
    }

    async fn customer_by_document(
        &self,
        document_number: &str,
    ) -> Result<Customer, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        uow.get_customer_by_document(document_number)
            .await?
            .ok_or_else(|| DomainError::not_found(Entity::Customer, document_number).into())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_customers().await?)
    }

    #[instrument(skip(self, input))]
    async fn update_customer(
        &self,
        id: Uuid,
        input: CustomerInput,
    ) -> Result<Customer, ServiceError> {
        validate_customer(&input)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut customer = required(uow.get_customer_for_update(id).await?, Entity::Customer, id)?;
        customer.document_number = input.document_number;
        customer.name = input.name;
        customer.email = input.email;
        customer.phone = input.phone;
        customer.address = input.address;
        customer.updated_at = Utc::now();
        uow.update_customer(&customer).await?;
        uow.commit().await?;
        Ok(customer)
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        if !uow.delete_customer(id).await? {
            return Err(DomainError::not_found(Entity::Customer, id).into());
        }
        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn adjust_loyalty_points(
        &self,
        id: Uuid,
        delta: i32,
    ) -> Result<Customer, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut customer = required(uow.get_customer_for_update(id).await?, Entity::Customer, id)?;
        let balance = loyalty::adjust_points(customer.loyalty_points, delta)?;
        customer.loyalty_points = balance;
        customer.updated_at = Utc::now();
        uow.update_customer(&customer).await?;
        uow.commit().await?;

        info!(customer_id = %id, delta, balance, "Loyalty points adjusted");
        Ok(customer)
    }
}
