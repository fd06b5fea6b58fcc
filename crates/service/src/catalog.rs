//! Menu management: categories and dishes.

use async_trait::async_trait;
use chrono::Utc;
use domain::{Entity, total};
use model::{Category, Dish, DishFilter, NewCategory, NewDish};
use repository::{Store, UnitOfWork};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{RestaurantServiceImpl, ServiceError, require_text, required};

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn create_category(&self, input: NewCategory) -> Result<Category, ServiceError>;
    async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError>;
    async fn list_categories(&self, only_active: bool) -> Result<Vec<Category>, ServiceError>;
    async fn update_category(&self, id: Uuid, input: NewCategory)
    -> Result<Category, ServiceError>;
    async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError>;

    /// Creates a dish. A referenced category must exist.
    async fn create_dish(&self, input: NewDish) -> Result<Dish, ServiceError>;
    async fn get_dish(&self, id: Uuid) -> Result<Dish, ServiceError>;
    async fn list_dishes(&self, filter: DishFilter) -> Result<Vec<Dish>, ServiceError>;
    /// Available dishes flagged as featured.
    async fn featured_dishes(&self) -> Result<Vec<Dish>, ServiceError>;
    /// Replaces a dish's fields. Existing order items keep the price they were created with.
    async fn update_dish(&self, id: Uuid, input: NewDish) -> Result<Dish, ServiceError>;
    async fn delete_dish(&self, id: Uuid) -> Result<(), ServiceError>;
}

async fn check_category(
    uow: &mut (dyn UnitOfWork + '_),
    category_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(id) = category_id {
        required(uow.get_category(id).await?, Entity::Category, id)?;
    }
    Ok(())
}

fn validate_dish(input: &NewDish) -> Result<(), ServiceError> {
    require_text("name", &input.name)?;
    total::validate_price(input.price)?;
    Ok(())
}

#[async_trait]
impl<S: Store> CatalogService for RestaurantServiceImpl<S> {
    #[instrument(skip(self))]
    async fn create_category(&self, input: NewCategory) -> Result<Category, ServiceError> {
        require_text("name", &input.name)?;
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: input.name,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        uow.insert_category(&category).await?;
        uow.commit().await?;

        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> Result<Category, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_category(id).await?, Entity::Category, id)
    }

    async fn list_categories(&self, only_active: bool) -> Result<Vec<Category>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_categories(only_active).await?)
    }

    #[instrument(skip(self))]
    async fn update_category(
        &self,
        id: Uuid,
        input: NewCategory,
    ) -> Result<Category, ServiceError> {
        require_text("name", &input.name)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut category = required(uow.get_category(id).await?, Entity::Category, id)?;
        category.name = input.name;
        category.is_active = input.is_active;
        category.updated_at = Utc::now();
        uow.update_category(&category).await?;
        uow.commit().await?;
        Ok(category)
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        if !uow.delete_category(id).await? {
            return Err(domain::DomainError::not_found(Entity::Category, id).into());
        }
        uow.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_dish(&self, input: NewDish) -> Result<Dish, ServiceError> {
        validate_dish(&input)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        check_category(uow.as_mut(), input.category_id).await?;

        let now = Utc::now();
        let dish = Dish {
            id: Uuid::new_v4(),
            name: input.name,
            price: input.price,
            category_id: input.category_id,
            is_available: input.is_available,
            is_featured: input.is_featured,
            created_at: now,
            updated_at: now,
        };
        uow.insert_dish(&dish).await?;
        uow.commit().await?;

        info!(dish_id = %dish.id, price = %dish.price, "Dish created");
        Ok(dish)
    }

    async fn get_dish(&self, id: Uuid) -> Result<Dish, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        required(uow.get_dish(id).await?, Entity::Dish, id)
    }

    async fn list_dishes(&self, filter: DishFilter) -> Result<Vec<Dish>, ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        Ok(uow.list_dishes(&filter).await?)
    }

    async fn featured_dishes(&self) -> Result<Vec<Dish>, ServiceError> {
        self.list_dishes(DishFilter {
            available: Some(true),
            featured: Some(true),
            ..Default::default()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn update_dish(&self, id: Uuid, input: NewDish) -> Result<Dish, ServiceError> {
        validate_dish(&input)?;
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;

        let mut dish = required(uow.get_dish(id).await?, Entity::Dish, id)?;
        check_category(uow.as_mut(), input.category_id).await?;
        dish.name = input.name;
        dish.price = input.price;
        dish.category_id = input.category_id;
        dish.is_available = input.is_available;
        dish.is_featured = input.is_featured;
        dish.updated_at = Utc::now();
        uow.update_dish(&dish).await?;
        uow.commit().await?;
        Ok(dish)
    }

    #[instrument(skip(self))]
    async fn delete_dish(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut conn = self.store.connect().await?;
        let mut uow = conn.begin().await?;
        if !uow.delete_dish(id).await? {
            return Err(domain::DomainError::not_found(Entity::Dish, id).into());
        }
        uow.commit().await?;
        Ok(())
    }
}
