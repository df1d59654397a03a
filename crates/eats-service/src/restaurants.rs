//! Restaurants, categories and menus.
//!
//! Every mutation loads the restaurant first and compares its `owner_id`
//! with the caller; a missing row and a foreign row are distinct errors.

use std::sync::Arc;

use eats_db::{NewDish, NewRestaurant, Store};
use eats_schemas::{Category, Dish, DishOption, Order, Page, Restaurant, User};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

pub const NAME_MIN_CHARS: usize = 5;
pub const NAME_MAX_CHARS: usize = 140;

#[derive(Debug, Clone)]
pub struct CreateRestaurant {
    pub name: String,
    pub cover_image: String,
    pub address: String,
    pub category_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditRestaurant {
    pub restaurant_id: i64,
    pub name: Option<String>,
    pub cover_image: Option<String>,
    pub address: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateDish {
    pub restaurant_id: i64,
    pub name: String,
    pub price: i32,
    pub description: String,
    pub options: Vec<DishOption>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EditDish {
    pub dish_id: i64,
    pub name: Option<String>,
    pub price: Option<i32>,
    pub description: Option<String>,
    pub options: Option<Vec<DishOption>>,
    pub photo: Option<String>,
}

fn validate_name(name: &str) -> ServiceResult<()> {
    let n = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&n) {
        return Err(ServiceError::Invalid(format!(
            "Name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: i32) -> ServiceResult<()> {
    if price < 0 {
        return Err(ServiceError::Invalid("Price must not be negative".into()));
    }
    Ok(())
}

fn validate_category_name(name: &str) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::Invalid("Category name must not be empty".into()));
    }
    Ok(())
}

fn validate_options(options: &[DishOption]) -> ServiceResult<()> {
    let negative = options.iter().any(|o| {
        o.extra.is_some_and(|e| e < 0) || o.choices.iter().any(|c| c.extra.is_some_and(|e| e < 0))
    });
    if negative {
        return Err(ServiceError::Invalid("Option extras must not be negative".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RestaurantService {
    store: Arc<dyn Store>,
}

impl RestaurantService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The restaurant, provided `owner` owns it.
    async fn owned(&self, owner: &User, restaurant_id: i64) -> ServiceResult<Restaurant> {
        let r = self.restaurant(restaurant_id).await?;
        if r.owner_id != owner.id {
            return Err(ServiceError::NotOwner);
        }
        Ok(r)
    }

    // -----------------------------------------------------------------------
    // Restaurants
    // -----------------------------------------------------------------------

    pub async fn create_restaurant(
        &self,
        owner: &User,
        input: CreateRestaurant,
    ) -> ServiceResult<Restaurant> {
        validate_name(&input.name)?;
        validate_category_name(&input.category_name)?;

        let category = self.store.get_or_create_category(&input.category_name).await?;
        let r = self
            .store
            .insert_restaurant(NewRestaurant {
                name: input.name,
                cover_image: input.cover_image,
                address: input.address,
                category_id: Some(category.id),
                owner_id: owner.id,
            })
            .await?;

        info!(restaurant_id = r.id, owner_id = owner.id, "restaurant created");
        Ok(r)
    }

    pub async fn edit_restaurant(
        &self,
        owner: &User,
        input: EditRestaurant,
    ) -> ServiceResult<Restaurant> {
        let mut r = self.owned(owner, input.restaurant_id).await?;

        if let Some(name) = input.name {
            validate_name(&name)?;
            r.name = name;
        }
        if let Some(cover_image) = input.cover_image {
            r.cover_image = cover_image;
        }
        if let Some(address) = input.address {
            r.address = address;
        }
        if let Some(category_name) = input.category_name {
            validate_category_name(&category_name)?;
            r.category_id = Some(self.store.get_or_create_category(&category_name).await?.id);
        }

        Ok(self.store.update_restaurant(&r).await?)
    }

    pub async fn delete_restaurant(&self, owner: &User, restaurant_id: i64) -> ServiceResult<()> {
        self.owned(owner, restaurant_id).await?;
        self.store.delete_restaurant(restaurant_id).await?;
        info!(restaurant_id, owner_id = owner.id, "restaurant deleted");
        Ok(())
    }

    pub async fn my_restaurants(&self, owner: &User) -> ServiceResult<Vec<Restaurant>> {
        Ok(self.store.restaurants_by_owner(owner.id).await?)
    }

    /// Foreign restaurants read as missing.
    pub async fn my_restaurant(&self, owner: &User, restaurant_id: i64) -> ServiceResult<Restaurant> {
        match self.owned(owner, restaurant_id).await {
            Err(ServiceError::NotOwner) => Err(ServiceError::RestaurantNotFound),
            other => other,
        }
    }

    pub async fn restaurants(&self, page: i64) -> ServiceResult<Page<Restaurant>> {
        Ok(self.store.restaurants_page(page).await?)
    }

    pub async fn restaurant(&self, restaurant_id: i64) -> ServiceResult<Restaurant> {
        self.store
            .restaurant_by_id(restaurant_id)
            .await?
            .ok_or(ServiceError::RestaurantNotFound)
    }

    pub async fn search_restaurants(
        &self,
        query: &str,
        page: i64,
    ) -> ServiceResult<Page<Restaurant>> {
        Ok(self.store.search_restaurants(query.trim(), page).await?)
    }

    pub async fn menu(&self, restaurant_id: i64) -> ServiceResult<Vec<Dish>> {
        Ok(self.store.dishes_for_restaurant(restaurant_id).await?)
    }

    pub async fn restaurant_orders(&self, restaurant_id: i64) -> ServiceResult<Vec<Order>> {
        Ok(self.store.orders_for_restaurant(restaurant_id).await?)
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub async fn all_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.categories().await?)
    }

    pub async fn category_by_id(&self, category_id: i64) -> ServiceResult<Option<Category>> {
        Ok(self.store.category_by_id(category_id).await?)
    }

    pub async fn count_restaurants(&self, category_id: i64) -> ServiceResult<i64> {
        Ok(self.store.count_restaurants_in_category(category_id).await?)
    }

    pub async fn category(
        &self,
        slug: &str,
        page: i64,
    ) -> ServiceResult<(Category, Page<Restaurant>)> {
        let category = self
            .store
            .category_by_slug(slug)
            .await?
            .ok_or(ServiceError::CategoryNotFound)?;
        let restaurants = self.store.restaurants_in_category(category.id, page).await?;
        Ok((category, restaurants))
    }

    // -----------------------------------------------------------------------
    // Dishes
    // -----------------------------------------------------------------------

    pub async fn create_dish(&self, owner: &User, input: CreateDish) -> ServiceResult<Dish> {
        self.owned(owner, input.restaurant_id).await?;
        validate_name(&input.name)?;
        validate_price(input.price)?;
        validate_options(&input.options)?;

        let dish = self
            .store
            .insert_dish(NewDish {
                restaurant_id: input.restaurant_id,
                name: input.name,
                price: input.price,
                photo: input.photo,
                description: input.description,
                options: input.options,
            })
            .await?;
        info!(dish_id = dish.id, restaurant_id = dish.restaurant_id, "dish created");
        Ok(dish)
    }

    async fn owned_dish(&self, owner: &User, dish_id: i64) -> ServiceResult<Dish> {
        let dish = self
            .store
            .dish_by_id(dish_id)
            .await?
            .ok_or(ServiceError::DishNotFound)?;
        self.owned(owner, dish.restaurant_id).await?;
        Ok(dish)
    }

    pub async fn edit_dish(&self, owner: &User, input: EditDish) -> ServiceResult<Dish> {
        let mut dish = self.owned_dish(owner, input.dish_id).await?;

        if let Some(name) = input.name {
            validate_name(&name)?;
            dish.name = name;
        }
        if let Some(price) = input.price {
            validate_price(price)?;
            dish.price = price;
        }
        if let Some(description) = input.description {
            dish.description = description;
        }
        if let Some(options) = input.options {
            validate_options(&options)?;
            dish.options = options;
        }
        if input.photo.is_some() {
            dish.photo = input.photo;
        }

        Ok(self.store.update_dish(&dish).await?)
    }

    pub async fn delete_dish(&self, owner: &User, dish_id: i64) -> ServiceResult<()> {
        self.owned_dish(owner, dish_id).await?;
        self.store.delete_dish(dish_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_bounds_are_inclusive() {
        assert!(validate_name("abcd").is_err());
        assert!(validate_name("abcde").is_ok());
        assert!(validate_name(&"x".repeat(140)).is_ok());
        assert!(validate_name(&"x".repeat(141)).is_err());
        // counted in chars, not bytes
        assert!(validate_name("Crêpé").is_ok());
        assert!(validate_name("Crêp").is_err());
    }

    #[test]
    fn negative_prices_and_extras_rejected() {
        assert!(validate_price(0).is_ok());
        assert!(validate_price(-1).is_err());
        let bad = vec![DishOption {
            name: "Size".into(),
            choices: vec![],
            extra: Some(-5),
        }];
        assert!(validate_options(&bad).is_err());
    }
}
