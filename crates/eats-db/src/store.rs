//! The repository seam.
//!
//! Services only ever talk to `dyn Store`. [`crate::PgStore`] is the
//! production implementation; `eats-testkit` provides an in-memory one with
//! the same observable behavior for service and API tests.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use eats_schemas::{
    Category, Dish, DishOption, Order, OrderItemOption, OrderStatus, Page, Payment, Restaurant,
    User, UserRole, Verification,
};

/// A write collided with another user's email. Stores return it inside
/// `anyhow::Error`; callers recover it with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
#[error("unique email constraint")]
pub struct EmailTaken;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone)]
pub struct NewRestaurant {
    pub name: String,
    pub cover_image: String,
    pub address: String,
    pub category_id: Option<i64>,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewDish {
    pub restaurant_id: i64,
    pub name: String,
    pub price: i32,
    pub photo: Option<String>,
    pub description: String,
    pub options: Vec<DishOption>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub dish_id: i64,
    pub options: Vec<OrderItemOption>,
}

/// Orders are inserted with status `Pending` and no driver.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub total: i32,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: String,
    pub user_id: i64,
    pub restaurant_id: i64,
}

/// Which side of an order a user-scoped listing filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Customer(i64),
    Driver(i64),
    /// Orders of every restaurant owned by this user.
    Owner(i64),
}

#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---
    async fn insert_user(&self, new: NewUser) -> Result<User>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Persists email, password hash and verified flag; bumps `updated_at`.
    async fn update_user(&self, user: &User) -> Result<User>;

    // --- verifications ---
    /// Drops any existing code for the user and stores `code`.
    async fn replace_verification(&self, user_id: i64, code: &str) -> Result<Verification>;
    async fn verification_by_code(&self, code: &str) -> Result<Option<Verification>>;
    async fn delete_verification(&self, id: i64) -> Result<()>;

    // --- categories ---
    /// Idempotent on the slug of `name`.
    async fn get_or_create_category(&self, name: &str) -> Result<Category>;
    async fn categories(&self) -> Result<Vec<Category>>;
    async fn category_by_id(&self, id: i64) -> Result<Option<Category>>;
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn count_restaurants_in_category(&self, category_id: i64) -> Result<i64>;

    // --- restaurants ---
    async fn insert_restaurant(&self, new: NewRestaurant) -> Result<Restaurant>;
    async fn restaurant_by_id(&self, id: i64) -> Result<Option<Restaurant>>;
    /// Persists name, cover image, address and category.
    async fn update_restaurant(&self, r: &Restaurant) -> Result<Restaurant>;
    async fn delete_restaurant(&self, id: i64) -> Result<()>;
    /// Promoted first, then by id.
    async fn restaurants_page(&self, page: i64) -> Result<Page<Restaurant>>;
    async fn restaurants_in_category(&self, category_id: i64, page: i64)
        -> Result<Page<Restaurant>>;
    /// Case-insensitive substring match on the name.
    async fn search_restaurants(&self, query: &str, page: i64) -> Result<Page<Restaurant>>;
    async fn restaurants_by_owner(&self, owner_id: i64) -> Result<Vec<Restaurant>>;
    async fn promote_restaurant(&self, id: i64, until: DateTime<Utc>) -> Result<()>;
    /// Clears every promotion that ended before `now`. Returns rows touched.
    async fn clear_expired_promotions(&self, now: DateTime<Utc>) -> Result<u64>;

    // --- dishes ---
    async fn insert_dish(&self, new: NewDish) -> Result<Dish>;
    async fn dish_by_id(&self, id: i64) -> Result<Option<Dish>>;
    async fn update_dish(&self, dish: &Dish) -> Result<Dish>;
    async fn delete_dish(&self, id: i64) -> Result<()>;
    async fn dishes_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Dish>>;

    // --- orders ---
    async fn insert_order(&self, new: NewOrder) -> Result<Order>;
    async fn order_by_id(&self, id: i64) -> Result<Option<Order>>;
    /// `None` when the order does not exist.
    async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>>;
    /// Sets the driver only while none is set. `None` when the order is
    /// missing or already taken.
    async fn assign_driver(&self, id: i64, driver_id: i64) -> Result<Option<Order>>;
    async fn orders_for(&self, scope: OrderScope, status: Option<OrderStatus>)
        -> Result<Vec<Order>>;
    async fn orders_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Order>>;

    // --- payments ---
    async fn insert_payment(&self, new: NewPayment) -> Result<Payment>;
    async fn payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>>;
}
